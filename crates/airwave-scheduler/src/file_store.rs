//! File-backed schedule store — the whole mapping lives in one JSON
//! snapshot and is rewritten on every change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::sync::Mutex;

use crate::action::{ActionId, DeferredAction};
use crate::store::{ScheduleStore, StoreError};

/// JSON object keyed `"{message_id}_{channel_id}"` with RFC 3339 UTC
/// values. Each `put`/`remove` is a read-modify-write over the one
/// artifact, so writers are serialized by an async mutex — interleaved
/// rewrites would silently lose entries.
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(format!("create {}: {e}", parent.display())))?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let json = std::fs::read_to_string(&self.path)
            .map_err(|e| StoreError::Unavailable(format!("read {}: {e}", self.path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| StoreError::Unavailable(format!("parse {}: {e}", self.path.display())))
    }

    /// Write via a temp file + rename so a torn write never corrupts the
    /// snapshot.
    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(map)
            .map_err(|e| StoreError::Unavailable(format!("serialize schedule: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)
            .map_err(|e| StoreError::Unavailable(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::Unavailable(format!("rename {}: {e}", self.path.display())))?;
        Ok(())
    }
}

/// Stored values are always UTC. A value without an offset (older
/// snapshots) is interpreted as UTC rather than local time.
fn parse_due_time(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|t| t.and_utc())
}

#[async_trait]
impl ScheduleStore for FileStore {
    async fn put(&self, action: &DeferredAction) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_map()?;
        map.insert(action.id.to_string(), action.due_time.to_rfc3339());
        self.write_map(&map)
    }

    async fn load_all(&self) -> Result<Vec<DeferredAction>, StoreError> {
        let map = self.read_map()?;
        let mut actions = Vec::with_capacity(map.len());
        for (key, value) in map {
            let Ok(id) = key.parse::<ActionId>() else {
                tracing::warn!("⚠️ Skipping malformed schedule key {key:?}");
                continue;
            };
            let Some(due_time) = parse_due_time(&value) else {
                tracing::warn!("⚠️ Skipping entry {key}: bad timestamp {value:?}");
                continue;
            };
            actions.push(DeferredAction::new(id, due_time));
        }
        Ok(actions)
    }

    async fn remove(&self, id: &ActionId) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_map()?;
        if map.remove(&id.to_string()).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn temp_store(name: &str) -> (PathBuf, FileStore) {
        let dir = std::env::temp_dir().join(format!("airwave-test-{name}"));
        std::fs::remove_dir_all(&dir).ok();
        let path = dir.join("deletion_schedule.json");
        let store = FileStore::new(&path).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_then_load_all_round_trips() {
        let (dir, store) = temp_store("round-trip");
        let action = DeferredAction::new(ActionId::new(123, 456), Utc::now() + Duration::hours(24));

        store.put(&action).await.unwrap();
        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded, vec![action]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_put_same_key_updates_due_time() {
        let (dir, store) = temp_store("reschedule");
        let id = ActionId::new(1, 2);
        let later = Utc::now() + Duration::hours(48);

        store.put(&DeferredAction::new(id, Utc::now())).await.unwrap();
        store.put(&DeferredAction::new(id, later)).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].due_time, later);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_remove_absent_key_is_ok() {
        let (dir, store) = temp_store("remove-absent");
        store.remove(&ActionId::new(9, 9)).await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_back_to_back_puts_keep_both() {
        let (dir, store) = temp_store("two-puts");
        let now = Utc::now();
        store.put(&DeferredAction::new(ActionId::new(1, 10), now)).await.unwrap();
        store.put(&DeferredAction::new(ActionId::new(2, 10), now)).await.unwrap();
        assert_eq!(store.load_all().await.unwrap().len(), 2);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_concurrent_puts_do_not_lose_entries() {
        let (dir, store) = temp_store("concurrent");
        let store = Arc::new(store);
        let now = Utc::now();

        let mut handles = Vec::new();
        for i in 0..8u64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.put(&DeferredAction::new(ActionId::new(i, 100), now)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load_all().await.unwrap().len(), 8);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_malformed_entries_are_skipped() {
        let (dir, store) = temp_store("malformed");
        let good_time = Utc::now().to_rfc3339();
        let json = format!(
            r#"{{"123_456": "{good_time}", "not-a-key": "{good_time}", "7_8": "yesterday"}}"#
        );
        std::fs::write(&store.path, json).unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, ActionId::new(123, 456));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_unreadable_snapshot_is_unavailable() {
        let (dir, store) = temp_store("corrupt");
        std::fs::write(&store.path, "not json at all").unwrap();
        assert!(matches!(
            store.load_all().await,
            Err(StoreError::Unavailable(_))
        ));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_offsetless_timestamp_read_as_utc() {
        let (dir, store) = temp_store("naive-ts");
        std::fs::write(&store.path, r#"{"1_2": "2026-08-01T12:00:00"}"#).unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].due_time.to_rfc3339(), "2026-08-01T12:00:00+00:00");
        std::fs::remove_dir_all(&dir).ok();
    }
}
