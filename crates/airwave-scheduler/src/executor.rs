//! Action executor — performs the remote delete and settles the schedule
//! entry according to the outcome.

use std::sync::Arc;

use airwave_core::traits::{DeleteCapability, DeleteResult};

use crate::action::ActionId;
use crate::store::{ScheduleStore, StoreError};

/// How one execution attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Message deleted.
    Success,
    /// Message was already gone — the desired end state is reached.
    AlreadyGone,
    /// The channel itself is gone; nothing left to delete.
    ContainerUnavailable,
    /// Deletion is not permitted. Retrying will not help.
    PermissionDenied,
    /// Transient failure — the entry stays for the next sweep.
    TransientError(String),
}

impl ExecOutcome {
    /// Terminal outcomes release the schedule entry; a transient error
    /// keeps it for the retry.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecOutcome::TransientError(_))
    }
}

/// Executes deferred deletions against the remote service and removes
/// settled entries from the store.
pub struct ActionExecutor {
    deleter: Arc<dyn DeleteCapability>,
    store: Arc<dyn ScheduleStore>,
}

impl ActionExecutor {
    pub fn new(deleter: Arc<dyn DeleteCapability>, store: Arc<dyn ScheduleStore>) -> Self {
        Self { deleter, store }
    }

    /// Run one deletion. Terminal outcomes remove the entry; a transient
    /// error leaves it, which is what gives at-least-once retry without
    /// any extra bookkeeping. A failing `remove` is a backend error and
    /// is returned to the caller.
    pub async fn execute(&self, id: &ActionId) -> Result<ExecOutcome, StoreError> {
        let outcome = match self.deleter.delete_message(id.channel_id, id.message_id).await {
            DeleteResult::Deleted => {
                tracing::info!("🗑️ Deleted scheduled message {id}");
                ExecOutcome::Success
            }
            DeleteResult::MessageMissing => {
                tracing::debug!("Message {id} already gone");
                ExecOutcome::AlreadyGone
            }
            DeleteResult::ChannelMissing => {
                tracing::info!("Channel for {id} no longer exists; dropping entry");
                ExecOutcome::ContainerUnavailable
            }
            DeleteResult::Forbidden => {
                tracing::warn!("🚫 Not permitted to delete {id}; dropping entry");
                ExecOutcome::PermissionDenied
            }
            DeleteResult::Failed(detail) => {
                tracing::warn!("⚠️ Delete of {id} failed, will retry next sweep: {detail}");
                ExecOutcome::TransientError(detail)
            }
        };

        if outcome.is_terminal() {
            self.store.remove(id).await?;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::DeferredAction;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixedDeleter(DeleteResult);

    #[async_trait]
    impl DeleteCapability for FixedDeleter {
        async fn delete_message(&self, _channel_id: u64, _message_id: u64) -> DeleteResult {
            self.0.clone()
        }
    }

    struct MemStore {
        entries: Mutex<HashMap<ActionId, chrono::DateTime<Utc>>>,
    }

    impl MemStore {
        fn with(id: ActionId) -> Arc<Self> {
            let mut entries = HashMap::new();
            entries.insert(id, Utc::now());
            Arc::new(Self {
                entries: Mutex::new(entries),
            })
        }

        fn contains(&self, id: &ActionId) -> bool {
            self.entries.lock().unwrap().contains_key(id)
        }
    }

    #[async_trait]
    impl ScheduleStore for MemStore {
        async fn put(&self, action: &DeferredAction) -> Result<(), StoreError> {
            self.entries.lock().unwrap().insert(action.id, action.due_time);
            Ok(())
        }
        async fn load_all(&self) -> Result<Vec<DeferredAction>, StoreError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .iter()
                .map(|(id, due)| DeferredAction::new(*id, *due))
                .collect())
        }
        async fn remove(&self, id: &ActionId) -> Result<(), StoreError> {
            self.entries.lock().unwrap().remove(id);
            Ok(())
        }
        async fn close(&self) {}
    }

    async fn run(result: DeleteResult) -> (ExecOutcome, bool) {
        let id = ActionId::new(1, 2);
        let store = MemStore::with(id);
        let executor = ActionExecutor::new(Arc::new(FixedDeleter(result)), store.clone());
        let outcome = executor.execute(&id).await.unwrap();
        (outcome, store.contains(&id))
    }

    #[tokio::test]
    async fn test_terminal_outcomes_remove_entry() {
        for (result, expected) in [
            (DeleteResult::Deleted, ExecOutcome::Success),
            (DeleteResult::MessageMissing, ExecOutcome::AlreadyGone),
            (DeleteResult::ChannelMissing, ExecOutcome::ContainerUnavailable),
            (DeleteResult::Forbidden, ExecOutcome::PermissionDenied),
        ] {
            let (outcome, still_present) = run(result).await;
            assert_eq!(outcome, expected);
            assert!(!still_present, "{expected:?} should release the entry");
        }
    }

    #[tokio::test]
    async fn test_transient_error_keeps_entry() {
        let (outcome, still_present) = run(DeleteResult::Failed("HTTP 500".into())).await;
        assert_eq!(outcome, ExecOutcome::TransientError("HTTP 500".into()));
        assert!(still_present);
    }
}
