//! Deferred-action data model — the unit of scheduled work.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Composite identifier for one scheduled deletion: the message and the
/// channel it lives in. Serialized as `"{message_id}_{channel_id}"` —
/// parsing the key recovers both halves, so no other payload is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId {
    pub message_id: u64,
    pub channel_id: u64,
}

impl ActionId {
    pub fn new(message_id: u64, channel_id: u64) -> Self {
        Self {
            message_id,
            channel_id,
        }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.message_id, self.channel_id)
    }
}

/// A schedule key that is not `"{message_id}_{channel_id}"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid action id {0:?}")]
pub struct InvalidActionId(pub String);

impl FromStr for ActionId {
    type Err = InvalidActionId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (message, channel) = s.split_once('_').ok_or_else(|| InvalidActionId(s.into()))?;
        let message_id = message.parse().map_err(|_| InvalidActionId(s.into()))?;
        let channel_id = channel.parse().map_err(|_| InvalidActionId(s.into()))?;
        Ok(Self {
            message_id,
            channel_id,
        })
    }
}

/// A deletion scheduled for a future UTC time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredAction {
    pub id: ActionId,
    pub due_time: DateTime<Utc>,
}

impl DeferredAction {
    pub fn new(id: ActionId, due_time: DateTime<Utc>) -> Self {
        Self { id, due_time }
    }

    /// Eligible for execution at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_time <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_id_round_trip() {
        let id = ActionId::new(123, 456);
        assert_eq!(id.to_string(), "123_456");
        assert_eq!("123_456".parse::<ActionId>().unwrap(), id);
    }

    #[test]
    fn test_id_rejects_garbage() {
        assert!("".parse::<ActionId>().is_err());
        assert!("123".parse::<ActionId>().is_err());
        assert!("abc_def".parse::<ActionId>().is_err());
        assert!("123_456_789".parse::<ActionId>().is_err());
        assert!("_456".parse::<ActionId>().is_err());
    }

    #[test]
    fn test_due_check() {
        let now = Utc::now();
        let action = DeferredAction::new(ActionId::new(1, 2), now - Duration::seconds(1));
        assert!(action.is_due(now));
        let action = DeferredAction::new(ActionId::new(1, 2), now + Duration::seconds(60));
        assert!(!action.is_due(now));
    }
}
