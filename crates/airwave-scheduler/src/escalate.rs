//! One-shot failure escalation and the process-wide shutdown signal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use airwave_core::traits::{Notifier, NotifyAudience};
use tokio::sync::watch;

/// What the public channel sees when the backend dies. Deliberately
/// generic — operators get the detail, listeners get an outage notice.
const PUBLIC_OUTAGE_TEXT: &str = "📻 The radio is off the air for maintenance. Back soon.";

/// Notifies operator and public audiences at most once per process
/// lifetime. The latch only resets with a restart, so repeated backend
/// errors cannot cause a notification storm.
pub struct Escalation {
    notifier: Arc<dyn Notifier>,
    sent: AtomicBool,
}

impl Escalation {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            sent: AtomicBool::new(false),
        }
    }

    /// First call notifies both audiences; every later call is a no-op.
    /// Notification failures are logged and never re-escalate.
    pub async fn escalate(&self, context: &str, detail: &str) {
        if self.sent.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::error!("🚨 Escalating backend failure ({context}): {detail}");

        let operator_text =
            format!("🚨 Schedule storage failure in {context}: {detail} — shutting down.");
        if let Err(e) = self.notifier.notify(NotifyAudience::Operator, &operator_text).await {
            tracing::warn!("Operator notification failed: {e}");
        }
        if let Err(e) = self.notifier.notify(NotifyAudience::Public, PUBLIC_OUTAGE_TEXT).await {
            tracing::warn!("Public notification failed: {e}");
        }
    }

    pub fn already_sent(&self) -> bool {
        self.sent.load(Ordering::SeqCst)
    }
}

/// Broadcast that asks every long-running task to stop. Cloning shares
/// the same underlying signal.
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Idempotent; only the first trigger logs the reason.
    pub fn trigger(&self, reason: &str) {
        let was_triggered = self.tx.send_replace(true);
        if !was_triggered {
            tracing::info!("🛑 Shutdown requested: {reason}");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airwave_core::error::{AirwaveError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct CountingNotifier {
        operator: AtomicUsize,
        public: AtomicUsize,
        fail: bool,
    }

    impl CountingNotifier {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                operator: AtomicUsize::new(0),
                public: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn notify(&self, audience: NotifyAudience, _text: &str) -> Result<()> {
            match audience {
                NotifyAudience::Operator => self.operator.fetch_add(1, Ordering::SeqCst),
                NotifyAudience::Public => self.public.fetch_add(1, Ordering::SeqCst),
            };
            if self.fail {
                Err(AirwaveError::Channel("send failed".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_escalate_fires_once_per_lifetime() {
        let notifier = CountingNotifier::new(false);
        let escalation = Escalation::new(notifier.clone());

        for i in 0..100 {
            escalation.escalate("sweep load", &format!("failure {i}")).await;
        }

        assert_eq!(notifier.operator.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.public.load(Ordering::SeqCst), 1);
        assert!(escalation.already_sent());
    }

    #[tokio::test]
    async fn test_notify_failure_does_not_reopen_latch() {
        let notifier = CountingNotifier::new(true);
        let escalation = Escalation::new(notifier.clone());

        escalation.escalate("put", "connection refused").await;
        escalation.escalate("put", "connection refused").await;

        assert_eq!(notifier.operator.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.public.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_signal_wakes_subscribers() {
        let signal = ShutdownSignal::new();
        let mut rx = signal.subscribe();
        assert!(!signal.is_triggered());

        signal.trigger("test");
        signal.trigger("test again");

        rx.changed().await.unwrap();
        assert!(signal.is_triggered());
    }
}
