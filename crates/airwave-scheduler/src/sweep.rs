//! Sweep scheduler — a recovery pass at boot, then one periodic loop that
//! finds due entries and dispatches deletions.
//!
//! The sweep loop is the sole execution trigger. Each tick works from a
//! `load_all()` snapshot taken at tick start, so entries settled by a
//! prior tick never reappear mid-flight, and entries added after the
//! snapshot wait for the next tick.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use airwave_core::traits::DeleteCapability;
use chrono::Utc;
use futures::future::join_all;
use tokio::task::JoinHandle;

use crate::action::DeferredAction;
use crate::escalate::{Escalation, ShutdownSignal};
use crate::executor::ActionExecutor;
use crate::store::{ScheduleStore, StoreError};

/// Lifecycle of the scheduler subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Recovering,
    Running,
    /// Backend failed; escalation has fired and shutdown is on its way.
    Degraded,
    ShuttingDown,
    Stopped,
}

/// Counters from one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    pub due: usize,
    pub completed: usize,
    pub retried: usize,
}

/// The scheduler service: store, executor, and escalation latch held in
/// one explicit object that is passed to whoever needs it.
pub struct SweepService {
    store: Arc<dyn ScheduleStore>,
    executor: ActionExecutor,
    escalation: Arc<Escalation>,
    shutdown: ShutdownSignal,
    interval: Duration,
    state: Mutex<ServiceState>,
}

impl SweepService {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        deleter: Arc<dyn DeleteCapability>,
        escalation: Arc<Escalation>,
        shutdown: ShutdownSignal,
        interval: Duration,
    ) -> Self {
        Self {
            executor: ActionExecutor::new(deleter, store.clone()),
            store,
            escalation,
            shutdown,
            interval,
            state: Mutex::new(ServiceState::Uninitialized),
        }
    }

    pub fn state(&self) -> ServiceState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, next: ServiceState) {
        let mut state = self.state.lock().unwrap();
        if *state != next {
            tracing::debug!("Scheduler state: {:?} → {next:?}", *state);
            *state = next;
        }
    }

    /// Producer entrypoint: durably schedule a deletion. The action is
    /// only scheduled once this returns `Ok`. A backend failure here
    /// escalates and requests shutdown.
    pub async fn schedule(&self, action: DeferredAction) -> Result<(), StoreError> {
        match self.store.put(&action).await {
            Ok(()) => {
                tracing::info!("📅 Scheduled deletion of {} at {}", action.id, action.due_time);
                Ok(())
            }
            Err(e) => {
                self.fail(&format!("scheduling {}", action.id), &e).await;
                Err(e)
            }
        }
    }

    /// Boot-time recovery: execute everything already overdue right now
    /// instead of waiting for the first tick, so post-restart staleness
    /// is bounded by the boot itself. Future entries are left for the
    /// sweep. A load failure at boot is fatal for startup.
    pub async fn recover(&self) -> Result<TickStats, StoreError> {
        self.set_state(ServiceState::Recovering);
        let stats = self.run_tick().await?;
        if stats.due > 0 {
            tracing::info!(
                "♻️ Recovery: {} overdue deletion(s) handled ({} retried)",
                stats.due,
                stats.retried
            );
        }
        self.set_state(ServiceState::Running);
        Ok(stats)
    }

    /// One sweep pass over a fresh snapshot. Due entries are dispatched
    /// concurrently (distinct ids are independent) and the pass returns
    /// only after all of them settle.
    pub async fn run_tick(&self) -> Result<TickStats, StoreError> {
        let now = Utc::now();
        let snapshot = match self.store.load_all().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.fail("loading schedule", &e).await;
                return Err(e);
            }
        };

        let due: Vec<DeferredAction> = snapshot.into_iter().filter(|a| a.is_due(now)).collect();
        if due.is_empty() {
            return Ok(TickStats::default());
        }
        tracing::debug!("🔍 Sweep: {} entries due", due.len());

        let results = join_all(due.iter().map(|a| self.executor.execute(&a.id))).await;

        let mut stats = TickStats {
            due: due.len(),
            ..TickStats::default()
        };
        for (action, result) in due.iter().zip(results) {
            match result {
                Ok(outcome) if outcome.is_terminal() => stats.completed += 1,
                Ok(_) => stats.retried += 1,
                Err(e) => {
                    self.fail(&format!("removing {}", action.id), &e).await;
                    return Err(e);
                }
            }
        }
        Ok(stats)
    }

    /// Backend failure path: escalate once, mark Degraded, request
    /// shutdown. The backend is assumed unrecoverable without an
    /// operator.
    async fn fail(&self, context: &str, err: &StoreError) {
        self.set_state(ServiceState::Degraded);
        self.escalation.escalate(context, &err.to_string()).await;
        self.shutdown.trigger("storage backend unavailable");
    }

    /// Spawn the periodic sweep loop. It stops when the shutdown signal
    /// fires or a tick reports a backend failure.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let service = self;
        let mut shutdown = service.shutdown.subscribe();
        tokio::spawn(async move {
            tracing::info!("⏰ Sweep loop started (every {:?})", service.interval);
            let mut interval = tokio::time::interval(service.interval);
            // The first interval tick fires immediately; recovery has
            // just swept, so skip it.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if service.run_tick().await.is_err() {
                            break;
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
            tracing::info!("⏰ Sweep loop stopped");
        })
    }

    /// Orderly stop: optionally escalate, stop the sweep loop (waiting
    /// out an in-flight tick within `drain`, then abandoning it), and
    /// close the store. Abandoning mid-delete at worst leaves an entry
    /// whose target is already gone — a harmless retry after restart.
    pub async fn shutdown(&self, reason: &str, notify: bool, sweep: JoinHandle<()>, drain: Duration) {
        if notify {
            self.escalation.escalate("shutdown", reason).await;
        }
        self.set_state(ServiceState::ShuttingDown);
        self.shutdown.trigger(reason);

        let mut sweep = sweep;
        if tokio::time::timeout(drain, &mut sweep).await.is_err() {
            tracing::warn!("Sweep tick did not drain within {drain:?}; abandoning it");
            sweep.abort();
        }

        self.store.close().await;
        self.set_state(ServiceState::Stopped);
        tracing::info!("🛑 Scheduler stopped ({reason})");
    }
}
