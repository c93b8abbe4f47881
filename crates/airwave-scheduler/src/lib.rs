//! # Airwave Scheduler
//!
//! Durable deferred-deletion scheduling. Every entry survives process
//! restarts and executes at least once; the backend failing takes the
//! process down loudly instead of running on partial state.
//!
//! ## Architecture
//! ```text
//! relay glue ──put──▶ ScheduleStore (file snapshot | postgres table)
//!                        ▲        ▲
//!        boot: recover() │        │ every tick: load_all()
//!                        │        │
//!                  SweepService (tokio interval)
//!                        │
//!                        ├── due entry → ActionExecutor → DeleteCapability
//!                        │       terminal outcome → remove()
//!                        │       transient outcome → retried next tick
//!                        └── backend failure → Escalation (once) → shutdown
//! ```
//!
//! The sweep loop is the sole execution trigger — there are no per-entry
//! one-shot timers, so nothing can race the sweep over the same entry.

pub mod action;
pub mod escalate;
pub mod executor;
pub mod file_store;
pub mod pg_store;
pub mod store;
pub mod sweep;

pub use action::{ActionId, DeferredAction};
pub use escalate::{Escalation, ShutdownSignal};
pub use executor::{ActionExecutor, ExecOutcome};
pub use file_store::FileStore;
pub use pg_store::PgStore;
pub use store::{ScheduleStore, StoreError, open_store};
pub use sweep::{ServiceState, SweepService, TickStats};
