//! nodeweight-state — the health state shared between the sampler and probes.
//!
//! A single writer (the sampler loop) replaces the current
//! [`HealthSnapshot`] once per cycle; any number of probe handlers read it.
//!
//! # Architecture
//!
//! ```text
//! SharedHealth (Arc<RwLock<Arc<HealthSnapshot>>>)
//!   ├── publish() ← sampler, swaps the whole snapshot
//!   ├── snapshot() → probe, clones the Arc under a read guard
//!   └── status_line() → agent-check line of the current verdict
//! ```
//!
//! Snapshots are immutable once built. Writers swap a pointer rather than
//! mutating fields, so a reader always sees the fields of exactly one
//! sampling cycle.

pub mod store;
pub mod types;

pub use store::SharedHealth;
pub use types::*;
