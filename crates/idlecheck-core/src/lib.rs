//! Idle-timeout core for idlecheck
//!
//! This crate is the heart of idlecheck, containing:
//! - The idle scheduler (one timer per participant, cancel-then-arm)
//! - Fire re-validation against live store data before relocating
//! - The event router (left/entered/moved -> cancel/reset)
//! - Startup and periodic roster reconciliation
//! - The plugin lifecycle (run, reload, unload)

mod events;
mod plugin;
mod reconcile;
mod router;
mod scheduler;

pub use events::*;
pub use plugin::*;
pub use reconcile::*;
pub use router::*;
pub use scheduler::*;
