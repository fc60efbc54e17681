//! Shared data model for idlecheck
//!
//! This crate defines the types exchanged between the idle-check core and
//! its collaborators:
//! - Session events (participant left/entered/moved)
//! - Roster and participant views returned by the membership store
//! - Timer snapshots exposed by the scheduler

mod events;
mod types;

pub use events::*;
pub use types::*;
