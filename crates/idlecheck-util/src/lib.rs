//! Shared utilities for idlecheck
//!
//! This crate provides:
//! - ID types (ParticipantId, AreaId, TimerId)
//! - Time utilities (wall-clock now, idle deadline arithmetic)
//! - Error types

mod error;
mod ids;
mod time;

pub use error::*;
pub use ids::*;
pub use time::*;
