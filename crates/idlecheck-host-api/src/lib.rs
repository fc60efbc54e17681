//! Collaborator interfaces for idlecheck
//!
//! This crate defines the seam between the idle-check core and the host
//! session it runs against: the membership store (source of truth for idle
//! duration and location) and the session transport (event stream and
//! relocation commands). It contains no wire protocol itself.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
