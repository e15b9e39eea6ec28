//! Constants for the JSON CRDT Patch protocol.

pub use crate::json_crdt_patch::enums::{SESSION, SYSTEM_SESSION_TIME};

use crate::json_crdt_patch::clock::Ts;

/// The origin timestamp: `(SESSION::SYSTEM, SYSTEM_SESSION_TIME::ORIGIN)`.
///
/// Addresses the document root register and is the bottom of the
/// timestamp order: every user-issued id compares greater.
pub const ORIGIN: Ts = Ts::new(SESSION::SYSTEM, SYSTEM_SESSION_TIME::ORIGIN);
