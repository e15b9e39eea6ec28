//! Utility functions for the JSON CRDT model.

use rand::Rng;

use crate::json_crdt_patch::enums::SESSION;

/// Session ids below this value are reserved for the protocol.
pub const MIN_SESSION_ID: u64 = 0x1_0000;

/// Returns `true` when `sid` may be used by a local writer.
pub fn is_valid_session_id(sid: u64) -> bool {
    (MIN_SESSION_ID..=SESSION::MAX).contains(&sid)
}

/// Generates a random session id in `[65536, 2^53 - 1]`.
pub fn random_session_id() -> u64 {
    let mut rng = rand::thread_rng();
    rng.gen_range(MIN_SESSION_ID..=SESSION::MAX)
}
