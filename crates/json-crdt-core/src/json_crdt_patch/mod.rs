//! JSON CRDT Patch protocol.
//!
//! The foundational layer for JSON CRDT collaboration. Defines:
//! - Clock types (`Ts`, `Tss`, `LogicalClock`, `ClockVector`)
//! - The CRDT operations (`Op` enum)
//! - `Patch`: an ordered sequence of operations
//! - `PatchBuilder`: fluent builder for constructing patches
//! - `schema`: declarative node-tree builders

pub mod clock;
pub mod compaction;
pub mod constants;
pub mod enums;
pub mod operations;
pub mod patch;
pub mod patch_builder;
pub mod schema;

// ── Re-exports ─────────────────────────────────────────────────────────────

pub use clock::{compare, contains, contains_id, equal, print_ts, ts, tss};
pub use clock::{ClockVector, LogicalClock, Ts, Tss};
pub use compaction::{combine, compact};
pub use constants::ORIGIN;
pub use enums::{JsonCrdtDataType, JsonCrdtPatchOpcode, SESSION, SYSTEM_SESSION_TIME};
pub use operations::{ConValue, Op};
pub use patch::{Patch, PatchError};
pub use patch_builder::PatchBuilder;
