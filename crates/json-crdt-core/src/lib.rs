//! json-crdt-core: JSON CRDT document engine.
//!
//! Replicas mutate a shared JSON document independently and converge by
//! exchanging [`Patch`](json_crdt_patch::Patch)es. The crate provides the
//! logical clock and patch protocol ([`json_crdt_patch`]) and the document
//! model with its node kinds and RGA sequence engine ([`json_crdt`]).

pub mod json_crdt_patch;
pub mod json_crdt;
