//! [`Patch`]: a JSON CRDT patch containing a sequence of operations.

use crate::json_crdt_patch::clock::{print_ts, ts, Ts, Tss};
use crate::json_crdt_patch::operations::{ConValue, Op};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("empty patch")]
    EmptyPatch,
    #[error("patch session mismatch: {expected} vs {actual}")]
    SessionMismatch { expected: u64, actual: u64 },
    #[error("patch starting at {start} overlaps previous patch ending at {end}")]
    TimestampConflict { start: u64, end: u64 },
}

/// A JSON CRDT Patch: an ordered list of operations with optional metadata.
///
/// Normally created via [`PatchBuilder`](super::patch_builder::PatchBuilder).
/// A patch is immutable once flushed and may be applied any number of
/// times to any replica.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Patch {
    /// The list of operations in the patch.
    pub ops: Vec<Op>,

    /// Arbitrary metadata (not interpreted by the CRDT library).
    pub meta: Option<Value>,
}

impl Patch {
    /// Creates an empty patch with no operations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ID of the first operation, if any.
    pub fn get_id(&self) -> Option<Ts> {
        self.ops.first().map(|op| op.id())
    }

    /// Returns the total logical clock span consumed by all operations.
    pub fn span(&self) -> u64 {
        self.ops.iter().map(|op| op.span()).sum()
    }

    /// Returns the logical time expected for the next operation to be inserted.
    ///
    /// Returns 0 if the patch has no operations.
    pub fn next_time(&self) -> u64 {
        match self.ops.last() {
            None => 0,
            Some(op) => op.id().time + op.span(),
        }
    }

    /// Returns the greatest id consumed by any operation in this patch.
    pub fn max_id(&self) -> Option<Ts> {
        self.ops
            .iter()
            .map(|op| ts(op.id().sid, op.id().time + op.span().max(1) - 1))
            .max()
    }

    /// Creates a new patch where every timestamp is transformed by `f`.
    pub fn rewrite_time<F>(&self, f: &F) -> Patch
    where
        F: Fn(Ts) -> Ts,
    {
        Patch {
            ops: self.ops.iter().map(|op| rewrite_op(op, f)).collect(),
            meta: self.meta.clone(),
        }
    }

    /// Rebases the patch so that the first operation begins at `new_time`.
    ///
    /// Only timestamps belonging to the patch's session ID and at or after
    /// `transform_after` (defaults to the patch start time) are shifted.
    pub fn rebase(&self, new_time: u64, transform_after: Option<u64>) -> Result<Patch, PatchError> {
        let id = self.get_id().ok_or(PatchError::EmptyPatch)?;
        let sid = id.sid;
        let patch_start_time = id.time;
        let transform_after = transform_after.unwrap_or(patch_start_time);
        if patch_start_time == new_time {
            return Ok(self.clone());
        }
        let delta = new_time as i64 - patch_start_time as i64;
        Ok(self.rewrite_time(&|id: Ts| -> Ts {
            if id.sid != sid || id.time < transform_after {
                return id;
            }
            ts(sid, (id.time as i64 + delta) as u64)
        }))
    }
}

impl std::fmt::Display for Patch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id_str = match self.get_id() {
            Some(id) => print_ts(id),
            None => "(nil)".to_owned(),
        };
        write!(f, "Patch {}!{}", id_str, self.span())?;
        for op in &self.ops {
            write!(f, "\n  {}", op)?;
        }
        Ok(())
    }
}

/// Applies the timestamp transform function to a single operation.
fn rewrite_op<F>(op: &Op, f: &F) -> Op
where
    F: Fn(Ts) -> Ts,
{
    match op {
        Op::NewCon { id, val } => Op::NewCon {
            id: f(*id),
            val: match val {
                ConValue::Ref(ts) => ConValue::Ref(f(*ts)),
                other => other.clone(),
            },
        },
        Op::NewVal { id } => Op::NewVal { id: f(*id) },
        Op::NewObj { id } => Op::NewObj { id: f(*id) },
        Op::NewVec { id } => Op::NewVec { id: f(*id) },
        Op::NewStr { id } => Op::NewStr { id: f(*id) },
        Op::NewBin { id } => Op::NewBin { id: f(*id) },
        Op::NewArr { id } => Op::NewArr { id: f(*id) },
        Op::InsVal { id, obj, val } => Op::InsVal {
            id: f(*id),
            obj: f(*obj),
            val: f(*val),
        },
        Op::InsObj { id, obj, data } => Op::InsObj {
            id: f(*id),
            obj: f(*obj),
            data: data.iter().map(|(k, v)| (k.clone(), f(*v))).collect(),
        },
        Op::InsVec { id, obj, data } => Op::InsVec {
            id: f(*id),
            obj: f(*obj),
            data: data.iter().map(|(k, v)| (*k, f(*v))).collect(),
        },
        Op::InsStr {
            id,
            obj,
            after,
            data,
        } => Op::InsStr {
            id: f(*id),
            obj: f(*obj),
            after: f(*after),
            data: data.clone(),
        },
        Op::InsBin {
            id,
            obj,
            after,
            data,
        } => Op::InsBin {
            id: f(*id),
            obj: f(*obj),
            after: f(*after),
            data: data.clone(),
        },
        Op::InsArr {
            id,
            obj,
            after,
            data,
        } => Op::InsArr {
            id: f(*id),
            obj: f(*obj),
            after: f(*after),
            data: data.iter().map(|v| f(*v)).collect(),
        },
        Op::UpdArr {
            id,
            obj,
            after,
            val,
        } => Op::UpdArr {
            id: f(*id),
            obj: f(*obj),
            after: f(*after),
            val: f(*val),
        },
        Op::Del { id, obj, what } => Op::Del {
            id: f(*id),
            obj: f(*obj),
            what: what
                .iter()
                .map(|s| {
                    let start = f(s.ts());
                    Tss::new(start.sid, start.time, s.span)
                })
                .collect(),
        },
        Op::Nop { id, len } => Op::Nop {
            id: f(*id),
            len: *len,
        },
    }
}
