//! All JSON CRDT Patch operations as a single Rust enum.

use crate::json_crdt_patch::clock::{print_ts, Ts, Tss};
use crate::json_crdt_patch::constants::ORIGIN;
use crate::json_crdt_patch::enums::{JsonCrdtDataType, JsonCrdtPatchOpcode};
use serde_json::Value;

// ── ConValue ───────────────────────────────────────────────────────────────

/// The value stored in a `new_con` operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConValue {
    /// A timestamp reference to another CRDT node.
    Ref(Ts),
    /// A constant JSON value.
    Val(Value),
    /// The `undefined` constant.
    Undef,
}

// ── Operation ──────────────────────────────────────────────────────────────

/// A single JSON CRDT Patch operation.
///
/// Each variant carries an `id: Ts` identifying the operation in the
/// global logical clock space.
///
/// Span (the number of clock ticks consumed):
/// - Most operations consume 1 tick.
/// - `InsStr`, `InsBin`, `InsArr` consume one tick per inserted element.
/// - `Nop` consumes `len` ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    // ── Creation operations ──────────────────────────────────────────────
    /// Create a new constant `con` value.
    NewCon { id: Ts, val: ConValue },
    /// Create a new LWW-Register `val` object.
    NewVal { id: Ts },
    /// Create a new LWW-Map `obj` object.
    NewObj { id: Ts },
    /// Create a new LWW-Vector `vec` object.
    NewVec { id: Ts },
    /// Create a new RGA-String `str` object.
    NewStr { id: Ts },
    /// Create a new RGA-Binary `bin` object.
    NewBin { id: Ts },
    /// Create a new RGA-Array `arr` object.
    NewArr { id: Ts },

    // ── Mutation operations ──────────────────────────────────────────────
    /// Set the value of a `val` register, or of the document root when
    /// `obj` is [`ORIGIN`].
    InsVal { id: Ts, obj: Ts, val: Ts },
    /// Set key→value pairs in an `obj` map.
    InsObj {
        id: Ts,
        obj: Ts,
        data: Vec<(String, Ts)>,
    },
    /// Set index→value pairs in a `vec` vector.
    InsVec {
        id: Ts,
        obj: Ts,
        data: Vec<(u8, Ts)>,
    },
    /// Insert a string into a `str` RGA.
    InsStr {
        id: Ts,
        obj: Ts,
        after: Ts,
        data: String,
    },
    /// Insert binary data into a `bin` RGA.
    InsBin {
        id: Ts,
        obj: Ts,
        after: Ts,
        data: Vec<u8>,
    },
    /// Insert elements into an `arr` RGA.
    InsArr {
        id: Ts,
        obj: Ts,
        after: Ts,
        data: Vec<Ts>,
    },
    /// Replace the value of an existing element in an `arr` array.
    UpdArr { id: Ts, obj: Ts, after: Ts, val: Ts },
    /// Delete ranges of elements in a `str`, `bin` or `arr`.
    Del { id: Ts, obj: Ts, what: Vec<Tss> },
    /// No-op: skips clock cycles without performing any CRDT action.
    Nop { id: Ts, len: u64 },
}

impl Op {
    /// Returns the ID (first timestamp) of this operation.
    pub fn id(&self) -> Ts {
        match self {
            Op::NewCon { id, .. }
            | Op::NewVal { id }
            | Op::NewObj { id }
            | Op::NewVec { id }
            | Op::NewStr { id }
            | Op::NewBin { id }
            | Op::NewArr { id }
            | Op::InsVal { id, .. }
            | Op::InsObj { id, .. }
            | Op::InsVec { id, .. }
            | Op::InsStr { id, .. }
            | Op::InsBin { id, .. }
            | Op::InsArr { id, .. }
            | Op::UpdArr { id, .. }
            | Op::Del { id, .. }
            | Op::Nop { id, .. } => *id,
        }
    }

    /// Number of logical clock cycles consumed by this operation.
    pub fn span(&self) -> u64 {
        match self {
            Op::InsStr { data, .. } => data.chars().count() as u64,
            Op::InsBin { data, .. } => data.len() as u64,
            Op::InsArr { data, .. } => data.len() as u64,
            Op::Nop { len, .. } => *len,
            _ => 1,
        }
    }

    /// Short mnemonic name of this operation.
    pub fn name(&self) -> &'static str {
        match self {
            Op::NewCon { .. } => "new_con",
            Op::NewVal { .. } => "new_val",
            Op::NewObj { .. } => "new_obj",
            Op::NewVec { .. } => "new_vec",
            Op::NewStr { .. } => "new_str",
            Op::NewBin { .. } => "new_bin",
            Op::NewArr { .. } => "new_arr",
            Op::InsVal { .. } => "ins_val",
            Op::InsObj { .. } => "ins_obj",
            Op::InsVec { .. } => "ins_vec",
            Op::InsStr { .. } => "ins_str",
            Op::InsBin { .. } => "ins_bin",
            Op::InsArr { .. } => "ins_arr",
            Op::UpdArr { .. } => "upd_arr",
            Op::Del { .. } => "del",
            Op::Nop { .. } => "nop",
        }
    }

    pub fn opcode(&self) -> JsonCrdtPatchOpcode {
        match self {
            Op::NewCon { .. } => JsonCrdtPatchOpcode::NewCon,
            Op::NewVal { .. } => JsonCrdtPatchOpcode::NewVal,
            Op::NewObj { .. } => JsonCrdtPatchOpcode::NewObj,
            Op::NewVec { .. } => JsonCrdtPatchOpcode::NewVec,
            Op::NewStr { .. } => JsonCrdtPatchOpcode::NewStr,
            Op::NewBin { .. } => JsonCrdtPatchOpcode::NewBin,
            Op::NewArr { .. } => JsonCrdtPatchOpcode::NewArr,
            Op::InsVal { .. } => JsonCrdtPatchOpcode::InsVal,
            Op::InsObj { .. } => JsonCrdtPatchOpcode::InsObj,
            Op::InsVec { .. } => JsonCrdtPatchOpcode::InsVec,
            Op::InsStr { .. } => JsonCrdtPatchOpcode::InsStr,
            Op::InsBin { .. } => JsonCrdtPatchOpcode::InsBin,
            Op::InsArr { .. } => JsonCrdtPatchOpcode::InsArr,
            Op::UpdArr { .. } => JsonCrdtPatchOpcode::UpdArr,
            Op::Del { .. } => JsonCrdtPatchOpcode::Del,
            Op::Nop { .. } => JsonCrdtPatchOpcode::Nop,
        }
    }

    /// Kind of node created by this operation, for `new_*` operations.
    pub fn created_kind(&self) -> Option<JsonCrdtDataType> {
        match self {
            Op::NewCon { .. } => Some(JsonCrdtDataType::Con),
            Op::NewVal { .. } => Some(JsonCrdtDataType::Val),
            Op::NewObj { .. } => Some(JsonCrdtDataType::Obj),
            Op::NewVec { .. } => Some(JsonCrdtDataType::Vec),
            Op::NewStr { .. } => Some(JsonCrdtDataType::Str),
            Op::NewBin { .. } => Some(JsonCrdtDataType::Bin),
            Op::NewArr { .. } => Some(JsonCrdtDataType::Arr),
            _ => None,
        }
    }

    /// The node a mutation operation addresses, if any.
    pub fn target(&self) -> Option<Ts> {
        match self {
            Op::InsVal { obj, .. }
            | Op::InsObj { obj, .. }
            | Op::InsVec { obj, .. }
            | Op::InsStr { obj, .. }
            | Op::InsBin { obj, .. }
            | Op::InsArr { obj, .. }
            | Op::UpdArr { obj, .. }
            | Op::Del { obj, .. } => Some(*obj),
            _ => None,
        }
    }

    /// `true` for an `ins_val` that writes the document root.
    pub fn is_root_set(&self) -> bool {
        matches!(self, Op::InsVal { obj, .. } if *obj == ORIGIN)
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = self.id();
        let span = self.span();
        let base = if span > 1 {
            format!("{} {}!{}", self.name(), print_ts(id), span)
        } else {
            format!("{} {}", self.name(), print_ts(id))
        };
        match self {
            Op::InsVal { obj, val, .. } => write!(
                f,
                "{}, obj = {}, val = {}",
                base,
                print_ts(*obj),
                print_ts(*val)
            ),
            Op::InsObj { obj, data, .. } => {
                let pairs: Vec<_> = data
                    .iter()
                    .map(|(k, v)| format!("{:?}: {}", k, print_ts(*v)))
                    .collect();
                write!(f, "{}, obj = {} {{ {} }}", base, print_ts(*obj), pairs.join(", "))
            }
            Op::InsVec { obj, data, .. } => {
                let pairs: Vec<_> = data
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, print_ts(*v)))
                    .collect();
                write!(f, "{}, obj = {} {{ {} }}", base, print_ts(*obj), pairs.join(", "))
            }
            Op::InsStr {
                obj, after, data, ..
            } => write!(
                f,
                "{}, obj = {} {{ {} ← {:?} }}",
                base,
                print_ts(*obj),
                print_ts(*after),
                data
            ),
            Op::InsBin {
                obj, after, data, ..
            } => write!(
                f,
                "{}, obj = {} {{ {} ← {:?} }}",
                base,
                print_ts(*obj),
                print_ts(*after),
                data
            ),
            Op::InsArr {
                obj, after, data, ..
            } => {
                let ids: Vec<_> = data.iter().map(|v| print_ts(*v)).collect();
                write!(
                    f,
                    "{}, obj = {} {{ {} ← [{}] }}",
                    base,
                    print_ts(*obj),
                    print_ts(*after),
                    ids.join(", ")
                )
            }
            Op::UpdArr {
                obj, after, val, ..
            } => write!(
                f,
                "{}, obj = {} {{ {} ← {} }}",
                base,
                print_ts(*obj),
                print_ts(*after),
                print_ts(*val)
            ),
            Op::Del { obj, what, .. } => {
                let spans: Vec<_> = what
                    .iter()
                    .map(|s| format!("{}!{}", print_ts(s.ts()), s.span))
                    .collect();
                write!(
                    f,
                    "{}, obj = {} {{ {} }}",
                    base,
                    print_ts(*obj),
                    spans.join(", ")
                )
            }
            _ => write!(f, "{}", base),
        }
    }
}
