//! [`PatchBuilder`]: fluent builder for constructing [`Patch`]es.

use crate::json_crdt_patch::clock::{ts, ClockVector, LogicalClock, Ts, Tss};
use crate::json_crdt_patch::constants::ORIGIN;
use crate::json_crdt_patch::operations::{ConValue, Op};
use crate::json_crdt_patch::patch::Patch;
use serde_json::Value;

/// Utility for constructing a [`Patch`] operation by operation.
///
/// Ids are reserved from the builder's own [`LogicalClock`]; nothing is
/// visible to a model until the flushed patch is applied.
#[derive(Debug, Clone)]
pub struct PatchBuilder {
    pub clock: LogicalClock,
    pub patch: Patch,
}

impl PatchBuilder {
    /// Creates a new builder writing as `sid`, starting at `time`.
    pub fn new(sid: u64, time: u64) -> Self {
        Self {
            clock: LogicalClock::new(sid, time),
            patch: Patch::new(),
        }
    }

    /// Creates a builder continuing a model's [`ClockVector`].
    pub fn from_clock_vector(cv: &ClockVector) -> Self {
        Self::new(cv.sid, cv.time)
    }

    /// Returns the sequence number of the next operation's timestamp.
    pub fn next_time(&self) -> u64 {
        let patch_next = self.patch.next_time();
        if patch_next == 0 {
            self.clock.time
        } else {
            patch_next
        }
    }

    /// Returns the current patch and resets the builder.
    pub fn flush(&mut self) -> Patch {
        std::mem::take(&mut self.patch)
    }

    // ── Padding ────────────────────────────────────────────────────────────

    /// Adds a `Nop` if the clock has drifted ahead of the patch's last op.
    pub fn pad(&mut self) {
        let next_time = self.patch.next_time();
        if next_time == 0 {
            return;
        }
        let drift = self.clock.time.saturating_sub(next_time);
        if drift > 0 {
            let id = ts(self.clock.sid, next_time);
            self.patch.ops.push(Op::Nop { id, len: drift });
        }
    }

    fn push(&mut self, op: impl FnOnce(Ts) -> Op) -> Ts {
        self.pad();
        let id = self.clock.tick(1);
        let op = op(id);
        let span = op.span();
        if span > 1 {
            self.clock.tick(span - 1);
        }
        self.patch.ops.push(op);
        id
    }

    // ── Creation operations ────────────────────────────────────────────────

    /// Create a new `con` constant holding a JSON value.
    pub fn con_val(&mut self, val: Value) -> Ts {
        self.push(|id| Op::NewCon {
            id,
            val: ConValue::Val(val),
        })
    }

    /// Create a new `con` constant referencing another operation ID.
    pub fn con_ref(&mut self, ref_id: Ts) -> Ts {
        self.push(|id| Op::NewCon {
            id,
            val: ConValue::Ref(ref_id),
        })
    }

    /// Create a new `con` constant holding `undefined`.
    pub fn con_undef(&mut self) -> Ts {
        self.push(|id| Op::NewCon {
            id,
            val: ConValue::Undef,
        })
    }

    /// Create a new `val` LWW-Register.
    pub fn val(&mut self) -> Ts {
        self.push(|id| Op::NewVal { id })
    }

    /// Create a new `obj` LWW-Map.
    pub fn obj(&mut self) -> Ts {
        self.push(|id| Op::NewObj { id })
    }

    /// Create a new `vec` LWW-Vector.
    pub fn vec(&mut self) -> Ts {
        self.push(|id| Op::NewVec { id })
    }

    /// Create a new `str` RGA-String.
    pub fn str_node(&mut self) -> Ts {
        self.push(|id| Op::NewStr { id })
    }

    /// Create a new `bin` RGA-Binary.
    pub fn bin(&mut self) -> Ts {
        self.push(|id| Op::NewBin { id })
    }

    /// Create a new `arr` RGA-Array.
    pub fn arr(&mut self) -> Ts {
        self.push(|id| Op::NewArr { id })
    }

    // ── Mutation operations ────────────────────────────────────────────────

    /// Set the value of the document root register.
    pub fn root(&mut self, val: Ts) -> Ts {
        self.set_val(ORIGIN, val)
    }

    /// Set the value of a `val` register.
    pub fn set_val(&mut self, obj: Ts, val: Ts) -> Ts {
        self.push(|id| Op::InsVal { id, obj, val })
    }

    /// Set key→value pairs in an `obj`.
    ///
    /// # Panics
    ///
    /// Panics if `data` is empty.
    pub fn ins_obj(&mut self, obj: Ts, data: Vec<(String, Ts)>) -> Ts {
        assert!(!data.is_empty(), "EMPTY_TUPLES");
        self.push(|id| Op::InsObj { id, obj, data })
    }

    /// Set index→value pairs in a `vec`.
    ///
    /// # Panics
    ///
    /// Panics if `data` is empty.
    pub fn ins_vec(&mut self, obj: Ts, data: Vec<(u8, Ts)>) -> Ts {
        assert!(!data.is_empty(), "EMPTY_TUPLES");
        self.push(|id| Op::InsVec { id, obj, data })
    }

    /// Insert a string into a `str` object.
    ///
    /// # Panics
    ///
    /// Panics if `data` is empty.
    pub fn ins_str(&mut self, obj: Ts, after: Ts, data: impl Into<String>) -> Ts {
        let data = data.into();
        assert!(!data.is_empty(), "EMPTY_STRING");
        self.push(|id| Op::InsStr {
            id,
            obj,
            after,
            data,
        })
    }

    /// Insert binary data into a `bin` object.
    ///
    /// # Panics
    ///
    /// Panics if `data` is empty.
    pub fn ins_bin(&mut self, obj: Ts, after: Ts, data: Vec<u8>) -> Ts {
        assert!(!data.is_empty(), "EMPTY_BINARY");
        self.push(|id| Op::InsBin {
            id,
            obj,
            after,
            data,
        })
    }

    /// Insert elements into an `arr` object.
    ///
    /// # Panics
    ///
    /// Panics if `data` is empty.
    pub fn ins_arr(&mut self, arr: Ts, after: Ts, data: Vec<Ts>) -> Ts {
        assert!(!data.is_empty(), "EMPTY_ARRAY");
        self.push(|id| Op::InsArr {
            id,
            obj: arr,
            after,
            data,
        })
    }

    /// Replace the value of the `arr` element identified by `after`.
    pub fn upd_arr(&mut self, arr: Ts, after: Ts, val: Ts) -> Ts {
        self.push(|id| Op::UpdArr {
            id,
            obj: arr,
            after,
            val,
        })
    }

    /// Delete spans of elements in a `str`, `bin` or `arr`.
    pub fn del(&mut self, obj: Ts, what: Vec<Tss>) -> Ts {
        self.push(|id| Op::Del { id, obj, what })
    }

    /// Insert a no-op of the given span.
    pub fn nop(&mut self, span: u64) -> Ts {
        self.pad();
        let id = self.clock.tick(span);
        self.patch.ops.push(Op::Nop { id, len: span });
        id
    }

    // ── JSON helpers ───────────────────────────────────────────────────────

    /// Builds a node tree mirroring a plain JSON value and returns its id.
    ///
    /// Objects become `obj`, arrays become `arr`, strings become `str`
    /// and every other value becomes a `con`.
    pub fn json(&mut self, value: &Value) -> Ts {
        match value {
            Value::Object(map) => {
                let id = self.obj();
                if !map.is_empty() {
                    let data = map
                        .iter()
                        .map(|(k, v)| (k.clone(), self.json(v)))
                        .collect();
                    self.ins_obj(id, data);
                }
                id
            }
            Value::Array(items) => {
                let id = self.arr();
                if !items.is_empty() {
                    let data = items.iter().map(|v| self.json(v)).collect();
                    self.ins_arr(id, id, data);
                }
                id
            }
            Value::String(text) => {
                let id = self.str_node();
                if !text.is_empty() {
                    self.ins_str(id, id, text.as_str());
                }
                id
            }
            other => self.con_val(other.clone()),
        }
    }
}
