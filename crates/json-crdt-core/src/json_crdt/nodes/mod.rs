//! JSON CRDT node types.
//!
//! # Node Types
//!
//! | Rust type      | Semantics                          |
//! |----------------|------------------------------------|
//! | `ConNode`      | Immutable constant value           |
//! | `ValNode`      | Last-write-wins single register    |
//! | `ObjNode`      | LWW key→value map                  |
//! | `VecNode`      | Fixed-length LWW tuple             |
//! | `StrNode`      | RGA string of `char`s              |
//! | `BinNode`      | RGA binary blob                    |
//! | `ArrNode`      | RGA array of node references       |
//! | `RootNode`     | Document root (LWW register)       |
//!
//! LWW slots record the id of the operation that wrote them; a later write
//! wins only if its operation id compares greater.

pub mod rga;

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::json_crdt_patch::clock::{Ts, Tss};
use crate::json_crdt_patch::enums::JsonCrdtDataType;
use crate::json_crdt_patch::operations::ConValue;
use rga::{Insertion, Rga};

// ── LwwSlot ───────────────────────────────────────────────────────────────

/// One last-write-wins cell: the winning writer and the value it wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LwwSlot {
    /// Id of the operation that wrote `val`.
    pub id: Ts,
    /// Id of the node held by the slot.
    pub val: Ts,
}

impl LwwSlot {
    pub fn new(id: Ts, val: Ts) -> Self {
        Self { id, val }
    }
}

/// Writes `val` into `slot` if `op` is newer than the recorded writer.
fn lww_write(slot: &mut Option<LwwSlot>, op: Ts, val: Ts) -> bool {
    match slot {
        Some(current) if op <= current.id => false,
        _ => {
            *slot = Some(LwwSlot::new(op, val));
            true
        }
    }
}

/// Resolves `id` through the index, viewing missing nodes as `null`.
pub fn view_id(index: &NodeIndex, id: Ts) -> Value {
    match index.get(&id) {
        Some(node) => node.view(index),
        None => Value::Null,
    }
}

// ── ConNode ───────────────────────────────────────────────────────────────

/// Immutable constant node.
#[derive(Debug, Clone, PartialEq)]
pub struct ConNode {
    pub id: Ts,
    pub val: ConValue,
}

impl ConNode {
    pub fn new(id: Ts, val: ConValue) -> Self {
        Self { id, val }
    }

    /// JSON view; timestamp references and `undefined` view as `null`.
    pub fn view(&self) -> Value {
        match &self.val {
            ConValue::Val(v) => v.clone(),
            ConValue::Ref(_) | ConValue::Undef => Value::Null,
        }
    }
}

// ── ValNode ───────────────────────────────────────────────────────────────

/// Last-write-wins single-value register.
#[derive(Debug, Clone, PartialEq)]
pub struct ValNode {
    pub id: Ts,
    pub slot: Option<LwwSlot>,
}

impl ValNode {
    pub fn new(id: Ts) -> Self {
        Self { id, slot: None }
    }

    /// Id of the node currently held, if any write has landed.
    pub fn val(&self) -> Option<Ts> {
        self.slot.map(|s| s.val)
    }

    /// Applies the write `op` of `val`; returns `true` if it won.
    pub fn set(&mut self, op: Ts, val: Ts) -> bool {
        lww_write(&mut self.slot, op, val)
    }

    pub fn view(&self, index: &NodeIndex) -> Value {
        match self.val() {
            Some(id) => view_id(index, id),
            None => Value::Null,
        }
    }
}

// ── ObjNode ───────────────────────────────────────────────────────────────

/// Last-write-wins map from string keys to node ids.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjNode {
    pub id: Ts,
    pub keys: BTreeMap<String, LwwSlot>,
}

impl ObjNode {
    pub fn new(id: Ts) -> Self {
        Self {
            id,
            keys: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Ts> {
        self.keys.get(key).map(|s| s.val)
    }

    /// Applies the write `op` of `key = val`; returns `true` if it won.
    pub fn put(&mut self, key: &str, op: Ts, val: Ts) -> bool {
        match self.keys.get_mut(key) {
            Some(current) if op <= current.id => false,
            Some(current) => {
                *current = LwwSlot::new(op, val);
                true
            }
            None => {
                self.keys.insert(key.to_owned(), LwwSlot::new(op, val));
                true
            }
        }
    }

    /// Keys are emitted in sorted order.
    pub fn view(&self, index: &NodeIndex) -> Value {
        let map = self
            .keys
            .iter()
            .map(|(key, slot)| (key.clone(), view_id(index, slot.val)))
            .collect::<serde_json::Map<_, _>>();
        Value::Object(map)
    }
}

// ── VecNode ───────────────────────────────────────────────────────────────

/// Fixed-length LWW tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct VecNode {
    pub id: Ts,
    /// Indexed by position; `None` = never written.
    pub elements: Vec<Option<LwwSlot>>,
}

impl VecNode {
    pub fn new(id: Ts) -> Self {
        Self {
            id,
            elements: Vec::new(),
        }
    }

    pub fn get(&self, index: usize) -> Option<Ts> {
        self.elements.get(index).copied().flatten().map(|s| s.val)
    }

    /// Applies the write `op` of `slot = val`; returns `true` if it won.
    pub fn put(&mut self, index: usize, op: Ts, val: Ts) -> bool {
        if index >= self.elements.len() {
            self.elements.resize(index + 1, None);
        }
        lww_write(&mut self.elements[index], op, val)
    }

    /// Unset slots view as `null`.
    pub fn view(&self, index: &NodeIndex) -> Value {
        let items = self
            .elements
            .iter()
            .map(|slot| match slot {
                Some(slot) => view_id(index, slot.val),
                None => Value::Null,
            })
            .collect();
        Value::Array(items)
    }
}

// ── StrNode ───────────────────────────────────────────────────────────────

/// RGA string node; one element per `char`.
#[derive(Debug, Clone)]
pub struct StrNode {
    pub id: Ts,
    pub rga: Rga<String>,
}

impl StrNode {
    pub fn new(id: Ts) -> Self {
        Self {
            id,
            rga: Rga::new(id),
        }
    }

    pub fn ins(&mut self, after: Ts, id: Ts, data: String) -> Insertion {
        self.rga.insert(after, id, data)
    }

    pub fn delete(&mut self, spans: &[Tss]) -> u64 {
        self.rga.delete(spans)
    }

    pub fn view_str(&self) -> String {
        self.rga
            .iter_live()
            .filter_map(|c| c.data.as_deref())
            .collect()
    }

    pub fn view(&self) -> Value {
        Value::String(self.view_str())
    }
}

// ── BinNode ───────────────────────────────────────────────────────────────

/// RGA binary node.
#[derive(Debug, Clone)]
pub struct BinNode {
    pub id: Ts,
    pub rga: Rga<Vec<u8>>,
}

impl BinNode {
    pub fn new(id: Ts) -> Self {
        Self {
            id,
            rga: Rga::new(id),
        }
    }

    pub fn ins(&mut self, after: Ts, id: Ts, data: Vec<u8>) -> Insertion {
        self.rga.insert(after, id, data)
    }

    pub fn delete(&mut self, spans: &[Tss]) -> u64 {
        self.rga.delete(spans)
    }

    pub fn view_bytes(&self) -> Vec<u8> {
        self.rga
            .iter_live()
            .filter_map(|c| c.data.as_ref())
            .flatten()
            .copied()
            .collect()
    }

    /// JSON view: an array of byte values.
    pub fn view(&self) -> Value {
        Value::Array(self.view_bytes().into_iter().map(Value::from).collect())
    }
}

// ── ArrNode ───────────────────────────────────────────────────────────────

/// RGA array node; each element holds the id of a value node.
#[derive(Debug, Clone)]
pub struct ArrNode {
    pub id: Ts,
    pub rga: Rga<Vec<Ts>>,
}

impl ArrNode {
    pub fn new(id: Ts) -> Self {
        Self {
            id,
            rga: Rga::new(id),
        }
    }

    pub fn ins(&mut self, after: Ts, id: Ts, data: Vec<Ts>) -> Insertion {
        self.rga.insert(after, id, data)
    }

    /// Replaces the value of element `elem` if `val` is newer.
    pub fn upd(&mut self, elem: Ts, val: Ts) -> bool {
        self.rga.upd(elem, val)
    }

    pub fn delete(&mut self, spans: &[Tss]) -> u64 {
        self.rga.delete(spans)
    }

    /// Value ids of the visible elements, in order.
    pub fn values(&self) -> Vec<Ts> {
        self.rga
            .iter_live()
            .filter_map(|c| c.data.as_ref())
            .flatten()
            .copied()
            .collect()
    }

    /// Elements whose value node is missing view as `null`.
    pub fn view(&self, index: &NodeIndex) -> Value {
        Value::Array(
            self.values()
                .into_iter()
                .map(|id| view_id(index, id))
                .collect(),
        )
    }
}

// ── RootNode ──────────────────────────────────────────────────────────────

/// Document root: a LWW register pointing to the root JSON node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootNode {
    pub slot: Option<LwwSlot>,
}

impl RootNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn val(&self) -> Option<Ts> {
        self.slot.map(|s| s.val)
    }

    pub fn set(&mut self, op: Ts, val: Ts) -> bool {
        lww_write(&mut self.slot, op, val)
    }

    pub fn view(&self, index: &NodeIndex) -> Value {
        match self.val() {
            Some(id) => view_id(index, id),
            None => Value::Null,
        }
    }
}

// ── CrdtNode enum ─────────────────────────────────────────────────────────

/// All possible CRDT node types.
#[derive(Debug, Clone)]
pub enum CrdtNode {
    Con(ConNode),
    Val(ValNode),
    Obj(ObjNode),
    Vec(VecNode),
    Str(StrNode),
    Bin(BinNode),
    Arr(ArrNode),
}

impl CrdtNode {
    /// Creates an empty node of `kind`. Constants need a value, so `Con`
    /// starts out as `undefined`.
    pub fn empty(kind: JsonCrdtDataType, id: Ts) -> Self {
        match kind {
            JsonCrdtDataType::Con => Self::Con(ConNode::new(id, ConValue::Undef)),
            JsonCrdtDataType::Val => Self::Val(ValNode::new(id)),
            JsonCrdtDataType::Obj => Self::Obj(ObjNode::new(id)),
            JsonCrdtDataType::Vec => Self::Vec(VecNode::new(id)),
            JsonCrdtDataType::Str => Self::Str(StrNode::new(id)),
            JsonCrdtDataType::Bin => Self::Bin(BinNode::new(id)),
            JsonCrdtDataType::Arr => Self::Arr(ArrNode::new(id)),
        }
    }

    pub fn id(&self) -> Ts {
        match self {
            Self::Con(n) => n.id,
            Self::Val(n) => n.id,
            Self::Obj(n) => n.id,
            Self::Vec(n) => n.id,
            Self::Str(n) => n.id,
            Self::Bin(n) => n.id,
            Self::Arr(n) => n.id,
        }
    }

    pub fn kind(&self) -> JsonCrdtDataType {
        match self {
            Self::Con(_) => JsonCrdtDataType::Con,
            Self::Val(_) => JsonCrdtDataType::Val,
            Self::Obj(_) => JsonCrdtDataType::Obj,
            Self::Vec(_) => JsonCrdtDataType::Vec,
            Self::Str(_) => JsonCrdtDataType::Str,
            Self::Bin(_) => JsonCrdtDataType::Bin,
            Self::Arr(_) => JsonCrdtDataType::Arr,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Ids of the nodes this node currently points at, in view order.
    pub fn children(&self) -> Vec<Ts> {
        match self {
            Self::Con(_) | Self::Str(_) | Self::Bin(_) => Vec::new(),
            Self::Val(n) => n.val().into_iter().collect(),
            Self::Obj(n) => n.keys.values().map(|s| s.val).collect(),
            Self::Vec(n) => n.elements.iter().flatten().map(|s| s.val).collect(),
            Self::Arr(n) => n.values(),
        }
    }

    pub fn view(&self, index: &NodeIndex) -> Value {
        match self {
            Self::Con(n) => n.view(),
            Self::Val(n) => n.view(index),
            Self::Obj(n) => n.view(index),
            Self::Vec(n) => n.view(index),
            Self::Str(n) => n.view(),
            Self::Bin(n) => n.view(),
            Self::Arr(n) => n.view(index),
        }
    }
}

// ── NodeIndex ─────────────────────────────────────────────────────────────

/// Map from node id to CRDT node. Entries are never removed.
pub type NodeIndex = HashMap<Ts, CrdtNode>;
