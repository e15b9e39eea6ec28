#![allow(dead_code)]

use json_crdt_core::json_crdt::model::Model;
use json_crdt_core::json_crdt::nodes::{ArrNode, CrdtNode, StrNode};
use json_crdt_core::json_crdt_patch::clock::Ts;
use json_crdt_core::json_crdt_patch::patch::Patch;
use serde_json::Value;

/// A model whose root is a text node holding `text`.
pub fn text_doc(sid: u64, text: &str) -> (Model, Ts) {
    let mut model = Model::new(sid);
    let mut b = model.builder();
    let s = b.str_node();
    if !text.is_empty() {
        b.ins_str(s, s, text);
    }
    b.root(s);
    model.apply_patch(&b.flush()).expect("seed patch");
    (model, s)
}

/// A model whose root is built from `value`.
pub fn json_doc(sid: u64, value: &Value) -> (Model, Ts) {
    let mut model = Model::new(sid);
    let mut b = model.builder();
    let id = b.json(value);
    b.root(id);
    model.apply_patch(&b.flush()).expect("seed patch");
    (model, id)
}

pub fn str_node(model: &Model, id: Ts) -> &StrNode {
    match model.get(id) {
        Some(CrdtNode::Str(node)) => node,
        other => panic!("expected str node at {id}, got {other:?}"),
    }
}

pub fn arr_node(model: &Model, id: Ts) -> &ArrNode {
    match model.get(id) {
        Some(CrdtNode::Arr(node)) => node,
        other => panic!("expected arr node at {id}, got {other:?}"),
    }
}

/// Inserts `text` at visible position `pos` (clamped), applies the patch
/// locally and returns it.
pub fn insert_text(model: &mut Model, id: Ts, pos: u64, text: &str) -> Patch {
    let node = str_node(model, id);
    let pos = pos.min(node.rga.len());
    let after = if pos == 0 {
        id
    } else {
        node.rga.find(pos - 1).expect("position in range")
    };
    let mut b = model.builder();
    b.ins_str(id, after, text);
    let patch = b.flush();
    model.apply_patch(&patch).expect("local insert");
    patch
}

/// Deletes up to `len` visible chars from `pos`; `None` when nothing is
/// left to delete there.
pub fn delete_text(model: &mut Model, id: Ts, pos: u64, len: u64) -> Option<Patch> {
    let spans = str_node(model, id).rga.find_interval(pos, len);
    if spans.is_empty() {
        return None;
    }
    let mut b = model.builder();
    b.del(id, spans);
    let patch = b.flush();
    model.apply_patch(&patch).expect("local delete");
    Some(patch)
}

/// All orderings of `items`.
pub fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            out.push(tail);
        }
    }
    out
}
