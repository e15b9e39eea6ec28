//! Patch validation and replay.
//!
//! A patch is first checked as a whole: every mutation must address a node
//! of a kind it can modify. Only then are its operations replayed. During
//! replay, references to ids this replica has not seen yet and edges from a
//! container to a node that is not newer than it are absorbed and reported,
//! never fatal.

use std::collections::{HashMap, HashSet};

use super::{Model, ModelError, PatchReport, SkipReason};
use crate::json_crdt::nodes::rga::Insertion;
use crate::json_crdt::nodes::{ConNode, CrdtNode};
use crate::json_crdt_patch::clock::{Ts, Tss};
use crate::json_crdt_patch::constants::ORIGIN;
use crate::json_crdt_patch::enums::JsonCrdtDataType;
use crate::json_crdt_patch::operations::Op;
use crate::json_crdt_patch::patch::Patch;

/// Whether `op` may modify a node of `kind`.
fn accepts(op: &Op, kind: JsonCrdtDataType) -> bool {
    use JsonCrdtDataType as K;
    match op {
        Op::InsVal { .. } => kind == K::Val,
        Op::InsObj { .. } => kind == K::Obj,
        Op::InsVec { .. } => kind == K::Vec,
        Op::InsStr { .. } => kind == K::Str,
        Op::InsBin { .. } => kind == K::Bin,
        Op::InsArr { .. } | Op::UpdArr { .. } => kind == K::Arr,
        Op::Del { .. } => kind.is_sequence(),
        _ => true,
    }
}

fn malformed(op: &Op, reason: String) -> ModelError {
    ModelError::MalformedPatch { op: op.id(), reason }
}

impl Model {
    /// Apply all operations in `patch` to this model.
    ///
    /// The patch is validated before anything is mutated; a
    /// [`ModelError::MalformedPatch`] leaves the model untouched and fires
    /// no events. Applying the same patch again is a no-op apart from the
    /// `tick` counter and events.
    pub fn apply_patch(&mut self, patch: &Patch) -> Result<PatchReport, ModelError> {
        let patch_id = patch.get_id().unwrap_or(ORIGIN);
        if let Err(err) = self.check_ops(&patch.ops) {
            tracing::warn!(patch = %patch_id, error = %err, "rejected malformed patch");
            return Err(err);
        }
        self.events.emit_before_patch(patch);
        let mut report = PatchReport::default();
        let mut touched = HashSet::new();
        for op in &patch.ops {
            self.apply_op(op, &mut report, &mut touched);
        }
        self.compact_touched(&touched);
        self.tick += 1;
        tracing::debug!(
            patch = %patch_id,
            ops = report.ops,
            skipped = report.skipped.len(),
            time = self.clock.time,
            "applied patch"
        );
        self.events.emit_patch(patch);
        Ok(report)
    }

    /// Apply a single operation, validated the same way as a patch.
    ///
    /// No events fire and `tick` is left unchanged.
    pub fn apply_operation(&mut self, op: &Op) -> Result<PatchReport, ModelError> {
        self.check_ops(std::slice::from_ref(op))?;
        let mut report = PatchReport::default();
        let mut touched = HashSet::new();
        self.apply_op(op, &mut report, &mut touched);
        self.compact_touched(&touched);
        Ok(report)
    }

    /// Id range and kind checks against the index and the nodes created
    /// earlier in `ops`.
    fn check_ops(&self, ops: &[Op]) -> Result<(), ModelError> {
        let mut created: HashMap<Ts, JsonCrdtDataType> = HashMap::new();
        for op in ops {
            check_range(op)?;
            if let Some(kind) = op.created_kind() {
                created.entry(op.id()).or_insert(kind);
                continue;
            }
            let Some(target) = op.target() else {
                continue;
            };
            if target == ORIGIN {
                if op.is_root_set() {
                    continue;
                }
                return Err(malformed(
                    op,
                    format!("{} cannot target the document root", op.name()),
                ));
            }
            let kind = match self.index.get(&target) {
                Some(node) => Some(node.kind()),
                None => created.get(&target).copied(),
            };
            if let Some(kind) = kind {
                if !accepts(op, kind) {
                    return Err(malformed(
                        op,
                        format!("{} cannot target {kind} node {target}", op.name()),
                    ));
                }
            }
        }
        Ok(())
    }

    fn apply_op(&mut self, op: &Op, report: &mut PatchReport, touched: &mut HashSet<Ts>) {
        self.clock.observe(op.id(), op.span());
        report.ops += 1;
        tracing::trace!(op = %op, "apply op");
        match op {
            Op::NewCon { id, val } => {
                self.index
                    .entry(*id)
                    .or_insert_with(|| CrdtNode::Con(ConNode::new(*id, val.clone())));
            }
            Op::NewVal { id }
            | Op::NewObj { id }
            | Op::NewVec { id }
            | Op::NewStr { id }
            | Op::NewBin { id }
            | Op::NewArr { id } => {
                if let Some(kind) = op.created_kind() {
                    self.index
                        .entry(*id)
                        .or_insert_with(|| CrdtNode::empty(kind, *id));
                }
            }
            Op::InsVal { id, obj, val } => self.ins_val(*id, *obj, *val, report),
            Op::InsObj { id, obj, data } => self.ins_obj(*id, *obj, data, report),
            Op::InsVec { id, obj, data } => self.ins_vec(*id, *obj, data, report),
            Op::InsStr {
                id,
                obj,
                after,
                data,
            } => {
                let outcome = match self.index.get_mut(obj) {
                    Some(CrdtNode::Str(node)) => Some(node.ins(*after, *id, data.clone())),
                    _ => None,
                };
                self.record_insertion(*id, *obj, *after, outcome, report, touched);
            }
            Op::InsBin {
                id,
                obj,
                after,
                data,
            } => {
                let outcome = match self.index.get_mut(obj) {
                    Some(CrdtNode::Bin(node)) => Some(node.ins(*after, *id, data.clone())),
                    _ => None,
                };
                self.record_insertion(*id, *obj, *after, outcome, report, touched);
            }
            Op::InsArr {
                id,
                obj,
                after,
                data,
            } => self.ins_arr(*id, *obj, *after, data, report, touched),
            Op::UpdArr { id, obj, after, val } => self.upd_arr(*id, *obj, *after, *val, report),
            Op::Del { obj, what, .. } => {
                let removed = match self.index.get_mut(obj) {
                    Some(CrdtNode::Str(node)) => Some(node.delete(what)),
                    Some(CrdtNode::Bin(node)) => Some(node.delete(what)),
                    Some(CrdtNode::Arr(node)) => Some(node.delete(what)),
                    _ => None,
                };
                match removed {
                    None => skip_unknown(report, op.id(), *obj),
                    Some(0) => {}
                    Some(_) => {
                        touched.insert(*obj);
                    }
                }
            }
            Op::Nop { .. } => {}
        }
    }

    fn ins_val(&mut self, id: Ts, obj: Ts, val: Ts, report: &mut PatchReport) {
        if obj != ORIGIN && !self.index.contains_key(&obj) {
            return skip_unknown(report, id, obj);
        }
        if !self.index.contains_key(&val) {
            return skip_unknown(report, id, val);
        }
        if obj == ORIGIN {
            self.root.set(id, val);
            return;
        }
        if !is_newer(obj, val) {
            return skip_recursive(report, id, obj, val);
        }
        if let Some(CrdtNode::Val(node)) = self.index.get_mut(&obj) {
            node.set(id, val);
        }
    }

    fn ins_obj(&mut self, id: Ts, obj: Ts, data: &[(String, Ts)], report: &mut PatchReport) {
        if !self.index.contains_key(&obj) {
            return skip_unknown(report, id, obj);
        }
        for (i, (key, val)) in data.iter().enumerate() {
            // A key repeated within one operation: the last entry wins.
            if data[i + 1..].iter().any(|(k, _)| k == key) {
                continue;
            }
            if !self.index.contains_key(val) {
                skip_unknown(report, id, *val);
                continue;
            }
            if !is_newer(obj, *val) {
                skip_recursive(report, id, obj, *val);
                continue;
            }
            if let Some(CrdtNode::Obj(node)) = self.index.get_mut(&obj) {
                node.put(key, id, *val);
            }
        }
    }

    fn ins_vec(&mut self, id: Ts, obj: Ts, data: &[(u8, Ts)], report: &mut PatchReport) {
        if !self.index.contains_key(&obj) {
            return skip_unknown(report, id, obj);
        }
        for (i, (slot, val)) in data.iter().enumerate() {
            if data[i + 1..].iter().any(|(s, _)| s == slot) {
                continue;
            }
            if !self.index.contains_key(val) {
                skip_unknown(report, id, *val);
                continue;
            }
            if !is_newer(obj, *val) {
                skip_recursive(report, id, obj, *val);
                continue;
            }
            if let Some(CrdtNode::Vec(node)) = self.index.get_mut(&obj) {
                node.put(*slot as usize, id, *val);
            }
        }
    }

    /// Inserts every element so element ids stay contiguous, then
    /// tombstones the ones whose value is not newer than the array.
    fn ins_arr(
        &mut self,
        id: Ts,
        obj: Ts,
        after: Ts,
        data: &[Ts],
        report: &mut PatchReport,
        touched: &mut HashSet<Ts>,
    ) {
        let recursive: Vec<(u64, Ts)> = data
            .iter()
            .enumerate()
            .filter(|(_, val)| !is_newer(obj, **val))
            .map(|(i, val)| (i as u64, *val))
            .collect();
        let outcome = match self.index.get_mut(&obj) {
            Some(CrdtNode::Arr(node)) => {
                let outcome = node.ins(after, id, data.to_vec());
                if outcome == Insertion::Inserted && !recursive.is_empty() {
                    let spans: Vec<Tss> = recursive
                        .iter()
                        .map(|(offset, _)| Tss::new(id.sid, id.time + offset, 1))
                        .collect();
                    node.delete(&spans);
                }
                Some(outcome)
            }
            _ => None,
        };
        if outcome == Some(Insertion::Inserted) {
            for (_, child) in recursive {
                skip_recursive(report, id, obj, child);
            }
        }
        self.record_insertion(id, obj, after, outcome, report, touched);
    }

    fn upd_arr(&mut self, id: Ts, obj: Ts, after: Ts, val: Ts, report: &mut PatchReport) {
        if !self.index.contains_key(&obj) {
            return skip_unknown(report, id, obj);
        }
        if !self.index.contains_key(&val) {
            return skip_unknown(report, id, val);
        }
        if !is_newer(obj, val) {
            return skip_recursive(report, id, obj, val);
        }
        if let Some(CrdtNode::Arr(node)) = self.index.get_mut(&obj) {
            if node.rga.has(after) {
                node.upd(after, val);
            } else {
                skip_unknown(report, id, after);
            }
        }
    }

    fn record_insertion(
        &self,
        id: Ts,
        obj: Ts,
        after: Ts,
        outcome: Option<Insertion>,
        report: &mut PatchReport,
        touched: &mut HashSet<Ts>,
    ) {
        match outcome {
            None => skip_unknown(report, id, obj),
            Some(Insertion::UnknownAnchor) => skip_unknown(report, id, after),
            Some(Insertion::Inserted) => {
                touched.insert(obj);
            }
            Some(Insertion::Duplicate) | Some(Insertion::Empty) => {}
        }
    }

    fn compact_touched(&mut self, touched: &HashSet<Ts>) {
        let Some(threshold) = self.compact_threshold else {
            return;
        };
        for id in touched {
            let merged = match self.index.get_mut(id) {
                Some(CrdtNode::Str(n)) if n.rga.chunk_count() > threshold => n.rga.compact(),
                Some(CrdtNode::Bin(n)) if n.rga.chunk_count() > threshold => n.rga.compact(),
                Some(CrdtNode::Arr(n)) if n.rga.chunk_count() > threshold => n.rga.compact(),
                _ => 0,
            };
            if merged > 0 {
                tracing::debug!(node = %id, merged, "compacted sequence");
            }
        }
    }
}

/// A container only ever holds nodes created after it. The rule depends on
/// ids alone, so every replica keeps and drops the same edges and no cycle
/// can form.
fn is_newer(parent: Ts, child: Ts) -> bool {
    child.time > parent.time
}

/// Rejects ids whose range would run past the end of the clock.
fn check_range(op: &Op) -> Result<(), ModelError> {
    let id = op.id();
    if id.time.checked_add(op.span()).is_none() {
        return Err(malformed(
            op,
            format!("{} at {id} spans past the end of the clock", op.name()),
        ));
    }
    if let Op::Del { what, .. } = op {
        if let Some(t) = what.iter().find(|t| t.time.checked_add(t.span).is_none()) {
            return Err(malformed(
                op,
                format!("del range at {} spans past the end of the clock", t.ts()),
            ));
        }
    }
    Ok(())
}

fn skip_unknown(report: &mut PatchReport, op: Ts, missing: Ts) {
    tracing::debug!(op = %op, missing = %missing, "skipped reference to unknown id");
    report.skip(op, SkipReason::UnknownReference(missing));
}

fn skip_recursive(report: &mut PatchReport, op: Ts, parent: Ts, child: Ts) {
    tracing::warn!(op = %op, parent = %parent, child = %child, "dropped edge to older node");
    report.skip(op, SkipReason::RecursiveReference { parent, child });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_crdt::model::ModelOptions;
    use crate::json_crdt_patch::clock::{ts, tss};
    use crate::json_crdt_patch::operations::ConValue;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const SID: u64 = 123_456;

    fn patch(ops: Vec<Op>) -> Patch {
        Patch { ops, meta: None }
    }

    #[test]
    fn new_con_then_set_root() {
        let mut model = Model::new(SID);
        let report = model
            .apply_patch(&patch(vec![
                Op::NewCon {
                    id: ts(SID, 1),
                    val: ConValue::Val(json!(42)),
                },
                Op::InsVal {
                    id: ts(SID, 2),
                    obj: ORIGIN,
                    val: ts(SID, 1),
                },
            ]))
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(report.ops, 2);
        assert_eq!(model.view(), json!(42));
        assert_eq!(model.clock.time, 3);
        assert_eq!(model.tick, 1);
    }

    #[test]
    fn str_insert_and_delete() {
        let mut model = Model::new(SID);
        model
            .apply_patch(&patch(vec![
                Op::NewStr { id: ts(SID, 1) },
                Op::InsStr {
                    id: ts(SID, 2),
                    obj: ts(SID, 1),
                    after: ts(SID, 1),
                    data: "hello".into(),
                },
                Op::InsVal {
                    id: ts(SID, 7),
                    obj: ORIGIN,
                    val: ts(SID, 1),
                },
                Op::Del {
                    id: ts(SID, 8),
                    obj: ts(SID, 1),
                    what: vec![tss(SID, 3, 3)],
                },
            ]))
            .unwrap();
        assert_eq!(model.view(), json!("ho"));
        model.validate_invariants().unwrap();
    }

    #[test]
    fn kind_mismatch_rejects_whole_patch() {
        let mut model = Model::new(SID);
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        model.on_before_patch(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let bad = patch(vec![
            Op::NewObj { id: ts(SID, 1) },
            Op::InsVal {
                id: ts(SID, 2),
                obj: ORIGIN,
                val: ts(SID, 1),
            },
            Op::InsStr {
                id: ts(SID, 3),
                obj: ts(SID, 1),
                after: ts(SID, 1),
                data: "x".into(),
            },
        ]);
        let err = model.apply_patch(&bad).unwrap_err();
        assert!(matches!(err, ModelError::MalformedPatch { op, .. } if op == ts(SID, 3)));
        assert!(model.index.is_empty());
        assert_eq!(model.view(), json!(null));
        assert_eq!(model.clock.time, 1);
        assert_eq!(model.tick, 0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn kind_mismatch_against_existing_node() {
        let mut model = Model::new(SID);
        model
            .apply_patch(&patch(vec![Op::NewVal { id: ts(SID, 1) }]))
            .unwrap();
        let err = model
            .apply_patch(&patch(vec![Op::Del {
                id: ts(SID, 2),
                obj: ts(SID, 1),
                what: vec![tss(SID, 1, 1)],
            }]))
            .unwrap_err();
        assert!(err.to_string().contains("del cannot target val node"));
    }

    #[test]
    fn only_ins_val_may_target_root() {
        let mut model = Model::new(SID);
        let err = model
            .apply_operation(&Op::InsObj {
                id: ts(SID, 1),
                obj: ORIGIN,
                data: vec![("a".into(), ts(SID, 1))],
            })
            .unwrap_err();
        assert!(matches!(err, ModelError::MalformedPatch { .. }));
    }

    #[test]
    fn unknown_references_are_skipped() {
        let mut model = Model::new(SID);
        let report = model
            .apply_patch(&patch(vec![
                Op::NewObj { id: ts(SID, 1) },
                Op::InsObj {
                    id: ts(SID, 2),
                    obj: ts(SID, 1),
                    data: vec![("a".into(), ts(99, 9))],
                },
                Op::InsStr {
                    id: ts(SID, 3),
                    obj: ts(77, 1),
                    after: ts(77, 1),
                    data: "x".into(),
                },
                Op::InsVal {
                    id: ts(SID, 4),
                    obj: ORIGIN,
                    val: ts(SID, 1),
                },
            ]))
            .unwrap();
        assert_eq!(
            report.skipped,
            vec![
                super::super::Skipped {
                    op: ts(SID, 2),
                    reason: SkipReason::UnknownReference(ts(99, 9)),
                },
                super::super::Skipped {
                    op: ts(SID, 3),
                    reason: SkipReason::UnknownReference(ts(77, 1)),
                },
            ]
        );
        assert_eq!(model.view(), json!({}));
        // The clock still moves past every observed id.
        assert_eq!(model.clock.time, 5);
    }

    #[test]
    fn ranges_past_the_clock_end_are_malformed() {
        let mut model = Model::new(SID);
        model
            .apply_patch(&patch(vec![
                Op::NewStr { id: ts(SID, 1) },
                Op::InsStr {
                    id: ts(SID, 2),
                    obj: ts(SID, 1),
                    after: ts(SID, 1),
                    data: "hello".into(),
                },
                Op::InsVal {
                    id: ts(SID, 7),
                    obj: ORIGIN,
                    val: ts(SID, 1),
                },
            ]))
            .unwrap();
        let before = model.snapshot();

        let err = model
            .apply_patch(&patch(vec![Op::Del {
                id: ts(100_001, 8),
                obj: ts(SID, 1),
                what: vec![tss(100_001, u64::MAX - 1, 5)],
            }]))
            .unwrap_err();
        assert!(matches!(err, ModelError::MalformedPatch { op, .. } if op == ts(100_001, 8)));

        let err = model
            .apply_operation(&Op::InsStr {
                id: ts(100_001, u64::MAX - 1),
                obj: ts(SID, 1),
                after: ts(SID, 1),
                data: "abc".into(),
            })
            .unwrap_err();
        assert!(err.to_string().contains("past the end of the clock"));

        assert_eq!(model.snapshot(), before);
        assert_eq!(model.view(), json!("hello"));
    }

    #[test]
    fn older_child_is_rejected_without_a_cycle() {
        let mut model = Model::new(SID);
        let report = model
            .apply_patch(&patch(vec![
                Op::NewObj { id: ts(SID, 1) },
                Op::NewObj { id: ts(SID, 2) },
                Op::InsVal {
                    id: ts(SID, 3),
                    obj: ORIGIN,
                    val: ts(SID, 2),
                },
                // Node 1 is detached, yet still older than its would-be parent.
                Op::InsObj {
                    id: ts(SID, 4),
                    obj: ts(SID, 2),
                    data: vec![("older".into(), ts(SID, 1))],
                },
            ]))
            .unwrap();
        assert_eq!(
            report.skipped,
            vec![super::super::Skipped {
                op: ts(SID, 4),
                reason: SkipReason::RecursiveReference {
                    parent: ts(SID, 2),
                    child: ts(SID, 1),
                },
            }]
        );
        assert_eq!(model.view(), json!({}));
    }

    #[test]
    fn recursive_register_edge_is_dropped() {
        let mut model = Model::new(SID);
        let report = model
            .apply_patch(&patch(vec![
                Op::NewVal { id: ts(SID, 1) },
                Op::NewObj { id: ts(SID, 2) },
                Op::InsVal {
                    id: ts(SID, 3),
                    obj: ts(SID, 1),
                    val: ts(SID, 2),
                },
                Op::InsObj {
                    id: ts(SID, 4),
                    obj: ts(SID, 2),
                    data: vec![("self".into(), ts(SID, 2)), ("up".into(), ts(SID, 1))],
                },
                Op::InsVal {
                    id: ts(SID, 5),
                    obj: ORIGIN,
                    val: ts(SID, 1),
                },
            ]))
            .unwrap();
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped.iter().all(|s| matches!(
            s.reason,
            SkipReason::RecursiveReference { parent, .. } if parent == ts(SID, 2)
        )));
        assert_eq!(model.view(), json!({}));
        model.validate_invariants().unwrap();
    }

    #[test]
    fn recursive_array_element_is_tombstoned() {
        let mut model = Model::new(SID);
        let report = model
            .apply_patch(&patch(vec![
                Op::NewArr { id: ts(SID, 1) },
                Op::NewCon {
                    id: ts(SID, 2),
                    val: ConValue::Val(json!(1)),
                },
                Op::InsArr {
                    id: ts(SID, 3),
                    obj: ts(SID, 1),
                    after: ts(SID, 1),
                    data: vec![ts(SID, 2), ts(SID, 1), ts(SID, 2)],
                },
                Op::InsVal {
                    id: ts(SID, 6),
                    obj: ORIGIN,
                    val: ts(SID, 1),
                },
            ]))
            .unwrap();
        assert_eq!(
            report.skipped,
            vec![super::super::Skipped {
                op: ts(SID, 3),
                reason: SkipReason::RecursiveReference {
                    parent: ts(SID, 1),
                    child: ts(SID, 1),
                },
            }]
        );
        assert_eq!(model.view(), json!([1, 1]));
        model.validate_invariants().unwrap();
    }

    #[test]
    fn duplicate_keys_in_one_op_last_wins() {
        let mut model = Model::new(SID);
        model
            .apply_patch(&patch(vec![
                Op::NewObj { id: ts(SID, 1) },
                Op::NewCon {
                    id: ts(SID, 2),
                    val: ConValue::Val(json!("first")),
                },
                Op::NewCon {
                    id: ts(SID, 3),
                    val: ConValue::Val(json!("second")),
                },
                Op::InsObj {
                    id: ts(SID, 4),
                    obj: ts(SID, 1),
                    data: vec![("k".into(), ts(SID, 3)), ("k".into(), ts(SID, 2))],
                },
                Op::InsVal {
                    id: ts(SID, 5),
                    obj: ORIGIN,
                    val: ts(SID, 1),
                },
            ]))
            .unwrap();
        assert_eq!(model.view(), json!({"k": "first"}));
    }

    #[test]
    fn reapplying_patch_is_noop() {
        let mut model = Model::new(SID);
        let mut builder = model.builder();
        let s = builder.json(&json!({"list": [1, 2], "text": "abc"}));
        builder.root(s);
        let p = builder.flush();
        model.apply_patch(&p).unwrap();
        let view = model.view();
        let chunks: usize = model
            .index
            .values()
            .map(|n| match n {
                CrdtNode::Str(s) => s.rga.chunk_count(),
                CrdtNode::Arr(a) => a.rga.chunk_count(),
                _ => 0,
            })
            .sum();
        model.apply_patch(&p).unwrap();
        assert_eq!(model.view(), view);
        let chunks_after: usize = model
            .index
            .values()
            .map(|n| match n {
                CrdtNode::Str(s) => s.rga.chunk_count(),
                CrdtNode::Arr(a) => a.rga.chunk_count(),
                _ => 0,
            })
            .sum();
        assert_eq!(chunks, chunks_after);
    }

    #[test]
    fn upd_arr_replaces_element_value() {
        let mut model = Model::new(SID);
        let mut b = model.builder();
        let arr = b.arr();
        let one = b.con_val(json!(1));
        let first = b.ins_arr(arr, arr, vec![one]);
        b.root(arr);
        model.apply_patch(&b.flush()).unwrap();

        let mut b = model.builder();
        let two = b.con_val(json!(2));
        b.upd_arr(arr, first, two);
        b.upd_arr(arr, ts(SID, 999), two);
        let report = model.apply_patch(&b.flush()).unwrap();
        assert_eq!(model.view(), json!([2]));
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::UnknownReference(ts(SID, 999))
        );
    }

    #[test]
    fn compact_threshold_merges_chunks() {
        let mut model = Model::with_options(ModelOptions {
            sid: Some(SID),
            compact_threshold: Some(2),
        })
        .unwrap();
        let mut b = model.builder();
        let s = b.str_node();
        b.root(s);
        let mut after = s;
        for ch in ["a", "b", "c", "d"] {
            after = b.ins_str(s, after, ch);
        }
        model.apply_patch(&b.flush()).unwrap();
        assert_eq!(model.view(), json!("abcd"));
        match model.get(s) {
            Some(CrdtNode::Str(node)) => assert_eq!(node.rga.chunk_count(), 1),
            other => panic!("expected str node, got {other:?}"),
        }
        model.validate_invariants().unwrap();
    }

    #[test]
    fn apply_operation_keeps_tick() {
        let mut model = Model::new(SID);
        model
            .apply_operation(&Op::NewStr { id: ts(SID, 1) })
            .unwrap();
        assert_eq!(model.tick, 0);
        assert!(model.get(ts(SID, 1)).is_some());
        assert_eq!(model.clock.time, 2);
    }
}
