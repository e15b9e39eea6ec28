//! Property tests for the merge rules:
//!  - sequences converge whatever order concurrent patches arrive in
//!  - so do documents mixing array edits with map writes of nested values
//!  - concurrent inserts at one anchor settle in descending id order
//!  - LWW slots keep the write with the greatest id

mod common;

use common::{arr_node, delete_text, insert_text, json_doc, text_doc};
use json_crdt_core::json_crdt::model::Model;
use json_crdt_core::json_crdt::CrdtNode;
use json_crdt_core::json_crdt_patch::clock::{ts, Ts};
use json_crdt_core::json_crdt_patch::constants::ORIGIN;
use json_crdt_core::json_crdt_patch::operations::{ConValue, Op};
use json_crdt_core::json_crdt_patch::patch::Patch;
use proptest::prelude::*;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
enum Edit {
    Insert(u64, String),
    Delete(u64, u64),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => (0u64..20, "[a-z]{1,4}").prop_map(|(pos, text)| Edit::Insert(pos, text)),
        1 => (0u64..20, 1u64..5).prop_map(|(pos, len)| Edit::Delete(pos, len)),
    ]
}

#[derive(Debug, Clone)]
enum DocEdit {
    ArrInsert(u64, i64),
    ArrDelete(u64, u64),
    MapSet(&'static str, Value),
}

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,3}".prop_map(Value::from),
        prop::collection::vec(0i64..10, 0..3).prop_map(|items| json!(items)),
        (any::<bool>(), "[a-z]{1,3}").prop_map(|(flag, tag)| json!({"flag": flag, "tags": [tag]})),
    ]
}

fn doc_edit_strategy() -> impl Strategy<Value = DocEdit> {
    prop_oneof![
        3 => (0u64..8, any::<i64>()).prop_map(|(pos, n)| DocEdit::ArrInsert(pos, n)),
        1 => (0u64..8, 1u64..3).prop_map(|(pos, len)| DocEdit::ArrDelete(pos, len)),
        2 => (prop::sample::select(vec!["a", "b", "c"]), value_strategy())
            .prop_map(|(key, value)| DocEdit::MapSet(key, value)),
    ]
}

/// Edits per replica, plus a delivery schedule naming which replica's
/// next patch goes out at each step.
fn workload<S>(edit: S) -> impl Strategy<Value = (Vec<Vec<S::Value>>, Vec<usize>)>
where
    S: Strategy,
    S::Value: Clone,
{
    prop::collection::vec(prop::collection::vec(edit, 1..8), 2..4).prop_flat_map(|edits| {
        let schedule: Vec<usize> = edits
            .iter()
            .enumerate()
            .flat_map(|(i, e)| std::iter::repeat(i).take(e.len()))
            .collect();
        (Just(edits), Just(schedule).prop_shuffle())
    })
}

/// One replica receives every stream in order, the other follows the
/// shuffled `schedule` and gets each patch twice.
fn deliver(base: &Model, streams: &[Vec<Patch>], schedule: &[usize]) -> (Model, Model) {
    let mut in_order = base.fork();
    for stream in streams {
        for patch in stream {
            in_order.apply_patch(patch).unwrap();
        }
    }
    let mut shuffled = base.fork();
    let mut cursor = vec![0usize; streams.len()];
    for &i in schedule {
        let patch = &streams[i][cursor[i]];
        cursor[i] += 1;
        shuffled.apply_patch(patch).unwrap();
        shuffled.apply_patch(patch).unwrap();
    }
    (in_order, shuffled)
}

fn run_edits(replica: &mut Model, text: Ts, edits: &[Edit]) -> Vec<Patch> {
    edits
        .iter()
        .map(|edit| match edit {
            Edit::Insert(pos, s) => insert_text(replica, text, *pos, s),
            // A delete past the end produces no ops.
            Edit::Delete(pos, len) => delete_text(replica, text, *pos, *len).unwrap_or_default(),
        })
        .collect()
}

fn run_doc_edits(replica: &mut Model, list: Ts, map: Ts, edits: &[DocEdit]) -> Vec<Patch> {
    edits
        .iter()
        .map(|edit| {
            let mut b = replica.builder();
            match edit {
                DocEdit::ArrInsert(pos, n) => {
                    let rga = &arr_node(replica, list).rga;
                    let pos = (*pos).min(rga.len());
                    let after = if pos == 0 { list } else { rga.find(pos - 1).unwrap() };
                    let item = b.con_val(json!(n));
                    b.ins_arr(list, after, vec![item]);
                }
                DocEdit::ArrDelete(pos, len) => {
                    let spans = arr_node(replica, list).rga.find_interval(*pos, *len);
                    if spans.is_empty() {
                        return Patch::default();
                    }
                    b.del(list, spans);
                }
                DocEdit::MapSet(key, value) => {
                    let item = b.json(value);
                    b.ins_obj(map, vec![(key.to_string(), item)]);
                }
            }
            let patch = b.flush();
            replica.apply_patch(&patch).unwrap();
            patch
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn text_replicas_converge((edits, schedule) in workload(edit_strategy())) {
        let (base, text) = text_doc(100_000, "seed");
        let streams: Vec<Vec<Patch>> = edits
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let mut replica = base.fork_with_sid(100_001 + i as u64).unwrap();
                run_edits(&mut replica, text, e)
            })
            .collect();

        let (in_order, shuffled) = deliver(&base, &streams, &schedule);
        prop_assert_eq!(in_order.view(), shuffled.view());
        in_order.validate_invariants().unwrap();
        shuffled.validate_invariants().unwrap();
    }

    #[test]
    fn arrays_and_nested_maps_converge((edits, schedule) in workload(doc_edit_strategy())) {
        let (base, root) = json_doc(100_000, &json!({"list": [0, 1, 2], "map": {}}));
        let (list, map) = match base.get(root) {
            Some(CrdtNode::Obj(o)) => (o.get("list").unwrap(), o.get("map").unwrap()),
            other => panic!("root is not an object: {other:?}"),
        };
        let streams: Vec<Vec<Patch>> = edits
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let mut replica = base.fork_with_sid(100_001 + i as u64).unwrap();
                run_doc_edits(&mut replica, list, map, e)
            })
            .collect();

        let (in_order, shuffled) = deliver(&base, &streams, &schedule);
        prop_assert_eq!(in_order.view(), shuffled.view());
        in_order.validate_invariants().unwrap();
        shuffled.validate_invariants().unwrap();
        let view = shuffled.view();
        prop_assert!(view["map"]
            .as_object()
            .unwrap()
            .keys()
            .all(|k| ["a", "b", "c"].contains(&k.as_str())));
        prop_assert!(view["list"].as_array().unwrap().iter().all(Value::is_i64));
    }

    #[test]
    fn same_anchor_inserts_order_by_descending_id(
        sid_a in 100_001u64..200_000,
        sid_b in 200_001u64..300_000,
        time_a in 10u64..20,
        time_b in 10u64..20,
        text_a in "[a-m]{1,3}",
        text_b in "[n-z]{1,3}",
    ) {
        let (base, text) = text_doc(100_000, "xy");
        let anchor = common::str_node(&base, text).rga.find(0).unwrap();
        let ins = |sid: u64, time: u64, data: &str| Patch {
            ops: vec![Op::InsStr { id: ts(sid, time), obj: text, after: anchor, data: data.into() }],
            meta: None,
        };
        let pa = ins(sid_a, time_a, &text_a);
        let pb = ins(sid_b, time_b, &text_b);

        let mut ab = base.fork();
        ab.apply_patch(&pa).unwrap();
        ab.apply_patch(&pb).unwrap();
        let mut ba = base.fork();
        ba.apply_patch(&pb).unwrap();
        ba.apply_patch(&pa).unwrap();
        prop_assert_eq!(ab.view(), ba.view());

        let (first, second) = if ts(sid_a, time_a) > ts(sid_b, time_b) {
            (&text_a, &text_b)
        } else {
            (&text_b, &text_a)
        };
        prop_assert_eq!(ab.view(), json!(format!("x{first}{second}y")));
    }

    #[test]
    fn register_keeps_greatest_write(
        writes in prop::collection::vec((100_001u64..100_010, 10u64..30, any::<i32>()), 1..6)
            .prop_shuffle()
    ) {
        let mut model = Model::new(999_999);
        let setup = Patch {
            ops: vec![
                Op::NewVal { id: ts(100_000, 1) },
                Op::InsVal { id: ts(100_000, 2), obj: ORIGIN, val: ts(100_000, 1) },
            ],
            meta: None,
        };
        model.apply_patch(&setup).unwrap();

        // Every writer creates its constant at `time` and writes it at
        // `time + 1`; duplicate ids collapse onto the first arrival.
        let mut winner: Option<(Ts, i32)> = None;
        let mut seen = std::collections::HashSet::new();
        for (sid, time, value) in &writes {
            let con = ts(*sid, *time);
            let write = ts(*sid, time + 1);
            let patch = Patch {
                ops: vec![
                    Op::NewCon { id: con, val: ConValue::Val(json!(value)) },
                    Op::InsVal { id: write, obj: ts(100_000, 1), val: con },
                ],
                meta: None,
            };
            model.apply_patch(&patch).unwrap();
            if seen.insert(con) && winner.map_or(true, |(id, _)| write > id) {
                winner = Some((write, *value));
            }
        }
        let expected = winner.map(|(_, v)| v).unwrap();
        prop_assert_eq!(model.view(), json!(expected));
    }
}
