//! Patch compaction utilities.

use crate::json_crdt_patch::clock::{equal, ts};
use crate::json_crdt_patch::operations::Op;
use crate::json_crdt_patch::patch::{Patch, PatchError};

/// Combines two or more patches together into `patches[0]`.
///
/// Between patches, a `Nop` is inserted if there is a time gap. All
/// patches must share the same session ID and be ordered by logical time
/// with no overlapping spans; otherwise `patches` is left untouched and an
/// error is returned.
pub fn combine(patches: &mut Vec<Patch>) -> Result<(), PatchError> {
    if patches.len() < 2 {
        return Ok(());
    }
    let mut first = Patch {
        ops: Vec::new(),
        meta: patches[0].meta.clone(),
    };
    for current in patches.iter() {
        let current_id = match current.get_id() {
            Some(id) => id,
            None => continue,
        };
        let first_id = match first.get_id() {
            Some(id) => id,
            None => {
                first.ops.extend(current.ops.iter().cloned());
                continue;
            }
        };
        if first_id.sid != current_id.sid {
            return Err(PatchError::SessionMismatch {
                expected: first_id.sid,
                actual: current_id.sid,
            });
        }
        let next_tick = first_id.time + first.span();
        if current_id.time < next_tick {
            return Err(PatchError::TimestampConflict {
                start: current_id.time,
                end: next_tick,
            });
        }
        let gap = current_id.time - next_tick;
        if gap > 0 {
            first.ops.push(Op::Nop {
                id: ts(first_id.sid, next_tick),
                len: gap,
            });
        }
        first.ops.extend(current.ops.iter().cloned());
    }
    patches.clear();
    patches.push(first);
    Ok(())
}

/// Compacts operations within a single patch by merging consecutive string
/// inserts that append to the same string.
pub fn compact(patch: &mut Patch) {
    if patch.ops.len() < 2 {
        return;
    }
    let ops = std::mem::take(&mut patch.ops);
    let mut new_ops: Vec<Op> = Vec::with_capacity(ops.len());

    for op in ops {
        if let Some(Op::InsStr {
            id: lid,
            obj: lobj,
            data: ldata,
            ..
        }) = new_ops.last_mut()
        {
            if let Op::InsStr {
                id: cid,
                obj: cobj,
                after: cafter,
                data: cdata,
            } = &op
            {
                let last_next_tick = lid.time + ldata.chars().count() as u64;
                let is_time_consecutive = last_next_tick == cid.time && lid.sid == cid.sid;
                let is_same_string = equal(*lobj, *cobj);
                // The new text must be anchored on the last char of the previous insert.
                let is_append = cafter.sid == lid.sid && last_next_tick == cafter.time + 1;
                if is_time_consecutive && is_same_string && is_append {
                    ldata.push_str(cdata);
                    continue;
                }
            }
        }
        new_ops.push(op);
    }
    patch.ops = new_ops;
}
