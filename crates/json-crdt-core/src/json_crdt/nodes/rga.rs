//! RGA (Replicated Growable Array) sequence engine.
//!
//! Shared by the `str`, `bin` and `arr` node kinds. The sequence is a doubly
//! linked list of [`Chunk`]s stored in an arena, starting with an origin
//! chunk that carries the sequence node's own id. A `BTreeMap` from chunk
//! start ids to arena slots locates the chunk containing any element id in
//! `O(log n)`; the linked list stays the source of truth for order.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::json_crdt_patch::clock::{Ts, Tss};
use crate::json_crdt_patch::constants::ORIGIN;

/// Arena slot of the origin chunk.
const ORIGIN_SLOT: usize = 0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RgaError {
    #[error("position {pos} out of bounds (length {len})")]
    OutOfBounds { pos: u64, len: u64 },
}

// ── ChunkData ─────────────────────────────────────────────────────────────

/// Payload of a chunk: a run of characters, bytes or element ids.
pub trait ChunkData: Clone + Default {
    /// Number of logical items (one per id).
    fn item_count(&self) -> u64;

    /// Split `self` at logical offset `at` (number of items before the split).
    /// Modifies `self` to hold items `[0, at)` and returns items `[at, len)`.
    fn split_at_offset(&mut self, at: usize) -> Self;

    /// Append `other` after the items of `self`.
    fn append(&mut self, other: Self);
}

impl ChunkData for String {
    fn item_count(&self) -> u64 {
        self.chars().count() as u64
    }

    fn split_at_offset(&mut self, at: usize) -> Self {
        let byte_pos = self
            .char_indices()
            .nth(at)
            .map(|(i, _)| i)
            .unwrap_or(self.len());
        self.split_off(byte_pos)
    }

    fn append(&mut self, other: Self) {
        self.push_str(&other);
    }
}

impl ChunkData for Vec<u8> {
    fn item_count(&self) -> u64 {
        self.len() as u64
    }

    fn split_at_offset(&mut self, at: usize) -> Self {
        self.split_off(at)
    }

    fn append(&mut self, mut other: Self) {
        Vec::append(self, &mut other);
    }
}

impl ChunkData for Vec<Ts> {
    fn item_count(&self) -> u64 {
        self.len() as u64
    }

    fn split_at_offset(&mut self, at: usize) -> Self {
        self.split_off(at)
    }

    fn append(&mut self, mut other: Self) {
        Vec::append(self, &mut other);
    }
}

// ── Chunk ─────────────────────────────────────────────────────────────────

/// One chunk in the RGA sequence.
///
/// A chunk is a contiguous run of items carrying consecutive ids
/// `id, id+1, ..., id+span-1`. Deleted chunks keep their span and drop
/// their content.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk<T> {
    /// Timestamp of the *first* item in this chunk.
    pub id: Ts,
    /// Number of logical items in this chunk (including deleted ones).
    pub span: u64,
    /// Whether all items in this chunk are deleted.
    pub deleted: bool,
    /// The actual content. `None` if the chunk is a tombstone.
    pub data: Option<T>,
    prev: Option<usize>,
    next: Option<usize>,
}

impl<T> Chunk<T> {
    fn new(id: Ts, span: u64, deleted: bool, data: Option<T>) -> Self {
        Self {
            id,
            span,
            deleted,
            data,
            prev: None,
            next: None,
        }
    }

    /// Number of visible items.
    pub fn len(&self) -> u64 {
        if self.deleted {
            0
        } else {
            self.span
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Id range covered by this chunk.
    pub fn tss(&self) -> Tss {
        Tss::new(self.id.sid, self.id.time, self.span)
    }

    fn contains(&self, id: Ts) -> bool {
        id.sid == self.id.sid
            && id.time >= self.id.time
            && id.time < self.id.time.saturating_add(self.span)
    }
}

/// Outcome of [`Rga::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Inserted,
    /// The id is already present; nothing changed.
    Duplicate,
    /// The `after` anchor is not part of this sequence.
    UnknownAnchor,
    /// Nothing to insert.
    Empty,
}

// ── Rga ───────────────────────────────────────────────────────────────────

/// An RGA sequence of `T` payload chunks.
#[derive(Debug, Clone)]
pub struct Rga<T> {
    id: Ts,
    chunks: Vec<Chunk<T>>,
    index: BTreeMap<(u64, u64), usize>,
    live: u64,
}

impl<T: ChunkData> Rga<T> {
    /// Creates an empty sequence owned by the node `id`.
    pub fn new(id: Ts) -> Self {
        let mut index = BTreeMap::new();
        index.insert((id.sid, id.time), ORIGIN_SLOT);
        Self {
            id,
            chunks: vec![Chunk::new(id, 1, false, None)],
            index,
            live: 0,
        }
    }

    /// Restores a sequence from chunks given in list order.
    ///
    /// The result should be checked with [`Rga::validate`].
    pub fn from_chunks(id: Ts, chunks: impl IntoIterator<Item = (Ts, u64, Option<T>)>) -> Self {
        let mut rga = Self::new(id);
        let mut tail = ORIGIN_SLOT;
        for (chunk_id, span, data) in chunks {
            let deleted = data.is_none();
            tail = rga.link_after(tail, Chunk::new(chunk_id, span, deleted, data));
        }
        rga
    }

    /// Id of the sequence node (and of its origin chunk).
    pub fn id(&self) -> Ts {
        self.id
    }

    /// Number of visible items.
    pub fn len(&self) -> u64 {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of chunks, tombstones included, origin excluded.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len() - 1
    }

    /// Returns `true` if the item `id` (live or deleted) belongs to the sequence.
    pub fn has(&self, id: Ts) -> bool {
        matches!(self.find_slot(id), Some(slot) if slot != ORIGIN_SLOT)
    }

    /// Arena slot of the chunk whose id range contains `id`.
    fn find_slot(&self, id: Ts) -> Option<usize> {
        let (_, slot) = self.index.range(..=(id.sid, id.time)).next_back()?;
        if self.chunks[*slot].contains(id) {
            Some(*slot)
        } else {
            None
        }
    }

    /// Links `chunk` right after `left` and returns its slot.
    fn link_after(&mut self, left: usize, mut chunk: Chunk<T>) -> usize {
        let slot = self.chunks.len();
        let right = self.chunks[left].next;
        chunk.prev = Some(left);
        chunk.next = right;
        if let Some(r) = right {
            self.chunks[r].prev = Some(slot);
        }
        self.chunks[left].next = Some(slot);
        self.index.insert((chunk.id.sid, chunk.id.time), slot);
        self.live += chunk.len();
        self.chunks.push(chunk);
        slot
    }

    /// Splits the chunk at `slot` after `offset` items; returns the slot of
    /// the right half. `offset` must lie strictly inside the chunk.
    fn split_at(&mut self, slot: usize, offset: u64) -> usize {
        let chunk = &mut self.chunks[slot];
        let right_id = Ts::new(chunk.id.sid, chunk.id.time + offset);
        let right_span = chunk.span - offset;
        let deleted = chunk.deleted;
        let right_data = chunk
            .data
            .as_mut()
            .map(|d| d.split_at_offset(offset as usize));
        chunk.span = offset;
        if !deleted {
            self.live -= right_span;
        }
        self.link_after(slot, Chunk::new(right_id, right_span, deleted, right_data))
    }

    /// Inserts `data` with first id `id` right after the item `after`.
    ///
    /// `after` equal to the node id or to [`ORIGIN`] inserts at the start.
    /// Concurrent inserts at the same anchor are ordered by descending id:
    /// the greater id ends up closest to the anchor.
    pub fn insert(&mut self, after: Ts, id: Ts, data: T) -> Insertion {
        let span = data.item_count();
        if span == 0 {
            return Insertion::Empty;
        }
        if self.find_slot(id).is_some() {
            return Insertion::Duplicate;
        }
        let anchor = if after == ORIGIN {
            ORIGIN_SLOT
        } else {
            match self.find_slot(after) {
                Some(slot) => slot,
                None => return Insertion::UnknownAnchor,
            }
        };
        let chunk = &self.chunks[anchor];
        let offset = after.time.saturating_sub(chunk.id.time) + 1;
        if anchor != ORIGIN_SLOT && offset < chunk.span {
            self.split_at(anchor, offset);
        }
        let mut left = anchor;
        while let Some(right) = self.chunks[left].next {
            if self.chunks[right].id > id {
                left = right;
            } else {
                break;
            }
        }
        self.link_after(left, Chunk::new(id, span, false, Some(data)));
        Insertion::Inserted
    }

    /// Tombstones every item covered by `spans`.
    ///
    /// Partially covered chunks are split so that exactly the covered items
    /// are removed. Returns the number of items newly deleted; repeating a
    /// delete returns 0.
    pub fn delete(&mut self, spans: &[Tss]) -> u64 {
        let before = self.live;
        for tss in spans {
            if tss.span == 0 {
                continue;
            }
            let start = tss.time;
            let end = tss.end();
            let mut slots: Vec<usize> = Vec::new();
            if let Some(slot) = self.find_slot(Ts::new(tss.sid, start)) {
                slots.push(slot);
            }
            slots.extend(
                self.index
                    .range((tss.sid, start.saturating_add(1))..(tss.sid, end))
                    .map(|(_, slot)| *slot),
            );
            for slot in slots {
                if slot == ORIGIN_SLOT || self.chunks[slot].deleted {
                    continue;
                }
                let chunk_start = self.chunks[slot].id.time;
                let chunk_end = self.chunks[slot].tss().end();
                let from = start.max(chunk_start);
                let to = end.min(chunk_end);
                if from >= to {
                    continue;
                }
                let mut target = slot;
                if from > chunk_start {
                    target = self.split_at(target, from - chunk_start);
                }
                if to < chunk_end {
                    self.split_at(target, to - from);
                }
                let chunk = &mut self.chunks[target];
                chunk.deleted = true;
                chunk.data = None;
                self.live -= chunk.span;
            }
        }
        before - self.live
    }

    /// Id of the visible item at position `pos`.
    pub fn find(&self, pos: u64) -> Result<Ts, RgaError> {
        let mut remaining = pos;
        for chunk in self.iter_live() {
            if remaining < chunk.span {
                return Ok(Ts::new(chunk.id.sid, chunk.id.time + remaining));
            }
            remaining -= chunk.span;
        }
        Err(RgaError::OutOfBounds {
            pos,
            len: self.live,
        })
    }

    /// Id ranges of the visible items in `[pos, pos + len)`, clamped to the
    /// sequence length.
    pub fn find_interval(&self, pos: u64, len: u64) -> Vec<Tss> {
        let mut out = Vec::new();
        let mut skip = pos;
        let mut want = len;
        for chunk in self.iter_live() {
            if want == 0 {
                break;
            }
            if skip >= chunk.span {
                skip -= chunk.span;
                continue;
            }
            let take = (chunk.span - skip).min(want);
            out.push(Tss::new(chunk.id.sid, chunk.id.time + skip, take));
            want -= take;
            skip = 0;
        }
        out
    }

    /// Visible position of the item `id`, or `None` if it is unknown or deleted.
    pub fn position_of(&self, id: Ts) -> Option<u64> {
        let mut pos = 0;
        for chunk in self.iter() {
            if chunk.contains(id) {
                return if chunk.deleted {
                    None
                } else {
                    Some(pos + id.time - chunk.id.time)
                };
            }
            pos += chunk.len();
        }
        None
    }

    /// Iterates all chunks in sequence order, tombstones included.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            rga: self,
            cur: self.chunks[ORIGIN_SLOT].next,
        }
    }

    /// Iterates visible chunks in sequence order.
    pub fn iter_live(&self) -> impl Iterator<Item = &Chunk<T>> {
        self.iter().filter(|c| !c.deleted)
    }

    /// Merges adjacent chunks that continue each other's ids and share the
    /// same deleted state. Order and content are unchanged. Returns the
    /// number of chunks removed.
    pub fn compact(&mut self) -> usize {
        let before = self.chunks.len();
        let mut merged: Vec<Chunk<T>> = Vec::with_capacity(before);
        merged.push(Chunk::new(self.id, 1, false, None));
        let mut cur = self.chunks[ORIGIN_SLOT].next;
        while let Some(slot) = cur {
            let chunk = &mut self.chunks[slot];
            cur = chunk.next;
            let data = chunk.data.take();
            let (id, span, deleted) = (chunk.id, chunk.span, chunk.deleted);
            if merged.len() > 1 {
                if let Some(last) = merged.last_mut() {
                    if last.id.sid == id.sid
                        && last.id.time + last.span == id.time
                        && last.deleted == deleted
                    {
                        last.span += span;
                        if let (Some(acc), Some(more)) = (last.data.as_mut(), data) {
                            acc.append(more);
                        }
                        continue;
                    }
                }
            }
            merged.push(Chunk::new(id, span, deleted, data));
        }
        let count = merged.len();
        for (slot, chunk) in merged.iter_mut().enumerate() {
            chunk.prev = slot.checked_sub(1);
            chunk.next = if slot + 1 < count { Some(slot + 1) } else { None };
        }
        self.index = merged
            .iter()
            .enumerate()
            .map(|(slot, c)| ((c.id.sid, c.id.time), slot))
            .collect();
        self.chunks = merged;
        before - count
    }

    /// Cross-checks the linked list, the lookup index and the cached length.
    pub fn validate(&self) -> Result<(), String> {
        if self.index.len() != self.chunks.len() {
            return Err(format!(
                "index holds {} ids for {} chunks",
                self.index.len(),
                self.chunks.len()
            ));
        }
        let mut visited = 1;
        let mut live = 0;
        let mut prev = ORIGIN_SLOT;
        let mut cur = self.chunks[ORIGIN_SLOT].next;
        while let Some(slot) = cur {
            let chunk = self.chunks.get(slot).ok_or("dangling chunk link")?;
            if chunk.prev != Some(prev) {
                return Err(format!("broken back link at {}", chunk.id));
            }
            if self.index.get(&(chunk.id.sid, chunk.id.time)) != Some(&slot) {
                return Err(format!("chunk {} missing from index", chunk.id));
            }
            if chunk.span == 0 {
                return Err(format!("empty chunk {}", chunk.id));
            }
            match &chunk.data {
                Some(data) if chunk.deleted || data.item_count() != chunk.span => {
                    return Err(format!("chunk {} content does not match its span", chunk.id));
                }
                None if !chunk.deleted => {
                    return Err(format!("live chunk {} has no content", chunk.id));
                }
                _ => {}
            }
            live += chunk.len();
            visited += 1;
            if visited > self.chunks.len() {
                return Err("chunk list contains a loop".to_owned());
            }
            prev = slot;
            cur = chunk.next;
        }
        if visited != self.chunks.len() {
            return Err(format!(
                "{} chunks unreachable",
                self.chunks.len() - visited
            ));
        }
        if live != self.live {
            return Err(format!("cached length {} != {}", self.live, live));
        }
        Ok(())
    }
}

impl Rga<Vec<Ts>> {
    /// Value id held by the element `elem`, live or deleted.
    pub fn get_by_id(&self, elem: Ts) -> Option<Ts> {
        let slot = self.find_slot(elem)?;
        let chunk = &self.chunks[slot];
        let data = chunk.data.as_ref()?;
        data.get((elem.time - chunk.id.time) as usize).copied()
    }

    /// Value id of the visible element at position `pos`.
    pub fn get_data_ts(&self, pos: u64) -> Option<Ts> {
        let elem = self.find(pos).ok()?;
        self.get_by_id(elem)
    }

    /// Replaces the value of element `elem` with `val` if `val` is newer.
    ///
    /// Returns `true` if the element changed.
    pub fn upd(&mut self, elem: Ts, val: Ts) -> bool {
        let Some(slot) = self.find_slot(elem) else {
            return false;
        };
        if slot == ORIGIN_SLOT {
            return false;
        }
        let offset = (elem.time - self.chunks[slot].id.time) as usize;
        match self.chunks[slot].data.as_mut().and_then(|d| d.get_mut(offset)) {
            Some(current) if val > *current => {
                *current = val;
                true
            }
            _ => false,
        }
    }
}

/// Iterator over the chunks of an [`Rga`] in sequence order.
pub struct Iter<'a, T> {
    rga: &'a Rga<T>,
    cur: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a Chunk<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.rga.chunks.get(self.cur?)?;
        self.cur = chunk.next;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_crdt_patch::clock::{ts, tss};

    const NODE: Ts = Ts::new(1, 1);

    fn text(rga: &Rga<String>) -> String {
        rga.iter_live().filter_map(|c| c.data.as_deref()).collect()
    }

    fn hello() -> Rga<String> {
        let mut rga = Rga::new(NODE);
        assert_eq!(rga.insert(NODE, ts(1, 2), "hello".into()), Insertion::Inserted);
        rga
    }

    #[test]
    fn insert_single_chunk() {
        let rga = hello();
        assert_eq!(rga.chunk_count(), 1);
        assert_eq!(rga.len(), 5);
        assert_eq!(text(&rga), "hello");
        rga.validate().unwrap();
    }

    #[test]
    fn insert_after_origin_sentinel() {
        let mut rga: Rga<String> = Rga::new(NODE);
        rga.insert(ORIGIN, ts(1, 2), "b".into());
        rga.insert(ORIGIN, ts(1, 3), "a".into());
        assert_eq!(text(&rga), "ab");
    }

    #[test]
    fn insert_in_middle_splits_chunk() {
        let mut rga = hello();
        // After 'e' (ts 1.3).
        rga.insert(ts(1, 3), ts(1, 7), "XY".into());
        assert_eq!(text(&rga), "heXYllo");
        assert_eq!(rga.chunk_count(), 3);
        rga.validate().unwrap();
    }

    #[test]
    fn insert_at_end_of_chunk_does_not_split() {
        let mut rga = hello();
        rga.insert(ts(1, 6), ts(1, 7), "!".into());
        assert_eq!(text(&rga), "hello!");
        assert_eq!(rga.chunk_count(), 2);
    }

    #[test]
    fn duplicate_and_unknown_anchor() {
        let mut rga = hello();
        assert_eq!(rga.insert(NODE, ts(1, 2), "hello".into()), Insertion::Duplicate);
        assert_eq!(rga.insert(NODE, ts(1, 4), "z".into()), Insertion::Duplicate);
        assert_eq!(rga.insert(ts(9, 9), ts(2, 20), "z".into()), Insertion::UnknownAnchor);
        assert_eq!(rga.insert(NODE, ts(2, 21), String::new()), Insertion::Empty);
        assert_eq!(text(&rga), "hello");
    }

    #[test]
    fn concurrent_inserts_greater_id_first() {
        let mut a = hello();
        let mut b = hello();
        // Both sessions append after 'o' at the same logical time.
        a.insert(ts(1, 6), ts(2, 10), "A".into());
        a.insert(ts(1, 6), ts(3, 10), "B".into());
        b.insert(ts(1, 6), ts(3, 10), "B".into());
        b.insert(ts(1, 6), ts(2, 10), "A".into());
        assert_eq!(text(&a), "helloBA");
        assert_eq!(text(&a), text(&b));
    }

    #[test]
    fn concurrent_insert_skips_descendants_of_greater_chunk() {
        let mut a: Rga<String> = Rga::new(NODE);
        let mut b: Rga<String> = Rga::new(NODE);
        // Session 3 types "x" then "y" after it; session 2 concurrently types "q".
        a.insert(NODE, ts(3, 5), "x".into());
        a.insert(ts(3, 5), ts(3, 6), "y".into());
        a.insert(NODE, ts(2, 5), "q".into());
        b.insert(NODE, ts(2, 5), "q".into());
        b.insert(NODE, ts(3, 5), "x".into());
        b.insert(ts(3, 5), ts(3, 6), "y".into());
        assert_eq!(text(&a), "xyq");
        assert_eq!(text(&b), "xyq");
    }

    #[test]
    fn partial_delete_middle() {
        let mut rga = hello();
        assert_eq!(rga.delete(&[tss(1, 3, 3)]), 3);
        assert_eq!(text(&rga), "ho");
        assert_eq!(rga.len(), 2);
        rga.validate().unwrap();
    }

    #[test]
    fn partial_delete_prefix_and_suffix() {
        let mut rga = hello();
        rga.delete(&[tss(1, 2, 2)]);
        assert_eq!(text(&rga), "llo");
        rga.delete(&[tss(1, 5, 2)]);
        assert_eq!(text(&rga), "l");
        rga.validate().unwrap();
    }

    #[test]
    fn delete_spanning_split_chunks_is_idempotent() {
        let mut rga: Rga<String> = Rga::new(NODE);
        rga.insert(NODE, ts(1, 2), "he".into());
        rga.insert(ts(1, 3), ts(1, 4), "llo".into());
        assert_eq!(rga.delete(&[tss(1, 3, 2)]), 2);
        assert_eq!(text(&rga), "hlo");
        assert_eq!(rga.delete(&[tss(1, 3, 2)]), 0);
        assert_eq!(text(&rga), "hlo");
        rga.validate().unwrap();
    }

    #[test]
    fn delete_ranges_at_the_top_of_the_clock() {
        let mut rga = hello();
        assert_eq!(rga.delete(&[tss(1, 4, u64::MAX)]), 3);
        assert_eq!(text(&rga), "he");
        assert_eq!(rga.delete(&[tss(1, u64::MAX, 3)]), 0);
        assert!(!rga.has(ts(1, u64::MAX)));
        rga.validate().unwrap();
    }

    #[test]
    fn delete_never_touches_origin() {
        let mut rga = hello();
        assert_eq!(rga.delete(&[tss(1, 1, 1)]), 0);
        assert_eq!(rga.insert(NODE, ts(1, 10), "_".into()), Insertion::Inserted);
        assert_eq!(text(&rga), "_hello");
    }

    #[test]
    fn tombstone_remains_anchor() {
        let mut rga = hello();
        rga.delete(&[tss(1, 2, 5)]);
        assert!(rga.is_empty());
        rga.insert(ts(1, 4), ts(1, 8), "X".into());
        assert_eq!(text(&rga), "X");
        assert_eq!(rga.position_of(ts(1, 8)), Some(0));
        assert_eq!(rga.position_of(ts(1, 4)), None);
    }

    #[test]
    fn find_and_out_of_bounds() {
        let mut rga = hello();
        rga.delete(&[tss(1, 3, 1)]);
        assert_eq!(rga.find(0), Ok(ts(1, 2)));
        assert_eq!(rga.find(1), Ok(ts(1, 4)));
        assert_eq!(rga.find(3), Ok(ts(1, 6)));
        assert_eq!(rga.find(4), Err(RgaError::OutOfBounds { pos: 4, len: 4 }));
    }

    #[test]
    fn find_interval_clamps() {
        let mut rga = hello();
        rga.delete(&[tss(1, 4, 1)]);
        assert_eq!(rga.find_interval(1, 2), vec![tss(1, 3, 1), tss(1, 5, 1)]);
        assert_eq!(rga.find_interval(2, 100), vec![tss(1, 5, 2)]);
        assert!(rga.find_interval(10, 1).is_empty());
    }

    #[test]
    fn compact_merges_split_chunks() {
        let mut rga = hello();
        rga.insert(ts(1, 3), ts(2, 10), "-".into());
        rga.delete(&[tss(2, 10, 1)]);
        assert_eq!(rga.chunk_count(), 3);
        // The tombstone separates the halves.
        assert_eq!(rga.compact(), 0);
        assert_eq!(text(&rga), "hello");

        let mut rga2 = hello();
        rga2.delete(&[tss(1, 3, 2)]);
        assert_eq!(rga2.chunk_count(), 3);
        rga2.delete(&[tss(1, 2, 1)]);
        assert_eq!(rga2.compact(), 1);
        assert_eq!(text(&rga2), "lo");
        assert_eq!(rga2.chunk_count(), 2);
        rga2.validate().unwrap();
    }

    #[test]
    fn compact_preserves_text_and_further_edits() {
        let mut rga: Rga<String> = Rga::new(NODE);
        rga.insert(NODE, ts(1, 2), "ab".into());
        rga.insert(ts(1, 3), ts(1, 4), "cd".into());
        rga.insert(ts(1, 5), ts(1, 6), "ef".into());
        assert_eq!(rga.chunk_count(), 3);
        assert_eq!(rga.compact(), 2);
        assert_eq!(text(&rga), "abcdef");
        rga.validate().unwrap();
        rga.insert(ts(1, 4), ts(1, 8), "X".into());
        assert_eq!(text(&rga), "abcXdef");
        rga.validate().unwrap();
    }

    #[test]
    fn from_chunks_restores_order() {
        let rga: Rga<Vec<u8>> = Rga::from_chunks(
            NODE,
            vec![(ts(1, 2), 2, Some(vec![1, 2])), (ts(2, 5), 1, None), (ts(1, 4), 1, Some(vec![3]))],
        );
        rga.validate().unwrap();
        assert_eq!(rga.len(), 3);
        let bytes: Vec<u8> = rga.iter_live().flat_map(|c| c.data.clone().unwrap_or_default()).collect();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn validate_detects_bad_span() {
        let rga: Rga<String> =
            Rga::from_chunks(NODE, vec![(ts(1, 2), 3, Some("ab".to_owned()))]);
        assert!(rga.validate().is_err());
    }

    #[test]
    fn array_upd_keeps_newer_value() {
        let mut rga: Rga<Vec<Ts>> = Rga::new(NODE);
        rga.insert(NODE, ts(1, 4), vec![ts(1, 2), ts(1, 3)]);
        assert_eq!(rga.get_data_ts(1), Some(ts(1, 3)));
        assert!(rga.upd(ts(1, 5), ts(1, 9)));
        assert!(!rga.upd(ts(1, 5), ts(1, 8)));
        assert_eq!(rga.get_data_ts(1), Some(ts(1, 9)));
        assert!(!rga.upd(NODE, ts(1, 20)));
    }
}
