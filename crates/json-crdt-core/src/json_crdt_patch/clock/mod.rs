//! Logical clock primitives.
//!
//! Every operation and every node is named by a [`Ts`]: a
//! `(session_id, logical_time)` pair. Timestamps are totally ordered by
//! time first and session id second, so any two ids issued by different
//! sessions (or at different times) compare unequal.

use crate::json_crdt_patch::enums::SESSION;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

// ── Core structs ───────────────────────────────────────────────────────────

/// An immutable logical timestamp: `(session_id, logical_time)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ts {
    pub sid: u64,
    pub time: u64,
}

impl Ts {
    pub const fn new(sid: u64, time: u64) -> Self {
        Self { sid, time }
    }
}

impl Ord for Ts {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.sid.cmp(&other.sid))
    }
}

impl PartialOrd for Ts {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Ts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_ts(*self))
    }
}

/// An immutable logical time-span: `(session_id, logical_time, span)`.
///
/// Names the ids `time, time + 1, ..., time + span - 1` of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tss {
    pub sid: u64,
    pub time: u64,
    pub span: u64,
}

impl Tss {
    pub const fn new(sid: u64, time: u64, span: u64) -> Self {
        Self { sid, time, span }
    }

    pub fn ts(&self) -> Ts {
        Ts::new(self.sid, self.time)
    }

    /// Exclusive upper bound of the covered times, capped at `u64::MAX`.
    pub fn end(&self) -> u64 {
        self.time.saturating_add(self.span)
    }
}

// ── Factory functions ──────────────────────────────────────────────────────

/// Create a timestamp.
#[inline]
pub fn ts(sid: u64, time: u64) -> Ts {
    Ts::new(sid, time)
}

/// Create a timespan.
#[inline]
pub fn tss(sid: u64, time: u64, span: u64) -> Tss {
    Tss::new(sid, time, span)
}

/// Returns `true` if both timestamps are equal.
#[inline]
pub fn equal(a: Ts, b: Ts) -> bool {
    a.time == b.time && a.sid == b.sid
}

/// Compare two timestamps (time first, then session ID).
/// Returns `1`, `0`, or `-1`.
#[inline]
pub fn compare(a: Ts, b: Ts) -> i8 {
    match a.cmp(&b) {
        Ordering::Greater => 1,
        Ordering::Less => -1,
        Ordering::Equal => 0,
    }
}

/// Returns `true` if `[ts1, span1)` completely contains `[ts2, span2)`.
pub fn contains(ts1: Ts, span1: u64, ts2: Ts, span2: u64) -> bool {
    if ts1.sid != ts2.sid {
        return false;
    }
    if ts1.time > ts2.time {
        return false;
    }
    if ts1.time.saturating_add(span1) < ts2.time.saturating_add(span2) {
        return false;
    }
    true
}

/// Returns `true` if the timespan `[ts1, span1)` contains point `ts2`.
pub fn contains_id(ts1: Ts, span1: u64, ts2: Ts) -> bool {
    ts1.sid == ts2.sid && ts1.time <= ts2.time && ts2.time < ts1.time.saturating_add(span1)
}

/// Human-readable representation of a timestamp.
pub fn print_ts(id: Ts) -> String {
    if id.sid == SESSION::SERVER {
        return format!(".{}", id.time);
    }
    let s = id.sid.to_string();
    let session = if s.len() > 4 {
        format!("..{}", &s[s.len() - 4..])
    } else {
        s
    };
    format!("{}.{}", session, id.time)
}

// ── LogicalClock ───────────────────────────────────────────────────────────

/// A mutable logical clock that can be ticked.
///
/// Used by [`PatchBuilder`](crate::json_crdt_patch::PatchBuilder) to
/// reserve ids for a single writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalClock {
    pub sid: u64,
    pub time: u64,
}

impl LogicalClock {
    pub fn new(sid: u64, time: u64) -> Self {
        Self { sid, time }
    }

    /// Returns the current timestamp and advances the clock by `cycles`.
    pub fn tick(&mut self, cycles: u64) -> Ts {
        let stamp = Ts::new(self.sid, self.time);
        self.time += cycles;
        stamp
    }

    pub fn ts(&self) -> Ts {
        Ts::new(self.sid, self.time)
    }
}

// ── ClockVector ────────────────────────────────────────────────────────────

/// A vector clock: local logical clock plus the highest time seen from
/// every peer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockVector {
    pub sid: u64,
    pub time: u64,
    pub peers: HashMap<u64, Ts>,
}

impl ClockVector {
    pub fn new(sid: u64, time: u64) -> Self {
        Self {
            sid,
            time,
            peers: HashMap::new(),
        }
    }

    pub fn ts(&self) -> Ts {
        Ts::new(self.sid, self.time)
    }

    /// Returns the current timestamp and advances the clock by `cycles`.
    pub fn tick(&mut self, cycles: u64) -> Ts {
        let stamp = Ts::new(self.sid, self.time);
        self.time += cycles;
        stamp
    }

    /// Advance local time past the last id of `[id, id + span)`.
    ///
    /// Idempotent: observing the same range again changes nothing.
    pub fn observe(&mut self, id: Ts, span: u64) {
        let edge = id.time.saturating_add(span.max(1) - 1);
        let sid = id.sid;
        if sid != self.sid && sid != SESSION::SYSTEM {
            self.peers
                .entry(sid)
                .and_modify(|e| {
                    if edge > e.time {
                        e.time = edge;
                    }
                })
                .or_insert_with(|| Ts::new(sid, edge));
        }
        if edge >= self.time {
            self.time = edge.saturating_add(1);
        }
    }

    /// Copy continuing the same writer (same session, same time).
    pub fn clone_same(&self) -> ClockVector {
        self.fork(self.sid)
    }

    /// Copy with a (potentially different) session ID.
    ///
    /// The old session is recorded as a peer so the fork never issues an
    /// id that shadows history written by the original.
    pub fn fork(&self, new_sid: u64) -> ClockVector {
        let mut clock = ClockVector::new(new_sid, self.time);
        if new_sid != self.sid && self.time > 0 {
            clock.observe(Ts::new(self.sid, self.time - 1), 1);
        }
        for peer in self.peers.values() {
            if peer.sid != new_sid {
                clock.observe(*peer, 1);
            }
        }
        clock
    }
}

impl fmt::Display for ClockVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clock {}.{}", self.sid, self.time)?;
        let mut peers: Vec<_> = self.peers.values().collect();
        peers.sort_by_key(|p| p.sid);
        for (i, peer) in peers.iter().enumerate() {
            let is_last = i == peers.len() - 1;
            write!(
                f,
                "\n{} {}.{}",
                if is_last { "└─" } else { "├─" },
                peer.sid,
                peer.time
            )?;
        }
        Ok(())
    }
}
