//! JSON CRDT document model.
//!
//! # Overview
//!
//! A [`Model`] is the in-memory representation of a JSON CRDT document.
//! It owns a node index (all known CRDT nodes keyed by their id), the root
//! register, and a vector clock that tracks which operations have been seen.
//!
//! Patches are applied via [`Model::apply_patch`]. The resulting JSON view
//! can be obtained with [`Model::view`].

mod apply;
pub mod events;
pub mod snapshot;
pub mod util;

pub use events::{ListenerId, ModelEvents};
pub use snapshot::{ChunkSnapshot, ModelSnapshot, NodeSnapshot};

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::json_crdt_patch::clock::{ClockVector, Ts};
use crate::json_crdt_patch::enums::SESSION;
use crate::json_crdt_patch::patch::Patch;
use crate::json_crdt_patch::patch_builder::PatchBuilder;
use super::nodes::{CrdtNode, NodeIndex, RootNode};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// An operation does not fit the kind of the node it addresses. The
    /// whole patch is rejected before anything is mutated.
    #[error("malformed patch at {op}: {reason}")]
    MalformedPatch { op: Ts, reason: String },
    #[error("invalid session id {0}")]
    InvalidSession(u64),
    #[error("model invariant violation: {0}")]
    InvariantViolation(String),
}

/// Why an operation (or part of one) was absorbed instead of applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The referenced id has not been created on this replica yet.
    UnknownReference(Ts),
    /// Wiring `child` under `parent` would make a node contain itself.
    RecursiveReference { parent: Ts, child: Ts },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skipped {
    /// Id of the operation that was (partially) skipped.
    pub op: Ts,
    pub reason: SkipReason,
}

/// Summary of one [`Model::apply_patch`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Number of operations replayed.
    pub ops: usize,
    pub skipped: Vec<Skipped>,
}

impl PatchReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    pub(crate) fn skip(&mut self, op: Ts, reason: SkipReason) {
        self.skipped.push(Skipped { op, reason });
    }
}

/// Construction options for [`Model::with_options`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelOptions {
    /// Session id of the local writer; random when `None`.
    pub sid: Option<u64>,
    /// Compact a sequence node after a patch once it holds more chunks
    /// than this. Compaction is off when `None`.
    pub compact_threshold: Option<usize>,
}

/// In-memory JSON CRDT document model.
///
/// `tick` increments once per applied patch and once per reset; callers
/// use it as a cheap mutation counter to decide when a cached view needs
/// to be rebuilt.
///
/// `Clone` produces a copy that continues the same session. Use
/// [`Model::fork`] for an independently evolving replica. Listeners are
/// never copied.
#[derive(Debug, Clone)]
pub struct Model {
    /// Document root: a LWW register pointing at the top-level JSON value.
    pub root: RootNode,
    /// All CRDT nodes keyed by their id.
    pub index: NodeIndex,
    /// Logical clock: tracks local time and the times of all peers.
    pub clock: ClockVector,
    /// Mutation counter.
    pub tick: u64,
    pub(crate) compact_threshold: Option<usize>,
    events: ModelEvents,
}

impl Model {
    /// Create a new empty model with the given session ID.
    ///
    /// The clock starts at time `1` so that time `0` stays reserved for
    /// the origin.
    pub fn new(sid: u64) -> Self {
        Self {
            root: RootNode::new(),
            index: NodeIndex::default(),
            clock: ClockVector::new(sid, 1),
            tick: 0,
            compact_threshold: None,
            events: ModelEvents::default(),
        }
    }

    /// Create a model with a randomly-generated session ID.
    pub fn create() -> Self {
        Self::new(util::random_session_id())
    }

    pub fn with_options(options: ModelOptions) -> Result<Self, ModelError> {
        let sid = match options.sid {
            Some(SESSION::SYSTEM) => return Err(ModelError::InvalidSession(SESSION::SYSTEM)),
            Some(sid) => sid,
            None => util::random_session_id(),
        };
        let mut model = Self::new(sid);
        model.compact_threshold = options.compact_threshold;
        Ok(model)
    }

    /// Session id of the local writer.
    pub fn sid(&self) -> u64 {
        self.clock.sid
    }

    /// Return the JSON view of the current document state.
    pub fn view(&self) -> Value {
        self.root.view(&self.index)
    }

    /// Looks up a node by id.
    pub fn get(&self, id: Ts) -> Option<&CrdtNode> {
        self.index.get(&id)
    }

    /// Id of the node the root register points at.
    pub fn root_id(&self) -> Option<Ts> {
        self.root.val()
    }

    /// A builder that continues this model's clock.
    ///
    /// Nothing built is visible until the flushed patch is applied.
    pub fn builder(&self) -> PatchBuilder {
        PatchBuilder::from_clock_vector(&self.clock)
    }

    /// Deep copy with a fresh random session id.
    pub fn fork(&self) -> Model {
        let mut sid = util::random_session_id();
        while sid == self.clock.sid {
            sid = util::random_session_id();
        }
        self.forked(sid)
    }

    /// Deep copy writing as `sid`, which must differ from this model's
    /// session and must not be reserved by the system.
    pub fn fork_with_sid(&self, sid: u64) -> Result<Model, ModelError> {
        if sid == SESSION::SYSTEM || sid == self.clock.sid {
            return Err(ModelError::InvalidSession(sid));
        }
        Ok(self.forked(sid))
    }

    fn forked(&self, sid: u64) -> Model {
        Model {
            root: self.root.clone(),
            index: self.index.clone(),
            clock: self.clock.fork(sid),
            tick: self.tick,
            compact_threshold: self.compact_threshold,
            events: ModelEvents::default(),
        }
    }

    /// Replaces the whole document state with a copy of `other`.
    ///
    /// The local session id is kept; the clock advances to the later of
    /// both clocks so subsequent local ids never collide with history in
    /// `other`. Fires the `reset` event instead of `patch`.
    pub fn reset(&mut self, other: &Model) {
        let mut clock = other.clock.fork(self.clock.sid);
        for peer in self.clock.peers.values() {
            if peer.sid != clock.sid {
                clock.observe(*peer, 1);
            }
        }
        clock.time = clock.time.max(self.clock.time);
        self.clock = clock;
        self.index = other.index.clone();
        self.root = other.root.clone();
        self.tick += 1;
        tracing::debug!(
            sid = self.clock.sid,
            time = self.clock.time,
            nodes = self.index.len(),
            "model reset"
        );
        self.events.emit_reset();
    }

    // ── Events ─────────────────────────────────────────────────────────────

    /// Registers a listener run before each patch is applied.
    pub fn on_before_patch<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Patch) + Send + Sync + 'static,
    {
        self.events.on_before_patch(listener)
    }

    /// Registers a listener run after each patch is applied.
    pub fn on_patch<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Patch) + Send + Sync + 'static,
    {
        self.events.on_patch(listener)
    }

    /// Registers a listener run after [`Model::reset`].
    pub fn on_reset<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut() + Send + Sync + 'static,
    {
        self.events.on_reset(listener)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    // ── Invariants ─────────────────────────────────────────────────────────

    /// Checks the structural invariants of the document graph: index keys
    /// match node ids, LWW edges resolve, no node contains itself, and
    /// every sequence is internally consistent.
    pub fn validate_invariants(&self) -> Result<(), ModelError> {
        let fail = |msg: String| Err(ModelError::InvariantViolation(msg));
        if let Some(root) = self.root.val() {
            if !self.index.contains_key(&root) {
                return fail(format!("root points at unknown node {root}"));
            }
        }
        for (id, node) in &self.index {
            if node.id() != *id {
                return fail(format!("node {} indexed under {id}", node.id()));
            }
            let lww_children = match node {
                CrdtNode::Arr(_) => Vec::new(),
                other => other.children(),
            };
            if let Some(missing) = lww_children.iter().find(|c| !self.index.contains_key(*c)) {
                return fail(format!("{} node {id} points at unknown node {missing}", node.name()));
            }
            let rga = match node {
                CrdtNode::Str(n) => n.rga.validate(),
                CrdtNode::Bin(n) => n.rga.validate(),
                CrdtNode::Arr(n) => n.rga.validate(),
                _ => Ok(()),
            };
            if let Err(msg) = rga {
                return fail(format!("{} node {id}: {msg}", node.name()));
            }
        }
        if let Some(id) = self.find_cycle() {
            return fail(format!("node {id} contains itself"));
        }
        Ok(())
    }

    /// Returns a node that lies on a cycle of child edges, if any.
    fn find_cycle(&self) -> Option<Ts> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Open,
            Done,
        }
        let mut marks: HashMap<Ts, Mark> = HashMap::new();
        let mut ids: Vec<Ts> = self.index.keys().copied().collect();
        ids.sort();
        for start in ids {
            if marks.contains_key(&start) {
                continue;
            }
            // Iterative DFS; the bool marks the post-order visit.
            let mut stack = vec![(start, false)];
            while let Some((id, exit)) = stack.pop() {
                if exit {
                    marks.insert(id, Mark::Done);
                    continue;
                }
                match marks.get(&id) {
                    Some(Mark::Done) => continue,
                    Some(Mark::Open) => return Some(id),
                    None => {}
                }
                marks.insert(id, Mark::Open);
                stack.push((id, true));
                if let Some(node) = self.index.get(&id) {
                    for child in node.children() {
                        match marks.get(&child) {
                            Some(Mark::Open) => return Some(child),
                            Some(Mark::Done) => {}
                            None => stack.push((child, false)),
                        }
                    }
                }
            }
        }
        None
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::create()
    }
}
