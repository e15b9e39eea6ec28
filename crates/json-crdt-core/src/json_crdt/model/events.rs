//! Synchronous model event listeners.
//!
//! Listeners run inline, in registration order, during the call that
//! triggers them.

use std::collections::BTreeMap;
use std::fmt;

use crate::json_crdt_patch::patch::Patch;

/// Handle returned by the `on_*` methods, accepted by `off`.
pub type ListenerId = u64;

type PatchListener = Box<dyn FnMut(&Patch) + Send + Sync>;
type ResetListener = Box<dyn FnMut() + Send + Sync>;

/// Registry of `before_patch`, `patch` and `reset` listeners.
///
/// Cloning yields an empty registry: listeners belong to one model
/// instance and do not follow its copies.
#[derive(Default)]
pub struct ModelEvents {
    next_id: ListenerId,
    before_patch: BTreeMap<ListenerId, PatchListener>,
    patch: BTreeMap<ListenerId, PatchListener>,
    reset: BTreeMap<ListenerId, ResetListener>,
}

impl ModelEvents {
    fn next_id(&mut self) -> ListenerId {
        self.next_id = self.next_id.saturating_add(1);
        self.next_id
    }

    pub fn on_before_patch<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Patch) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.before_patch.insert(id, Box::new(listener));
        id
    }

    pub fn on_patch<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Patch) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.patch.insert(id, Box::new(listener));
        id
    }

    pub fn on_reset<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut() + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.reset.insert(id, Box::new(listener));
        id
    }

    /// Removes a listener of any kind. Returns `false` for unknown ids.
    pub fn off(&mut self, id: ListenerId) -> bool {
        self.before_patch.remove(&id).is_some()
            || self.patch.remove(&id).is_some()
            || self.reset.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.before_patch.len() + self.patch.len() + self.reset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn emit_before_patch(&mut self, patch: &Patch) {
        for listener in self.before_patch.values_mut() {
            listener(patch);
        }
    }

    pub(crate) fn emit_patch(&mut self, patch: &Patch) {
        for listener in self.patch.values_mut() {
            listener(patch);
        }
    }

    pub(crate) fn emit_reset(&mut self) {
        for listener in self.reset.values_mut() {
            listener();
        }
    }
}

impl Clone for ModelEvents {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl fmt::Debug for ModelEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelEvents")
            .field("before_patch", &self.before_patch.len())
            .field("patch", &self.patch.len())
            .field("reset", &self.reset.len())
            .finish()
    }
}
