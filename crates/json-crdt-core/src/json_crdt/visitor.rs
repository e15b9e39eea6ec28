//! Read-only traversal of the document graph.
//!
//! Serializers implement [`NodeVisitor`] and call [`Model::walk`]. Every
//! node reachable from the root is visited exactly once, parents before
//! children, children in view order. Sequence nodes expose their chunk
//! lists through `rga.iter()` (tombstones included) so a visitor never has
//! to reach into the engine's internals.

use std::collections::HashSet;

use crate::json_crdt::model::Model;
use crate::json_crdt::nodes::{
    ArrNode, BinNode, ConNode, CrdtNode, ObjNode, StrNode, ValNode, VecNode,
};

/// Callbacks for each node kind. All default to no-ops.
pub trait NodeVisitor {
    fn visit_con(&mut self, _node: &ConNode) {}
    fn visit_val(&mut self, _node: &ValNode) {}
    fn visit_obj(&mut self, _node: &ObjNode) {}
    fn visit_vec(&mut self, _node: &VecNode) {}
    fn visit_str(&mut self, _node: &StrNode) {}
    fn visit_bin(&mut self, _node: &BinNode) {}
    fn visit_arr(&mut self, _node: &ArrNode) {}

    /// Dispatches on the node kind.
    fn visit(&mut self, node: &CrdtNode) {
        match node {
            CrdtNode::Con(n) => self.visit_con(n),
            CrdtNode::Val(n) => self.visit_val(n),
            CrdtNode::Obj(n) => self.visit_obj(n),
            CrdtNode::Vec(n) => self.visit_vec(n),
            CrdtNode::Str(n) => self.visit_str(n),
            CrdtNode::Bin(n) => self.visit_bin(n),
            CrdtNode::Arr(n) => self.visit_arr(n),
        }
    }
}

impl Model {
    /// Depth-first walk from the root; returns the number of nodes visited.
    ///
    /// Ids that do not resolve to a node are skipped.
    pub fn walk<V: NodeVisitor>(&self, visitor: &mut V) -> usize {
        let mut seen = HashSet::new();
        let mut visited = 0;
        let mut stack: Vec<_> = self.root.val().into_iter().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(node) = self.index.get(&id) else {
                continue;
            };
            visitor.visit(node);
            visited += 1;
            stack.extend(node.children().into_iter().rev());
        }
        visited
    }
}
