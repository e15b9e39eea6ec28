//! Structural snapshot of a [`Model`].
//!
//! A snapshot holds the clock, the root slot and every indexed node with
//! its complete chunk list, tombstones included. It carries no encoding;
//! serializers read it and build it back, and [`Model::from_snapshot`]
//! restores an equivalent document.

use crate::json_crdt::nodes::rga::{ChunkData, Rga};
use crate::json_crdt::nodes::{
    ArrNode, BinNode, ConNode, CrdtNode, LwwSlot, ObjNode, StrNode, ValNode, VecNode,
};
use crate::json_crdt_patch::clock::Ts;
use crate::json_crdt_patch::enums::SESSION;
use crate::json_crdt_patch::operations::ConValue;

use super::{Model, ModelError};

/// One run of ids in a sequence. `data` is `None` for a tombstone.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSnapshot<T> {
    pub id: Ts,
    pub span: u64,
    pub data: Option<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeSnapshot {
    Con {
        id: Ts,
        val: ConValue,
    },
    Val {
        id: Ts,
        slot: Option<LwwSlot>,
    },
    /// Keys in sorted order.
    Obj {
        id: Ts,
        keys: Vec<(String, LwwSlot)>,
    },
    Vec {
        id: Ts,
        slots: Vec<Option<LwwSlot>>,
    },
    Str {
        id: Ts,
        chunks: Vec<ChunkSnapshot<String>>,
    },
    Bin {
        id: Ts,
        chunks: Vec<ChunkSnapshot<Vec<u8>>>,
    },
    Arr {
        id: Ts,
        chunks: Vec<ChunkSnapshot<Vec<Ts>>>,
    },
}

impl NodeSnapshot {
    pub fn id(&self) -> Ts {
        match self {
            Self::Con { id, .. }
            | Self::Val { id, .. }
            | Self::Obj { id, .. }
            | Self::Vec { id, .. }
            | Self::Str { id, .. }
            | Self::Bin { id, .. }
            | Self::Arr { id, .. } => *id,
        }
    }

    fn from_node(node: &CrdtNode) -> Self {
        match node {
            CrdtNode::Con(n) => Self::Con {
                id: n.id,
                val: n.val.clone(),
            },
            CrdtNode::Val(n) => Self::Val {
                id: n.id,
                slot: n.slot,
            },
            CrdtNode::Obj(n) => Self::Obj {
                id: n.id,
                keys: n.keys.iter().map(|(k, slot)| (k.clone(), *slot)).collect(),
            },
            CrdtNode::Vec(n) => Self::Vec {
                id: n.id,
                slots: n.elements.clone(),
            },
            CrdtNode::Str(n) => Self::Str {
                id: n.id,
                chunks: chunks_of(&n.rga),
            },
            CrdtNode::Bin(n) => Self::Bin {
                id: n.id,
                chunks: chunks_of(&n.rga),
            },
            CrdtNode::Arr(n) => Self::Arr {
                id: n.id,
                chunks: chunks_of(&n.rga),
            },
        }
    }

    fn into_node(self) -> CrdtNode {
        match self {
            Self::Con { id, val } => CrdtNode::Con(ConNode::new(id, val)),
            Self::Val { id, slot } => CrdtNode::Val(ValNode { id, slot }),
            Self::Obj { id, keys } => CrdtNode::Obj(ObjNode {
                id,
                keys: keys.into_iter().collect(),
            }),
            Self::Vec { id, slots } => CrdtNode::Vec(VecNode {
                id,
                elements: slots,
            }),
            Self::Str { id, chunks } => CrdtNode::Str(StrNode {
                id,
                rga: rga_of(id, chunks),
            }),
            Self::Bin { id, chunks } => CrdtNode::Bin(BinNode {
                id,
                rga: rga_of(id, chunks),
            }),
            Self::Arr { id, chunks } => CrdtNode::Arr(ArrNode {
                id,
                rga: rga_of(id, chunks),
            }),
        }
    }
}

fn chunks_of<T: ChunkData>(rga: &Rga<T>) -> Vec<ChunkSnapshot<T>> {
    rga.iter()
        .map(|c| ChunkSnapshot {
            id: c.id,
            span: c.span,
            data: c.data.clone(),
        })
        .collect()
}

fn rga_of<T: ChunkData>(id: Ts, chunks: Vec<ChunkSnapshot<T>>) -> Rga<T> {
    Rga::from_chunks(id, chunks.into_iter().map(|c| (c.id, c.span, c.data)))
}

/// Full document state: clock, root slot and nodes sorted by id.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSnapshot {
    pub sid: u64,
    pub time: u64,
    /// Highest id seen per peer session, sorted by session.
    pub peers: Vec<Ts>,
    pub root: Option<LwwSlot>,
    pub nodes: Vec<NodeSnapshot>,
}

impl Model {
    pub fn snapshot(&self) -> ModelSnapshot {
        let mut peers: Vec<Ts> = self.clock.peers.values().copied().collect();
        peers.sort_by_key(|p| p.sid);
        let mut nodes: Vec<NodeSnapshot> =
            self.index.values().map(NodeSnapshot::from_node).collect();
        nodes.sort_by_key(NodeSnapshot::id);
        ModelSnapshot {
            sid: self.clock.sid,
            time: self.clock.time,
            peers,
            root: self.root.slot,
            nodes,
        }
    }

    /// Rebuilds a model from `snapshot`, checking its invariants.
    ///
    /// Listeners and options start out empty.
    pub fn from_snapshot(snapshot: ModelSnapshot) -> Result<Model, ModelError> {
        if snapshot.sid == SESSION::SYSTEM {
            return Err(ModelError::InvalidSession(snapshot.sid));
        }
        let mut model = Model::new(snapshot.sid);
        model.clock.time = snapshot.time;
        for peer in snapshot.peers {
            if peer.sid != snapshot.sid {
                model.clock.peers.insert(peer.sid, peer);
            }
        }
        model.root.slot = snapshot.root;
        for node in snapshot.nodes {
            let id = node.id();
            if model.index.insert(id, node.into_node()).is_some() {
                return Err(ModelError::InvariantViolation(format!(
                    "node {id} appears twice"
                )));
            }
        }
        model.validate_invariants()?;
        tracing::debug!(
            sid = model.clock.sid,
            time = model.clock.time,
            nodes = model.index.len(),
            "restored model from snapshot"
        );
        Ok(model)
    }
}
