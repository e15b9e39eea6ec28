//! Declarative node-tree builders.
//!
//! A schema value describes the shape of a document; [`NodeBuilder::build`]
//! emits the `new_*`/`ins_*` calls that create it through a
//! [`PatchBuilder`].

use crate::json_crdt_patch::clock::Ts;
use crate::json_crdt_patch::patch_builder::PatchBuilder;
use serde_json::Value;

/// A composable schema node that knows how to build itself via a [`PatchBuilder`].
pub trait NodeBuilder: std::fmt::Debug {
    fn build(&self, builder: &mut PatchBuilder) -> Ts;
}

/// `con` constant schema node.
#[derive(Debug, Clone)]
pub struct ConSchema {
    pub raw: Value,
}

impl NodeBuilder for ConSchema {
    fn build(&self, builder: &mut PatchBuilder) -> Ts {
        builder.con_val(self.raw.clone())
    }
}

/// `str` schema node.
#[derive(Debug, Clone)]
pub struct StrSchema {
    pub raw: String,
}

impl NodeBuilder for StrSchema {
    fn build(&self, builder: &mut PatchBuilder) -> Ts {
        let id = builder.str_node();
        if !self.raw.is_empty() {
            builder.ins_str(id, id, self.raw.as_str());
        }
        id
    }
}

/// `bin` schema node.
#[derive(Debug, Clone)]
pub struct BinSchema {
    pub raw: Vec<u8>,
}

impl NodeBuilder for BinSchema {
    fn build(&self, builder: &mut PatchBuilder) -> Ts {
        let id = builder.bin();
        if !self.raw.is_empty() {
            builder.ins_bin(id, id, self.raw.clone());
        }
        id
    }
}

/// `val` schema node wrapping another node.
#[derive(Debug)]
pub struct ValSchema {
    pub value: Box<dyn NodeBuilder>,
}

impl NodeBuilder for ValSchema {
    fn build(&self, builder: &mut PatchBuilder) -> Ts {
        let val_id = builder.val();
        let inner_id = self.value.build(builder);
        builder.set_val(val_id, inner_id);
        val_id
    }
}

/// `vec` schema node; `None` leaves the slot unset.
#[derive(Debug)]
pub struct VecSchema {
    pub value: Vec<Option<Box<dyn NodeBuilder>>>,
}

impl NodeBuilder for VecSchema {
    fn build(&self, builder: &mut PatchBuilder) -> Ts {
        let vec_id = builder.vec();
        let mut pairs: Vec<(u8, Ts)> = Vec::new();
        for (i, slot) in self.value.iter().enumerate() {
            if let Some(node) = slot {
                let elem_id = node.build(builder);
                pairs.push((i as u8, elem_id));
            }
        }
        if !pairs.is_empty() {
            builder.ins_vec(vec_id, pairs);
        }
        vec_id
    }
}

/// `obj` schema node.
#[derive(Debug)]
pub struct ObjSchema {
    pub entries: Vec<(String, Box<dyn NodeBuilder>)>,
}

impl NodeBuilder for ObjSchema {
    fn build(&self, builder: &mut PatchBuilder) -> Ts {
        let obj_id = builder.obj();
        let mut pairs: Vec<(String, Ts)> = Vec::new();
        for (key, node) in &self.entries {
            let val_id = node.build(builder);
            pairs.push((key.clone(), val_id));
        }
        if !pairs.is_empty() {
            builder.ins_obj(obj_id, pairs);
        }
        obj_id
    }
}

/// `arr` schema node.
#[derive(Debug)]
pub struct ArrSchema {
    pub items: Vec<Box<dyn NodeBuilder>>,
}

impl NodeBuilder for ArrSchema {
    fn build(&self, builder: &mut PatchBuilder) -> Ts {
        let arr_id = builder.arr();
        if !self.items.is_empty() {
            let ids: Vec<Ts> = self.items.iter().map(|n| n.build(builder)).collect();
            builder.ins_arr(arr_id, arr_id, ids);
        }
        arr_id
    }
}

/// Plain JSON value, expanded with [`PatchBuilder::json`].
#[derive(Debug, Clone)]
pub struct JsonSchema {
    pub raw: Value,
}

impl NodeBuilder for JsonSchema {
    fn build(&self, builder: &mut PatchBuilder) -> Ts {
        builder.json(&self.raw)
    }
}

/// Shorthand constructors for schema nodes.
pub mod s {
    use super::*;

    pub fn con(raw: Value) -> ConSchema {
        ConSchema { raw }
    }

    pub fn str_node(raw: &str) -> StrSchema {
        StrSchema {
            raw: raw.to_owned(),
        }
    }

    pub fn bin(raw: Vec<u8>) -> BinSchema {
        BinSchema { raw }
    }

    pub fn val(value: impl NodeBuilder + 'static) -> ValSchema {
        ValSchema {
            value: Box::new(value),
        }
    }

    pub fn vec(slots: Vec<Option<Box<dyn NodeBuilder>>>) -> VecSchema {
        VecSchema { value: slots }
    }

    pub fn obj(entries: Vec<(&str, Box<dyn NodeBuilder>)>) -> ObjSchema {
        ObjSchema {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
        }
    }

    pub fn arr(items: Vec<Box<dyn NodeBuilder>>) -> ArrSchema {
        ArrSchema { items }
    }

    pub fn json(raw: Value) -> JsonSchema {
        JsonSchema { raw }
    }
}
