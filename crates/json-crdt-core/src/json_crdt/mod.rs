//! JSON CRDT document: node kinds, the RGA sequence engine and the model
//! that replays patches into them.

pub mod model;
pub mod nodes;
pub mod visitor;

pub use model::{Model, ModelError, ModelOptions, PatchReport, SkipReason, Skipped};
pub use nodes::{CrdtNode, NodeIndex};
pub use visitor::NodeVisitor;
