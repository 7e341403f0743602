//! Graph data model and the store that owns it.

mod store;
mod types;

pub use store::GraphStore;
pub(crate) use types::fields_from_values;
pub use types::{
	Fields, Filter, Link, LinkKey, Node, NodeId, NodePatch, Snapshot, node_id_from_f64,
};
