//! UI components.

pub mod network_graph;

pub use network_graph::{NetworkEditor, NetworkGraphEditor};
