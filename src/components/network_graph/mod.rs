//! Network graph editor component.
//!
//! Renders an editable force-directed network on an HTML canvas with:
//! - A force simulation confining nodes to the viewport
//! - Keyed enter/update/exit transitions for nodes and curved links
//! - Node dragging, neighborhood highlighting, pan and zoom
//! - A detail page for editing a node's label, group and fields
//!
//! # Example
//!
//! ```ignore
//! use stac_network::{NetworkGraphEditor, config::EditorConfig};
//!
//! view! { <NetworkGraphEditor config=EditorConfig::default() /> }
//! ```

mod component;
pub mod interaction;
mod render;
pub mod scene;
pub mod simulation;
mod state;
pub mod theme;

pub use component::NetworkGraphEditor;
pub use state::NetworkEditor;
pub use theme::Theme;
