//! stac-network: an interactive force-directed network editor for the browser.
//!
//! This crate provides a WASM-based editor for small labeled networks: nodes
//! with a group and free-form fields, joined by directed relationships. The
//! graph is laid out by a force simulation, drawn on a canvas with animated
//! transitions, and can be edited, filtered, imported, exported and saved to
//! local storage.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info};

pub mod api;
pub mod browser;
pub mod components;
pub mod config;
pub mod error;
pub mod graph;
pub mod io;

pub use components::{NetworkEditor, NetworkGraphEditor};
pub use error::GraphError;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("stac-network: logging initialized");
}

/// Main application component.
/// Loads page configuration and renders the editor.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let config = config::load_config();

	view! {
		<Html attr:lang="en" attr:dir="ltr" />
		<Title text="STAC Network Editor" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<NetworkGraphEditor config=config />
	}
}
