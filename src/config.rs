//! Editor configuration.
//!
//! Every value has a default; a page can override any subset by embedding a
//! JSON document in `<script id="stac-config" type="application/json">`.

use std::collections::HashMap;

use log::{info, warn};
use serde::Deserialize;
use wasm_bindgen::JsCast;
use web_sys::HtmlScriptElement;

/// Force simulation constants.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	/// Many-body charge; negative repels.
	pub charge_strength: f64,
	/// Rest length of link springs.
	pub link_distance: f64,
	/// Collision radius of each node circle.
	pub collision_radius: f64,
	/// Distance kept between nodes and the canvas border.
	pub edge_margin: f64,
	/// Energy below which the simulation stops ticking.
	pub alpha_min: f64,
	/// Fraction of velocity removed each tick.
	pub velocity_decay: f64,
	/// Alpha after a data change.
	pub reheat_alpha: f64,
	/// Alpha after a viewport resize.
	pub resize_alpha: f64,
	/// Alpha floor held while a node is dragged.
	pub drag_alpha_target: f64,
	/// Alpha floor held while the detail view is open.
	pub detail_alpha_target: f64,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			charge_strength: -420.0,
			link_distance: 140.0,
			collision_radius: 28.0,
			edge_margin: 18.0,
			alpha_min: 0.001,
			velocity_decay: 0.4,
			reheat_alpha: 0.8,
			resize_alpha: 0.3,
			drag_alpha_target: 0.3,
			detail_alpha_target: 0.1,
		}
	}
}

impl LayoutConfig {
	/// Per-tick alpha decay giving roughly 300 ticks from 1 to `alpha_min`.
	pub fn alpha_decay(&self) -> f64 {
		1.0 - self.alpha_min.powf(1.0 / 300.0)
	}
}

/// Page chrome around the canvas, used to derive the viewport size.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
	pub sidebar_width: f64,
	pub padding: f64,
	/// Lower bound for either viewport dimension.
	pub min_size: f64,
}

impl Default for ViewportConfig {
	fn default() -> Self {
		Self {
			sidebar_width: 320.0,
			padding: 36.0,
			min_size: 120.0,
		}
	}
}

impl ViewportConfig {
	/// Canvas size for a window of `inner_width` x `inner_height`.
	pub fn canvas_size(&self, inner_width: f64, inner_height: f64) -> (f64, f64) {
		(
			(inner_width - self.sidebar_width - self.padding).max(self.min_size),
			(inner_height - self.padding).max(self.min_size),
		)
	}
}

/// Where persistent data lives and what downloads are called.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
	pub local_storage_key: String,
	pub nodes_csv_url: String,
	pub edges_csv_url: String,
	pub json_file_name: String,
	pub png_file_name: String,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			local_storage_key: "stac_network".into(),
			nodes_csv_url: "data/nodes.csv".into(),
			edges_csv_url: "data/edges.csv".into(),
			json_file_name: "stac-network.json".into(),
			png_file_name: "stac-network.png".into(),
		}
	}
}

/// Complete editor configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
	pub layout: LayoutConfig,
	pub viewport: ViewportConfig,
	pub storage: StorageConfig,
	/// Group name to CSS hex color.
	pub group_colors: HashMap<String, String>,
	/// Groups offered by the add-node form, in order.
	pub groups: Vec<String>,
}

impl Default for EditorConfig {
	fn default() -> Self {
		Self {
			layout: LayoutConfig::default(),
			viewport: ViewportConfig::default(),
			storage: StorageConfig::default(),
			group_colors: default_group_colors(),
			groups: vec!["NATO".into(), "CSTO".into(), "Other".into()],
		}
	}
}

/// Alliance colors of the sample network.
pub fn default_group_colors() -> HashMap<String, String> {
	[("NATO", "#3a86ff"), ("CSTO", "#ff0000")]
		.into_iter()
		.map(|(k, v)| (k.to_string(), v.to_string()))
		.collect()
}

impl EditorConfig {
	/// Parses a configuration document, defaulting everything it omits.
	pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(text)
	}
}

/// Load configuration from a script element with id="stac-config".
/// Missing or malformed configuration yields the defaults.
pub fn load_config() -> EditorConfig {
	let Some(text) = config_script_text() else {
		return EditorConfig::default();
	};

	match EditorConfig::from_json(&text) {
		Ok(config) => {
			info!("stac-network: loaded page configuration");
			config
		}
		Err(e) => {
			warn!("stac-network: ignoring malformed configuration: {}", e);
			EditorConfig::default()
		}
	}
}

fn config_script_text() -> Option<String> {
	let document = web_sys::window()?.document()?;
	let element = document.get_element_by_id("stac-config")?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	script.text().ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_documents_keep_defaults() {
		let config =
			EditorConfig::from_json(r#"{"layout": {"link_distance": 90}, "groups": ["EU"]}"#)
				.unwrap();
		assert_eq!(config.layout.link_distance, 90.0);
		assert_eq!(config.layout.charge_strength, -420.0);
		assert_eq!(config.groups, vec!["EU".to_string()]);
		assert_eq!(config.storage.local_storage_key, "stac_network");
	}

	#[test]
	fn alpha_decay_reaches_min_in_300_ticks() {
		let layout = LayoutConfig::default();
		let alpha = (1.0 - layout.alpha_decay()).powi(300);
		assert!((alpha - layout.alpha_min).abs() < 1e-9);
	}

	#[test]
	fn canvas_size_subtracts_chrome() {
		let viewport = ViewportConfig::default();
		assert_eq!(viewport.canvas_size(1280.0, 800.0), (924.0, 764.0));
		assert_eq!(viewport.canvas_size(100.0, 100.0), (120.0, 120.0));
	}
}
