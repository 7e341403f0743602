//! Interaction state: dragging, selection highlight, pan/zoom and the node
//! detail form.
//!
//! Everything here is plain data. The editor drives these types from pointer
//! events and feeds the resulting alpha floor back into the simulation.

use std::collections::HashSet;

use crate::config::LayoutConfig;
use crate::graph::{Fields, Node, NodeId, NodePatch};

/// Zoom limits of the view transform.
pub const MIN_ZOOM: f64 = 0.2;
pub const MAX_ZOOM: f64 = 3.0;

/// Opacity of nodes outside the highlighted neighborhood.
pub const DIMMED_NODE_OPACITY: f64 = 0.12;
/// Opacity of links not incident to the focused node.
pub const DIMMED_LINK_OPACITY: f64 = 0.06;

/// Values longer than this are edited in a textarea.
const MULTILINE_THRESHOLD: usize = 80;

/// Pan and zoom transform applied to the entire graph view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	/// Zoom factor, clamped to `MIN_ZOOM..=MAX_ZOOM`.
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	/// Scales by `factor` keeping the graph point under `(sx, sy)` fixed.
	pub fn zoom_about(&mut self, sx: f64, sy: f64, factor: f64) {
		let k = (self.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let (gx, gy) = self.screen_to_graph(sx, sy);
		self.x = sx - gx * k;
		self.y = sy - gy * k;
		self.k = k;
	}
}

/// Node drag state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DragState {
	#[default]
	Idle,
	Dragging(NodeId),
}

impl DragState {
	pub fn node(self) -> Option<NodeId> {
		match self {
			DragState::Idle => None,
			DragState::Dragging(id) => Some(id),
		}
	}
}

/// Tracks an in-progress canvas pan. A press that never moves is a click.
#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

/// Pointer travel below which a press/release pair still counts as a click.
pub const CLICK_TOLERANCE: f64 = 3.0;

impl PanState {
	pub fn begin(&mut self, sx: f64, sy: f64, transform: &ViewTransform) {
		*self = Self {
			active: true,
			moved: false,
			start_x: sx,
			start_y: sy,
			transform_start_x: transform.x,
			transform_start_y: transform.y,
		};
	}

	/// Applies pointer movement to `transform` while a pan is active.
	pub fn update(&mut self, sx: f64, sy: f64, transform: &mut ViewTransform) {
		if !self.active {
			return;
		}
		let (dx, dy) = (sx - self.start_x, sy - self.start_y);
		if dx.hypot(dy) > CLICK_TOLERANCE {
			self.moved = true;
		}
		if self.moved {
			transform.x = self.transform_start_x + dx;
			transform.y = self.transform_start_y + dy;
		}
	}

	/// Ends the pan. Returns true when it was a click on the background.
	pub fn end(&mut self) -> bool {
		let click = self.active && !self.moved;
		self.active = false;
		click
	}
}

/// Selection highlight: a focused node and its direct neighbors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Highlight {
	focus: Option<NodeId>,
	neighbors: HashSet<NodeId>,
}

impl Highlight {
	pub fn focus(&self) -> Option<NodeId> {
		self.focus
	}

	pub fn set(&mut self, focus: NodeId, neighbors: HashSet<NodeId>) {
		self.focus = Some(focus);
		self.neighbors = neighbors;
	}

	pub fn clear(&mut self) {
		self.focus = None;
		self.neighbors.clear();
	}

	pub fn is_active(&self) -> bool {
		self.focus.is_some()
	}

	pub fn node_opacity(&self, id: NodeId) -> f64 {
		match self.focus {
			None => 1.0,
			Some(focus) if focus == id || self.neighbors.contains(&id) => 1.0,
			Some(_) => DIMMED_NODE_OPACITY,
		}
	}

	pub fn link_opacity(&self, source: NodeId, target: NodeId) -> f64 {
		match self.focus {
			None => 1.0,
			Some(focus) if focus == source || focus == target => 1.0,
			Some(_) => DIMMED_LINK_OPACITY,
		}
	}
}

/// Alpha target the simulation should hold for the current interaction.
/// The strongest active hold wins.
pub fn alpha_floor(config: &LayoutConfig, dragging: bool, detail_open: bool) -> f64 {
	let drag = if dragging { config.drag_alpha_target } else { 0.0 };
	let detail = if detail_open {
		config.detail_alpha_target
	} else {
		0.0
	};
	drag.max(detail)
}

/// One editable field row of the detail form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRow {
	pub key: String,
	pub caption: String,
	pub value: String,
	/// Edit in a textarea rather than a single-line input.
	pub multiline: bool,
}

impl FieldRow {
	fn new(key: &str, value: &str) -> Self {
		Self {
			key: key.to_string(),
			caption: capitalize(key),
			value: value.to_string(),
			multiline: value.contains('\n') || value.chars().count() > MULTILINE_THRESHOLD,
		}
	}
}

/// Editable view of a single node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetailForm {
	pub node: NodeId,
	pub title: String,
	pub subtitle: String,
	pub label: String,
	pub group: String,
	pub rows: Vec<FieldRow>,
}

impl DetailForm {
	/// Builds the form for `node`. A node without fields gets a single notes
	/// textarea.
	pub fn for_node(node: &Node) -> Self {
		let rows = if node.fields.is_empty() {
			vec![FieldRow {
				multiline: true,
				..FieldRow::new("notes", "")
			}]
		} else {
			node.fields
				.iter()
				.map(|(key, value)| FieldRow::new(key, value))
				.collect()
		};

		Self {
			node: node.id,
			title: node.label.clone(),
			subtitle: node.group.clone(),
			label: node.label.clone(),
			group: node.group.clone(),
			rows,
		}
	}

	/// Updates the value of the row named `key`.
	pub fn set_field(&mut self, key: &str, value: impl Into<String>) {
		if let Some(row) = self.rows.iter_mut().find(|row| row.key == key) {
			row.value = value.into();
		}
	}

	/// Patch that saving this form applies to `node`: blank label or group
	/// keep the existing value; row values are merged over the node's fields.
	pub fn to_patch(&self, node: &Node) -> NodePatch {
		let non_blank = |value: &str| {
			let value = value.trim();
			(!value.is_empty()).then(|| value.to_string())
		};

		let mut fields: Fields = node.fields.clone();
		for row in &self.rows {
			fields.insert(row.key.clone(), row.value.clone());
		}

		NodePatch {
			label: non_blank(&self.label),
			group: non_blank(&self.group),
			fields: Some(fields),
		}
	}
}

fn capitalize(s: &str) -> String {
	let mut chars = s.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

#[cfg(test)]
mod tests {
	use approx::assert_relative_eq;

	use super::*;

	#[test]
	fn zoom_is_clamped_and_anchored() {
		let mut transform = ViewTransform::default();
		transform.zoom_about(100.0, 50.0, 2.0);
		assert_relative_eq!(transform.k, 2.0);
		let (gx, gy) = transform.screen_to_graph(100.0, 50.0);
		assert_relative_eq!(gx, 100.0);
		assert_relative_eq!(gy, 50.0);

		transform.zoom_about(0.0, 0.0, 100.0);
		assert_relative_eq!(transform.k, MAX_ZOOM);
		transform.zoom_about(0.0, 0.0, 0.0001);
		assert_relative_eq!(transform.k, MIN_ZOOM);
	}

	#[test]
	fn still_press_is_a_click() {
		let mut transform = ViewTransform::default();
		let mut pan = PanState::default();
		pan.begin(10.0, 10.0, &transform);
		pan.update(11.0, 10.0, &mut transform);
		assert!(pan.end());
		assert_eq!(transform, ViewTransform::default());

		pan.begin(10.0, 10.0, &transform);
		pan.update(60.0, 30.0, &mut transform);
		assert!(!pan.end());
		assert_relative_eq!(transform.x, 50.0);
		assert_relative_eq!(transform.y, 20.0);
	}

	#[test]
	fn highlight_dims_outside_neighborhood() {
		let mut highlight = Highlight::default();
		assert_eq!(highlight.node_opacity(9), 1.0);

		highlight.set(1, HashSet::from([2, 3]));
		assert_eq!(highlight.node_opacity(1), 1.0);
		assert_eq!(highlight.node_opacity(3), 1.0);
		assert_eq!(highlight.node_opacity(4), DIMMED_NODE_OPACITY);
		assert_eq!(highlight.link_opacity(2, 1), 1.0);
		assert_eq!(highlight.link_opacity(2, 3), DIMMED_LINK_OPACITY);
		assert_eq!(highlight.link_opacity(4, 5), DIMMED_LINK_OPACITY);

		highlight.clear();
		assert!(!highlight.is_active());
		assert_eq!(highlight.link_opacity(2, 3), 1.0);
	}

	#[test]
	fn strongest_hold_wins() {
		let config = LayoutConfig::default();
		assert_eq!(alpha_floor(&config, false, false), 0.0);
		assert_eq!(alpha_floor(&config, false, true), 0.1);
		assert_eq!(alpha_floor(&config, true, true), 0.3);
	}

	#[test]
	fn form_rows_follow_fields() {
		let long = "x".repeat(81);
		let node = Node::new(1, "USA", "NATO")
			.with_field("population", "331M")
			.with_field("description", long.as_str())
			.with_field("history", "a\nb");
		let form = DetailForm::for_node(&node);
		assert_eq!(form.title, "USA");
		assert_eq!(form.subtitle, "NATO");

		let row = |key: &str| form.rows.iter().find(|row| row.key == key).unwrap();
		assert_eq!(row("population").caption, "Population");
		assert!(!row("population").multiline);
		assert!(row("description").multiline);
		assert!(row("history").multiline);
	}

	#[test]
	fn empty_fields_offer_notes() {
		let form = DetailForm::for_node(&Node::new(2, "UK", "NATO"));
		assert_eq!(form.rows.len(), 1);
		assert_eq!(form.rows[0].key, "notes");
		assert_eq!(form.rows[0].caption, "Notes");
		assert!(form.rows[0].multiline);
	}

	#[test]
	fn saving_keeps_blank_label_and_merges_fields() {
		let mut node = Node::new(1, "USA", "NATO")
			.with_field("population", "331M")
			.with_field("GDP", "$21T");
		let mut form = DetailForm::for_node(&node);
		form.label = "   ".into();
		form.group = " Other ".into();
		form.set_field("population", "332M");

		form.to_patch(&node).apply_to(&mut node);
		assert_eq!(node.label, "USA");
		assert_eq!(node.group, "Other");
		assert_eq!(node.fields["population"], "332M");
		assert_eq!(node.fields["GDP"], "$21T");
	}
}
