//! Editor root combining the graph store with layout, scene and interaction.
//!
//! Created once when the component mounts and shared between event handlers,
//! the animation loop and the runtime API. Every mutation goes through the same
//! pipeline: change the store, reconcile the scene, reheat the simulation and
//! recompute the highlight, all before the handler returns.

use log::{debug, info};

use super::interaction::{
	CLICK_TOLERANCE, DetailForm, DragState, Highlight, PanState, ViewTransform, alpha_floor,
};
use super::scene::{Scene, ScenePatch};
use super::simulation::{Simulation, Viewport};
use super::theme::{GroupPalette, Theme};
use crate::config::EditorConfig;
use crate::error::{GraphError, Result};
use crate::graph::{Filter, GraphStore, LinkKey, Node, NodeId, NodePatch, Snapshot};
use crate::io::{parse_snapshot, snapshot_to_json};

/// Zoom speed per wheel delta unit.
const WHEEL_ZOOM_RATE: f64 = 0.002;

/// Interactive network editor state.
pub struct NetworkEditor {
	config: EditorConfig,
	store: GraphStore,
	simulation: Simulation,
	scene: Scene,
	palette: GroupPalette,
	theme: Theme,
	viewport: Viewport,
	transform: ViewTransform,
	drag: DragState,
	drag_moved: bool,
	press_point: (f64, f64),
	pan: PanState,
	highlight: Highlight,
	hovered: Option<NodeId>,
	detail: Option<DetailForm>,
	/// Bumped by every change to the graph contents or the displayed links.
	revision: u64,
}

impl NetworkEditor {
	pub fn new(config: EditorConfig, snapshot: Snapshot, width: f64, height: f64) -> Self {
		let palette = GroupPalette::from_hex_map(&config.group_colors);
		let viewport = Viewport {
			width,
			height,
			margin: config.layout.edge_margin,
		};
		let mut editor = Self {
			simulation: Simulation::new(config.layout.clone()),
			store: GraphStore::from_snapshot(snapshot),
			scene: Scene::default(),
			palette,
			theme: Theme::default(),
			viewport,
			transform: ViewTransform::default(),
			drag: DragState::Idle,
			drag_moved: false,
			press_point: (0.0, 0.0),
			pan: PanState::default(),
			highlight: Highlight::default(),
			hovered: None,
			detail: None,
			revision: 0,
			config,
		};
		editor.refresh();
		editor
	}

	pub fn config(&self) -> &EditorConfig {
		&self.config
	}

	pub fn store(&self) -> &GraphStore {
		&self.store
	}

	pub fn scene(&self) -> &Scene {
		&self.scene
	}

	pub fn simulation(&self) -> &Simulation {
		&self.simulation
	}

	pub fn theme(&self) -> &Theme {
		&self.theme
	}

	pub fn viewport(&self) -> Viewport {
		self.viewport
	}

	pub fn transform(&self) -> ViewTransform {
		self.transform
	}

	pub fn highlight(&self) -> &Highlight {
		&self.highlight
	}

	pub fn drag(&self) -> DragState {
		self.drag
	}

	pub fn hovered(&self) -> Option<NodeId> {
		self.hovered
	}

	/// The open detail form, if any.
	pub fn detail(&self) -> Option<&DetailForm> {
		self.detail.as_ref()
	}

	pub fn node(&self, id: NodeId) -> Option<&Node> {
		self.store.node(id)
	}

	/// Counter of graph changes, used to detect edits made while an
	/// asynchronous load was in flight.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	/// Reconciles the scene with the store and restarts the layout.
	fn refresh(&mut self) -> ScenePatch {
		self.revision += 1;
		let patch = self.scene.reconcile(
			self.store.nodes(),
			self.store.displayed_links(),
			&self.palette,
			self.theme.node.radius,
		);
		self.scene.sync_positions(self.store.nodes());
		self.simulation.reheat(self.config.layout.reheat_alpha);

		if let Some(focus) = self.highlight.focus() {
			if self.store.node(focus).is_some() {
				self.highlight.set(focus, self.store.neighbors(focus));
			} else {
				self.highlight.clear();
			}
		}
		if self.hovered.is_some_and(|id| self.store.node(id).is_none()) {
			self.hovered = None;
		}
		if self.drag.node().is_some_and(|id| self.store.node(id).is_none()) {
			self.drag = DragState::Idle;
		}
		if let Some(id) = self.detail.as_ref().map(|form| form.node) {
			self.detail = self.store.node(id).map(DetailForm::for_node);
		}
		self.update_alpha_target();

		if !patch.is_empty() {
			debug!(
				"editor: +{} -{} nodes, +{} -{} links",
				patch.entered_nodes.len(),
				patch.exited_nodes.len(),
				patch.entered_links.len(),
				patch.exited_links.len()
			);
		}
		patch
	}

	fn update_alpha_target(&mut self) {
		let floor = alpha_floor(
			&self.config.layout,
			self.drag != DragState::Idle,
			self.detail.is_some(),
		);
		self.simulation.set_alpha_target(floor);
	}

	pub fn add_node(&mut self, label: &str, group: &str) -> Result<NodeId> {
		let id = self.store.add_node(label, group)?.id;
		self.refresh();
		Ok(id)
	}

	pub fn add_link(&mut self, source: &str, target: &str, relationship: &str) -> Result<LinkKey> {
		let key = self.store.add_link(source, target, relationship)?.key();
		self.refresh();
		Ok(key)
	}

	/// Applies a partial update. Unknown ids are ignored.
	pub fn update_node(&mut self, id: NodeId, patch: NodePatch) -> bool {
		let updated = self.store.update_node(id, patch);
		if updated {
			self.refresh();
		}
		updated
	}

	pub fn remove_node(&mut self, id: NodeId) -> bool {
		let removed = self.store.remove_node(id);
		if removed {
			self.refresh();
		}
		removed
	}

	pub fn remove_link(&mut self, source: NodeId, target: NodeId) -> bool {
		let removed = self.store.remove_link(source, target);
		if removed {
			self.refresh();
		}
		removed
	}

	/// Removes every link from the first node labeled `source` to the first
	/// node labeled `target`.
	pub fn remove_link_between(&mut self, source: &str, target: &str) -> Result<()> {
		let (source, target) = (source.trim(), target.trim());
		if source.is_empty() || target.is_empty() {
			return Err(GraphError::validation("Source and target labels required"));
		}
		let (Some(source), Some(target)) = (
			self.store.node_by_label(source).map(|node| node.id),
			self.store.node_by_label(target).map(|node| node.id),
		) else {
			return Err(GraphError::not_found("Source or target node not found"));
		};
		if !self.remove_link(source, target) {
			return Err(GraphError::not_found("No link between those nodes"));
		}
		Ok(())
	}

	/// Groups offered as link filters: the configured groups, then any other
	/// group present in the graph.
	pub fn filter_groups(&self) -> Vec<String> {
		let mut groups = self.config.groups.clone();
		for group in self.store.groups() {
			if !groups.contains(&group) {
				groups.push(group);
			}
		}
		groups
	}

	/// Clears the whole graph.
	pub fn reset(&mut self) {
		self.store.remove_all();
		self.refresh();
		info!("editor: graph reset");
	}

	pub fn apply_filter(&mut self, filter: Filter) {
		self.store.apply_filter(filter);
		self.refresh();
	}

	pub fn import_snapshot(&mut self, snapshot: Snapshot) {
		info!(
			"editor: importing {} nodes, {} links",
			snapshot.nodes.len(),
			snapshot.links.len()
		);
		self.store.import(snapshot);
		self.refresh();
	}

	/// Imports `snapshot` only if the graph is still at `revision`. Returns
	/// whether it was imported.
	pub fn import_if_unchanged(&mut self, snapshot: Snapshot, revision: u64) -> bool {
		if self.revision != revision {
			info!("editor: graph edited during load, keeping it");
			return false;
		}
		self.import_snapshot(snapshot);
		true
	}

	/// Parses and imports a JSON snapshot. On error the graph is unchanged.
	pub fn import_json(&mut self, text: &str) -> Result<()> {
		let snapshot = parse_snapshot(text)?;
		self.import_snapshot(snapshot);
		Ok(())
	}

	pub fn export_snapshot(&self) -> Snapshot {
		self.store.export_snapshot()
	}

	pub fn export_json(&self) -> Result<String> {
		snapshot_to_json(&self.store.export_snapshot())
	}

	/// Advances one animation frame of `dt` seconds. Returns whether anything
	/// visible changed.
	pub fn frame(&mut self, dt: f64) -> bool {
		let (nodes, links) = self.store.layout_mut();
		let ticked = self.simulation.step(nodes, links, self.viewport);
		let animating = self.scene.is_animating();
		if ticked {
			self.scene.sync_positions(self.store.nodes());
		}
		self.scene.advance(dt);
		ticked || animating
	}

	/// Sets the viewport size and nudges the layout to fit it.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.viewport.width = width;
		self.viewport.height = height;
		self.simulation.reheat(self.config.layout.resize_alpha);
	}

	/// Pins `id` at its current position and holds the simulation warm.
	pub fn drag_start(&mut self, id: NodeId) {
		let Some(node) = self.store.node_mut(id) else {
			return;
		};
		if node.is_placed() {
			node.pin = Some((node.x, node.y));
		}
		self.drag = DragState::Dragging(id);
		self.drag_moved = false;
		self.update_alpha_target();
		self.simulation.restart();
	}

	/// Moves the dragged node's pin to graph coordinates `(x, y)`, clamped into
	/// the viewport.
	pub fn drag_move(&mut self, x: f64, y: f64) {
		let DragState::Dragging(id) = self.drag else {
			return;
		};
		let (x, y) = self.viewport.clamp(x, y);
		if let Some(node) = self.store.node_mut(id) {
			node.pin = Some((x, y));
			node.x = x;
			node.y = y;
			node.vx = 0.0;
			node.vy = 0.0;
		}
		self.drag_moved = true;
		self.scene.sync_positions(self.store.nodes());
		self.simulation.restart();
	}

	/// Releases the dragged node. Returns the node when the drag never moved.
	pub fn drag_end(&mut self) -> Option<NodeId> {
		let id = self.drag.node()?;
		if let Some(node) = self.store.node_mut(id) {
			node.pin = None;
		}
		self.drag = DragState::Idle;
		self.update_alpha_target();
		(!self.drag_moved).then_some(id)
	}

	/// Focuses `id`: highlights its neighborhood and opens its detail form.
	pub fn select(&mut self, id: NodeId) {
		if self.store.node(id).is_none() {
			return;
		}
		self.highlight.set(id, self.store.neighbors(id));
		self.open_detail(id);
	}

	/// Clears the highlight and closes the detail form.
	pub fn clear_selection(&mut self) {
		self.highlight.clear();
		self.close_detail();
	}

	/// Opens the detail form for `id`. A node without fields is seeded with an
	/// empty `notes` field.
	pub fn open_detail(&mut self, id: NodeId) {
		let Some(node) = self.store.node_mut(id) else {
			return;
		};
		if node.fields.is_empty() {
			node.fields.insert("notes".into(), String::new());
		}
		self.detail = Some(DetailForm::for_node(node));
		self.update_alpha_target();
		self.simulation.restart();
	}

	pub fn close_detail(&mut self) {
		if self.detail.take().is_some() {
			self.update_alpha_target();
		}
	}

	/// Saves an edited detail form back into its node.
	pub fn save_detail(&mut self, form: &DetailForm) -> bool {
		let Some(node) = self.store.node(form.node) else {
			return false;
		};
		let patch = form.to_patch(node);
		self.update_node(form.node, patch)
	}

	/// Live node under screen point `(sx, sy)`.
	pub fn node_at(&self, sx: f64, sy: f64) -> Option<NodeId> {
		let point = self.transform.screen_to_graph(sx, sy);
		self.scene.node_at(point, self.theme.node.radius)
	}

	/// Pointer pressed: start dragging a node, or panning the background.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		self.press_point = (sx, sy);
		match self.node_at(sx, sy) {
			Some(id) => self.drag_start(id),
			None => self.pan.begin(sx, sy, &self.transform),
		}
	}

	/// Pointer moved: drag, pan or hover depending on what is in progress.
	/// Returns whether the view needs a repaint.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) -> bool {
		if self.drag != DragState::Idle {
			let (px, py) = self.press_point;
			if !self.drag_moved && (sx - px).hypot(sy - py) <= CLICK_TOLERANCE {
				return false;
			}
			let (x, y) = self.transform.screen_to_graph(sx, sy);
			self.drag_move(x, y);
			return true;
		}
		if self.pan.active {
			self.pan.update(sx, sy, &mut self.transform);
			return self.pan.moved;
		}
		let hovered = self.node_at(sx, sy);
		let changed = hovered != self.hovered;
		self.hovered = hovered;
		changed
	}

	/// Pointer released: a press that never moved is a click, selecting the
	/// node under it or clearing the selection on the background.
	pub fn pointer_up(&mut self) {
		if self.drag != DragState::Idle {
			if let Some(id) = self.drag_end() {
				self.select(id);
			}
			return;
		}
		if self.pan.end() {
			self.clear_selection();
		}
	}

	pub fn pointer_leave(&mut self) {
		self.hovered = None;
		if self.drag != DragState::Idle {
			self.drag_end();
		}
		self.pan.end();
	}

	/// Zooms about the pointer by a wheel delta.
	pub fn wheel(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let factor = 2f64.powf(-delta_y * WHEEL_ZOOM_RATE);
		self.transform.zoom_about(sx, sy, factor);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::network_graph::scene::Phase;
	use crate::io::sample_snapshot;

	fn editor() -> NetworkEditor {
		NetworkEditor::new(EditorConfig::default(), sample_snapshot(), 800.0, 600.0)
	}

	fn settle(editor: &mut NetworkEditor, frames: usize) {
		for _ in 0..frames {
			editor.frame(1.0 / 60.0);
		}
	}

	#[test]
	fn construction_enters_the_whole_graph() {
		let editor = editor();
		assert_eq!(editor.scene().nodes().len(), 5);
		assert_eq!(editor.scene().links().len(), 4);
		assert!(editor.simulation().is_running());
	}

	#[test]
	fn mutations_reheat() {
		let mut editor = editor();
		settle(&mut editor, 400);
		assert!(!editor.simulation().is_running());

		editor.add_node("Germany", "NATO").unwrap();
		assert!(editor.simulation().is_running());
		assert_eq!(editor.simulation().alpha(), 0.8);
		assert!(editor.scene().node(6).is_some());
	}

	#[test]
	fn failed_mutation_changes_nothing() {
		let mut editor = editor();
		assert!(editor.add_link("USA", "Atlantis", "").is_err());
		assert!(editor.import_json("{not json").is_err());
		assert_eq!(editor.store().all_links().len(), 4);
		assert_eq!(editor.store().nodes().len(), 5);
	}

	#[test]
	fn drag_to_negative_coordinates_stays_inside() {
		let mut editor = editor();
		settle(&mut editor, 10);
		editor.drag_start(1);
		assert_eq!(editor.simulation().alpha_target(), 0.3);
		editor.drag_move(-500.0, -40.0);

		let node = editor.node(1).unwrap();
		assert_eq!((node.x, node.y), (18.0, 18.0));

		assert_eq!(editor.drag_end(), None);
		assert_eq!(editor.simulation().alpha_target(), 0.0);
		let node = editor.node(1).unwrap();
		assert!(node.pin.is_none());
		assert!((18.0..=782.0).contains(&node.x) && (18.0..=582.0).contains(&node.y));

		editor.frame(1.0 / 60.0);
		let node = editor.node(1).unwrap();
		assert!((18.0..=782.0).contains(&node.x) && (18.0..=582.0).contains(&node.y));
	}

	#[test]
	fn selection_highlights_and_opens_detail() {
		let mut editor = editor();
		editor.select(1);
		assert_eq!(editor.highlight().node_opacity(2), 1.0);
		assert!(editor.highlight().node_opacity(4) < 1.0);
		assert_eq!(editor.detail().map(|form| form.node), Some(1));
		assert_eq!(editor.simulation().alpha_target(), 0.1);

		editor.drag_start(2);
		assert_eq!(editor.simulation().alpha_target(), 0.3);
		editor.drag_end();
		assert_eq!(editor.simulation().alpha_target(), 0.1);

		editor.clear_selection();
		assert!(editor.detail().is_none());
		assert!(!editor.highlight().is_active());
		assert_eq!(editor.simulation().alpha_target(), 0.0);
	}

	#[test]
	fn opening_detail_seeds_notes() {
		let mut editor = editor();
		let id = editor.add_node("Germany", "NATO").unwrap();
		editor.open_detail(id);
		assert_eq!(editor.node(id).unwrap().fields["notes"], "");
	}

	#[test]
	fn highlight_clears_when_focus_disappears() {
		let mut editor = editor();
		editor.select(4);
		editor.remove_node(4);
		assert!(!editor.highlight().is_active());
		assert!(editor.detail().is_none());
	}

	#[test]
	fn highlight_follows_filter() {
		let mut editor = editor();
		editor.select(1);
		editor.apply_filter(Filter::Group("CSTO".into()));
		assert!(editor.highlight().node_opacity(2) < 1.0);
	}

	#[test]
	fn saving_detail_updates_node_and_form() {
		let mut editor = editor();
		editor.select(1);
		let mut form = editor.detail().cloned().unwrap();
		form.label = "United States".into();
		form.set_field("population", "332M");
		assert!(editor.save_detail(&form));

		let node = editor.node(1).unwrap();
		assert_eq!(node.label, "United States");
		assert_eq!(node.fields["population"], "332M");
		assert_eq!(editor.detail().unwrap().title, "United States");
		assert_eq!(editor.scene().node(1).unwrap().label, "United States");
	}

	#[test]
	fn node_click_selects_and_drag_does_not() {
		let mut editor = editor();
		settle(&mut editor, 20);
		let (x, y) = {
			let node = editor.node(3).unwrap();
			(node.x, node.y)
		};

		editor.pointer_down(x, y);
		editor.pointer_move(x + 1.0, y);
		editor.pointer_up();
		assert_eq!(editor.detail().map(|form| form.node), Some(3));

		editor.clear_selection();
		editor.pointer_down(x, y);
		editor.pointer_move(x + 40.0, y + 40.0);
		editor.pointer_up();
		assert!(editor.detail().is_none());
	}

	#[test]
	fn resize_reheats_and_pulls_nodes_inside() {
		let mut editor = editor();
		settle(&mut editor, 400);
		assert!(!editor.simulation().is_running());
		assert!(editor.store().nodes().iter().any(|node| node.x > 182.0));

		editor.resize(200.0, 150.0);
		assert!(editor.simulation().is_running());
		assert_eq!(editor.simulation().alpha(), 0.3);

		editor.frame(1.0 / 60.0);
		for node in editor.store().nodes() {
			assert!((18.0..=182.0).contains(&node.x), "x = {}", node.x);
			assert!((18.0..=132.0).contains(&node.y), "y = {}", node.y);
		}
	}

	#[test]
	fn load_is_skipped_after_edits() {
		let mut editor =
			NetworkEditor::new(EditorConfig::default(), Snapshot::default(), 800.0, 600.0);
		let revision = editor.revision();
		editor.add_node("Germany", "NATO").unwrap();

		assert!(!editor.import_if_unchanged(sample_snapshot(), revision));
		assert_eq!(editor.store().nodes().len(), 1);
		assert_eq!(editor.node(1).unwrap().label, "Germany");
	}

	#[test]
	fn load_applies_to_untouched_graph() {
		let mut editor =
			NetworkEditor::new(EditorConfig::default(), Snapshot::default(), 800.0, 600.0);
		let revision = editor.revision();
		editor.select(1);

		assert!(editor.import_if_unchanged(sample_snapshot(), revision));
		assert_eq!(editor.store().nodes().len(), 5);
	}

	#[test]
	fn remove_link_by_labels() {
		let mut editor = editor();
		editor.remove_link_between("Russia", "Belarus").unwrap();
		assert_eq!(editor.store().all_links().len(), 3);
		let key = LinkKey { source: 4, target: 5 };
		assert!(editor.scene().link(key).is_some_and(|link| link.phase == Phase::Exiting));

		assert!(matches!(
			editor.remove_link_between("Russia", "Belarus"),
			Err(GraphError::NotFound(_))
		));
		assert!(matches!(
			editor.remove_link_between("", "Belarus"),
			Err(GraphError::Validation(_))
		));
	}

	#[test]
	fn filter_groups_include_graph_groups() {
		let mut editor = editor();
		editor.add_node("Switzerland", "Neutral").unwrap();
		assert_eq!(editor.filter_groups(), vec!["NATO", "CSTO", "Other", "Neutral"]);
	}

	#[test]
	fn background_click_clears_selection() {
		let mut editor = editor();
		editor.select(1);
		editor.pointer_down(-1000.0, -1000.0);
		editor.pointer_up();
		assert!(editor.detail().is_none());
	}
}
