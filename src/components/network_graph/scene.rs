//! Declarative scene and keyed reconciliation.
//!
//! The scene mirrors the store's node list and displayed link list as visual
//! elements keyed by identity (node id, link endpoint pair). [`Scene::reconcile`]
//! diffs new data against the existing elements and reports what entered,
//! updated and exited as a [`ScenePatch`]; elements are never recreated for an
//! update, so running transitions survive edits. The painter only ever reads
//! the scene.

use std::collections::{HashMap, HashSet};

use super::theme::{Color, GroupPalette};
use crate::graph::{Link, LinkKey, Node, NodeId};

const NODE_ENTER_SECS: f64 = 0.25;
const LINK_ENTER_SECS: f64 = 0.2;
const EXIT_SECS: f64 = 0.15;

/// Curvature of link arcs: arc radius as a multiple of the endpoint distance.
pub const ARC_RADIUS_FACTOR: f64 = 1.2;

/// Linear interpolation of a scalar attribute over time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween {
	from: f64,
	to: f64,
	elapsed: f64,
	duration: f64,
}

impl Tween {
	pub fn new(from: f64, to: f64, duration: f64) -> Self {
		Self {
			from,
			to,
			elapsed: 0.0,
			duration,
		}
	}

	/// Restarts toward `to` from the current value.
	pub fn retarget(&mut self, to: f64, duration: f64) {
		*self = Self::new(self.value(), to, duration);
	}

	pub fn advance(&mut self, dt: f64) {
		self.elapsed = (self.elapsed + dt).min(self.duration);
	}

	pub fn value(&self) -> f64 {
		if self.duration <= 0.0 {
			return self.to;
		}
		let t = self.elapsed / self.duration;
		self.from + (self.to - self.from) * t
	}

	pub fn is_done(&self) -> bool {
		self.elapsed >= self.duration
	}

	pub fn target(&self) -> f64 {
		self.to
	}
}

/// Lifecycle of a visual element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
	/// Present in the data.
	Live,
	/// Removed from the data, fading out.
	Exiting,
}

/// Visual element for a node.
#[derive(Clone, Debug)]
pub struct NodeVisual {
	pub id: NodeId,
	pub label: String,
	pub group: String,
	pub color: Color,
	pub x: f64,
	pub y: f64,
	pub radius: Tween,
	pub opacity: Tween,
	pub phase: Phase,
}

/// Visual element for a link.
#[derive(Clone, Debug)]
pub struct LinkVisual {
	pub key: LinkKey,
	pub relationship: String,
	/// Arc geometry, absent while an endpoint cannot be resolved.
	pub path: Option<ArcPath>,
	pub opacity: Tween,
	pub phase: Phase,
}

/// Keys touched by one reconcile pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScenePatch {
	pub entered_nodes: Vec<NodeId>,
	pub updated_nodes: Vec<NodeId>,
	pub exited_nodes: Vec<NodeId>,
	pub entered_links: Vec<LinkKey>,
	pub updated_links: Vec<LinkKey>,
	pub exited_links: Vec<LinkKey>,
}

impl ScenePatch {
	pub fn is_empty(&self) -> bool {
		self.entered_nodes.is_empty()
			&& self.exited_nodes.is_empty()
			&& self.entered_links.is_empty()
			&& self.exited_links.is_empty()
	}
}

/// Circular arc from a link's source to its target, always sweeping the same
/// way (the SVG `A r,r 0 0,1` form).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArcPath {
	pub start: (f64, f64),
	pub end: (f64, f64),
	pub radius: f64,
}

impl ArcPath {
	/// Arc between two points, `None` when they coincide.
	pub fn between(start: (f64, f64), end: (f64, f64)) -> Option<Self> {
		let distance = ((end.0 - start.0).powi(2) + (end.1 - start.1).powi(2)).sqrt();
		(distance > f64::EPSILON).then(|| Self {
			start,
			end,
			radius: distance * ARC_RADIUS_FACTOR,
		})
	}

	/// Center of the arc's circle: the minor arc drawn with increasing angle
	/// (clockwise on a y-down canvas) from start to end.
	pub fn center(&self) -> (f64, f64) {
		let (dx, dy) = (self.end.0 - self.start.0, self.end.1 - self.start.1);
		let chord = (dx * dx + dy * dy).sqrt();
		let (ux, uy) = (dx / chord, dy / chord);
		let apothem = (self.radius * self.radius - chord * chord / 4.0).max(0.0).sqrt();
		let (mx, my) = ((self.start.0 + self.end.0) / 2.0, (self.start.1 + self.end.1) / 2.0);
		(mx - uy * apothem, my + ux * apothem)
	}

	/// Start and end angles around [`Self::center`].
	pub fn angles(&self) -> (f64, f64) {
		let (cx, cy) = self.center();
		(
			(self.start.1 - cy).atan2(self.start.0 - cx),
			(self.end.1 - cy).atan2(self.end.0 - cx),
		)
	}

	/// Point on the arc `distance` units before the end, with the unit tangent
	/// in the direction of travel there.
	pub fn point_before_end(&self, distance: f64) -> ((f64, f64), (f64, f64)) {
		let (cx, cy) = self.center();
		let (_, end_angle) = self.angles();
		let angle = end_angle - distance / self.radius;
		let point = (cx + self.radius * angle.cos(), cy + self.radius * angle.sin());
		(point, (-angle.sin(), angle.cos()))
	}

	/// SVG path data for the arc.
	pub fn to_svg(&self) -> String {
		format!(
			"M{},{} A{},{} 0 0,1 {},{}",
			self.start.0, self.start.1, self.radius, self.radius, self.end.0, self.end.1
		)
	}
}

/// The rendered scene: every live element plus those still fading out.
#[derive(Clone, Debug, Default)]
pub struct Scene {
	nodes: Vec<NodeVisual>,
	links: Vec<LinkVisual>,
}

impl Scene {
	pub fn nodes(&self) -> &[NodeVisual] {
		&self.nodes
	}

	pub fn links(&self) -> &[LinkVisual] {
		&self.links
	}

	pub fn node(&self, id: NodeId) -> Option<&NodeVisual> {
		self.nodes.iter().find(|visual| visual.id == id)
	}

	pub fn link(&self, key: LinkKey) -> Option<&LinkVisual> {
		self.links.iter().find(|visual| visual.key == key)
	}

	/// Whether any transition is still running.
	pub fn is_animating(&self) -> bool {
		self.nodes
			.iter()
			.any(|visual| !visual.opacity.is_done() || !visual.radius.is_done())
			|| self.links.iter().any(|visual| !visual.opacity.is_done())
	}

	/// Diffs `nodes` and `links` against the current elements.
	pub fn reconcile(
		&mut self,
		nodes: &[Node],
		links: &[Link],
		palette: &GroupPalette,
		node_radius: f64,
	) -> ScenePatch {
		let mut patch = ScenePatch::default();

		let mut old_nodes: HashMap<NodeId, NodeVisual> =
			self.nodes.drain(..).map(|visual| (visual.id, visual)).collect();
		let mut next_nodes = Vec::with_capacity(nodes.len());
		for node in nodes {
			let color = palette.color_for(&node.group);
			let visual = match old_nodes.remove(&node.id) {
				Some(mut visual) => {
					if visual.phase == Phase::Exiting {
						visual.phase = Phase::Live;
						visual.opacity.retarget(1.0, NODE_ENTER_SECS);
						patch.entered_nodes.push(node.id);
					} else {
						patch.updated_nodes.push(node.id);
					}
					visual.label.clone_from(&node.label);
					visual.group.clone_from(&node.group);
					visual.color = color;
					visual
				}
				None => {
					patch.entered_nodes.push(node.id);
					NodeVisual {
						id: node.id,
						label: node.label.clone(),
						group: node.group.clone(),
						color,
						x: node.x,
						y: node.y,
						radius: Tween::new(0.0, node_radius, NODE_ENTER_SECS),
						opacity: Tween::new(0.0, 1.0, NODE_ENTER_SECS),
						phase: Phase::Live,
					}
				}
			};
			next_nodes.push(visual);
		}
		for mut visual in old_nodes.into_values() {
			if visual.phase == Phase::Live {
				visual.phase = Phase::Exiting;
				visual.opacity.retarget(0.0, EXIT_SECS);
				patch.exited_nodes.push(visual.id);
			}
			next_nodes.push(visual);
		}
		self.nodes = next_nodes;

		let mut old_links: HashMap<LinkKey, LinkVisual> =
			self.links.drain(..).map(|visual| (visual.key, visual)).collect();
		let mut seen = HashSet::new();
		let mut next_links = Vec::with_capacity(links.len());
		for link in links {
			let key = link.key();
			if !seen.insert(key) {
				continue;
			}
			let visual = match old_links.remove(&key) {
				Some(mut visual) => {
					if visual.phase == Phase::Exiting {
						visual.phase = Phase::Live;
						visual.opacity.retarget(1.0, LINK_ENTER_SECS);
						patch.entered_links.push(key);
					} else {
						patch.updated_links.push(key);
					}
					visual.relationship.clone_from(&link.relationship);
					visual
				}
				None => {
					patch.entered_links.push(key);
					LinkVisual {
						key,
						relationship: link.relationship.clone(),
						path: None,
						opacity: Tween::new(0.0, 1.0, LINK_ENTER_SECS),
						phase: Phase::Live,
					}
				}
			};
			next_links.push(visual);
		}
		for mut visual in old_links.into_values() {
			if visual.phase == Phase::Live {
				visual.phase = Phase::Exiting;
				visual.opacity.retarget(0.0, EXIT_SECS);
				patch.exited_links.push(visual.key);
			}
			next_links.push(visual);
		}
		self.links = next_links;

		patch.exited_nodes.sort_unstable();
		patch.exited_links.sort_unstable();
		patch
	}

	/// Copies simulated positions into live node elements and recomputes link
	/// arcs. Exiting nodes keep their last position; links with an endpoint
	/// that is not live get no path.
	pub fn sync_positions(&mut self, nodes: &[Node]) {
		let positions: HashMap<NodeId, (f64, f64)> = nodes
			.iter()
			.filter(|node| node.is_placed())
			.map(|node| (node.id, (node.x, node.y)))
			.collect();

		for visual in &mut self.nodes {
			if let Some(&(x, y)) = positions.get(&visual.id) {
				visual.x = x;
				visual.y = y;
			}
		}

		for visual in &mut self.links {
			visual.path = match (
				positions.get(&visual.key.source),
				positions.get(&visual.key.target),
			) {
				(Some(&start), Some(&end)) => ArcPath::between(start, end),
				_ => None,
			};
		}
	}

	/// Advances transitions by `dt` seconds and drops elements whose exit
	/// transition has finished.
	pub fn advance(&mut self, dt: f64) {
		for visual in &mut self.nodes {
			visual.opacity.advance(dt);
			visual.radius.advance(dt);
		}
		for visual in &mut self.links {
			visual.opacity.advance(dt);
		}

		self.nodes
			.retain(|visual| !(visual.phase == Phase::Exiting && visual.opacity.is_done()));
		self.links
			.retain(|visual| !(visual.phase == Phase::Exiting && visual.opacity.is_done()));
	}

	/// Live node under `point`, topmost (last drawn) first.
	pub fn node_at(&self, point: (f64, f64), hit_radius: f64) -> Option<NodeId> {
		self.nodes
			.iter()
			.rev()
			.filter(|visual| visual.phase == Phase::Live)
			.find(|visual| {
				let (dx, dy) = (visual.x - point.0, visual.y - point.1);
				dx * dx + dy * dy <= hit_radius * hit_radius
			})
			.map(|visual| visual.id)
	}
}
