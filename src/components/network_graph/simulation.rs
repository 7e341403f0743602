//! Force-directed layout engine.
//!
//! A naive O(n²) velocity-Verlet style simulation in the spirit of d3-force:
//! each tick applies many-body repulsion, link springs, centering and
//! collision to node velocities, integrates them into positions and clamps the
//! result into the viewport. An energy parameter, alpha, scales the forces and
//! decays toward `alpha_target`; once it drops below `alpha_min` the
//! simulation stops until something restarts it.

use std::collections::HashMap;
use std::f64::consts::PI;

use crate::config::LayoutConfig;
use crate::graph::{Link, Node, NodeId};

/// Keeps `value` within `[margin, extent - margin]`, or at the midpoint when
/// the extent is too small to leave a margin on both sides.
pub fn clamp_axis(value: f64, extent: f64, margin: f64) -> f64 {
	if extent < margin * 2.0 {
		return extent / 2.0;
	}
	if value.is_nan() {
		return extent / 2.0;
	}
	value.clamp(margin, extent - margin)
}

/// The drawable area nodes are confined to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	pub width: f64,
	pub height: f64,
	pub margin: f64,
}

impl Viewport {
	pub fn center(&self) -> (f64, f64) {
		(self.width / 2.0, self.height / 2.0)
	}

	/// Clamps a point into the margin-inset viewport.
	pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
		(
			clamp_axis(x, self.width, self.margin),
			clamp_axis(y, self.height, self.margin),
		)
	}
}

/// Simulation state: energy and force parameters. Nodes are owned by the
/// graph store and passed in for every tick.
#[derive(Clone, Debug)]
pub struct Simulation {
	config: LayoutConfig,
	alpha: f64,
	alpha_target: f64,
	alpha_decay: f64,
	running: bool,
	jiggle_seed: f64,
}

impl Simulation {
	pub fn new(config: LayoutConfig) -> Self {
		let alpha_decay = config.alpha_decay();
		Self {
			config,
			alpha: 1.0,
			alpha_target: 0.0,
			alpha_decay,
			running: true,
			jiggle_seed: 0.0,
		}
	}

	pub fn config(&self) -> &LayoutConfig {
		&self.config
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn alpha_target(&self) -> f64 {
		self.alpha_target
	}

	/// Whether the next frame should tick.
	pub fn is_running(&self) -> bool {
		self.running
	}

	/// Sets alpha and resumes ticking.
	pub fn reheat(&mut self, alpha: f64) {
		self.alpha = alpha.clamp(0.0, 1.0);
		self.running = true;
	}

	/// Sets the value alpha decays toward. A nonzero target keeps the graph
	/// responsive indefinitely.
	pub fn set_alpha_target(&mut self, target: f64) {
		self.alpha_target = target.clamp(0.0, 1.0);
	}

	/// Resumes ticking without touching alpha.
	pub fn restart(&mut self) {
		self.running = true;
	}

	/// Deterministic tiny offset used to separate coincident nodes.
	fn jiggle(&mut self) -> f64 {
		self.jiggle_seed += 1.0;
		let x = (self.jiggle_seed * 12.9898).sin() * 43758.5453;
		(x - x.floor() - 0.5) * 1e-6
	}

	/// Advances one frame: a single tick while running. Returns whether a tick
	/// was executed.
	pub fn step(&mut self, nodes: &mut [Node], links: &[Link], viewport: Viewport) -> bool {
		if !self.running {
			return false;
		}

		self.tick(nodes, links, viewport);
		if self.alpha < self.config.alpha_min {
			self.running = false;
		}
		true
	}

	/// Runs one integration step regardless of the running state.
	pub fn tick(&mut self, nodes: &mut [Node], links: &[Link], viewport: Viewport) {
		self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;

		seed_unplaced(nodes, viewport);

		let index_by_id: HashMap<NodeId, usize> = nodes
			.iter()
			.enumerate()
			.map(|(index, node)| (node.id, index))
			.collect();
		let resolved: Vec<(usize, usize)> = links
			.iter()
			.filter_map(|link| Some((*index_by_id.get(&link.source)?, *index_by_id.get(&link.target)?)))
			.collect();

		self.apply_link_springs(nodes, &resolved);
		self.apply_many_body(nodes);
		apply_centering(nodes, viewport);
		self.apply_collision(nodes);

		let keep = 1.0 - self.config.velocity_decay;
		for node in nodes.iter_mut() {
			match node.pin {
				Some((fx, fy)) => {
					node.x = fx;
					node.y = fy;
					node.vx = 0.0;
					node.vy = 0.0;
				}
				None => {
					node.vx *= keep;
					node.vy *= keep;
					node.x += node.vx;
					node.y += node.vy;
				}
			}

			(node.x, node.y) = viewport.clamp(node.x, node.y);
		}
	}

	fn apply_link_springs(&mut self, nodes: &mut [Node], links: &[(usize, usize)]) {
		let mut degree = vec![0usize; nodes.len()];
		for &(source, target) in links {
			degree[source] += 1;
			degree[target] += 1;
		}

		for &(source, target) in links {
			if source == target {
				continue;
			}

			let strength = 1.0 / degree[source].min(degree[target]) as f64;
			let bias = degree[source] as f64 / (degree[source] + degree[target]) as f64;

			let mut dx = nodes[target].x + nodes[target].vx - nodes[source].x - nodes[source].vx;
			let mut dy = nodes[target].y + nodes[target].vy - nodes[source].y - nodes[source].vy;
			if dx == 0.0 {
				dx = self.jiggle();
			}
			if dy == 0.0 {
				dy = self.jiggle();
			}

			let length = (dx * dx + dy * dy).sqrt();
			let scale = (length - self.config.link_distance) / length * self.alpha * strength;
			let (fx, fy) = (dx * scale, dy * scale);

			nodes[target].vx -= fx * bias;
			nodes[target].vy -= fy * bias;
			nodes[source].vx += fx * (1.0 - bias);
			nodes[source].vy += fy * (1.0 - bias);
		}
	}

	fn apply_many_body(&mut self, nodes: &mut [Node]) {
		let strength = self.config.charge_strength * self.alpha;
		let n = nodes.len();

		for i in 0..n {
			for j in (i + 1)..n {
				let mut dx = nodes[j].x - nodes[i].x;
				let mut dy = nodes[j].y - nodes[i].y;
				if dx == 0.0 {
					dx = self.jiggle();
				}
				if dy == 0.0 {
					dy = self.jiggle();
				}

				// Clamp the squared distance to 1 to avoid blowing up on
				// near-coincident pairs.
				let distance_sq = (dx * dx + dy * dy).max(1.0);
				let w = strength / distance_sq;

				nodes[i].vx += dx * w;
				nodes[i].vy += dy * w;
				nodes[j].vx -= dx * w;
				nodes[j].vy -= dy * w;
			}
		}
	}

	fn apply_collision(&mut self, nodes: &mut [Node]) {
		let radius = self.config.collision_radius;
		let min_distance = radius * 2.0;
		let n = nodes.len();

		for i in 0..n {
			for j in (i + 1)..n {
				let mut dx = (nodes[i].x + nodes[i].vx) - (nodes[j].x + nodes[j].vx);
				let mut dy = (nodes[i].y + nodes[i].vy) - (nodes[j].y + nodes[j].vy);
				let mut distance_sq = dx * dx + dy * dy;
				if distance_sq >= min_distance * min_distance {
					continue;
				}

				if dx == 0.0 {
					dx = self.jiggle();
					distance_sq += dx * dx;
				}
				if dy == 0.0 {
					dy = self.jiggle();
					distance_sq += dy * dy;
				}

				let distance = distance_sq.sqrt();
				let push = (min_distance - distance) / distance;
				// Equal radii: the overlap is shared evenly.
				let (px, py) = (dx * push * 0.5, dy * push * 0.5);

				nodes[i].vx += px;
				nodes[i].vy += py;
				nodes[j].vx -= px;
				nodes[j].vy -= py;
			}
		}
	}
}

/// Moves the node set so its centroid sits on the viewport center.
fn apply_centering(nodes: &mut [Node], viewport: Viewport) {
	if nodes.is_empty() {
		return;
	}

	let (cx, cy) = viewport.center();
	let count = nodes.len() as f64;
	let (sum_x, sum_y) = nodes
		.iter()
		.fold((0.0, 0.0), |(sx, sy), node| (sx + node.x, sy + node.y));
	let (shift_x, shift_y) = (sum_x / count - cx, sum_y / count - cy);

	for node in nodes.iter_mut() {
		node.x -= shift_x;
		node.y -= shift_y;
	}
}

/// Places nodes without a position on a phyllotaxis spiral around the
/// viewport center.
fn seed_unplaced(nodes: &mut [Node], viewport: Viewport) {
	const INITIAL_RADIUS: f64 = 10.0;
	let initial_angle = PI * (3.0 - 5f64.sqrt());
	let (cx, cy) = viewport.center();

	for (index, node) in nodes.iter_mut().enumerate() {
		if node.is_placed() {
			continue;
		}

		let radius = INITIAL_RADIUS * (0.5 + index as f64).sqrt();
		let angle = index as f64 * initial_angle;
		node.x = cx + radius * angle.cos();
		node.y = cy + radius * angle.sin();
		node.vx = 0.0;
		node.vy = 0.0;
	}
}

#[cfg(test)]
mod tests {
	use approx::assert_relative_eq;

	use super::*;
	use crate::io::sample_snapshot;

	const VIEWPORT: Viewport = Viewport {
		width: 800.0,
		height: 600.0,
		margin: 18.0,
	};

	fn within_bounds(node: &Node) -> bool {
		(18.0..=782.0).contains(&node.x) && (18.0..=582.0).contains(&node.y)
	}

	#[test]
	fn clamp_axis_handles_tiny_extents() {
		assert_eq!(clamp_axis(-50.0, 800.0, 18.0), 18.0);
		assert_eq!(clamp_axis(900.0, 800.0, 18.0), 782.0);
		assert_eq!(clamp_axis(5.0, 20.0, 18.0), 10.0);
	}

	#[test]
	fn alpha_decays_toward_target_and_stops() {
		let mut sim = Simulation::new(LayoutConfig::default());
		let mut nodes = sample_snapshot().nodes;
		let links = sample_snapshot().links;

		let mut ticks = 0;
		while sim.step(&mut nodes, &links, VIEWPORT) {
			ticks += 1;
			assert!(ticks < 1000, "simulation never settled");
		}
		assert!(sim.alpha() < sim.config().alpha_min);
		assert!(!sim.is_running());
		assert!(!sim.step(&mut nodes, &links, VIEWPORT));
	}

	#[test]
	fn alpha_floor_keeps_running() {
		let mut sim = Simulation::new(LayoutConfig::default());
		sim.set_alpha_target(0.3);
		let mut nodes = sample_snapshot().nodes;
		for _ in 0..2000 {
			assert!(sim.step(&mut nodes, &[], VIEWPORT));
		}
		assert_relative_eq!(sim.alpha(), 0.3, epsilon = 1e-6);
	}

	#[test]
	fn reheat_resumes_settled_simulation() {
		let mut sim = Simulation::new(LayoutConfig::default());
		let mut nodes = sample_snapshot().nodes;
		while sim.step(&mut nodes, &[], VIEWPORT) {}
		sim.reheat(0.8);
		assert!(sim.is_running());
		assert_relative_eq!(sim.alpha(), 0.8);
	}

	#[test]
	fn unplaced_nodes_are_seeded_near_center() {
		let config = LayoutConfig {
			charge_strength: 0.0,
			collision_radius: 0.0,
			..LayoutConfig::default()
		};
		let mut sim = Simulation::new(config);
		let mut nodes = sample_snapshot().nodes;
		sim.tick(&mut nodes, &[], VIEWPORT);
		for node in &nodes {
			assert!(node.is_placed());
			assert!((node.x - 400.0).abs() < 30.0 && (node.y - 300.0).abs() < 30.0);
		}
	}

	#[test]
	fn positions_stay_in_viewport() {
		let mut sim = Simulation::new(LayoutConfig::default());
		let snapshot = sample_snapshot();
		let mut nodes = snapshot.nodes;
		nodes[0].x = -500.0;
		nodes[0].y = 5000.0;
		for _ in 0..50 {
			sim.tick(&mut nodes, &snapshot.links, VIEWPORT);
			assert!(nodes.iter().all(within_bounds));
		}
	}

	#[test]
	fn pinned_node_holds_pin() {
		let mut sim = Simulation::new(LayoutConfig::default());
		let mut nodes = sample_snapshot().nodes;
		nodes[2].pin = Some((100.0, 120.0));
		for _ in 0..10 {
			sim.tick(&mut nodes, &[], VIEWPORT);
		}
		assert_eq!((nodes[2].x, nodes[2].y), (100.0, 120.0));
		assert_eq!((nodes[2].vx, nodes[2].vy), (0.0, 0.0));
	}

	#[test]
	fn linked_pair_settles_near_rest_length() {
		let mut sim = Simulation::new(LayoutConfig::default());
		let mut nodes = vec![Node::new(1, "a", ""), Node::new(2, "b", "")];
		let links = vec![Link::new(1, 2, "")];
		while sim.step(&mut nodes, &links, VIEWPORT) {}

		let distance = ((nodes[0].x - nodes[1].x).powi(2) + (nodes[0].y - nodes[1].y).powi(2)).sqrt();
		assert!(distance > 100.0 && distance < 260.0, "distance {distance}");
	}

	#[test]
	fn collision_separates_overlapping_nodes() {
		let mut sim = Simulation::new(LayoutConfig {
			charge_strength: 0.0,
			..LayoutConfig::default()
		});
		let mut nodes = vec![Node::new(1, "a", ""), Node::new(2, "b", "")];
		(nodes[0].x, nodes[0].y) = (400.0, 300.0);
		(nodes[1].x, nodes[1].y) = (410.0, 300.0);
		while sim.step(&mut nodes, &[], VIEWPORT) {}
		assert!((nodes[1].x - nodes[0].x).abs() > 40.0);
	}

	#[test]
	fn dangling_links_are_ignored() {
		let mut sim = Simulation::new(LayoutConfig::default());
		let mut nodes = sample_snapshot().nodes;
		let links = vec![Link::new(1, 99, ""), Link::new(98, 2, "")];
		sim.tick(&mut nodes, &links, VIEWPORT);
		assert!(nodes.iter().all(|node| node.x.is_finite() && node.y.is_finite()));
	}

	#[test]
	fn centroid_tracks_viewport_center() {
		let mut sim = Simulation::new(LayoutConfig::default());
		let snapshot = sample_snapshot();
		let mut nodes = snapshot.nodes;
		while sim.step(&mut nodes, &snapshot.links, VIEWPORT) {}
		let cx = nodes.iter().map(|node| node.x).sum::<f64>() / nodes.len() as f64;
		let cy = nodes.iter().map(|node| node.y).sum::<f64>() / nodes.len() as f64;
		assert!((cx - 400.0).abs() < 20.0 && (cy - 300.0).abs() < 20.0);
	}
}
