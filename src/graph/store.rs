//! Canonical graph state and its mutation operations.
//!
//! The store holds two link collections: the canonical set, which is what gets
//! persisted and exported, and the displayed set, a filtered projection of it.
//! Every operation either completes or leaves the store untouched.

use std::collections::HashSet;

use log::debug;

use super::types::{Filter, Link, Node, NodeId, NodePatch, Snapshot};
use crate::error::{GraphError, Result};

/// Owner of the node list and both link sets.
#[derive(Clone, Debug, Default)]
pub struct GraphStore {
	nodes: Vec<Node>,
	all_links: Vec<Link>,
	displayed_links: Vec<Link>,
	filter: Filter,
}

impl GraphStore {
	/// Creates a store holding `snapshot`, unfiltered.
	pub fn from_snapshot(snapshot: Snapshot) -> Self {
		let mut store = Self::default();
		store.import(snapshot);
		store
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	/// Node positions for the layout engine alongside the displayed links it
	/// simulates. Callers must not change ids.
	pub fn layout_mut(&mut self) -> (&mut [Node], &[Link]) {
		(&mut self.nodes, &self.displayed_links)
	}

	/// The canonical link set.
	pub fn all_links(&self) -> &[Link] {
		&self.all_links
	}

	/// The currently displayed (filtered) link set.
	pub fn displayed_links(&self) -> &[Link] {
		&self.displayed_links
	}

	pub fn active_filter(&self) -> &Filter {
		&self.filter
	}

	pub fn node(&self, id: NodeId) -> Option<&Node> {
		self.nodes.iter().find(|node| node.id == id)
	}

	pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
		self.nodes.iter_mut().find(|node| node.id == id)
	}

	/// First node carrying exactly `label`.
	pub fn node_by_label(&self, label: &str) -> Option<&Node> {
		self.nodes.iter().find(|node| node.label == label)
	}

	/// Distinct non-empty groups in node order.
	pub fn groups(&self) -> Vec<String> {
		let mut seen = HashSet::new();
		self.nodes
			.iter()
			.filter(|node| !node.group.is_empty() && seen.insert(node.group.as_str()))
			.map(|node| node.group.clone())
			.collect()
	}

	/// Ids directly connected to `id` through displayed links.
	pub fn neighbors(&self, id: NodeId) -> HashSet<NodeId> {
		let mut connected = HashSet::new();
		for link in &self.displayed_links {
			if link.source == id {
				connected.insert(link.target);
			}
			if link.target == id {
				connected.insert(link.source);
			}
		}
		connected
	}

	/// One past the largest id in use. Fails once ids are exhausted rather
	/// than wrapping onto an existing node.
	fn next_id(&self) -> Result<NodeId> {
		match self.nodes.iter().map(|node| node.id).max() {
			None => Ok(1),
			Some(max) => max
				.checked_add(1)
				.ok_or_else(|| GraphError::validation("No node ids left")),
		}
	}

	/// Adds a node with a fresh id.
	pub fn add_node(&mut self, label: &str, group: &str) -> Result<&Node> {
		let label = label.trim();
		if label.is_empty() {
			return Err(GraphError::validation("Provide a node label"));
		}

		let node = Node::new(self.next_id()?, label, group.trim());
		debug!("store: add node {} ({:?})", node.id, node.label);
		self.nodes.push(node);
		Ok(&self.nodes[self.nodes.len() - 1])
	}

	/// Adds a link between the first nodes labeled `source_label` and
	/// `target_label`, then shows every canonical link.
	pub fn add_link(
		&mut self,
		source_label: &str,
		target_label: &str,
		relationship: &str,
	) -> Result<&Link> {
		let (source_label, target_label) = (source_label.trim(), target_label.trim());
		if source_label.is_empty() || target_label.is_empty() {
			return Err(GraphError::validation("Source and target labels required"));
		}

		let (Some(source), Some(target)) = (
			self.node_by_label(source_label),
			self.node_by_label(target_label),
		) else {
			return Err(GraphError::not_found("Source or target node not found"));
		};

		let link = Link::new(source.id, target.id, relationship.trim());
		debug!("store: add link {} -> {}", link.source, link.target);
		self.all_links.push(link);
		self.apply_filter(Filter::All);
		Ok(&self.all_links[self.all_links.len() - 1])
	}

	/// Shallow-merges `patch` into node `id`. Returns false when no such node
	/// exists.
	pub fn update_node(&mut self, id: NodeId, patch: NodePatch) -> bool {
		let Some(node) = self.node_mut(id) else {
			debug!("store: update of unknown node {id} ignored");
			return false;
		};
		patch.apply_to(node);
		true
	}

	/// Removes node `id` and every link touching it.
	pub fn remove_node(&mut self, id: NodeId) -> bool {
		let before = self.nodes.len();
		self.nodes.retain(|node| node.id != id);
		if self.nodes.len() == before {
			return false;
		}

		self.all_links.retain(|link| !link.touches(id));
		self.displayed_links.retain(|link| !link.touches(id));
		debug!("store: removed node {id}");
		true
	}

	/// Removes every link from `source` to `target` from both link sets.
	pub fn remove_link(&mut self, source: NodeId, target: NodeId) -> bool {
		let matches = |link: &Link| link.source == source && link.target == target;
		let before = self.all_links.len();
		self.all_links.retain(|link| !matches(link));
		self.displayed_links.retain(|link| !matches(link));
		before != self.all_links.len()
	}

	/// Clears nodes and both link sets.
	pub fn remove_all(&mut self) {
		*self = Self::default();
		debug!("store: cleared");
	}

	/// Recomputes the displayed link set. The canonical set is never touched.
	pub fn apply_filter(&mut self, filter: Filter) {
		self.displayed_links = match &filter {
			Filter::All => self.all_links.clone(),
			Filter::Group(group) => self
				.all_links
				.iter()
				.filter(|link| {
					let in_group = |id| self.node(id).is_some_and(|node| &node.group == group);
					in_group(link.source) || in_group(link.target)
				})
				.cloned()
				.collect(),
		};
		self.filter = filter;
	}

	/// Replaces the whole graph with `snapshot`.
	pub fn import(&mut self, snapshot: Snapshot) {
		debug!(
			"store: import {} nodes, {} links",
			snapshot.nodes.len(),
			snapshot.links.len()
		);
		self.nodes = snapshot.nodes;
		self.displayed_links = snapshot.links.clone();
		self.all_links = snapshot.links;
		self.filter = Filter::All;
	}

	/// Canonical nodes and links, ignoring the active filter.
	pub fn export_snapshot(&self) -> Snapshot {
		Snapshot {
			nodes: self.nodes.clone(),
			links: self.all_links.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::io::sample_snapshot;

	fn sample() -> GraphStore {
		GraphStore::from_snapshot(sample_snapshot())
	}

	#[test]
	fn add_node_assigns_next_id() {
		let mut store = sample();
		let id = store.add_node("  Germany ", "NATO").unwrap().id;
		assert_eq!(id, 6);
		assert_eq!(store.nodes().len(), 6);
		assert_eq!(store.node(6).unwrap().label, "Germany");
		assert!(store.node(6).unwrap().fields.is_empty());
	}

	#[test]
	fn add_node_on_empty_store_starts_at_one() {
		let mut store = GraphStore::default();
		assert_eq!(store.add_node("Solo", "").unwrap().id, 1);
	}

	#[test]
	fn add_node_ids_follow_max_not_count() {
		let mut store = sample();
		store.remove_node(2);
		assert_eq!(store.add_node("Spain", "NATO").unwrap().id, 6);
	}

	#[test]
	fn add_node_refuses_to_wrap_ids() {
		let mut store = GraphStore::from_snapshot(Snapshot {
			nodes: vec![Node::new(NodeId::MAX, "A", "NATO")],
			links: vec![],
		});
		let err = store.add_node("B", "NATO").unwrap_err();
		assert!(matches!(err, GraphError::Validation(_)));
		assert_eq!(store.nodes().len(), 1);
	}

	#[test]
	fn blank_label_is_rejected_without_mutation() {
		let mut store = sample();
		let err = store.add_node("   ", "NATO").unwrap_err();
		assert!(matches!(err, GraphError::Validation(_)));
		assert_eq!(store.nodes().len(), 5);
	}

	#[test]
	fn add_link_resolves_labels_and_unfilters() {
		let mut store = sample();
		store.add_node("Germany", "NATO").unwrap();
		store.apply_filter(Filter::Group("CSTO".into()));

		let link = store.add_link("Germany", "France", "Alliance").unwrap().clone();
		assert_eq!((link.source, link.target), (6, 3));
		assert_eq!(store.all_links().len(), 5);
		assert_eq!(store.displayed_links(), store.all_links());
		assert_eq!(store.active_filter(), &Filter::All);
	}

	#[test]
	fn add_link_errors() {
		let mut store = sample();
		assert!(matches!(
			store.add_link("", "France", "x"),
			Err(GraphError::Validation(_))
		));
		assert!(matches!(
			store.add_link("Atlantis", "France", "x"),
			Err(GraphError::NotFound(_))
		));
		assert_eq!(store.all_links().len(), 4);
	}

	#[test]
	fn duplicate_labels_bind_first_match() {
		let mut store = sample();
		store.add_node("USA", "Other").unwrap();
		let link = store.add_link("USA", "UK", "").unwrap();
		assert_eq!(link.source, 1);
	}

	#[test]
	fn group_filter_keeps_links_touching_group() {
		let mut store = sample();
		store.apply_filter(Filter::Group("CSTO".into()));
		assert_eq!(store.displayed_links(), &[Link::new(4, 5, "Mutual defence")]);
		assert_eq!(store.all_links().len(), 4);

		let once = store.displayed_links().to_vec();
		store.apply_filter(Filter::Group("CSTO".into()));
		assert_eq!(store.displayed_links(), once.as_slice());

		store.apply_filter(Filter::All);
		assert_eq!(store.displayed_links(), store.all_links());
	}

	#[test]
	fn filter_skips_dangling_endpoints() {
		let mut store = GraphStore::from_snapshot(Snapshot {
			nodes: vec![Node::new(1, "A", "NATO")],
			links: vec![Link::new(1, 99, ""), Link::new(98, 99, "")],
		});
		store.apply_filter(Filter::Group("NATO".into()));
		assert_eq!(store.displayed_links(), &[Link::new(1, 99, "")]);
	}

	#[test]
	fn update_node_merges_and_ignores_unknown_ids() {
		let mut store = sample();
		let patch = NodePatch {
			label: Some("United States".into()),
			..Default::default()
		};
		assert!(store.update_node(1, patch));
		let node = store.node(1).unwrap();
		assert_eq!(node.label, "United States");
		assert_eq!(node.group, "NATO");
		assert_eq!(node.fields["GDP"], "$21T");

		assert!(!store.update_node(42, NodePatch::default()));
	}

	#[test]
	fn remove_node_drops_incident_links() {
		let mut store = sample();
		assert!(store.remove_node(1));
		assert_eq!(store.nodes().len(), 4);
		assert!(store.all_links().iter().all(|link| !link.touches(1)));
		assert!(store.displayed_links().iter().all(|link| !link.touches(1)));
		assert!(!store.remove_node(1));
	}

	#[test]
	fn remove_link_by_endpoints() {
		let mut store = sample();
		assert!(store.remove_link(4, 5));
		assert_eq!(store.all_links().len(), 3);
		assert!(!store.remove_link(4, 5));
	}

	#[test]
	fn remove_all_leaves_nothing() {
		let mut store = sample();
		store.apply_filter(Filter::Group("NATO".into()));
		store.remove_all();
		assert!(store.nodes().is_empty());
		assert!(store.all_links().is_empty());
		assert!(store.displayed_links().is_empty());
		assert_eq!(store.active_filter(), &Filter::All);
	}

	#[test]
	fn export_ignores_filter() {
		let mut store = sample();
		store.apply_filter(Filter::Group("CSTO".into()));
		let snapshot = store.export_snapshot();
		assert_eq!(snapshot.nodes.len(), 5);
		assert_eq!(snapshot.links.len(), 4);
	}

	#[test]
	fn neighbors_follow_displayed_links() {
		let mut store = sample();
		assert_eq!(store.neighbors(1), HashSet::from([2, 3]));
		store.apply_filter(Filter::Group("CSTO".into()));
		assert!(store.neighbors(1).is_empty());
	}

	#[test]
	fn groups_in_first_seen_order() {
		assert_eq!(sample().groups(), vec!["NATO".to_string(), "CSTO".to_string()]);
	}
}
