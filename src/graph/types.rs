//! Graph data structures: nodes, links, snapshots and partial updates.
//!
//! Links always refer to nodes by id. The serialized form is lenient on the way
//! in (absent attributes default, endpoints may be `{ "id": .. }` objects) and
//! canonical on the way out.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Stable node identifier.
pub type NodeId = u32;

/// Interprets a numeric id. Only whole, non-negative numbers that fit a
/// [`NodeId`] name a node, so `3.0` is accepted and `3.5` is not.
pub fn node_id_from_f64(value: f64) -> Option<NodeId> {
	(value.is_finite() && value.fract() == 0.0 && (0.0..=NodeId::MAX as f64).contains(&value))
		.then_some(value as NodeId)
}

/// Free-form node attributes (population, GDP, notes, ...).
pub type Fields = BTreeMap<String, String>;

/// A labeled entity with a category group and free-form attributes.
///
/// `x`/`y` are owned by the layout engine; a node that has never been placed
/// carries NaN coordinates until the next simulation tick seeds it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
	/// Unique, immutable identifier.
	#[serde(deserialize_with = "node_id")]
	pub id: NodeId,
	/// Display label. Links are created by label.
	#[serde(default, deserialize_with = "nullable_string")]
	pub label: String,
	/// Category key used for coloring and filtering.
	#[serde(default, deserialize_with = "nullable_string")]
	pub group: String,
	#[serde(default, deserialize_with = "lenient_fields")]
	pub fields: Fields,
	#[serde(
		default = "unplaced",
		deserialize_with = "nullable_coordinate",
		skip_serializing_if = "is_unplaced"
	)]
	pub x: f64,
	#[serde(
		default = "unplaced",
		deserialize_with = "nullable_coordinate",
		skip_serializing_if = "is_unplaced"
	)]
	pub y: f64,
	#[serde(skip)]
	pub vx: f64,
	#[serde(skip)]
	pub vy: f64,
	/// Fixed position override, present while the node is dragged.
	#[serde(skip)]
	pub pin: Option<(f64, f64)>,
}

impl Node {
	/// Creates an unplaced node with empty fields.
	pub fn new(id: NodeId, label: impl Into<String>, group: impl Into<String>) -> Self {
		Self {
			id,
			label: label.into(),
			group: group.into(),
			fields: Fields::new(),
			x: unplaced(),
			y: unplaced(),
			vx: 0.0,
			vy: 0.0,
			pin: None,
		}
	}

	/// Builder helper for attaching a field.
	pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.fields.insert(key.into(), value.into());
		self
	}

	/// Whether the layout engine has assigned this node a position yet.
	pub fn is_placed(&self) -> bool {
		self.x.is_finite() && self.y.is_finite()
	}
}

/// A directed, labeled relationship between two nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
	#[serde(deserialize_with = "endpoint")]
	pub source: NodeId,
	#[serde(deserialize_with = "endpoint")]
	pub target: NodeId,
	#[serde(default, deserialize_with = "nullable_string")]
	pub relationship: String,
}

impl Link {
	/// Creates a link between two node ids.
	pub fn new(source: NodeId, target: NodeId, relationship: impl Into<String>) -> Self {
		Self {
			source,
			target,
			relationship: relationship.into(),
		}
	}

	/// Identity of this link in the rendered scene.
	pub fn key(&self) -> LinkKey {
		LinkKey {
			source: self.source,
			target: self.target,
		}
	}

	/// Whether `id` is one of the endpoints.
	pub fn touches(&self, id: NodeId) -> bool {
		self.source == id || self.target == id
	}
}

/// Scene identity of a link: its `(source, target)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey {
	pub source: NodeId,
	pub target: NodeId,
}

/// Complete graph payload used for persistence, import and export.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
	pub nodes: Vec<Node>,
	pub links: Vec<Link>,
}

/// Partial node update. Absent attributes are left untouched; a present
/// `fields` map replaces the node's fields as a whole.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NodePatch {
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub group: Option<String>,
	#[serde(default, deserialize_with = "lenient_optional_fields")]
	pub fields: Option<Fields>,
}

impl NodePatch {
	/// Shallow-merges the patch into `node`.
	pub fn apply_to(self, node: &mut Node) {
		if let Some(label) = self.label {
			node.label = label;
		}
		if let Some(group) = self.group {
			node.group = group;
		}
		if let Some(fields) = self.fields {
			node.fields = fields;
		}
	}
}

/// Link filter criterion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Filter {
	/// Show every canonical link.
	#[default]
	All,
	/// Show links with at least one endpoint in this group.
	Group(String),
}

impl Filter {
	/// Parses the filter-button vocabulary: `"all"` or a group name.
	pub fn parse(criterion: &str) -> Self {
		match criterion.trim() {
			"all" | "" => Filter::All,
			group => Filter::Group(group.to_string()),
		}
	}
}

fn unplaced() -> f64 {
	f64::NAN
}

fn is_unplaced(value: &f64) -> bool {
	!value.is_finite()
}

fn nullable_coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
	Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_else(unplaced))
}

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
	Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn node_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NodeId, D::Error> {
	let value = f64::deserialize(deserializer)?;
	node_id_from_f64(value).ok_or_else(|| D::Error::custom(format!("invalid node id {value}")))
}

fn endpoint<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NodeId, D::Error> {
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Endpoint {
		Id(f64),
		Node { id: f64 },
	}

	let (Endpoint::Id(value) | Endpoint::Node { id: value }) = Endpoint::deserialize(deserializer)?;
	node_id_from_f64(value).ok_or_else(|| D::Error::custom(format!("invalid node id {value}")))
}

fn scalar_to_string(value: Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s,
		other => other.to_string(),
	}
}

fn lenient_fields<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fields, D::Error> {
	Ok(lenient_optional_fields(deserializer)?.unwrap_or_default())
}

fn lenient_optional_fields<'de, D: Deserializer<'de>>(
	deserializer: D,
) -> Result<Option<Fields>, D::Error> {
	Ok(Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.map(fields_from_values))
}

/// Stringifies JSON scalar values; `null` becomes the empty string.
pub(crate) fn fields_from_values(map: BTreeMap<String, Value>) -> Fields {
	map.into_iter()
		.map(|(key, value)| (key, scalar_to_string(value)))
		.collect()
}
