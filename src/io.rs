//! Snapshot codecs: JSON import/export, CSV bootstrap files and the built-in
//! sample network.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{GraphError, Result};
use crate::graph::{Fields, Link, Node, NodeId, Snapshot, fields_from_values};

/// The network shown when no CSV data is available.
pub fn sample_snapshot() -> Snapshot {
	let country = |id, label: &str, group: &str, population: &str, gdp: &str, description: &str| {
		Node::new(id, label, group)
			.with_field("population", population)
			.with_field("GDP", gdp)
			.with_field("description", description)
	};

	Snapshot {
		nodes: vec![
			country(1, "USA", "NATO", "330M", "$21T", "North American country"),
			country(2, "UK", "NATO", "67M", "$3T", "European country"),
			country(3, "France", "NATO", "65M", "$2.8T", "European country"),
			country(4, "Russia", "CSTO", "146M", "$1.7T", "Eurasian country"),
			country(5, "Belarus", "CSTO", "9.4M", "$60B", "Eastern European country"),
		],
		links: vec![
			Link::new(1, 2, "Alliance"),
			Link::new(1, 3, "Alliance"),
			Link::new(4, 5, "Mutual defence"),
			Link::new(2, 3, "Intelligence sharing"),
		],
	}
}

/// Parses a `{ nodes, links }` document.
///
/// Malformed JSON and a document without both arrays are reported with
/// different messages; element shapes are otherwise lenient.
pub fn parse_snapshot(text: &str) -> Result<Snapshot> {
	let value: Value =
		serde_json::from_str(text).map_err(|_| GraphError::format("Invalid JSON"))?;

	let has_arrays = value.get("nodes").is_some_and(Value::is_array)
		&& value.get("links").is_some_and(Value::is_array);
	if !has_arrays {
		return Err(GraphError::format("Invalid file: expected {nodes,links}"));
	}

	serde_json::from_value(value)
		.map_err(|error| GraphError::format(format!("Invalid network data: {error}")))
}

/// Pretty-printed JSON for download or storage.
pub fn snapshot_to_json(snapshot: &Snapshot) -> Result<String> {
	serde_json::to_string_pretty(snapshot)
		.map_err(|error| GraphError::format(format!("Could not encode network: {error}")))
}

#[derive(Deserialize)]
struct NodeRecord {
	id: String,
	#[serde(default)]
	label: String,
	#[serde(default)]
	group: String,
	#[serde(default)]
	fields: String,
}

#[derive(Deserialize)]
struct EdgeRecord {
	from: String,
	to: String,
	#[serde(default)]
	relationship: String,
}

fn parse_id(raw: &str) -> Result<NodeId> {
	raw.trim()
		.parse()
		.map_err(|_| GraphError::format(format!("Invalid node id {raw:?}")))
}

fn csv_reader(text: &str) -> csv::Reader<&[u8]> {
	csv::ReaderBuilder::new()
		.trim(csv::Trim::Headers)
		.flexible(true)
		.from_reader(text.as_bytes())
}

/// Parses a `id,label,group,fields` CSV file; `fields` holds a JSON object.
pub fn parse_nodes_csv(text: &str) -> Result<Vec<Node>> {
	csv_reader(text)
		.deserialize::<NodeRecord>()
		.map(|record| {
			let record = record.map_err(|error| GraphError::format(error.to_string()))?;
			let fields = match record.fields.trim() {
				"" => Fields::new(),
				raw => serde_json::from_str::<BTreeMap<String, Value>>(raw)
					.map(fields_from_values)
					.map_err(|error| GraphError::format(format!("Invalid fields JSON: {error}")))?,
			};

			let mut node = Node::new(
				parse_id(&record.id)?,
				record.label.trim(),
				record.group.trim(),
			);
			node.fields = fields;
			Ok(node)
		})
		.collect()
}

/// Parses a `from,to,relationship` CSV file.
pub fn parse_links_csv(text: &str) -> Result<Vec<Link>> {
	csv_reader(text)
		.deserialize::<EdgeRecord>()
		.map(|record| {
			let record = record.map_err(|error| GraphError::format(error.to_string()))?;
			Ok(Link::new(
				parse_id(&record.from)?,
				parse_id(&record.to)?,
				record.relationship.trim(),
			))
		})
		.collect()
}

/// Builds the startup network from optional CSV files.
///
/// Both files must be present and parse; then each non-empty file replaces the
/// matching half of the sample. Anything else falls back to the sample.
pub fn bootstrap(nodes_csv: Option<&str>, edges_csv: Option<&str>) -> Snapshot {
	let mut snapshot = sample_snapshot();

	let (Some(nodes_csv), Some(edges_csv)) = (nodes_csv, edges_csv) else {
		warn!("CSV load failed or not present - using built-in sample data.");
		return snapshot;
	};

	match (parse_nodes_csv(nodes_csv), parse_links_csv(edges_csv)) {
		(Ok(nodes), Ok(links)) => {
			info!("loaded {} CSV nodes, {} CSV links", nodes.len(), links.len());
			if !nodes.is_empty() {
				snapshot.nodes = nodes;
			}
			if !links.is_empty() {
				snapshot.links = links;
			}
		}
		(Err(error), _) | (_, Err(error)) => {
			warn!("CSV parse failed ({error}) - using built-in sample data.");
		}
	}

	snapshot
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn json_round_trip_preserves_graph() {
		let original = sample_snapshot();
		let text = snapshot_to_json(&original).unwrap();
		let parsed = parse_snapshot(&text).unwrap();

		assert_eq!(parsed.links, original.links);
		for (a, b) in parsed.nodes.iter().zip(&original.nodes) {
			assert_eq!((a.id, &a.label, &a.group, &a.fields), (b.id, &b.label, &b.group, &b.fields));
		}
	}

	#[test]
	fn malformed_json_is_format_error() {
		assert_eq!(
			parse_snapshot("{nodes: ").unwrap_err(),
			GraphError::Format("Invalid JSON".into())
		);
	}

	#[test]
	fn missing_arrays_is_format_error() {
		let err = parse_snapshot(r#"{"nodes": []}"#).unwrap_err();
		assert_eq!(err, GraphError::Format("Invalid file: expected {nodes,links}".into()));
	}

	#[test]
	fn empty_document_is_valid() {
		let snapshot = parse_snapshot(r#"{"nodes": [], "links": []}"#).unwrap();
		assert!(snapshot.nodes.is_empty() && snapshot.links.is_empty());
	}

	#[test]
	fn nodes_csv_decodes_json_fields() {
		let csv = "id,label,group,fields\n\
			1, USA ,NATO,\"{\"\"population\"\":\"\"330M\"\",\"\"rank\"\":1}\"\n\
			2,UK,NATO,\n";
		let nodes = parse_nodes_csv(csv).unwrap();
		assert_eq!(nodes.len(), 2);
		assert_eq!(nodes[0].label, "USA");
		assert_eq!(nodes[0].fields["population"], "330M");
		assert_eq!(nodes[0].fields["rank"], "1");
		assert!(nodes[1].fields.is_empty());
	}

	#[test]
	fn links_csv_decodes_rows() {
		let links = parse_links_csv("from,to,relationship\n1,2, Alliance\n").unwrap();
		assert_eq!(links, vec![Link::new(1, 2, "Alliance")]);
	}

	#[test]
	fn bad_id_fails_csv() {
		assert!(parse_links_csv("from,to,relationship\nx,2,a\n").is_err());
	}

	#[test]
	fn bootstrap_falls_back_to_sample() {
		assert_eq!(bootstrap(None, None).nodes.len(), 5);
		assert_eq!(bootstrap(Some("id,label\nx,A\n"), Some("from,to\n")).nodes.len(), 5);
	}

	#[test]
	fn bootstrap_keeps_sample_links_for_header_only_edges() {
		let snapshot = bootstrap(Some("id,label,group,fields\n9,Japan,Other,\n"), Some("from,to,relationship\n"));
		assert_eq!(snapshot.nodes.len(), 1);
		assert_eq!(snapshot.links.len(), 4);
	}
}
