//! JSON export/import of the diagram.
//!
//! The document is a flat array of node records. Connections live on their source node as
//! `connectedTo`, so every node must exist before any edge is replayed.

use glam::Vec3;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::error::{EditorError, Result};
use super::graph::{GraphModel, NewNode};
use super::registry::TypeRegistry;
use super::types::{Color, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
	pub x: f32,
	pub y: f32,
	pub z: f32,
}

impl From<Vec3> for PositionRecord {
	fn from(v: Vec3) -> Self {
		Self {
			x: v.x,
			y: v.y,
			z: v.z,
		}
	}
}

impl From<PositionRecord> for Vec3 {
	fn from(p: PositionRecord) -> Self {
		Vec3::new(p.x, p.y, p.z)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
	pub id: String,
	#[serde(rename = "type")]
	pub type_slug: String,
	pub label: String,
	#[serde(default)]
	pub description: String,
	pub position: PositionRecord,
	/// `#rrggbb`
	pub color: String,
	#[serde(default)]
	pub connected_to: Vec<String>,
}

/// Snapshot of the graph as node records, in node order.
pub fn to_records(graph: &GraphModel) -> Vec<NodeRecord> {
	graph
		.nodes()
		.map(|n| NodeRecord {
			id: n.id.clone(),
			type_slug: n.type_slug.clone(),
			label: n.label.clone(),
			description: n.description.clone(),
			position: n.position.into(),
			color: n.color.to_hex_string(),
			connected_to: n.outgoing.iter().cloned().collect(),
		})
		.collect()
}

pub fn export_json(graph: &GraphModel) -> Result<String> {
	Ok(serde_json::to_string_pretty(&to_records(graph))?)
}

/// Parses and validates a document without touching any graph.
pub fn parse_document(json: &str) -> Result<Vec<(NodeRecord, Color)>> {
	let records: Vec<NodeRecord> = serde_json::from_str(json)?;
	records
		.into_iter()
		.map(|record| match Color::parse(&record.color) {
			Some(color) => Ok((record, color)),
			None => Err(EditorError::InvalidColor {
				node_id: record.id.clone(),
				color: record.color.clone(),
			}),
		})
		.collect()
}

/// Replaces the graph's contents with the document.
///
/// The graph is cleared first. If the document is malformed the graph is left empty, not
/// restored. Edges that break the connection rules are dropped silently. Returns the number
/// of nodes created.
pub fn import_json(graph: &mut GraphModel, registry: &TypeRegistry, json: &str) -> Result<usize> {
	graph.clear();
	let records = parse_document(json)?;

	// A duplicate record id is reissued by the graph; its edges leave from the new id.
	let ids: Vec<NodeId> = records
		.iter()
		.map(|(record, color)| {
			let new = NewNode::new(record.type_slug.clone(), record.position.into())
				.label(record.label.clone())
				.description(record.description.clone())
				.color(*color)
				.id(record.id.clone());
			graph.add_node(registry, new)
		})
		.collect();

	let mut dropped = 0usize;
	for ((record, _), id) in records.iter().zip(&ids) {
		for target in &record.connected_to {
			if let Err(reason) = graph.connect(registry, id, target) {
				debug!("Import dropped {id:?} -> {target:?}: {reason}");
				dropped += 1;
			}
		}
	}
	info!(
		"Imported {} nodes, {} connections ({dropped} dropped)",
		graph.len(),
		graph.connection_count()
	);
	Ok(records.len())
}
