//! The node/connection model: the single source of truth for topology and attributes.

use glam::Vec3;
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use uuid::Uuid;

use super::error::ConnectionRejected;
use super::registry::TypeRegistry;
use super::types::{Color, NodeId};

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	pub id: NodeId,
	pub type_slug: String,
	pub label: String,
	pub description: String,
	pub position: Vec3,
	pub color: Color,
	/// Targets of this node's outbound connections, in the order they were made.
	pub outgoing: IndexSet<NodeId>,
}

/// Arguments for [`GraphModel::add_node`].
#[derive(Clone, Debug)]
pub struct NewNode {
	pub type_slug: String,
	pub position: Vec3,
	pub label: Option<String>,
	pub description: Option<String>,
	pub color: Option<Color>,
	pub id: Option<NodeId>,
}

impl NewNode {
	pub fn new(type_slug: impl Into<String>, position: Vec3) -> Self {
		Self {
			type_slug: type_slug.into(),
			position,
			label: None,
			description: None,
			color: None,
			id: None,
		}
	}

	pub fn label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	pub fn color(mut self, color: Color) -> Self {
		self.color = Some(color);
		self
	}

	pub fn id(mut self, id: impl Into<NodeId>) -> Self {
		self.id = Some(id.into());
		self
	}
}

/// Partial update for [`GraphModel::update_node`].
#[derive(Clone, Debug, Default)]
pub struct NodePatch {
	pub label: Option<String>,
	pub description: Option<String>,
	pub position: Option<Vec3>,
	pub color: Option<Color>,
}

#[derive(Clone, Debug, Default)]
pub struct GraphModel {
	nodes: IndexMap<NodeId, Node>,
	revision: u64,
}

impl GraphModel {
	pub fn new() -> Self {
		Self::default()
	}

	/// Bumped by every mutation that changes the graph.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	fn touch(&mut self) {
		self.revision = self.revision.wrapping_add(1);
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn contains(&self, id: &str) -> bool {
		self.nodes.contains_key(id)
	}

	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.get(id)
	}

	pub fn nodes(&self) -> impl Iterator<Item = &Node> {
		self.nodes.values()
	}

	/// Every `(from, to)` edge.
	pub fn connections(&self) -> impl Iterator<Item = (&str, &str)> {
		self.nodes
			.values()
			.flat_map(|n| n.outgoing.iter().map(move |to| (n.id.as_str(), to.as_str())))
	}

	pub fn connection_count(&self) -> usize {
		self.nodes.values().map(|n| n.outgoing.len()).sum()
	}

	pub fn is_connected(&self, from: &str, to: &str) -> bool {
		self.nodes
			.get(from)
			.is_some_and(|n| n.outgoing.contains(to))
	}

	/// Ids of nodes with an edge into `id`.
	pub fn inbound(&self, id: &str) -> Vec<NodeId> {
		self.nodes
			.values()
			.filter(|n| n.outgoing.contains(id))
			.map(|n| n.id.clone())
			.collect()
	}

	/// An edge is drawn in its source node's color.
	pub fn connection_color(&self, from: &str) -> Option<Color> {
		self.nodes.get(from).map(|n| n.color)
	}

	/// Creates a node and returns its id.
	///
	/// A caller-supplied id is kept so imported connections still line up; it is replaced
	/// only if another node already owns it.
	pub fn add_node(&mut self, registry: &TypeRegistry, new: NewNode) -> NodeId {
		let ty = registry.get(&new.type_slug);
		let id = match new.id {
			Some(id) if !self.nodes.contains_key(&id) => id,
			Some(id) => {
				let fresh = Uuid::new_v4().to_string();
				warn!("Node id {id:?} already in use, assigned {fresh:?}");
				fresh
			}
			None => Uuid::new_v4().to_string(),
		};
		let label = new.label.unwrap_or_else(|| {
			let same_type = self
				.nodes
				.values()
				.filter(|n| n.type_slug == new.type_slug)
				.count();
			format!("{} {}", ty.name_prefix, same_type + 1)
		});
		let node = Node {
			id: id.clone(),
			type_slug: new.type_slug,
			label,
			description: new.description.unwrap_or_else(|| ty.description.clone()),
			position: new.position,
			color: new.color.unwrap_or(ty.base_color),
			outgoing: IndexSet::new(),
		};
		debug!("Added node {:?} ({})", node.label, node.type_slug);
		self.nodes.insert(id.clone(), node);
		self.touch();
		id
	}

	/// Merges `patch` into the node. Returns `true` only if some field changed.
	pub fn update_node(&mut self, id: &str, patch: NodePatch) -> bool {
		let Some(node) = self.nodes.get_mut(id) else {
			return false;
		};
		let mut changed = false;
		if let Some(label) = patch.label.filter(|l| *l != node.label) {
			node.label = label;
			changed = true;
		}
		if let Some(description) = patch.description.filter(|d| *d != node.description) {
			node.description = description;
			changed = true;
		}
		if let Some(position) = patch.position.filter(|p| *p != node.position) {
			node.position = position;
			changed = true;
		}
		if let Some(color) = patch.color.filter(|c| *c != node.color) {
			node.color = color;
			changed = true;
		}
		if changed {
			self.touch();
		}
		changed
	}

	/// Removes a node together with every edge touching it, in either direction.
	pub fn delete_node(&mut self, id: &str) -> bool {
		if self.nodes.shift_remove(id).is_none() {
			return false;
		}
		for node in self.nodes.values_mut() {
			node.outgoing.shift_remove(id);
		}
		debug!("Deleted node {id:?}");
		self.touch();
		true
	}

	/// Adds the edge `from -> to` if both nodes exist and the source type allows it.
	///
	/// Legality is checked only now; later registry edits never sever existing edges.
	pub fn connect(
		&mut self,
		registry: &TypeRegistry,
		from: &str,
		to: &str,
	) -> Result<(), ConnectionRejected> {
		if from == to {
			return Err(ConnectionRejected::SelfConnection);
		}
		let to_type = self
			.nodes
			.get(to)
			.map(|n| n.type_slug.clone())
			.ok_or_else(|| ConnectionRejected::MissingNode(to.into()))?;
		let source = self
			.nodes
			.get_mut(from)
			.ok_or_else(|| ConnectionRejected::MissingNode(from.into()))?;
		if source.outgoing.contains(to) {
			return Err(ConnectionRejected::AlreadyConnected {
				from: from.into(),
				to: to.into(),
			});
		}
		if !registry.permits(&source.type_slug, &to_type) {
			return Err(ConnectionRejected::NotAllowed {
				from_type: registry.get(&source.type_slug).type_slug.clone(),
				to_type: registry.get(&to_type).type_slug.clone(),
			});
		}
		source.outgoing.insert(to.into());
		debug!("Connected {from:?} -> {to:?}");
		self.touch();
		Ok(())
	}

	pub fn disconnect(&mut self, from: &str, to: &str) -> bool {
		let removed = self
			.nodes
			.get_mut(from)
			.is_some_and(|n| n.outgoing.shift_remove(to));
		if removed {
			debug!("Disconnected {from:?} -> {to:?}");
			self.touch();
		}
		removed
	}

	pub fn clear(&mut self) {
		self.nodes.clear();
		self.touch();
	}
}
