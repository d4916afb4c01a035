//! Renderable mirror of the graph.
//!
//! The scene owns one [`NodeVisual`] per node and one [`EdgeVisual`] per connection and is
//! reconciled against the model every frame. It never mutates the model.

use glam::Vec3;
use indexmap::IndexMap;
use log::debug;

use super::config::SceneConfig;
use super::geometry::Ray;
use super::graph::GraphModel;
use super::registry::{GeometryKind, HitVolume, TypeRegistry};
use super::types::{Color, NodeId};

#[derive(Clone, Debug)]
pub struct NodeVisual {
	pub node_id: NodeId,
	pub geometry: GeometryKind,
	pub color: Color,
	pub scale: f32,
	pub label: String,
	pub description: String,
	/// Position held by the model.
	pub base_position: Vec3,
	/// Position drawn this frame, including idle motion or a drag preview.
	pub position: Vec3,
	pub rotation_y: f32,
	/// Multiplier on `scale` for the hover pulse.
	pub pulse: f32,
	released: bool,
}

impl NodeVisual {
	fn release(&mut self) {
		self.released = true;
	}

	pub fn is_released(&self) -> bool {
		self.released
	}

	pub fn label_anchor(&self, offset: f32) -> Vec3 {
		self.position + Vec3::Y * (offset * self.scale.max(1.0))
	}

	/// Distance along `ray` to this primitive, if hit.
	pub fn hit(&self, ray: &Ray) -> Option<f32> {
		let scale = self.scale * self.pulse;
		match self.geometry.hit_volume() {
			HitVolume::Sphere(r) => ray.intersect_sphere(self.position, r * scale),
			HitVolume::Box(half) => ray.intersect_box(self.position, half * scale, self.rotation_y),
		}
	}
}

#[derive(Clone, Debug)]
pub struct EdgeVisual {
	pub from: NodeId,
	pub to: NodeId,
	pub color: Color,
	/// Arc samples from the source to the target, rebuilt every frame.
	pub points: Vec<Vec3>,
}

/// What one reconciliation pass changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
	pub created: usize,
	pub removed: usize,
	pub updated: usize,
}

impl SyncReport {
	pub fn is_empty(&self) -> bool {
		self.created == 0 && self.removed == 0 && self.updated == 0
	}
}

/// Node that must hold still this frame, optionally shown at a preview position.
#[derive(Clone, Copy, Debug)]
pub struct Pinned<'a> {
	pub node_id: &'a str,
	pub preview: Option<Vec3>,
}

#[derive(Debug)]
pub struct Scene {
	nodes: IndexMap<NodeId, NodeVisual>,
	edges: IndexMap<(NodeId, NodeId), EdgeVisual>,
	hovered: Option<NodeId>,
	bob_amplitude: f32,
	bob_frequency: f32,
	spin_speed: f32,
	hover_pulse: f32,
	arc_lift: f32,
	curve_segments: usize,
	released_total: usize,
}

impl Scene {
	pub fn new(config: &SceneConfig) -> Self {
		Self {
			nodes: IndexMap::new(),
			edges: IndexMap::new(),
			hovered: None,
			bob_amplitude: config.bob_amplitude,
			bob_frequency: config.bob_frequency,
			spin_speed: config.spin_speed,
			hover_pulse: config.hover_pulse,
			arc_lift: config.arc_lift,
			curve_segments: config.curve_segments.max(1),
			released_total: 0,
		}
	}

	pub fn node(&self, id: &str) -> Option<&NodeVisual> {
		self.nodes.get(id)
	}

	pub fn nodes(&self) -> impl Iterator<Item = &NodeVisual> {
		self.nodes.values()
	}

	pub fn edges(&self) -> impl Iterator<Item = &EdgeVisual> {
		self.edges.values()
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}

	/// Rendered position of a node this frame.
	pub fn position_of(&self, id: &str) -> Option<Vec3> {
		self.nodes.get(id).map(|v| v.position)
	}

	/// Visuals released over the scene's lifetime.
	pub fn released_total(&self) -> usize {
		self.released_total
	}

	pub fn hovered(&self) -> Option<&str> {
		self.hovered.as_deref()
	}

	pub fn set_hovered(&mut self, id: Option<NodeId>) {
		self.hovered = id;
	}

	/// Creates, restyles and destroys visuals until they mirror `graph`.
	pub fn sync(&mut self, graph: &GraphModel, registry: &TypeRegistry) -> SyncReport {
		let mut report = SyncReport::default();

		let stale: Vec<NodeId> = self
			.nodes
			.keys()
			.filter(|id| !graph.contains(id))
			.cloned()
			.collect();
		for id in stale {
			if let Some(mut visual) = self.nodes.shift_remove(&id) {
				visual.release();
				self.released_total += 1;
				report.removed += 1;
			}
		}

		for node in graph.nodes() {
			let ty = registry.get(&node.type_slug);
			match self.nodes.get_mut(&node.id) {
				Some(visual) => {
					let changed = visual.geometry != ty.geometry
						|| visual.color != node.color
						|| visual.scale != ty.scale
						|| visual.label != node.label
						|| visual.description != node.description
						|| visual.base_position != node.position;
					if changed {
						if visual.base_position != node.position {
							visual.position = node.position;
						}
						visual.geometry = ty.geometry;
						visual.color = node.color;
						visual.scale = ty.scale;
						visual.label.clone_from(&node.label);
						visual.description.clone_from(&node.description);
						visual.base_position = node.position;
						report.updated += 1;
					}
				}
				None => {
					self.nodes.insert(
						node.id.clone(),
						NodeVisual {
							node_id: node.id.clone(),
							geometry: ty.geometry,
							color: node.color,
							scale: ty.scale,
							label: node.label.clone(),
							description: node.description.clone(),
							base_position: node.position,
							position: node.position,
							rotation_y: 0.0,
							pulse: 1.0,
							released: false,
						},
					);
					report.created += 1;
				}
			}
		}

		let before = self.edges.len();
		self.edges
			.retain(|(from, to), _| graph.is_connected(from, to));
		report.removed += before - self.edges.len();
		for (from, to) in graph.connections() {
			let key = (from.to_owned(), to.to_owned());
			let color = graph.connection_color(from).unwrap_or(Color::WHITE);
			match self.edges.get_mut(&key) {
				Some(edge) => edge.color = color,
				None => {
					self.edges.insert(
						key,
						EdgeVisual {
							from: from.into(),
							to: to.into(),
							color,
							points: Vec::new(),
						},
					);
					report.created += 1;
				}
			}
		}

		if self.hovered.as_deref().is_some_and(|h| !self.nodes.contains_key(h)) {
			self.hovered = None;
		}
		if !report.is_empty() {
			debug!(
				"Scene sync: {} created, {} removed, {} updated",
				report.created, report.removed, report.updated
			);
		}
		report
	}

	/// Advances idle motion to `time` seconds and rebuilds every edge arc.
	pub fn animate(&mut self, time: f64, pinned: &[Pinned<'_>]) {
		for visual in self.nodes.values_mut() {
			match pinned.iter().find(|p| p.node_id == visual.node_id) {
				Some(pin) => {
					visual.position = pin.preview.unwrap_or(visual.position);
				}
				None => {
					// Phase follows x so neighbors do not bob in unison.
					let phase = time as f32 * self.bob_frequency + visual.base_position.x;
					visual.position = visual.base_position + Vec3::Y * (phase.sin() * self.bob_amplitude);
					visual.rotation_y = (visual.rotation_y + self.spin_speed) % std::f32::consts::TAU;
				}
			}
			visual.pulse = if self.hovered.as_deref() == Some(visual.node_id.as_str()) {
				1.0 + (time as f32 * 10.0).sin() * self.hover_pulse
			} else {
				visual.pulse + (1.0 - visual.pulse) * 0.1
			};
		}

		let segments = self.curve_segments;
		let lift = self.arc_lift;
		let nodes = &self.nodes;
		for edge in self.edges.values_mut() {
			let (Some(a), Some(b)) = (nodes.get(&edge.from), nodes.get(&edge.to)) else {
				edge.points.clear();
				continue;
			};
			arc_points(a.position, b.position, lift, segments, &mut edge.points);
		}
	}

	/// Nearest node primitive hit by `ray`.
	pub fn pick(&self, ray: &Ray) -> Option<NodeId> {
		self.nodes
			.values()
			.filter_map(|v| v.hit(ray).map(|t| (t, v)))
			.min_by(|a, b| a.0.total_cmp(&b.0))
			.map(|(_, v)| v.node_id.clone())
	}

	/// Releases every visual.
	pub fn clear(&mut self) {
		for visual in self.nodes.values_mut() {
			visual.release();
		}
		self.released_total += self.nodes.len();
		self.nodes.clear();
		self.edges.clear();
		self.hovered = None;
	}
}

/// Samples a quadratic arc from `start` to `end` whose midpoint is lifted by
/// `distance * lift`.
pub fn arc_points(start: Vec3, end: Vec3, lift: f32, segments: usize, out: &mut Vec<Vec3>) {
	out.clear();
	let mut mid = (start + end) * 0.5;
	mid.y += start.distance(end) * lift;
	// Control point chosen so the curve passes through `mid` at t = 0.5.
	let control = mid * 2.0 - (start + end) * 0.5;
	for i in 0..=segments {
		let t = i as f32 / segments as f32;
		let u = 1.0 - t;
		out.push(start * (u * u) + control * (2.0 * u * t) + end * (t * t));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::arch_scene::graph::{NewNode, NodePatch};

	fn setup() -> (TypeRegistry, GraphModel, Scene) {
		(
			TypeRegistry::new(),
			GraphModel::new(),
			Scene::new(&SceneConfig::default()),
		)
	}

	#[test]
	fn test_sync_creates_and_releases() {
		let (registry, mut graph, mut scene) = setup();
		let a = graph.add_node(&registry, NewNode::new("client", Vec3::ZERO));
		let b = graph.add_node(&registry, NewNode::new("proxy", Vec3::X * 10.0));
		graph.connect(&registry, &a, &b).unwrap();

		let report = scene.sync(&graph, &registry);
		assert_eq!(report.created, 3);
		assert_eq!(scene.node_count(), 2);
		assert_eq!(scene.edge_count(), 1);

		graph.delete_node(&b);
		let report = scene.sync(&graph, &registry);
		assert_eq!(report.removed, 2);
		assert_eq!(scene.edge_count(), 0);
		assert!(scene.edges().all(|e| e.from != b && e.to != b));
		assert_eq!(scene.released_total(), 1);
		assert!(scene.sync(&graph, &registry).is_empty());
	}

	#[test]
	fn test_sync_propagates_updates() {
		let (registry, mut graph, mut scene) = setup();
		let a = graph.add_node(&registry, NewNode::new("client", Vec3::ZERO));
		scene.sync(&graph, &registry);
		graph.update_node(
			&a,
			NodePatch {
				label: Some("Browser".into()),
				color: Some(Color::from_hex(0xff0000)),
				position: Some(Vec3::new(1.0, 2.0, 3.0)),
				..Default::default()
			},
		);
		let report = scene.sync(&graph, &registry);
		assert_eq!(report.updated, 1);
		let v = scene.node(&a).unwrap();
		assert_eq!(v.label, "Browser");
		assert_eq!(v.color, Color::from_hex(0xff0000));
		assert_eq!(v.position, Vec3::new(1.0, 2.0, 3.0));
	}

	#[test]
	fn test_pinned_node_holds_still() {
		let (registry, mut graph, mut scene) = setup();
		let a = graph.add_node(&registry, NewNode::new("client", Vec3::ZERO));
		let b = graph.add_node(&registry, NewNode::new("client", Vec3::X * 3.0));
		scene.sync(&graph, &registry);

		let pins = [Pinned {
			node_id: &a,
			preview: None,
		}];
		for frame in 1..20 {
			scene.animate(frame as f64 * 0.1, &pins);
		}
		let va = scene.node(&a).unwrap();
		assert_eq!(va.position, Vec3::ZERO);
		assert_eq!(va.rotation_y, 0.0);
		let vb = scene.node(&b).unwrap();
		assert_ne!(vb.position, Vec3::X * 3.0);
		assert!(vb.rotation_y > 0.0);
	}

	#[test]
	fn test_edges_track_current_positions() {
		let (registry, mut graph, mut scene) = setup();
		let a = graph.add_node(&registry, NewNode::new("client", Vec3::ZERO));
		let b = graph.add_node(&registry, NewNode::new("proxy", Vec3::X * 10.0));
		graph.connect(&registry, &a, &b).unwrap();
		scene.sync(&graph, &registry);

		let preview = Vec3::new(0.0, 5.0, 5.0);
		let pins = [Pinned {
			node_id: &b,
			preview: Some(preview),
		}];
		scene.animate(1.0, &pins);
		let edge = scene.edges().next().unwrap();
		assert_eq!(*edge.points.last().unwrap(), preview);
		assert_eq!(edge.points[0], scene.position_of(&a).unwrap());
		// The model is untouched by the preview.
		assert_eq!(graph.node(&b).unwrap().position, Vec3::X * 10.0);
	}

	#[test]
	fn test_pick_returns_nearest() {
		let (registry, mut graph, mut scene) = setup();
		let near = graph.add_node(&registry, NewNode::new("client", Vec3::new(0.0, 0.0, 5.0)));
		graph.add_node(&registry, NewNode::new("client", Vec3::ZERO));
		scene.sync(&graph, &registry);

		let ray = Ray::new(Vec3::new(0.0, 0.0, 50.0), Vec3::NEG_Z);
		assert_eq!(scene.pick(&ray), Some(near));
		let miss = Ray::new(Vec3::new(20.0, 0.0, 50.0), Vec3::NEG_Z);
		assert_eq!(scene.pick(&miss), None);
	}

	#[test]
	fn test_arc_passes_through_lifted_midpoint() {
		let mut points = Vec::new();
		arc_points(Vec3::ZERO, Vec3::X * 10.0, 0.1, 2, &mut points);
		assert_eq!(points.len(), 3);
		assert!((points[1] - Vec3::new(5.0, 1.0, 0.0)).length() < 1e-5);
	}
}
