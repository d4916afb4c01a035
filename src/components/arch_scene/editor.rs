//! The operation surface the UI drives: one owner for registry, graph, scene, camera,
//! pointer state machine and flow simulator.

use glam::Vec3;
use log::{debug, info, warn};

use super::camera::{OrbitCamera, Viewport};
use super::config::SceneConfig;
use super::document;
use super::error::{ConnectionRejected, Result};
use super::flow::FlowSimulator;
use super::geometry::Plane;
use super::graph::{GraphModel, NewNode, Node, NodePatch};
use super::interaction::{InteractionController, InteractionEvent, InteractionMode, PointerButton};
use super::registry::TypeRegistry;
use super::scene::Scene;
use super::types::{Color, NodeId};

/// One frame of the render loop: advance physical state, then reconcile visuals.
/// Drawing happens afterward, outside the engine.
pub trait FrameTask {
	fn advance(&mut self, dt: f64);
	fn reconcile(&mut self);

	fn tick(&mut self, dt: f64) {
		self.advance(dt);
		self.reconcile();
	}
}

pub struct SceneEditor {
	config: SceneConfig,
	registry: TypeRegistry,
	graph: GraphModel,
	scene: Scene,
	camera: OrbitCamera,
	interaction: InteractionController,
	flow: FlowSimulator,
	viewport: Viewport,
	time: f64,
	running: bool,
}

impl SceneEditor {
	pub fn new(config: SceneConfig) -> Self {
		let flow = FlowSimulator::new(&config);
		Self::with_flow(config, flow)
	}

	/// Builds an editor whose flow simulator uses a fixed seed.
	pub fn with_seed(config: SceneConfig, seed: u64) -> Self {
		let flow = FlowSimulator::with_seed(&config, seed);
		Self::with_flow(config, flow)
	}

	fn with_flow(config: SceneConfig, flow: FlowSimulator) -> Self {
		Self {
			registry: TypeRegistry::new(),
			graph: GraphModel::new(),
			scene: Scene::new(&config),
			camera: OrbitCamera::new(&config),
			interaction: InteractionController::new(),
			flow,
			viewport: Viewport::default(),
			time: 0.0,
			running: false,
			config,
		}
	}

	/// Attaches to a mount target of the given size and starts the frame loop.
	pub fn initialize(&mut self, viewport: Viewport) {
		self.viewport = viewport;
		self.running = true;
		self.reconcile();
		info!(
			"Scene editor initialized at {}x{}",
			viewport.width, viewport.height
		);
	}

	/// Stops the frame loop and releases every visual.
	pub fn dispose(&mut self) {
		if !self.running {
			return;
		}
		self.flow.stop(&mut self.camera);
		self.interaction.cancel();
		self.scene.clear();
		self.running = false;
		info!("Scene editor disposed");
	}

	pub fn is_running(&self) -> bool {
		self.running
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		if width > 0.0 && height > 0.0 {
			self.viewport = Viewport { width, height };
		}
	}

	pub fn config(&self) -> &SceneConfig {
		&self.config
	}

	pub fn viewport(&self) -> &Viewport {
		&self.viewport
	}

	pub fn registry(&self) -> &TypeRegistry {
		&self.registry
	}

	/// Registry edits apply at the next lookup; existing edges are never re-validated.
	pub fn registry_mut(&mut self) -> &mut TypeRegistry {
		&mut self.registry
	}

	pub fn graph(&self) -> &GraphModel {
		&self.graph
	}

	pub fn scene(&self) -> &Scene {
		&self.scene
	}

	pub fn camera(&self) -> &OrbitCamera {
		&self.camera
	}

	pub fn flow(&self) -> &FlowSimulator {
		&self.flow
	}

	pub fn time(&self) -> f64 {
		self.time
	}

	pub fn revision(&self) -> u64 {
		self.graph.revision()
	}

	pub fn mode(&self) -> InteractionMode {
		self.interaction.mode()
	}

	pub fn set_mode(&mut self, mode: InteractionMode) {
		self.interaction.set_mode(mode);
		self.update_controls();
	}

	pub fn is_dragging(&self) -> bool {
		self.interaction.is_dragging()
	}

	fn update_controls(&mut self) {
		self.camera.controls_enabled =
			self.interaction.mode() == InteractionMode::Camera && !self.flow.is_active();
	}

	pub fn nodes(&self) -> impl Iterator<Item = &Node> {
		self.graph.nodes()
	}

	pub fn selected_node(&self) -> Option<&Node> {
		self.interaction
			.selected()
			.and_then(|id| self.graph.node(id))
	}

	pub fn add_node(&mut self, new: NewNode) -> NodeId {
		let id = self.graph.add_node(&self.registry, new);
		self.reconcile();
		id
	}

	pub fn update_node(&mut self, id: &str, patch: NodePatch) -> bool {
		let updated = self.graph.update_node(id, patch);
		if updated {
			self.reconcile();
		}
		updated
	}

	pub fn delete_node(&mut self, id: &str) -> bool {
		let deleted = self.graph.delete_node(id);
		if deleted {
			self.interaction.forget(id);
			self.reconcile();
		}
		deleted
	}

	pub fn connect(&mut self, from: &str, to: &str) -> std::result::Result<(), ConnectionRejected> {
		let result = self.graph.connect(&self.registry, from, to);
		match &result {
			Ok(()) => self.reconcile(),
			Err(reason) => debug!("Connect {from:?} -> {to:?} rejected: {reason}"),
		}
		result
	}

	pub fn disconnect(&mut self, from: &str, to: &str) -> bool {
		let removed = self.graph.disconnect(from, to);
		if removed {
			self.reconcile();
		}
		removed
	}

	pub fn select_node(&mut self, id: &str) -> bool {
		if !self.graph.contains(id) {
			return false;
		}
		self.interaction.select(id.into());
		true
	}

	pub fn deselect(&mut self) {
		self.interaction.deselect();
	}

	pub fn clear_graph(&mut self) {
		self.graph.clear();
		self.interaction.cancel();
		self.interaction.deselect();
		self.reconcile();
	}

	pub fn export_json(&self) -> Result<String> {
		document::export_json(&self.graph)
	}

	/// Replaces the diagram. On failure the diagram is left empty.
	pub fn import_json(&mut self, json: &str) -> Result<usize> {
		self.interaction.cancel();
		self.interaction.deselect();
		let result = document::import_json(&mut self.graph, &self.registry, json);
		if let Err(err) = &result {
			warn!("Import failed: {err}");
		}
		self.reconcile();
		result
	}

	pub fn toggle_simulation(&mut self, active: bool) {
		if active {
			self.interaction.cancel();
			self.flow.start(&mut self.camera);
		} else {
			self.flow.stop(&mut self.camera);
		}
		self.update_controls();
	}

	pub fn set_pulses_paused(&mut self, paused: bool) {
		self.flow.set_paused(paused);
	}

	pub fn reset_camera(&mut self) {
		if !self.flow.is_active() {
			self.camera.reset();
		}
	}

	pub fn take_events(&mut self) -> Vec<InteractionEvent> {
		self.interaction.take_events()
	}

	/// The node under a canvas pixel.
	pub fn node_at(&self, sx: f64, sy: f64) -> Option<NodeId> {
		self.scene
			.pick(&self.camera.ray_through(sx, sy, &self.viewport))
	}

	/// Where a canvas pixel lands on the ground plane, for placing new nodes.
	///
	/// Looking parallel to the ground falls back to the point level with the camera target.
	pub fn world_at(&self, sx: f64, sy: f64) -> Vec3 {
		let ray = self.camera.ray_through(sx, sy, &self.viewport);
		ray.intersect_plane(&Plane::horizontal(0.0))
			.unwrap_or_else(|| ray.at(self.camera.distance()))
	}

	pub fn pointer_down(&mut self, button: PointerButton, sx: f64, sy: f64) {
		let ray = self.camera.ray_through(sx, sy, &self.viewport);
		self.interaction
			.pointer_down(button, sx, sy, &ray, &self.scene, &self.camera);
	}

	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		let ray = self.camera.ray_through(sx, sy, &self.viewport);
		self.interaction
			.pointer_move(sx, sy, &ray, &mut self.scene, &mut self.camera);
	}

	pub fn pointer_up(&mut self) {
		if let Some((id, position)) = self.interaction.pointer_up() {
			self.commit_move(&id, position);
		}
	}

	pub fn pointer_leave(&mut self) {
		if let Some((id, position)) = self.interaction.pointer_leave(&mut self.scene) {
			self.commit_move(&id, position);
		}
	}

	fn commit_move(&mut self, id: &str, position: Vec3) {
		self.update_node(
			id,
			NodePatch {
				position: Some(position),
				..Default::default()
			},
		);
	}

	pub fn double_click(&mut self, sx: f64, sy: f64) {
		let ray = self.camera.ray_through(sx, sy, &self.viewport);
		self.interaction.double_click(&ray, &self.scene);
	}

	pub fn wheel(&mut self, delta_y: f64) {
		self.camera.zoom(delta_y);
	}

	/// Replaces the diagram with the reference gateway architecture.
	pub fn load_default_graph(&mut self) {
		self.clear_graph();
		for (id, slug, label, description, pos, color) in DEFAULT_NODES {
			let new = NewNode::new(*slug, Vec3::from_array(*pos))
				.id(*id)
				.label(*label)
				.description(*description)
				.color(Color::from_hex(*color));
			self.graph.add_node(&self.registry, new);
		}
		for i in 0..CLIENT_COUNT {
			let angle = i as f32 / CLIENT_COUNT as f32 * std::f32::consts::TAU;
			let new = NewNode::new("client", Vec3::new(-50.0, angle.cos() * 8.0, angle.sin() * 8.0))
				.id(format!("client_{i}"))
				.label(if i == 2 { "Clients" } else { "" })
				.description("External applications consuming the API.");
			self.graph.add_node(&self.registry, new);
		}

		let client_edges =
			(0..CLIENT_COUNT).map(|i| (format!("client_{i}"), "proxy".to_string()));
		let edges = DEFAULT_EDGES
			.iter()
			.map(|(from, to)| (from.to_string(), to.to_string()))
			.chain(client_edges);
		for (from, to) in edges {
			if let Err(reason) = self.graph.connect(&self.registry, &from, &to) {
				warn!("Default diagram edge {from:?} -> {to:?} rejected: {reason}");
			}
		}
		info!(
			"Loaded default diagram: {} nodes, {} connections",
			self.graph.len(),
			self.graph.connection_count()
		);
		self.reconcile();
	}
}

impl FrameTask for SceneEditor {
	fn advance(&mut self, dt: f64) {
		if !self.running {
			return;
		}
		self.time += dt;
		self.flow.step(&self.graph, &self.scene, &mut self.camera);
	}

	fn reconcile(&mut self) {
		self.scene.sync(&self.graph, &self.registry);
		let pins = self.interaction.pinned();
		self.scene.animate(self.time, &pins);
	}
}

const CLIENT_COUNT: usize = 5;

type DefaultNode = (&'static str, &'static str, &'static str, &'static str, [f32; 3], u32);

const DEFAULT_NODES: &[DefaultNode] = &[
	(
		"proxy",
		"proxy",
		"Gateway Proxies",
		"Decouples the API Gateway from external traffic and handles load balancing.",
		[-25.0, 0.0, 0.0],
		0x10b981,
	),
	(
		"gateway",
		"gateway",
		"API Gateway",
		"Single entry point. Routes requests to the Service Broker.",
		[0.0, 0.0, 0.0],
		0xd946ef,
	),
	(
		"registry",
		"database",
		"Service Registry",
		"Database of available service instances and their locations.",
		[0.0, 12.0, -5.0],
		0xeab308,
	),
	(
		"limiter",
		"internal",
		"Rate Limiter",
		"Controls the rate of traffic sent or received by the network.",
		[0.0, -12.0, -5.0],
		0xf43f5e,
	),
	(
		"broker",
		"broker",
		"Service Broker",
		"Central message bus. Manages service discovery, routing, and decoupling.",
		[25.0, 0.0, 0.0],
		0xf97316,
	),
	(
		"transformer",
		"transformer",
		"REST Transformer",
		"Adapts and transforms messages between different formats.",
		[45.0, 12.0, 0.0],
		0x3b82f6,
	),
	(
		"brokerService1",
		"internal",
		"Auth Service",
		"Broker-reliant service for authentication.",
		[45.0, -10.0, 0.0],
		0x14b8a6,
	),
	(
		"brokerService2",
		"internal",
		"Audit Log",
		"Broker-reliant service for logging events.",
		[55.0, -15.0, 5.0],
		0x14b8a6,
	),
	(
		"brokerService3",
		"internal",
		"Notification Svc",
		"Broker-reliant service for dispatching alerts.",
		[40.0, -18.0, -5.0],
		0x14b8a6,
	),
	(
		"serviceA",
		"external",
		"REST Service A",
		"Core business logic microservice.",
		[65.0, 15.0, 5.0],
		0x8b5cf6,
	),
	(
		"serviceB",
		"external",
		"REST Service B",
		"Data processing microservice.",
		[65.0, 8.0, 5.0],
		0x8b5cf6,
	),
];

const DEFAULT_EDGES: &[(&str, &str)] = &[
	("gateway", "registry"),
	("gateway", "limiter"),
	("proxy", "gateway"),
	("gateway", "broker"),
	("broker", "transformer"),
	("broker", "brokerService1"),
	("broker", "brokerService2"),
	("broker", "brokerService3"),
	("transformer", "serviceA"),
	("transformer", "serviceB"),
];

#[cfg(test)]
mod tests {
	use super::*;

	fn editor() -> SceneEditor {
		let mut editor = SceneEditor::with_seed(SceneConfig::default(), 42);
		editor.initialize(Viewport::default());
		editor
	}

	#[test]
	fn test_default_graph_is_fully_connected() {
		let mut ed = editor();
		ed.load_default_graph();
		assert_eq!(ed.graph().len(), DEFAULT_NODES.len() + CLIENT_COUNT);
		assert_eq!(ed.graph().connection_count(), DEFAULT_EDGES.len() + CLIENT_COUNT);
		assert_eq!(ed.scene().node_count(), ed.graph().len());
		assert_eq!(ed.scene().edge_count(), ed.graph().connection_count());
	}

	#[test]
	fn test_delete_clears_selection() {
		let mut ed = editor();
		let id = ed.add_node(NewNode::new("client", Vec3::ZERO));
		assert!(ed.select_node(&id));
		assert!(ed.delete_node(&id));
		assert!(ed.selected_node().is_none());
		assert!(!ed.select_node(&id));
	}

	#[test]
	fn test_controls_follow_mode_and_simulation() {
		let mut ed = editor();
		assert!(ed.camera().controls_enabled);
		ed.set_mode(InteractionMode::Edit);
		assert!(!ed.camera().controls_enabled);
		ed.set_mode(InteractionMode::Camera);
		ed.toggle_simulation(true);
		assert!(!ed.camera().controls_enabled);
		ed.toggle_simulation(false);
		assert!(ed.camera().controls_enabled);
	}

	#[test]
	fn test_drag_through_facade_commits_position() {
		let mut ed = editor();
		ed.set_mode(InteractionMode::Edit);
		let id = ed.add_node(NewNode::new("gateway", Vec3::ZERO));
		let rev = ed.revision();

		ed.pointer_down(PointerButton::Primary, 400.0, 300.0);
		ed.pointer_move(480.0, 300.0);
		ed.tick(0.016);
		// Mid-drag the model still holds the old position.
		assert_eq!(ed.graph().node(&id).unwrap().position, Vec3::ZERO);
		assert_eq!(ed.revision(), rev);
		assert!(ed.scene().position_of(&id).unwrap().x > 1.0);

		ed.pointer_up();
		let committed = ed.graph().node(&id).unwrap().position;
		assert!(committed.x > 1.0);
		assert_eq!(ed.revision(), rev + 1);
	}

	#[test]
	fn test_click_without_motion_keeps_model_position() {
		let mut ed = editor();
		let id = ed.add_node(NewNode::new("gateway", Vec3::ZERO));
		for _ in 0..40 {
			ed.tick(0.016);
		}
		assert!(ed.scene().position_of(&id).unwrap().y.abs() > 1e-3);
		ed.set_mode(InteractionMode::Edit);
		let rev = ed.revision();

		ed.pointer_down(PointerButton::Primary, 400.0, 300.0);
		assert!(ed.is_dragging());
		ed.pointer_up();
		assert_eq!(ed.graph().node(&id).unwrap().position, Vec3::ZERO);
		assert_eq!(ed.revision(), rev);
	}

	#[test]
	fn test_starting_simulation_drops_drag_uncommitted() {
		let mut ed = editor();
		ed.set_mode(InteractionMode::Edit);
		let id = ed.add_node(NewNode::new("gateway", Vec3::ZERO));
		let rev = ed.revision();

		ed.pointer_down(PointerButton::Primary, 400.0, 300.0);
		ed.pointer_move(480.0, 300.0);
		assert!(ed.is_dragging());
		ed.toggle_simulation(true);
		assert!(!ed.is_dragging());

		ed.pointer_up();
		assert_eq!(ed.graph().node(&id).unwrap().position, Vec3::ZERO);
		assert_eq!(ed.revision(), rev);
	}

	#[test]
	fn test_empty_patch_keeps_revision() {
		let mut ed = editor();
		let id = ed.add_node(NewNode::new("gateway", Vec3::ZERO));
		let rev = ed.revision();
		assert!(!ed.update_node(&id, NodePatch::default()));
		let label = ed.graph().node(&id).unwrap().label.clone();
		assert!(!ed.update_node(
			&id,
			NodePatch {
				label: Some(label),
				..Default::default()
			}
		));
		assert_eq!(ed.revision(), rev);
	}

	#[test]
	fn test_world_at_hits_ground() {
		let ed = editor();
		let p = ed.world_at(400.0, 300.0);
		assert!(p.length() < 1e-2);
		assert!(ed.node_at(400.0, 300.0).is_none());
	}

	#[test]
	fn test_dispose_stops_loop_and_releases() {
		let mut ed = editor();
		ed.load_default_graph();
		ed.toggle_simulation(true);
		ed.dispose();
		assert!(!ed.is_running());
		assert!(!ed.flow().is_active());
		assert_eq!(ed.scene().node_count(), 0);
		let t = ed.time();
		ed.advance(1.0);
		assert_eq!(ed.time(), t);
	}
}
