//! Pointer state machine: selection, camera gestures and drag-to-reposition.

use glam::Vec3;
use log::debug;

use super::camera::OrbitCamera;
use super::geometry::{Plane, Ray};
use super::scene::{Pinned, Scene};
use super::types::NodeId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InteractionMode {
	/// Orbit, pan and zoom; clicking only selects.
	#[default]
	Camera,
	/// Camera is locked; dragging a node moves it.
	Edit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
	Primary,
	Middle,
	Secondary,
}

impl PointerButton {
	/// Maps a DOM `MouseEvent.button` code.
	pub fn from_dom(button: i16) -> Self {
		match button {
			1 => PointerButton::Middle,
			2 => PointerButton::Secondary,
			_ => PointerButton::Primary,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct DragState {
	pub node_id: NodeId,
	/// Passes through the node, facing the camera.
	pub plane: Plane,
	/// Node position minus the grabbed point on `plane`.
	pub offset: Vec3,
	/// Preview position; committed to the model on release.
	pub current: Vec3,
	/// Set once the pointer has moved the preview. A press and release in place commits nothing.
	pub moved: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Gesture {
	Orbit { x: f64, y: f64 },
	Pan { x: f64, y: f64 },
}

/// Notifications for the surrounding UI.
#[derive(Clone, Debug, PartialEq)]
pub enum InteractionEvent {
	Selected(NodeId),
	Deselected,
	/// A node was double-clicked.
	Focus(NodeId),
	Hover(Option<NodeId>),
	Moved { node_id: NodeId, position: Vec3 },
}

#[derive(Debug, Default)]
pub struct InteractionController {
	mode: InteractionMode,
	selected: Option<NodeId>,
	drag: Option<DragState>,
	gesture: Option<Gesture>,
	events: Vec<InteractionEvent>,
}

impl InteractionController {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn mode(&self) -> InteractionMode {
		self.mode
	}

	pub fn selected(&self) -> Option<&str> {
		self.selected.as_deref()
	}

	pub fn drag(&self) -> Option<&DragState> {
		self.drag.as_ref()
	}

	pub fn is_dragging(&self) -> bool {
		self.drag.is_some()
	}

	pub fn take_events(&mut self) -> Vec<InteractionEvent> {
		std::mem::take(&mut self.events)
	}

	/// Switching modes always abandons an in-progress drag or gesture.
	pub fn set_mode(&mut self, mode: InteractionMode) {
		self.cancel();
		if self.mode != mode {
			debug!("Interaction mode {:?} -> {:?}", self.mode, mode);
			self.mode = mode;
		}
	}

	/// Drops any drag (without committing it) and any camera gesture.
	pub fn cancel(&mut self) {
		if let Some(drag) = self.drag.take() {
			debug!("Cancelled drag of {:?}", drag.node_id);
		}
		self.gesture = None;
	}

	pub fn select(&mut self, id: NodeId) {
		if self.selected.as_ref() != Some(&id) {
			self.selected = Some(id.clone());
			self.events.push(InteractionEvent::Selected(id));
		}
	}

	pub fn deselect(&mut self) {
		if self.selected.take().is_some() {
			self.events.push(InteractionEvent::Deselected);
		}
	}

	/// Forgets a node that no longer exists.
	pub fn forget(&mut self, id: &str) {
		if self.selected.as_deref() == Some(id) {
			self.deselect();
		}
		if self.drag.as_ref().is_some_and(|d| d.node_id == id) {
			self.drag = None;
		}
	}

	/// Nodes the scene must hold still this frame.
	pub fn pinned(&self) -> Vec<Pinned<'_>> {
		let mut pins = Vec::with_capacity(2);
		if let Some(drag) = &self.drag {
			pins.push(Pinned {
				node_id: &drag.node_id,
				preview: Some(drag.current),
			});
		}
		if let Some(id) = self.selected.as_deref() {
			if pins.iter().all(|p| p.node_id != id) {
				pins.push(Pinned {
					node_id: id,
					preview: None,
				});
			}
		}
		pins
	}

	pub fn pointer_down(
		&mut self,
		button: PointerButton,
		sx: f64,
		sy: f64,
		ray: &Ray,
		scene: &Scene,
		camera: &OrbitCamera,
	) {
		self.cancel();
		if button != PointerButton::Primary {
			if self.mode == InteractionMode::Camera {
				self.gesture = Some(Gesture::Pan { x: sx, y: sy });
			}
			return;
		}

		match scene.pick(ray) {
			Some(id) => {
				self.select(id.clone());
				if self.mode == InteractionMode::Edit {
					self.begin_drag(id, ray, scene, camera);
				}
			}
			None => self.deselect(),
		}
		if self.mode == InteractionMode::Camera {
			self.gesture = Some(Gesture::Orbit { x: sx, y: sy });
		}
	}

	fn begin_drag(&mut self, id: NodeId, ray: &Ray, scene: &Scene, camera: &OrbitCamera) {
		// Anchor on the model position, not the bobbing one.
		let Some(position) = scene.node(&id).map(|v| v.base_position) else {
			return;
		};
		let plane = Plane::from_normal_and_point(camera.forward(), position);
		let Some(grab) = ray.intersect_plane(&plane) else {
			return;
		};
		debug!("Dragging {id:?}");
		self.drag = Some(DragState {
			node_id: id,
			plane,
			offset: position - grab,
			current: position,
			moved: false,
		});
	}

	pub fn pointer_move(
		&mut self,
		sx: f64,
		sy: f64,
		ray: &Ray,
		scene: &mut Scene,
		camera: &mut OrbitCamera,
	) {
		if let Some(drag) = &mut self.drag {
			if let Some(point) = ray.intersect_plane(&drag.plane) {
				drag.current = point + drag.offset;
				drag.moved = true;
			}
			return;
		}

		match &mut self.gesture {
			Some(Gesture::Orbit { x, y }) => {
				camera.orbit(sx - *x, sy - *y);
				*x = sx;
				*y = sy;
			}
			Some(Gesture::Pan { x, y }) => {
				camera.pan(sx - *x, sy - *y);
				*x = sx;
				*y = sy;
			}
			None => {
				let hovered = if self.mode == InteractionMode::Camera {
					scene.pick(ray)
				} else {
					None
				};
				if scene.hovered() != hovered.as_deref() {
					scene.set_hovered(hovered.clone());
					self.events.push(InteractionEvent::Hover(hovered));
				}
			}
		}
	}

	/// Ends the current gesture; a finished drag is returned for the model to commit.
	pub fn pointer_up(&mut self) -> Option<(NodeId, Vec3)> {
		self.gesture = None;
		let drag = self.drag.take().filter(|d| d.moved)?;
		debug!("Dropped {:?} at {:?}", drag.node_id, drag.current);
		self.events.push(InteractionEvent::Moved {
			node_id: drag.node_id.clone(),
			position: drag.current,
		});
		Some((drag.node_id, drag.current))
	}

	pub fn pointer_leave(&mut self, scene: &mut Scene) -> Option<(NodeId, Vec3)> {
		if scene.hovered().is_some() {
			scene.set_hovered(None);
			self.events.push(InteractionEvent::Hover(None));
		}
		self.pointer_up()
	}

	pub fn double_click(&mut self, ray: &Ray, scene: &Scene) {
		if let Some(id) = scene.pick(ray) {
			self.select(id.clone());
			self.events.push(InteractionEvent::Focus(id));
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::arch_scene::camera::Viewport;
	use crate::components::arch_scene::config::SceneConfig;
	use crate::components::arch_scene::graph::{GraphModel, NewNode};
	use crate::components::arch_scene::registry::TypeRegistry;

	struct Fixture {
		scene: Scene,
		camera: OrbitCamera,
		viewport: Viewport,
		node: NodeId,
	}

	fn fixture() -> Fixture {
		let config = SceneConfig::default();
		let registry = TypeRegistry::new();
		let mut graph = GraphModel::new();
		let node = graph.add_node(&registry, NewNode::new("gateway", Vec3::ZERO));
		let mut scene = Scene::new(&config);
		scene.sync(&graph, &registry);
		Fixture {
			scene,
			camera: OrbitCamera::new(&config),
			viewport: Viewport::default(),
			node,
		}
	}

	impl Fixture {
		fn ray(&self, x: f64, y: f64) -> Ray {
			self.camera.ray_through(x, y, &self.viewport)
		}
	}

	#[test]
	fn test_camera_mode_selects_without_dragging() {
		let mut f = fixture();
		let mut ctl = InteractionController::new();
		let ray = f.ray(400.0, 300.0);
		ctl.pointer_down(PointerButton::Primary, 400.0, 300.0, &ray, &f.scene, &f.camera);
		assert_eq!(ctl.selected(), Some(f.node.as_str()));
		assert!(!ctl.is_dragging());

		let ray = f.ray(450.0, 300.0);
		ctl.pointer_move(450.0, 300.0, &ray, &mut f.scene, &mut f.camera);
		assert!(ctl.pointer_up().is_none());
		assert!((f.camera.position() - Vec3::new(0.0, 30.0, 90.0)).length() > 1.0);
	}

	#[test]
	fn test_edit_mode_drag_commits_on_release() {
		let mut f = fixture();
		f.camera.controls_enabled = false;
		let mut ctl = InteractionController::new();
		ctl.set_mode(InteractionMode::Edit);

		// Grab slightly off-center; the node must not jump to the cursor.
		let grab = f.ray(402.0, 301.0);
		ctl.pointer_down(PointerButton::Primary, 402.0, 301.0, &grab, &f.scene, &f.camera);
		assert!(ctl.is_dragging());
		assert_eq!(ctl.drag().unwrap().current, Vec3::ZERO);

		let ray = f.ray(402.0, 301.0);
		ctl.pointer_move(402.0, 301.0, &ray, &mut f.scene, &mut f.camera);
		assert!(ctl.drag().unwrap().current.length() < 1e-3);

		let ray = f.ray(500.0, 301.0);
		ctl.pointer_move(500.0, 301.0, &ray, &mut f.scene, &mut f.camera);
		let (id, position) = ctl.pointer_up().unwrap();
		assert_eq!(id, f.node);
		assert!(position.x > 1.0);
		assert!(!ctl.is_dragging());
		assert!(
			ctl.take_events()
				.iter()
				.any(|e| matches!(e, InteractionEvent::Moved { .. }))
		);
	}

	#[test]
	fn test_click_in_place_commits_nothing() {
		let mut f = fixture();
		let pins: Vec<Pinned<'_>> = Vec::new();
		f.scene.animate(4.0, &pins);
		let bobbed = f.scene.position_of(&f.node).unwrap();
		assert!(bobbed.y.abs() > 1e-3);

		let mut ctl = InteractionController::new();
		ctl.set_mode(InteractionMode::Edit);
		let ray = f.ray(400.0, 300.0);
		ctl.pointer_down(PointerButton::Primary, 400.0, 300.0, &ray, &f.scene, &f.camera);
		assert_eq!(ctl.drag().unwrap().current, Vec3::ZERO);
		assert!(ctl.pointer_up().is_none());
		assert_eq!(ctl.take_events(), vec![InteractionEvent::Selected(f.node.clone())]);
	}

	#[test]
	fn test_mode_switch_cancels_drag() {
		let mut f = fixture();
		let mut ctl = InteractionController::new();
		ctl.set_mode(InteractionMode::Edit);
		let ray = f.ray(400.0, 300.0);
		ctl.pointer_down(PointerButton::Primary, 400.0, 300.0, &ray, &f.scene, &f.camera);
		assert!(ctl.is_dragging());
		ctl.set_mode(InteractionMode::Camera);
		assert!(!ctl.is_dragging());
		assert!(ctl.pointer_up().is_none());
	}

	#[test]
	fn test_empty_click_deselects_and_double_click_focuses() {
		let f = fixture();
		let mut ctl = InteractionController::new();
		let hit = f.ray(400.0, 300.0);
		ctl.double_click(&hit, &f.scene);
		assert_eq!(ctl.selected(), Some(f.node.as_str()));

		let miss = f.ray(10.0, 10.0);
		ctl.pointer_down(PointerButton::Primary, 10.0, 10.0, &miss, &f.scene, &f.camera);
		assert_eq!(ctl.selected(), None);
		assert_eq!(
			ctl.take_events(),
			vec![
				InteractionEvent::Selected(f.node.clone()),
				InteractionEvent::Focus(f.node.clone()),
				InteractionEvent::Deselected,
			]
		);
	}

	#[test]
	fn test_hover_only_in_camera_mode() {
		let mut f = fixture();
		let mut ctl = InteractionController::new();
		let ray = f.ray(400.0, 300.0);
		ctl.pointer_move(400.0, 300.0, &ray, &mut f.scene, &mut f.camera);
		assert_eq!(f.scene.hovered(), Some(f.node.as_str()));

		ctl.set_mode(InteractionMode::Edit);
		ctl.pointer_move(400.0, 300.0, &ray, &mut f.scene, &mut f.camera);
		assert_eq!(f.scene.hovered(), None);
	}
}
