//! Traveling markers along connections, plus the camera auto-orbit that runs with them.

use glam::Vec3;
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::camera::OrbitCamera;
use super::config::SceneConfig;
use super::graph::GraphModel;
use super::scene::Scene;
use super::types::{Color, NodeId};

#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
	pub from: NodeId,
	pub to: NodeId,
	/// 0 at the source, 1 at the target.
	pub progress: f32,
	/// Progress per frame.
	pub speed: f32,
	pub position: Vec3,
	pub color: Color,
}

/// Circular camera path captured when the simulation starts.
#[derive(Clone, Copy, Debug, PartialEq)]
struct OrbitPath {
	center: Vec3,
	radius: f32,
	height: f32,
	angle: f32,
}

pub struct FlowSimulator {
	active: bool,
	paused: bool,
	markers: Vec<Marker>,
	orbit: Option<OrbitPath>,
	rng: ChaCha8Rng,
	spawn_probability: f64,
	speed_range: (f32, f32),
	angular_speed: f32,
}

impl FlowSimulator {
	pub fn new(config: &SceneConfig) -> Self {
		Self::with_rng(config, ChaCha8Rng::from_entropy())
	}

	/// Deterministic simulator for reproducible runs.
	pub fn with_seed(config: &SceneConfig, seed: u64) -> Self {
		Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
	}

	fn with_rng(config: &SceneConfig, rng: ChaCha8Rng) -> Self {
		let (lo, hi) = (config.marker_speed_min, config.marker_speed_max);
		Self {
			active: false,
			paused: false,
			markers: Vec::new(),
			orbit: None,
			rng,
			spawn_probability: config.spawn_probability.clamp(0.0, 1.0),
			speed_range: (lo.min(hi).max(f32::EPSILON), hi.max(lo).max(f32::EPSILON)),
			angular_speed: config.orbit_angular_speed,
		}
	}

	pub fn is_active(&self) -> bool {
		self.active
	}

	pub fn is_paused(&self) -> bool {
		self.paused
	}

	pub fn markers(&self) -> &[Marker] {
		&self.markers
	}

	/// Freezes markers in place without stopping the simulation.
	pub fn set_paused(&mut self, paused: bool) {
		self.paused = paused;
	}

	/// Takes over the camera; the orbit starts from wherever the camera is now.
	pub fn start(&mut self, camera: &mut OrbitCamera) {
		if self.active {
			return;
		}
		let center = camera.target;
		let offset = camera.position() - center;
		self.orbit = Some(OrbitPath {
			center,
			radius: Vec3::new(offset.x, 0.0, offset.z).length(),
			height: offset.y,
			angle: offset.z.atan2(offset.x),
		});
		camera.controls_enabled = false;
		self.active = true;
		info!("Flow simulation started");
	}

	/// Destroys every in-flight marker and hands the camera back.
	pub fn stop(&mut self, camera: &mut OrbitCamera) {
		if !self.active {
			return;
		}
		let dropped = self.markers.len();
		self.markers.clear();
		self.orbit = None;
		self.active = false;
		camera.controls_enabled = true;
		info!("Flow simulation stopped, {dropped} markers dropped");
	}

	/// One frame: orbit the camera, maybe launch a marker, advance the rest.
	pub fn step(&mut self, graph: &GraphModel, scene: &Scene, camera: &mut OrbitCamera) {
		if !self.active {
			return;
		}
		if let Some(orbit) = &mut self.orbit {
			orbit.angle = (orbit.angle + self.angular_speed) % std::f32::consts::TAU;
			camera.set_position(
				orbit.center
					+ Vec3::new(
						orbit.radius * orbit.angle.cos(),
						orbit.height,
						orbit.radius * orbit.angle.sin(),
					),
			);
		}
		if self.paused {
			return;
		}

		self.maybe_spawn(graph, scene);

		self.markers.retain_mut(|marker| {
			let (Some(a), Some(b)) = (scene.position_of(&marker.from), scene.position_of(&marker.to))
			else {
				return false;
			};
			if !graph.is_connected(&marker.from, &marker.to) {
				return false;
			}
			marker.progress += marker.speed;
			if marker.progress >= 1.0 {
				return false;
			}
			marker.position = a.lerp(b, marker.progress);
			true
		});
	}

	fn maybe_spawn(&mut self, graph: &GraphModel, scene: &Scene) {
		let count = graph.connection_count();
		if count == 0 || !self.rng.gen_bool(self.spawn_probability) {
			return;
		}
		let pick = self.rng.gen_range(0..count);
		let Some((from, to)) = graph.connections().nth(pick) else {
			return;
		};
		let Some(start) = scene.position_of(from) else {
			return;
		};
		let (lo, hi) = self.speed_range;
		let speed = if hi > lo { self.rng.gen_range(lo..hi) } else { lo };
		debug!("Marker {from:?} -> {to:?} at {speed:.4}/frame");
		self.markers.push(Marker {
			from: from.into(),
			to: to.into(),
			progress: 0.0,
			speed,
			position: start,
			color: graph.connection_color(from).unwrap_or(Color::WHITE),
		});
	}
}
