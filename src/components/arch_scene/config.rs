use glam::Vec3;
use serde::Deserialize;

use super::error::Result;
use super::types::Color;

/// Tunables for the camera, idle animation and flow simulation.
///
/// Every field has a default, so a JSON override only needs the keys it changes.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneConfig {
	pub camera_home: [f32; 3],
	pub camera_target: [f32; 3],
	/// Vertical field of view in degrees.
	pub fov_deg: f32,
	pub near: f32,
	pub far: f32,
	pub min_distance: f32,
	pub max_distance: f32,
	/// Radians per pixel of pointer travel.
	pub orbit_speed: f32,
	/// World units per pixel at unit distance.
	pub pan_speed: f32,
	pub zoom_step: f32,

	pub bob_amplitude: f32,
	pub bob_frequency: f32,
	/// Radians per frame.
	pub spin_speed: f32,
	pub hover_pulse: f32,
	pub label_offset: f32,

	/// Lift of an edge's midpoint as a fraction of its length.
	pub arc_lift: f32,
	pub curve_segments: usize,

	/// Chance per frame that a new marker is launched.
	pub spawn_probability: f64,
	pub marker_speed_min: f32,
	pub marker_speed_max: f32,
	/// Radians per frame of the automatic camera orbit.
	pub orbit_angular_speed: f32,

	pub background: String,
}

impl Default for SceneConfig {
	fn default() -> Self {
		Self {
			camera_home: [0.0, 30.0, 90.0],
			camera_target: [0.0, 0.0, 0.0],
			fov_deg: 45.0,
			near: 0.1,
			far: 1000.0,
			min_distance: 10.0,
			max_distance: 200.0,
			orbit_speed: 0.005,
			pan_speed: 0.0015,
			zoom_step: 1.1,

			bob_amplitude: 0.4,
			bob_frequency: 1.0,
			spin_speed: 0.005,
			hover_pulse: 0.1,
			label_offset: 1.5,

			arc_lift: 0.1,
			curve_segments: 24,

			spawn_probability: 0.08,
			marker_speed_min: 0.008,
			marker_speed_max: 0.02,
			orbit_angular_speed: 0.002,

			background: "#000510".into(),
		}
	}
}

impl SceneConfig {
	/// Parses a (possibly partial) JSON override on top of the defaults.
	pub fn from_json(json: &str) -> Result<Self> {
		Ok(serde_json::from_str(json)?)
	}

	pub fn camera_home(&self) -> Vec3 {
		Vec3::from_array(self.camera_home)
	}

	pub fn camera_target(&self) -> Vec3 {
		Vec3::from_array(self.camera_target)
	}

	pub fn background_color(&self) -> Color {
		Color::parse(&self.background).unwrap_or(Color::from_hex(0x000510))
	}
}
