use glam::{Mat4, Vec2, Vec3, Vec4};

use super::config::SceneConfig;
use super::geometry::Ray;

/// Polar angle is kept off the poles so `look_at` never degenerates.
const POLAR_EPSILON: f32 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	pub width: f64,
	pub height: f64,
}

impl Default for Viewport {
	fn default() -> Self {
		Self {
			width: 800.0,
			height: 600.0,
		}
	}
}

impl Viewport {
	pub fn aspect(&self) -> f32 {
		if self.height <= 0.0 {
			1.0
		} else {
			(self.width / self.height) as f32
		}
	}

	/// Canvas pixels to normalized device coordinates (y up).
	pub fn to_ndc(&self, sx: f64, sy: f64) -> Vec2 {
		let w = self.width.max(1.0);
		let h = self.height.max(1.0);
		Vec2::new((sx / w * 2.0 - 1.0) as f32, (-(sy / h) * 2.0 + 1.0) as f32)
	}

	pub fn from_ndc(&self, ndc: Vec2) -> (f64, f64) {
		(
			(ndc.x as f64 + 1.0) * 0.5 * self.width,
			(1.0 - ndc.y as f64) * 0.5 * self.height,
		)
	}
}

/// A world point mapped onto the canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projected {
	pub x: f64,
	pub y: f64,
	/// Distance from the eye along the view direction.
	pub depth: f32,
	/// Canvas pixels per world unit at this depth.
	pub pixels_per_unit: f64,
}

/// A perspective camera orbiting a target point.
#[derive(Clone, Debug)]
pub struct OrbitCamera {
	pub target: Vec3,
	radius: f32,
	/// Angle around the vertical axis, measured from +x toward +z.
	azimuth: f32,
	/// Angle down from +y.
	polar: f32,
	fov_y: f32,
	near: f32,
	far: f32,
	min_distance: f32,
	max_distance: f32,
	orbit_speed: f32,
	pan_speed: f32,
	zoom_step: f32,
	home: Vec3,
	home_target: Vec3,
	pub controls_enabled: bool,
}

impl OrbitCamera {
	pub fn new(config: &SceneConfig) -> Self {
		let mut camera = Self {
			target: config.camera_target(),
			radius: 1.0,
			azimuth: 0.0,
			polar: std::f32::consts::FRAC_PI_2,
			fov_y: config.fov_deg.to_radians(),
			near: config.near,
			far: config.far,
			min_distance: config.min_distance,
			max_distance: config.max_distance,
			orbit_speed: config.orbit_speed,
			pan_speed: config.pan_speed,
			zoom_step: config.zoom_step,
			home: config.camera_home(),
			home_target: config.camera_target(),
			controls_enabled: true,
		};
		camera.reset();
		camera
	}

	pub fn position(&self) -> Vec3 {
		let sin_p = self.polar.sin();
		self.target
			+ Vec3::new(
				self.radius * sin_p * self.azimuth.cos(),
				self.radius * self.polar.cos(),
				self.radius * sin_p * self.azimuth.sin(),
			)
	}

	/// Places the eye at `position`, still looking at the target.
	pub fn set_position(&mut self, position: Vec3) {
		let offset = position - self.target;
		let radius = offset.length();
		if radius < f32::EPSILON {
			return;
		}
		self.radius = radius;
		self.azimuth = offset.z.atan2(offset.x);
		self.polar = (offset.y / radius)
			.clamp(-1.0, 1.0)
			.acos()
			.clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);
	}

	pub fn reset(&mut self) {
		self.target = self.home_target;
		self.set_position(self.home);
	}

	pub fn distance(&self) -> f32 {
		self.radius
	}

	pub fn forward(&self) -> Vec3 {
		(self.target - self.position()).normalize_or_zero()
	}

	pub fn orbit(&mut self, dx: f64, dy: f64) {
		if !self.controls_enabled {
			return;
		}
		self.azimuth += dx as f32 * self.orbit_speed;
		self.polar = (self.polar - dy as f32 * self.orbit_speed)
			.clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);
	}

	/// Slides target and eye together in the view plane.
	pub fn pan(&mut self, dx: f64, dy: f64) {
		if !self.controls_enabled {
			return;
		}
		let forward = self.forward();
		let right = forward.cross(Vec3::Y).normalize_or_zero();
		let up = right.cross(forward).normalize_or_zero();
		let scale = self.radius * self.pan_speed;
		self.target += (-right * dx as f32 + up * dy as f32) * scale;
	}

	/// Positive `delta` (wheel down) moves away from the target.
	pub fn zoom(&mut self, delta: f64) {
		if !self.controls_enabled || delta == 0.0 {
			return;
		}
		let factor = if delta > 0.0 {
			self.zoom_step
		} else {
			1.0 / self.zoom_step
		};
		self.radius = (self.radius * factor).clamp(self.min_distance, self.max_distance);
	}

	pub fn view(&self) -> Mat4 {
		Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
	}

	pub fn view_projection(&self, viewport: &Viewport) -> Mat4 {
		Mat4::perspective_rh(self.fov_y, viewport.aspect(), self.near, self.far) * self.view()
	}

	pub fn project(&self, world: Vec3, viewport: &Viewport) -> Option<Projected> {
		let clip = self.view_projection(viewport) * world.extend(1.0);
		if clip.w <= self.near {
			return None;
		}
		let ndc = Vec2::new(clip.x / clip.w, clip.y / clip.w);
		let (x, y) = viewport.from_ndc(ndc);
		let focal = viewport.height * 0.5 / (self.fov_y as f64 * 0.5).tan();
		Some(Projected {
			x,
			y,
			depth: clip.w,
			pixels_per_unit: focal / clip.w as f64,
		})
	}

	/// The pick ray through a canvas pixel.
	pub fn ray_through(&self, sx: f64, sy: f64, viewport: &Viewport) -> Ray {
		let ndc = viewport.to_ndc(sx, sy);
		let inverse = self.view_projection(viewport).inverse();
		let unproject = |z: f32| {
			let p = inverse * Vec4::new(ndc.x, ndc.y, z, 1.0);
			p.truncate() / p.w
		};
		// glam's right-handed perspective maps near to 0 and far to 1.
		let near = unproject(0.0);
		let far = unproject(1.0);
		Ray::new(near, far - near)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn camera() -> OrbitCamera {
		OrbitCamera::new(&SceneConfig::default())
	}

	#[test]
	fn test_home_position_round_trips() {
		let cam = camera();
		assert!((cam.position() - Vec3::new(0.0, 30.0, 90.0)).length() < 1e-3);
	}

	#[test]
	fn test_target_projects_to_center() {
		let cam = camera();
		let vp = Viewport::default();
		let p = cam.project(Vec3::ZERO, &vp).unwrap();
		assert!((p.x - 400.0).abs() < 1e-3);
		assert!((p.y - 300.0).abs() < 1e-3);
		assert!(cam.project(Vec3::new(0.0, 30.0, 200.0), &vp).is_none());
	}

	#[test]
	fn test_center_ray_points_at_target() {
		let cam = camera();
		let vp = Viewport::default();
		let ray = cam.ray_through(400.0, 300.0, &vp);
		assert!((ray.direction - cam.forward()).length() < 1e-3);
	}

	#[test]
	fn test_zoom_is_clamped_and_gated() {
		let mut cam = camera();
		for _ in 0..100 {
			cam.zoom(1.0);
		}
		assert!((cam.distance() - 200.0).abs() < 1e-3);

		cam.controls_enabled = false;
		cam.zoom(-1.0);
		cam.orbit(50.0, 0.0);
		assert!((cam.distance() - 200.0).abs() < 1e-3);
	}
}
