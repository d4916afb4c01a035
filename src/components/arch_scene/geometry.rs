//! Ray and plane math used for picking and drag projection.
//!
//! Nothing here knows about the camera or the canvas; callers build rays from whatever
//! projection they use.

use glam::{Quat, Vec3};

const EPSILON: f32 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
	pub origin: Vec3,
	/// Unit length.
	pub direction: Vec3,
}

/// The plane `normal . p + constant = 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
	pub normal: Vec3,
	pub constant: f32,
}

impl Plane {
	pub fn from_normal_and_point(normal: Vec3, point: Vec3) -> Self {
		let normal = normal.normalize_or_zero();
		Self {
			normal,
			constant: -normal.dot(point),
		}
	}

	/// The horizontal plane at height `y`.
	pub fn horizontal(y: f32) -> Self {
		Self::from_normal_and_point(Vec3::Y, Vec3::new(0.0, y, 0.0))
	}

	pub fn distance_to(&self, point: Vec3) -> f32 {
		self.normal.dot(point) + self.constant
	}
}

impl Ray {
	pub fn new(origin: Vec3, direction: Vec3) -> Self {
		Self {
			origin,
			direction: direction.normalize_or_zero(),
		}
	}

	pub fn at(&self, t: f32) -> Vec3 {
		self.origin + self.direction * t
	}

	/// Point where the ray crosses `plane`, if it does so in front of the origin.
	pub fn intersect_plane(&self, plane: &Plane) -> Option<Vec3> {
		let denom = plane.normal.dot(self.direction);
		if denom.abs() < EPSILON {
			return None;
		}
		let t = -plane.distance_to(self.origin) / denom;
		(t >= 0.0).then(|| self.at(t))
	}

	/// Distance along the ray to the first hit on a sphere.
	pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
		let oc = self.origin - center;
		let b = oc.dot(self.direction);
		let c = oc.length_squared() - radius * radius;
		let disc = b * b - c;
		if disc < 0.0 {
			return None;
		}
		let sq = disc.sqrt();
		let near = -b - sq;
		if near >= 0.0 {
			Some(near)
		} else {
			let far = -b + sq;
			(far >= 0.0).then_some(far)
		}
	}

	/// Distance along the ray to a box centered on `center` with the given half extents,
	/// rotated by `rotation_y` radians about the vertical axis.
	pub fn intersect_box(&self, center: Vec3, half: Vec3, rotation_y: f32) -> Option<f32> {
		let to_local = Quat::from_rotation_y(-rotation_y);
		let origin = to_local * (self.origin - center);
		let dir = to_local * self.direction;

		let mut t_min = f32::NEG_INFINITY;
		let mut t_max = f32::INFINITY;
		for axis in 0..3 {
			let (o, d, h) = (origin[axis], dir[axis], half[axis]);
			if d.abs() < EPSILON {
				if o.abs() > h {
					return None;
				}
				continue;
			}
			let (mut t1, mut t2) = ((-h - o) / d, (h - o) / d);
			if t1 > t2 {
				std::mem::swap(&mut t1, &mut t2);
			}
			t_min = t_min.max(t1);
			t_max = t_max.min(t2);
			if t_min > t_max {
				return None;
			}
		}
		if t_max < 0.0 {
			None
		} else {
			Some(t_min.max(0.0))
		}
	}
}
