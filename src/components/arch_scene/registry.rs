//! The catalog of component types that nodes are stamped from.
//!
//! Entries are flat records. A derived type copies its parent's fields once at creation time
//! and keeps `parent_type_id` for display only; no lookup ever walks the parent chain.

use std::fmt;

use glam::Vec3;
use indexmap::IndexSet;
use log::{debug, warn};
use uuid::Uuid;

use super::error::{EditorError, Result};
use super::types::Color;

/// Slug that unresolved lookups fall back to.
pub const FALLBACK_SLUG: &str = "internal";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometryKind {
	Sphere,
	Box,
	Cylinder,
	TallCylinder,
	Octahedron,
	Icosahedron,
	Torus,
	Dodecahedron,
}

/// The volume a pick ray is tested against, in unscaled local units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HitVolume {
	Sphere(f32),
	Box(Vec3),
}

impl GeometryKind {
	pub const ALL: [GeometryKind; 8] = [
		GeometryKind::Sphere,
		GeometryKind::Box,
		GeometryKind::Cylinder,
		GeometryKind::TallCylinder,
		GeometryKind::Octahedron,
		GeometryKind::Icosahedron,
		GeometryKind::Torus,
		GeometryKind::Dodecahedron,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			GeometryKind::Sphere => "sphere",
			GeometryKind::Box => "box",
			GeometryKind::Cylinder => "cylinder",
			GeometryKind::TallCylinder => "tall-cylinder",
			GeometryKind::Octahedron => "octahedron",
			GeometryKind::Icosahedron => "icosahedron",
			GeometryKind::Torus => "torus",
			GeometryKind::Dodecahedron => "dodecahedron",
		}
	}

	pub fn parse(s: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|g| g.as_str() == s)
	}

	pub fn hit_volume(&self) -> HitVolume {
		match self {
			GeometryKind::Sphere => HitVolume::Sphere(0.7),
			GeometryKind::Box => HitVolume::Box(Vec3::splat(0.5)),
			GeometryKind::Cylinder => HitVolume::Box(Vec3::new(0.5, 0.5, 0.5)),
			GeometryKind::TallCylinder => HitVolume::Box(Vec3::new(0.5, 1.0, 0.5)),
			GeometryKind::Torus => HitVolume::Sphere(0.9),
			GeometryKind::Octahedron | GeometryKind::Icosahedron | GeometryKind::Dodecahedron => {
				HitVolume::Sphere(1.0)
			}
		}
	}
}

impl fmt::Display for GeometryKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Which target types a type may open connections to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowedConnections {
	All,
	/// An empty set marks a pure sink.
	Only(IndexSet<String>),
}

impl AllowedConnections {
	pub fn only<I, S>(slugs: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		AllowedConnections::Only(slugs.into_iter().map(Into::into).collect())
	}

	pub fn none() -> Self {
		AllowedConnections::Only(IndexSet::new())
	}

	pub fn permits(&self, target_slug: &str) -> bool {
		match self {
			AllowedConnections::All => true,
			AllowedConnections::Only(slugs) => slugs.contains(target_slug),
		}
	}

	/// Copy with `target_slug` added to or removed from the list. `All` has no list and is
	/// returned unchanged.
	pub fn with_target(&self, target_slug: &str, allowed: bool) -> Self {
		match self {
			AllowedConnections::All => AllowedConnections::All,
			AllowedConnections::Only(slugs) => {
				let mut slugs = slugs.clone();
				if allowed {
					slugs.insert(target_slug.to_string());
				} else {
					slugs.shift_remove(target_slug);
				}
				AllowedConnections::Only(slugs)
			}
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComponentType {
	pub id: String,
	pub type_slug: String,
	pub label: String,
	pub name_prefix: String,
	pub description: String,
	pub geometry: GeometryKind,
	pub base_color: Color,
	pub scale: f32,
	pub allowed_connections: AllowedConnections,
	pub parent_type_id: Option<String>,
	pub is_system: bool,
	pub category: String,
}

/// Fields of a type that may be edited after creation.
#[derive(Clone, Debug, Default)]
pub struct TypePatch {
	pub label: Option<String>,
	pub name_prefix: Option<String>,
	pub description: Option<String>,
	pub geometry: Option<GeometryKind>,
	pub base_color: Option<Color>,
	pub scale: Option<f32>,
	pub allowed_connections: Option<AllowedConnections>,
	pub category: Option<String>,
}

#[allow(clippy::too_many_arguments)]
fn system_type(
	slug: &str,
	label: &str,
	prefix: &str,
	description: &str,
	geometry: GeometryKind,
	color: u32,
	scale: f32,
	allowed: AllowedConnections,
	category: &str,
) -> ComponentType {
	ComponentType {
		id: format!("sys-{slug}"),
		type_slug: slug.into(),
		label: label.into(),
		name_prefix: prefix.into(),
		description: description.into(),
		geometry,
		base_color: Color::from_hex(color),
		scale,
		allowed_connections: allowed,
		parent_type_id: None,
		is_system: true,
		category: category.into(),
	}
}

fn system_catalog() -> Vec<ComponentType> {
	use AllowedConnections as A;
	use GeometryKind as G;
	vec![
		system_type(
			"client",
			"Client",
			"Client",
			"External applications consuming the API.",
			G::Sphere,
			0x06b6d4,
			1.0,
			A::only(["proxy", "gateway"]),
			"Edge",
		),
		system_type(
			"proxy",
			"Gateway Proxy",
			"Proxy",
			"Decouples the API gateway from external traffic and handles load balancing.",
			G::Torus,
			0x10b981,
			2.5,
			A::only(["gateway"]),
			"Edge",
		),
		system_type(
			"gateway",
			"API Gateway",
			"Gateway",
			"Single entry point that routes requests inward.",
			G::Octahedron,
			0xd946ef,
			3.0,
			A::only(["host", "transformer", "internal", "broker", "database"]),
			"Routing",
		),
		system_type(
			"host",
			"Host Server",
			"Host",
			"A machine running one or more services.",
			G::TallCylinder,
			0x94a3b8,
			2.0,
			A::only(["internal", "external", "database"]),
			"Compute",
		),
		system_type(
			"transformer",
			"Transformer / Broker",
			"Transformer",
			"Adapts and transforms messages between formats.",
			G::Icosahedron,
			0x3b82f6,
			2.0,
			A::only(["external", "internal"]),
			"Routing",
		),
		system_type(
			"broker",
			"Service Broker",
			"Broker",
			"Message bus handling discovery, routing and decoupling.",
			G::Dodecahedron,
			0xf97316,
			2.5,
			A::only(["transformer", "internal", "external", "database"]),
			"Routing",
		),
		system_type(
			"internal",
			"Internal Svc",
			"Service",
			"A service inside the trust boundary.",
			G::Cylinder,
			0xeab308,
			1.5,
			A::only(["internal", "host", "database"]),
			"Compute",
		),
		system_type(
			"database",
			"Database",
			"Database",
			"Persistent storage.",
			G::Cylinder,
			0xeab308,
			2.0,
			A::none(),
			"Storage",
		),
		system_type(
			"external",
			"External Svc",
			"External",
			"A third-party endpoint; does not call back into the system.",
			G::Box,
			0x8b5cf6,
			2.0,
			A::none(),
			"Edge",
		),
	]
}

fn kebab(label: &str) -> String {
	let mut out = String::with_capacity(label.len());
	for c in label.chars() {
		if c.is_ascii_alphanumeric() {
			out.push(c.to_ascii_lowercase());
		} else if !out.ends_with('-') {
			out.push('-');
		}
	}
	let trimmed = out.trim_matches('-');
	if trimmed.is_empty() {
		"type".into()
	} else {
		trimmed.into()
	}
}

/// Owned, mutable catalog of component types.
///
/// Consumers hold a reference to it; there is no global instance.
#[derive(Clone, Debug)]
pub struct TypeRegistry {
	types: Vec<ComponentType>,
	fallback: ComponentType,
}

impl Default for TypeRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl TypeRegistry {
	/// A registry seeded with the system catalog.
	pub fn new() -> Self {
		let types = system_catalog();
		let fallback = types
			.iter()
			.find(|t| t.type_slug == FALLBACK_SLUG)
			.cloned()
			.unwrap_or_else(|| types[0].clone());
		Self { types, fallback }
	}

	/// Resolves a slug, falling back to the default type when it is unknown.
	pub fn get(&self, slug: &str) -> &ComponentType {
		self.find(slug).unwrap_or(&self.fallback)
	}

	pub fn find(&self, slug: &str) -> Option<&ComponentType> {
		self.types.iter().find(|t| t.type_slug == slug)
	}

	pub fn get_by_id(&self, id: &str) -> Option<&ComponentType> {
		self.types.iter().find(|t| t.id == id)
	}

	pub fn all(&self) -> &[ComponentType] {
		&self.types
	}

	pub fn system_types(&self) -> impl Iterator<Item = &ComponentType> {
		self.types.iter().filter(|t| t.is_system)
	}

	pub fn custom_types(&self) -> impl Iterator<Item = &ComponentType> {
		self.types.iter().filter(|t| !t.is_system)
	}

	pub fn slugs(&self) -> impl Iterator<Item = &str> {
		self.types.iter().map(|t| t.type_slug.as_str())
	}

	pub fn fallback(&self) -> &ComponentType {
		&self.fallback
	}

	/// Directional legality: may a node of `from_slug` connect to one of `to_slug`?
	///
	/// Both ends resolve through [`TypeRegistry::get`], so unknown slugs are judged as the
	/// fallback type.
	pub fn permits(&self, from_slug: &str, to_slug: &str) -> bool {
		self.get(from_slug)
			.allowed_connections
			.permits(&self.get(to_slug).type_slug)
	}

	/// Adds a type. Rejected when its id or slug is already taken.
	pub fn add(&mut self, config: ComponentType) -> bool {
		if self.get_by_id(&config.id).is_some() || self.find(&config.type_slug).is_some() {
			warn!("Rejected type {:?}: id or slug already registered", config.type_slug);
			return false;
		}
		debug!("Registered type {:?}", config.type_slug);
		self.types.push(config);
		true
	}

	/// Applies `patch` to a custom type. System types are left untouched.
	pub fn update(&mut self, id: &str, patch: TypePatch) -> bool {
		let Some(entry) = self.types.iter_mut().find(|t| t.id == id) else {
			return false;
		};
		if entry.is_system {
			debug!("Ignored edit of system type {:?}", entry.type_slug);
			return false;
		}
		if let Some(label) = patch.label {
			entry.label = label;
		}
		if let Some(prefix) = patch.name_prefix {
			entry.name_prefix = prefix;
		}
		if let Some(description) = patch.description {
			entry.description = description;
		}
		if let Some(geometry) = patch.geometry {
			entry.geometry = geometry;
		}
		if let Some(color) = patch.base_color {
			entry.base_color = color;
		}
		if let Some(scale) = patch.scale.filter(|s| *s > 0.0) {
			entry.scale = scale;
		}
		if let Some(allowed) = patch.allowed_connections {
			entry.allowed_connections = allowed;
		}
		if let Some(category) = patch.category {
			entry.category = category;
		}
		true
	}

	/// Removes a custom type. Nodes already using it resolve to the fallback afterward.
	pub fn delete(&mut self, id: &str) -> bool {
		match self.types.iter().position(|t| t.id == id) {
			Some(idx) if !self.types[idx].is_system => {
				let removed = self.types.remove(idx);
				debug!("Deleted type {:?}", removed.type_slug);
				true
			}
			Some(_) => {
				debug!("Ignored delete of system type {id:?}");
				false
			}
			None => false,
		}
	}

	/// Builds (but does not register) a custom type cloned from `parent_id`.
	pub fn derive_from(&self, parent_id: &str, new_label: &str) -> Result<ComponentType> {
		let parent = self
			.get_by_id(parent_id)
			.ok_or_else(|| EditorError::UnknownType(parent_id.into()))?;

		let base = kebab(new_label);
		let type_slug = loop {
			let suffix = Uuid::new_v4().simple().to_string();
			let candidate = format!("custom-{base}-{}", &suffix[..6]);
			if self.find(&candidate).is_none() {
				break candidate;
			}
		};

		Ok(ComponentType {
			id: Uuid::new_v4().to_string(),
			type_slug,
			label: new_label.into(),
			name_prefix: new_label.into(),
			description: format!("Derived from {}", parent.label),
			parent_type_id: Some(parent.id.clone()),
			is_system: false,
			category: "Custom".into(),
			..parent.clone()
		})
	}
}
