use std::f64::consts::{PI, TAU};

use glam::Vec3;
use web_sys::CanvasRenderingContext2d;

use super::camera::{OrbitCamera, Projected, Viewport};
use super::editor::SceneEditor;
use super::registry::GeometryKind;
use super::scene::{NodeVisual, Scene};

/// Screen radius of a unit-scale node per world unit.
const NODE_SIZE: f64 = 1.0;
const MARKER_SIZE: f64 = 0.5;
const ARROW_SIZE: f64 = 8.0;

pub fn render(editor: &SceneEditor, ctx: &CanvasRenderingContext2d) {
	let viewport = editor.viewport();
	ctx.set_fill_style_str(&editor.config().background_color().to_hex_string());
	ctx.fill_rect(0.0, 0.0, viewport.width, viewport.height);

	let scene = editor.scene();
	let camera = editor.camera();
	draw_ground(camera, viewport, ctx);
	draw_edges(scene, camera, viewport, ctx);
	draw_markers(editor, ctx);
	let selected = editor.selected_node().map(|n| n.id.as_str());
	draw_nodes(scene, camera, viewport, selected, ctx);
	draw_labels(editor, ctx);
}

/// Nodes in back-to-front order with their projections. Nodes behind the eye are skipped.
pub fn draw_order<'a>(
	scene: &'a Scene,
	camera: &OrbitCamera,
	viewport: &Viewport,
) -> Vec<(&'a NodeVisual, Projected)> {
	let mut order: Vec<_> = scene
		.nodes()
		.filter_map(|v| camera.project(v.position, viewport).map(|p| (v, p)))
		.collect();
	order.sort_by(|a, b| b.1.depth.total_cmp(&a.1.depth));
	order
}

/// Outline of a geometry kind in units of the node radius, turned by `rotation`.
/// Round kinds return an empty outline and are drawn as arcs.
pub fn silhouette(geometry: GeometryKind, rotation: f64) -> Vec<(f64, f64)> {
	let regular = |sides: usize, phase: f64| -> Vec<(f64, f64)> {
		(0..sides)
			.map(|i| {
				let a = phase + rotation + i as f64 / sides as f64 * TAU;
				(a.cos(), a.sin())
			})
			.collect()
	};
	match geometry {
		GeometryKind::Sphere | GeometryKind::Torus => Vec::new(),
		GeometryKind::Box => regular(4, PI / 4.0),
		GeometryKind::Cylinder => vec![(-0.7, -0.7), (0.7, -0.7), (0.7, 0.7), (-0.7, 0.7)],
		GeometryKind::TallCylinder => vec![(-0.5, -1.2), (0.5, -1.2), (0.5, 1.2), (-0.5, 1.2)],
		GeometryKind::Octahedron => vec![(0.0, -1.0), (0.7, 0.0), (0.0, 1.0), (-0.7, 0.0)],
		GeometryKind::Icosahedron => regular(6, -PI / 2.0),
		GeometryKind::Dodecahedron => regular(5, -PI / 2.0),
	}
}

fn draw_ground(camera: &OrbitCamera, viewport: &Viewport, ctx: &CanvasRenderingContext2d) {
	const EXTENT: f32 = 100.0;
	const STEP: f32 = 10.0;
	const FLOOR: f32 = -25.0;
	ctx.set_stroke_style_str("rgba(59, 130, 246, 0.08)");
	ctx.set_line_width(1.0);
	let mut offset = -EXTENT;
	while offset <= EXTENT {
		let lines = [
			(
				Vec3::new(-EXTENT, FLOOR, offset),
				Vec3::new(EXTENT, FLOOR, offset),
			),
			(
				Vec3::new(offset, FLOOR, -EXTENT),
				Vec3::new(offset, FLOOR, EXTENT),
			),
		];
		for (a, b) in lines {
			let (Some(pa), Some(pb)) = (camera.project(a, viewport), camera.project(b, viewport))
			else {
				continue;
			};
			ctx.begin_path();
			ctx.move_to(pa.x, pa.y);
			ctx.line_to(pb.x, pb.y);
			ctx.stroke();
		}
		offset += STEP;
	}
}

fn draw_edges(scene: &Scene, camera: &OrbitCamera, viewport: &Viewport, ctx: &CanvasRenderingContext2d) {
	for edge in scene.edges() {
		// Trailing run of visible points, for the arrowhead.
		let mut tail: Vec<(f64, f64)> = Vec::with_capacity(edge.points.len());
		ctx.begin_path();
		for point in &edge.points {
			match camera.project(*point, viewport) {
				Some(p) if !tail.is_empty() => {
					ctx.line_to(p.x, p.y);
					tail.push((p.x, p.y));
				}
				Some(p) => {
					ctx.move_to(p.x, p.y);
					tail.push((p.x, p.y));
				}
				None => tail.clear(),
			}
		}
		ctx.set_line_width(1.5);
		ctx.set_stroke_style_str(&edge.color.css_rgba(0.6));
		ctx.stroke();

		let inset = scene
			.node(&edge.to)
			.and_then(|v| {
				camera
					.project(v.position, viewport)
					.map(|p| NODE_SIZE * v.scale as f64 * p.pixels_per_unit * 0.8)
			})
			.unwrap_or(0.0);
		let Some([tip, left, right]) = arrow_head(&tail, inset, ARROW_SIZE) else {
			continue;
		};
		ctx.begin_path();
		ctx.move_to(tip.0, tip.1);
		ctx.line_to(left.0, left.1);
		ctx.line_to(right.0, right.1);
		ctx.close_path();
		ctx.set_fill_style_str(&edge.color.css_rgba(0.8));
		ctx.fill();
	}
}

/// Triangle pointing along the end of a screen polyline, its tip `inset` pixels back from
/// the last point. `None` when the polyline is shorter than `inset`.
pub fn arrow_head(points: &[(f64, f64)], inset: f64, size: f64) -> Option<[(f64, f64); 3]> {
	let mut remaining = inset;
	for pair in points.windows(2).rev() {
		let ((x1, y1), (x2, y2)) = (pair[0], pair[1]);
		let (dx, dy) = (x2 - x1, y2 - y1);
		let len = (dx * dx + dy * dy).sqrt();
		if len < 1e-9 {
			continue;
		}
		if len < remaining {
			remaining -= len;
			continue;
		}
		let (ux, uy) = (dx / len, dy / len);
		let (tip_x, tip_y) = (x2 - ux * remaining, y2 - uy * remaining);
		let (back_x, back_y) = (tip_x - ux * size, tip_y - uy * size);
		let (px, py) = (-uy * size * 0.5, ux * size * 0.5);
		return Some([
			(tip_x, tip_y),
			(back_x + px, back_y + py),
			(back_x - px, back_y - py),
		]);
	}
	None
}

fn draw_markers(editor: &SceneEditor, ctx: &CanvasRenderingContext2d) {
	let (camera, viewport) = (editor.camera(), editor.viewport());
	for marker in editor.flow().markers() {
		let Some(p) = camera.project(marker.position, viewport) else {
			continue;
		};
		let radius = (MARKER_SIZE * p.pixels_per_unit).max(2.0);
		let glow = radius * 2.5;
		if let Ok(gradient) = ctx.create_radial_gradient(p.x, p.y, radius * 0.5, p.x, p.y, glow) {
			let _ = gradient.add_color_stop(0.0, &marker.color.css_rgba(0.5));
			let _ = gradient.add_color_stop(1.0, &marker.color.css_rgba(0.0));
			ctx.begin_path();
			let _ = ctx.arc(p.x, p.y, glow, 0.0, TAU);
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
			ctx.fill();
		}
		ctx.begin_path();
		let _ = ctx.arc(p.x, p.y, radius, 0.0, TAU);
		ctx.set_fill_style_str(&marker.color.lighten(0.5).css_rgba(1.0));
		ctx.fill();
	}
}

fn draw_nodes(
	scene: &Scene,
	camera: &OrbitCamera,
	viewport: &Viewport,
	selected: Option<&str>,
	ctx: &CanvasRenderingContext2d,
) {
	for (visual, p) in draw_order(scene, camera, viewport) {
		let radius = NODE_SIZE * visual.scale as f64 * visual.pulse as f64 * p.pixels_per_unit;
		if radius < 0.5 {
			continue;
		}
		let hovered = scene.hovered() == Some(visual.node_id.as_str());
		let fill = if hovered {
			visual.color.lighten(0.3)
		} else {
			visual.color
		};

		ctx.begin_path();
		match visual.geometry {
			GeometryKind::Sphere => {
				let _ = ctx.arc(p.x, p.y, radius * 0.7, 0.0, TAU);
			}
			GeometryKind::Torus => {
				let _ = ctx.ellipse(p.x, p.y, radius * 0.9, radius * 0.45, 0.0, 0.0, TAU);
			}
			kind => {
				let outline = silhouette(kind, visual.rotation_y as f64);
				for (i, (ux, uy)) in outline.iter().enumerate() {
					let (x, y) = (p.x + ux * radius, p.y + uy * radius);
					if i == 0 {
						ctx.move_to(x, y);
					} else {
						ctx.line_to(x, y);
					}
				}
				ctx.close_path();
			}
		}
		ctx.set_fill_style_str(&fill.css_rgba(0.85));
		ctx.fill();
		ctx.set_stroke_style_str(&fill.lighten(0.4).css_rgba(1.0));
		ctx.set_line_width(1.0);
		ctx.stroke();

		if visual.geometry == GeometryKind::Torus {
			ctx.begin_path();
			let _ = ctx.ellipse(p.x, p.y, radius * 0.45, radius * 0.2, 0.0, 0.0, TAU);
			ctx.set_fill_style_str("rgba(0, 5, 16, 0.9)");
			ctx.fill();
		}

		if selected == Some(visual.node_id.as_str()) {
			ctx.begin_path();
			let _ = ctx.arc(p.x, p.y, radius * 1.4 + 4.0, 0.0, TAU);
			ctx.set_stroke_style_str("rgba(255, 255, 255, 0.9)");
			ctx.set_line_width(2.0);
			ctx.stroke();
		}
	}
}

fn draw_labels(editor: &SceneEditor, ctx: &CanvasRenderingContext2d) {
	let (scene, camera, viewport) = (editor.scene(), editor.camera(), editor.viewport());
	let offset = editor.config().label_offset;
	ctx.set_font("12px sans-serif");
	ctx.set_text_align("center");
	for visual in scene.nodes() {
		if visual.label.is_empty() {
			continue;
		}
		let Some(p) = camera.project(visual.label_anchor(offset), viewport) else {
			continue;
		};
		ctx.set_fill_style_str("rgba(255, 255, 255, 0.85)");
		let _ = ctx.fill_text(&visual.label, p.x, p.y);
	}
	ctx.set_text_align("start");
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::arch_scene::config::SceneConfig;
	use crate::components::arch_scene::graph::{GraphModel, NewNode};
	use crate::components::arch_scene::registry::TypeRegistry;

	#[test]
	fn test_draw_order_is_back_to_front() {
		let config = SceneConfig::default();
		let registry = TypeRegistry::new();
		let mut graph = GraphModel::new();
		let near = graph.add_node(&registry, NewNode::new("client", Vec3::new(0.0, 0.0, 40.0)));
		let far = graph.add_node(&registry, NewNode::new("client", Vec3::new(0.0, 0.0, -40.0)));
		let mut scene = Scene::new(&config);
		scene.sync(&graph, &registry);

		let order = draw_order(&scene, &OrbitCamera::new(&config), &Viewport::default());
		let ids: Vec<&str> = order.iter().map(|(v, _)| v.node_id.as_str()).collect();
		assert_eq!(ids, vec![far.as_str(), near.as_str()]);
		assert!(order[1].1.pixels_per_unit > order[0].1.pixels_per_unit);
	}

	#[test]
	fn test_arrow_head_sits_inset_from_the_end() {
		let line = [(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)];
		let [tip, left, right] = arrow_head(&line, 15.0, 4.0).unwrap();
		assert_eq!(tip, (5.0, 0.0));
		assert_eq!(left, (1.0, 2.0));
		assert_eq!(right, (1.0, -2.0));

		let bent = [(0.0, 0.0), (0.0, 10.0), (0.0, 10.0)];
		let [tip, ..] = arrow_head(&bent, 0.0, 4.0).unwrap();
		assert_eq!(tip, (0.0, 10.0));

		assert!(arrow_head(&line, 25.0, 4.0).is_none());
		assert!(arrow_head(&[(3.0, 3.0)], 0.0, 4.0).is_none());
	}

	#[test]
	fn test_silhouettes() {
		assert!(silhouette(GeometryKind::Sphere, 0.0).is_empty());
		assert_eq!(silhouette(GeometryKind::Dodecahedron, 0.0).len(), 5);
		let top = silhouette(GeometryKind::Dodecahedron, 0.0)[0];
		assert!(top.0.abs() < 1e-9 && (top.1 + 1.0).abs() < 1e-9);
		for (x, y) in silhouette(GeometryKind::Box, 1.0) {
			assert!(((x * x + y * y).sqrt() - 1.0).abs() < 1e-9);
		}
	}
}
