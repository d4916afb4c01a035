use std::collections::{BTreeMap, BTreeSet};

use arch_scene_editor::components::arch_scene::camera::Viewport;
use arch_scene_editor::components::arch_scene::document::{NodeRecord, to_records};
use arch_scene_editor::components::arch_scene::graph::NewNode;
use arch_scene_editor::components::arch_scene::registry::{AllowedConnections, GeometryKind, TypePatch};
use arch_scene_editor::components::arch_scene::{
	ConnectionRejected, EditorError, FrameTask, SceneConfig, SceneEditor,
};
use glam::Vec3;

fn editor() -> SceneEditor {
	let mut ed = SceneEditor::with_seed(SceneConfig::default(), 11);
	ed.initialize(Viewport::default());
	ed
}

fn default_editor() -> SceneEditor {
	let mut ed = editor();
	ed.load_default_graph();
	ed
}

fn edge_set(ed: &SceneEditor) -> BTreeSet<(String, String)> {
	ed.graph()
		.connections()
		.map(|(a, b)| (a.to_string(), b.to_string()))
		.collect()
}

/// Records keyed by id, with `connectedTo` compared as a set.
fn canonical(records: Vec<NodeRecord>) -> BTreeMap<String, (NodeRecord, BTreeSet<String>)> {
	records
		.into_iter()
		.map(|mut r| {
			let targets = std::mem::take(&mut r.connected_to).into_iter().collect();
			(r.id.clone(), (r, targets))
		})
		.collect()
}

#[test]
fn deleting_any_node_leaves_no_reference_to_it() {
	let ids: Vec<String> = default_editor().nodes().map(|n| n.id.clone()).collect();
	for id in ids {
		let mut ed = default_editor();
		assert!(ed.delete_node(&id));
		assert!(ed.nodes().all(|n| !n.outgoing.contains(&id)));
		assert!(ed.scene().edges().all(|e| e.from != id && e.to != id));
		assert!(ed.scene().node(&id).is_none());
	}
}

#[test]
fn repeated_connect_keeps_one_edge() {
	let mut ed = editor();
	let a = ed.add_node(NewNode::new("gateway", Vec3::ZERO));
	let b = ed.add_node(NewNode::new("host", Vec3::X * 10.0));
	assert!(ed.connect(&a, &b).is_ok());
	assert_eq!(
		ed.connect(&a, &b),
		Err(ConnectionRejected::AlreadyConnected {
			from: a.clone(),
			to: b.clone()
		})
	);
	assert_eq!(ed.graph().connection_count(), 1);
	assert_eq!(ed.scene().edge_count(), 1);
}

#[test]
fn disallowed_connection_changes_nothing() {
	let mut ed = editor();
	let db = ed.add_node(NewNode::new("database", Vec3::ZERO));
	let client = ed.add_node(NewNode::new("client", Vec3::X * 10.0));
	let rev = ed.revision();

	assert!(matches!(
		ed.connect(&db, &client),
		Err(ConnectionRejected::NotAllowed { .. })
	));
	assert!(matches!(
		ed.connect(&client, &db),
		Err(ConnectionRejected::NotAllowed { .. })
	));
	assert_eq!(ed.graph().len(), 2);
	assert_eq!(ed.graph().connection_count(), 0);
	assert_eq!(ed.revision(), rev);
}

#[test]
fn export_clear_import_reproduces_the_graph() {
	let mut ed = default_editor();
	let before = canonical(to_records(ed.graph()));
	let edges = edge_set(&ed);
	let json = ed.export_json().unwrap();

	ed.clear_graph();
	assert!(ed.graph().is_empty());
	assert_eq!(ed.import_json(&json).unwrap(), before.len());

	assert_eq!(canonical(to_records(ed.graph())), before);
	assert_eq!(edge_set(&ed), edges);
	assert_eq!(ed.scene().node_count(), before.len());
	assert_eq!(ed.scene().edge_count(), edges.len());
}

#[test]
fn derived_type_is_unique_and_inherits_behavior() {
	let mut ed = editor();
	let parent = ed.registry().find("broker").unwrap().clone();
	let derived = ed.registry().derive_from(&parent.id, "Foo").unwrap();

	assert!(ed.registry().slugs().all(|s| s != derived.type_slug));
	assert_ne!(derived.id, parent.id);
	assert!(!derived.is_system);
	assert_eq!(derived.parent_type_id.as_deref(), Some(parent.id.as_str()));
	assert_eq!(derived.geometry, parent.geometry);
	assert_eq!(derived.base_color, parent.base_color);
	assert_eq!(derived.scale, parent.scale);
	assert_eq!(derived.allowed_connections, parent.allowed_connections);

	assert!(ed.registry_mut().add(derived.clone()));
	let again = ed.registry().derive_from(&parent.id, "Foo").unwrap();
	assert_ne!(again.type_slug, derived.type_slug);
}

#[test]
fn system_types_cannot_be_deleted_or_edited() {
	let mut ed = editor();
	let before = ed.registry().all().to_vec();
	let gateway = ed.registry().find("gateway").unwrap().id.clone();

	assert!(!ed.registry_mut().delete(&gateway));
	assert!(!ed.registry_mut().update(
		&gateway,
		TypePatch {
			geometry: Some(GeometryKind::Torus),
			..Default::default()
		}
	));
	assert_eq!(ed.registry().all(), before.as_slice());
}

#[test]
fn open_type_connects_to_sink_and_survives_round_trip() {
	let mut ed = editor();
	let internal = ed.registry().find("internal").unwrap().id.clone();
	let open = ed.registry().derive_from(&internal, "Open").unwrap();
	assert!(ed.registry_mut().add(open.clone()));
	assert!(ed.registry_mut().update(
		&open.id,
		TypePatch {
			allowed_connections: Some(AllowedConnections::All),
			..Default::default()
		}
	));

	let a = ed.add_node(NewNode::new(open.type_slug.clone(), Vec3::ZERO));
	let b = ed.add_node(NewNode::new("external", Vec3::X * 10.0));
	assert!(ed.connect(&b, &a).is_err());
	assert!(ed.connect(&a, &b).is_ok());
	let json = ed.export_json().unwrap();

	let mut fresh = editor();
	let registered = ed.registry().find(&open.type_slug).unwrap().clone();
	assert!(fresh.registry_mut().add(registered));
	fresh.import_json(&json).unwrap();
	assert_eq!(
		edge_set(&fresh),
		BTreeSet::from([(a.clone(), b.clone())])
	);
}

#[test]
fn deleting_a_middle_node_drops_both_edges() {
	let mut ed = editor();
	let client = ed.add_node(NewNode::new("client", Vec3::new(-20.0, 0.0, 0.0)));
	let proxy = ed.add_node(NewNode::new("proxy", Vec3::ZERO));
	let gateway = ed.add_node(NewNode::new("gateway", Vec3::new(20.0, 0.0, 0.0)));
	ed.connect(&client, &proxy).unwrap();
	ed.connect(&proxy, &gateway).unwrap();

	assert!(ed.delete_node(&proxy));
	assert_eq!(ed.graph().len(), 2);
	assert_eq!(ed.graph().connection_count(), 0);
	assert_eq!(ed.scene().edge_count(), 0);
	assert!(!ed.delete_node(&proxy));
}

#[test]
fn simulation_off_leaves_no_markers_and_returns_the_camera() {
	let config = SceneConfig {
		spawn_probability: 1.0,
		..Default::default()
	};
	let mut ed = SceneEditor::with_seed(config, 5);
	ed.initialize(Viewport::default());
	ed.load_default_graph();
	let start = ed.camera().position();

	ed.toggle_simulation(true);
	assert!(!ed.camera().controls_enabled);
	for _ in 0..30 {
		ed.tick(0.016);
	}
	assert!(!ed.flow().markers().is_empty());
	assert!((ed.camera().position() - start).length() > 0.1);

	ed.toggle_simulation(false);
	assert!(ed.flow().markers().is_empty());
	assert!(ed.camera().controls_enabled);
	let parked = ed.camera().position();
	for _ in 0..10 {
		ed.tick(0.016);
	}
	assert_eq!(ed.camera().position(), parked);
	ed.wheel(1.0);
	assert!(ed.camera().distance() > (parked - ed.camera().target).length());
}

#[test]
fn malformed_import_leaves_an_empty_diagram() {
	let mut ed = default_editor();
	let err = ed.import_json("not json").unwrap_err();
	assert!(matches!(err, EditorError::MalformedDocument(_)));
	assert!(ed.graph().is_empty());
	assert_eq!(ed.scene().node_count(), 0);
}

#[test]
fn deleted_custom_type_falls_back_without_severing_edges() {
	let mut ed = editor();
	let gateway = ed.registry().find("gateway").unwrap().id.clone();
	let custom = ed.registry().derive_from(&gateway, "Edge Gateway").unwrap();
	ed.registry_mut().add(custom.clone());

	let a = ed.add_node(NewNode::new(custom.type_slug.clone(), Vec3::ZERO));
	let b = ed.add_node(NewNode::new("host", Vec3::X * 10.0));
	ed.connect(&a, &b).unwrap();

	assert!(ed.registry_mut().delete(&custom.id));
	ed.tick(0.016);
	assert!(ed.graph().is_connected(&a, &b));
	assert_eq!(ed.graph().node(&a).unwrap().type_slug, custom.type_slug);
	let fallback = ed.registry().fallback().geometry;
	assert_eq!(ed.scene().node(&a).unwrap().geometry, fallback);
}

#[test]
fn orphaned_target_accepts_what_the_fallback_accepts() {
	let mut ed = editor();
	let internal = ed.registry().find("internal").unwrap().id.clone();
	let worker = ed.registry().derive_from(&internal, "Worker").unwrap();
	ed.registry_mut().add(worker.clone());

	let gateway = ed.add_node(NewNode::new("gateway", Vec3::ZERO));
	let node = ed.add_node(NewNode::new(worker.type_slug.clone(), Vec3::X * 10.0));
	assert!(ed.registry_mut().delete(&worker.id));

	assert!(ed.connect(&gateway, &node).is_ok());
	assert!(ed.graph().is_connected(&gateway, &node));
	assert_eq!(ed.scene().edge_count(), 1);
}
