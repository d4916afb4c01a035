//! Side panels around the canvas.
//!
//! Panels never hold engine state of their own. Each one re-reads the [`SceneEditor`]
//! whenever `changed` ticks and routes every edit through the editor's operations.

use leptos::prelude::*;

use super::editor::SceneEditor;
use super::error::EditorError;
use super::graph::NodePatch;
use super::interaction::InteractionMode;
use super::registry::{AllowedConnections, ComponentType, GeometryKind, TypePatch};
use super::types::Color;

type EditorHandle = StoredValue<SceneEditor, LocalStorage>;

/// Runs `f` against the editor and tells every panel to refresh.
fn mutate<R>(
	editor: EditorHandle,
	changed: RwSignal<u64>,
	f: impl FnOnce(&mut SceneEditor) -> R,
) -> Option<R> {
	let out = editor.try_update_value(f);
	changed.update(|n| *n += 1);
	out
}

/// Tracked read of the editor.
fn read<R: Default>(
	editor: EditorHandle,
	changed: RwSignal<u64>,
	f: impl FnOnce(&SceneEditor) -> R,
) -> R {
	changed.track();
	editor.try_with_value(f).unwrap_or_default()
}

#[component]
pub fn Toolbar(editor: EditorHandle, changed: RwSignal<u64>) -> impl IntoView {
	let in_mode = move |mode: InteractionMode| read(editor, changed, move |ed| ed.mode() == mode);

	view! {
		<div class="panel toolbar">
			<div class="mode-switch">
				<button
					class:active=move || in_mode(InteractionMode::Camera)
					on:click=move |_| {
						mutate(editor, changed, |ed| ed.set_mode(InteractionMode::Camera));
					}
				>
					"Camera"
				</button>
				<button
					class:active=move || in_mode(InteractionMode::Edit)
					on:click=move |_| {
						mutate(editor, changed, |ed| ed.set_mode(InteractionMode::Edit));
					}
				>
					"Edit"
				</button>
			</div>
			<label>
				<input
					type="checkbox"
					prop:checked=move || read(editor, changed, |ed| ed.flow().is_active())
					on:change=move |ev| {
						let on = event_target_checked(&ev);
						mutate(editor, changed, |ed| ed.toggle_simulation(on));
					}
				/>
				"Simulate traffic"
			</label>
			<label>
				<input
					type="checkbox"
					prop:checked=move || read(editor, changed, |ed| ed.flow().is_paused())
					on:change=move |ev| {
						let paused = event_target_checked(&ev);
						mutate(editor, changed, |ed| ed.set_pulses_paused(paused));
					}
				/>
				"Pause pulses"
			</label>
			<button on:click=move |_| {
				mutate(editor, changed, |ed| ed.reset_camera());
			}>"Reset camera"</button>
			<button on:click=move |_| {
				mutate(editor, changed, |ed| ed.clear_graph());
			}>"Clear"</button>
			<button on:click=move |_| {
				mutate(editor, changed, |ed| ed.load_default_graph());
			}>"Default diagram"</button>
		</div>
	}
}

/// Type palette. Picking an entry arms it for placement on the canvas.
#[component]
pub fn Palette(
	editor: EditorHandle,
	changed: RwSignal<u64>,
	placing: RwSignal<Option<String>>,
) -> impl IntoView {
	let entries = move || {
		read(editor, changed, |ed| {
			ed.registry()
				.all()
				.iter()
				.map(|t| {
					(
						t.type_slug.clone(),
						t.label.clone(),
						t.base_color.to_hex_string(),
						t.geometry.as_str(),
					)
				})
				.collect::<Vec<_>>()
		})
	};

	view! {
		<div class="panel palette">
			<h2>"Components"</h2>
			<ul>
				{move || {
					entries()
						.into_iter()
						.map(|(slug, label, color, geometry)| {
							let armed_slug = slug.clone();
							let armed = move || placing.get().as_deref() == Some(armed_slug.as_str());
							let toggle = move |_| {
								placing.update(|p| {
									*p = if p.as_deref() == Some(slug.as_str()) {
										None
									} else {
										Some(slug.clone())
									};
								});
							};
							view! {
								<li class:armed=armed on:click=toggle>
									<span class="swatch" style={format!("background: {color}")}></span>
									{label}
									<small>{geometry}</small>
								</li>
							}
						})
						.collect_view()
				}}
			</ul>
			<p class="hint">
				{move || {
					placing
						.get()
						.map(|slug| format!("Right-click the scene to place a {slug} node"))
						.unwrap_or_default()
				}}
			</p>
		</div>
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Selection {
	id: String,
	label: String,
	type_label: String,
	description: String,
	color: String,
	outgoing: Vec<(String, String)>,
	inbound: Vec<(String, String)>,
	/// Nodes this one may still connect to.
	candidates: Vec<(String, String)>,
}

fn selection(ed: &SceneEditor) -> Option<Selection> {
	let node = ed.selected_node()?;
	let graph = ed.graph();
	let label_of = |id: &str| {
		graph
			.node(id)
			.map(|n| n.label.clone())
			.filter(|l| !l.is_empty())
			.unwrap_or_else(|| id.to_string())
	};
	let candidates = graph
		.nodes()
		.filter(|other| {
			other.id != node.id
				&& !node.outgoing.contains(&other.id)
				&& ed.registry().permits(&node.type_slug, &other.type_slug)
		})
		.map(|other| (other.id.clone(), label_of(&other.id)))
		.collect();
	Some(Selection {
		id: node.id.clone(),
		label: node.label.clone(),
		type_label: ed.registry().get(&node.type_slug).label.clone(),
		description: node.description.clone(),
		color: node.color.to_hex_string(),
		outgoing: node
			.outgoing
			.iter()
			.map(|id| (id.clone(), label_of(id)))
			.collect(),
		inbound: graph
			.inbound(&node.id)
			.into_iter()
			.map(|id| {
				let label = label_of(&id);
				(id, label)
			})
			.collect(),
		candidates,
	})
}

/// Edits the selected node and its outgoing connections.
#[component]
pub fn Inspector(editor: EditorHandle, changed: RwSignal<u64>) -> impl IntoView {
	let target = RwSignal::new(String::new());
	let feedback = RwSignal::new(String::new());
	let current = Memo::new(move |_| read(editor, changed, selection));

	let patch = move |id: String, patch: NodePatch| {
		mutate(editor, changed, |ed| ed.update_node(&id, patch));
	};

	let body = move || {
		let Some(sel) = current.get() else {
			return view! { <p class="hint">"Select a node to inspect it."</p> }.into_any();
		};
		let (id_label, id_desc, id_color, id_delete, id_connect) = (
			sel.id.clone(),
			sel.id.clone(),
			sel.id.clone(),
			sel.id.clone(),
			sel.id.clone(),
		);

		let outgoing = sel
			.outgoing
			.iter()
			.map(|(to, label)| {
				let (from, to) = (sel.id.clone(), to.clone());
				view! {
					<li>
						"→ "
						{label.clone()}
						<button on:click=move |_| {
							mutate(editor, changed, |ed| ed.disconnect(&from, &to));
						}>"×"</button>
					</li>
				}
			})
			.collect_view();
		let inbound = sel
			.inbound
			.iter()
			.map(|(_, label)| view! { <li>"← " {label.clone()}</li> })
			.collect_view();
		let options = sel
			.candidates
			.iter()
			.map(|(id, label)| view! { <option value={id.clone()}>{label.clone()}</option> })
			.collect_view();

		view! {
			<div class="inspector-body">
				<p class="type-label">{sel.type_label.clone()}</p>
				<label>
					"Label"
					<input
						type="text"
						prop:value={sel.label.clone()}
						on:change=move |ev| {
							patch(
								id_label.clone(),
								NodePatch {
									label: Some(event_target_value(&ev)),
									..Default::default()
								},
							);
						}
					/>
				</label>
				<label>
					"Description"
					<textarea
						prop:value={sel.description.clone()}
						on:change=move |ev| {
							patch(
								id_desc.clone(),
								NodePatch {
									description: Some(event_target_value(&ev)),
									..Default::default()
								},
							);
						}
					></textarea>
				</label>
				<label>
					"Color"
					<input
						type="color"
						prop:value={sel.color.clone()}
						on:change=move |ev| {
							if let Some(color) = Color::parse(&event_target_value(&ev)) {
								patch(
									id_color.clone(),
									NodePatch {
										color: Some(color),
										..Default::default()
									},
								);
							}
						}
					/>
				</label>
				<h3>"Connections"</h3>
				<ul class="connections">{outgoing} {inbound}</ul>
				<div class="connect">
					<select on:change=move |ev| target.set(event_target_value(&ev))>
						<option value="">"Connect to…"</option>
						{options}
					</select>
					<button on:click=move |_| {
						let to = target.get_untracked();
						let result = mutate(editor, changed, |ed| ed.connect(&id_connect, &to));
						match result {
							Some(Err(reason)) => feedback.set(reason.to_string()),
							_ => feedback.set(String::new()),
						}
						target.set(String::new());
					}>"Connect"</button>
				</div>
				<p class="feedback">{move || feedback.get()}</p>
				<button class="danger" on:click=move |_| {
					mutate(editor, changed, |ed| ed.delete_node(&id_delete));
				}>"Delete node"</button>
			</div>
		}
			.into_any()
	};

	view! {
		<div class="panel inspector">
			<h2>"Inspector"</h2>
			{body}
		</div>
	}
}

/// Derives custom types from existing ones and edits or deletes them.
#[component]
pub fn TypeEditor(editor: EditorHandle, changed: RwSignal<u64>) -> impl IntoView {
	let parent = RwSignal::new(String::from("sys-internal"));
	let label = RwSignal::new(String::new());
	let feedback = RwSignal::new(String::new());

	let parents = move || {
		read(editor, changed, |ed| {
			ed.registry()
				.all()
				.iter()
				.map(|t| (t.id.clone(), t.label.clone()))
				.collect::<Vec<_>>()
		})
	};
	let customs = move || {
		read(editor, changed, |ed| {
			let registry = ed.registry();
			let targets: Vec<(String, String)> = registry
				.all()
				.iter()
				.map(|t| (t.type_slug.clone(), t.label.clone()))
				.collect();
			(registry.custom_types().cloned().collect::<Vec<_>>(), targets)
		})
	};

	let derive = move |_| {
		let name = label.get_untracked();
		if name.trim().is_empty() {
			feedback.set("Name the new type first".into());
			return;
		}
		let parent_id = parent.get_untracked();
		let result = mutate(editor, changed, |ed| {
			let ty = ed.registry().derive_from(&parent_id, name.trim())?;
			let slug = ty.type_slug.clone();
			ed.registry_mut().add(ty);
			Ok::<_, EditorError>(slug)
		});
		match result {
			Some(Ok(slug)) => {
				feedback.set(format!("Registered {slug}"));
				label.set(String::new());
			}
			Some(Err(err)) => feedback.set(err.to_string()),
			None => {}
		}
	};

	view! {
		<div class="panel type-editor">
			<h2>"Custom types"</h2>
			<div class="derive">
				<select on:change=move |ev| parent.set(event_target_value(&ev))>
					{move || {
						parents()
							.into_iter()
							.map(|(id, name)| {
								let selected = parent.get_untracked() == id;
								view! {
									<option value={id.clone()} selected=selected>
										{name}
									</option>
								}
							})
							.collect_view()
					}}
				</select>
				<input
					type="text"
					placeholder="New type name"
					prop:value=move || label.get()
					on:input=move |ev| label.set(event_target_value(&ev))
				/>
				<button on:click=derive>"Derive"</button>
			</div>
			<p class="feedback">{move || feedback.get()}</p>
			<ul>
				{move || {
					let (types, targets) = customs();
					types
						.into_iter()
						.map(|ty| {
							view! {
								<CustomTypeRow editor=editor changed=changed ty=ty targets=targets.clone() />
							}
						})
						.collect_view()
				}}
			</ul>
		</div>
	}
}

/// Editable fields of one custom type.
#[component]
fn CustomTypeRow(
	editor: EditorHandle,
	changed: RwSignal<u64>,
	ty: ComponentType,
	/// Every registered `(slug, label)`, offered as connection targets.
	targets: Vec<(String, String)>,
) -> impl IntoView {
	let id = StoredValue::new(ty.id.clone());
	let allowed = StoredValue::new(ty.allowed_connections.clone());
	let apply = move |patch: TypePatch| {
		mutate(editor, changed, |ed| ed.registry_mut().update(&id.get_value(), patch));
	};
	let text_patch = move |ev: &leptos::ev::Event, field: fn(String) -> TypePatch| {
		let value = event_target_value(ev);
		if !value.trim().is_empty() {
			apply(field(value.trim().to_string()));
		}
	};

	let open = ty.allowed_connections == AllowedConnections::All;
	let shapes = GeometryKind::ALL
		.into_iter()
		.map(|g| {
			view! {
				<option value={g.as_str()} selected={g == ty.geometry}>
					{g.as_str()}
				</option>
			}
		})
		.collect_view();
	let checks = targets
		.into_iter()
		.map(|(slug, name)| {
			let checked = ty.allowed_connections.permits(&slug);
			view! {
				<label class="target">
					<input
						type="checkbox"
						prop:checked=checked
						disabled=open
						on:change=move |ev| {
							let next = allowed.get_value().with_target(&slug, event_target_checked(&ev));
							apply(TypePatch {
								allowed_connections: Some(next),
								..Default::default()
							});
						}
					/>
					{name}
				</label>
			}
		})
		.collect_view();

	view! {
		<li class="custom-type">
			<div class="field">
				<label>"Label"</label>
				<input
					type="text"
					prop:value=ty.label
					on:change=move |ev| {
						text_patch(
							&ev,
							|v| TypePatch {
								label: Some(v),
								..Default::default()
							},
						)
					}
				/>
			</div>
			<div class="field">
				<label>"Category"</label>
				<input
					type="text"
					prop:value=ty.category
					on:change=move |ev| {
						text_patch(
							&ev,
							|v| TypePatch {
								category: Some(v),
								..Default::default()
							},
						)
					}
				/>
			</div>
			<div class="field">
				<label>"Description"</label>
				<textarea
					prop:value=ty.description
					on:change=move |ev| {
						apply(TypePatch {
							description: Some(event_target_value(&ev)),
							..Default::default()
						});
					}
				/>
			</div>
			<div class="field">
				<select on:change=move |ev| {
					if let Some(g) = GeometryKind::parse(&event_target_value(&ev)) {
						apply(TypePatch {
							geometry: Some(g),
							..Default::default()
						});
					}
				}>{shapes}</select>
				<input
					type="color"
					prop:value=ty.base_color.to_hex_string()
					on:change=move |ev| {
						if let Some(c) = Color::parse(&event_target_value(&ev)) {
							apply(TypePatch {
								base_color: Some(c),
								..Default::default()
							});
						}
					}
				/>
				<input
					type="number"
					min="0.1"
					step="0.1"
					prop:value=ty.scale.to_string()
					on:change=move |ev| {
						match event_target_value(&ev).parse::<f32>() {
							Ok(scale) if scale.is_finite() && scale > 0.0 => {
								apply(TypePatch {
									scale: Some(scale),
									..Default::default()
								});
							}
							_ => {}
						}
					}
				/>
			</div>
			<div class="field connects">
				<label>
					<input
						type="checkbox"
						prop:checked=open
						on:change=move |ev| {
							let next = if event_target_checked(&ev) {
								AllowedConnections::All
							} else {
								AllowedConnections::none()
							};
							apply(TypePatch {
								allowed_connections: Some(next),
								..Default::default()
							});
						}
					/>
					"Connects to anything"
				</label>
				{checks}
			</div>
			<button on:click=move |_| {
				mutate(editor, changed, |ed| ed.registry_mut().delete(&id.get_value()));
			}>"Delete type"</button>
		</li>
	}
}

/// JSON export and import through a text area.
#[component]
pub fn DocumentPanel(editor: EditorHandle, changed: RwSignal<u64>) -> impl IntoView {
	let text = RwSignal::new(String::new());
	let status = RwSignal::new(String::new());

	let export = move |_| {
		match editor.try_with_value(|ed| ed.export_json()) {
			Some(Ok(json)) => {
				text.set(json);
				status.set(String::new());
			}
			Some(Err(err)) => status.set(err.to_string()),
			None => {}
		}
	};
	let import = move |_| {
		let json = text.get_untracked();
		match mutate(editor, changed, |ed| ed.import_json(&json)) {
			Some(Ok(count)) => status.set(format!("Imported {count} nodes")),
			Some(Err(err)) => status.set(err.to_string()),
			None => {}
		}
	};

	view! {
		<div class="panel document">
			<h2>"Diagram JSON"</h2>
			<textarea
				rows="10"
				prop:value=move || text.get()
				on:input=move |ev| text.set(event_target_value(&ev))
			></textarea>
			<div class="actions">
				<button on:click=export>"Export"</button>
				<button on:click=import>"Import"</button>
			</div>
			<p class="feedback">{move || status.get()}</p>
		</div>
	}
}
