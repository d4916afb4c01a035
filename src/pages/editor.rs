use leptos::prelude::*;

use crate::components::arch_scene::{
	ArchSceneCanvas, DocumentPanel, Inspector, Palette, SceneConfig, SceneEditor, Toolbar,
	TypeEditor,
};

/// Editor page: the scene fills the window, panels float over it.
#[component]
pub fn Editor() -> impl IntoView {
	let mut scene_editor = SceneEditor::new(SceneConfig::default());
	scene_editor.load_default_graph();
	let editor = StoredValue::new_local(scene_editor);
	let changed = RwSignal::new(0u64);
	let placing = RwSignal::new(None::<String>);

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-scene">
				<ArchSceneCanvas editor=editor changed=changed placing=placing fullscreen=true />
				<div class="scene-overlay">
					<h1>"Architecture Scene"</h1>
					<p class="subtitle">
						"Drag to orbit, right-drag to pan, scroll to zoom. Switch to Edit to move nodes."
					</p>
					<Toolbar editor=editor changed=changed />
				</div>
				<aside class="side-panels left">
					<Palette editor=editor changed=changed placing=placing />
					<TypeEditor editor=editor changed=changed />
				</aside>
				<aside class="side-panels right">
					<Inspector editor=editor changed=changed />
					<DocumentPanel editor=editor changed=changed />
				</aside>
			</div>
		</ErrorBoundary>
	}
}
