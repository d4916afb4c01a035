use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::warn;
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, TouchEvent, WheelEvent, Window,
};

use super::camera::Viewport;
use super::editor::{FrameTask, SceneEditor};
use super::graph::NewNode;
use super::interaction::{InteractionEvent, InteractionMode, PointerButton};
use super::render;

/// Longest frame step fed to the engine, so a backgrounded tab does not jump on return.
const MAX_FRAME_SECS: f64 = 0.1;

/// Canvas viewport onto a [`SceneEditor`].
///
/// `changed` is bumped whenever the diagram or the selection changes so panels can
/// re-read the editor. While `placing` holds a type slug, a right click drops a node of
/// that type on the ground under the cursor.
#[component]
pub fn ArchSceneCanvas(
	editor: StoredValue<SceneEditor, LocalStorage>,
	changed: RwSignal<u64>,
	placing: RwSignal<Option<String>>,
	#[prop(default = false)] fullscreen: bool,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (animate_init, resize_cb_init) = (animate.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let (w, h) = if fullscreen {
			window_size(&window)
		} else {
			canvas
				.parent_element()
				.map(|p| (p.client_width() as f64, p.client_height() as f64))
				.unwrap_or((800.0, 600.0))
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx = match canvas.get_context("2d") {
			Ok(Some(ctx)) => ctx,
			_ => {
				warn!("Canvas 2D context unavailable");
				return;
			}
		};
		let Ok(ctx) = ctx.dyn_into::<CanvasRenderingContext2d>() else {
			return;
		};
		editor.update_value(|ed| {
			ed.initialize(Viewport {
				width: w,
				height: h,
			})
		});
		changed.update(|n| *n += 1);

		if fullscreen {
			let canvas_resize = canvas.clone();
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let (nw, nh) = window_size(&win);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				editor.try_update_value(|ed| ed.resize(nw, nh));
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let animate_inner = animate_init.clone();
		let last_frame = Cell::new(js_sys::Date::now());
		let last_revision = Cell::new(0u64);
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let now = js_sys::Date::now();
			let dt = ((now - last_frame.replace(now)) / 1000.0).clamp(0.0, MAX_FRAME_SECS);

			let frame = editor.try_update_value(|ed| {
				if !ed.is_running() {
					return None;
				}
				ed.tick(dt);
				render::render(ed, &ctx);
				let notable = ed
					.take_events()
					.iter()
					.any(|e| !matches!(e, InteractionEvent::Hover(_)));
				Some((ed.revision(), notable))
			});
			// Disposed or unmounted: stop scheduling frames.
			let Some(Some((revision, notable))) = frame else {
				return;
			};
			if notable || last_revision.replace(revision) != revision {
				changed.update(|n| *n += 1);
			}

			if let Some(ref cb) = *animate_inner.borrow() {
				if let Some(win) = web_sys::window() {
					let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
				}
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	on_cleanup(move || {
		editor.try_update_value(|ed| ed.dispose());
	});

	let to_canvas = move |client_x: i32, client_y: i32| -> Option<(f64, f64)> {
		let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?.into();
		let rect = canvas.get_bounding_client_rect();
		Some((
			client_x as f64 - rect.left(),
			client_y as f64 - rect.top(),
		))
	};
	let canvas_point = move |ev: &MouseEvent| to_canvas(ev.client_x(), ev.client_y());
	let touch_point = move |ev: &TouchEvent| {
		let touch = ev.touches().get(0)?;
		to_canvas(touch.client_x(), touch.client_y())
	};
	let set_cursor = move |pressed: bool| {
		let Some(canvas) = canvas_ref.get_untracked() else {
			return;
		};
		let cursor = editor
			.try_with_value(|ed| cursor_for(ed, pressed))
			.unwrap_or("default");
		let _ = web_sys::HtmlElement::style(&canvas).set_property("cursor", cursor);
	};

	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(&ev) else {
			return;
		};
		let button = PointerButton::from_dom(ev.button());
		editor.update_value(|ed| ed.pointer_down(button, x, y));
		set_cursor(true);
	};

	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(&ev) else {
			return;
		};
		editor.update_value(|ed| ed.pointer_move(x, y));
		set_cursor(ev.buttons() != 0);
	};

	let on_mouseup = move |_: MouseEvent| {
		editor.update_value(|ed| ed.pointer_up());
		set_cursor(false);
	};

	let on_mouseleave = move |_: MouseEvent| {
		editor.update_value(|ed| ed.pointer_leave());
	};

	let on_touchstart = move |ev: TouchEvent| {
		let Some((x, y)) = touch_point(&ev) else {
			return;
		};
		ev.prevent_default();
		editor.update_value(|ed| ed.pointer_down(PointerButton::Primary, x, y));
	};

	let on_touchmove = move |ev: TouchEvent| {
		let Some((x, y)) = touch_point(&ev) else {
			return;
		};
		ev.prevent_default();
		editor.update_value(|ed| ed.pointer_move(x, y));
	};

	let on_touchend = move |_: TouchEvent| {
		editor.update_value(|ed| ed.pointer_up());
	};

	let on_dblclick = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(&ev) else {
			return;
		};
		editor.update_value(|ed| ed.double_click(x, y));
	};

	let on_contextmenu = move |ev: MouseEvent| {
		ev.prevent_default();
		let Some(slug) = placing.get_untracked() else {
			return;
		};
		let Some((x, y)) = canvas_point(&ev) else {
			return;
		};
		editor.update_value(|ed| {
			let at = ed.world_at(x, y);
			let id = ed.add_node(NewNode::new(slug, at));
			ed.select_node(&id);
		});
		placing.set(None);
	};

	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		editor.update_value(|ed| ed.wheel(ev.delta_y()));
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="arch-scene-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:dblclick=on_dblclick
			on:contextmenu=on_contextmenu
			on:wheel=on_wheel
			on:touchstart=on_touchstart
			on:touchmove=on_touchmove
			on:touchend=on_touchend
			style="display: block; cursor: grab; touch-action: none;"
		/>
	}
}

fn cursor_for(editor: &SceneEditor, pressed: bool) -> &'static str {
	let over_node = editor.scene().hovered().is_some();
	match editor.mode() {
		InteractionMode::Edit if pressed && editor.is_dragging() => "grabbing",
		InteractionMode::Edit => "crosshair",
		InteractionMode::Camera if pressed => "grabbing",
		InteractionMode::Camera if over_node => "pointer",
		InteractionMode::Camera => "grab",
	}
}

fn window_size(window: &Window) -> (f64, f64) {
	let dim = |v: std::result::Result<JsValue, JsValue>, fallback: f64| {
		v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback)
	};
	(
		dim(window.inner_width(), 800.0),
		dim(window.inner_height(), 600.0),
	)
}
