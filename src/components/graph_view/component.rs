use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::ev;
use leptos::prelude::*;
use log::debug;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlElement, KeyboardEvent, Window};

use super::bridge::{InteractionBridge, KeyPress, PANEL_PROMPT, toggle_label};
use super::canvas::CanvasBackend;
use super::config::ViewerConfig;
use super::fetch::HttpFetcher;
use super::frame_loop::{FrameLoop, StepDriver};
use super::session::{DriverFactory, LoadRequest, Orchestrator, StatusSinks, load};
use super::surface::{RenderManager, Viewport};

type Viewer = Rc<RefCell<Orchestrator<CanvasBackend>>>;

fn window_viewport(window: &Window, side_panel: f64) -> Viewport {
	let size = |value: Result<JsValue, JsValue>| value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
	Viewport::from_window(size(window.inner_width()), size(window.inner_height()), side_panel)
}

fn key_press(ev: &KeyboardEvent) -> KeyPress {
	let target = ev.target().and_then(|t| t.dyn_into::<HtmlElement>().ok());
	KeyPress {
		key: ev.key(),
		repeat: ev.repeat(),
		modified: ev.ctrl_key() || ev.meta_key() || ev.alt_key(),
		target_tag: target.as_ref().map(|el| el.tag_name()),
		content_editable: target.is_some_and(|el| el.is_content_editable()),
	}
}

/// Removes the window listeners when the current reactive owner is cleaned up.
fn hold_until_cleanup(handles: Vec<WindowListenerHandle>) {
	on_cleanup(move || handles.into_iter().for_each(WindowListenerHandle::remove));
}

fn spawn_load(viewer: &Viewer, request: LoadRequest) {
	let viewer = viewer.clone();
	wasm_bindgen_futures::spawn_local(async move {
		// Failures are already reported to the page by the orchestrator.
		if let Ok(outcome) = load(&viewer, &HttpFetcher, request).await {
			debug!("Load outcome: {outcome:?}");
		}
	});
}

#[component]
pub fn GraphViewer(config: ViewerConfig) -> impl IntoView {
	let container_ref = NodeRef::<leptos::html::Div>::new();
	let (panel, set_panel) = signal(PANEL_PROMPT.to_string());
	let (label, set_label) = signal(toggle_label(None).to_string());
	let (error, set_error) = signal(String::new());
	let (preview, set_preview) = signal(String::new());
	let (path, set_path) = signal(config.document_path.clone());

	let side_panel = config.side_panel_width;
	let toggle_key = config.toggle_key.clone();
	let initial = web_sys::window()
		.map(|w| window_viewport(&w, side_panel))
		.unwrap_or_else(|| Viewport::from_window(0.0, 0.0, side_panel));

	let bridge = InteractionBridge::new(
		Rc::new(set_panel),
		Rc::new(set_label),
		config.node_display.clone(),
	);
	let status = StatusSinks {
		error: Rc::new(set_error),
		preview: Rc::new(set_preview),
	};
	let drivers: DriverFactory = Box::new(|| Box::new(FrameLoop::new()) as Box<dyn StepDriver>);
	let render = RenderManager::new(CanvasBackend::new(container_ref), initial);
	let viewer: Viewer = Rc::new(RefCell::new(Orchestrator::new(
		config, render, bridge, status, drivers,
	)));

	let viewer_resize = viewer.clone();
	let on_resize = window_event_listener(ev::resize, move |_| {
		let Some(window) = web_sys::window() else {
			return;
		};
		// A load in progress holds the viewer; the next resize catches up.
		if let Ok(mut viewer) = viewer_resize.try_borrow_mut() {
			viewer.resize(window_viewport(&window, side_panel));
		}
	});

	let viewer_key = viewer.clone();
	let on_keydown = window_event_listener(ev::keydown, move |event: KeyboardEvent| {
		if !key_press(&event).toggles_layout(&toggle_key) {
			return;
		}
		if let Ok(mut viewer) = viewer_key.try_borrow_mut() {
			viewer.toggle_layout();
		}
	});
	hold_until_cleanup(vec![on_resize, on_keydown]);

	let started = Rc::new(Cell::new(false));
	let viewer_init = viewer.clone();
	Effect::new(move |_| {
		if container_ref.get().is_none() || started.replace(true) {
			return;
		}
		spawn_load(&viewer_init, LoadRequest::Reload);
	});

	let viewer_reload = viewer.clone();
	let on_reload = move |_| spawn_load(&viewer_reload, LoadRequest::Reload);

	let viewer_open = viewer.clone();
	let on_open = move |ev: web_sys::SubmitEvent| {
		ev.prevent_default();
		let requested = path.get_untracked();
		if !requested.trim().is_empty() {
			spawn_load(&viewer_open, LoadRequest::Path(requested.trim().to_string()));
		}
	};

	let viewer_toggle = viewer.clone();
	let on_toggle = move |_| {
		if let Ok(mut viewer) = viewer_toggle.try_borrow_mut() {
			viewer.toggle_layout();
		}
	};

	view! {
		<div class="graph-viewer">
			<div node_ref=container_ref class="graph-container" />
			<aside class="side-panel" style=format!("width: {side_panel}px;")>
				<form class="document-form" on:submit=on_open>
					<input
						type="text"
						prop:value=move || path.get()
						on:input=move |ev| set_path.set(event_target_value(&ev))
					/>
					<button type="submit">"Open"</button>
				</form>
				<div class="controls">
					<button on:click=on_reload>"Reload"</button>
					<button on:click=on_toggle>{move || label.get()}</button>
				</div>
				<p class="error-area" class:hidden=move || error.get().is_empty()>
					{move || error.get()}
				</p>
				<pre class="node-view">{move || panel.get()}</pre>
				<details class="json-preview">
					<summary>"Document"</summary>
					<pre>{move || preview.get()}</pre>
				</details>
			</aside>
		</div>
	}
}

#[cfg(all(test, target_arch = "wasm32"))]
mod browser_tests {
	use wasm_bindgen_test::*;

	use super::*;

	wasm_bindgen_test_configure!(run_in_browser);

	#[wasm_bindgen_test]
	fn window_listeners_end_with_their_owner() {
		let window = web_sys::window().unwrap();
		let hits = Rc::new(Cell::new(0));
		let fire = || {
			let event = web_sys::Event::new("graph-viewer-ping").unwrap();
			window.dispatch_event(&event).unwrap();
		};

		let owner = Owner::new();
		let counter = hits.clone();
		owner.with(|| {
			hold_until_cleanup(vec![window_event_listener_untyped("graph-viewer-ping", move |_| {
				counter.set(counter.get() + 1)
			})]);
		});
		fire();
		assert_eq!(hits.get(), 1);

		owner.cleanup();
		fire();
		assert_eq!(hits.get(), 1);
	}
}
