use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::debug;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Document, Event, HtmlCanvasElement, HtmlElement, MouseEvent, WheelEvent};

use super::error::{RenderError, js_message};
use super::frame_loop::{FrameLoop, StepDriver};
use super::model::SharedModel;
use super::render;
use super::state::ViewState;
use super::surface::{NodeClickHandler, RenderBackend, RenderSurface, SubscriptionId, Viewport};

const FRAME_SECONDS: f64 = 0.016;

type Handlers = Rc<RefCell<Vec<(SubscriptionId, NodeClickHandler)>>>;

fn dom(err: JsValue) -> RenderError {
	RenderError::Dom(js_message(&err))
}

fn create_canvas(document: &Document, viewport: Viewport) -> Result<HtmlCanvasElement, RenderError> {
	let canvas: HtmlCanvasElement = document
		.create_element("canvas")
		.map_err(dom)?
		.dyn_into()
		.map_err(|_| RenderError::Dom("created element is not a canvas".to_string()))?;
	canvas.set_class_name("graph-canvas");
	canvas.set_width(viewport.width as u32);
	canvas.set_height(viewport.height as u32);
	// `style` also names a leptos element extension; take the DOM property explicitly.
	let style = HtmlElement::style(&canvas);
	let _ = style.set_property("display", "block");
	let _ = style.set_property("cursor", "grab");
	Ok(canvas)
}

/// Builds canvas surfaces inside the viewer's graph container.
pub struct CanvasBackend {
	container: NodeRef<leptos::html::Div>,
}

impl CanvasBackend {
	pub fn new(container: NodeRef<leptos::html::Div>) -> Self {
		Self { container }
	}

	fn element(&self) -> Result<HtmlElement, RenderError> {
		self.container
			.get_untracked()
			.map(Into::into)
			.ok_or(RenderError::ContainerMissing)
	}
}

impl RenderBackend for CanvasBackend {
	type Surface = CanvasSurface;

	fn construct(&mut self, model: &SharedModel, viewport: Viewport) -> Result<CanvasSurface, RenderError> {
		let container = self.element()?;
		let document = web_sys::window()
			.and_then(|w| w.document())
			.ok_or_else(|| RenderError::BackendUnavailable("no document".to_string()))?;

		let canvas = create_canvas(&document, viewport)?;

		let ctx: CanvasRenderingContext2d = canvas
			.get_context("2d")
			.map_err(dom)?
			.ok_or_else(|| RenderError::BackendUnavailable("2d canvas context".to_string()))?
			.dyn_into()
			.map_err(|_| RenderError::BackendUnavailable("2d canvas context".to_string()))?;

		container.append_child(&canvas).map_err(dom)?;
		let mut surface = CanvasSurface::new(canvas, model, viewport);
		if let Err(err) = surface.start(ctx) {
			surface.kill();
			return Err(err);
		}
		Ok(surface)
	}

	fn clear(&mut self) {
		if let Ok(container) = self.element() {
			container.set_inner_html("");
		}
	}

	fn show_error(&mut self, message: &str) {
		let Ok(container) = self.element() else {
			return;
		};
		let Some(document) = web_sys::window().and_then(|w| w.document()) else {
			return;
		};
		if let Ok(notice) = document.create_element("div") {
			notice.set_class_name("graph-error");
			notice.set_text_content(Some(message));
			let _ = container.append_child(&notice);
		}
	}

	fn size_container(&mut self, viewport: Viewport) {
		if let Ok(container) = self.element() {
			let style = HtmlElement::style(&container);
			let _ = style.set_property("width", &format!("{}px", viewport.width));
			let _ = style.set_property("height", &format!("{}px", viewport.height));
		}
	}
}

/// A 2D canvas redrawn every animation frame, with pan, zoom, hover and click.
pub struct CanvasSurface {
	canvas: HtmlCanvasElement,
	state: Rc<RefCell<ViewState>>,
	handlers: Handlers,
	next_subscription: u32,
	listeners: Vec<(&'static str, Closure<dyn FnMut(Event)>)>,
	draw_loop: FrameLoop,
	killed: bool,
}

fn local_position(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

impl CanvasSurface {
	fn new(canvas: HtmlCanvasElement, model: &SharedModel, viewport: Viewport) -> Self {
		Self {
			canvas,
			state: Rc::new(RefCell::new(ViewState::new(
				model.clone(),
				viewport.width,
				viewport.height,
			))),
			handlers: Rc::default(),
			next_subscription: 0,
			listeners: Vec::new(),
			draw_loop: FrameLoop::new(),
			killed: false,
		}
	}

	fn listen<E: JsCast + 'static>(
		&mut self,
		name: &'static str,
		mut handler: impl FnMut(E) + 'static,
	) -> Result<(), RenderError> {
		let closure = Closure::<dyn FnMut(Event)>::new(move |ev: Event| handler(ev.unchecked_into()));
		self.canvas
			.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
			.map_err(dom)?;
		self.listeners.push((name, closure));
		Ok(())
	}

	fn start(&mut self, ctx: CanvasRenderingContext2d) -> Result<(), RenderError> {
		let (state, canvas) = (self.state.clone(), self.canvas.clone());
		self.listen("mousedown", move |ev: MouseEvent| {
			let (x, y) = local_position(&canvas, &ev);
			state.borrow_mut().begin_pan(x, y);
		})?;

		let (state, canvas) = (self.state.clone(), self.canvas.clone());
		self.listen("mousemove", move |ev: MouseEvent| {
			let (x, y) = local_position(&canvas, &ev);
			let mut s = state.borrow_mut();
			if s.pan.active {
				s.pan_to(x, y);
			} else {
				let model = s.model.clone();
				let hovered = model.try_borrow().ok().and_then(|m| s.node_at_position(&m, x, y));
				s.set_hover(hovered);
			}
		})?;

		let (state, canvas, handlers) = (self.state.clone(), self.canvas.clone(), self.handlers.clone());
		self.listen("mouseup", move |ev: MouseEvent| {
			let (x, y) = local_position(&canvas, &ev);
			let clicked = {
				let mut s = state.borrow_mut();
				if !s.end_pan() {
					return;
				}
				let model = s.model.clone();
				let Ok(model) = model.try_borrow() else {
					return;
				};
				s.node_at_position(&model, x, y)
					.and_then(|slot| model.node(slot))
					.map(|node| node.id().to_string())
			};
			if let Some(id) = clicked {
				for (_, handler) in handlers.borrow_mut().iter_mut() {
					handler(&id);
				}
			}
		})?;

		let state = self.state.clone();
		self.listen("mouseleave", move |_: MouseEvent| {
			let mut s = state.borrow_mut();
			s.end_pan();
			s.set_hover(None);
		})?;

		let (state, canvas) = (self.state.clone(), self.canvas.clone());
		self.listen("wheel", move |ev: WheelEvent| {
			ev.prevent_default();
			let (x, y) = local_position(&canvas, &ev);
			state.borrow_mut().zoom_at(x, y, ev.delta_y());
		})?;

		let state = self.state.clone();
		self.draw_loop.begin(Box::new(move || {
			if let Ok(mut s) = state.try_borrow_mut() {
				s.animate(FRAME_SECONDS);
				render::render(&s, &ctx);
			}
		}));
		Ok(())
	}
}

impl RenderSurface for CanvasSurface {
	fn subscribe_node_clicks(&mut self, handler: NodeClickHandler) -> SubscriptionId {
		self.next_subscription += 1;
		let id = SubscriptionId(self.next_subscription);
		self.handlers.borrow_mut().push((id, handler));
		id
	}

	fn unsubscribe(&mut self, id: SubscriptionId) {
		self.handlers.borrow_mut().retain(|(sub, _)| *sub != id);
	}

	fn resize(&mut self, viewport: Viewport) {
		self.canvas.set_width(viewport.width as u32);
		self.canvas.set_height(viewport.height as u32);
		self.state.borrow_mut().resize(viewport.width, viewport.height);
	}

	fn kill(&mut self) {
		if self.killed {
			return;
		}
		self.killed = true;
		self.draw_loop.halt();
		for (name, closure) in self.listeners.drain(..) {
			let _ = self
				.canvas
				.remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
		}
		self.handlers.borrow_mut().clear();
		self.canvas.remove();
		debug!("Canvas surface killed");
	}
}

impl Drop for CanvasSurface {
	fn drop(&mut self) {
		self.kill();
	}
}
