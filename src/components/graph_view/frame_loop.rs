use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

/// Source of discrete time steps for anything that animates.
///
/// `begin` replaces whatever step was previously scheduled. `halt` is total and must
/// not be called from inside the step it cancels.
pub trait StepDriver {
	fn begin(&mut self, step: Box<dyn FnMut()>);
	fn halt(&mut self);
	fn is_active(&self) -> bool;
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Runs a step once per `requestAnimationFrame`, yielding to the event loop in between.
#[derive(Default)]
pub struct FrameLoop {
	callback: FrameCallback,
	pending: Rc<Cell<Option<i32>>>,
}

impl FrameLoop {
	pub fn new() -> Self {
		Self::default()
	}
}

fn request_frame(cb: &Closure<dyn FnMut()>) -> Option<i32> {
	web_sys::window()?
		.request_animation_frame(cb.as_ref().unchecked_ref())
		.ok()
}

impl StepDriver for FrameLoop {
	fn begin(&mut self, mut step: Box<dyn FnMut()>) {
		self.halt();
		let (next, pending) = (self.callback.clone(), self.pending.clone());
		*self.callback.borrow_mut() = Some(Closure::new(move || {
			pending.set(None);
			step();
			if let Some(ref cb) = *next.borrow() {
				pending.set(request_frame(cb));
			}
		}));
		if let Some(ref cb) = *self.callback.borrow() {
			self.pending.set(request_frame(cb));
		}
	}

	fn halt(&mut self) {
		if let Some(id) = self.pending.take() {
			if let Some(window) = web_sys::window() {
				let _ = window.cancel_animation_frame(id);
			}
		}
		// Dropping the closure also breaks its reference cycle through `callback`.
		self.callback.borrow_mut().take();
	}

	fn is_active(&self) -> bool {
		self.callback.borrow().is_some()
	}
}

impl Drop for FrameLoop {
	fn drop(&mut self) {
		self.halt();
	}
}
