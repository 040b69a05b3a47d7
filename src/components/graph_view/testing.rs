//! Test doubles for the browser-facing collaborators.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use super::bridge::TextSink;
use super::error::{LoadError, RenderError};
use super::fetch::{DocumentFetcher, interpret_response};
use super::frame_loop::StepDriver;
use super::model::SharedModel;
use super::surface::{NodeClickHandler, RenderBackend, RenderSurface, SubscriptionId, Viewport};
use super::types::GraphDocument;

/// Polls a future that must complete without suspending.
pub fn poll_ready<F: Future>(future: F) -> F::Output {
	let mut future = pin!(future);
	match future.as_mut().poll(&mut Context::from_waker(Waker::noop())) {
		Poll::Ready(output) => output,
		Poll::Pending => panic!("future was expected to be ready"),
	}
}

#[derive(Clone, Default)]
pub struct RecordingSink(Rc<RefCell<String>>);

impl RecordingSink {
	pub fn text(&self) -> String {
		self.0.borrow().clone()
	}
}

impl TextSink for RecordingSink {
	fn show(&self, text: &str) {
		*self.0.borrow_mut() = text.to_string();
	}
}

/// Step driver advanced by hand with [`ManualDriver::pump`].
#[derive(Clone, Default)]
pub struct ManualDriver {
	step: Rc<RefCell<Option<Box<dyn FnMut()>>>>,
	begun: Rc<Cell<usize>>,
}

impl ManualDriver {
	pub fn pump(&self, steps: usize) {
		for _ in 0..steps {
			if let Some(step) = self.step.borrow_mut().as_mut() {
				step();
			}
		}
	}

	pub fn begun(&self) -> usize {
		self.begun.get()
	}
}

impl StepDriver for ManualDriver {
	fn begin(&mut self, step: Box<dyn FnMut()>) {
		self.begun.set(self.begun.get() + 1);
		*self.step.borrow_mut() = Some(step);
	}

	fn halt(&mut self) {
		self.step.borrow_mut().take();
	}

	fn is_active(&self) -> bool {
		self.step.borrow().is_some()
	}
}

#[derive(Default)]
struct FakeDom {
	children: Vec<String>,
	clears: usize,
	live: usize,
	mounted: u32,
	fail: Option<String>,
	container: Viewport,
	surface_size: Option<Viewport>,
	handlers: Vec<(u32, SubscriptionId, NodeClickHandler)>,
}

/// In-memory stand-in for a container element and its canvas backend.
#[derive(Clone, Default)]
pub struct FakeBackend(Rc<RefCell<FakeDom>>);

impl FakeBackend {
	pub fn fail_next(&self, reason: &str) {
		self.0.borrow_mut().fail = Some(reason.to_string());
	}

	pub fn children(&self) -> Vec<String> {
		self.0.borrow().children.clone()
	}

	pub fn clears(&self) -> usize {
		self.0.borrow().clears
	}

	pub fn live_surfaces(&self) -> usize {
		self.0.borrow().live
	}

	pub fn live_subscriptions(&self) -> usize {
		self.0.borrow().handlers.len()
	}

	pub fn container_size(&self) -> Viewport {
		self.0.borrow().container
	}

	pub fn last_surface_size(&self) -> Option<Viewport> {
		self.0.borrow().surface_size
	}

	/// Fires a node click on every live subscription.
	pub fn click(&self, node: &str) {
		let mut handlers = std::mem::take(&mut self.0.borrow_mut().handlers);
		for (_, _, handler) in handlers.iter_mut() {
			handler(node);
		}
		self.0.borrow_mut().handlers.extend(handlers);
	}
}

pub struct FakeSurface {
	number: u32,
	dom: Rc<RefCell<FakeDom>>,
	next_subscription: u32,
	killed: bool,
}

impl RenderSurface for FakeSurface {
	fn subscribe_node_clicks(&mut self, handler: NodeClickHandler) -> SubscriptionId {
		self.next_subscription += 1;
		let id = SubscriptionId(self.next_subscription);
		self.dom.borrow_mut().handlers.push((self.number, id, handler));
		id
	}

	fn unsubscribe(&mut self, id: SubscriptionId) {
		let number = self.number;
		self.dom
			.borrow_mut()
			.handlers
			.retain(|(owner, sub, _)| !(*owner == number && *sub == id));
	}

	fn resize(&mut self, viewport: Viewport) {
		self.dom.borrow_mut().surface_size = Some(viewport);
	}

	fn kill(&mut self) {
		if !self.killed {
			self.killed = true;
			let number = self.number;
			let mut dom = self.dom.borrow_mut();
			dom.live -= 1;
			dom.handlers.retain(|(owner, _, _)| *owner != number);
		}
	}
}

impl RenderBackend for FakeBackend {
	type Surface = FakeSurface;

	fn construct(&mut self, _model: &SharedModel, viewport: Viewport) -> Result<FakeSurface, RenderError> {
		let mut dom = self.0.borrow_mut();
		if let Some(reason) = dom.fail.take() {
			return Err(RenderError::BackendUnavailable(reason));
		}
		dom.mounted += 1;
		dom.live += 1;
		dom.surface_size = Some(viewport);
		let number = dom.mounted;
		dom.children.push(format!("canvas#{number}"));
		Ok(FakeSurface {
			number,
			dom: self.0.clone(),
			next_subscription: 0,
			killed: false,
		})
	}

	fn clear(&mut self) {
		let mut dom = self.0.borrow_mut();
		dom.children.clear();
		dom.clears += 1;
	}

	fn show_error(&mut self, message: &str) {
		self.0.borrow_mut().children.push(format!("error:{message}"));
	}

	fn size_container(&mut self, viewport: Viewport) {
		self.0.borrow_mut().container = viewport;
	}
}

/// Serves queued `(status, body)` responses in order.
#[derive(Clone, Default)]
pub struct CannedFetcher {
	responses: Rc<RefCell<VecDeque<(u16, String)>>>,
	requested: Rc<RefCell<Vec<String>>>,
}

impl CannedFetcher {
	pub fn respond(&self, status: u16, body: &str) -> &Self {
		self.responses.borrow_mut().push_back((status, body.to_string()));
		self
	}

	pub fn requested(&self) -> Vec<String> {
		self.requested.borrow().clone()
	}
}

impl DocumentFetcher for CannedFetcher {
	fn fetch(&self, path: &str) -> impl Future<Output = Result<GraphDocument, LoadError>> {
		self.requested.borrow_mut().push(path.to_string());
		let result = match self.responses.borrow_mut().pop_front() {
			Some((status, body)) => interpret_response(path, status, &body),
			None => Err(LoadError::Fetch {
				path: path.to_string(),
				status: None,
				reason: "no canned response".to_string(),
			}),
		};
		std::future::ready(result)
	}
}
