use log::{error, info};

use super::error::{LoadError, RenderError};
use super::model::SharedModel;

/// Handle returned by [`RenderSurface::subscribe_node_clicks`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u32);

pub type NodeClickHandler = Box<dyn FnMut(&str)>;

/// Drawn graph that reports clicks on nodes by id.
pub trait RenderSurface {
	fn subscribe_node_clicks(&mut self, handler: NodeClickHandler) -> SubscriptionId;
	fn unsubscribe(&mut self, id: SubscriptionId);
	fn resize(&mut self, viewport: Viewport);
	/// Tears the surface down. Total and idempotent.
	fn kill(&mut self);
}

/// Builds surfaces inside one container element.
pub trait RenderBackend {
	type Surface: RenderSurface;

	fn construct(&mut self, model: &SharedModel, viewport: Viewport) -> Result<Self::Surface, RenderError>;
	fn clear(&mut self);
	fn show_error(&mut self, message: &str);
	fn size_container(&mut self, viewport: Viewport);
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
	pub width: f64,
	pub height: f64,
}

impl Viewport {
	/// Full window height; width minus the side panel allowance.
	pub fn from_window(width: f64, height: f64, side_panel: f64) -> Self {
		Self {
			width: (width - side_panel).max(0.0),
			height: height.max(0.0),
		}
	}
}

/// A live surface plus its click subscription.
pub struct RenderSession<S: RenderSurface> {
	surface: Option<S>,
	subscription: Option<SubscriptionId>,
}

impl<S: RenderSurface> RenderSession<S> {
	fn new(surface: S) -> Self {
		Self {
			surface: Some(surface),
			subscription: None,
		}
	}

	/// Replaces the click handler, dropping any earlier subscription.
	pub fn on_node_click(&mut self, handler: NodeClickHandler) {
		let Some(surface) = self.surface.as_mut() else {
			return;
		};
		if let Some(old) = self.subscription.take() {
			surface.unsubscribe(old);
		}
		self.subscription = Some(surface.subscribe_node_clicks(handler));
	}

	pub fn is_live(&self) -> bool {
		self.surface.is_some()
	}

	fn resize(&mut self, viewport: Viewport) {
		if let Some(surface) = self.surface.as_mut() {
			surface.resize(viewport);
		}
	}

	/// Unsubscribes and kills the surface. Safe to call repeatedly.
	pub fn release(&mut self) {
		let Some(mut surface) = self.surface.take() else {
			return;
		};
		if let Some(id) = self.subscription.take() {
			surface.unsubscribe(id);
		}
		surface.kill();
	}
}

impl<S: RenderSurface> Drop for RenderSession<S> {
	fn drop(&mut self) {
		self.release();
	}
}

/// Keeps at most one live surface in its backend's container.
pub struct RenderManager<B: RenderBackend> {
	backend: B,
	current: Option<RenderSession<B::Surface>>,
	viewport: Viewport,
}

impl<B: RenderBackend> RenderManager<B> {
	pub fn new(backend: B, viewport: Viewport) -> Self {
		Self {
			backend,
			current: None,
			viewport,
		}
	}

	/// Tears down the current surface and clears the container, then builds a surface
	/// for `model`.
	///
	/// On failure the container is left empty apart from the error message.
	pub fn mount(&mut self, model: &SharedModel) -> Result<&mut RenderSession<B::Surface>, LoadError> {
		if let Some(mut previous) = self.current.take() {
			previous.release();
			info!("Surface unmounted");
		}
		self.backend.clear();
		self.backend.size_container(self.viewport);
		match self.backend.construct(model, self.viewport) {
			Ok(surface) => {
				info!(
					"Surface mounted at {}x{}",
					self.viewport.width, self.viewport.height
				);
				Ok(self.current.insert(RenderSession::new(surface)))
			}
			Err(err) => {
				error!("Surface construction failed: {err}");
				self.backend.clear();
				self.backend.show_error(&err.to_string());
				Err(err.into())
			}
		}
	}

	pub fn unmount(&mut self) {
		if let Some(mut session) = self.current.take() {
			session.release();
			self.backend.clear();
			info!("Surface unmounted");
		}
	}

	pub fn is_mounted(&self) -> bool {
		self.current.as_ref().is_some_and(RenderSession::is_live)
	}

	pub fn show_error(&mut self, message: &str) {
		self.backend.clear();
		self.backend.show_error(message);
	}

	pub fn resize(&mut self, viewport: Viewport) {
		self.viewport = viewport;
		self.backend.size_container(viewport);
		if let Some(session) = self.current.as_mut() {
			session.resize(viewport);
		}
	}
}
