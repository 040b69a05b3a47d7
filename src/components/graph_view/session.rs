use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, error, info};

use super::bridge::{InteractionBridge, TextSink};
use super::builder::build;
use super::config::{LayoutMode, ViewerConfig};
use super::error::LoadError;
use super::fetch::DocumentFetcher;
use super::frame_loop::StepDriver;
use super::layout::{LayoutController, LayoutState, place_initial, run_to_completion};
use super::surface::{RenderBackend, RenderManager, Viewport};
use super::types::GraphDocument;

pub type DriverFactory = Box<dyn Fn() -> Box<dyn StepDriver>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadRequest {
	Path(String),
	/// Load the most recently requested path again.
	Reload,
}

/// Identifies one load attempt; only the newest ticket may install its result.
#[derive(Debug, PartialEq, Eq)]
pub struct LoadTicket {
	generation: u64,
	path: String,
}

impl LoadTicket {
	pub fn path(&self) -> &str {
		&self.path
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadSummary {
	pub nodes: usize,
	pub edges: usize,
	pub skipped: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
	Loaded(LoadSummary),
	/// A newer load started while this one was in flight; its result was discarded.
	Superseded,
}

/// User-visible text areas outside the graph container.
pub struct StatusSinks {
	pub error: Rc<dyn TextSink>,
	pub preview: Rc<dyn TextSink>,
}

/// Sequences fetch, build, layout, mount and wiring for each load.
///
/// Owns the only layout session and the only render session. A new load tears both
/// down before creating replacements, but only once its document has been fetched and
/// built, so a failed reload leaves the previous graph on screen.
pub struct Orchestrator<B: RenderBackend> {
	config: ViewerConfig,
	layout: LayoutController,
	render: RenderManager<B>,
	bridge: InteractionBridge,
	status: StatusSinks,
	drivers: DriverFactory,
	generation: u64,
	path: String,
}

impl<B: RenderBackend> Orchestrator<B> {
	pub fn new(
		config: ViewerConfig,
		render: RenderManager<B>,
		bridge: InteractionBridge,
		status: StatusSinks,
		drivers: DriverFactory,
	) -> Self {
		let layout = LayoutController::new(config.layout.clone());
		let path = config.document_path.clone();
		Self {
			config,
			layout,
			render,
			bridge,
			status,
			drivers,
			generation: 0,
			path,
		}
	}

	pub fn begin(&mut self, request: LoadRequest) -> LoadTicket {
		if let LoadRequest::Path(path) = request {
			self.path = path;
		}
		self.generation += 1;
		info!("Load #{} of {} started", self.generation, self.path);
		LoadTicket {
			generation: self.generation,
			path: self.path.clone(),
		}
	}

	pub fn finish_load(
		&mut self,
		ticket: LoadTicket,
		fetched: Result<GraphDocument, LoadError>,
	) -> Result<LoadOutcome, LoadError> {
		if ticket.generation != self.generation {
			debug!(
				"Discarding load #{} of {}; #{} is current",
				ticket.generation, ticket.path, self.generation
			);
			return Ok(LoadOutcome::Superseded);
		}
		match self.install(fetched) {
			Ok(summary) => {
				info!(
					"Load #{} finished: {} nodes, {} edges, {} skipped",
					ticket.generation, summary.nodes, summary.edges, summary.skipped
				);
				self.status.error.show("");
				Ok(LoadOutcome::Loaded(summary))
			}
			Err(err) => {
				self.report(&err);
				Err(err)
			}
		}
	}

	fn install(&mut self, fetched: Result<GraphDocument, LoadError>) -> Result<LoadSummary, LoadError> {
		let document = fetched?;
		self.status.preview.show(&document.to_pretty_json());

		let built = build(&document, self.config.policy)?;
		let mut model = built.model;
		place_initial(&mut model, self.config.layout.initial_radius);
		if let LayoutMode::Batch { iterations } = self.config.mode {
			run_to_completion(&mut model, &self.config.layout, iterations);
		}
		let summary = LoadSummary {
			nodes: model.node_count(),
			edges: model.edge_count(),
			skipped: built.skipped.len(),
		};
		let model = Rc::new(RefCell::new(model));

		// Nothing below can be rolled back: the previous pair goes first.
		self.layout.dispose();
		self.render.unmount();

		self.layout.create_session(&model, (self.drivers)());
		let session = match self.render.mount(&model) {
			Ok(session) => session,
			Err(err) => {
				self.layout.dispose();
				self.bridge.sync_label(None);
				return Err(err);
			}
		};
		self.bridge.attach(session, &model);

		if self.config.mode == LayoutMode::Continuous && self.config.autostart {
			self.layout.start();
		}
		self.bridge.sync_label(self.layout.state());
		Ok(summary)
	}

	fn report(&mut self, err: &LoadError) {
		error!("{err}");
		let message = err.user_message();
		self.status.error.show(&message);
		self.status.preview.show(&err.to_string());
		// A reload that failed before teardown keeps the previous graph.
		if !self.render.is_mounted() && !matches!(err, LoadError::RenderInit(_)) {
			self.render.show_error(&message);
		}
	}

	pub fn toggle_layout(&mut self) -> Option<LayoutState> {
		self.bridge.toggle(&mut self.layout)
	}

	#[cfg(test)]
	pub fn layout_state(&self) -> Option<LayoutState> {
		self.layout.state()
	}

	#[cfg(test)]
	pub fn is_rendered(&self) -> bool {
		self.render.is_mounted()
	}

	pub fn resize(&mut self, viewport: Viewport) {
		self.render.resize(viewport);
	}
}

/// Runs one load: begin, fetch, finish.
///
/// The fetch is the only suspension point and no borrow of `viewer` is held across it,
/// so toggles and newer loads may run while it is pending.
pub async fn load<B, F>(
	viewer: &RefCell<Orchestrator<B>>,
	fetcher: &F,
	request: LoadRequest,
) -> Result<LoadOutcome, LoadError>
where
	B: RenderBackend,
	F: DocumentFetcher,
{
	let ticket = viewer.borrow_mut().begin(request);
	let fetched = fetcher.fetch(ticket.path()).await;
	viewer.borrow_mut().finish_load(ticket, fetched)
}
