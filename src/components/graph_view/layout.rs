use std::cell::RefCell;
use std::f64::consts::PI;
use std::rc::Rc;

use log::{debug, info};

use super::engine::{ForceLayout, LayoutEngine};
use super::frame_loop::StepDriver;
use super::model::{GraphModel, Position, SharedModel};

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutSettings {
	pub gravity: f32,
	/// Approximate long-range repulsion with a quadtree instead of all pairs.
	pub barnes_hut_optimize: bool,
	pub barnes_hut_theta: f32,
	pub charge: f32,
	pub spring: f32,
	pub max_force: f32,
	pub node_speed: f32,
	pub damping: f32,
	pub node_mass: f32,
	/// Simulated seconds per step.
	pub time_step: f32,
	/// Radius of the starting circle.
	pub initial_radius: f64,
}

impl Default for LayoutSettings {
	fn default() -> Self {
		Self {
			gravity: 1.0,
			barnes_hut_optimize: true,
			barnes_hut_theta: 0.5,
			charge: 150.0,
			spring: 0.05,
			max_force: 100.0,
			node_speed: 3000.0,
			damping: 0.9,
			node_mass: 10.0,
			time_step: 0.016,
			initial_radius: 100.0,
		}
	}
}

/// Places every node on a circle around the origin, in insertion order.
pub fn place_initial(model: &mut GraphModel, radius: f64) {
	let count = model.node_count();
	for slot in 0..count {
		let angle = (slot as f64) * 2.0 * PI / count as f64;
		model.set_position(
			slot,
			Position {
				x: radius * angle.cos(),
				y: radius * angle.sin(),
			},
		);
	}
}

/// Applies exactly `iterations` steps synchronously.
pub fn run_engine(engine: &mut dyn LayoutEngine, model: &mut GraphModel, iterations: usize) {
	for _ in 0..iterations {
		engine.step(model);
	}
}

/// Batch mode: lays the model out in one go without a session.
pub fn run_to_completion(model: &mut GraphModel, settings: &LayoutSettings, iterations: usize) {
	let mut engine = ForceLayout::new(model, settings);
	run_engine(&mut engine, model, iterations);
	info!("Batch layout finished after {iterations} iterations");
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutState {
	Idle,
	Running,
	Stopped,
	Disposed,
}

/// One layout engine bound to one model, stepped by a [`StepDriver`] while running.
pub struct LayoutSession {
	engine: Rc<RefCell<Box<dyn LayoutEngine>>>,
	model: SharedModel,
	driver: Box<dyn StepDriver>,
	state: LayoutState,
}

impl LayoutSession {
	pub fn new(model: &SharedModel, engine: Box<dyn LayoutEngine>, driver: Box<dyn StepDriver>) -> Self {
		Self {
			engine: Rc::new(RefCell::new(engine)),
			model: model.clone(),
			driver,
			state: LayoutState::Idle,
		}
	}

	pub fn state(&self) -> LayoutState {
		self.state
	}

	pub fn is_running(&self) -> bool {
		self.state == LayoutState::Running && self.driver.is_active()
	}

	pub fn start(&mut self) {
		match self.state {
			LayoutState::Running | LayoutState::Disposed => {
				debug!("Layout start ignored in state {:?}", self.state);
				return;
			}
			LayoutState::Idle | LayoutState::Stopped => {}
		}
		let (engine, model) = (self.engine.clone(), self.model.clone());
		self.driver.begin(Box::new(move || {
			// Skip the frame if a reader holds the model.
			if let Ok(mut model) = model.try_borrow_mut() {
				engine.borrow_mut().step(&mut model);
			}
		}));
		self.state = LayoutState::Running;
		info!("Layout started");
	}

	pub fn stop(&mut self) {
		if self.state != LayoutState::Running {
			return;
		}
		self.driver.halt();
		self.state = LayoutState::Stopped;
		info!("Layout stopped");
	}

	pub fn toggle(&mut self) -> LayoutState {
		if self.is_running() {
			self.stop();
		} else {
			self.start();
		}
		self.state
	}

	/// Stops the engine if needed and releases the driver. Safe to call repeatedly.
	pub fn dispose(&mut self) {
		if self.state == LayoutState::Disposed {
			return;
		}
		self.stop();
		self.driver.halt();
		self.state = LayoutState::Disposed;
		debug!("Layout session disposed");
	}
}

impl Drop for LayoutSession {
	fn drop(&mut self) {
		self.dispose();
	}
}

/// Owns at most one [`LayoutSession`] at a time.
pub struct LayoutController {
	settings: LayoutSettings,
	session: Option<LayoutSession>,
}

impl LayoutController {
	pub fn new(settings: LayoutSettings) -> Self {
		Self {
			settings,
			session: None,
		}
	}

	/// Disposes any prior session, then binds a fresh engine to `model`.
	pub fn create_session(&mut self, model: &SharedModel, driver: Box<dyn StepDriver>) -> &mut LayoutSession {
		self.dispose();
		let engine = ForceLayout::new(&model.borrow(), &self.settings);
		self.session.insert(LayoutSession::new(model, Box::new(engine), driver))
	}

	pub fn state(&self) -> Option<LayoutState> {
		self.session.as_ref().map(LayoutSession::state)
	}

	pub fn start(&mut self) {
		if let Some(session) = self.session.as_mut() {
			session.start();
		}
	}

	pub fn toggle(&mut self) -> Option<LayoutState> {
		self.session.as_mut().map(LayoutSession::toggle)
	}

	pub fn dispose(&mut self) {
		if let Some(mut session) = self.session.take() {
			session.dispose();
		}
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use super::*;
	use crate::components::graph_view::testing::ManualDriver;
	use crate::components::graph_view::types::Attributes;

	struct CountingEngine(Rc<Cell<usize>>);

	impl LayoutEngine for CountingEngine {
		fn step(&mut self, model: &mut GraphModel) {
			self.0.set(self.0.get() + 1);
			let slot = 0;
			if let Some(p) = model.node(slot).and_then(|n| n.position()) {
				model.set_position(slot, Position { x: p.x + 1.0, y: p.y });
			}
		}
	}

	fn model_with(n: usize) -> GraphModel {
		let mut model = GraphModel::new();
		for i in 0..n {
			model.add_node(&format!("n{i}"), Attributes::new()).unwrap();
		}
		model
	}

	#[test]
	fn initial_placement_is_distinct_and_deterministic() {
		for n in [2, 3, 17, 250] {
			let mut model = model_with(n);
			place_initial(&mut model, 100.0);
			let points: Vec<_> = model.nodes().map(|node| node.position().unwrap()).collect();
			for (i, a) in points.iter().enumerate() {
				for b in &points[i + 1..] {
					assert!(a != b, "{n} nodes: {a:?} placed twice");
				}
			}
			let mut again = model_with(n);
			place_initial(&mut again, 100.0);
			let repeat: Vec<_> = again.nodes().map(|node| node.position().unwrap()).collect();
			assert_eq!(points, repeat);
		}
	}

	#[test]
	fn first_node_starts_on_the_positive_x_axis() {
		let mut model = model_with(4);
		place_initial(&mut model, 50.0);
		assert_eq!(model.node(0).unwrap().position(), Some(Position { x: 50.0, y: 0.0 }));
	}

	#[test]
	fn start_stop_start_keeps_a_single_stepper() {
		let steps = Rc::new(Cell::new(0));
		let driver = ManualDriver::default();
		let mut model = model_with(2);
		place_initial(&mut model, 10.0);
		let model = Rc::new(RefCell::new(model));
		let mut session = LayoutSession::new(
			&model,
			Box::new(CountingEngine(steps.clone())),
			Box::new(driver.clone()),
		);

		assert_eq!(session.state(), LayoutState::Idle);
		assert!(!session.is_running());

		session.start();
		assert!(session.is_running());
		driver.pump(3);
		assert_eq!(steps.get(), 3);

		session.start();
		assert_eq!(driver.begun(), 1, "second start must be a no-op");

		session.stop();
		assert!(!session.is_running());
		driver.pump(5);
		assert_eq!(steps.get(), 3);

		session.stop();
		assert_eq!(session.state(), LayoutState::Stopped);

		session.start();
		assert!(session.is_running());
		driver.pump(2);
		assert_eq!(steps.get(), 5);
		assert_eq!(model.borrow().node(0).unwrap().position().unwrap().x, 15.0);
	}

	#[test]
	fn toggle_alternates_running_and_stopped() {
		let driver = ManualDriver::default();
		let model = Rc::new(RefCell::new(model_with(1)));
		let mut session = LayoutSession::new(
			&model,
			Box::new(CountingEngine(Rc::new(Cell::new(0)))),
			Box::new(driver.clone()),
		);
		assert_eq!(session.toggle(), LayoutState::Running);
		assert_eq!(session.toggle(), LayoutState::Stopped);
		assert_eq!(session.toggle(), LayoutState::Running);
		assert!(driver.is_active());
	}

	#[test]
	fn dispose_halts_a_running_session_and_is_terminal() {
		let driver = ManualDriver::default();
		let model = Rc::new(RefCell::new(model_with(1)));
		let mut session = LayoutSession::new(
			&model,
			Box::new(CountingEngine(Rc::new(Cell::new(0)))),
			Box::new(driver.clone()),
		);
		session.start();
		session.dispose();
		assert!(!driver.is_active());
		assert_eq!(session.state(), LayoutState::Disposed);

		session.start();
		session.dispose();
		assert_eq!(session.state(), LayoutState::Disposed);
		assert!(!driver.is_active());
	}

	#[test]
	fn dropping_a_session_halts_its_driver() {
		let driver = ManualDriver::default();
		let model = Rc::new(RefCell::new(model_with(1)));
		{
			let mut session = LayoutSession::new(
				&model,
				Box::new(CountingEngine(Rc::new(Cell::new(0)))),
				Box::new(driver.clone()),
			);
			session.start();
		}
		assert!(!driver.is_active());
	}

	#[test]
	fn controller_replaces_its_previous_session() {
		let (first, second) = (ManualDriver::default(), ManualDriver::default());
		let model = Rc::new(RefCell::new(model_with(3)));
		let mut controller = LayoutController::new(LayoutSettings::default());

		controller.create_session(&model, Box::new(first.clone())).start();
		assert!(first.is_active());

		controller.create_session(&model, Box::new(second.clone()));
		assert!(!first.is_active());
		assert_eq!(controller.state(), Some(LayoutState::Idle));

		controller.dispose();
		assert_eq!(controller.state(), None);
	}

	#[test]
	fn batch_mode_runs_exact_iterations_without_a_session() {
		let steps = Rc::new(Cell::new(0));
		let mut model = model_with(1);
		place_initial(&mut model, 0.0);
		run_engine(&mut CountingEngine(steps.clone()), &mut model, 7);
		assert_eq!(steps.get(), 7);
		assert_eq!(model.node(0).unwrap().position().unwrap().x, 7.0);
	}

	#[test]
	fn run_to_completion_assigns_positions() {
		let mut model = model_with(5);
		place_initial(&mut model, 100.0);
		let before: Vec<_> = model.nodes().map(|n| n.position()).collect();
		run_to_completion(&mut model, &LayoutSettings::default(), 20);
		let after: Vec<_> = model.nodes().map(|n| n.position()).collect();
		assert_ne!(before, after);
	}
}
