use std::collections::HashSet;

use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};

use super::layout::LayoutSettings;
use super::model::{GraphModel, Position};
use super::quadtree::QuadTree;

/// One discrete layout step over a model's positions.
pub trait LayoutEngine {
	fn step(&mut self, model: &mut GraphModel);
}

/// Force-directed layout.
///
/// In exact mode `force_graph` integrates springs, pairwise charge and damping. With
/// `barnes_hut_optimize` the same integration runs here instead, with charge taken from a
/// quadtree so no step visits every pair of nodes. Gravity toward the origin is applied on
/// top in both modes.
pub struct ForceLayout {
	integrator: Integrator,
	settings: LayoutSettings,
}

enum Integrator {
	Exact(ForceGraph<usize, ()>),
	Approximate(SpringSystem),
}

/// Positions, velocities and springs for the quadtree-backed integrator.
struct SpringSystem {
	points: Vec<(f32, f32)>,
	velocity: Vec<(f32, f32)>,
	springs: Vec<(usize, usize)>,
}

fn clamp_force((fx, fy): (f32, f32), max: f32) -> (f32, f32) {
	(fx.clamp(-max, max), fy.clamp(-max, max))
}

/// Pull of a spring between `from` and `to`, felt by `from`.
fn spring_force(from: (f32, f32), to: (f32, f32), spring: f32) -> (f32, f32) {
	let (dx, dy) = (to.0 - from.0, to.1 - from.1);
	let distance = if dx == 0.0 && dy == 0.0 {
		1.0
	} else {
		(dx * dx + dy * dy).sqrt()
	};
	let strength = spring * distance * 0.5;
	(dx / distance * strength, dy / distance * strength)
}

impl SpringSystem {
	fn new(model: &GraphModel) -> Self {
		let points: Vec<_> = model
			.nodes()
			.map(|node| {
				let p = node.position().unwrap_or_default();
				(p.x as f32, p.y as f32)
			})
			.collect();
		// Parallel edges share one spring.
		let mut seen = HashSet::new();
		let springs = model
			.edges()
			.map(|e| (e.source().min(e.target()), e.source().max(e.target())))
			.filter(|&(a, b)| a != b && seen.insert((a, b)))
			.collect();
		Self {
			velocity: vec![(0.0, 0.0); points.len()],
			points,
			springs,
		}
	}

	fn step(&mut self, s: &LayoutSettings) {
		let dt = s.time_step;
		let mut accel = {
			let tree = QuadTree::build(&self.points, s.node_mass);
			(0..self.points.len())
				.map(|i| {
					let (fx, fy) = clamp_force(
						tree.repulsion(i, s.barnes_hut_theta, s.charge),
						s.max_force,
					);
					(fx * dt, fy * dt)
				})
				.collect::<Vec<_>>()
		};

		for &(a, b) in &self.springs {
			let (fx, fy) = clamp_force(spring_force(self.points[a], self.points[b], s.spring), s.max_force);
			accel[a].0 += fx * dt;
			accel[a].1 += fy * dt;
			accel[b].0 -= fx * dt;
			accel[b].1 -= fy * dt;
		}

		for ((p, v), a) in self.points.iter_mut().zip(&mut self.velocity).zip(accel) {
			v.0 = (v.0 + a.0 * dt * s.node_speed) * s.damping;
			v.1 = (v.1 + a.1 * dt * s.node_speed) * s.damping;
			p.0 += v.0 * dt;
			p.1 += v.1 * dt;
		}
	}
}

impl ForceLayout {
	pub fn new(model: &GraphModel, settings: &LayoutSettings) -> Self {
		let integrator = if settings.barnes_hut_optimize {
			Integrator::Approximate(SpringSystem::new(model))
		} else {
			Integrator::Exact(Self::exact_graph(model, settings))
		};
		Self {
			integrator,
			settings: settings.clone(),
		}
	}

	fn exact_graph(model: &GraphModel, settings: &LayoutSettings) -> ForceGraph<usize, ()> {
		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: settings.charge,
			force_spring: settings.spring,
			force_max: settings.max_force,
			node_speed: settings.node_speed,
			damping_factor: settings.damping,
		});
		let mut indices = Vec::with_capacity(model.node_count());

		for (slot, node) in model.nodes().enumerate() {
			let position = node.position().unwrap_or_default();
			indices.push(graph.add_node(NodeData {
				x: position.x as f32,
				y: position.y as f32,
				mass: settings.node_mass,
				is_anchor: false,
				user_data: slot,
			}));
		}

		for edge in model.edges() {
			// Self loops have no length to relax.
			if edge.source() != edge.target() {
				graph.add_edge(
					indices[edge.source()],
					indices[edge.target()],
					EdgeData::default(),
				);
			}
		}
		graph
	}
}

impl LayoutEngine for ForceLayout {
	fn step(&mut self, model: &mut GraphModel) {
		let s = &self.settings;
		let pull = if s.gravity > 0.0 {
			(s.gravity * s.time_step * 0.1).min(1.0)
		} else {
			0.0
		};

		match &mut self.integrator {
			Integrator::Exact(graph) => {
				graph.update(s.time_step);
				graph.visit_nodes_mut(|node| {
					node.data.x -= node.data.x * pull;
					node.data.y -= node.data.y * pull;
				});
				graph.visit_nodes(|node| {
					model.set_position(
						node.data.user_data,
						Position {
							x: node.x() as f64,
							y: node.y() as f64,
						},
					);
				});
			}
			Integrator::Approximate(system) => {
				system.step(s);
				for (slot, p) in system.points.iter_mut().enumerate() {
					p.0 -= p.0 * pull;
					p.1 -= p.1 * pull;
					model.set_position(
						slot,
						Position {
							x: p.0 as f64,
							y: p.1 as f64,
						},
					);
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::graph_view::layout::place_initial;
	use crate::components::graph_view::types::Attributes;

	fn chain(n: usize) -> GraphModel {
		let mut model = GraphModel::new();
		for i in 0..n {
			model.add_node(&i.to_string(), Attributes::new()).unwrap();
		}
		for i in 1..n {
			model
				.add_edge(&(i - 1).to_string(), &i.to_string(), Attributes::new())
				.unwrap();
		}
		place_initial(&mut model, 100.0);
		model
	}

	fn positions(model: &GraphModel) -> Vec<Position> {
		model.nodes().filter_map(|n| n.position()).collect()
	}

	#[test]
	fn steps_move_nodes_and_keep_them_finite() {
		for barnes_hut in [false, true] {
			let mut model = chain(6);
			let before = positions(&model);
			let settings = LayoutSettings {
				barnes_hut_optimize: barnes_hut,
				..LayoutSettings::default()
			};
			let mut engine = ForceLayout::new(&model, &settings);
			for _ in 0..10 {
				engine.step(&mut model);
			}
			let after = positions(&model);
			assert_eq!(after.len(), 6);
			assert_ne!(before, after);
			assert!(after.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
		}
	}

	#[test]
	fn gravity_pulls_an_isolated_node_inward() {
		let mut model = GraphModel::new();
		model.add_node("lonely", Attributes::new()).unwrap();
		model.set_position(0, Position { x: 200.0, y: -200.0 });
		let mut engine = ForceLayout::new(&model, &LayoutSettings::default());
		engine.step(&mut model);

		let p = model.node(0).unwrap().position().unwrap();
		assert!(p.x < 200.0 && p.x > 0.0);
		assert!(p.y > -200.0 && p.y < 0.0);
	}

	#[test]
	fn barnes_hut_mode_never_builds_the_pairwise_graph() {
		let model = chain(4);
		let approximate = ForceLayout::new(&model, &LayoutSettings::default());
		assert!(matches!(approximate.integrator, Integrator::Approximate(_)));

		let exact = ForceLayout::new(
			&model,
			&LayoutSettings {
				barnes_hut_optimize: false,
				..LayoutSettings::default()
			},
		);
		assert!(matches!(exact.integrator, Integrator::Exact(_)));
	}

	#[test]
	fn both_modes_push_unlinked_nodes_apart() {
		for barnes_hut in [false, true] {
			let mut model = GraphModel::new();
			model.add_node("a", Attributes::new()).unwrap();
			model.add_node("b", Attributes::new()).unwrap();
			model.set_position(0, Position { x: -10.0, y: 0.0 });
			model.set_position(1, Position { x: 10.0, y: 0.0 });
			let settings = LayoutSettings {
				barnes_hut_optimize: barnes_hut,
				gravity: 0.0,
				..LayoutSettings::default()
			};
			let mut engine = ForceLayout::new(&model, &settings);
			for _ in 0..5 {
				engine.step(&mut model);
			}
			let (a, b) = (
				model.node(0).unwrap().position().unwrap(),
				model.node(1).unwrap().position().unwrap(),
			);
			assert!(a.x < -10.0 && b.x > 10.0, "barnes_hut={barnes_hut}: {a:?} {b:?}");
		}
	}

	#[test]
	fn springs_pull_linked_nodes_together() {
		let mut model = GraphModel::new();
		model.add_node("a", Attributes::new()).unwrap();
		model.add_node("b", Attributes::new()).unwrap();
		model.add_edge("a", "b", Attributes::new()).unwrap();
		model.add_edge("b", "a", Attributes::new()).unwrap();
		model.set_position(0, Position { x: -500.0, y: 0.0 });
		model.set_position(1, Position { x: 500.0, y: 0.0 });
		let settings = LayoutSettings {
			gravity: 0.0,
			..LayoutSettings::default()
		};
		let mut engine = ForceLayout::new(&model, &settings);
		let Integrator::Approximate(system) = &engine.integrator else {
			panic!("default settings use the quadtree integrator");
		};
		assert_eq!(system.springs, [(0, 1)]);

		engine.step(&mut model);
		let (a, b) = (
			model.node(0).unwrap().position().unwrap(),
			model.node(1).unwrap().position().unwrap(),
		);
		assert!(a.x > -500.0 && b.x < 500.0);
	}
}
