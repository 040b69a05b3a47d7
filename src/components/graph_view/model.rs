use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::error::GraphError;
use super::types::Attributes;

/// Model handle shared by the layout session, the surface and click handlers.
pub type SharedModel = Rc<RefCell<GraphModel>>;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
	pub x: f64,
	pub y: f64,
}

#[derive(Clone, Debug)]
pub struct ModelNode {
	id: String,
	attributes: Attributes,
	position: Option<Position>,
}

impl ModelNode {
	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn attributes(&self) -> &Attributes {
		&self.attributes
	}

	pub fn position(&self) -> Option<Position> {
		self.position
	}
}

#[derive(Clone, Debug)]
pub struct ModelEdge {
	source: usize,
	target: usize,
	attributes: Attributes,
}

impl ModelEdge {
	/// Slot of the source node.
	pub fn source(&self) -> usize {
		self.source
	}

	/// Slot of the target node.
	pub fn target(&self) -> usize {
		self.target
	}

	pub fn attributes(&self) -> &Attributes {
		&self.attributes
	}
}

/// In-memory graph: nodes in insertion order, edges keyed by id.
///
/// Nodes are addressed either by id or by their insertion slot; slots are stable for
/// the lifetime of the model because nodes are never removed.
#[derive(Clone, Debug, Default)]
pub struct GraphModel {
	nodes: Vec<ModelNode>,
	node_slots: HashMap<String, usize>,
	edges: Vec<ModelEdge>,
	edge_keys: HashSet<String>,
	next_generated: usize,
}

impl GraphModel {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_node(&mut self, id: &str, attributes: Attributes) -> Result<usize, GraphError> {
		if self.node_slots.contains_key(id) {
			return Err(GraphError::DuplicateNode(id.to_string()));
		}
		let slot = self.nodes.len();
		self.nodes.push(ModelNode {
			id: id.to_string(),
			attributes,
			position: None,
		});
		self.node_slots.insert(id.to_string(), slot);
		Ok(slot)
	}

	/// Adds an edge under a generated key and returns that key.
	pub fn add_edge(
		&mut self,
		source: &str,
		target: &str,
		attributes: Attributes,
	) -> Result<String, GraphError> {
		let key = loop {
			let candidate = format!("geid_{}", self.next_generated);
			self.next_generated += 1;
			if !self.edge_keys.contains(&candidate) {
				break candidate;
			}
		};
		self.insert_edge(key.clone(), source, target, attributes)?;
		Ok(key)
	}

	pub fn add_edge_with_key(
		&mut self,
		key: &str,
		source: &str,
		target: &str,
		attributes: Attributes,
	) -> Result<(), GraphError> {
		if self.edge_keys.contains(key) {
			return Err(GraphError::DuplicateEdge(key.to_string()));
		}
		self.insert_edge(key.to_string(), source, target, attributes)
	}

	fn insert_edge(
		&mut self,
		key: String,
		source: &str,
		target: &str,
		attributes: Attributes,
	) -> Result<(), GraphError> {
		let resolve = |id: &str| {
			self.node_slots
				.get(id)
				.copied()
				.ok_or_else(|| GraphError::DanglingEdge {
					source_id: source.to_string(),
					target_id: target.to_string(),
					missing: id.to_string(),
				})
		};
		let (source, target) = (resolve(source)?, resolve(target)?);
		self.edge_keys.insert(key);
		self.edges.push(ModelEdge {
			source,
			target,
			attributes,
		});
		Ok(())
	}

	pub fn node_attributes(&self, id: &str) -> Option<&Attributes> {
		self.node_slots.get(id).map(|&slot| &self.nodes[slot].attributes)
	}

	pub fn node(&self, slot: usize) -> Option<&ModelNode> {
		self.nodes.get(slot)
	}

	pub fn nodes(&self) -> impl Iterator<Item = &ModelNode> {
		self.nodes.iter()
	}

	pub fn edges(&self) -> impl Iterator<Item = &ModelEdge> {
		self.edges.iter()
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}

	/// Slots connected to `slot` by an edge in either direction.
	pub fn neighbors(&self, slot: usize) -> impl Iterator<Item = usize> + '_ {
		self.edges.iter().filter_map(move |e| {
			if e.source == slot {
				Some(e.target)
			} else if e.target == slot {
				Some(e.source)
			} else {
				None
			}
		})
	}

	pub fn set_position(&mut self, slot: usize, position: Position) {
		if let Some(node) = self.nodes.get_mut(slot) {
			node.position = Some(position);
		}
	}
}
