use log::warn;

use super::error::{GraphError, LoadError};
use super::model::GraphModel;
use super::types::GraphDocument;

/// How malformed node and edge entries are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DocumentPolicy {
	/// Skip the offending entry, log a warning and keep loading.
	#[default]
	Lenient,
	/// Fail the whole load on the first duplicate node or dangling edge.
	Strict,
}

pub struct BuiltGraph {
	pub model: GraphModel,
	/// Entries that were dropped while building.
	pub skipped: Vec<GraphError>,
}

/// Converts a parsed document into a model.
///
/// Edges reusing an already accepted id are dropped under either policy: the first
/// edge with a given id wins.
pub fn build(document: &GraphDocument, policy: DocumentPolicy) -> Result<BuiltGraph, LoadError> {
	let mut model = GraphModel::new();
	let mut skipped = Vec::new();

	for node in &document.nodes {
		if let Err(err) = model.add_node(&node.id, node.attributes.clone()) {
			reject(err, policy, &mut skipped)?;
		}
	}

	for edge in &document.edges {
		let attributes = edge.attributes.clone();
		let added = match &edge.id {
			Some(key) => model.add_edge_with_key(key, &edge.source, &edge.target, attributes),
			None => model
				.add_edge(&edge.source, &edge.target, attributes)
				.map(|_| ()),
		};
		match added {
			Ok(()) => {}
			Err(err @ GraphError::DuplicateEdge(_)) => {
				warn!("Skipping edge: {err}");
				skipped.push(err);
			}
			Err(err) => reject(err, policy, &mut skipped)?,
		}
	}

	Ok(BuiltGraph { model, skipped })
}

fn reject(
	err: GraphError,
	policy: DocumentPolicy,
	skipped: &mut Vec<GraphError>,
) -> Result<(), LoadError> {
	match policy {
		DocumentPolicy::Strict => Err(err.into()),
		DocumentPolicy::Lenient => {
			warn!("Skipping malformed entry: {err}");
			skipped.push(err);
			Ok(())
		}
	}
}
