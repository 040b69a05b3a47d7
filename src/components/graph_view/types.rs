use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::LoadError;

/// Free-form attributes carried by nodes and edges.
pub type Attributes = Map<String, Value>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeEntry {
	pub id: String,
	#[serde(flatten)]
	pub attributes: Attributes,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeEntry {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	pub source: String,
	pub target: String,
	#[serde(flatten)]
	pub attributes: Attributes,
}

/// The raw `{ "nodes": [...], "edges": [...] }` document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
	#[serde(default)]
	pub nodes: Vec<NodeEntry>,
	#[serde(default)]
	pub edges: Vec<EdgeEntry>,
}

impl GraphDocument {
	pub fn to_pretty_json(&self) -> String {
		serde_json::to_string_pretty(self).unwrap_or_default()
	}
}

pub fn parse_document(body: &str) -> Result<GraphDocument, LoadError> {
	Ok(serde_json::from_str(body)?)
}
