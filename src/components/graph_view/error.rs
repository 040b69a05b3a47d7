use thiserror::Error;

/// Structural violations reported by [`GraphModel`](super::model::GraphModel) inserts.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GraphError {
	/// A node with this id is already present.
	#[error("duplicate node id `{0}`")]
	DuplicateNode(String),

	/// An edge with this key is already present.
	#[error("duplicate edge id `{0}`")]
	DuplicateEdge(String),

	/// The edge references a node that is not in the model.
	#[error("edge {source_id} -> {target_id} references missing node `{missing}`")]
	DanglingEdge {
		/// Source node id as written in the document.
		source_id: String,
		/// Target node id as written in the document.
		target_id: String,
		/// Whichever endpoint could not be resolved.
		missing: String,
	},
}

/// Failures while constructing a rendering surface.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RenderError {
	/// The container element is not attached to the page yet.
	#[error("graph container is not available")]
	ContainerMissing,

	/// The drawing backend could not be obtained.
	#[error("rendering backend unavailable: {0}")]
	BackendUnavailable(String),

	/// A DOM call threw.
	#[error("DOM error: {0}")]
	Dom(String),
}

/// Everything that can abort a load or reload.
#[derive(Debug, Error)]
pub enum LoadError {
	/// The document could not be retrieved.
	#[error("failed to fetch {path}: {reason}")]
	Fetch {
		/// Requested document path.
		path: String,
		/// HTTP status, when a response arrived at all.
		status: Option<u16>,
		/// Human-readable cause.
		reason: String,
	},

	/// The body was not a well-formed graph document.
	#[error("failed to parse graph document: {0}")]
	Parse(#[from] serde_json::Error),

	/// The document is structurally invalid under the strict policy.
	#[error("invalid graph document: {0}")]
	Graph(#[from] GraphError),

	/// The rendering surface could not be constructed.
	#[error("failed to initialise renderer: {0}")]
	RenderInit(#[from] RenderError),
}

impl LoadError {
	/// Short text for the visible error area.
	pub fn user_message(&self) -> String {
		match self {
			Self::Fetch { path, .. } => format!("Error loading {path}. See console for details."),
			Self::Parse(_) => "The graph document is not valid JSON.".to_string(),
			Self::Graph(err) => format!("The graph document is invalid: {err}."),
			Self::RenderInit(err) => format!("Unable to draw the graph: {err}."),
		}
	}
}

/// Best-effort text for a thrown JS value.
pub(crate) fn js_message(value: &wasm_bindgen::JsValue) -> String {
	value.as_string().unwrap_or_else(|| format!("{value:?}"))
}
