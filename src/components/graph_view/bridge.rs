use std::rc::Rc;

use leptos::prelude::*;
use log::debug;

use super::layout::{LayoutController, LayoutState};
use super::model::SharedModel;
use super::surface::{RenderSession, RenderSurface};
use super::types::Attributes;

pub const PANEL_PROMPT: &str = "Click a node to inspect it";

/// Somewhere to put a line of user-visible text.
pub trait TextSink {
	fn show(&self, text: &str);
}

impl TextSink for WriteSignal<String> {
	fn show(&self, text: &str) {
		self.set(text.to_string());
	}
}

/// What the side panel shows for a clicked node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeDisplay {
	/// One attribute's value, or a "no data" placeholder.
	Attribute(String),
	/// The whole attribute bag as JSON.
	AllAttributes,
}

impl Default for NodeDisplay {
	fn default() -> Self {
		Self::Attribute("table".to_string())
	}
}

impl NodeDisplay {
	pub fn describe(&self, id: &str, attributes: Option<&Attributes>) -> String {
		match self {
			Self::Attribute(key) => match attributes.and_then(|a| a.get(key)) {
				Some(serde_json::Value::String(text)) if !text.is_empty() => text.clone(),
				Some(serde_json::Value::Null) | Some(serde_json::Value::String(_)) | None => {
					format!("No {key} data")
				}
				Some(other) => other.to_string(),
			},
			Self::AllAttributes => {
				let json = attributes
					.and_then(|a| serde_json::to_string_pretty(a).ok())
					.unwrap_or_else(|| "{}".to_string());
				format!("Node {id}\n{json}")
			}
		}
	}
}

pub fn toggle_label(state: Option<LayoutState>) -> &'static str {
	match state {
		Some(LayoutState::Running) => "Stop layout",
		_ => "Start layout",
	}
}

/// A keydown reduced to what the layout shortcut cares about.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyPress {
	pub key: String,
	pub repeat: bool,
	/// Ctrl, Meta or Alt held.
	pub modified: bool,
	/// Tag name of the event target, as the DOM reports it.
	pub target_tag: Option<String>,
	pub content_editable: bool,
}

impl KeyPress {
	fn is_typing(&self) -> bool {
		self.content_editable
			|| self.target_tag.as_deref().is_some_and(|tag| {
				["input", "textarea", "select"]
					.iter()
					.any(|field| tag.eq_ignore_ascii_case(field))
			})
	}

	pub fn toggles_layout(&self, toggle_key: &str) -> bool {
		!self.repeat && !self.modified && !self.is_typing() && self.key.eq_ignore_ascii_case(toggle_key)
	}
}

/// Routes surface clicks to the side panel and toggle requests to the layout.
pub struct InteractionBridge {
	panel: Rc<dyn TextSink>,
	label: Rc<dyn TextSink>,
	display: NodeDisplay,
}

impl InteractionBridge {
	pub fn new(panel: Rc<dyn TextSink>, label: Rc<dyn TextSink>, display: NodeDisplay) -> Self {
		Self {
			panel,
			label,
			display,
		}
	}

	/// Subscribes to clicks on a freshly mounted surface.
	pub fn attach<S: RenderSurface>(&self, session: &mut RenderSession<S>, model: &SharedModel) {
		self.panel.show(PANEL_PROMPT);
		let (panel, display, model) = (self.panel.clone(), self.display.clone(), model.clone());
		session.on_node_click(Box::new(move |id| {
			let text = match model.try_borrow() {
				Ok(model) => display.describe(id, model.node_attributes(id)),
				Err(_) => return,
			};
			debug!("Node {id} clicked");
			panel.show(&text);
		}));
	}

	pub fn toggle(&self, layout: &mut LayoutController) -> Option<LayoutState> {
		let state = layout.toggle();
		self.sync_label(state);
		state
	}

	pub fn sync_label(&self, state: Option<LayoutState>) {
		self.label.show(toggle_label(state));
	}
}
