use std::str::FromStr;

use log::warn;

use super::bridge::NodeDisplay;
use super::builder::DocumentPolicy;
use super::layout::LayoutSettings;

pub const DEFAULT_DOCUMENT: &str = "graph.json";
pub const SIDE_PANEL_WIDTH: f64 = 320.0;
pub const TOGGLE_KEY: &str = "l";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutMode {
	/// Start/stop layout the user can toggle.
	Continuous,
	/// Fixed number of steps run once at load time.
	Batch { iterations: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
	pub document_path: String,
	pub layout: LayoutSettings,
	pub mode: LayoutMode,
	pub autostart: bool,
	pub node_display: NodeDisplay,
	pub policy: DocumentPolicy,
	pub side_panel_width: f64,
	pub toggle_key: String,
}

impl Default for ViewerConfig {
	fn default() -> Self {
		Self {
			document_path: DEFAULT_DOCUMENT.to_string(),
			layout: LayoutSettings::default(),
			mode: LayoutMode::Continuous,
			autostart: true,
			node_display: NodeDisplay::default(),
			policy: DocumentPolicy::Lenient,
			side_panel_width: SIDE_PANEL_WIDTH,
			toggle_key: TOGGLE_KEY.to_string(),
		}
	}
}

fn parsed<T: FromStr>(key: &str, raw: &str) -> Option<T> {
	match raw.parse() {
		Ok(value) => Some(value),
		Err(_) => {
			warn!("Ignoring invalid `{key}` value {raw:?}");
			None
		}
	}
}

impl ViewerConfig {
	/// Applies overrides from URL query parameters.
	pub fn from_params(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let mut config = Self::default();

		if let Some(path) = lookup("graph").filter(|p| !p.trim().is_empty()) {
			config.document_path = path;
		}
		if let Some(iterations) = lookup("iterations").and_then(|raw| parsed("iterations", &raw)) {
			config.mode = LayoutMode::Batch { iterations };
		}
		if let Some(gravity) = lookup("gravity").and_then(|raw| parsed::<f32>("gravity", &raw)) {
			if gravity.is_finite() && gravity >= 0.0 {
				config.layout.gravity = gravity;
			} else {
				warn!("Ignoring out-of-range gravity {gravity}");
			}
		}
		if let Some(flag) = lookup("barnes_hut").and_then(|raw| parsed("barnes_hut", &raw)) {
			config.layout.barnes_hut_optimize = flag;
		}
		if let Some(flag) = lookup("autostart").and_then(|raw| parsed("autostart", &raw)) {
			config.autostart = flag;
		}
		if let Some(strict) = lookup("strict").and_then(|raw| parsed::<bool>("strict", &raw)) {
			config.policy = if strict {
				DocumentPolicy::Strict
			} else {
				DocumentPolicy::Lenient
			};
		}
		match lookup("show").as_deref() {
			None | Some("") => {}
			Some("all") => config.node_display = NodeDisplay::AllAttributes,
			Some(key) => config.node_display = NodeDisplay::Attribute(key.to_string()),
		}

		config
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	fn config(pairs: &[(&str, &str)]) -> ViewerConfig {
		let params: HashMap<_, _> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
		ViewerConfig::from_params(|key| params.get(key).cloned())
	}

	#[test]
	fn defaults_without_query_parameters() {
		let config = config(&[]);
		assert_eq!(config, ViewerConfig::default());
		assert_eq!(config.document_path, "graph.json");
		assert_eq!(config.mode, LayoutMode::Continuous);
		assert_eq!(config.layout.gravity, 1.0);
		assert!(config.layout.barnes_hut_optimize);
	}

	#[test]
	fn query_overrides_are_applied() {
		let config = config(&[
			("graph", "data/other.json"),
			("iterations", "100"),
			("gravity", "0.5"),
			("barnes_hut", "false"),
			("show", "all"),
			("strict", "true"),
			("autostart", "false"),
		]);
		assert_eq!(config.document_path, "data/other.json");
		assert_eq!(config.mode, LayoutMode::Batch { iterations: 100 });
		assert_eq!(config.layout.gravity, 0.5);
		assert!(!config.layout.barnes_hut_optimize);
		assert_eq!(config.node_display, NodeDisplay::AllAttributes);
		assert_eq!(config.policy, DocumentPolicy::Strict);
		assert!(!config.autostart);
	}

	#[test]
	fn invalid_values_keep_defaults() {
		let config = config(&[
			("graph", "  "),
			("iterations", "lots"),
			("gravity", "-3"),
			("barnes_hut", "yes"),
		]);
		assert_eq!(config, ViewerConfig::default());
	}

	#[test]
	fn show_selects_a_single_attribute() {
		let config = config(&[("show", "label")]);
		assert_eq!(config.node_display, NodeDisplay::Attribute("label".into()));
	}
}
