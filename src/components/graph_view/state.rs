use std::collections::HashSet;

use serde_json::Value;

use super::model::{GraphModel, SharedModel};
use super::types::Attributes;

const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

pub const NODE_RADIUS: f64 = 5.0;
pub const HIT_RADIUS: f64 = 12.0;
/// Pointer travel below which a press and release count as a click.
pub const CLICK_SLOP: f64 = 4.0;

pub fn node_color(attributes: &Attributes) -> String {
	if let Some(color) = attributes.get("color").and_then(Value::as_str) {
		return color.to_string();
	}
	let group = attributes.get("group").and_then(Value::as_u64).unwrap_or(0);
	COLORS[group as usize % COLORS.len()].to_string()
}

pub fn node_radius(attributes: &Attributes) -> f64 {
	attributes
		.get("size")
		.and_then(Value::as_f64)
		.filter(|size| size.is_finite() && *size > 0.0)
		.unwrap_or(NODE_RADIUS)
}

pub fn node_label(attributes: &Attributes) -> Option<&str> {
	attributes.get("label").and_then(Value::as_str)
}

pub fn is_arrow(attributes: &Attributes) -> bool {
	attributes.get("type").and_then(Value::as_str) == Some("arrow")
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<usize>,
	pub neighbors: HashSet<usize>,
	pub highlight_t: f64,
	pub prev_node: Option<usize>,
	pub prev_neighbors: HashSet<usize>,
	delay_t: f64,
}

/// Pan, zoom and hover state of one canvas surface.
pub struct ViewState {
	pub model: SharedModel,
	pub transform: ViewTransform,
	pub pan: PanState,
	pub hover: HoverState,
	pub width: f64,
	pub height: f64,
	pub flow_time: f64,
}

impl ViewState {
	pub fn new(model: SharedModel, width: f64, height: f64) -> Self {
		Self {
			model,
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			pan: PanState::default(),
			hover: HoverState::default(),
			width,
			height,
			flow_time: 0.0,
		}
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Closest node under a screen position, by slot.
	pub fn node_at_position(&self, model: &GraphModel, sx: f64, sy: f64) -> Option<usize> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut found: Option<(usize, f64)> = None;
		for (slot, node) in model.nodes().enumerate() {
			let Some(p) = node.position() else {
				continue;
			};
			let dist = ((p.x - gx).powi(2) + (p.y - gy).powi(2)).sqrt();
			// HIT_RADIUS is in world-space, scales with zoom like nodes
			let reach = HIT_RADIUS.max(node_radius(node.attributes()));
			if dist < reach && found.is_none_or(|(_, best)| dist < best) {
				found = Some((slot, dist));
			}
		}
		found.map(|(slot, _)| slot)
	}

	pub fn set_hover(&mut self, node: Option<usize>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Save previous state for fade-out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let Some(slot) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			if let Ok(model) = self.model.try_borrow() {
				self.hover.neighbors.extend(model.neighbors(slot).filter(|&n| n != slot));
			}
		}
	}

	pub fn is_highlighted(&self, slot: usize) -> bool {
		self.hover.node == Some(slot)
			|| self.hover.neighbors.contains(&slot)
			|| self.hover.prev_node == Some(slot)
			|| self.hover.prev_neighbors.contains(&slot)
	}

	pub fn is_hovered(&self, slot: usize) -> bool {
		self.hover.node == Some(slot) || self.hover.prev_node == Some(slot)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	/// Advances edge flow and hover easing. Positions belong to the layout.
	pub fn animate(&mut self, dt: f64) {
		self.flow_time += dt;

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	pub fn begin_pan(&mut self, x: f64, y: f64) {
		self.pan = PanState {
			active: true,
			moved: false,
			start_x: x,
			start_y: y,
			transform_start_x: self.transform.x,
			transform_start_y: self.transform.y,
		};
	}

	pub fn pan_to(&mut self, x: f64, y: f64) {
		if !self.pan.active {
			return;
		}
		let (dx, dy) = (x - self.pan.start_x, y - self.pan.start_y);
		if dx.hypot(dy) >= CLICK_SLOP {
			self.pan.moved = true;
		}
		if self.pan.moved {
			self.transform.x = self.pan.transform_start_x + dx;
			self.transform.y = self.pan.transform_start_y + dy;
		}
	}

	/// Ends a press; returns true when it never travelled far enough to be a drag.
	pub fn end_pan(&mut self) -> bool {
		let was_click = self.pan.active && !self.pan.moved;
		self.pan = PanState::default();
		was_click
	}

	pub fn zoom_at(&mut self, x: f64, y: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		let new_k = (self.transform.k * factor).clamp(0.1, 10.0);
		let ratio = new_k / self.transform.k;
		self.transform.x = x - (x - self.transform.x) * ratio;
		self.transform.y = y - (y - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.transform.x += (width - self.width) / 2.0;
		self.transform.y += (height - self.height) / 2.0;
		self.width = width;
		self.height = height;
	}
}
