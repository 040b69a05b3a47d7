use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::model::GraphModel;
use super::state::{ViewState, is_arrow, node_color, node_label, node_radius};

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub fn render(state: &ViewState, ctx: &CanvasRenderingContext2d) {
	// The layout is mid-step; keep the previous frame.
	let Ok(model) = state.model.try_borrow() else {
		return;
	};
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, &model, ctx);
	draw_nodes(state, &model, ctx);
	ctx.restore();
}

fn draw_edges(state: &ViewState, model: &GraphModel, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (line_width, dash, gap, arrow_size) = (1.5 / k, 8.0 / k, 4.0 / k, 8.0 / k);
	let dash_offset = -(state.flow_time * 30.0) % (dash + gap);
	let t = ease_out_cubic(state.hover.highlight_t);

	for edge in model.edges() {
		let (Some(n1), Some(n2)) = (model.node(edge.source()), model.node(edge.target())) else {
			continue;
		};
		let (Some(p1), Some(p2)) = (n1.position(), n2.position()) else {
			continue;
		};
		let (dx, dy) = (p2.x - p1.x, p2.y - p1.y);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}

		let is_highlighted =
			state.is_highlighted(edge.source()) && state.is_highlighted(edge.target());

		// t=0: all edges at base (0.6), t=1: highlighted at 0.9, others at 0.15
		let (edge_alpha, arrow_alpha, width) = if is_highlighted {
			(0.6 + 0.3 * t, 0.8 + 0.1 * t, line_width * (1.0 + 0.3 * t))
		} else {
			(0.6 - 0.45 * t, 0.8 - 0.45 * t, line_width * (1.0 - 0.3 * t))
		};

		let arrow = is_arrow(edge.attributes());
		let (r1, r2) = (node_radius(n1.attributes()), node_radius(n2.attributes()));
		let head = if arrow { arrow_size } else { 0.0 };

		ctx.set_stroke_style_str(&format!("rgba(100, 180, 255, {})", edge_alpha));
		ctx.set_line_width(width);
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(dash),
			&JsValue::from_f64(gap),
		));
		ctx.set_line_dash_offset(dash_offset);

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.begin_path();
		ctx.move_to(p1.x + ux * r1, p1.y + uy * r1);
		ctx.line_to(p2.x - ux * (r2 + head), p2.y - uy * (r2 + head));
		ctx.stroke();

		if !arrow {
			continue;
		}
		let _ = ctx.set_line_dash(&js_sys::Array::new());
		ctx.set_fill_style_str(&format!("rgba(100, 180, 255, {})", arrow_alpha));
		let (tip_x, tip_y) = (p2.x - ux * r2, p2.y - uy * r2);
		let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
		let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn draw_label(ctx: &CanvasRenderingContext2d, label: &str, x: f64, y: f64, k: f64, fill: &str) {
	ctx.set_fill_style_str(fill);
	ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
	let _ = ctx.fill_text(label, x, y);
}

fn draw_nodes(state: &ViewState, model: &GraphModel, ctx: &CanvasRenderingContext2d) {
	let (has_highlight, t, k) = (
		state.has_active_highlight(),
		ease_out_cubic(state.hover.highlight_t),
		state.transform.k,
	);

	for (slot, node) in model.nodes().enumerate() {
		if has_highlight && state.is_highlighted(slot) {
			continue;
		}
		let Some(p) = node.position() else {
			continue;
		};
		let base = node_radius(node.attributes());
		let (alpha, radius) = (1.0 - 0.7 * t, base * (1.0 - 0.15 * t));

		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(p.x, p.y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&node_color(node.attributes()));
		ctx.fill();
		ctx.set_global_alpha(1.0);

		if let Some(label) = node_label(node.attributes()) {
			let fill = format!("rgba(255, 255, 255, {})", alpha * 0.8);
			draw_label(ctx, label, p.x + radius + 3.0, p.y + 3.0, k, &fill);
		}
	}

	if !has_highlight {
		return;
	}

	for (slot, node) in model.nodes().enumerate() {
		if !state.is_highlighted(slot) {
			continue;
		}
		let Some(p) = node.position() else {
			continue;
		};
		let base = node_radius(node.attributes());
		let is_hovered = state.is_hovered(slot);
		let is_neighbor =
			state.hover.neighbors.contains(&slot) || state.hover.prev_neighbors.contains(&slot);

		let (radius, glow_radius) = if is_hovered {
			(base * (1.0 + 0.35 * t), base * (1.8 + 1.2 * t))
		} else if is_neighbor {
			(base * (1.0 + 0.2 * t), base * (1.4 + 0.6 * t))
		} else {
			(base, 0.0)
		};

		if glow_radius > 0.0 && t > 0.01 {
			if let Ok(gradient) = ctx.create_radial_gradient(p.x, p.y, radius * 0.3, p.x, p.y, glow_radius)
			{
				let alpha = if is_hovered { 0.35 * t } else { 0.2 * t };
				let _ = gradient.add_color_stop(0.0, &format!("rgba(255, 255, 255, {})", alpha));
				let _ =
					gradient.add_color_stop(0.6, &format!("rgba(200, 220, 255, {})", alpha * 0.3));
				let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
				ctx.begin_path();
				let _ = ctx.arc(p.x, p.y, glow_radius, 0.0, 2.0 * PI);
				#[allow(deprecated)]
				ctx.set_fill_style(&gradient);
				ctx.fill();
			}
		}

		ctx.begin_path();
		let _ = ctx.arc(p.x, p.y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&node_color(node.attributes()));
		ctx.fill();

		if is_hovered && t > 0.01 {
			ctx.begin_path();
			let _ = ctx.arc(p.x, p.y, radius + 2.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.7 * t));
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}

		if let Some(label) = node_label(node.attributes()) {
			draw_label(ctx, label, p.x + radius + 3.0, p.y + 3.0, k, "white");
		}
	}
}
