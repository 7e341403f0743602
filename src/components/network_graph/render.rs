//! Canvas rendering for the network graph.
//!
//! The painter reads the scene and the interaction state and nothing else.
//! Drawing happens in passes for correct z-ordering:
//! 1. Background (screen space)
//! 2. Link arcs, then their arrowheads (world space)
//! 3. Node circles with labels, in scene order

use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::interaction::{Highlight, ViewTransform};
use super::scene::{LinkVisual, NodeVisual, Scene};
use super::simulation::Viewport;
use super::state::NetworkEditor;
use super::theme::Theme;

/// Renders the editor's scene through its current pan/zoom transform.
pub fn render(editor: &NetworkEditor, ctx: &CanvasRenderingContext2d) {
	paint(editor, ctx, editor.transform());
}

/// Renders the scene at identity zoom, as it is laid out in the viewport.
/// Used for image export.
pub fn render_export(editor: &NetworkEditor, ctx: &CanvasRenderingContext2d) {
	paint(editor, ctx, ViewTransform::default());
}

fn paint(editor: &NetworkEditor, ctx: &CanvasRenderingContext2d, transform: ViewTransform) {
	let theme = editor.theme();
	let scene = editor.scene();
	let highlight = editor.highlight();

	draw_background(ctx, editor.viewport(), theme);

	ctx.save();
	let _ = ctx.translate(transform.x, transform.y);
	let _ = ctx.scale(transform.k, transform.k);

	draw_links(ctx, scene, highlight, theme);
	draw_nodes(ctx, scene, highlight, theme);

	ctx.restore();
}

fn draw_background(ctx: &CanvasRenderingContext2d, viewport: Viewport, theme: &Theme) {
	ctx.set_fill_style_str(&theme.background.color.to_css());
	ctx.fill_rect(0.0, 0.0, viewport.width, viewport.height);
}

fn link_alpha(link: &LinkVisual, highlight: &Highlight) -> f64 {
	link.opacity.value() * highlight.link_opacity(link.key.source, link.key.target)
}

fn draw_links(ctx: &CanvasRenderingContext2d, scene: &Scene, highlight: &Highlight, theme: &Theme) {
	let edge = &theme.edge;
	ctx.set_line_width(edge.width);

	for link in scene.links() {
		let Some(path) = link.path else {
			continue;
		};
		let alpha = link_alpha(link, highlight);
		if alpha <= 0.0 {
			continue;
		}

		let (cx, cy) = path.center();
		let (start, end) = path.angles();
		ctx.set_stroke_style_str(&edge.color.with_alpha(alpha).to_css());
		ctx.begin_path();
		let _ = ctx.arc(cx, cy, path.radius, start, end);
		ctx.stroke();
	}

	for link in scene.links() {
		let Some(path) = link.path else {
			continue;
		};
		let alpha = link_alpha(link, highlight);
		if alpha <= 0.0 || path.radius < edge.arrow_inset {
			continue;
		}

		let ((tip_x, tip_y), (ux, uy)) = path.point_before_end(edge.arrow_inset);
		let size = edge.arrow_size;
		let (back_x, back_y) = (tip_x - ux * size, tip_y - uy * size);
		let (px, py) = (-uy * size * 0.5, ux * size * 0.5);

		ctx.set_fill_style_str(&edge.arrow_color.with_alpha(alpha).to_css());
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
	}
}

fn draw_nodes(ctx: &CanvasRenderingContext2d, scene: &Scene, highlight: &Highlight, theme: &Theme) {
	ctx.set_font(theme.node.label_font);
	for node in scene.nodes() {
		if node.x.is_finite() && node.y.is_finite() {
			draw_node(ctx, node, highlight, theme);
		}
	}
}

fn draw_node(
	ctx: &CanvasRenderingContext2d,
	node: &NodeVisual,
	highlight: &Highlight,
	theme: &Theme,
) {
	let style = &theme.node;
	let opacity = node.opacity.value();
	let radius = node.radius.value();
	if opacity <= 0.0 {
		return;
	}

	// Selection dims only the circle; labels stay readable.
	let circle_alpha = opacity * highlight.node_opacity(node.id);
	if radius > 0.0 {
		ctx.begin_path();
		let _ = ctx.arc(node.x, node.y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&node.color.with_alpha(circle_alpha).to_css());
		ctx.fill();
		ctx.set_stroke_style_str(&style.border_color.with_alpha(circle_alpha).to_css());
		ctx.set_line_width(style.border_width);
		ctx.stroke();
	}

	if !node.label.is_empty() {
		ctx.set_fill_style_str(&style.label_color.with_alpha(opacity).to_css());
		let _ = ctx.fill_text(
			&node.label,
			node.x + style.label_offset.0,
			node.y + style.label_offset.1,
		);
	}
}
