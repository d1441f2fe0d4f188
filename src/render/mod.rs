//! Rendering adapter: geometry and style in, SVG element trees out.
//!
//! The renderer holds no annotation state. Callers (the annotator) decide
//! what to draw and with which resolved style; every geometry kind is
//! handled by one exhaustive match.

mod svg;

pub use svg::SvgElement;

use crate::manager::Label;
use crate::model::{
    Annotation, ArrowHead, ArrowPosition, Bounds, Color, DEFAULT_FONT_SIZE, Geometry, Point, Style,
};
use crate::shape::EditHandle;

/// Arrow head length at stroke width 0.
const ARROW_BASE_LENGTH: f64 = 10.0;

/// Point markers are drawn as circles of this radius.
const POINT_MARKER_RADIUS: f64 = 5.0;

/// Edit handles are drawn as squares of this side.
const HANDLE_SIZE: f64 = 8.0;

/// Label text sits this far above its anchor.
const LABEL_OFFSET: f64 = 4.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct SvgRenderer;

impl SvgRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Draw one annotation as a `<g>` tagged with its id.
    pub fn render_annotation(&self, annotation: &Annotation, style: &Style) -> SvgElement {
        SvgElement::new("g")
            .attr("class", "dz-annotation")
            .attr("data-id", &annotation.id)
            .child(self.render_geometry(annotation.geometry(), style))
    }

    pub fn render_geometry(&self, geometry: &Geometry, style: &Style) -> SvgElement {
        let element = match geometry {
            Geometry::Rectangle { x, y, w, h } => SvgElement::new("rect")
                .attr("x", x)
                .attr("y", y)
                .attr("width", w)
                .attr("height", h),
            Geometry::Circle { cx, cy, r } => SvgElement::new("circle")
                .attr("cx", cx)
                .attr("cy", cy)
                .attr("r", r),
            Geometry::Ellipse { cx, cy, rx, ry } => SvgElement::new("ellipse")
                .attr("cx", cx)
                .attr("cy", cy)
                .attr("rx", rx)
                .attr("ry", ry),
            Geometry::Polygon { points } => {
                SvgElement::new("polygon").attr("points", points_attr(points))
            }
            Geometry::Point { x, y } => SvgElement::new("circle")
                .attr("class", "dz-point")
                .attr("cx", x)
                .attr("cy", y)
                .attr("r", POINT_MARKER_RADIUS),
            Geometry::Text { x, y, text, style: text_style } => {
                let size = text_style
                    .as_ref()
                    .and_then(|s| s.font_size)
                    .unwrap_or(style.font_size);
                return SvgElement::new("text")
                    .attr("x", x)
                    .attr("y", y + size)
                    .attr("font-size", size)
                    .attr("font-family", &style.font_family)
                    .attr("fill", style.stroke.to_hex())
                    .text(text.as_str());
            }
            Geometry::PolylineArrow { points, arrows } => {
                return self.render_arrow(points, arrows, style);
            }
        };
        apply_style(element, style)
    }

    fn render_arrow(&self, points: &[Point], arrows: &[ArrowHead], style: &Style) -> SvgElement {
        let line = apply_style(
            SvgElement::new("polyline").attr("points", points_attr(points)),
            style,
        )
        .attr("fill", "none");

        let mut group = SvgElement::new("g").attr("class", "dz-arrow").child(line);
        for head in arrows {
            if let Some(triangle) = arrow_head(points, head, style.stroke_width) {
                group = group.child(
                    SvgElement::new("polygon")
                        .attr("points", points_attr(&triangle))
                        .attr("fill", style.stroke.to_hex())
                        .attr("fill-opacity", style.stroke_opacity),
                );
            }
        }
        group
    }

    /// Dashed box around a group.
    pub fn render_group_bounds(
        &self,
        bounds: &Bounds,
        color: Option<Color>,
        style: &Style,
    ) -> SvgElement {
        let mut style = style.clone();
        if let Some(color) = color {
            style.stroke = color;
        }
        apply_style(
            SvgElement::new("rect")
                .attr("class", "dz-group")
                .attr("x", bounds.x)
                .attr("y", bounds.y)
                .attr("width", bounds.width)
                .attr("height", bounds.height),
            &style,
        )
    }

    pub fn render_label(&self, label: &Label, color: Color) -> SvgElement {
        SvgElement::new("text")
            .attr("class", "dz-label")
            .attr("data-id", &label.annotation_id)
            .attr("x", label.anchor.x)
            .attr("y", label.anchor.y - LABEL_OFFSET)
            .attr("font-size", DEFAULT_FONT_SIZE * 0.75)
            .attr("fill", color.to_hex())
            .text(label.text.as_str())
    }

    /// In-progress tool geometry.
    pub fn render_preview(&self, geometry: &Geometry, style: &Style) -> SvgElement {
        SvgElement::new("g")
            .attr("class", "dz-preview")
            .child(self.render_geometry(geometry, style))
    }

    pub fn render_handles(&self, handles: &[EditHandle], color: Color) -> SvgElement {
        let mut group = SvgElement::new("g").attr("class", "dz-handles");
        for handle in handles {
            group = group.child(
                SvgElement::new("rect")
                    .attr("data-handle", handle.index)
                    .attr("x", handle.position.x - HANDLE_SIZE / 2.0)
                    .attr("y", handle.position.y - HANDLE_SIZE / 2.0)
                    .attr("width", HANDLE_SIZE)
                    .attr("height", HANDLE_SIZE)
                    .attr("fill", color.to_hex()),
            );
        }
        group
    }
}

fn apply_style(element: SvgElement, style: &Style) -> SvgElement {
    let mut element = element
        .attr("stroke", style.stroke.to_hex())
        .attr("stroke-width", style.stroke_width)
        .attr("stroke-opacity", style.stroke_opacity);
    element = match style.fill {
        Some(fill) => element
            .attr("fill", fill.to_hex())
            .attr("fill-opacity", style.fill_opacity),
        None => element.attr("fill", "none"),
    };
    if !style.dash.is_empty() {
        let dash: Vec<String> = style.dash.iter().map(f64::to_string).collect();
        element = element.attr("stroke-dasharray", dash.join(" "));
    }
    element
}

fn points_attr(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Triangle for one arrow head, tip first. None for a degenerate segment.
fn arrow_head(points: &[Point], head: &ArrowHead, stroke_width: f64) -> Option<[Point; 3]> {
    let a = *points.get(head.segment)?;
    let b = *points.get(head.segment + 1)?;
    let (tip, tail) = match head.position {
        ArrowPosition::End => (b, a),
        ArrowPosition::Start => (a, b),
    };
    let len = tip.distance_to(&tail);
    if len == 0.0 {
        return None;
    }
    let (ux, uy) = ((tip.x - tail.x) / len, (tip.y - tail.y) / len);
    let length = ARROW_BASE_LENGTH + stroke_width * 2.0;
    let half = length / 2.0;
    let base = Point::new(tip.x - ux * length, tip.y - uy * length);
    Some([
        tip,
        Point::new(base.x - uy * half, base.y + ux * half),
        Point::new(base.x + uy * half, base.y - ux * half),
    ])
}
