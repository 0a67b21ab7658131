//! Vector export of a board.
//!
//! DESIGN
//! ======
//! `export_svg` is a pure function of the element and stroke collections: no
//! session, network, or gesture state is consulted. Each element or stroke
//! maps to exactly one top-level node tagged with `data-id`. Elements are
//! painted in z-order, strokes above them.

#[cfg(test)]
#[path = "export_test.rs"]
mod export_test;

use frames::consts::{CANVAS_HEIGHT, CANVAS_WIDTH};
use frames::{Element, ElementKind, Stroke};

const FONT_SIZE: f64 = 16.0;
const TEXT_PADDING: f64 = 8.0;
const SHAPE_BORDER_WIDTH: f64 = 2.0;
const STICKY_TEXT_COLOR: &str = "#1c2024";

#[derive(Clone, Debug, PartialEq)]
pub struct ExportOptions {
    pub width: f64,
    pub height: f64,
    /// Fill painted behind everything; `None` leaves the document transparent.
    pub background: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { width: CANVAS_WIDTH, height: CANVAS_HEIGHT, background: Some("#ffffff".to_owned()) }
    }
}

/// Render elements and strokes into a standalone SVG document.
#[must_use]
pub fn export_svg(elements: &[Element], strokes: &[Stroke], options: &ExportOptions) -> String {
    let width = num(options.width);
    let height = num(options.height);
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push('\n');
    out.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" version="1.1" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    ));
    out.push('\n');

    if let Some(background) = &options.background {
        out.push_str(&format!(
            r#"<rect width="{width}" height="{height}" fill="{}"/>"#,
            escape(background)
        ));
        out.push('\n');
    }

    for element in elements {
        out.push_str(&element_node(element));
        out.push('\n');
    }
    for stroke in strokes {
        out.push_str(&stroke_node(stroke));
        out.push('\n');
    }

    out.push_str("</svg>\n");
    out
}

// =============================================================================
// NODES
// =============================================================================

fn element_node(element: &Element) -> String {
    let id = escape(&element.id);
    let (x, y) = (num(element.x), num(element.y));
    let (w, h) = (num(element.w.max(0.0)), num(element.h.max(0.0)));

    match &element.kind {
        ElementKind::Text { content, color } => text_block(&format!(r#"data-id="{id}" "#), element, content, color),
        ElementKind::Sticky { content, color } => format!(
            r#"<g data-id="{id}"><rect x="{x}" y="{y}" width="{w}" height="{h}" fill="{}"/>{}</g>"#,
            escape(color),
            text_block("", element, content, STICKY_TEXT_COLOR),
        ),
        ElementKind::Shape { color } => format!(
            r#"<rect data-id="{id}" x="{x}" y="{y}" width="{w}" height="{h}" fill="none" stroke="{}" stroke-width="{}"/>"#,
            escape(color),
            num(SHAPE_BORDER_WIDTH),
        ),
        ElementKind::Image { source } => format!(
            r#"<image data-id="{id}" x="{x}" y="{y}" width="{w}" height="{h}" preserveAspectRatio="none" xlink:href="{}"/>"#,
            escape(source),
        ),
    }
}

/// `<text>` positioned inside the element box, one `<tspan>` per line.
fn text_block(attrs: &str, element: &Element, content: &str, color: &str) -> String {
    let x = num(element.x + TEXT_PADDING);
    let y = num(element.y + TEXT_PADDING);
    let mut out = format!(
        r#"<text {attrs}x="{x}" y="{y}" font-size="{}" fill="{}" dominant-baseline="hanging">"#,
        num(FONT_SIZE),
        escape(color),
    );
    for (i, line) in content.lines().enumerate() {
        let dy = if i == 0 { "0" } else { "1.2em" };
        out.push_str(&format!(r#"<tspan x="{x}" dy="{dy}">{}</tspan>"#, escape(line)));
    }
    out.push_str("</text>");
    out
}

fn stroke_node(stroke: &Stroke) -> String {
    format!(
        r#"<path data-id="{}" d="{}" fill="none" stroke="{}" stroke-width="{}" stroke-linecap="round" stroke-linejoin="round"/>"#,
        escape(&stroke.id),
        path_data(&stroke.points),
        escape(&stroke.color),
        num(stroke.width),
    )
}

/// Move to the first point, line through the rest. A lone point becomes a
/// zero-length segment so the round cap paints a dot.
fn path_data(points: &[[f64; 2]]) -> String {
    let Some((first, rest)) = points.split_first() else {
        return String::new();
    };
    let mut d = format!("M {} {}", num(first[0]), num(first[1]));
    if rest.is_empty() {
        d.push_str(&format!(" L {} {}", num(first[0]), num(first[1])));
    }
    for [x, y] in rest {
        d.push_str(&format!(" L {} {}", num(*x), num(*y)));
    }
    d
}

// =============================================================================
// FORMATTING
// =============================================================================

/// Shortest decimal form. Non-finite values and negative zero print as `0`.
fn num(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0".to_owned();
    }
    format!("{value}")
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
