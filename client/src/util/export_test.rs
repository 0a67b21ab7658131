use super::*;

fn element(id: &str, kind: ElementKind) -> Element {
    Element { id: id.to_owned(), x: 10.0, y: 20.0, w: 100.0, h: 50.0, kind }
}

fn stroke(id: &str, points: Vec<[f64; 2]>) -> Stroke {
    Stroke { id: id.to_owned(), points, color: "#0090ff".to_owned(), width: 3.0 }
}

fn node_count(svg: &str) -> usize {
    svg.matches("data-id=").count()
}

#[test]
fn empty_board_is_sized_document_with_background() {
    let svg = export_svg(&[], &[], &ExportOptions::default());
    assert!(svg.starts_with("<?xml"));
    assert!(svg.contains(r#"width="1920" height="1080" viewBox="0 0 1920 1080""#));
    assert!(svg.contains(r##"<rect width="1920" height="1080" fill="#ffffff"/>"##));
    assert!(svg.trim_end().ends_with("</svg>"));
    assert_eq!(node_count(&svg), 0);
}

#[test]
fn transparent_export_omits_background() {
    let options = ExportOptions { width: 800.0, height: 600.0, background: None };
    let svg = export_svg(&[], &[], &options);
    assert!(svg.contains(r#"viewBox="0 0 800 600""#));
    assert!(!svg.contains("<rect"));
}

#[test]
fn one_node_per_element_and_stroke() {
    let elements = vec![
        element("t", ElementKind::Text { content: "hi".to_owned(), color: "#000".to_owned() }),
        element("s", ElementKind::Sticky { content: "note".to_owned(), color: "#ffc53d".to_owned() }),
        element("r", ElementKind::Shape { color: "#e5484d".to_owned() }),
        element("i", ElementKind::Image { source: "https://cdn.test/a.png".to_owned() }),
    ];
    let strokes = vec![stroke("p1", vec![[0.0, 0.0], [5.0, 5.0]]), stroke("p2", vec![[1.0, 1.0]])];
    let svg = export_svg(&elements, &strokes, &ExportOptions::default());
    assert_eq!(node_count(&svg), 6);
}

#[test]
fn elements_paint_in_z_order_below_strokes() {
    let elements = vec![
        element("a", ElementKind::Shape { color: "#000".to_owned() }),
        element("b", ElementKind::Shape { color: "#000".to_owned() }),
    ];
    let strokes = vec![stroke("z", vec![[0.0, 0.0]])];
    let svg = export_svg(&elements, &strokes, &ExportOptions::default());
    let pos = |id: &str| svg.find(&format!(r#"data-id="{id}""#)).expect("node present");
    assert!(pos("a") < pos("b"));
    assert!(pos("b") < pos("z"));
}

#[test]
fn shape_is_bordered_rectangle() {
    let svg = export_svg(&[element("r", ElementKind::Shape { color: "#e5484d".to_owned() })], &[], &ExportOptions::default());
    assert!(svg.contains(
        r##"<rect data-id="r" x="10" y="20" width="100" height="50" fill="none" stroke="#e5484d" stroke-width="2"/>"##
    ));
}

#[test]
fn image_references_source_at_stored_geometry() {
    let svg = export_svg(
        &[element("i", ElementKind::Image { source: "https://cdn.test/a.png?w=1&h=2".to_owned() })],
        &[],
        &ExportOptions::default(),
    );
    assert!(svg.contains(r#"<image data-id="i" x="10" y="20" width="100" height="50""#));
    assert!(svg.contains(r#"xlink:href="https://cdn.test/a.png?w=1&amp;h=2""#));
}

#[test]
fn sticky_is_group_with_fill_and_text() {
    let sticky = element("s", ElementKind::Sticky { content: "one\ntwo".to_owned(), color: "#ffc53d".to_owned() });
    let svg = export_svg(&[sticky], &[], &ExportOptions::default());
    assert!(svg.contains(r##"<g data-id="s"><rect x="10" y="20" width="100" height="50" fill="#ffc53d"/><text "##));
    assert!(svg.contains(r#"<tspan x="18" dy="0">one</tspan><tspan x="18" dy="1.2em">two</tspan>"#));
}

#[test]
fn text_content_is_escaped() {
    let text = element("t", ElementKind::Text { content: "<b> & \"q\"".to_owned(), color: "#000".to_owned() });
    let svg = export_svg(&[text], &[], &ExportOptions::default());
    assert!(svg.contains("&lt;b&gt; &amp; &quot;q&quot;"));
    assert!(!svg.contains("<b>"));
}

#[test]
fn stroke_path_runs_through_points_in_order() {
    let svg = export_svg(&[], &[stroke("p", vec![[0.0, 0.0], [1.5, 2.0], [3.0, -4.0]])], &ExportOptions::default());
    assert!(svg.contains(r#"d="M 0 0 L 1.5 2 L 3 -4""#));
    assert!(svg.contains(r##"stroke="#0090ff" stroke-width="3" stroke-linecap="round""##));
}

#[test]
fn single_point_stroke_is_a_dot() {
    let svg = export_svg(&[], &[stroke("p", vec![[4.0, 4.0]])], &ExportOptions::default());
    assert!(svg.contains(r#"d="M 4 4 L 4 4""#));
}

#[test]
fn empty_stroke_still_emits_a_path() {
    let svg = export_svg(&[], &[stroke("p", Vec::new())], &ExportOptions::default());
    assert!(svg.contains(r#"<path data-id="p" d="""#));
}

#[test]
fn non_finite_numbers_render_as_zero() {
    assert_eq!(num(f64::NAN), "0");
    assert_eq!(num(f64::INFINITY), "0");
    assert_eq!(num(-0.0), "0");
    assert_eq!(num(12.25), "12.25");
}
