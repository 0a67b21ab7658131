use super::*;
use frames::ElementKind;

fn shape(id: &str, x: f64) -> Element {
    Element { id: id.to_owned(), x, y: 0.0, w: 10.0, h: 10.0, kind: ElementKind::Shape { color: "#000".to_owned() } }
}

fn stroke(id: &str) -> Stroke {
    Stroke { id: id.to_owned(), points: vec![[0.0, 0.0]], color: "#000".to_owned(), width: 1.0 }
}

#[test]
fn update_of_unknown_element_changes_nothing() {
    let (mut elements, mut strokes) = (vec![shape("a", 0.0)], Vec::new());
    Change::UpdateElement(shape("b", 5.0)).apply(&mut elements, &mut strokes);
    Change::UpdateElement(shape("a", 5.0)).apply(&mut elements, &mut strokes);
    assert_eq!(elements, vec![shape("a", 5.0)]);
}

#[test]
fn clear_empties_both_layers() {
    let (mut elements, mut strokes) = (vec![shape("a", 0.0)], vec![stroke("s")]);
    Change::Clear.apply(&mut elements, &mut strokes);
    assert!(elements.is_empty() && strokes.is_empty());
}

#[test]
fn projection_applies_changes_in_send_order() {
    let mut pending = PendingChanges::default();
    pending.push("r1", Change::AddElement(shape("n", 1.0)));
    pending.push("r2", Change::UpdateElement(shape("n", 2.0)));
    pending.push("r3", Change::AddStroke(stroke("s")));

    let (elements, strokes) = pending.project(&[shape("a", 0.0)], &[]);
    assert_eq!(elements, vec![shape("a", 0.0), shape("n", 2.0)]);
    assert_eq!(strokes.len(), 1);
}

#[test]
fn settle_removes_only_the_answered_change() {
    let mut pending = PendingChanges::default();
    pending.push("r1", Change::DeleteElement("a".to_owned()));
    pending.push("r2", Change::Clear);

    assert_eq!(pending.settle("r2"), Some(Change::Clear));
    assert_eq!(pending.settle("r2"), None);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending.settle("r1"), Some(Change::DeleteElement("a".to_owned())));
    assert!(pending.is_empty());
}
