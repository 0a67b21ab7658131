use super::*;

#[test]
fn empty_session_gets_first_palette_entry() {
    assert_eq!(allocate(&HashSet::new()), PRESENCE_PALETTE[0]);
}

#[test]
fn skips_colors_already_in_use() {
    let in_use: HashSet<&str> = [PRESENCE_PALETTE[0], PRESENCE_PALETTE[1]].into_iter().collect();
    assert_eq!(allocate(&in_use), PRESENCE_PALETTE[2]);
}

#[test]
fn reuses_freed_color() {
    let in_use: HashSet<&str> = [PRESENCE_PALETTE[1]].into_iter().collect();
    assert_eq!(allocate(&in_use), PRESENCE_PALETTE[0]);
}

#[test]
fn full_palette_still_yields_a_palette_color() {
    let in_use: HashSet<&str> = PRESENCE_PALETTE.iter().copied().collect();
    let color = allocate(&in_use);
    assert!(PRESENCE_PALETTE.contains(&color.as_str()));
}

#[test]
fn sequential_allocations_are_distinct_until_exhausted() {
    let mut taken: Vec<String> = Vec::new();
    for _ in 0..PRESENCE_PALETTE.len() {
        let in_use: HashSet<&str> = taken.iter().map(String::as_str).collect();
        let color = allocate(&in_use);
        assert!(!taken.contains(&color));
        taken.push(color);
    }
}
