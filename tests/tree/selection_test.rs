use std::collections::BTreeSet;

use atoll::model::{BoundaryHierarchyDefinition, Cell, FlatRecordSet, HierarchyLevel};
use atoll::tree::{
    apply_selection, build, compute_options, filter_tree, HierarchicalTree, SelectionState,
};

fn hierarchy() -> BoundaryHierarchyDefinition {
    BoundaryHierarchyDefinition::load(vec![
        HierarchyLevel {
            boundary_type: "Country".into(),
            parent_boundary_type: None,
        },
        HierarchyLevel {
            boundary_type: "District".into(),
            parent_boundary_type: Some("Country".into()),
        },
        HierarchyLevel {
            boundary_type: "Facility".into(),
            parent_boundary_type: Some("District".into()),
        },
    ])
    .unwrap()
}

fn tree() -> HierarchicalTree {
    let sheet = FlatRecordSet::new(
        "boundary_data",
        vec![
            "Country".into(),
            "District".into(),
            "Facility".into(),
            "Population".into(),
        ],
        vec![
            vec![
                Cell::Text("IN".into()),
                Cell::Text("D1".into()),
                Cell::Text("F1".into()),
                Cell::Number(10.0),
            ],
            vec![
                Cell::Text("IN".into()),
                Cell::Text("D1".into()),
                Cell::Text("F2".into()),
                Cell::Number(20.0),
            ],
            vec![
                Cell::Text("IN".into()),
                Cell::Text("D2".into()),
                Cell::Text("F3".into()),
                Cell::Number(30.0),
            ],
        ],
    );
    build(&hierarchy(), &[&sheet])
}

fn names(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn test_no_selection_offers_roots_only() {
    let options = compute_options(&tree(), &hierarchy(), &SelectionState::new());
    assert_eq!(options.len(), 3);
    assert_eq!(options[0].boundary_type, "Country");
    assert_eq!(options[0].options, vec!["IN"]);
    assert!(options[1].options.is_empty());
    assert!(options[2].options.is_empty());
}

#[test]
fn test_options_follow_selected_parents() {
    let mut selections = SelectionState::new();
    selections.set("Country", names(&["IN"]));

    let options = compute_options(&tree(), &hierarchy(), &selections);
    assert_eq!(options[1].options, vec!["D1", "D2"]);
    assert!(options[2].options.is_empty());

    selections.set("District", names(&["D1"]));
    let options = compute_options(&tree(), &hierarchy(), &selections);
    assert_eq!(options[2].options, vec!["F1", "F2"]);
}

#[test]
fn test_filter_keeps_unselected_levels_whole() {
    let mut selections = SelectionState::new();
    selections.set("District", names(&["D1"]));

    let filtered = filter_tree(&tree(), &hierarchy(), &selections);
    // No Country selection: the root passes through.
    let root = &filtered["IN"];
    assert_eq!(root.children.len(), 1);
    assert!(root.children.contains_key("D1"));
    // No Facility selection: D1's children pass through.
    assert_eq!(root.children["D1"].children.len(), 2);
}

#[test]
fn test_deselecting_ancestor_clears_implied_descendants() {
    let tree = tree();
    let mut selections = SelectionState::new();
    selections = apply_selection("District", names(&["D1"]), &tree, &selections);
    selections = apply_selection("Facility", names(&["F1"]), &tree, &selections);

    // Deselect D1: F1 is no longer reachable unambiguously.
    selections = apply_selection("District", BTreeSet::new(), &tree, &selections);
    assert!(selections.get("District").is_empty());
    assert!(selections.get("Facility").is_empty());
}

#[test]
fn test_pruning_leaves_unrelated_selections_untouched() {
    let tree = tree();
    let mut selections = SelectionState::new();
    selections = apply_selection("District", names(&["D1", "D2"]), &tree, &selections);
    selections = apply_selection("Facility", names(&["F1", "F3"]), &tree, &selections);

    // Removing D1 strips its descendants (F1, F2) but not D2's F3.
    selections = apply_selection("District", names(&["D2"]), &tree, &selections);
    assert_eq!(selections.get("Facility"), names(&["F3"]));
}

#[test]
fn test_adding_a_selection_prunes_nothing() {
    let tree = tree();
    let mut selections = SelectionState::new();
    selections = apply_selection("District", names(&["D1"]), &tree, &selections);
    selections = apply_selection("Facility", names(&["F1"]), &tree, &selections);

    selections = apply_selection("District", names(&["D1", "D2"]), &tree, &selections);
    assert_eq!(selections.get("Facility"), names(&["F1"]));
}
