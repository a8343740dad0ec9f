use atoll::model::{
    BoundaryHierarchyDefinition, Cell, FeatureCollection, FlatRecordSet, HierarchyLevel,
};
use atoll::tree::{aggregate, build, NodeData};

fn two_level_hierarchy() -> BoundaryHierarchyDefinition {
    BoundaryHierarchyDefinition::load(vec![
        HierarchyLevel {
            boundary_type: "Country".into(),
            parent_boundary_type: None,
        },
        HierarchyLevel {
            boundary_type: "District".into(),
            parent_boundary_type: Some("Country".into()),
        },
    ])
    .unwrap()
}

fn population_sheet() -> FlatRecordSet {
    FlatRecordSet::new(
        "boundary_data",
        vec![
            "Country".into(),
            "District".into(),
            "boundary_code".into(),
            "Population".into(),
        ],
        vec![
            vec![
                Cell::Text("IN".into()),
                Cell::Text("D1".into()),
                Cell::Text("B1".into()),
                Cell::Number(100.0),
            ],
            vec![
                Cell::Text("IN".into()),
                Cell::Text("D2".into()),
                Cell::Text("B2".into()),
                Cell::Number(200.0),
            ],
        ],
    )
}

#[test]
fn test_numeric_fields_roll_up() {
    let hierarchy = two_level_hierarchy();
    let sheet = population_sheet();
    let tree = build(&hierarchy, &[&sheet]);

    let aggregated = aggregate(&tree);
    let root = &aggregated["IN"];
    assert_eq!(root.field("Population"), Some(&Cell::Number(300.0)));
    // Text fields never aggregate.
    assert_eq!(root.field("boundary_code"), None);
    // Children keep their own values.
    assert_eq!(
        root.children["D1"].field("Population"),
        Some(&Cell::Number(100.0))
    );
}

#[test]
fn test_input_tree_not_mutated() {
    let hierarchy = two_level_hierarchy();
    let sheet = population_sheet();
    let tree = build(&hierarchy, &[&sheet]);

    let before = tree.clone();
    let _ = aggregate(&tree);
    assert_eq!(tree, before);
}

#[test]
fn test_aggregation_is_idempotent() {
    let hierarchy = two_level_hierarchy();
    let sheet = population_sheet();
    let tree = build(&hierarchy, &[&sheet]);

    let once = aggregate(&tree);
    let twice = aggregate(&once);
    assert_eq!(once, twice);
}

#[test]
fn test_own_fields_win_over_computed_totals() {
    let hierarchy = two_level_hierarchy();
    let districts = population_sheet();
    let country = FlatRecordSet::new(
        "country_totals",
        vec!["Country".into(), "Population".into()],
        vec![vec![Cell::Text("IN".into()), Cell::Number(999.0)]],
    );

    let tree = build(&hierarchy, &[&districts, &country]);
    let aggregated = aggregate(&tree);
    assert_eq!(
        aggregated["IN"].field("Population"),
        Some(&Cell::Number(999.0))
    );
}

#[test]
fn test_non_numeric_and_missing_values_skipped() {
    let hierarchy = two_level_hierarchy();
    let sheet = FlatRecordSet::new(
        "boundary_data",
        vec!["Country".into(), "District".into(), "Population".into()],
        vec![
            vec![
                Cell::Text("IN".into()),
                Cell::Text("D1".into()),
                Cell::Number(100.0),
            ],
            vec![
                Cell::Text("IN".into()),
                Cell::Text("D2".into()),
                Cell::Text("unknown".into()),
            ],
            vec![
                Cell::Text("IN".into()),
                Cell::Text("D3".into()),
                Cell::Empty,
            ],
        ],
    );

    let aggregated = aggregate(&build(&hierarchy, &[&sheet]));
    assert_eq!(
        aggregated["IN"].field("Population"),
        Some(&Cell::Number(100.0))
    );
}

#[test]
fn test_feature_nodes_receive_totals_in_properties() {
    let hierarchy = two_level_hierarchy();

    let fc: FeatureCollection = serde_json::from_str(
        r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": { "type": "Polygon", "coordinates": [] },
                "properties": { "Country": "IN" }
            }]
        }"#,
    )
    .unwrap();
    let shapes = FlatRecordSet::from_feature_collection("shapes", &fc);
    let districts = population_sheet();

    let aggregated = aggregate(&build(&hierarchy, &[&shapes, &districts]));
    match &aggregated["IN"].data {
        NodeData::Feature(feature) => {
            assert_eq!(feature.geometry["type"], "Polygon");
            assert_eq!(feature.properties["Population"], Cell::Number(300.0));
        }
        other => panic!("expected feature data, got {:?}", other),
    }
}
