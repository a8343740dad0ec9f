use std::collections::BTreeSet;

use atoll::boundary::StaticBoundaryProvider;
use atoll::config::Settings;
use atoll::formula::{HypothesisAssumption, Operator, Rule};
use atoll::model::{
    BoundaryHierarchyDefinition, BoundaryNode, Cell, FlatRecordSet, HierarchyLevel,
};
use atoll::schema::{IssueCode, Schema};
use atoll::session::Session;
use atoll::template::TemplateOptions;
use uuid::Uuid;

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

fn boundary_forest() -> Vec<BoundaryNode> {
    vec![BoundaryNode {
        code: "IN".into(),
        name: "India".into(),
        boundary_type: "Country".into(),
        parent_code: None,
        is_root: true,
        children: vec![
            BoundaryNode {
                code: "D1".into(),
                name: "District One".into(),
                boundary_type: "District".into(),
                parent_code: Some("IN".into()),
                is_root: false,
                children: vec![],
            },
            BoundaryNode {
                code: "D2".into(),
                name: "District Two".into(),
                boundary_type: "District".into(),
                parent_code: Some("IN".into()),
                is_root: false,
                children: vec![],
            },
        ],
    }]
}

fn schema() -> Schema {
    Schema::from_json(
        r#"{ "properties": { "Population": { "type": "number", "isRequired": true } } }"#,
    )
    .unwrap()
}

fn population_sheet() -> FlatRecordSet {
    FlatRecordSet::new(
        "boundary_data",
        vec![
            "Country".into(),
            "District".into(),
            "Facility".into(),
            "boundary_code".into(),
            "Population".into(),
        ],
        vec![
            vec![
                Cell::Text("IN".into()),
                Cell::Text("D1".into()),
                Cell::Text("F1".into()),
                Cell::Text("B1".into()),
                Cell::Number(100.0),
            ],
            vec![
                Cell::Text("IN".into()),
                Cell::Text("D2".into()),
                Cell::Text("F2".into()),
                Cell::Text("B2".into()),
                Cell::Number(200.0),
            ],
        ],
    )
}

async fn session() -> Session {
    let provider = StaticBoundaryProvider::new(hierarchy(), boundary_forest());
    Session::connect(&provider, schema(), Settings::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_upload_build_aggregate() {
    let mut session = session().await;

    let report = session.upload(population_sheet()).unwrap();
    assert!(report.valid);

    let aggregated = session.aggregated_tree().unwrap();
    assert_eq!(
        aggregated["IN"].field("Population"),
        Some(&Cell::Number(300.0))
    );

    // A second call is served from the cache and stays identical.
    assert_eq!(session.aggregated_tree().unwrap(), aggregated);
}

#[tokio::test]
async fn test_reupload_deactivates_predecessor() {
    let mut session = session().await;
    session.upload(population_sheet()).unwrap();

    let mut flawed = population_sheet();
    flawed.rows[0][4] = Cell::Empty;
    let report = session.upload(flawed).unwrap();

    assert!(!report.valid);
    assert_eq!(
        report.errors.at("boundary_data", 0, "Population"),
        &[IssueCode::MissingRequired]
    );

    // The replacement is flagged but active; the original survives
    // inactive for the audit trail.
    assert_eq!(session.active_datasets().len(), 1);

    // The rebuilt aggregate reflects only the active upload.
    let aggregated = session.aggregated_tree().unwrap();
    assert_eq!(
        aggregated["IN"].field("Population"),
        Some(&Cell::Number(200.0))
    );
}

#[tokio::test]
async fn test_selection_pruning_through_session() {
    let mut session = session().await;
    session.upload(population_sheet()).unwrap();

    session.set_selection("District", BTreeSet::from(["D1".to_string()]));
    session.set_selection("Facility", BTreeSet::from(["F1".to_string()]));
    assert_eq!(
        session.selections().get("Facility"),
        BTreeSet::from(["F1".to_string()])
    );

    session.set_selection("District", BTreeSet::new());
    assert!(session.selections().get("Facility").is_empty());
}

#[tokio::test]
async fn test_filtered_tree_narrows_to_selection() {
    let mut session = session().await;
    session.upload(population_sheet()).unwrap();

    session.set_selection("Country", BTreeSet::from(["IN".to_string()]));
    session.set_selection("District", BTreeSet::from(["D1".to_string()]));

    let filtered = session.filtered_tree().unwrap();
    let root = &filtered["IN"];
    assert_eq!(root.children.len(), 1);
    assert!(root.children.contains_key("D1"));
}

#[tokio::test]
async fn test_derived_columns_over_active_dataset() {
    let mut session = session().await;
    session.upload(population_sheet()).unwrap();

    session
        .set_rules(vec![Rule {
            id: Uuid::new_v4(),
            output: "WaterNeed".into(),
            input: "Population".into(),
            operator: Operator::Multiply,
            assumption_key: "PerCapitaLitres".into(),
            active: true,
        }])
        .unwrap();
    session.set_assumptions(vec![HypothesisAssumption {
        id: Uuid::new_v4(),
        key: "PerCapitaLitres".into(),
        value: Cell::Number(5.0),
        active: true,
    }]);

    let column = session.derived_column("boundary_data", "WaterNeed").unwrap();
    assert_eq!(column, vec![Cell::Number(500.0), Cell::Number(1000.0)]);
}

#[tokio::test]
async fn test_template_from_official_boundaries() {
    let session = session().await;
    let sheets = session
        .generate_template(&TemplateOptions::default())
        .unwrap();

    assert_eq!(sheets.len(), 1);
    let sheet = &sheets[0];
    assert_eq!(
        sheet.header,
        vec![
            "Country",
            "District",
            "Facility",
            "boundary_code",
            "Population"
        ]
    );
    // One row per coded boundary: IN, D1, D2.
    assert_eq!(sheet.rows.len(), 3);
}

#[tokio::test]
async fn test_hierarchy_change_resets_derived_state() {
    let mut session = session().await;
    session.upload(population_sheet()).unwrap();
    session.set_selection("District", BTreeSet::from(["D1".to_string()]));
    session.aggregated_tree().unwrap();

    let new_hierarchy = BoundaryHierarchyDefinition::load(vec![HierarchyLevel {
        boundary_type: "Region".into(),
        parent_boundary_type: None,
    }])
    .unwrap();
    session.change_hierarchy(new_hierarchy, vec![]);

    assert!(session.selections().get("District").is_empty());
    assert!(session.boundary_roots().is_empty());
    assert_eq!(session.hierarchy().depth(), 1);
}
