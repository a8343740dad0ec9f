use atoll::ingest::{
    check_bundle, parse_feature_collection, parse_workbook, read_workbook, IngestError,
    ShapefileBundle,
};
use atoll::model::Cell;

#[test]
fn test_workbook_parses_into_record_sets() {
    let raw = r#"{
        "sheets": [
            {
                "name": "boundary_data",
                "header": ["Country", "District", "boundary_code", "Population"],
                "rows": [
                    ["IN", "D1", "B1", 100],
                    ["IN", "D2", "B2", 200]
                ]
            },
            {
                "name": "targets",
                "header": ["boundary_code", "Target"],
                "rows": [["B1", 5]]
            }
        ]
    }"#;

    let sets = parse_workbook(raw).unwrap();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].name, "boundary_data");
    assert_eq!(sets[0].rows.len(), 2);
    assert_eq!(sets[0].rows[1][3], Cell::Number(200.0));
    assert_eq!(sets[1].rows[0][0], Cell::Text("B1".into()));
    assert!(sets.iter().all(|s| s.active));
}

#[test]
fn test_workbook_with_null_cells() {
    let raw = r#"{
        "sheets": [{
            "name": "s",
            "header": ["Country", "Population"],
            "rows": [["IN", null]]
        }]
    }"#;
    let sets = parse_workbook(raw).unwrap();
    assert_eq!(sets[0].rows[0][1], Cell::Empty);
}

#[test]
fn test_malformed_workbook() {
    assert!(matches!(
        parse_workbook("{"),
        Err(IngestError::Parse { kind: "workbook", .. })
    ));
}

#[tokio::test]
async fn test_read_workbook_from_disk() {
    let path = std::env::temp_dir().join("atoll_ingest_workbook_test.json");
    std::fs::write(
        &path,
        r#"{ "sheets": [{ "name": "s", "header": ["A"], "rows": [["x"]] }] }"#,
    )
    .unwrap();

    let sets = read_workbook(&path).await.unwrap();
    assert_eq!(sets[0].rows[0][0], Cell::Text("x".into()));

    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn test_read_workbook_missing_file() {
    let path = std::env::temp_dir().join("atoll_ingest_missing_test.json");
    std::fs::remove_file(&path).ok();
    assert!(matches!(
        read_workbook(&path).await,
        Err(IngestError::Io { .. })
    ));
}

#[test]
fn test_geojson_upload_keeps_features() {
    let raw = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [77.2, 28.6] },
            "properties": { "Country": "IN", "District": "D1", "Population": 100 }
        }]
    }"#;

    let set = parse_feature_collection("shapes", raw).unwrap();
    assert_eq!(set.header_row, vec!["Country", "District", "Population"]);
    assert_eq!(set.rows[0][2], Cell::Number(100.0));
    let feature = set.feature(0).unwrap();
    assert_eq!(feature.geometry["type"], "Point");
}

#[test]
fn test_geojson_must_be_a_feature_collection() {
    let raw = r#"{ "type": "GeometryCollection", "features": [] }"#;
    assert!(matches!(
        parse_feature_collection("x", raw),
        Err(IngestError::NotFeatureCollection(_))
    ));
}

fn bundle(members: &[&str], prj: Option<&str>) -> ShapefileBundle {
    ShapefileBundle {
        members: members.iter().map(|m| m.to_string()).collect(),
        prj_wkt: prj.map(str::to_string),
    }
}

#[test]
fn test_complete_wgs84_bundle_accepted() {
    let b = bundle(
        &["areas.shp", "areas.shx", "areas.dbf", "areas.prj"],
        Some(r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137,298.257223563]]]"#),
    );
    assert!(check_bundle(&b).is_ok());
}

#[test]
fn test_bundle_missing_dbf_rejected() {
    let b = bundle(&["areas.shp", "areas.shx", "areas.prj"], Some("WGS 84"));
    assert!(matches!(
        check_bundle(&b),
        Err(IngestError::MissingBundleMember(".dbf"))
    ));
}

#[test]
fn test_bundle_without_prj_rejected() {
    let b = bundle(&["areas.shp", "areas.shx", "areas.dbf"], None);
    assert!(matches!(check_bundle(&b), Err(IngestError::MissingProjection)));
}

#[test]
fn test_foreign_projection_rejected_before_validation() {
    let b = bundle(
        &["areas.shp", "areas.shx", "areas.dbf", "areas.prj"],
        Some(r#"PROJCS["OSGB_1936_British_National_Grid",AUTHORITY["EPSG","27700"]]"#),
    );
    assert!(matches!(check_bundle(&b), Err(IngestError::Projection(_))));
}
