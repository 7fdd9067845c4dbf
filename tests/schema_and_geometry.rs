use tetl::{
    geometry_statements, Category, ALERT_TYPE_SEEDS, COORDINATE_TYPE_SEEDS, DDL_STATEMENTS,
    ROAD_SEEDS,
};

#[test]
fn ddl_covers_every_category_table_with_provenance_and_geometry() {
    let ddl = DDL_STATEMENTS.join("\n");
    for category in Category::ALL {
        assert!(
            ddl.contains(&format!("waze.{}", category.table())),
            "missing table for {category}"
        );
    }
    assert!(ddl.contains("location_geo GEOMETRY(POINT)"));
    assert!(ddl.contains("line_geo GEOMETRY(LINESTRING)"));
    assert!(ddl.contains("turn_line_geo GEOMETRY(LINESTRING)"));
    // the idempotence key is indexed on every category table
    assert_eq!(ddl.matches("datafile_id BIGINT NOT NULL").count(), 3);
    assert_eq!(ddl.matches("_datafile_id_idx").count(), 3);
}

#[test]
fn ddl_is_idempotent_statement_by_statement() {
    for stmt in DDL_STATEMENTS {
        assert!(
            stmt.starts_with("CREATE TABLE IF NOT EXISTS")
                || stmt.starts_with("CREATE INDEX IF NOT EXISTS"),
            "not idempotent: {stmt}"
        );
    }
}

#[test]
fn reference_seeds_match_the_fixed_enumerations() {
    assert_eq!(COORDINATE_TYPE_SEEDS.len(), 3);
    assert_eq!(ROAD_SEEDS.len(), 21);
    assert_eq!(ALERT_TYPE_SEEDS.len(), 39);

    // unique combos, as enforced by the destination constraints
    let mut roads: Vec<_> = ROAD_SEEDS.to_vec();
    roads.sort();
    roads.dedup();
    assert_eq!(roads.len(), ROAD_SEEDS.len());

    let mut types: Vec<_> = ALERT_TYPE_SEEDS.to_vec();
    types.sort();
    types.dedup();
    assert_eq!(types.len(), ALERT_TYPE_SEEDS.len());
}

#[test]
fn geometry_passes_are_guarded_for_idempotence() {
    for category in Category::ALL {
        for stmt in geometry_statements(category) {
            assert!(stmt.contains("IS NULL"), "unguarded geometry pass: {stmt}");
        }
    }
}

#[test]
fn alerts_pass_requires_both_coordinates() {
    let [stmt] = geometry_statements(Category::Alerts) else {
        panic!("alerts should have exactly one geometry statement");
    };
    assert!(stmt.contains("location_geo IS NULL"));
    assert!(stmt.contains("location IS NOT NULL"));
    assert!(stmt.contains("location->>'x' IS NOT NULL"));
    assert!(stmt.contains("location->>'y' IS NOT NULL"));
    assert!(stmt.contains("ST_MakePoint"));
}

#[test]
fn line_passes_skip_rows_without_coordinate_arrays() {
    let jams = geometry_statements(Category::Jams);
    assert_eq!(jams.len(), 2, "jams derive line and turn_line");
    for stmt in jams {
        assert!(stmt.contains("ST_MakeLine"));
        assert!(stmt.contains("WITH ORDINALITY"));
        assert!(stmt.contains("->0 IS NOT NULL"));
    }

    let [irregularities] = geometry_statements(Category::Irregularities) else {
        panic!("irregularities should have exactly one geometry statement");
    };
    assert!(irregularities.contains("line->0 IS NOT NULL"));
}
