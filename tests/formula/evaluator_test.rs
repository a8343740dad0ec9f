use std::collections::BTreeMap;

use atoll::formula::{FormulaError, HypothesisAssumption, Operator, Rule, RuleSet};
use atoll::model::Cell;
use uuid::Uuid;

fn rule(output: &str, input: &str, operator: Operator, key: &str) -> Rule {
    Rule {
        id: Uuid::new_v4(),
        output: output.to_string(),
        input: input.to_string(),
        operator,
        assumption_key: key.to_string(),
        active: true,
    }
}

fn assumption(key: &str, value: f64) -> HypothesisAssumption {
    HypothesisAssumption {
        id: Uuid::new_v4(),
        key: key.to_string(),
        value: Cell::Number(value),
        active: true,
    }
}

fn population_row() -> (Vec<String>, BTreeMap<String, Cell>) {
    let headers = vec!["Population".to_string()];
    let mut row = BTreeMap::new();
    row.insert("Population".to_string(), Cell::Number(100.0));
    (headers, row)
}

#[test]
fn test_multiply_against_assumption() {
    let set = RuleSet::load(vec![rule(
        "WaterNeed",
        "Population",
        Operator::Multiply,
        "PerCapitaLitres",
    )])
    .unwrap();
    let (headers, row) = population_row();
    let assumptions = vec![assumption("PerCapitaLitres", 5.0)];

    let value = set
        .evaluate("WaterNeed", &row, &headers, &assumptions)
        .unwrap();
    assert_eq!(value, Some(500.0));
}

#[test]
fn test_chained_rule_input() {
    let set = RuleSet::load(vec![
        rule("WaterNeed", "Population", Operator::Multiply, "PerCapitaLitres"),
        rule("TankerTrips", "WaterNeed", Operator::Divide, "LitresPerTrip"),
    ])
    .unwrap();
    let (headers, row) = population_row();
    let assumptions = vec![
        assumption("PerCapitaLitres", 5.0),
        assumption("LitresPerTrip", 250.0),
    ];

    let value = set
        .evaluate("TankerTrips", &row, &headers, &assumptions)
        .unwrap();
    assert_eq!(value, Some(2.0));
}

#[test]
fn test_division_by_zero_yields_no_value() {
    let set = RuleSet::load(vec![rule(
        "Share",
        "Population",
        Operator::Divide,
        "Denominator",
    )])
    .unwrap();
    let (headers, row) = population_row();
    let assumptions = vec![assumption("Denominator", 0.0)];

    let value = set.evaluate("Share", &row, &headers, &assumptions).unwrap();
    assert_eq!(value, None);
}

#[test]
fn test_blank_input_cell_yields_no_value() {
    let set = RuleSet::load(vec![rule(
        "WaterNeed",
        "Population",
        Operator::Multiply,
        "PerCapitaLitres",
    )])
    .unwrap();
    let headers = vec!["Population".to_string()];
    let mut row = BTreeMap::new();
    row.insert("Population".to_string(), Cell::Empty);
    let assumptions = vec![assumption("PerCapitaLitres", 5.0)];

    let value = set
        .evaluate("WaterNeed", &row, &headers, &assumptions)
        .unwrap();
    assert_eq!(value, None);
}

#[test]
fn test_unresolved_input_is_an_error() {
    let set = RuleSet::load(vec![rule(
        "WaterNeed",
        "Headcount",
        Operator::Multiply,
        "PerCapitaLitres",
    )])
    .unwrap();
    let (headers, row) = population_row();
    let assumptions = vec![assumption("PerCapitaLitres", 5.0)];

    let err = set
        .evaluate("WaterNeed", &row, &headers, &assumptions)
        .unwrap_err();
    assert_eq!(
        err,
        FormulaError::UnresolvedInput {
            rule: "WaterNeed".to_string(),
            input: "Headcount".to_string(),
        }
    );
}

#[test]
fn test_unresolved_assumption_is_an_error() {
    let set = RuleSet::load(vec![rule(
        "WaterNeed",
        "Population",
        Operator::Multiply,
        "PerCapitaLitres",
    )])
    .unwrap();
    let (headers, row) = population_row();

    // The assumption exists but is inactive.
    let mut inactive = assumption("PerCapitaLitres", 5.0);
    inactive.active = false;

    let err = set
        .evaluate("WaterNeed", &row, &headers, &[inactive])
        .unwrap_err();
    assert!(matches!(err, FormulaError::UnresolvedAssumption { .. }));
}

#[test]
fn test_unknown_resource() {
    let set = RuleSet::load(vec![]).unwrap();
    let (headers, row) = population_row();
    let err = set.evaluate("WaterNeed", &row, &headers, &[]).unwrap_err();
    assert_eq!(err, FormulaError::UnknownResource("WaterNeed".to_string()));
}

#[test]
fn test_inactive_rules_do_not_participate() {
    let mut disabled = rule("WaterNeed", "Population", Operator::Multiply, "PerCapitaLitres");
    disabled.active = false;
    let set = RuleSet::load(vec![disabled]).unwrap();
    let (headers, row) = population_row();

    let err = set
        .evaluate("WaterNeed", &row, &headers, &[assumption("PerCapitaLitres", 5.0)])
        .unwrap_err();
    assert!(matches!(err, FormulaError::UnknownResource(_)));
}

#[test]
fn test_cyclic_chain_rejected_at_load() {
    let err = RuleSet::load(vec![
        rule("a", "b", Operator::Add, "k"),
        rule("b", "c", Operator::Add, "k"),
        rule("c", "a", Operator::Add, "k"),
    ])
    .unwrap_err();

    match err {
        FormulaError::CyclicRules(path) => {
            assert_eq!(path.len(), 4);
            assert_eq!(path.first(), path.last());
        }
        other => panic!("expected cycle error, got {:?}", other),
    }
}

#[test]
fn test_evaluate_cell_rounds_for_display() {
    let set = RuleSet::load(vec![rule(
        "StaffNeed",
        "Population",
        Operator::Divide,
        "PerStaff",
    )])
    .unwrap();
    let (headers, row) = population_row();
    let assumptions = vec![assumption("PerStaff", 30.0)];

    let cell = set
        .evaluate_cell("StaffNeed", &row, &headers, &assumptions)
        .unwrap();
    // 100 / 30 = 3.33…, rounded for display.
    assert_eq!(cell, Cell::Number(3.0));
}

#[test]
fn test_operator_coverage() {
    assert_eq!(Operator::Add.apply(2.0, 3.0), Some(5.0));
    assert_eq!(Operator::Subtract.apply(2.0, 3.0), Some(-1.0));
    assert_eq!(Operator::Multiply.apply(2.0, 3.0), Some(6.0));
    assert_eq!(Operator::Divide.apply(6.0, 3.0), Some(2.0));
    assert_eq!(Operator::Power.apply(2.0, 3.0), Some(8.0));
    assert_eq!(Operator::Divide.apply(1.0, 0.0), None);
}
