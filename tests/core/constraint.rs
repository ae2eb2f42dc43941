//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Qi.
//! The Qi project belongs to the Dunimd Team.

use qix::constraint::{QiConstraint, QiConstraintDecl};
use qix::errors::QiError;
use qix::types::{QiNonConformance, QiTypeRegistry, QiValueTypeDecl};
use qix::value::{QiPrimitive, QiValue};
use serde_json::json;

fn constraint(kind: &str, params: serde_json::Value) -> QiConstraint {
    QiConstraint::from_decl(&QiConstraintDecl::new("c", kind, params)).unwrap()
}

#[test]
fn test_regex_is_unanchored_unless_anchored_explicitly() {
    let loose = constraint("regex", json!({"pattern": "DE"}));
    let anchored = constraint("regex", json!({"pattern": "^DE"}));
    let id = QiValue::Text("XDE123".into());

    assert!(loose.evaluate(&id));
    assert!(!anchored.evaluate(&id));
    assert!(anchored.evaluate(&QiValue::Text("DE123".into())));
}

#[test]
fn test_range_bounds_switch_between_inclusive_and_exclusive() {
    let range = constraint(
        "range",
        json!({"lower": 0, "upper": 10, "upper_inclusive": false}),
    );
    assert!(range.evaluate(&QiValue::Integer(0)));
    assert!(range.evaluate(&QiValue::Decimal(9.99)));
    assert!(!range.evaluate(&QiValue::Integer(10)));
    assert!(!range.evaluate(&QiValue::Integer(-1)));

    let open_top = constraint("range", json!({"lower": 1.5, "lower_inclusive": false}));
    assert!(!open_top.evaluate(&QiValue::Decimal(1.5)));
    assert!(open_top.evaluate(&QiValue::Integer(1_000_000)));
}

#[test]
fn test_equality_and_allowlist_compare_numerically() {
    let year = constraint("equals", json!({"value": 1925}));
    assert!(year.evaluate(&QiValue::Integer(1925)));
    assert!(year.evaluate(&QiValue::Decimal(1925.0)));
    assert!(!year.evaluate(&QiValue::Integer(1926)));

    let colours = constraint("allowlist", json!({"values": ["red", "green"]}));
    assert!(colours.evaluate(&QiValue::Text("green".into())));
    assert!(!colours.evaluate(&QiValue::Text("blue".into())));
}

#[test]
fn test_length_counts_characters() {
    let short = constraint("length", json!({"min": 2, "max": 4}));
    assert!(short.evaluate(&QiValue::Text("Köln".into())));
    assert!(!short.evaluate(&QiValue::Text("K".into())));
    assert!(!short.evaluate(&QiValue::Text("Kölner".into())));
}

#[test]
fn test_invalid_constraint_parameters_rejected() {
    let bad_regex = QiConstraint::from_decl(&QiConstraintDecl::new("c", "regex", json!({"pattern": "("})));
    assert!(matches!(bad_regex, Err(QiError::InvalidParameter { .. })));

    let empty_range = QiConstraint::from_decl(&QiConstraintDecl::new("c", "range", json!({})));
    assert!(matches!(empty_range, Err(QiError::InvalidParameter { .. })));

    let unknown = QiConstraint::from_decl(&QiConstraintDecl::new("c", "fuzzy", json!({})));
    assert!(matches!(unknown, Err(QiError::InvalidParameter { parameter, .. }) if parameter == "kind"));
}

#[test]
fn test_value_type_conformance_checks_parse_then_constraints() {
    let registry = QiTypeRegistry::build(
        &[QiConstraintDecl::new("Year1925", "equals", json!({"value": 1925}))],
        &[QiValueTypeDecl::new("PlantingYear", "integer", &["Year1925"])],
    )
    .unwrap();
    let year = registry.resolve("PlantingYear").unwrap();

    assert_eq!(year.base(), QiPrimitive::Integer);
    assert_eq!(year.conform(" 1925 "), Ok(QiValue::Integer(1925)));
    assert_eq!(
        year.conform("1930"),
        Err(QiNonConformance::Constraint {
            constraint: "Year1925".into()
        })
    );
    assert_eq!(
        year.conform("nineteen"),
        Err(QiNonConformance::Parse {
            primitive: QiPrimitive::Integer
        })
    );
}

#[test]
fn test_registry_always_has_primitives() {
    let registry = QiTypeRegistry::build(&[], &[]).unwrap();
    for name in ["text", "integer", "decimal", "boolean"] {
        assert!(registry.resolve(name).is_ok(), "missing primitive {name}");
    }
    let decimal = registry.resolve("decimal").unwrap();
    assert_eq!(decimal.conform("3,25"), Ok(QiValue::Decimal(3.25)));
    let boolean = registry.resolve("boolean").unwrap();
    assert_eq!(boolean.conform("TRUE"), Ok(QiValue::Boolean(true)));
    assert_eq!(boolean.conform("0"), Ok(QiValue::Boolean(false)));
}

#[test]
fn test_registry_resolution_errors() {
    let unknown_constraint = QiTypeRegistry::build(&[], &[QiValueTypeDecl::new("Id", "text", &["Missing"])]);
    assert!(matches!(unknown_constraint, Err(QiError::UnknownConstraint { name }) if name == "Missing"));

    let unknown_base = QiTypeRegistry::build(&[], &[QiValueTypeDecl::new("Id", "uuid", &[])]);
    assert!(matches!(unknown_base, Err(QiError::UnknownType { name }) if name == "uuid"));

    let incompatible = QiTypeRegistry::build(
        &[QiConstraintDecl::new("Prefix", "regex", json!({"pattern": "^1"}))],
        &[QiValueTypeDecl::new("Count", "integer", &["Prefix"])],
    );
    assert!(matches!(incompatible, Err(QiError::IncompatibleConstraint { constraint, .. }) if constraint == "Prefix"));
}
