//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Qi.
//! The Qi project belongs to the Dunimd Team.

use proptest::prelude::*;
use qix::constraint::QiConstraintDecl;
use qix::errors::QiError;
use qix::stages::interpret::interpret_table;
use qix::table::{QiColumn, QiTable};
use qix::types::{QiNonConformance, QiTypeRegistry, QiValueTypeDecl};
use qix::value::QiValue;
use serde_json::json;

fn registry() -> QiTypeRegistry {
    QiTypeRegistry::build(
        &[
            QiConstraintDecl::new("GermanPrefix", "regex", json!({"pattern": "^DE"})),
            QiConstraintDecl::new("Plausible", "range", json!({"lower": 0, "upper": 100})),
        ],
        &[
            QiValueTypeDecl::new("TreeId", "text", &["GermanPrefix"]),
            QiValueTypeDecl::new("Height", "decimal", &["Plausible"]),
        ],
    )
    .unwrap()
}

fn schema(bindings: &[(&str, &str)]) -> Vec<QiColumn> {
    let registry = registry();
    bindings
        .iter()
        .map(|(name, value_type)| QiColumn {
            name: name.to_string(),
            value_type: registry.resolve(value_type).unwrap(),
        })
        .collect()
}

#[test]
fn test_non_conforming_rows_are_dropped_not_fatal() {
    let table = QiTable::from_rows(vec![
        vec!["id", "height"],
        vec!["DE-1", "12,5"],
        vec!["FR-2", "8"],
        vec!["DE-3", "140"],
        vec!["DE-4", "7"],
    ])
    .unwrap();
    let result = interpret_table(
        "Type",
        &table,
        &schema(&[("id", "TreeId"), ("height", "Height")]),
        true,
        100,
    )
    .unwrap();

    assert_eq!(result.input_rows, 4);
    assert_eq!(result.retained(), 2);
    assert_eq!(result.dropped, 2);
    assert_eq!(
        result.table.rows(),
        &[
            vec![QiValue::Text("DE-1".into()), QiValue::Decimal(12.5)],
            vec![QiValue::Text("DE-4".into()), QiValue::Decimal(7.0)],
        ]
    );
    assert_eq!(result.dropped_rows[0].row, 2);
    assert_eq!(
        result.dropped_rows[0].reason,
        QiNonConformance::Constraint {
            constraint: "GermanPrefix".into()
        }
    );
    assert_eq!(result.dropped_rows[1].column, "height");
}

#[test]
fn test_header_binding_errors() {
    let missing = QiTable::from_rows(vec![vec!["id"], vec!["DE-1"]]).unwrap();
    let err = interpret_table("Type", &missing, &schema(&[("id", "TreeId"), ("height", "Height")]), true, 0)
        .unwrap_err();
    assert_eq!(
        err,
        QiError::MissingColumn {
            block: "Type".into(),
            column: "height".into()
        }
    );

    let duplicate = QiTable::from_rows(vec![vec!["id", "id"], vec!["DE-1", "DE-2"]]).unwrap();
    let err = interpret_table("Type", &duplicate, &schema(&[("id", "TreeId")]), true, 0).unwrap_err();
    assert!(matches!(err, QiError::DuplicateColumn { column, .. } if column == "id"));
}

#[test]
fn test_positional_binding_without_header() {
    let table = QiTable::from_rows(vec![vec!["DE-1", "3", "extra"], vec!["DE-2", "x", "extra"]]).unwrap();
    let result = interpret_table("Type", &table, &schema(&[("id", "TreeId"), ("height", "Height")]), false, 10)
        .unwrap();
    assert_eq!(result.input_rows, 2);
    assert_eq!(result.retained(), 1);
    assert_eq!(result.table.column_names(), vec!["id", "height"]);

    let narrow = QiTable::from_rows(vec![vec!["DE-1"]]).unwrap();
    let err = interpret_table("Type", &narrow, &schema(&[("id", "TreeId"), ("height", "Height")]), false, 10)
        .unwrap_err();
    assert!(matches!(err, QiError::MissingColumn { column, .. } if column == "height"));
}

fn cell() -> impl Strategy<Value = String> {
    prop_oneof![
        "DE-[0-9]{1,3}",
        "FR-[0-9]{1,3}",
        "[0-9]{1,3}",
        "[0-9]{1,2},[0-9]",
        "[a-z ]{0,4}",
    ]
}

proptest! {
    #[test]
    fn prop_rows_are_conserved_and_retained_rows_conform(
        rows in prop::collection::vec((cell(), cell()), 0..40)
    ) {
        let columns = schema(&[("id", "TreeId"), ("height", "Height")]);
        let mut source = vec![vec!["id".to_string(), "height".to_string()]];
        source.extend(rows.iter().map(|(a, b)| vec![a.clone(), b.clone()]));
        let table = QiTable::from_rows(source).unwrap();

        let result = interpret_table("Type", &table, &columns, true, 5).unwrap();

        prop_assert_eq!(result.retained() + result.dropped, rows.len());
        prop_assert!(result.dropped_rows.len() <= 5);
        for row in result.table.rows() {
            for (value, column) in row.iter().zip(&columns) {
                prop_assert!(column.value_type.conforms(&value.to_string()));
            }
        }
    }
}
