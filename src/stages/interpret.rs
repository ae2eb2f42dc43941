//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Qi.
//! The Qi project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Table Interpretation
//!
//! Binds an untyped table to a schema and validates it row by row.
//!
//! ## Column Binding
//!
//! - With a header, the first row names the columns. Every schema column
//!   must appear there exactly once; output columns follow schema order and
//!   source columns the schema does not mention are dropped.
//! - Without a header, schema columns bind to source columns by position.
//!
//! ## Row Validation
//!
//! Each bound cell is parsed against the base primitive of its value type
//! and then checked against every constraint. A row with any failing cell is
//! dropped and counted; it never fails the block. Retained rows keep source
//! order.

use serde::{Deserialize, Serialize};

use crate::errors::{QiError, Result};
use crate::table::{QiColumn, QiTable, QiTypedTable};
use crate::types::QiNonConformance;

/// Why one source row was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QiDroppedRow {
    /// 0-based row position in the source table, header included.
    pub row: usize,
    /// First schema column whose cell failed.
    pub column: String,
    pub reason: QiNonConformance,
}

/// Typed output plus row accounting.
#[derive(Clone, Debug)]
pub struct QiInterpretation {
    pub table: QiTypedTable,
    /// Data rows considered (header excluded).
    pub input_rows: usize,
    pub dropped: usize,
    /// At most `max_diagnostics` entries; `dropped` is always exact.
    pub dropped_rows: Vec<QiDroppedRow>,
}

impl QiInterpretation {
    pub fn retained(&self) -> usize {
        self.table.row_count()
    }
}

pub fn interpret_table(
    block: &str,
    table: &QiTable,
    schema: &[QiColumn],
    header: bool,
    max_diagnostics: usize,
) -> Result<QiInterpretation> {
    let mut typed = QiTypedTable::new(schema.to_vec());
    if table.is_empty() {
        log::debug!("block '{}' received an empty table", block);
        return Ok(QiInterpretation {
            table: typed,
            input_rows: 0,
            dropped: 0,
            dropped_rows: Vec::new(),
        });
    }

    let positions = bind_columns(block, table, schema, header)?;
    let first_data_row = usize::from(header);

    let mut dropped = 0;
    let mut dropped_rows = Vec::new();
    for (row_index, row) in table.rows().iter().enumerate().skip(first_data_row) {
        let mut values = Vec::with_capacity(schema.len());
        let mut failure = None;
        for (column, &position) in schema.iter().zip(&positions) {
            match column.value_type.conform(&row[position]) {
                Ok(value) => values.push(value),
                Err(reason) => {
                    failure = Some((column, reason));
                    break;
                }
            }
        }

        match failure {
            None => typed.push(values)?,
            Some((column, reason)) => {
                dropped += 1;
                log::debug!(
                    "block '{}' dropped row {}: column '{}' {}",
                    block,
                    row_index,
                    column.name,
                    reason
                );
                if dropped_rows.len() < max_diagnostics {
                    dropped_rows.push(QiDroppedRow {
                        row: row_index,
                        column: column.name.clone(),
                        reason,
                    });
                }
            }
        }
    }

    let input_rows = table.row_count() - first_data_row;
    if dropped > 0 {
        log::info!(
            "block '{}' kept {} of {} rows, dropped {}",
            block,
            typed.row_count(),
            input_rows,
            dropped
        );
    }
    Ok(QiInterpretation {
        table: typed,
        input_rows,
        dropped,
        dropped_rows,
    })
}

/// Source position of every schema column.
fn bind_columns(block: &str, table: &QiTable, schema: &[QiColumn], header: bool) -> Result<Vec<usize>> {
    let missing = |column: &QiColumn| QiError::MissingColumn {
        block: block.to_string(),
        column: column.name.clone(),
    };

    if !header {
        let width = table.column_count();
        if let Some(column) = schema.get(width) {
            return Err(missing(column));
        }
        return Ok((0..schema.len()).collect());
    }

    let names = table.header().unwrap_or_default();
    schema
        .iter()
        .map(|column| {
            let mut matches = names
                .iter()
                .enumerate()
                .filter(|(_, name)| name.trim() == column.name)
                .map(|(position, _)| position);
            match (matches.next(), matches.next()) {
                (Some(position), None) => Ok(position),
                (None, _) => Err(missing(column)),
                (Some(_), Some(_)) => Err(QiError::DuplicateColumn {
                    block: block.to_string(),
                    column: column.name.clone(),
                }),
            }
        })
        .collect()
}
