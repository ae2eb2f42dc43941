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

//! # Table Shaping
//!
//! Untyped table to untyped table transformations. Each operation validates
//! everything it needs up front, so a failing block never hands on a half
//! modified table.

use crate::block::QiColumnRef;
use crate::errors::{QiError, Result};
use crate::table::{column_letters, QiCellRange, QiTable};

/// Copies out the cells inside `range`.
pub fn select_range(block: &str, table: &QiTable, range: &QiCellRange) -> Result<QiTable> {
    let rect = range
        .resolve(table.row_count(), table.column_count())
        .map_err(|message| QiError::cell_range(block, message))?;
    Ok(table.slice(&rect))
}

/// Overwrites the cells inside `at` with `values`, row by row.
pub fn write_cells(block: &str, mut table: QiTable, at: &QiCellRange, values: &[String]) -> Result<QiTable> {
    let rect = at
        .resolve(table.row_count(), table.column_count())
        .map_err(|message| QiError::cell_range(block, message))?;
    if rect.cell_count() != values.len() {
        return Err(QiError::CellCountMismatch {
            block: block.to_string(),
            expected: rect.cell_count(),
            found: values.len(),
        });
    }

    let mut values = values.iter();
    for row in rect.top..=rect.bottom {
        for column in rect.left..=rect.right {
            if let Some(value) = values.next() {
                table.set_cell(row, column, value.clone());
            }
        }
    }
    Ok(table)
}

/// Removes columns by letter or header name. All references must resolve.
pub fn delete_columns(block: &str, mut table: QiTable, columns: &[QiColumnRef]) -> Result<QiTable> {
    let unknown = |column: &QiColumnRef| QiError::UnknownColumn {
        block: block.to_string(),
        column: column.to_string(),
    };

    let width = table.column_count();
    let positions = columns
        .iter()
        .map(|column| match column {
            QiColumnRef::Position(position) if *position < width => Ok(*position),
            QiColumnRef::Position(_) => Err(unknown(column)),
            QiColumnRef::Name(name) => table.column_index(name).ok_or_else(|| unknown(column)),
        })
        .collect::<Result<Vec<_>>>()?;

    log::debug!(
        "block '{}' deletes columns {}",
        block,
        positions
            .iter()
            .map(|&p| column_letters(p))
            .collect::<Vec<_>>()
            .join(",")
    );
    table.remove_columns(&positions);
    Ok(table)
}

/// Removes rows by 0-based position.
pub fn delete_rows(block: &str, mut table: QiTable, rows: &[usize]) -> Result<QiTable> {
    let count = table.row_count();
    if let Some(&row) = rows.iter().find(|&&row| row >= count) {
        return Err(QiError::cell_range(
            block,
            format!("row {} does not exist in a table of {} rows", row + 1, count),
        ));
    }
    table.remove_rows(rows);
    Ok(table)
}
