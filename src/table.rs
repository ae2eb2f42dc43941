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

//! # Qi Table Module
//!
//! Tabular data as it flows between blocks.
//!
//! - [`QiTable`] is the untyped grid produced by the parsing stages and
//!   reshaped by the shaping stages. Cells are raw strings; the header, when
//!   there is one, is simply the first row.
//! - [`QiTypedTable`] is the output of the table interpreter: parsed values
//!   bound to a schema.
//!
//! Both keep every row at the same width.
//!
//! Cell addressing follows spreadsheet conventions: columns are letters
//! (`A`, `B`, ..., `Z`, `AA`, ...), rows are 1-based numbers, and a range is
//! written `A1:C5`. A `*` in place of the letters or digits refers to the
//! last column or row of the table the range is applied to.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{QiError, Result};
use crate::types::QiValueType;
use crate::value::QiValue;

/// Untyped table of raw string cells.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QiTable {
    rows: Vec<Vec<String>>,
}

impl QiTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table, rejecting rows whose width differs from the first.
    pub fn from_rows<R, C>(rows: R) -> Result<Self>
    where
        R: IntoIterator<Item = Vec<C>>,
        C: Into<String>,
    {
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        if let Some(first) = rows.first() {
            let width = first.len();
            if let Some((idx, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != width) {
                return Err(QiError::validation(format!(
                    "row {} has {} cells, expected {}",
                    idx,
                    row.len(),
                    width
                )));
            }
        }
        Ok(Self { rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    /// First row, read as column names.
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Position of the header cell equal to `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header()?.iter().position(|cell| cell == name)
    }

    /// Overwrites one cell. Callers check bounds first.
    pub(crate) fn set_cell(&mut self, row: usize, column: usize, value: String) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            *cell = value;
        }
    }

    /// Removes the given column positions; the rest close up to the left.
    pub(crate) fn remove_columns(&mut self, positions: &[usize]) {
        let mut positions = positions.to_vec();
        positions.sort_unstable();
        positions.dedup();
        for row in &mut self.rows {
            for &position in positions.iter().rev() {
                if position < row.len() {
                    row.remove(position);
                }
            }
        }
    }

    /// Removes the given row positions.
    pub(crate) fn remove_rows(&mut self, positions: &[usize]) {
        let mut positions = positions.to_vec();
        positions.sort_unstable();
        positions.dedup();
        for &position in positions.iter().rev() {
            if position < self.rows.len() {
                self.rows.remove(position);
            }
        }
    }

    /// Copies the rectangle out as a new table.
    pub fn slice(&self, rect: &QiRect) -> QiTable {
        let rows = self.rows[rect.top..=rect.bottom]
            .iter()
            .map(|row| row[rect.left..=rect.right].to_vec())
            .collect();
        QiTable { rows }
    }
}

/// A schema column: name bound to a value type.
#[derive(Clone, Debug)]
pub struct QiColumn {
    pub name: String,
    pub value_type: Arc<QiValueType>,
}

/// Ordered column bindings owned by one table interpreter.
pub type QiSchema = Vec<QiColumn>;

/// Table of validated values bound to a schema.
#[derive(Clone, Debug)]
pub struct QiTypedTable {
    columns: QiSchema,
    rows: Vec<Vec<QiValue>>,
}

impl QiTypedTable {
    pub fn new(columns: QiSchema) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row; its width must match the schema.
    pub fn push(&mut self, row: Vec<QiValue>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(QiError::internal(format!(
                "typed row has {} values for {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[QiColumn] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<QiValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// A row or column index in a cell coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QiIndex {
    /// 0-based position.
    At(usize),
    /// The last row or column of the table.
    Last,
}

impl QiIndex {
    fn resolve(self, len: usize) -> Option<usize> {
        match self {
            QiIndex::At(idx) if idx < len => Some(idx),
            QiIndex::At(_) => None,
            QiIndex::Last => len.checked_sub(1),
        }
    }
}

/// Spreadsheet-style cell address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QiCellCoordinate {
    pub column: QiIndex,
    pub row: QiIndex,
}

impl FromStr for QiCellCoordinate {
    type Err = String;

    fn from_str(text: &str) -> std::result::Result<Self, Self::Err> {
        let text = text.trim();
        let (letters, digits) = match text.strip_prefix('*') {
            Some(rest) => ("*", rest),
            None => {
                let split = text
                    .find(|c: char| !c.is_ascii_alphabetic())
                    .unwrap_or(text.len());
                text.split_at(split)
            }
        };
        if letters.is_empty() || digits.is_empty() {
            return Err(format!("'{}' is not a cell address", text));
        }

        let column = match letters {
            "*" => QiIndex::Last,
            _ => QiIndex::At(
                column_index(letters).ok_or_else(|| format!("'{}' is not a column", letters))?,
            ),
        };
        let row = match digits {
            "*" => QiIndex::Last,
            _ => {
                let number: usize = digits
                    .parse()
                    .map_err(|_| format!("'{}' is not a row number", digits))?;
                if number == 0 {
                    return Err("row numbers start at 1".into());
                }
                QiIndex::At(number - 1)
            }
        };
        Ok(Self { column, row })
    }
}

impl fmt::Display for QiCellCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            QiIndex::At(idx) => f.write_str(&column_letters(idx))?,
            QiIndex::Last => f.write_str("*")?,
        }
        match self.row {
            QiIndex::At(idx) => write!(f, "{}", idx + 1),
            QiIndex::Last => f.write_str("*"),
        }
    }
}

/// Inclusive, already-resolved rectangle (0-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QiRect {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl QiRect {
    pub fn height(&self) -> usize {
        self.bottom - self.top + 1
    }

    pub fn width(&self) -> usize {
        self.right - self.left + 1
    }

    pub fn cell_count(&self) -> usize {
        self.height() * self.width()
    }
}

/// Range between two corner cells, inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QiCellRange {
    pub start: QiCellCoordinate,
    pub end: QiCellCoordinate,
}

impl QiCellRange {
    /// Resolves the range against a table of `rows` x `columns`.
    ///
    /// Corners may be given in any order. Fails when a corner lies outside
    /// the table.
    pub fn resolve(&self, rows: usize, columns: usize) -> std::result::Result<QiRect, String> {
        let outside = || format!("range {} does not fit a {}x{} table", self, rows, columns);
        let r0 = self.start.row.resolve(rows).ok_or_else(outside)?;
        let r1 = self.end.row.resolve(rows).ok_or_else(outside)?;
        let c0 = self.start.column.resolve(columns).ok_or_else(outside)?;
        let c1 = self.end.column.resolve(columns).ok_or_else(outside)?;
        Ok(QiRect {
            top: r0.min(r1),
            left: c0.min(c1),
            bottom: r0.max(r1),
            right: c0.max(c1),
        })
    }

    /// Number of cells, when both corners are fixed and the count fits a
    /// `usize`.
    pub fn fixed_cell_count(&self) -> Option<usize> {
        match (self.start.row, self.start.column, self.end.row, self.end.column) {
            (QiIndex::At(r0), QiIndex::At(c0), QiIndex::At(r1), QiIndex::At(c1)) => {
                (r0.abs_diff(r1) + 1).checked_mul(c0.abs_diff(c1) + 1)
            }
            _ => None,
        }
    }
}

impl FromStr for QiCellRange {
    type Err = String;

    fn from_str(text: &str) -> std::result::Result<Self, Self::Err> {
        match text.split_once(':') {
            Some((start, end)) => Ok(Self {
                start: start.parse()?,
                end: end.parse()?,
            }),
            None => {
                let cell: QiCellCoordinate = text.parse()?;
                Ok(Self {
                    start: cell,
                    end: cell,
                })
            }
        }
    }
}

impl fmt::Display for QiCellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Converts column letters (`A`, `AB`, ...) to a 0-based index.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    letters
        .to_ascii_uppercase()
        .bytes()
        .try_fold(0usize, |acc, b| {
            acc.checked_mul(26)?.checked_add((b - b'A') as usize + 1)
        })
        .map(|n| n - 1)
}

/// Converts a 0-based index to column letters.
pub fn column_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}
