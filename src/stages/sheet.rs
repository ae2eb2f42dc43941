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

//! # Spreadsheets
//!
//! xlsx workbooks are read with `calamine` (feature `excel`). Each sheet
//! becomes an untyped table anchored at cell A1, so cell addresses in later
//! shaping blocks match what a spreadsheet application shows. Empty cells
//! read as empty strings.

use super::QiBytes;
use crate::errors::{QiError, Result};
use crate::table::QiTable;

/// Named sheets in workbook order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QiWorkbook {
    sheets: Vec<(String, QiTable)>,
}

impl QiWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, table: QiTable) {
        self.sheets.push((name.into(), table));
    }

    pub fn sheet(&self, name: &str) -> Option<&QiTable> {
        self.sheets
            .iter()
            .find(|(sheet, _)| sheet == name)
            .map(|(_, table)| table)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

/// Takes one sheet out of the workbook.
pub fn pick_sheet(block: &str, workbook: QiWorkbook, sheet: &str) -> Result<QiTable> {
    workbook
        .sheets
        .into_iter()
        .find(|(name, _)| name == sheet)
        .map(|(_, table)| table)
        .ok_or_else(|| QiError::SheetNotFound {
            block: block.to_string(),
            sheet: sheet.to_string(),
        })
}

#[cfg(feature = "excel")]
pub fn open_workbook(block: &str, bytes: &QiBytes) -> Result<QiWorkbook> {
    use std::io::Cursor;

    use calamine::{Reader, Xlsx};

    let format_error = |message: String| QiError::ArchiveFormat {
        block: block.to_string(),
        message: format!("{}: {}", bytes.name, message),
    };

    let mut xlsx: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes.data.as_slice())).map_err(|e| format_error(e.to_string()))?;
    let mut workbook = QiWorkbook::new();
    for name in xlsx.sheet_names() {
        let range = xlsx
            .worksheet_range(&name)
            .map_err(|e| format_error(e.to_string()))?;
        let rows = match range.end() {
            None => Vec::new(),
            Some((last_row, last_column)) => (0..=last_row)
                .map(|row| {
                    (0..=last_column)
                        .map(|column| {
                            range
                                .get_value((row, column))
                                .map(|cell| cell.to_string())
                                .unwrap_or_default()
                        })
                        .collect::<Vec<String>>()
                })
                .collect(),
        };
        workbook.push(name, QiTable::from_rows(rows)?);
    }
    log::debug!("block '{}' read {} sheets", block, workbook.len());
    Ok(workbook)
}

#[cfg(not(feature = "excel"))]
pub fn open_workbook(block: &str, _bytes: &QiBytes) -> Result<QiWorkbook> {
    Err(QiError::ArchiveFormat {
        block: block.to_string(),
        message: "spreadsheet support requires the 'excel' feature".into(),
    })
}
