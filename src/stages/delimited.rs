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

//! # Delimited Text
//!
//! Parses text into an untyped table with the `csv` crate. The first line is
//! an ordinary row; headers only gain meaning in the table interpreter. Every
//! row must be as wide as the first one.

use crate::block::QiDelimitedOptions;
use crate::errors::{QiError, Result};
use crate::table::QiTable;

pub fn parse_delimited(block: &str, options: &QiDelimitedOptions, text: &str) -> Result<QiTable> {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .quoting(options.enclosing.is_some());
    if let Some(quote) = options.enclosing {
        builder.quote(quote);
    }
    if let Some(escape) = options.escape {
        builder.escape(Some(escape)).double_quote(false);
    }

    let mut reader = builder.from_reader(text.as_bytes());
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut width = None;
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| record_error(block, row, e))?;
        let expected = *width.get_or_insert(record.len());
        if record.len() != expected {
            return Err(QiError::MalformedRow {
                block: block.to_string(),
                row,
                expected,
                found: record.len(),
            });
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    log::debug!(
        "block '{}' parsed {} rows of {} columns",
        block,
        rows.len(),
        width.unwrap_or(0)
    );
    QiTable::from_rows(rows)
}

fn record_error(block: &str, row: usize, err: csv::Error) -> QiError {
    match err.kind() {
        csv::ErrorKind::UnequalLengths { expected_len, len, .. } => QiError::MalformedRow {
            block: block.to_string(),
            row,
            expected: *expected_len as usize,
            found: *len as usize,
        },
        _ => QiError::Decoding {
            block: block.to_string(),
            encoding: "utf-8".to_string(),
            offset: err.position().map_or(0, |pos| pos.byte() as usize),
        },
    }
}
