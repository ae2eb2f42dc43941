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

//! # Pipeline Stages
//!
//! One module per stage family. Every stage is a plain function from an
//! input payload to an output payload; [`execute`] is the single dispatch
//! point over [`QiBlockKind`].
//!
//! ## Module Components
//!
//! - **Extraction** ([extract.rs](extract/index.html)): HTTP(S) and local file sources
//! - **Archives** ([archive.rs](archive/index.html)): zip, gzip and zstd containers, member picking
//! - **Decoding** ([decode.rs](decode/index.html)): bytes to text
//! - **Delimited Text** ([delimited.rs](delimited/index.html)): text to table through `csv`
//! - **Spreadsheets** ([sheet.rs](sheet/index.html)): xlsx workbooks, sheet picking
//! - **Shaping** ([shape.rs](shape/index.html)): cell ranges, cell writes, column and row deletion
//! - **Interpretation** ([interpret.rs](interpret/index.html)): schema binding and row validation
//! - **Loading** ([load.rs](load/index.html)): SQLite relations

pub mod archive;
pub mod decode;
pub mod delimited;
pub mod extract;
pub mod interpret;
pub mod load;
pub mod shape;
pub mod sheet;

pub use archive::QiArchive;
pub use interpret::{QiDroppedRow, QiInterpretation};
pub use sheet::QiWorkbook;

use serde::{Deserialize, Serialize};

use crate::block::{QiBlockKind, QiPayloadKind};
use crate::compiler::QiCompiledBlock;
use crate::config::QiExecutorConfig;
use crate::errors::{QiError, Result};
use crate::table::{QiTable, QiTypedTable};

/// Named byte stream: an extracted source or an archive member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QiBytes {
    pub name: String,
    pub data: Vec<u8>,
}

impl QiBytes {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Value travelling along one edge.
#[derive(Clone, Debug)]
pub enum QiPayload {
    Bytes(QiBytes),
    Archive(QiArchive),
    Text(String),
    Workbook(QiWorkbook),
    Table(QiTable),
    TypedTable(QiTypedTable),
}

impl QiPayload {
    pub fn kind(&self) -> QiPayloadKind {
        match self {
            QiPayload::Bytes(_) => QiPayloadKind::Bytes,
            QiPayload::Archive(_) => QiPayloadKind::Archive,
            QiPayload::Text(_) => QiPayloadKind::Text,
            QiPayload::Workbook(_) => QiPayloadKind::Workbook,
            QiPayload::Table(_) => QiPayloadKind::Table,
            QiPayload::TypedTable(_) => QiPayloadKind::TypedTable,
        }
    }
}

/// What a stage reports besides its payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QiStageDetail {
    #[default]
    None,
    /// Row accounting of a table interpreter.
    Interpreted {
        input_rows: usize,
        retained: usize,
        dropped: usize,
        dropped_rows: Vec<QiDroppedRow>,
    },
    /// Rows committed by a loader.
    Loaded { relation: String, rows: usize },
}

/// Result of running one block.
#[derive(Debug)]
pub struct QiStageOutput {
    pub payload: Option<QiPayload>,
    pub detail: QiStageDetail,
}

impl QiStageOutput {
    fn payload(payload: QiPayload) -> Self {
        Self {
            payload: Some(payload),
            detail: QiStageDetail::None,
        }
    }
}

/// Runs one compiled block over its input.
pub fn execute(
    block: &QiCompiledBlock,
    input: Option<QiPayload>,
    config: &QiExecutorConfig,
) -> Result<QiStageOutput> {
    let name = block.name.as_str();
    match (&block.kind, input) {
        (QiBlockKind::Extraction { source }, None) => Ok(QiStageOutput::payload(QiPayload::Bytes(
            extract::extract(name, source, config)?,
        ))),
        (QiBlockKind::ArchiveInterpreter { archive }, Some(QiPayload::Bytes(bytes))) => Ok(
            QiStageOutput::payload(QiPayload::Archive(archive::open_archive(name, *archive, bytes)?)),
        ),
        (QiBlockKind::FilePicker { path }, Some(QiPayload::Archive(archive))) => Ok(
            QiStageOutput::payload(QiPayload::Bytes(archive::pick_member(name, archive, path)?)),
        ),
        (QiBlockKind::TextDecoder { encoding }, Some(QiPayload::Bytes(bytes))) => Ok(
            QiStageOutput::payload(QiPayload::Text(decode::decode_text(name, *encoding, &bytes.data)?)),
        ),
        (QiBlockKind::DelimitedInterpreter { options }, Some(QiPayload::Text(text))) => Ok(
            QiStageOutput::payload(QiPayload::Table(delimited::parse_delimited(name, options, &text)?)),
        ),
        (QiBlockKind::SpreadsheetInterpreter, Some(QiPayload::Bytes(bytes))) => Ok(
            QiStageOutput::payload(QiPayload::Workbook(sheet::open_workbook(name, &bytes)?)),
        ),
        (QiBlockKind::SheetPicker { sheet }, Some(QiPayload::Workbook(workbook))) => Ok(
            QiStageOutput::payload(QiPayload::Table(sheet::pick_sheet(name, workbook, sheet)?)),
        ),
        (QiBlockKind::CellRangeSelector { range }, Some(QiPayload::Table(table))) => Ok(
            QiStageOutput::payload(QiPayload::Table(shape::select_range(name, &table, range)?)),
        ),
        (QiBlockKind::CellWriter { at, values }, Some(QiPayload::Table(table))) => Ok(
            QiStageOutput::payload(QiPayload::Table(shape::write_cells(name, table, at, values)?)),
        ),
        (QiBlockKind::ColumnDeleter { columns }, Some(QiPayload::Table(table))) => Ok(
            QiStageOutput::payload(QiPayload::Table(shape::delete_columns(name, table, columns)?)),
        ),
        (QiBlockKind::RowDeleter { rows }, Some(QiPayload::Table(table))) => Ok(
            QiStageOutput::payload(QiPayload::Table(shape::delete_rows(name, table, rows)?)),
        ),
        (QiBlockKind::TableInterpreter { header, .. }, Some(QiPayload::Table(table))) => {
            let schema = block
                .schema
                .as_ref()
                .ok_or_else(|| QiError::internal(format!("block '{}' has no resolved schema", name)))?;
            let interpretation = interpret::interpret_table(
                name,
                &table,
                schema,
                *header,
                config.max_drop_diagnostics,
            )?;
            let QiInterpretation {
                table,
                input_rows,
                dropped,
                dropped_rows,
            } = interpretation;
            Ok(QiStageOutput {
                detail: QiStageDetail::Interpreted {
                    input_rows,
                    retained: table.row_count(),
                    dropped,
                    dropped_rows,
                },
                payload: Some(QiPayload::TypedTable(table)),
            })
        }
        (QiBlockKind::RelationalLoader { table: relation, file, mode }, Some(QiPayload::TypedTable(table))) => {
            let rows = load::load_relation(name, &table, relation, file, *mode, config.busy_timeout())?;
            Ok(QiStageOutput {
                payload: None,
                detail: QiStageDetail::Loaded {
                    relation: relation.clone(),
                    rows,
                },
            })
        }
        (kind, input) => Err(QiError::internal(format!(
            "block '{}' ({}) cannot consume {}",
            name,
            kind.kind_name(),
            input.map_or("no input".to_string(), |payload| payload.kind().to_string())
        ))),
    }
}
