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

//! # Block Kinds
//!
//! A block arrives from the front-end as a loose [`QiBlockDecl`]: a name, a
//! kind string and a JSON object of parameters. The compiler turns each
//! declaration into a [`QiBlockKind`], the closed set of tagged variants the
//! executor dispatches on. Parameter checking happens here, so a compiled
//! block is always well-formed.
//!
//! ## Kinds and Parameters
//!
//! | kind | parameters |
//! |---|---|
//! | `Extraction` | `source` |
//! | `ArchiveInterpreter` | `archive` (`zip`, `gz`, `zst`) |
//! | `FilePicker` | `path` |
//! | `TextDecoder` | `encoding`? |
//! | `DelimitedInterpreter` | `delimiter`?, `enclosing`?, `escape`? |
//! | `SpreadsheetInterpreter` | none |
//! | `SheetPicker` | `sheet` |
//! | `CellRangeSelector` | `select` |
//! | `CellWriter` | `at`, `write` |
//! | `ColumnDeleter` | `delete`? (letters), `names`? (header names) |
//! | `RowDeleter` | `delete` (1-based row numbers) |
//! | `TableInterpreter` | `header`?, `columns` |
//! | `RelationalLoader` | `table`, `file`, `if_exists`? |

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{QiError, Result};
use crate::table::{column_index, QiCellRange};

/// Loose declaration of a block, as handed over by a front-end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QiBlockDecl {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl QiBlockDecl {
    /// Creates a declaration from a kind and a JSON object of parameters.
    pub fn new(name: impl Into<String>, kind: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            kind: kind.into(),
            params,
        }
    }
}

/// Payload travelling along an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QiPayloadKind {
    Bytes,
    Archive,
    Text,
    Workbook,
    Table,
    TypedTable,
}

impl fmt::Display for QiPayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            QiPayloadKind::Bytes => "bytes",
            QiPayloadKind::Archive => "archive",
            QiPayloadKind::Text => "text",
            QiPayloadKind::Workbook => "workbook",
            QiPayloadKind::Table => "table",
            QiPayloadKind::TypedTable => "typed table",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QiArchiveKind {
    Zip,
    Gzip,
    Zstd,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QiEncoding {
    Utf8,
    Ascii,
    Latin1,
}

impl QiEncoding {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf8" | "utf-8" => Some(QiEncoding::Utf8),
            "ascii" | "us-ascii" => Some(QiEncoding::Ascii),
            "latin1" | "latin-1" | "iso-8859-1" => Some(QiEncoding::Latin1),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QiEncoding::Utf8 => "utf-8",
            QiEncoding::Ascii => "ascii",
            QiEncoding::Latin1 => "latin-1",
        }
    }
}

/// Column selector for the column deleter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QiColumnRef {
    /// 0-based position, written as letters in the declaration.
    Position(usize),
    /// Header cell value in the first row.
    Name(String),
}

impl fmt::Display for QiColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QiColumnRef::Position(idx) => f.write_str(&crate::table::column_letters(*idx)),
            QiColumnRef::Name(name) => f.write_str(name),
        }
    }
}

/// Declared (name, type name) schema binding; types resolve at compile time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QiColumnBinding {
    pub name: String,
    pub value_type: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum QiWriteMode {
    #[default]
    Append,
    Replace,
}

/// Delimited text options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QiDelimitedOptions {
    pub delimiter: u8,
    pub enclosing: Option<u8>,
    pub escape: Option<u8>,
}

impl Default for QiDelimitedOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            enclosing: Some(b'"'),
            escape: None,
        }
    }
}

/// Closed set of block kinds with validated parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum QiBlockKind {
    Extraction { source: String },
    ArchiveInterpreter { archive: QiArchiveKind },
    FilePicker { path: String },
    TextDecoder { encoding: QiEncoding },
    DelimitedInterpreter { options: QiDelimitedOptions },
    SpreadsheetInterpreter,
    SheetPicker { sheet: String },
    CellRangeSelector { range: QiCellRange },
    CellWriter { at: QiCellRange, values: Vec<String> },
    ColumnDeleter { columns: Vec<QiColumnRef> },
    RowDeleter { rows: Vec<usize> },
    TableInterpreter { header: bool, columns: Vec<QiColumnBinding> },
    RelationalLoader {
        table: String,
        file: PathBuf,
        mode: QiWriteMode,
    },
}

impl QiBlockKind {
    /// Payload the block consumes; `None` for source blocks.
    pub fn input(&self) -> Option<QiPayloadKind> {
        use QiBlockKind::*;
        match self {
            Extraction { .. } => None,
            ArchiveInterpreter { .. } | TextDecoder { .. } | SpreadsheetInterpreter => {
                Some(QiPayloadKind::Bytes)
            }
            FilePicker { .. } => Some(QiPayloadKind::Archive),
            DelimitedInterpreter { .. } => Some(QiPayloadKind::Text),
            SheetPicker { .. } => Some(QiPayloadKind::Workbook),
            CellRangeSelector { .. }
            | CellWriter { .. }
            | ColumnDeleter { .. }
            | RowDeleter { .. }
            | TableInterpreter { .. } => Some(QiPayloadKind::Table),
            RelationalLoader { .. } => Some(QiPayloadKind::TypedTable),
        }
    }

    /// Payload the block produces; `None` for sinks.
    pub fn output(&self) -> Option<QiPayloadKind> {
        use QiBlockKind::*;
        match self {
            Extraction { .. } | FilePicker { .. } => Some(QiPayloadKind::Bytes),
            ArchiveInterpreter { .. } => Some(QiPayloadKind::Archive),
            TextDecoder { .. } => Some(QiPayloadKind::Text),
            SpreadsheetInterpreter => Some(QiPayloadKind::Workbook),
            DelimitedInterpreter { .. }
            | SheetPicker { .. }
            | CellRangeSelector { .. }
            | CellWriter { .. }
            | ColumnDeleter { .. }
            | RowDeleter { .. } => Some(QiPayloadKind::Table),
            TableInterpreter { .. } => Some(QiPayloadKind::TypedTable),
            RelationalLoader { .. } => None,
        }
    }

    /// Kind name as written in declarations.
    pub fn kind_name(&self) -> &'static str {
        use QiBlockKind::*;
        match self {
            Extraction { .. } => "Extraction",
            ArchiveInterpreter { .. } => "ArchiveInterpreter",
            FilePicker { .. } => "FilePicker",
            TextDecoder { .. } => "TextDecoder",
            DelimitedInterpreter { .. } => "DelimitedInterpreter",
            SpreadsheetInterpreter => "SpreadsheetInterpreter",
            SheetPicker { .. } => "SheetPicker",
            CellRangeSelector { .. } => "CellRangeSelector",
            CellWriter { .. } => "CellWriter",
            ColumnDeleter { .. } => "ColumnDeleter",
            RowDeleter { .. } => "RowDeleter",
            TableInterpreter { .. } => "TableInterpreter",
            RelationalLoader { .. } => "RelationalLoader",
        }
    }

    /// Validates a declaration's parameters against its kind.
    pub fn from_decl(decl: &QiBlockDecl) -> Result<Self> {
        let params = Params {
            block: &decl.name,
            map: &decl.params,
        };
        let kind = match decl.kind.as_str() {
            "Extraction" => QiBlockKind::Extraction {
                source: params.required_str("source")?.to_string(),
            },
            "ArchiveInterpreter" => {
                let archive = match params.required_str("archive")?.to_ascii_lowercase().as_str() {
                    "zip" => QiArchiveKind::Zip,
                    "gz" | "gzip" => QiArchiveKind::Gzip,
                    "zst" | "zstd" => QiArchiveKind::Zstd,
                    other => {
                        return Err(params.invalid("archive", format!("unsupported archive kind '{}'", other)))
                    }
                };
                if cfg!(not(feature = "compression")) && archive != QiArchiveKind::Zip {
                    return Err(params.invalid("archive", "gzip and zstd archives require the 'compression' feature"));
                }
                QiBlockKind::ArchiveInterpreter { archive }
            }
            "FilePicker" => QiBlockKind::FilePicker {
                path: params.required_str("path")?.to_string(),
            },
            "TextDecoder" => {
                let encoding = match params.optional_str("encoding")? {
                    None => QiEncoding::Utf8,
                    Some(name) => QiEncoding::parse(name)
                        .ok_or_else(|| params.invalid("encoding", format!("unsupported encoding '{}'", name)))?,
                };
                QiBlockKind::TextDecoder { encoding }
            }
            "DelimitedInterpreter" => {
                let defaults = QiDelimitedOptions::default();
                let delimiter = match params.optional_str("delimiter")? {
                    None => defaults.delimiter,
                    Some(text) => params.single_byte("delimiter", text)?,
                };
                let enclosing = match params.optional_str("enclosing")? {
                    None => defaults.enclosing,
                    Some("") => None,
                    Some(text) => Some(params.single_byte("enclosing", text)?),
                };
                let escape = match params.optional_str("escape")? {
                    None | Some("") => None,
                    Some(text) => Some(params.single_byte("escape", text)?),
                };
                if Some(delimiter) == enclosing {
                    return Err(params.invalid("enclosing", "must differ from the delimiter"));
                }
                QiBlockKind::DelimitedInterpreter {
                    options: QiDelimitedOptions {
                        delimiter,
                        enclosing,
                        escape,
                    },
                }
            }
            "SpreadsheetInterpreter" => {
                if cfg!(not(feature = "excel")) {
                    return Err(params.invalid("kind", "spreadsheets require the 'excel' feature"));
                }
                QiBlockKind::SpreadsheetInterpreter
            }
            "SheetPicker" => QiBlockKind::SheetPicker {
                sheet: params.required_str("sheet")?.to_string(),
            },
            "CellRangeSelector" => QiBlockKind::CellRangeSelector {
                range: params.range("select")?,
            },
            "CellWriter" => {
                let at = params.range("at")?;
                let values = params
                    .required("write")?
                    .as_array()
                    .ok_or_else(|| params.invalid("write", "must be an array of strings"))?
                    .iter()
                    .map(|value| match value {
                        Value::String(text) => Ok(text.clone()),
                        Value::Number(number) => Ok(number.to_string()),
                        Value::Bool(flag) => Ok(flag.to_string()),
                        _ => Err(params.invalid("write", "values must be scalars")),
                    })
                    .collect::<Result<Vec<_>>>()?;
                if let Some(cells) = at.fixed_cell_count() {
                    if cells != values.len() {
                        return Err(params.invalid(
                            "write",
                            format!("range {} holds {} cells but {} values are given", at, cells, values.len()),
                        ));
                    }
                }
                QiBlockKind::CellWriter { at, values }
            }
            "ColumnDeleter" => {
                let mut columns = Vec::new();
                for letters in params.optional_str_list("delete")? {
                    let position = column_index(&letters)
                        .ok_or_else(|| params.invalid("delete", format!("'{}' is not a column", letters)))?;
                    columns.push(QiColumnRef::Position(position));
                }
                for name in params.optional_str_list("names")? {
                    columns.push(QiColumnRef::Name(name));
                }
                if columns.is_empty() {
                    return Err(params.invalid("delete", "no columns to delete"));
                }
                QiBlockKind::ColumnDeleter { columns }
            }
            "RowDeleter" => {
                let rows = params
                    .required("delete")?
                    .as_array()
                    .ok_or_else(|| params.invalid("delete", "must be an array of row numbers"))?
                    .iter()
                    .map(|value| match value.as_u64() {
                        Some(number) if number > 0 => Ok(number as usize - 1),
                        _ => Err(params.invalid("delete", "row numbers start at 1")),
                    })
                    .collect::<Result<Vec<_>>>()?;
                if rows.is_empty() {
                    return Err(params.invalid("delete", "no rows to delete"));
                }
                QiBlockKind::RowDeleter { rows }
            }
            "TableInterpreter" => {
                let header = match params.map.get("header") {
                    None => true,
                    Some(value) => value
                        .as_bool()
                        .ok_or_else(|| params.invalid("header", "must be boolean"))?,
                };
                let columns = params.columns()?;
                QiBlockKind::TableInterpreter { header, columns }
            }
            "RelationalLoader" => {
                let table = params.required_str("table")?;
                if table.is_empty() {
                    return Err(params.invalid("table", "may not be empty"));
                }
                let mode = match params.optional_str("if_exists")? {
                    None | Some("append") => QiWriteMode::Append,
                    Some("replace") => QiWriteMode::Replace,
                    Some(other) => {
                        return Err(params.invalid("if_exists", format!("expected 'append' or 'replace', got '{}'", other)))
                    }
                };
                QiBlockKind::RelationalLoader {
                    table: table.to_string(),
                    file: PathBuf::from(params.required_str("file")?),
                    mode,
                }
            }
            other => {
                return Err(QiError::UnknownBlockKind {
                    block: decl.name.clone(),
                    kind: other.to_string(),
                })
            }
        };
        Ok(kind)
    }
}

struct Params<'a> {
    block: &'a str,
    map: &'a Map<String, Value>,
}

impl<'a> Params<'a> {
    fn invalid(&self, parameter: &str, message: impl Into<String>) -> QiError {
        QiError::parameter(self.block, parameter, message)
    }

    fn required(&self, key: &str) -> Result<&'a Value> {
        self.map
            .get(key)
            .ok_or_else(|| self.invalid(key, "required parameter is missing"))
    }

    fn required_str(&self, key: &str) -> Result<&'a str> {
        self.required(key)?
            .as_str()
            .ok_or_else(|| self.invalid(key, "must be a string"))
    }

    fn optional_str(&self, key: &str) -> Result<Option<&'a str>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "must be a string")),
        }
    }

    fn optional_str_list(&self, key: &str) -> Result<Vec<String>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.invalid(key, "must be an array of strings"))
                })
                .collect(),
            Some(_) => Err(self.invalid(key, "must be an array of strings")),
        }
    }

    fn single_byte(&self, key: &str, text: &str) -> Result<u8> {
        match text.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(self.invalid(key, "must be a single ASCII character")),
        }
    }

    fn range(&self, key: &str) -> Result<QiCellRange> {
        self.required_str(key)?
            .parse()
            .map_err(|message: String| self.invalid(key, message))
    }

    /// Reads `columns` as `[{"name": "type"}, ...]` or
    /// `[{"name": ..., "type": ...}, ...]`.
    fn columns(&self) -> Result<Vec<QiColumnBinding>> {
        let items = self
            .required("columns")?
            .as_array()
            .ok_or_else(|| self.invalid("columns", "must be an array"))?;
        if items.is_empty() {
            return Err(self.invalid("columns", "may not be empty"));
        }
        let mut bindings: Vec<QiColumnBinding> = Vec::with_capacity(items.len());
        for item in items {
            let object = item
                .as_object()
                .ok_or_else(|| self.invalid("columns", "entries must be objects"))?;
            let binding = match (object.get("name"), object.get("type")) {
                (Some(Value::String(name)), Some(Value::String(value_type))) => QiColumnBinding {
                    name: name.clone(),
                    value_type: value_type.clone(),
                },
                _ if object.len() == 1 => {
                    let (name, value_type) = object
                        .iter()
                        .next()
                        .ok_or_else(|| self.invalid("columns", "entries must not be empty"))?;
                    let value_type = value_type
                        .as_str()
                        .ok_or_else(|| self.invalid("columns", format!("type of '{}' must be a string", name)))?;
                    QiColumnBinding {
                        name: name.clone(),
                        value_type: value_type.to_string(),
                    }
                }
                _ => return Err(self.invalid("columns", "entries must be {name: type} or {name, type}")),
            };
            if bindings.iter().any(|existing| existing.name == binding.name) {
                return Err(self.invalid("columns", format!("column '{}' declared twice", binding.name)));
            }
            bindings.push(binding);
        }
        Ok(bindings)
    }
}
