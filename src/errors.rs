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

//! # Qi Error Module
//!
//! This module defines the error types used throughout the Qi engine.
//!
//! ## Error Phases
//!
//! Qi distinguishes two phases:
//!
//! - **Compile time**: problems with the pipeline graph itself (unknown block
//!   kinds, bad parameters, illegal edges, cycles, unresolved type or
//!   constraint names). These abort the whole pipeline before any extraction
//!   happens.
//! - **Run time**: problems with the data flowing through one block
//!   (unreachable sources, corrupt archives, malformed rows, storage
//!   failures). These abort the failing block and its downstream dependents
//!   only; sibling components keep running.
//!
//! Rows that fail schema validation are not errors at all: the table
//! interpreter drops and counts them.
//!
//! Every variant carries the block name (and row/column context where it
//! applies) so a failure is actionable from the report alone.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zip::result::ZipError;

/// Convenience result type used throughout Qi.
pub type Result<T> = std::result::Result<T, QiError>;

/// Reason an extraction could not produce bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QiExtractionCause {
    Network,
    NotFound,
    Timeout,
}

impl fmt::Display for QiExtractionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            QiExtractionCause::Network => "network",
            QiExtractionCause::NotFound => "notfound",
            QiExtractionCause::Timeout => "timeout",
        };
        f.write_str(text)
    }
}

/// Canonical error enumeration for Qi.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum QiError {
    /// Errors originating from filesystem IO outside of a block.
    #[error("io error: {0}")]
    Io(String),

    /// Wrapper for serde-style serialization issues.
    #[error("serialization error: {0}")]
    Serde(String),

    /// A raw table was built from rows of differing widths.
    #[error("validation error: {message}")]
    Validation { message: String },

    // Compile-time errors.
    /// A block declares a kind outside the supported set.
    #[error("block '{block}' has unknown kind '{kind}'")]
    UnknownBlockKind { block: String, kind: String },

    /// A block (or constraint) parameter is missing or has the wrong shape.
    #[error("'{block}' has invalid parameter '{parameter}': {message}")]
    InvalidParameter {
        block: String,
        parameter: String,
        message: String,
    },

    /// Two declarations share one name.
    #[error("duplicate {what} name '{name}'")]
    DuplicateName { what: String, name: String },

    /// An edge references a block that is not declared.
    #[error("edge references unknown block '{name}'")]
    UnknownBlock { name: String },

    /// An edge violates block arity or payload compatibility.
    #[error("invalid edge '{from}' -> '{to}': {message}")]
    InvalidEdge {
        from: String,
        to: String,
        message: String,
    },

    /// The block graph contains a cycle passing through `block`.
    #[error("pipeline contains a cycle through block '{block}'")]
    CyclicPipeline { block: String },

    /// A value type name could not be resolved.
    #[error("unknown value type '{name}'")]
    UnknownType { name: String },

    /// A constraint name could not be resolved.
    #[error("unknown constraint '{name}'")]
    UnknownConstraint { name: String },

    /// A constraint cannot apply to the base primitive of a value type.
    #[error("constraint '{constraint}' cannot apply to value type '{value_type}': {message}")]
    IncompatibleConstraint {
        value_type: String,
        constraint: String,
        message: String,
    },

    // Run-time errors, fatal to the failing block and its dependents.
    /// The source could not be fetched.
    #[error("block '{block}' failed to extract ({cause}): {message}")]
    Extraction {
        block: String,
        cause: QiExtractionCause,
        message: String,
    },

    /// Bytes did not match the declared archive kind.
    #[error("block '{block}' could not read archive: {message}")]
    ArchiveFormat { block: String, message: String },

    /// The requested archive member does not exist.
    #[error("block '{block}' found no archive member '{path}'")]
    MemberNotFound { block: String, path: String },

    /// Bytes are invalid for the declared encoding.
    #[error("block '{block}' could not decode {encoding} at byte {offset}")]
    Decoding {
        block: String,
        encoding: String,
        offset: usize,
    },

    /// A delimited row has a different width than the first row.
    #[error("block '{block}' row {row} has {found} columns, expected {expected}")]
    MalformedRow {
        block: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The requested workbook sheet does not exist.
    #[error("block '{block}' found no sheet '{sheet}'")]
    SheetNotFound { block: String, sheet: String },

    /// A cell range, row or column index lies outside the table.
    #[error("block '{block}' cell range error: {message}")]
    CellRange { block: String, message: String },

    /// A column to delete does not exist.
    #[error("block '{block}' has no column '{column}'")]
    UnknownColumn { block: String, column: String },

    /// A cell writer received the wrong number of values.
    #[error("block '{block}' range holds {expected} cells but {found} values were given")]
    CellCountMismatch {
        block: String,
        expected: usize,
        found: usize,
    },

    /// A schema column is absent from the source table.
    #[error("block '{block}' source table lacks schema column '{column}'")]
    MissingColumn { block: String, column: String },

    /// A schema column appears more than once in the header row.
    #[error("block '{block}' header names column '{column}' more than once")]
    DuplicateColumn { block: String, column: String },

    /// Persisting a relation failed.
    #[error("block '{block}' failed to write relation '{relation}': {message}")]
    StorageWrite {
        block: String,
        relation: String,
        message: String,
    },

    /// Catch-all variant for unexpected situations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for QiError {
    fn from(err: io::Error) -> Self {
        QiError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for QiError {
    fn from(err: serde_json::Error) -> Self {
        QiError::Serde(err.to_string())
    }
}

impl From<serde_yaml::Error> for QiError {
    fn from(err: serde_yaml::Error) -> Self {
        QiError::Serde(err.to_string())
    }
}

impl From<ZipError> for QiError {
    fn from(err: ZipError) -> Self {
        QiError::Internal(format!("zip: {}", err))
    }
}

impl QiError {
    /// Helper to construct simple validation errors.
    pub fn validation<T: Into<String>>(message: T) -> Self {
        QiError::Validation {
            message: message.into(),
        }
    }

    /// Helper to construct parameter errors.
    pub fn parameter(
        block: impl Into<String>,
        parameter: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        QiError::InvalidParameter {
            block: block.into(),
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Helper to construct edge errors.
    pub fn edge(from: impl Into<String>, to: impl Into<String>, message: impl Into<String>) -> Self {
        QiError::InvalidEdge {
            from: from.into(),
            to: to.into(),
            message: message.into(),
        }
    }

    /// Helper to construct cell range errors.
    pub fn cell_range(block: impl Into<String>, message: impl Into<String>) -> Self {
        QiError::CellRange {
            block: block.into(),
            message: message.into(),
        }
    }

    /// Helper to construct storage errors.
    pub fn storage(
        block: impl Into<String>,
        relation: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        QiError::StorageWrite {
            block: block.into(),
            relation: relation.into(),
            message: message.to_string(),
        }
    }

    /// Helper to construct internal errors.
    pub fn internal<T: Into<String>>(message: T) -> Self {
        QiError::Internal(message.into())
    }

    /// Returns true for errors raised while compiling a pipeline graph.
    pub fn is_compile_time(&self) -> bool {
        matches!(
            self,
            QiError::UnknownBlockKind { .. }
                | QiError::InvalidParameter { .. }
                | QiError::DuplicateName { .. }
                | QiError::UnknownBlock { .. }
                | QiError::InvalidEdge { .. }
                | QiError::CyclicPipeline { .. }
                | QiError::UnknownType { .. }
                | QiError::UnknownConstraint { .. }
                | QiError::IncompatibleConstraint { .. }
        )
    }

    /// Name of the block the error is attributed to, when there is one.
    pub fn block(&self) -> Option<&str> {
        match self {
            QiError::UnknownBlockKind { block, .. }
            | QiError::InvalidParameter { block, .. }
            | QiError::CyclicPipeline { block }
            | QiError::Extraction { block, .. }
            | QiError::ArchiveFormat { block, .. }
            | QiError::MemberNotFound { block, .. }
            | QiError::Decoding { block, .. }
            | QiError::MalformedRow { block, .. }
            | QiError::SheetNotFound { block, .. }
            | QiError::CellRange { block, .. }
            | QiError::UnknownColumn { block, .. }
            | QiError::CellCountMismatch { block, .. }
            | QiError::MissingColumn { block, .. }
            | QiError::DuplicateColumn { block, .. }
            | QiError::StorageWrite { block, .. } => Some(block),
            _ => None,
        }
    }
}
