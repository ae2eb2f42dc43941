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

//! # Qi Core Library
//!
//! Qi compiles declarative block pipelines and runs them. A pipeline pulls
//! data from remote or local sources, unpacks archives, decodes text, parses
//! delimited files or spreadsheets, reshapes the resulting tables, validates
//! every row against user-declared value types and loads the surviving rows
//! into SQLite relations.
//!
//! ## Module Overview
//!
//! - **errors**: `QiError` and the crate-wide `Result` alias
//! - **value**: primitives and parsed cell values
//! - **constraint**: regex, range, equality, allowlist and length constraints
//! - **types**: value types and the per-pipeline type registry
//! - **table**: untyped and typed tables, cell addressing
//! - **block**: block declarations and the closed set of block kinds
//! - **dag**: arena graph with cycle detection and topological order
//! - **pipeline**: uncompiled pipeline declarations (builder, JSON, YAML)
//! - **compiler**: validation of a declaration into an executable pipeline
//! - **stages**: one function per block kind
//! - **executor**: component scheduling and the execution report
//! - **config**: executor settings
//!
//! ## Feature Flags
//!
//! - `parallel`: run disjoint components concurrently with Rayon
//! - `compression`: gzip and zstd archive interpreters
//! - `excel`: xlsx spreadsheet interpreter through calamine
//! - `full`: all of the above (default)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qix::{QiExecutor, QiPipeline};
//! use serde_json::json;
//!
//! # fn main() -> qix::Result<()> {
//! let pipeline = QiPipeline::new("Trees")
//!     .constraint("GermanId", "regex", json!({"pattern": "^DE"}))
//!     .value_type("TreeId", "text", &["GermanId"])
//!     .block("Fetch", "Extraction", json!({"source": "trees.csv"}))
//!     .block("Decode", "TextDecoder", json!({}))
//!     .block("Parse", "DelimitedInterpreter", json!({"delimiter": ";"}))
//!     .block("Type", "TableInterpreter", json!({"columns": [{"id": "TreeId"}]}))
//!     .block("Load", "RelationalLoader", json!({"table": "trees", "file": "trees.sqlite"}))
//!     .pipe(&["Fetch", "Decode", "Parse", "Type", "Load"]);
//!
//! let report = QiExecutor::default().run_pipeline(&pipeline)?;
//! println!("dropped {:?} rows", report.dropped("Type"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Compile errors reject the whole pipeline before any source is touched.
//! Run-time errors only fail the block that raised them and skip its
//! dependents; they are recorded in the [`QiExecutionReport`]. Rows that do
//! not conform to their value types are dropped and counted, never raised.

pub mod block;
pub mod compiler;
pub mod config;
pub mod constraint;
pub mod dag;
pub mod errors;
pub mod executor;
pub mod pipeline;
pub mod stages;
pub mod table;
pub mod types;
pub mod value;

pub use block::{
    QiArchiveKind, QiBlockDecl, QiBlockKind, QiColumnBinding, QiColumnRef, QiDelimitedOptions,
    QiEncoding, QiPayloadKind, QiWriteMode,
};
pub use compiler::{QiCompiledBlock, QiCompiledPipeline, QiCompiler};
pub use config::{QiExecutorConfig, QiExecutorConfigBuilder};
pub use constraint::{QiBound, QiConstraint, QiConstraintDecl, QiConstraintKind};
pub use dag::{QiNodeId, QiDAG};
pub use errors::{QiError, QiExtractionCause, Result};
pub use executor::{QiBlockReport, QiBlockStatus, QiExecutionReport, QiExecutor};
pub use pipeline::{QiEdgeDecl, QiPipeline};
pub use stages::load::read_relation;
pub use stages::{QiArchive, QiBytes, QiDroppedRow, QiInterpretation, QiPayload, QiStageDetail, QiWorkbook};
pub use table::{
    QiCellCoordinate, QiCellRange, QiColumn, QiIndex, QiRect, QiSchema, QiTable, QiTypedTable,
};
pub use types::{QiNonConformance, QiTypeRegistry, QiValueType, QiValueTypeDecl};
pub use value::{QiPrimitive, QiValue};
