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

//! # Pipeline Executor
//!
//! Runs a compiled pipeline and reports what happened to every block.
//!
//! ## Scheduling
//!
//! The graph is split into weakly connected components. Inside a component,
//! blocks run strictly in topological order and each block starts only after
//! its producer succeeded. Components share nothing but the target store, so
//! with the `parallel` feature they run concurrently on the Rayon pool.
//!
//! ## Failure Isolation
//!
//! A run-time error fails its block and skips every block downstream of it.
//! Other branches of the same component and all other components carry on,
//! so a broken source never blocks an unrelated relation from loading.
//!
//! ## Example
//!
//! ```rust,no_run
//! use qix::{QiExecutor, QiExecutorConfig, QiPipeline};
//!
//! # fn main() -> qix::Result<()> {
//! let text = std::fs::read_to_string("pipeline.yaml")?;
//! let pipeline = QiPipeline::from_yaml(&text)?;
//! let report = QiExecutor::new(QiExecutorConfig::default()).run_pipeline(&pipeline)?;
//! for block in report.blocks() {
//!     println!("{}: {}", block.name, block.status);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compiler::QiCompiledPipeline;
use crate::config::QiExecutorConfig;
use crate::dag::QiNodeId;
use crate::errors::{QiError, Result};
use crate::pipeline::QiPipeline;
use crate::stages::{self, QiPayload, QiStageDetail};

/// Outcome of one block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum QiBlockStatus {
    Succeeded,
    Failed(QiError),
    /// Not run because `upstream` failed.
    Skipped { upstream: String },
    /// Not run because the block has no input.
    Unreachable,
}

impl fmt::Display for QiBlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QiBlockStatus::Succeeded => f.write_str("succeeded"),
            QiBlockStatus::Failed(err) => write!(f, "failed: {}", err),
            QiBlockStatus::Skipped { upstream } => write!(f, "skipped (upstream '{}' failed)", upstream),
            QiBlockStatus::Unreachable => f.write_str("unreachable"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QiBlockReport {
    pub name: String,
    pub kind: String,
    pub status: QiBlockStatus,
    pub detail: QiStageDetail,
}

/// Per-block outcomes in execution order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QiExecutionReport {
    pub pipeline: String,
    blocks: Vec<QiBlockReport>,
}

impl QiExecutionReport {
    pub fn blocks(&self) -> &[QiBlockReport] {
        &self.blocks
    }

    pub fn block(&self, name: &str) -> Option<&QiBlockReport> {
        self.blocks.iter().find(|block| block.name == name)
    }

    pub fn status(&self, name: &str) -> Option<&QiBlockStatus> {
        self.block(name).map(|block| &block.status)
    }

    /// True when every block succeeded.
    pub fn is_success(&self) -> bool {
        self.blocks
            .iter()
            .all(|block| block.status == QiBlockStatus::Succeeded)
    }

    /// Errors of failed blocks, by block name.
    pub fn failures(&self) -> Vec<(&str, &QiError)> {
        self.blocks
            .iter()
            .filter_map(|block| match &block.status {
                QiBlockStatus::Failed(err) => Some((block.name.as_str(), err)),
                _ => None,
            })
            .collect()
    }

    /// Rows a table interpreter dropped.
    pub fn dropped(&self, name: &str) -> Option<usize> {
        match self.block(name).map(|block| &block.detail) {
            Some(QiStageDetail::Interpreted { dropped, .. }) => Some(*dropped),
            _ => None,
        }
    }

    /// Rows a loader committed.
    pub fn loaded(&self, name: &str) -> Option<usize> {
        match self.block(name).map(|block| &block.detail) {
            Some(QiStageDetail::Loaded { rows, .. }) => Some(*rows),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Clone, Debug, Default)]
pub struct QiExecutor {
    config: QiExecutorConfig,
}

impl QiExecutor {
    pub fn new(config: QiExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QiExecutorConfig {
        &self.config
    }

    /// Compiles and runs a pipeline. Only compile errors are returned as
    /// `Err`; run-time failures are recorded in the report.
    pub fn run_pipeline(&self, pipeline: &QiPipeline) -> Result<QiExecutionReport> {
        let compiled = pipeline.compile()?;
        Ok(self.run(&compiled))
    }

    pub fn run(&self, pipeline: &QiCompiledPipeline) -> QiExecutionReport {
        let components = pipeline.components();
        log::info!(
            "running pipeline '{}': {} blocks in {} components",
            pipeline.name(),
            pipeline.order().len(),
            components.len()
        );

        let mut reports: Vec<(QiNodeId, QiBlockReport)> = self
            .run_components(pipeline, &components)
            .into_iter()
            .flatten()
            .collect();

        let position: HashMap<QiNodeId, usize> = pipeline
            .order()
            .iter()
            .enumerate()
            .map(|(position, &id)| (id, position))
            .collect();
        reports.sort_by_key(|(id, _)| position.get(id).copied().unwrap_or(usize::MAX));

        let report = QiExecutionReport {
            pipeline: pipeline.name().to_string(),
            blocks: reports.into_iter().map(|(_, report)| report).collect(),
        };
        if report.is_success() {
            log::info!("pipeline '{}' finished", pipeline.name());
        } else {
            log::warn!(
                "pipeline '{}' finished with {} failed blocks",
                pipeline.name(),
                report.failures().len()
            );
        }
        report
    }

    #[cfg(feature = "parallel")]
    fn run_components(
        &self,
        pipeline: &QiCompiledPipeline,
        components: &[Vec<QiNodeId>],
    ) -> Vec<Vec<(QiNodeId, QiBlockReport)>> {
        use rayon::prelude::*;

        if self.config.parallel && components.len() > 1 {
            components
                .par_iter()
                .map(|component| self.run_component(pipeline, component))
                .collect()
        } else {
            components
                .iter()
                .map(|component| self.run_component(pipeline, component))
                .collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn run_components(
        &self,
        pipeline: &QiCompiledPipeline,
        components: &[Vec<QiNodeId>],
    ) -> Vec<Vec<(QiNodeId, QiBlockReport)>> {
        components
            .iter()
            .map(|component| self.run_component(pipeline, component))
            .collect()
    }

    fn run_component(
        &self,
        pipeline: &QiCompiledPipeline,
        component: &[QiNodeId],
    ) -> Vec<(QiNodeId, QiBlockReport)> {
        let dag = pipeline.dag();
        let mut outputs: HashMap<QiNodeId, QiPayload> = HashMap::new();
        let mut pending: HashMap<QiNodeId, usize> = HashMap::new();
        let mut statuses: HashMap<QiNodeId, QiBlockStatus> = HashMap::new();
        let mut reports = Vec::with_capacity(component.len());

        for &id in component {
            let block = pipeline.block(id);
            let producer = dag.predecessors(id).first().copied();

            let blocked = match producer.and_then(|p| statuses.get(&p)) {
                None if !pipeline.is_reachable(id) => Some(QiBlockStatus::Unreachable),
                None | Some(QiBlockStatus::Succeeded) => None,
                Some(QiBlockStatus::Failed(_)) => Some(QiBlockStatus::Skipped {
                    upstream: producer.map(|p| dag.name(p).to_string()).unwrap_or_default(),
                }),
                Some(status) => Some(status.clone()),
            };

            let (status, detail) = match blocked {
                Some(status) => {
                    log::debug!("block '{}' not run: {}", block.name, status);
                    (status, QiStageDetail::None)
                }
                None => {
                    let input = producer.and_then(|p| take_input(&mut outputs, &mut pending, p));
                    match stages::execute(block, input, &self.config) {
                        Ok(output) => {
                            let consumers = dag.successors(id).len();
                            if let (Some(payload), true) = (output.payload, consumers > 0) {
                                outputs.insert(id, payload);
                                pending.insert(id, consumers);
                            }
                            (QiBlockStatus::Succeeded, output.detail)
                        }
                        Err(err) => {
                            log::warn!("block '{}' failed: {}", block.name, err);
                            (QiBlockStatus::Failed(err), QiStageDetail::None)
                        }
                    }
                }
            };

            statuses.insert(id, status.clone());
            reports.push((
                id,
                QiBlockReport {
                    name: block.name.clone(),
                    kind: block.kind.kind_name().to_string(),
                    status,
                    detail,
                },
            ));
        }
        reports
    }
}

/// Hands a producer's payload to one consumer; the last consumer takes it.
fn take_input(
    outputs: &mut HashMap<QiNodeId, QiPayload>,
    pending: &mut HashMap<QiNodeId, usize>,
    producer: QiNodeId,
) -> Option<QiPayload> {
    let remaining = pending.get_mut(&producer)?;
    *remaining -= 1;
    if *remaining == 0 {
        pending.remove(&producer);
        outputs.remove(&producer)
    } else {
        outputs.get(&producer).cloned()
    }
}
