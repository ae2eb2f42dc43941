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

//! # Block Graph Compiler
//!
//! Turns a [`QiPipeline`] declaration into an executable
//! [`QiCompiledPipeline`]. Compilation is pure and runs these checks in
//! order, stopping at the first failure:
//!
//! 1. every block kind is known and its parameters are well-formed;
//! 2. every edge names declared blocks;
//! 3. the graph is acyclic;
//! 4. edges respect arity (no block takes more than one input, extractions
//!    take none, loaders feed nothing) and connect a producer to a consumer
//!    of the same payload;
//! 5. constraints, value types and every schema type name resolve.
//!
//! A non-source block without any input is never run. The default compiler
//! logs a warning for it; a strict compiler rejects it.

use std::sync::Arc;

use crate::block::QiBlockKind;
use crate::dag::{QiNodeId, QiDAG};
use crate::errors::{QiError, Result};
use crate::pipeline::QiPipeline;
use crate::table::{QiColumn, QiSchema};
use crate::types::QiTypeRegistry;

/// One block ready for execution.
#[derive(Clone, Debug)]
pub struct QiCompiledBlock {
    pub name: String,
    pub kind: QiBlockKind,
    /// Resolved schema of a table interpreter.
    pub schema: Option<QiSchema>,
}

/// Output of the compiler: ordered blocks plus the frozen symbol table.
#[derive(Debug)]
pub struct QiCompiledPipeline {
    name: String,
    dag: QiDAG,
    blocks: Vec<QiCompiledBlock>,
    order: Vec<QiNodeId>,
    registry: Arc<QiTypeRegistry>,
}

impl QiCompiledPipeline {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dag(&self) -> &QiDAG {
        &self.dag
    }

    pub fn block(&self, id: QiNodeId) -> &QiCompiledBlock {
        &self.blocks[id.0]
    }

    /// Block by name.
    pub fn block_named(&self, name: &str) -> Option<&QiCompiledBlock> {
        self.dag.node_id(name).map(|id| self.block(id))
    }

    /// Topological execution order.
    pub fn order(&self) -> &[QiNodeId] {
        &self.order
    }

    /// Block names in execution order.
    pub fn ordered_names(&self) -> Vec<&str> {
        self.order.iter().map(|&id| self.dag.name(id)).collect()
    }

    pub fn registry(&self) -> &QiTypeRegistry {
        &self.registry
    }

    /// Weakly connected components, each in execution order.
    pub fn components(&self) -> Vec<Vec<QiNodeId>> {
        self.dag.components(&self.order)
    }
}

#[derive(Debug, Default)]
pub struct QiCompiler {
    strict: bool,
}

impl QiCompiler {
    pub fn new() -> Self {
        Self { strict: false }
    }

    /// Rejects non-source blocks that have no input.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn compile(&self, pipeline: &QiPipeline) -> Result<QiCompiledPipeline> {
        // Block kinds and parameters.
        let mut dag = QiDAG::new();
        let mut kinds = Vec::with_capacity(pipeline.blocks.len());
        for decl in &pipeline.blocks {
            let kind = QiBlockKind::from_decl(decl)?;
            dag.add_node(decl.name.clone())?;
            kinds.push(kind);
        }

        // Edges; cycles are reported before arity errors.
        for edge in &pipeline.edges {
            dag.add_edge(&edge.from, &edge.to)?;
        }
        let order = dag.topological_sort()?;
        self.check_edges(&dag, &kinds)?;

        // Type resolution.
        let registry = QiTypeRegistry::build(&pipeline.constraints, &pipeline.value_types)?;
        let blocks = pipeline
            .blocks
            .iter()
            .zip(kinds)
            .map(|(decl, kind)| {
                let schema = match &kind {
                    QiBlockKind::TableInterpreter { columns, .. } => Some(
                        columns
                            .iter()
                            .map(|binding| {
                                Ok(QiColumn {
                                    name: binding.name.clone(),
                                    value_type: registry.resolve(&binding.value_type)?,
                                })
                            })
                            .collect::<Result<QiSchema>>()?,
                    ),
                    _ => None,
                };
                Ok(QiCompiledBlock {
                    name: decl.name.clone(),
                    kind,
                    schema,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "compiled pipeline '{}': {} blocks, {} edges, {} value types",
            pipeline.name,
            blocks.len(),
            pipeline.edges.len(),
            registry.type_count()
        );

        Ok(QiCompiledPipeline {
            name: pipeline.name.clone(),
            dag,
            blocks,
            order,
            registry: Arc::new(registry),
        })
    }

    fn check_edges(&self, dag: &QiDAG, kinds: &[QiBlockKind]) -> Result<()> {
        for id in dag.node_ids() {
            let kind = &kinds[id.0];
            let name = dag.name(id);
            let inputs = dag.predecessors(id);

            match kind.input() {
                None => {
                    if let Some(&from) = inputs.first() {
                        return Err(QiError::edge(
                            dag.name(from),
                            name,
                            format!("{} blocks take no input", kind.kind_name()),
                        ));
                    }
                }
                Some(expected) => {
                    if inputs.len() > 1 {
                        return Err(QiError::edge(
                            dag.name(inputs[1]),
                            name,
                            format!("'{}' already has input '{}'", name, dag.name(inputs[0])),
                        ));
                    }
                    match inputs.first() {
                        Some(&from) => {
                            let produced = kinds[from.0].output();
                            if produced != Some(expected) {
                                return Err(QiError::edge(
                                    dag.name(from),
                                    name,
                                    format!(
                                        "{} consumes {} but '{}' produces {}",
                                        kind.kind_name(),
                                        expected,
                                        dag.name(from),
                                        produced.map_or("nothing".to_string(), |p| p.to_string())
                                    ),
                                ));
                            }
                        }
                        None if self.strict => {
                            return Err(QiError::edge("", name, "block has no input"));
                        }
                        None => {
                            log::warn!("block '{}' has no input and will not run", name);
                        }
                    }
                }
            }

            if kind.output().is_none() {
                if let Some(&to) = dag.successors(id).first() {
                    return Err(QiError::edge(
                        name,
                        dag.name(to),
                        format!("{} blocks produce no output", kind.kind_name()),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl QiCompiledPipeline {
    /// True for blocks that can run: sources and blocks with a producer.
    pub fn is_reachable(&self, id: QiNodeId) -> bool {
        self.block(id).kind.input().is_none() || !self.dag.predecessors(id).is_empty()
    }
}
