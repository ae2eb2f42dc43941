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

//! # Pipeline Declarations
//!
//! [`QiPipeline`] is the pre-parsed block graph a front-end hands to the
//! engine: block, constraint and value type declarations plus the edges
//! between blocks. Nothing is validated here; [`QiPipeline::compile`] runs
//! the compiler.
//!
//! The structure is plain serde data, so a graph can also be loaded from
//! JSON or YAML:
//!
//! ```json
//! {
//!   "name": "Trees",
//!   "blocks": [
//!     {"name": "Fetch", "kind": "Extraction", "params": {"source": "trees.csv"}},
//!     {"name": "Decode", "kind": "TextDecoder"}
//!   ],
//!   "edges": [{"from": "Fetch", "to": "Decode"}]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::QiBlockDecl;
use crate::compiler::{QiCompiledPipeline, QiCompiler};
use crate::constraint::QiConstraintDecl;
use crate::errors::Result;
use crate::types::QiValueTypeDecl;

/// Directed edge between two named blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QiEdgeDecl {
    pub from: String,
    pub to: String,
}

/// Uncompiled pipeline graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QiPipeline {
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<QiBlockDecl>,
    #[serde(default)]
    pub constraints: Vec<QiConstraintDecl>,
    #[serde(default)]
    pub value_types: Vec<QiValueTypeDecl>,
    #[serde(default)]
    pub edges: Vec<QiEdgeDecl>,
}

impl QiPipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declares a block.
    pub fn block(mut self, name: &str, kind: &str, params: Value) -> Self {
        self.blocks.push(QiBlockDecl::new(name, kind, params));
        self
    }

    /// Declares a constraint.
    pub fn constraint(mut self, name: &str, kind: &str, params: Value) -> Self {
        self.constraints.push(QiConstraintDecl::new(name, kind, params));
        self
    }

    /// Declares a value type over a primitive with the named constraints.
    pub fn value_type(mut self, name: &str, base: &str, constraints: &[&str]) -> Self {
        self.value_types
            .push(QiValueTypeDecl::new(name, base, constraints));
        self
    }

    /// Declares one edge.
    pub fn edge(mut self, from: &str, to: &str) -> Self {
        self.edges.push(QiEdgeDecl {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// Declares edges along a chain of blocks: `a -> b -> c`.
    pub fn pipe(mut self, chain: &[&str]) -> Self {
        for pair in chain.windows(2) {
            self = self.edge(pair[0], pair[1]);
        }
        self
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Compiles the graph with the default compiler.
    pub fn compile(&self) -> Result<QiCompiledPipeline> {
        QiCompiler::new().compile(self)
    }
}
