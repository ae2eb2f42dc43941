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

//! # Value Type Registry
//!
//! A value type is a base primitive plus an ordered list of constraints. The
//! registry is the pipeline's symbol table: it is built once by the compiler
//! from the pipeline's declarations, never mutated afterwards, and handed by
//! reference to whatever needs to resolve a type name.
//!
//! The four primitives are always registered under their own names, so a
//! schema may bind a column directly to `integer` or `text`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constraint::{QiConstraint, QiConstraintDecl};
use crate::errors::{QiError, Result};
use crate::value::{QiPrimitive, QiValue};

/// Loose declaration of a value type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QiValueTypeDecl {
    pub name: String,
    pub base: String,
    #[serde(default)]
    pub constraints: Vec<String>,
}

impl QiValueTypeDecl {
    pub fn new(name: impl Into<String>, base: impl Into<String>, constraints: &[&str]) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            constraints: constraints.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Why a raw cell does not conform to a value type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QiNonConformance {
    /// The cell does not parse as the base primitive.
    Parse { primitive: QiPrimitive },
    /// The cell parsed but violates the named constraint.
    Constraint { constraint: String },
}

impl std::fmt::Display for QiNonConformance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QiNonConformance::Parse { primitive } => write!(f, "not a valid {}", primitive),
            QiNonConformance::Constraint { constraint } => {
                write!(f, "violates constraint '{}'", constraint)
            }
        }
    }
}

/// Immutable, named, constrained primitive.
#[derive(Clone, Debug)]
pub struct QiValueType {
    name: String,
    base: QiPrimitive,
    constraints: Vec<Arc<QiConstraint>>,
}

impl QiValueType {
    pub fn new(name: impl Into<String>, base: QiPrimitive, constraints: Vec<Arc<QiConstraint>>) -> Self {
        Self {
            name: name.into(),
            base,
            constraints,
        }
    }

    /// The unconstrained value type of a primitive.
    pub fn primitive(base: QiPrimitive) -> Self {
        Self::new(base.as_str(), base, Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> QiPrimitive {
        self.base
    }

    pub fn constraints(&self) -> &[Arc<QiConstraint>] {
        &self.constraints
    }

    /// Parses `raw` and checks every constraint in declaration order.
    pub fn conform(&self, raw: &str) -> std::result::Result<QiValue, QiNonConformance> {
        let value = self
            .base
            .parse(raw)
            .ok_or(QiNonConformance::Parse { primitive: self.base })?;
        match self.constraints.iter().find(|c| !c.evaluate(&value)) {
            Some(failed) => Err(QiNonConformance::Constraint {
                constraint: failed.name().to_string(),
            }),
            None => Ok(value),
        }
    }

    /// True when `raw` parses and satisfies every constraint.
    pub fn conforms(&self, raw: &str) -> bool {
        self.conform(raw).is_ok()
    }
}

/// Symbol table of constraints and value types for one pipeline.
#[derive(Clone, Debug)]
pub struct QiTypeRegistry {
    constraints: HashMap<String, Arc<QiConstraint>>,
    types: HashMap<String, Arc<QiValueType>>,
}

impl Default for QiTypeRegistry {
    fn default() -> Self {
        let types = QiPrimitive::ALL
            .into_iter()
            .map(|base| (base.as_str().to_string(), Arc::new(QiValueType::primitive(base))))
            .collect();
        Self {
            constraints: HashMap::new(),
            types,
        }
    }
}

impl QiTypeRegistry {
    /// Builds the registry, resolving every constraint reference.
    ///
    /// Fails with `UnknownConstraint`, `UnknownType` (bad base),
    /// `IncompatibleConstraint` or `DuplicateName`.
    pub fn build(constraints: &[QiConstraintDecl], value_types: &[QiValueTypeDecl]) -> Result<Self> {
        let mut registry = Self::default();

        for decl in constraints {
            if registry.constraints.contains_key(&decl.name) {
                return Err(QiError::DuplicateName {
                    what: "constraint".into(),
                    name: decl.name.clone(),
                });
            }
            let constraint = QiConstraint::from_decl(decl)?;
            registry
                .constraints
                .insert(decl.name.clone(), Arc::new(constraint));
        }

        for decl in value_types {
            if registry.types.contains_key(&decl.name) {
                return Err(QiError::DuplicateName {
                    what: "value type".into(),
                    name: decl.name.clone(),
                });
            }
            let base = QiPrimitive::from_name(&decl.base).ok_or_else(|| QiError::UnknownType {
                name: decl.base.clone(),
            })?;
            let mut resolved = Vec::with_capacity(decl.constraints.len());
            for constraint_name in &decl.constraints {
                let constraint = registry.constraint(constraint_name)?;
                constraint
                    .check_compatible(base)
                    .map_err(|message| QiError::IncompatibleConstraint {
                        value_type: decl.name.clone(),
                        constraint: constraint_name.clone(),
                        message,
                    })?;
                resolved.push(constraint);
            }
            registry.types.insert(
                decl.name.clone(),
                Arc::new(QiValueType::new(decl.name.clone(), base, resolved)),
            );
        }

        Ok(registry)
    }

    /// Resolves a value type by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<QiValueType>> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| QiError::UnknownType { name: name.into() })
    }

    /// Resolves a constraint by name.
    pub fn constraint(&self, name: &str) -> Result<Arc<QiConstraint>> {
        self.constraints
            .get(name)
            .cloned()
            .ok_or_else(|| QiError::UnknownConstraint { name: name.into() })
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}
