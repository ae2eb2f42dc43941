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

//! # Constraint Evaluator
//!
//! Constraints are named, stateless predicates over a single parsed value.
//! They are declared loosely (a kind plus JSON parameters, see
//! [`QiConstraintDecl`]) and compiled once into [`QiConstraint`], which is
//! `Send + Sync` and evaluated concurrently by any number of interpreters.
//!
//! ## Supported Kinds
//!
//! | kind | parameters |
//! |---|---|
//! | `regex` | `pattern` |
//! | `range` | `lower`, `upper`, `lower_inclusive`, `upper_inclusive` |
//! | `equals` | `value` |
//! | `allowlist` (alias `set`) | `values` |
//! | `length` | `min`, `max` |
//!
//! Regex constraints use conventional unanchored matching: `"DE"` matches
//! anywhere in the value, `"^DE"` only at the start.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{QiError, Result};
use crate::value::{QiPrimitive, QiValue};

/// Loose declaration of a constraint, as handed over by a front-end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QiConstraintDecl {
    pub name: String,
    pub kind: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl QiConstraintDecl {
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

/// One end of a numeric range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QiBound {
    pub value: f64,
    pub inclusive: bool,
}

impl QiBound {
    pub fn inclusive(value: f64) -> Self {
        Self {
            value,
            inclusive: true,
        }
    }

    pub fn exclusive(value: f64) -> Self {
        Self {
            value,
            inclusive: false,
        }
    }
}

/// Compiled predicate body.
#[derive(Clone, Debug)]
pub enum QiConstraintKind {
    Regex(Regex),
    Range {
        lower: Option<QiBound>,
        upper: Option<QiBound>,
    },
    Equals(QiValue),
    Allowlist(Vec<QiValue>),
    Length {
        min: Option<usize>,
        max: Option<usize>,
    },
}

/// Named, compiled constraint.
#[derive(Clone, Debug)]
pub struct QiConstraint {
    name: String,
    kind: QiConstraintKind,
}

impl QiConstraint {
    pub fn new(name: impl Into<String>, kind: QiConstraintKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &QiConstraintKind {
        &self.kind
    }

    /// Evaluates the constraint. Values of a kind the constraint does not
    /// understand (text against a range, say) never satisfy it.
    pub fn evaluate(&self, value: &QiValue) -> bool {
        match &self.kind {
            QiConstraintKind::Regex(regex) => value.as_str().is_some_and(|text| regex.is_match(text)),
            QiConstraintKind::Range { lower, upper } => match value.as_f64() {
                Some(number) => within_lower(number, lower) && within_upper(number, upper),
                None => false,
            },
            QiConstraintKind::Equals(expected) => value.matches(expected),
            QiConstraintKind::Allowlist(allowed) => allowed.iter().any(|item| value.matches(item)),
            QiConstraintKind::Length { min, max } => match value.as_str() {
                Some(text) => {
                    let length = text.chars().count();
                    min.map_or(true, |min| length >= min) && max.map_or(true, |max| length <= max)
                }
                None => false,
            },
        }
    }

    /// Checks that the constraint can apply to values of `primitive`.
    pub fn check_compatible(&self, primitive: QiPrimitive) -> std::result::Result<(), String> {
        match &self.kind {
            QiConstraintKind::Regex(_) | QiConstraintKind::Length { .. } => {
                if primitive == QiPrimitive::Text {
                    Ok(())
                } else {
                    Err(format!("requires text values, not {}", primitive))
                }
            }
            QiConstraintKind::Range { .. } => {
                if primitive.is_numeric() {
                    Ok(())
                } else {
                    Err(format!("requires numeric values, not {}", primitive))
                }
            }
            QiConstraintKind::Equals(expected) => {
                if expected.comparable_to(primitive) {
                    Ok(())
                } else {
                    Err(format!("literal '{}' is not comparable to {}", expected, primitive))
                }
            }
            QiConstraintKind::Allowlist(allowed) => match allowed
                .iter()
                .find(|item| !item.comparable_to(primitive))
            {
                Some(item) => Err(format!("literal '{}' is not comparable to {}", item, primitive)),
                None => Ok(()),
            },
        }
    }

    /// Compiles a loose declaration.
    pub fn from_decl(decl: &QiConstraintDecl) -> Result<Self> {
        let name = decl.name.as_str();
        let params = &decl.params;
        let kind = match decl.kind.as_str() {
            "regex" => {
                let pattern = params
                    .get("pattern")
                    .and_then(Value::as_str)
                    .ok_or_else(|| QiError::parameter(name, "pattern", "regex requires string 'pattern'"))?;
                let regex = Regex::new(pattern)
                    .map_err(|err| QiError::parameter(name, "pattern", err.to_string()))?;
                QiConstraintKind::Regex(regex)
            }
            "range" => {
                let lower = bound(name, params, "lower", "lower_inclusive")?;
                let upper = bound(name, params, "upper", "upper_inclusive")?;
                if lower.is_none() && upper.is_none() {
                    return Err(QiError::parameter(name, "lower", "range requires 'lower' or 'upper'"));
                }
                if let (Some(lower), Some(upper)) = (lower, upper) {
                    if lower.value > upper.value {
                        return Err(QiError::parameter(name, "lower", "'lower' may not exceed 'upper'"));
                    }
                }
                QiConstraintKind::Range { lower, upper }
            }
            "equals" => {
                let value = params
                    .get("value")
                    .and_then(QiValue::from_json)
                    .ok_or_else(|| QiError::parameter(name, "value", "equals requires a scalar 'value'"))?;
                QiConstraintKind::Equals(value)
            }
            "allowlist" | "set" => {
                let values = params
                    .get("values")
                    .and_then(Value::as_array)
                    .ok_or_else(|| QiError::parameter(name, "values", "allowlist requires array 'values'"))?;
                if values.is_empty() {
                    return Err(QiError::parameter(name, "values", "'values' may not be empty"));
                }
                let values = values
                    .iter()
                    .map(|item| {
                        QiValue::from_json(item)
                            .ok_or_else(|| QiError::parameter(name, "values", "values must be scalars"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                QiConstraintKind::Allowlist(values)
            }
            "length" => {
                let min = length(name, params, "min")?;
                let max = length(name, params, "max")?;
                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return Err(QiError::parameter(name, "min", "'min' may not exceed 'max'"));
                    }
                }
                QiConstraintKind::Length { min, max }
            }
            other => {
                return Err(QiError::parameter(
                    name,
                    "kind",
                    format!("unknown constraint kind '{}'", other),
                ))
            }
        };
        Ok(Self::new(name, kind))
    }
}

fn within_lower(number: f64, lower: &Option<QiBound>) -> bool {
    match lower {
        Some(bound) if bound.inclusive => number >= bound.value,
        Some(bound) => number > bound.value,
        None => true,
    }
}

fn within_upper(number: f64, upper: &Option<QiBound>) -> bool {
    match upper {
        Some(bound) if bound.inclusive => number <= bound.value,
        Some(bound) => number < bound.value,
        None => true,
    }
}

fn bound(
    name: &str,
    params: &Map<String, Value>,
    key: &str,
    inclusive_key: &str,
) -> Result<Option<QiBound>> {
    let value = match params.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| QiError::parameter(name, key, "bound must be numeric"))?,
    };
    let inclusive = match params.get(inclusive_key) {
        None => true,
        Some(flag) => flag
            .as_bool()
            .ok_or_else(|| QiError::parameter(name, inclusive_key, "must be boolean"))?,
    };
    Ok(Some(QiBound { value, inclusive }))
}

fn length(name: &str, params: &Map<String, Value>, key: &str) -> Result<Option<usize>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|number| Some(number as usize))
            .ok_or_else(|| QiError::parameter(name, key, "must be a non-negative integer")),
    }
}
