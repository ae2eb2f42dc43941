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

//! # Qi Value Module
//!
//! Scalar primitives and parsed cell values. Every value type in a pipeline
//! is built on one of the four primitives defined here; the table
//! interpreter turns raw strings into [`QiValue`]s through
//! [`QiPrimitive::parse`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Base primitive every value type is built on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QiPrimitive {
    Text,
    Integer,
    Decimal,
    Boolean,
}

impl QiPrimitive {
    /// All primitives, in registration order.
    pub const ALL: [QiPrimitive; 4] = [
        QiPrimitive::Text,
        QiPrimitive::Integer,
        QiPrimitive::Decimal,
        QiPrimitive::Boolean,
    ];

    /// Canonical lowercase name, also the registry name of the primitive.
    pub fn as_str(&self) -> &'static str {
        match self {
            QiPrimitive::Text => "text",
            QiPrimitive::Integer => "integer",
            QiPrimitive::Decimal => "decimal",
            QiPrimitive::Boolean => "boolean",
        }
    }

    /// Resolves a primitive from its canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        QiPrimitive::ALL
            .into_iter()
            .find(|primitive| primitive.as_str() == name)
    }

    /// True for integer and decimal.
    pub fn is_numeric(&self) -> bool {
        matches!(self, QiPrimitive::Integer | QiPrimitive::Decimal)
    }

    /// Parses a raw cell into a value of this primitive.
    ///
    /// Numbers and booleans ignore surrounding whitespace; text is taken
    /// verbatim. Decimals accept a single `,` as the decimal separator.
    /// Returns `None` when the cell does not parse.
    pub fn parse(&self, raw: &str) -> Option<QiValue> {
        match self {
            QiPrimitive::Text => Some(QiValue::Text(raw.to_string())),
            QiPrimitive::Integer => raw.trim().parse::<i64>().ok().map(QiValue::Integer),
            QiPrimitive::Decimal => parse_decimal(raw.trim()).map(QiValue::Decimal),
            QiPrimitive::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(QiValue::Boolean(true)),
                "false" | "0" => Some(QiValue::Boolean(false)),
                _ => None,
            },
        }
    }
}

impl fmt::Display for QiPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_decimal(raw: &str) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }
    let normalized = if !raw.contains('.') && raw.matches(',').count() == 1 {
        raw.replace(',', ".")
    } else {
        raw.to_string()
    };
    // Rust also accepts "inf" and "NaN"; a data cell holding those is not a decimal.
    if !normalized
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Parsed, validated cell value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QiValue {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl QiValue {
    /// Primitive this value belongs to.
    pub fn primitive(&self) -> QiPrimitive {
        match self {
            QiValue::Text(_) => QiPrimitive::Text,
            QiValue::Integer(_) => QiPrimitive::Integer,
            QiValue::Decimal(_) => QiPrimitive::Decimal,
            QiValue::Boolean(_) => QiPrimitive::Boolean,
        }
    }

    /// Numeric view of integer and decimal values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            QiValue::Integer(value) => Some(*value as f64),
            QiValue::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            QiValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Equality on parsed values; integers and decimals compare numerically.
    pub fn matches(&self, other: &QiValue) -> bool {
        match (self, other) {
            (QiValue::Integer(a), QiValue::Integer(b)) => a == b,
            (QiValue::Text(a), QiValue::Text(b)) => a == b,
            (QiValue::Boolean(a), QiValue::Boolean(b)) => a == b,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// True when a value of `primitive` could ever [`matches`](Self::matches) this one.
    pub fn comparable_to(&self, primitive: QiPrimitive) -> bool {
        self.primitive() == primitive || (self.primitive().is_numeric() && primitive.is_numeric())
    }

    /// Converts a JSON literal (from a constraint declaration) into a value.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(flag) => Some(QiValue::Boolean(*flag)),
            Value::Number(number) => number
                .as_i64()
                .map(QiValue::Integer)
                .or_else(|| number.as_f64().map(QiValue::Decimal)),
            Value::String(text) => Some(QiValue::Text(text.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for QiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QiValue::Text(value) => f.write_str(value),
            QiValue::Integer(value) => write!(f, "{}", value),
            QiValue::Decimal(value) => write!(f, "{}", value),
            QiValue::Boolean(value) => write!(f, "{}", value),
        }
    }
}
