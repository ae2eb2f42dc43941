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

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;

/// Runtime settings for [`crate::executor::QiExecutor`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QiExecutorConfig {
    /// Whole-request timeout of the HTTP client used by extraction.
    pub http_timeout_secs: u64,
    /// User agent sent with HTTP requests.
    pub user_agent: String,
    /// Run disjoint components concurrently (needs the `parallel` feature).
    pub parallel: bool,
    /// How long a loader waits on a locked SQLite store.
    pub busy_timeout_ms: u64,
    /// Dropped rows described per interpreter; the count is always exact.
    pub max_drop_diagnostics: usize,
}

impl Default for QiExecutorConfig {
    fn default() -> Self {
        QiExecutorConfig {
            http_timeout_secs: 30,
            user_agent: format!("qix/{}", env!("CARGO_PKG_VERSION")),
            parallel: true,
            busy_timeout_ms: 5_000,
            max_drop_diagnostics: 100,
        }
    }
}

impl QiExecutorConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Partial configuration merged over [`QiExecutorConfig::default`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QiExecutorConfigBuilder {
    pub http_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub parallel: Option<bool>,
    pub busy_timeout_ms: Option<u64>,
    pub max_drop_diagnostics: Option<usize>,
}

impl QiExecutorConfigBuilder {
    pub fn build(self) -> QiExecutorConfig {
        let base = QiExecutorConfig::default();
        QiExecutorConfig {
            http_timeout_secs: self.http_timeout_secs.unwrap_or(base.http_timeout_secs),
            user_agent: self.user_agent.unwrap_or(base.user_agent),
            parallel: self.parallel.unwrap_or(base.parallel),
            busy_timeout_ms: self.busy_timeout_ms.unwrap_or(base.busy_timeout_ms),
            max_drop_diagnostics: self
                .max_drop_diagnostics
                .unwrap_or(base.max_drop_diagnostics),
        }
    }

    /// Reads a partial configuration object; unknown keys are ignored.
    pub fn from_json(value: &Value) -> Result<QiExecutorConfig> {
        let builder: QiExecutorConfigBuilder = serde_json::from_value(value.clone())?;
        Ok(builder.build())
    }
}
