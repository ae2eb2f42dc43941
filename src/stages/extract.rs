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

//! # Extraction
//!
//! Sources are `http://` / `https://` URLs, `file://` URLs or plain local
//! paths. HTTP goes through a blocking `reqwest` client configured from
//! [`QiExecutorConfig`]. There are no retries.

use std::io;
use std::path::Path;

use reqwest::StatusCode;

use super::QiBytes;
use crate::config::QiExecutorConfig;
use crate::errors::{QiError, QiExtractionCause, Result};

/// Fetches `source` into memory.
pub fn extract(block: &str, source: &str, config: &QiExecutorConfig) -> Result<QiBytes> {
    let data = if source.starts_with("http://") || source.starts_with("https://") {
        fetch_http(block, source, config)?
    } else {
        let path = source.strip_prefix("file://").unwrap_or(source);
        read_file(block, Path::new(path))?
    };
    log::info!("block '{}' extracted {} bytes from {}", block, data.len(), source);
    Ok(QiBytes::new(source_name(source), data))
}

fn fetch_http(block: &str, url: &str, config: &QiExecutorConfig) -> Result<Vec<u8>> {
    let failure = |cause: QiExtractionCause, message: String| QiError::Extraction {
        block: block.to_string(),
        cause,
        message,
    };
    let classify = |err: reqwest::Error| {
        let cause = if err.is_timeout() {
            QiExtractionCause::Timeout
        } else {
            QiExtractionCause::Network
        };
        failure(cause, err.to_string())
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(config.http_timeout())
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(classify)?;
    let response = client.get(url).send().map_err(classify)?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        return Err(failure(QiExtractionCause::NotFound, format!("{} returned {}", url, status)));
    }
    if !status.is_success() {
        return Err(failure(QiExtractionCause::Network, format!("{} returned {}", url, status)));
    }
    Ok(response.bytes().map_err(classify)?.to_vec())
}

fn read_file(block: &str, path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|err| {
        let cause = match err.kind() {
            io::ErrorKind::NotFound => QiExtractionCause::NotFound,
            io::ErrorKind::TimedOut => QiExtractionCause::Timeout,
            _ => QiExtractionCause::Network,
        };
        QiError::Extraction {
            block: block.to_string(),
            cause,
            message: format!("{}: {}", path.display(), err),
        }
    })
}

/// Last path segment of a source, without query or fragment.
fn source_name(source: &str) -> String {
    let path = source.split(['?', '#']).next().unwrap_or(source);
    path.trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty() && !name.contains(':'))
        .unwrap_or("data")
        .to_string()
}
