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

use crate::block::QiEncoding;
use crate::errors::{QiError, Result};

const UTF8_BOM: &[u8] = &[0xef, 0xbb, 0xbf];

/// Decodes bytes as text. Error offsets count from the start of `data`.
pub fn decode_text(block: &str, encoding: QiEncoding, data: &[u8]) -> Result<String> {
    let error = |offset: usize| QiError::Decoding {
        block: block.to_string(),
        encoding: encoding.as_str().to_string(),
        offset,
    };

    match encoding {
        QiEncoding::Utf8 => {
            let (skip, body) = match data.strip_prefix(UTF8_BOM) {
                Some(rest) => (UTF8_BOM.len(), rest),
                None => (0, data),
            };
            std::str::from_utf8(body)
                .map(str::to_string)
                .map_err(|e| error(skip + e.valid_up_to()))
        }
        QiEncoding::Ascii => match data.iter().position(|b| !b.is_ascii()) {
            Some(offset) => Err(error(offset)),
            None => Ok(data.iter().map(|&b| b as char).collect()),
        },
        // Every byte maps to the code point of the same value.
        QiEncoding::Latin1 => Ok(data.iter().map(|&b| b as char).collect()),
    }
}
