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

//! # Archives
//!
//! Zip containers expand to one member per file entry (directories are
//! skipped). Gzip and zstd are single streams: they expand to one member
//! named after the input with the compression extension removed.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use super::QiBytes;
use crate::block::QiArchiveKind;
use crate::errors::{QiError, Result};

/// Archive members keyed by path, in name order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QiArchive {
    members: BTreeMap<String, QiBytes>,
}

impl QiArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: QiBytes) {
        self.members.insert(path.into(), bytes);
    }

    pub fn get(&self, path: &str) -> Option<&QiBytes> {
        self.members.get(path)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn take(&mut self, path: &str) -> Option<QiBytes> {
        self.members.remove(path)
    }
}

/// Expands `bytes` as an archive of the declared kind.
pub fn open_archive(block: &str, kind: QiArchiveKind, bytes: QiBytes) -> Result<QiArchive> {
    let format_error = |message: String| QiError::ArchiveFormat {
        block: block.to_string(),
        message,
    };

    let archive = match kind {
        QiArchiveKind::Zip => read_zip(&bytes.data).map_err(format_error)?,
        QiArchiveKind::Gzip | QiArchiveKind::Zstd => {
            let data = decompress_stream(kind, &bytes.data).map_err(format_error)?;
            let name = stream_member_name(&bytes.name);
            let mut archive = QiArchive::new();
            archive.insert(name.clone(), QiBytes::new(name, data));
            archive
        }
    };
    log::debug!("block '{}' opened archive with {} members", block, archive.len());
    Ok(archive)
}

/// Takes the member at `path` out of the archive. A leading `/` is ignored.
pub fn pick_member(block: &str, mut archive: QiArchive, path: &str) -> Result<QiBytes> {
    let key = path.trim_start_matches('/');
    archive.take(key).ok_or_else(|| QiError::MemberNotFound {
        block: block.to_string(),
        path: path.to_string(),
    })
}

/// Upper bound on preallocation; declared member sizes are untrusted.
const MAX_SIZE_HINT: u64 = 1 << 20;

fn read_zip(data: &[u8]) -> std::result::Result<QiArchive, String> {
    let mut zip = zip::ZipArchive::new(Cursor::new(data)).map_err(|e| e.to_string())?;
    let mut archive = QiArchive::new();
    for index in 0..zip.len() {
        let mut file = zip.by_index(index).map_err(|e| e.to_string())?;
        if file.is_dir() {
            continue;
        }
        let path = file.name().trim_start_matches('/').to_string();
        let mut content = Vec::with_capacity(file.size().min(MAX_SIZE_HINT) as usize);
        file.read_to_end(&mut content)
            .map_err(|e| format!("{}: {}", path, e))?;
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        archive.insert(path, QiBytes::new(name, content));
    }
    Ok(archive)
}

#[cfg(feature = "compression")]
fn decompress_stream(kind: QiArchiveKind, data: &[u8]) -> std::result::Result<Vec<u8>, String> {
    const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
    const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

    match kind {
        QiArchiveKind::Gzip => {
            if !data.starts_with(&GZIP_MAGIC) {
                return Err("not a gzip stream".into());
            }
            let mut out = Vec::new();
            flate2::read::MultiGzDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|e| e.to_string())?;
            Ok(out)
        }
        QiArchiveKind::Zstd => {
            if !data.starts_with(&ZSTD_MAGIC) {
                return Err("not a zstd stream".into());
            }
            zstd::stream::decode_all(data).map_err(|e| e.to_string())
        }
        QiArchiveKind::Zip => Err("zip is not a single stream".into()),
    }
}

#[cfg(not(feature = "compression"))]
fn decompress_stream(_kind: QiArchiveKind, _data: &[u8]) -> std::result::Result<Vec<u8>, String> {
    Err("gzip and zstd archives require the 'compression' feature".into())
}

/// `trees.csv.gz` -> `trees.csv`; an empty result falls back to `data`.
fn stream_member_name(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    let stem = [".gz", ".gzip", ".zst", ".zstd"]
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map_or(name, |ext| &name[..name.len() - ext.len()]);
    if stem.is_empty() {
        "data".to_string()
    } else {
        stem.to_string()
    }
}
