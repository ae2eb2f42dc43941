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

//! # Relational Loader
//!
//! Persists a typed table as one SQLite relation.
//!
//! - The relation is created when absent, one column per schema column.
//! - All rows of one load go in through a single transaction: either every
//!   row is committed or none is.
//! - Loads into the same (store, relation) pair are serialised through a
//!   process-wide lock registry. Different relations, even in one store,
//!   only contend inside SQLite, bounded by the busy timeout.
//!
//! | primitive | SQLite type |
//! |---|---|
//! | text | `TEXT` |
//! | integer | `INTEGER` |
//! | decimal | `REAL` |
//! | boolean | `BOOLEAN` (stored as 0/1) |

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};

use crate::block::QiWriteMode;
use crate::errors::{QiError, Result};
use crate::table::QiTypedTable;
use crate::value::{QiPrimitive, QiValue};

type QiLockKey = (PathBuf, String);

static RELATION_LOCKS: OnceLock<Mutex<HashMap<QiLockKey, Arc<Mutex<()>>>>> = OnceLock::new();

/// Lock guarding writes to one relation of one store.
fn relation_lock(file: &Path, relation: &str) -> Arc<Mutex<()>> {
    let store = std::path::absolute(file).unwrap_or_else(|_| file.to_path_buf());
    let mut locks = RELATION_LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    locks
        .entry((store, relation.to_string()))
        .or_default()
        .clone()
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_type(primitive: QiPrimitive) -> &'static str {
    match primitive {
        QiPrimitive::Text => "TEXT",
        QiPrimitive::Integer => "INTEGER",
        QiPrimitive::Decimal => "REAL",
        QiPrimitive::Boolean => "BOOLEAN",
    }
}

fn sql_value(value: &QiValue) -> SqlValue {
    match value {
        QiValue::Boolean(flag) => SqlValue::Integer(i64::from(*flag)),
        QiValue::Integer(number) => SqlValue::Integer(*number),
        QiValue::Decimal(number) => SqlValue::Real(*number),
        QiValue::Text(text) => SqlValue::Text(text.clone()),
    }
}

/// Writes every row of `table` into `relation`; returns the row count.
pub fn load_relation(
    block: &str,
    table: &QiTypedTable,
    relation: &str,
    file: &Path,
    mode: QiWriteMode,
    busy_timeout: Duration,
) -> Result<usize> {
    let storage = |err: rusqlite::Error| QiError::storage(block, relation, err);

    if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| QiError::storage(block, relation, format!("{}: {}", parent.display(), e)))?;
    }

    let lock = relation_lock(file, relation);
    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

    let mut conn = Connection::open(file).map_err(storage)?;
    conn.busy_timeout(busy_timeout).map_err(storage)?;

    let name = quote_identifier(relation);
    let columns: Vec<String> = table
        .columns()
        .iter()
        .map(|column| quote_identifier(&column.name))
        .collect();
    let definitions = table
        .columns()
        .iter()
        .zip(&columns)
        .map(|(column, quoted)| format!("{} {}", quoted, sql_type(column.value_type.base())))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");

    let tx = conn.transaction().map_err(storage)?;
    if mode == QiWriteMode::Replace {
        tx.execute(&format!("DROP TABLE IF EXISTS {}", name), [])
            .map_err(storage)?;
    }
    tx.execute(
        &format!("CREATE TABLE IF NOT EXISTS {} ({})", name, definitions),
        [],
    )
    .map_err(storage)?;
    {
        let mut insert = tx
            .prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                name,
                columns.join(", "),
                placeholders
            ))
            .map_err(storage)?;
        for row in table.rows() {
            insert
                .execute(params_from_iter(row.iter().map(sql_value)))
                .map_err(storage)?;
        }
    }
    tx.commit().map_err(storage)?;

    log::info!(
        "block '{}' loaded {} rows into '{}' ({})",
        block,
        table.row_count(),
        relation,
        file.display()
    );
    Ok(table.row_count())
}

/// Reads a relation back as typed rows, in insertion order.
///
/// Column types come from the declared SQLite types; `BOOLEAN` columns read
/// back as booleans.
pub fn read_relation(file: &Path, relation: &str) -> Result<Vec<Vec<QiValue>>> {
    let storage = |err: rusqlite::Error| QiError::storage("read_relation", relation, err);
    let conn = Connection::open_with_flags(file, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(storage)?;
    let name = quote_identifier(relation);

    let mut info = conn
        .prepare(&format!("PRAGMA table_info({})", name))
        .map_err(storage)?;
    let declared: Vec<String> = info
        .query_map([], |row| row.get::<_, String>(2))
        .map_err(storage)?
        .collect::<std::result::Result<_, _>>()
        .map_err(storage)?;
    if declared.is_empty() {
        return Err(QiError::storage("read_relation", relation, "relation does not exist"));
    }

    let mut select = conn
        .prepare(&format!("SELECT * FROM {} ORDER BY rowid", name))
        .map_err(storage)?;
    let rows = select
        .query_map([], |row| {
            declared
                .iter()
                .enumerate()
                .map(|(i, declared_type)| {
                    let value = row.get::<_, SqlValue>(i)?;
                    Ok(typed_value(declared_type, value))
                })
                .collect::<rusqlite::Result<Vec<QiValue>>>()
        })
        .map_err(storage)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(storage)?;
    Ok(rows)
}

fn typed_value(declared_type: &str, value: SqlValue) -> QiValue {
    match value {
        SqlValue::Integer(number) if declared_type.eq_ignore_ascii_case("BOOLEAN") => {
            QiValue::Boolean(number != 0)
        }
        SqlValue::Integer(number) => QiValue::Integer(number),
        SqlValue::Real(number) => QiValue::Decimal(number),
        SqlValue::Text(text) => QiValue::Text(text),
        SqlValue::Null => QiValue::Text(String::new()),
        SqlValue::Blob(bytes) => QiValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
    }
}
