//! Staging loader: the locally-executable translation of the Redshift COPY
//! statements.
//!
//! Reads newline-delimited JSON records from the configured locations and
//! bulk-inserts them into the staging tables. The events load maps fields
//! through an explicit JSONPaths specification file (positional against the
//! staging_events column order, exactly as COPY does); the songs load maps
//! fields to columns by name (`JSON 'auto'`). Each table load runs inside a
//! single transaction so a malformed record fails the whole load, mirroring
//! COPY's all-or-nothing failure mode. Loads append; callers drop/recreate
//! the staging tables beforehand for a clean cycle.

use crate::statements::schema::{SqlType, Table, STAGING_EVENTS_TABLE, STAGING_SONGS_TABLE};
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed record at {path}:{line}: {source}")]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("record at {path}:{line} is not a JSON object")]
    NotAnObject { path: PathBuf, line: usize },
    #[error("invalid jsonpaths spec {path}: {reason}")]
    InvalidJsonPaths { path: PathBuf, reason: String },
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
}

/// The `{"jsonpaths": ["$['artist']", ...]}` mapping file consumed by the
/// events COPY.
#[derive(Debug, Deserialize)]
struct JsonPathsSpec {
    jsonpaths: Vec<String>,
}

/// Extract the field name from a single-level bracket path like `$['artist']`.
fn jsonpath_field(path: &str) -> Option<&str> {
    path.strip_prefix("$['")?.strip_suffix("']")
}

fn read_jsonpaths(path: &Path) -> Result<Vec<String>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let spec: JsonPathsSpec =
        serde_json::from_str(&content).map_err(|e| LoadError::InvalidJsonPaths {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    spec.jsonpaths
        .iter()
        .map(|p| {
            jsonpath_field(p)
                .map(str::to_string)
                .ok_or_else(|| LoadError::InvalidJsonPaths {
                    path: path.to_path_buf(),
                    reason: format!("unsupported path expression: {}", p),
                })
        })
        .collect()
}

/// All .json files under a location, sorted for a deterministic load order.
/// A plain file is accepted as a single-element listing.
fn collect_json_files(root: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| LoadError::Io {
            path: root.to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "json")
        {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn to_sql_value(value: Option<&JsonValue>, sql_type: SqlType) -> SqlValue {
    match value {
        None | Some(JsonValue::Null) => SqlValue::Null,
        Some(JsonValue::Bool(b)) => SqlValue::Integer(*b as i64),
        Some(JsonValue::Number(n)) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Some(JsonValue::String(s)) => {
            // Logged-out events encode numeric fields as "" (userId in the
            // raw logs). COPY loads empty strings into non-character columns
            // as NULL; do the same so they stay filterable with IS NOT NULL.
            if s.is_empty() && !matches!(sql_type, SqlType::Varchar(_)) {
                SqlValue::Null
            } else {
                SqlValue::Text(s.clone())
            }
        }
        // Nested arrays/objects never appear in this data; keep the raw text
        Some(other) => SqlValue::Text(other.to_string()),
    }
}

pub struct StagingLoader<'a> {
    conn: &'a mut Connection,
}

impl<'a> StagingLoader<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        StagingLoader { conn }
    }

    /// Load event-log records through the JSONPaths mapping. The spec must
    /// have exactly one entry per staging_events column.
    pub fn load_events(
        &mut self,
        data_path: &Path,
        jsonpath_spec: &Path,
    ) -> Result<usize, LoadError> {
        let fields = read_jsonpaths(jsonpath_spec)?;
        if fields.len() != STAGING_EVENTS_TABLE.column_count() {
            return Err(LoadError::InvalidJsonPaths {
                path: jsonpath_spec.to_path_buf(),
                reason: format!(
                    "expected {} path entries, found {}",
                    STAGING_EVENTS_TABLE.column_count(),
                    fields.len()
                ),
            });
        }
        let loaded = self.load_table(&STAGING_EVENTS_TABLE, &fields, data_path)?;
        info!("Loaded {} event records into staging_events", loaded);
        Ok(loaded)
    }

    /// Load song-catalog records, mapping JSON fields to columns by name.
    pub fn load_songs(&mut self, data_path: &Path) -> Result<usize, LoadError> {
        let fields: Vec<String> = STAGING_SONGS_TABLE
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let loaded = self.load_table(&STAGING_SONGS_TABLE, &fields, data_path)?;
        info!("Loaded {} song records into staging_songs", loaded);
        Ok(loaded)
    }

    fn load_table(
        &mut self,
        table: &Table,
        fields: &[String],
        data_path: &Path,
    ) -> Result<usize, LoadError> {
        let columns = table.column_names();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name,
            columns.join(", "),
            placeholders.join(", ")
        );

        let files = collect_json_files(data_path)?;
        debug!("Found {} JSON files under {:?}", files.len(), data_path);

        let tx = self.conn.transaction()?;
        let mut loaded = 0usize;
        {
            let mut stmt = tx.prepare(&insert_sql)?;
            for file in &files {
                let content = std::fs::read_to_string(file).map_err(|source| LoadError::Io {
                    path: file.clone(),
                    source,
                })?;
                for (line_index, line) in content.lines().enumerate() {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let record: JsonValue =
                        serde_json::from_str(line).map_err(|source| LoadError::MalformedRecord {
                            path: file.clone(),
                            line: line_index + 1,
                            source,
                        })?;
                    let object = record.as_object().ok_or_else(|| LoadError::NotAnObject {
                        path: file.clone(),
                        line: line_index + 1,
                    })?;
                    let params: Vec<SqlValue> = fields
                        .iter()
                        .zip(table.columns.iter())
                        .map(|(field, column)| to_sql_value(object.get(field), column.sql_type))
                        .collect();
                    stmt.execute(rusqlite::params_from_iter(params))?;
                    loaded += 1;
                }
            }
        }
        tx.commit()?;
        Ok(loaded)
    }
}
