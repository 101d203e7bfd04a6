#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Append-only JSON-lines logging shared by the featurelens crates.

use std::{
    fs::{self, File},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Log severity level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational events.
    Info,
    /// Warning indicator.
    Warn,
    /// Error indicator.
    Error,
}

/// Structured log record, one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Timestamp in ISO8601.
    pub timestamp: DateTime<Utc>,
    /// Component emitting the log (e.g. `client.controller`).
    pub component: String,
    /// Severity.
    pub level: LogLevel,
    /// Short event name or human-readable message.
    pub message: String,
    /// Structured fields attached to the record.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(component: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            component: component.into(),
            level,
            message: message.into(),
            fields: Map::new(),
        }
    }

    /// Adds a single field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Merges every member of a JSON object into the fields. Non-objects are ignored.
    #[must_use]
    pub fn with_fields(mut self, fields: &Value) -> Self {
        if let Some(obj) = fields.as_object() {
            for (key, value) in obj {
                self.fields.insert(key.clone(), value.clone());
            }
        }
        self
    }
}

/// Thread-safe JSON logger with append-only semantics.
#[derive(Debug)]
pub struct JsonLogger {
    path: PathBuf,
    min_level: LogLevel,
    writer: Mutex<File>,
}

impl JsonLogger {
    /// Creates or opens a logger at the desired path, recording every level.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_min_level(path, LogLevel::Debug)
    }

    /// Creates or opens a logger that drops records below `min_level`.
    pub fn with_min_level(path: impl AsRef<Path>, min_level: LogLevel) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        Ok(Self {
            path,
            min_level,
            writer: Mutex::new(file),
        })
    }

    /// Writes a log record as a JSON line.
    pub fn log(&self, record: &LogRecord) -> Result<()> {
        if record.level < self.min_level {
            return Ok(());
        }
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Reads every record written so far.
    pub fn records(&self) -> Result<Vec<LogRecord>> {
        read_records(&self.path)
    }

    /// Returns the underlying file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parses a JSON-lines log file, skipping blank lines.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<LogRecord>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(
            serde_json::from_str(&line)
                .with_context(|| format!("invalid log line in {}", path.display()))?,
        );
    }
    Ok(records)
}
