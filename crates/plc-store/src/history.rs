//! Cycle history storage.
//!
//! The engine hands each cycle's storable parameters to a [`CycleStore`];
//! the store decides when to persist. [`JsonlCycleStore`] appends one JSON
//! object per cycle and flushes every few records.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use plc_core::{ParamAddr, ParamMap, Real};
use serde::{Deserialize, Serialize};

use crate::StoreResult;

/// One stored cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub timestamp: DateTime<Utc>,
    pub params: ParamMap,
}

pub trait CycleStore: Send {
    fn store_cycle(&mut self, params: &ParamMap, timestamp: DateTime<Utc>) -> StoreResult<()>;

    /// Persist anything still buffered.
    fn flush(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

/// Append-only JSON-lines history file.
pub struct JsonlCycleStore {
    path: PathBuf,
    writer: BufWriter<File>,
    pending: usize,
    flush_every: usize,
}

impl JsonlCycleStore {
    /// Open `path` for appending, creating parent directories as needed.
    pub fn open(path: impl Into<PathBuf>, flush_every: usize) -> StoreResult<Self> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::info!(path = %path.display(), flush_every, "cycle store opened");
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            pending: 0,
            flush_every: flush_every.max(1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CycleStore for JsonlCycleStore {
    fn store_cycle(&mut self, params: &ParamMap, timestamp: DateTime<Utc>) -> StoreResult<()> {
        let record = CycleRecord {
            timestamp,
            params: params.clone(),
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.pending += 1;
        if self.pending >= self.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> StoreResult<()> {
        self.writer.flush()?;
        if self.pending > 0 {
            tracing::debug!(records = self.pending, "cycle store flushed");
        }
        self.pending = 0;
        Ok(())
    }
}

impl Drop for JsonlCycleStore {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            tracing::error!(error = %err, "failed to flush cycle store");
        }
    }
}

/// Store that keeps records in memory; clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryCycleStore {
    records: Arc<Mutex<Vec<CycleRecord>>>,
}

impl MemoryCycleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<CycleRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CycleStore for MemoryCycleStore {
    fn store_cycle(&mut self, params: &ParamMap, timestamp: DateTime<Utc>) -> StoreResult<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CycleRecord {
                timestamp,
                params: params.clone(),
            });
        Ok(())
    }
}

/// Read every record of a JSON-lines history file, oldest first.
pub fn read_records(path: &Path) -> StoreResult<Vec<CycleRecord>> {
    let content = fs::read_to_string(path)?;
    let mut records = Vec::new();
    for line in content.lines() {
        if !line.trim().is_empty() {
            records.push(serde_json::from_str(line)?);
        }
    }
    Ok(records)
}

/// Filter for [`query_history`]. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    /// Exact `instance.param` address.
    pub param: Option<String>,
    pub instance: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Keep only the newest `limit` points.
    pub limit: Option<usize>,
}

impl HistoryQuery {
    fn matches_time(&self, t: DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| t >= s) && self.end.is_none_or(|e| t <= e)
    }

    fn matches_key(&self, key: &str) -> bool {
        self.param.as_deref().is_none_or(|p| p == key)
            && self
                .instance
                .as_deref()
                .is_none_or(|i| ParamAddr::key_belongs_to(key, i))
    }
}

/// A single stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub param: String,
    pub value: Real,
}

/// Stored values matching `query`, oldest first.
pub fn query_history(path: &Path, query: &HistoryQuery) -> StoreResult<Vec<HistoryPoint>> {
    let mut points: Vec<HistoryPoint> = read_records(path)?
        .into_iter()
        .filter(|r| query.matches_time(r.timestamp))
        .flat_map(|r| {
            let timestamp = r.timestamp;
            r.params
                .into_iter()
                .filter(|(key, _)| query.matches_key(key))
                .map(move |(param, value)| HistoryPoint {
                    timestamp,
                    param,
                    value,
                })
        })
        .collect();
    if let Some(limit) = query.limit {
        let skip = points.len().saturating_sub(limit);
        points.drain(..skip);
    }
    Ok(points)
}

/// Most recent stored value of every parameter, optionally restricted to
/// one instance.
pub fn latest_values(path: &Path, instance: Option<&str>) -> StoreResult<ParamMap> {
    let mut latest = ParamMap::new();
    for record in read_records(path)? {
        for (key, value) in record.params {
            if instance.is_none_or(|i| ParamAddr::key_belongs_to(&key, i)) {
                latest.insert(key, value);
            }
        }
    }
    Ok(latest)
}
