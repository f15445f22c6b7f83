//! Time-series data model.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};
use thiserror::Error;

/// Kind of data recorded in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Confirmed,
    Deaths,
    Recovered,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Confirmed => "confirmed",
            DataKind::Deaths => "deaths",
            DataKind::Recovered => "recovered",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by [`TimeSeriesStore`] lookups and insertions.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("no {kind} series for region {region:?}")]
    KeyNotFound { kind: DataKind, region: String },

    #[error("{kind} series for region {region:?} is not strictly ascending by date")]
    UnorderedDates { kind: DataKind, region: String },
}

/// Single dated observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub date: NaiveDate,
    pub value: f64,
}

/// Chronologically ordered sequence of observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series {
    points: Vec<Point>,
}

impl Series {
    /// Build a series from parallel date and value slices.
    ///
    /// Extra elements of the longer slice are ignored.
    pub fn from_parts(dates: &[NaiveDate], values: &[f64]) -> Self {
        dates
            .iter()
            .zip(values)
            .map(|(&date, &value)| Point { date, value })
            .collect()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|pt| pt.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|pt| pt.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    /// Suffix of the series starting at position `offset`.
    pub fn tail(&self, offset: usize) -> &[Point] {
        self.points.get(offset..).unwrap_or(&[])
    }

    fn is_strictly_ascending(&self) -> bool {
        self.points.windows(2).all(|pair| pair[0].date < pair[1].date)
    }
}

impl FromIterator<Point> for Series {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Snapshot of every series, keyed by data kind and then by region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesStore {
    tables: BTreeMap<DataKind, BTreeMap<String, Series>>,
}

impl TimeSeriesStore {
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }

    /// Insert (or replace) the series of `kind` for `region`.
    pub fn insert(
        &mut self,
        kind: DataKind,
        region: impl Into<String>,
        series: Series,
    ) -> Result<(), StoreError> {
        let region = region.into();
        if !series.is_strictly_ascending() {
            return Err(StoreError::UnorderedDates { kind, region });
        }
        self.tables.entry(kind).or_default().insert(region, series);
        Ok(())
    }

    /// Look up the series of `kind` for `region`.
    pub fn series(&self, kind: DataKind, region: &str) -> Result<&Series, StoreError> {
        self.tables
            .get(&kind)
            .and_then(|table| table.get(region))
            .ok_or_else(|| StoreError::KeyNotFound {
                kind,
                region: region.to_string(),
            })
    }

    /// Sorted names of the regions with confirmed-case data.
    pub fn regions(&self) -> Vec<String> {
        self.tables
            .get(&DataKind::Confirmed)
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Add the reserved `name` region to every table as the per-date sum of
    /// all other regions.
    ///
    /// Tables that already hold `name` are left untouched.
    pub fn add_global_total(&mut self, name: &str) {
        for (kind, table) in self.tables.iter_mut() {
            if table.contains_key(name) || table.is_empty() {
                continue;
            }

            let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
            for series in table.values() {
                for pt in series.points() {
                    *totals.entry(pt.date).or_insert(0.0) += pt.value;
                }
            }

            let total: Series = totals
                .into_iter()
                .map(|(date, value)| Point { date, value })
                .collect();
            log::debug!("added {name:?} total to {kind} table ({} points)", total.len());
            table.insert(name.to_string(), total);
        }
    }

    /// Load a store snapshot from a MessagePack-encoded file.
    ///
    /// Every series is re-validated after decoding.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        let snapshot: TimeSeriesStore =
            decode::from_read(&mut reader).context("failed to deserialize store")?;

        let mut store = TimeSeriesStore::new();
        for (kind, table) in snapshot.tables {
            for (region, series) in table {
                store
                    .insert(kind, region, series)
                    .context("invalid series in store")?;
            }
        }
        Ok(store)
    }

    /// Save the store snapshot to a MessagePack-encoded file.
    pub fn save_file<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, self).context("failed to serialize store")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}
