//! Load-time preparation: raw bytes → canonical headers → role binding →
//! validated rows.
//!
//! [`prepare`] is a pure function of its input bytes and options, so two
//! calls over the same source yield identical datasets. Memoization is left
//! to the caller (see [`crate::cache::DatasetCache`]).

use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8};
use log::info;

use crate::{
    data::RawDataset,
    error::PipelineResult,
    filter::{self, FilterSpec},
    io_utils,
    roles::{RoleBinding, resolve_roles},
    validate::{Completeness, DroppedRow, ValidatedRow, validate},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrepareOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
    pub completeness: Completeness,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            encoding: UTF_8,
            completeness: Completeness::default(),
        }
    }
}

/// A loaded dataset. Read-only once built; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub raw_headers: Vec<String>,
    pub columns: Vec<String>,
    pub binding: RoleBinding,
    pub rows: Vec<ValidatedRow>,
    pub dropped: Vec<DroppedRow>,
    pub source_rows: usize,
}

impl PreparedDataset {
    pub fn all_rows(&self) -> Vec<&ValidatedRow> {
        self.rows.iter().collect()
    }

    pub fn filter(&self, spec: &FilterSpec) -> PipelineResult<Vec<&ValidatedRow>> {
        filter::apply(&self.rows, &self.binding, spec)
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

pub fn prepare(bytes: &[u8], options: &PrepareOptions) -> Result<PreparedDataset> {
    let mut reader = io_utils::open_csv_reader(bytes, options.delimiter, true);
    let dataset = RawDataset::from_reader(&mut reader, options.encoding)?;
    let binding = resolve_roles(&dataset.columns)?;
    let validation = validate(&dataset, &binding, options.completeness);

    info!(
        "Prepared {} of {} row(s) across {} column(s); dropped {}",
        validation.rows.len(),
        dataset.row_count(),
        dataset.columns.len(),
        validation.dropped_count()
    );

    Ok(PreparedDataset {
        source_rows: dataset.row_count(),
        raw_headers: dataset.raw_headers,
        columns: dataset.columns,
        binding,
        rows: validation.rows,
        dropped: validation.dropped,
    })
}

pub fn prepare_path(path: &Path, options: &PrepareOptions) -> Result<PreparedDataset> {
    let bytes = io_utils::read_source(path)?;
    prepare(&bytes, options).with_context(|| format!("Preparing dataset from {path:?}"))
}
