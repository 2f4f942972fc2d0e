//! CSV interchange of instance parameters and solution results.
//!
//! # Key Components
//!
//! - [`write_params`] / [`load_params`]: one table per instance array plus a
//!   key/value table of scalars; loading is lenient and reports what it skipped
//! - [`write_combined`]: one row per ship for spreadsheet inspection
//! - [`write_solution`]: assignments, slot allocations, intervals, start
//!   times and the per-ship objective breakdown

mod params;
mod results;

pub use params::{
    load_params, write_combined, write_params, LoadedParams, ParamFile, MAX_TABLE_ENTRIES,
};
pub use results::{write_solution, ResultFile};

use crate::instance::Dimensions;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Interchange failure.
#[derive(Debug, Error)]
pub enum InterchangeError {
    /// Without the scalar table there is nothing to size the arrays with.
    #[error("general parameter table not found: {0}")]
    MissingGeneral(PathBuf),

    /// The declared dimensions would allocate more than
    /// [`MAX_TABLE_ENTRIES`] values in one array.
    #[error("{path}: dimensions {dims:?} are too large to load")]
    TooLarge { path: PathBuf, dims: Dimensions },

    #[error("{path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One skipped record or table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    pub file: PathBuf,
    /// 1-based line, 0 when the whole file is affected.
    pub line: u64,
    pub reason: String,
}

impl LoadWarning {
    pub(crate) fn new(file: &Path, line: u64, reason: impl Into<String>) -> Self {
        Self {
            file: file.to_path_buf(),
            line,
            reason: reason.into(),
        }
    }
}

/// Diagnostics collected while loading parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub warnings: Vec<LoadWarning>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub(crate) fn push(&mut self, warning: LoadWarning) {
        self.warnings.push(warning);
    }
}
