//! Workflow session
//!
//! A `Session` owns everything one user works with: the current upload batch,
//! the combined dataset built from it, and the pivot/chart selections. Every
//! query recomputes from the combined dataset forward; nothing downstream is
//! cached. A new upload batch clears the previous data and selections.

use crate::data::{self, Dataset};
use crate::error::{PivotError, Result};
use crate::loader::{self, UploadedFile};
use crate::pivot::{self, Aggregation, PivotResult, PivotSpec};
use crate::runtime::ChartSpec;
use std::fmt;
use tracing::{info, warn};

/// A file that could not be loaded, and why
#[derive(Debug)]
pub struct LoadFailure {
    pub file: String,
    pub error: PivotError,
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

/// Current user choices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub group_by: Vec<String>,
    pub value: Option<String>,
    pub aggregation: Aggregation,
    pub x_axis: Option<String>,
    pub y_axis: Option<String>,
}

#[derive(Debug, Default)]
pub struct Session {
    combined: Option<Dataset>,
    failures: Vec<LoadFailure>,
    selection: Selection,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new upload batch: load every file, keep the ones that succeed
    /// and combine them. Failed files are recorded and skipped.
    pub fn upload(&mut self, files: Vec<UploadedFile>) -> &[LoadFailure] {
        self.clear();

        let mut datasets = Vec::with_capacity(files.len());
        for file in &files {
            match loader::load(file) {
                Ok(dataset) => datasets.push(dataset),
                Err(error) => {
                    warn!(file = %file.name, %error, "Skipping file");
                    self.failures.push(LoadFailure {
                        file: file.name.clone(),
                        error,
                    });
                }
            }
        }

        self.combined = data::combine(datasets);
        if let Some(combined) = &self.combined {
            info!(
                files = files.len() - self.failures.len(),
                rows = combined.row_count(),
                columns = combined.column_count(),
                "Combined dataset ready"
            );
        }

        &self.failures
    }

    /// Drop all data and selections
    pub fn clear(&mut self) {
        self.combined = None;
        self.failures.clear();
        self.selection = Selection::default();
    }

    pub fn combined(&self) -> Option<&Dataset> {
        self.combined.as_ref()
    }

    /// Columns offered for group-by and value selection
    pub fn candidate_columns(&self) -> &[String] {
        self.combined
            .as_ref()
            .map(|d| d.headers.as_slice())
            .unwrap_or(&[])
    }

    pub fn select_group_by(&mut self, columns: Vec<String>) -> Result<()> {
        for column in &columns {
            self.require_column(column)?;
        }
        self.selection.group_by = columns;
        Ok(())
    }

    pub fn select_value(&mut self, column: Option<String>) -> Result<()> {
        if let Some(column) = &column {
            self.require_column(column)?;
        }
        self.selection.value = column;
        Ok(())
    }

    pub fn select_aggregation(&mut self, aggregation: Aggregation) {
        self.selection.aggregation = aggregation;
    }

    /// Choose chart axes; checked against the pivot columns when the chart is built
    pub fn select_axes(&mut self, x: Option<String>, y: Option<String>) {
        self.selection.x_axis = x;
        self.selection.y_axis = y;
    }

    fn require_column(&self, column: &str) -> Result<usize> {
        self.combined
            .as_ref()
            .ok_or_else(|| PivotError::ColumnNotFound(column.to_string()))?
            .require_column(column)
    }

    /// The pivot to compute, once both group-by columns and a value column are chosen
    pub fn pivot_spec(&self) -> Option<PivotSpec> {
        if self.selection.group_by.is_empty() {
            return None;
        }
        let value = self.selection.value.clone()?;
        Some(PivotSpec {
            group_by: self.selection.group_by.clone(),
            value,
            aggregation: self.selection.aggregation,
        })
    }

    /// Compute the pivot from the combined dataset.
    /// `Ok(None)` while there is no data or the selection is incomplete.
    pub fn pivot(&self) -> Result<Option<PivotResult>> {
        let (Some(data), Some(spec)) = (self.combined.as_ref(), self.pivot_spec()) else {
            return Ok(None);
        };
        pivot::compute_pivot(data, &spec).map(Some)
    }

    /// Chart axes for a pivot: selected ones, defaulting to first key vs value
    pub fn chart_spec(&self, pivot: &PivotResult) -> Result<ChartSpec> {
        let columns = pivot.columns();
        let resolve = |chosen: &Option<String>, default: String| -> Result<String> {
            match chosen {
                Some(name) => columns
                    .iter()
                    .find(|c| *c == name || c.eq_ignore_ascii_case(name))
                    .cloned()
                    .ok_or_else(|| PivotError::ColumnNotFound(name.clone())),
                None => Ok(default),
            }
        };

        let default = ChartSpec::default_for(pivot).ok_or(PivotError::EmptySelection)?;
        Ok(ChartSpec {
            x: resolve(&self.selection.x_axis, default.x)?,
            y: resolve(&self.selection.y_axis, default.y)?,
        })
    }
}
