// Pivot table computation: grouping rows by key columns and reducing a value column

use crate::data::{Dataset, Value};
use crate::error::{PivotError, Result};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// The reduction applied within each group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Aggregation {
    #[default]
    Sum,
    Count,
    Mean,
    DistinctCount,
}

impl Aggregation {
    pub fn label(self) -> &'static str {
        match self {
            Aggregation::Sum => "Sum",
            Aggregation::Count => "Count",
            Aggregation::Mean => "Mean",
            Aggregation::DistinctCount => "Distinct Count",
        }
    }

    /// Reduce one group's cells. Each cell carries its 1-based source row for error reporting.
    fn reduce(self, column: &str, cells: &[(usize, &Value)]) -> Result<Value> {
        let present = cells.iter().filter(|(_, v)| !v.is_null());

        match self {
            Aggregation::Sum => {
                let numbers = numeric_values(column, present)?;
                Ok(Value::Number(numbers.iter().sum()))
            }
            Aggregation::Count => Ok(Value::Number(present.count() as f64)),
            Aggregation::Mean => {
                let numbers = numeric_values(column, present)?;
                if numbers.is_empty() {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Number(numbers.iter().sum::<f64>() / numbers.len() as f64))
                }
            }
            Aggregation::DistinctCount => {
                let mut distinct: Vec<&Value> = present.map(|(_, v)| *v).collect();
                distinct.sort();
                distinct.dedup();
                Ok(Value::Number(distinct.len() as f64))
            }
        }
    }
}

fn numeric_values<'a, 'b: 'a>(
    column: &str,
    cells: impl Iterator<Item = &'a (usize, &'b Value)>,
) -> Result<Vec<f64>> {
    cells
        .map(|(row, value)| {
            value.as_f64().ok_or_else(|| PivotError::NonNumeric {
                value: value.to_string(),
                column: column.to_string(),
                row: *row,
            })
        })
        .collect()
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Aggregation {
    type Err = PivotError;

    /// Accepts English names as well as the Portuguese labels (Soma, Contagem, ...)
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '_' { '-' } else { c })
            .collect();

        match normalized.as_str() {
            "sum" | "soma" => Ok(Aggregation::Sum),
            "count" | "contagem" => Ok(Aggregation::Count),
            "mean" | "average" | "avg" | "média" | "media" => Ok(Aggregation::Mean),
            "distinct-count" | "nunique" | "contagem-distinta" => Ok(Aggregation::DistinctCount),
            _ => Err(PivotError::UnknownAggregation(s.to_string())),
        }
    }
}

/// The user's pivot selection
#[derive(Debug, Clone, PartialEq)]
pub struct PivotSpec {
    pub group_by: Vec<String>,
    pub value: String,
    pub aggregation: Aggregation,
}

/// One group of the pivot: its key values and aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct PivotRow {
    pub key: Vec<Value>,
    pub value: Value,
}

/// Aggregates keyed by distinct group-by combinations, sorted by key
#[derive(Debug, Clone, PartialEq)]
pub struct PivotResult {
    pub key_columns: Vec<String>,
    pub value_column: String,
    pub aggregation: Aggregation,
    pub rows: Vec<PivotRow>,
}

impl PivotResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Aggregate for an exact key
    #[cfg(test)]
    pub(crate) fn get(&self, key: &[Value]) -> Option<&Value> {
        self.rows
            .iter()
            .find(|row| row.key.as_slice() == key)
            .map(|row| &row.value)
    }

    /// Column names after the key is reset into ordinary columns
    pub fn columns(&self) -> Vec<String> {
        let mut columns = self.key_columns.clone();
        columns.push(self.value_column.clone());
        columns
    }

    /// Reset the key into ordinary columns: one row per group, keys then aggregate
    pub fn flatten(&self) -> Dataset {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut flat = row.key.clone();
                flat.push(row.value.clone());
                flat
            })
            .collect();
        Dataset::new(self.columns(), rows)
    }

    /// JSON array of objects, one per group
    pub fn to_json(&self) -> JsonValue {
        let columns = self.columns();
        let records = self
            .flatten()
            .rows
            .into_iter()
            .map(|row| {
                let object: Map<String, JsonValue> = columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(|v| serde_json::to_value(v).unwrap_or(JsonValue::Null)))
                    .collect();
                JsonValue::Object(object)
            })
            .collect();
        JsonValue::Array(records)
    }
}

/// Group the dataset by the spec's key columns and aggregate its value column
pub fn compute_pivot(data: &Dataset, spec: &PivotSpec) -> Result<PivotResult> {
    if spec.group_by.is_empty() || spec.value.is_empty() {
        return Err(PivotError::EmptySelection);
    }

    // 1. Resolve column indices
    let key_indices = spec
        .group_by
        .iter()
        .map(|col| data.require_column(col))
        .collect::<Result<Vec<usize>>>()?;
    let value_index = data.require_column(&spec.value)?;

    let key_columns: Vec<String> = key_indices.iter().map(|&i| data.headers[i].clone()).collect();
    // A value column that is also a key gets the aggregation appended so the
    // flattened columns stay distinct
    let value_column = if key_indices.contains(&value_index) {
        format!("{} ({})", data.headers[value_index], spec.aggregation)
    } else {
        data.headers[value_index].clone()
    };

    // 2. Group rows, skipping those with a missing key
    let mut groups: BTreeMap<Vec<Value>, Vec<(usize, &Value)>> = BTreeMap::new();
    let mut skipped = 0usize;
    for (row_idx, row) in data.rows.iter().enumerate() {
        let key: Vec<Value> = key_indices.iter().map(|&i| row[i].clone()).collect();
        if key.iter().any(Value::is_null) {
            skipped += 1;
            continue;
        }
        groups
            .entry(key)
            .or_default()
            .push((row_idx + 1, &row[value_index]));
    }

    // 3. Reduce each group; groups with no aggregate are dropped
    let mut rows = Vec::with_capacity(groups.len());
    for (key, cells) in groups {
        let value = spec.aggregation.reduce(&data.headers[value_index], &cells)?;
        if !value.is_null() {
            rows.push(PivotRow { key, value });
        }
    }

    debug!(
        aggregation = %spec.aggregation,
        groups = rows.len(),
        skipped_rows = skipped,
        "Computed pivot"
    );

    Ok(PivotResult {
        key_columns,
        value_column,
        aggregation: spec.aggregation,
        rows,
    })
}
