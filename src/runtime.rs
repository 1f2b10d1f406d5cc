// Chart runtime: turns a pivot result and axis choice into an encoded bar chart

use crate::data::Dataset;
use crate::graph;
use crate::pivot::{Aggregation, PivotResult};
use crate::RenderOptions;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use tracing::info;

/// Axis choice over the flattened pivot columns
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub x: String,
    pub y: String,
}

impl ChartSpec {
    /// First key column against the aggregated value
    pub fn default_for(pivot: &PivotResult) -> Option<Self> {
        let x = pivot.key_columns.first()?.clone();
        Some(ChartSpec {
            x,
            y: pivot.value_column.clone(),
        })
    }
}

pub fn chart_title(aggregation: Aggregation) -> String {
    format!("Pivot Table Chart - {}", aggregation)
}

/// Render a pivot result as a bar chart in the configured format
pub fn render_pivot_chart(
    pivot: &PivotResult,
    chart: &ChartSpec,
    options: &RenderOptions,
) -> Result<Vec<u8>> {
    let flat = pivot.flatten();
    let (categories, y_values) = extract_categorical_data(&flat, &chart.x, &chart.y)?;

    info!(
        x = %chart.x,
        y = %chart.y,
        bars = categories.len(),
        format = ?options.format,
        "Rendering chart"
    );

    let canvas = graph::Canvas::new(
        options.width,
        options.height,
        chart_title(pivot.aggregation),
        chart.x.clone(),
        chart.y.clone(),
    );
    canvas.render_bars(&categories, &y_values, &options.format)
}

/// Extract categorical data for the bar chart.
/// Returns (categories, y_values) where y_values are summed per category,
/// categories in order of first appearance.
fn extract_categorical_data(
    data: &Dataset,
    x_col: &str,
    y_col: &str,
) -> Result<(Vec<String>, Vec<f64>)> {
    let x_col_index = data
        .column_index(x_col)
        .ok_or_else(|| anyhow!("Column '{}' not found", x_col))?;
    let y_col_index = data
        .column_index(y_col)
        .ok_or_else(|| anyhow!("Column '{}' not found", y_col))?;

    let mut category_values: HashMap<String, f64> = HashMap::new();
    let mut categories_order: Vec<String> = Vec::new();

    for (row_idx, row) in data.rows.iter().enumerate() {
        let category = row[x_col_index].to_string();
        let y_val = row[y_col_index]
            .as_f64()
            .filter(|y| y.is_finite())
            .ok_or_else(|| {
                anyhow!(
                    "Failed to parse '{}' as finite number in column '{}' at row {}",
                    row[y_col_index],
                    y_col,
                    row_idx + 1
                )
            })?;

        // Track category order (first appearance)
        if !category_values.contains_key(&category) {
            categories_order.push(category.clone());
        }

        // Bars sharing an x label stack to their total
        *category_values.entry(category).or_insert(0.0) += y_val;
    }

    let y_values: Vec<f64> = categories_order
        .iter()
        .map(|cat| category_values.get(cat).copied().unwrap_or(0.0))
        .collect();

    Ok((categories_order, y_values))
}
