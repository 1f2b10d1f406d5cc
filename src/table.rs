// Plain-text table view of a dataset

use crate::data::{Dataset, Value};

/// Render a dataset as an aligned text table.
///
/// Numbers are right-aligned, everything else left-aligned. With `max_rows`
/// set, only that many rows are shown followed by a count of the rest.
pub fn render_table(data: &Dataset, max_rows: Option<usize>) -> String {
    let shown = max_rows.unwrap_or(data.row_count()).min(data.row_count());

    let cells: Vec<Vec<String>> = data.rows[..shown]
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect();

    let mut widths: Vec<usize> = data.headers.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let mut out = String::new();

    let header: Vec<String> = data
        .headers
        .iter()
        .zip(&widths)
        .map(|(h, &w)| pad_right(h, w))
        .collect();
    push_line(&mut out, &header);

    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    push_line(&mut out, &rule);

    for (row, typed) in cells.iter().zip(&data.rows) {
        let line: Vec<String> = row
            .iter()
            .zip(typed)
            .zip(&widths)
            .map(|((cell, value), &w)| match value {
                Value::Number(_) => pad_left(cell, w),
                _ => pad_right(cell, w),
            })
            .collect();
        push_line(&mut out, &line);
    }

    let hidden = data.row_count() - shown;
    if hidden > 0 {
        out.push_str(&format!("... {} more rows\n", hidden));
    }
    out.push_str(&format!(
        "[{} rows x {} columns]\n",
        data.row_count(),
        data.column_count()
    ));

    out
}

fn push_line(out: &mut String, cells: &[String]) {
    out.push_str(cells.join("  ").trim_end());
    out.push('\n');
}

fn pad_right(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.chars().count());
    format!("{}{}", s, " ".repeat(fill))
}

fn pad_left(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.chars().count());
    format!("{}{}", " ".repeat(fill), s)
}
