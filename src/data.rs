use crate::error::{PivotError, Result};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use tracing::warn;

/// Markers read as missing values in delimited text
const MISSING_MARKERS: &[&str] = &["NA", "N/A", "NaN", "nan", "NULL", "null", "None", "#N/A"];

/// A single table cell
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
}

impl Value {
    /// Type a raw text cell: missing markers become Null, numbers become Number
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed) {
            return Value::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if !n.is_nan() => Value::Number(n),
            _ => Value::Text(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Number(_) => 1,
            Value::Text(_) => 2,
        }
    }
}

// Null < Number < Text; numbers by total order
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// An ordered table of typed rows sharing one header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { headers, rows }
    }

    /// Build a dataset from raw text records, typing every cell.
    /// Short records are padded with Null, long ones truncated to the header.
    pub fn from_records(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = records
            .iter()
            .map(|record| {
                let mut row: Vec<Value> = record.iter().take(width).map(|s| Value::parse(s)).collect();
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Find a column by exact name, falling back to a case-insensitive match
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .or_else(|| self.headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| PivotError::ColumnNotFound(name.to_string()))
    }
}

/// Concatenate datasets row-wise.
///
/// Returns `None` when nothing was loaded. Columns are the union of all
/// headers in first-seen order; rows from a source missing a column get Null.
pub fn combine(datasets: Vec<Dataset>) -> Option<Dataset> {
    let first = datasets.first()?;
    let first_headers = first.headers.clone();

    // Target position of each source column in the combined header. The n-th
    // column named `h` in a source lands on the n-th combined column named `h`.
    let mut headers: Vec<String> = Vec::new();
    let mut mappings: Vec<Vec<usize>> = Vec::with_capacity(datasets.len());
    for dataset in &datasets {
        if dataset.headers != first_headers {
            warn!(
                expected = ?first_headers,
                found = ?dataset.headers,
                "Loaded files have different columns; missing cells will be empty"
            );
        }

        let mut mapping = Vec::with_capacity(dataset.headers.len());
        for (idx, header) in dataset.headers.iter().enumerate() {
            let occurrence = dataset.headers[..idx].iter().filter(|h| *h == header).count();
            let existing = headers
                .iter()
                .enumerate()
                .filter(|(_, c)| *c == header)
                .map(|(pos, _)| pos)
                .nth(occurrence);
            let target = match existing {
                Some(pos) => pos,
                None => {
                    headers.push(header.clone());
                    headers.len() - 1
                }
            };
            mapping.push(target);
        }
        mappings.push(mapping);
    }

    let total: usize = datasets.iter().map(Dataset::row_count).sum();
    let mut rows = Vec::with_capacity(total);
    for (dataset, mapping) in datasets.into_iter().zip(&mappings) {
        for row in dataset.rows {
            let mut combined_row = vec![Value::Null; headers.len()];
            for (value, &target) in row.into_iter().zip(mapping) {
                combined_row[target] = value;
            }
            rows.push(combined_row);
        }
    }

    Some(Dataset { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_dataset(headers: Vec<&str>, rows: Vec<Vec<&str>>) -> Dataset {
        Dataset::from_records(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_value_parse_types() {
        assert_eq!(Value::parse("10"), Value::Number(10.0));
        assert_eq!(Value::parse(" 2.5 "), Value::Number(2.5));
        assert_eq!(Value::parse("-3e2"), Value::Number(-300.0));
        assert_eq!(Value::parse("A"), Value::Text("A".to_string()));
        assert!(Value::parse("").is_null());
        assert!(Value::parse("   ").is_null());
        assert!(Value::parse("NA").is_null());
        assert!(Value::parse("NaN").is_null());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Number(30.0).to_string(), "30");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Text("São Paulo".to_string()).to_string(), "São Paulo");
        assert_eq!(Value::Null.to_string(), "");
    }

    #[test]
    fn test_value_ordering() {
        let mut values = vec![
            Value::from("b"),
            Value::Number(2.0),
            Value::Null,
            Value::from("a"),
            Value::Number(-1.0),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Number(-1.0),
                Value::Number(2.0),
                Value::from("a"),
                Value::from("b"),
            ]
        );
    }

    #[test]
    fn test_value_serialize() {
        let json = serde_json::to_string(&vec![Value::Null, Value::Number(1.5), Value::from("x")]).unwrap();
        assert_eq!(json, "[null,1.5,\"x\"]");
    }

    #[test]
    fn test_from_records_pads_and_truncates() {
        let data = make_dataset(vec!["a", "b"], vec![vec!["1"], vec!["1", "2", "3"]]);
        assert_eq!(data.rows[0], vec![Value::Number(1.0), Value::Null]);
        assert_eq!(data.rows[1], vec![Value::Number(1.0), Value::Number(2.0)]);
    }

    #[test]
    fn test_column_index_case_insensitive_fallback() {
        let data = make_dataset(vec!["City", "city_code"], vec![]);
        assert_eq!(data.column_index("City"), Some(0));
        assert_eq!(data.column_index("city"), Some(0));
        assert_eq!(data.column_index("CITY_CODE"), Some(1));
        assert_eq!(data.column_index("missing"), None);
        assert!(matches!(
            data.require_column("missing"),
            Err(PivotError::ColumnNotFound(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_combine_empty_is_none() {
        assert!(combine(vec![]).is_none());
    }

    #[test]
    fn test_combine_row_count_and_order() {
        let first = make_dataset(vec!["city", "sales"], vec![vec!["A", "10"], vec!["B", "5"]]);
        let second = make_dataset(vec!["city", "sales"], vec![vec!["C", "7"]]);
        let combined = combine(vec![first, second]).unwrap();
        assert_eq!(combined.row_count(), 3);
        assert_eq!(combined.headers, vec!["city", "sales"]);
        let cities: Vec<String> = combined.rows.iter().map(|row| row[0].to_string()).collect();
        assert_eq!(cities, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_combine_union_of_columns() {
        let first = make_dataset(vec!["city", "sales"], vec![vec!["A", "10"]]);
        let second = make_dataset(vec!["region", "city"], vec![vec!["North", "B"]]);
        let combined = combine(vec![first, second]).unwrap();
        assert_eq!(combined.headers, vec!["city", "sales", "region"]);
        assert_eq!(
            combined.rows[0],
            vec![Value::from("A"), Value::Number(10.0), Value::Null]
        );
        assert_eq!(
            combined.rows[1],
            vec![Value::from("B"), Value::Null, Value::from("North")]
        );
    }

    #[test]
    fn test_combine_keeps_repeated_column_names() {
        let data = make_dataset(vec!["a", "a"], vec![vec!["1", "2"]]);
        let combined = combine(vec![data]).unwrap();
        assert_eq!(combined.headers, vec!["a", "a"]);
        assert_eq!(combined.rows[0], vec![Value::Number(1.0), Value::Number(2.0)]);
    }

    #[test]
    fn test_combine_repeated_names_across_files() {
        let first = make_dataset(vec!["a", "b"], vec![vec!["1", "2"]]);
        let second = make_dataset(vec!["a", "a"], vec![vec!["3", "4"]]);
        let combined = combine(vec![first, second]).unwrap();
        assert_eq!(combined.headers, vec!["a", "b", "a"]);
        assert_eq!(
            combined.rows[1],
            vec![Value::Number(3.0), Value::Null, Value::Number(4.0)]
        );
    }
}
