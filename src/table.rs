//! In-memory table produced by the loader.

use crate::error::QrSheetError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single scalar cell value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl CellValue {
    /// Infer a typed value from raw delimited-text input.
    ///
    /// A field only becomes a number or boolean when that value displays as
    /// exactly the original text, so the stringified cell always equals the
    /// field. `89445001021983048260`, `+5`, `1e5` and `1.0` stay strings; an
    /// empty field is [`CellValue::Empty`].
    pub fn infer(raw: &str) -> Self {
        if raw.is_empty() {
            return CellValue::Empty;
        }
        let typed = if let Ok(i) = raw.parse::<i64>() {
            Some(CellValue::Int(i))
        } else if let Ok(f) = raw.parse::<f64>() {
            f.is_finite().then_some(CellValue::Float(f))
        } else {
            match raw {
                "True" => Some(CellValue::Bool(true)),
                "False" => Some(CellValue::Bool(false)),
                _ => None,
            }
        };
        match typed {
            Some(value) if value.to_string() == raw => value,
            _ => CellValue::String(raw.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

/// Named columns over positionally aligned rows.
///
/// Every row holds exactly one value per column; [`Table::new`] rejects
/// anything else, so column lengths are always equal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, QrSheetError> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(QrSheetError::RaggedTable {
                    row: i,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Number of data rows (the header is not counted).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Resolve a column name, failing with [`QrSheetError::ColumnNotFound`].
    pub fn require_column(&self, name: &str) -> Result<usize, QrSheetError> {
        self.column_index(name)
            .ok_or_else(|| QrSheetError::ColumnNotFound {
                column: name.to_string(),
                available: self.columns.clone(),
            })
    }

    /// Iterate the values of one column, top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(column))
    }
}

/// Make header names unique and non-blank.
///
/// Blank headers become `Unnamed: <index>`; repeats of an earlier name get a
/// `.1`, `.2`, … suffix.
pub fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for (i, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {i}")
        } else {
            name
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{base}.{n}");
            n += 1;
        }
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_types() {
        assert_eq!(CellValue::infer(""), CellValue::Empty);
        assert_eq!(CellValue::infer("42"), CellValue::Int(42));
        assert_eq!(CellValue::infer("-3.5"), CellValue::Float(-3.5));
        assert_eq!(CellValue::infer("True"), CellValue::Bool(true));
        assert_eq!(CellValue::infer("true"), CellValue::from("true"));
        assert_eq!(CellValue::infer("http://a"), CellValue::from("http://a"));
        assert_eq!(CellValue::infer(" 7"), CellValue::from(" 7"));
        assert_eq!(CellValue::infer("NaN"), CellValue::from("NaN"));
    }

    #[test]
    fn display_stringifies() {
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::Int(1).to_string(), "1");
        assert_eq!(CellValue::Float(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Bool(false).to_string(), "False");
    }

    #[test]
    fn infer_keeps_field_text() {
        for raw in ["89445001021983048260", "+5", "1e5", "1.0", "007", "-0", "TRUE"] {
            let value = CellValue::infer(raw);
            assert_eq!(value, CellValue::from(raw), "{raw}");
            assert_eq!(value.to_string(), raw);
        }
    }

    #[test]
    fn ragged_rows_rejected() {
        let err = Table::new(
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::Int(1)]],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            QrSheetError::RaggedTable { row: 0, expected: 2, found: 1 }
        ));
    }

    #[test]
    fn column_lookup() {
        let t = Table::new(
            vec!["id".into(), "url".into()],
            vec![
                vec![CellValue::Int(1), "http://a".into()],
                vec![CellValue::Int(2), "http://b".into()],
            ],
        )
        .unwrap();
        assert_eq!(t.require_column("url").unwrap(), 1);
        let vals: Vec<String> = t.column_values(1).map(|v| v.to_string()).collect();
        assert_eq!(vals, vec!["http://a", "http://b"]);
        assert!(matches!(
            t.require_column("sku"),
            Err(QrSheetError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn headers_normalized() {
        let h = normalize_headers(vec!["a".into(), "".into(), "a".into(), "a".into()]);
        assert_eq!(h, vec!["a", "Unnamed: 1", "a.1", "a.2"]);
    }
}
