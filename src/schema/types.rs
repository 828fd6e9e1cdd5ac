// src/schema/types.rs

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::HashMap;

/// An untyped cell as delivered by a source, before any coercion.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl RawValue {
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Python-style truthiness: blank text, zero, `false` and `Empty` are falsy.
    pub fn is_falsy(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(s) => s.is_empty(),
            RawValue::Number(n) => *n == 0.0,
            RawValue::Bool(b) => !b,
            RawValue::DateTime(_) => false,
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<NaiveDateTime> for RawValue {
    fn from(dt: NaiveDateTime) -> Self {
        RawValue::DateTime(dt)
    }
}

/// A column declaration: the id cells are keyed by, and the header title.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub id: u64,
    pub title: String,
    /// Set when the header cell itself is a calendar day (one column per day).
    pub date: Option<NaiveDate>,
}

impl Column {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            date: None,
        }
    }
}

/// File attached to a row in the spreadsheet service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub id: u64,
    pub name: String,
    pub mime_type: String,
    /// Size in KB.
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    /// Row id assigned by the service, when there is one.
    pub id: Option<u64>,
    /// Zero-based position among the sheet's data rows.
    pub position: usize,
    pub cells: HashMap<u64, RawValue>,
    pub attachments: Vec<Attachment>,
}

impl RawRow {
    pub fn cell(&self, column_id: u64) -> &RawValue {
        static EMPTY: RawValue = RawValue::Empty;
        self.cells.get(&column_id).unwrap_or(&EMPTY)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(RawValue::is_empty)
    }
}

/// One sheet of rows, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub columns: Vec<Column>,
    pub rows: Vec<RawRow>,
}

impl Sheet {
    /// Build a sheet from a header and positional rows; column ids are indices.
    pub fn from_rows(headers: &[&str], rows: Vec<Vec<RawValue>>) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, h)| Column::new(i as u64, *h))
            .collect();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(position, values)| RawRow {
                position,
                cells: values
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (i as u64, v))
                    .collect(),
                ..RawRow::default()
            })
            .collect();
        Sheet {
            columns,
            rows,
            ..Sheet::default()
        }
    }

    /// Columns whose header is a date, in declaration order.
    pub fn date_columns(&self) -> impl Iterator<Item = (&Column, NaiveDate)> {
        self.columns
            .iter()
            .filter_map(|c| c.date.map(|d| (c, d)))
    }
}
