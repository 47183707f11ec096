//! A minimal column-named table of JSON cells.

use serde_json::Value;
use std::collections::HashSet;

use crate::stats::ResultSet;

use super::TableError;

/// Rows of JSON values under named headers.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    /// Build a frame, rejecting rows whose width differs from the header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, TableError> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(TableError::RaggedRow {
                index,
                expected: headers.len(),
                actual: row.len(),
            });
        }
        Ok(Self { headers, rows })
    }

    /// A frame with headers and no rows.
    pub fn empty(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn from_result_set(result_set: &ResultSet) -> Result<Self, TableError> {
        Self::new(result_set.headers.clone(), result_set.row_set.clone())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, column: &str) -> Result<usize, TableError> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| TableError::MissingColumn(column.to_string()))
    }

    fn column_indices(&self, columns: &[&str]) -> Result<Vec<usize>, TableError> {
        columns.iter().map(|c| self.column_index(c)).collect()
    }

    /// Project onto `columns`, in the given order.
    pub fn select(&self, columns: &[&str]) -> Result<Self, TableError> {
        let indices = self.column_indices(columns)?;
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Self {
            headers: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        })
    }

    /// Keep the first row for each distinct value of `keys`, preserving order.
    pub fn dedup_by(&self, keys: &[&str]) -> Result<Self, TableError> {
        let indices = self.column_indices(keys)?;
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        let rows = self
            .rows
            .iter()
            .filter(|row| seen.insert(indices.iter().map(|&i| row[i].to_string()).collect()))
            .cloned()
            .collect();
        Ok(Self {
            headers: self.headers.clone(),
            rows,
        })
    }

    /// Keep rows whose `column` equals `value`.
    pub fn filter_eq(&self, column: &str, value: &Value) -> Result<Self, TableError> {
        let index = self.column_index(column)?;
        let rows = self
            .rows
            .iter()
            .filter(|row| &row[index] == value)
            .cloned()
            .collect();
        Ok(Self {
            headers: self.headers.clone(),
            rows,
        })
    }

    /// Append a column that is null on every row.
    pub fn with_null_column(mut self, name: &str) -> Self {
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        self
    }

    /// Values of one column, in row order.
    pub fn column_values(&self, column: &str) -> Result<Vec<&Value>, TableError> {
        let index = self.column_index(column)?;
        Ok(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Append the rows of `other`, which must have identical headers.
    pub fn extend(&mut self, other: Frame) -> Result<(), TableError> {
        if other.headers != self.headers {
            return Err(TableError::HeaderMismatch {
                expected: self.headers.clone(),
                actual: other.headers,
            });
        }
        self.rows.extend(other.rows);
        Ok(())
    }
}
