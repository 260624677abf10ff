//! In-memory tables.
//!
//! A [`Frame`] holds ordered headers and rows of optional string cells. Every
//! pipeline stage derives a new frame (or a view over existing ones) instead of
//! renaming columns in place.

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use log::debug;

use crate::{
    data::{Cell, to_cell},
    io_utils,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Frame {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(anyhow!(
                "Row {} has {} field(s) but the table has {} column(s)",
                idx + 1,
                row.len(),
                headers.len()
            ));
        }
        Ok(Self { headers, rows })
    }

    /// Builds a frame from string literals; empty strings become missing cells.
    pub fn from_strings(headers: &[&str], rows: &[&[&str]]) -> Result<Self> {
        Self::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|v| to_cell(v.to_string())).collect())
                .collect(),
        )
    }

    pub fn read_csv(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let headers = io_utils::reader_headers(&mut reader, encoding)
            .with_context(|| format!("Reading headers from {path:?}"))?;
        let mut rows = Vec::new();
        for (row_idx, record) in reader.byte_records().enumerate() {
            let record = record.with_context(|| format!("Reading row {} of {path:?}", row_idx + 2))?;
            if record.len() > headers.len() {
                return Err(anyhow!(
                    "Row {} of {path:?} has {} field(s) but the header has {}",
                    row_idx + 2,
                    record.len(),
                    headers.len()
                ));
            }
            let decoded = io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding row {} of {path:?}", row_idx + 2))?;
            let mut row = decoded.into_iter().map(to_cell).collect::<Vec<_>>();
            // Short rows are padded with missing cells.
            row.resize(headers.len(), None);
            rows.push(row);
        }
        debug!(
            "Loaded {} row(s) across {} column(s) from {:?}",
            rows.len(),
            headers.len(),
            path
        );
        Self::new(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
    }

    /// Value of the named column in `row`; absent columns read as missing.
    pub fn value(&self, row: usize, name: &str) -> Option<&str> {
        self.column_index(name).and_then(|idx| self.cell(row, idx))
    }

    /// Projects `(source, output)` column pairs into a new frame, in the given order.
    pub fn project(&self, columns: &[(String, String)]) -> Result<Self> {
        let indices = columns
            .iter()
            .map(|(source, _)| {
                self.column_index(source)
                    .ok_or_else(|| anyhow!("Column '{source}' not found in table"))
            })
            .collect::<Result<Vec<_>>>()?;
        let headers = columns.iter().map(|(_, output)| output.clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|idx| row[*idx].clone()).collect())
            .collect();
        Ok(Self { headers, rows })
    }

    /// Returns a copy with `transform` applied to every present cell of the named columns.
    pub fn map_columns<F>(&self, names: &[&str], transform: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        let targets = names
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect::<Vec<_>>();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(idx, cell)| match cell {
                        Some(value) if targets.contains(&idx) => Some(transform(value)),
                        other => other.clone(),
                    })
                    .collect()
            })
            .collect();
        Self {
            headers: self.headers.clone(),
            rows,
        }
    }

    /// Index of row positions grouped by a derived key; rows yielding no key are skipped.
    pub fn group_by<F>(&self, column: usize, key: F) -> HashMap<String, Vec<usize>>
    where
        F: Fn(&str) -> String,
    {
        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        for (row_idx, row) in self.rows.iter().enumerate() {
            if let Some(value) = row.get(column).and_then(|c| c.as_deref()) {
                groups.entry(key(value)).or_default().push(row_idx);
            }
        }
        groups
    }
}
