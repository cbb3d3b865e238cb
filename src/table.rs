// src/table.rs

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Write;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::Serialize;
use thiserror::Error;
use tracing::trace;

/// Separator for compound join keys. A unit separator never appears in the
/// archive's text fields, so compound keys cannot alias each other.
const KEY_SEPARATOR: &str = "\u{1f}";

/// A single typed cell. Flat files arrive as text; cells are upgraded to
/// numbers or dates only by the ingestion passes that know their meaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Num(f64),
    Date(NaiveDate),
    Null,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Num(n) => write!(f, "{}", n),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Null => Ok(()),
        }
    }
}

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("join key `{column}` missing from {side} table")]
    MissingKey { column: String, side: &'static str },
}

/// An in-memory tabular dataset: named columns plus one `Vec<Value>` per row.
/// Every row is padded or truncated to the header width at parse time, so
/// column indices are valid across all rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Parse delimited text (header row first) into a table of string cells.
    pub fn from_delimited(text: &str, delimiter: u8) -> Result<Table> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = rdr
            .headers()
            .context("reading header row")?
            .iter()
            .map(|h| h.to_string())
            .collect();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            bail!("table has no header row");
        }

        let mut rows = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let record =
                record.with_context(|| format!("parse error at data row {}", idx + 2))?;
            let mut row: Vec<Value> = record
                .iter()
                .map(|cell| Value::Str(cell.to_string()))
                .collect();
            row.resize(headers.len(), Value::Null);
            rows.push(row);
        }

        Ok(Table { headers, rows })
    }

    /// Index of the first column with this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Rename a column in place. Returns false when absent.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.headers[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Remove every named column, keeping row/column alignment intact.
    pub fn drop_columns(&mut self, names: &HashSet<String>) {
        let keep: Vec<usize> = (0..self.headers.len())
            .filter(|&i| !names.contains(&self.headers[i]))
            .collect();
        if keep.len() == self.headers.len() {
            return;
        }
        self.headers = keep.iter().map(|&i| self.headers[i].clone()).collect();
        for row in &mut self.rows {
            *row = keep
                .iter()
                .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
                .collect();
        }
    }

    /// Apply a string transform to every cell of one column.
    pub fn map_column(&mut self, name: &str, f: impl Fn(&str) -> String) {
        let Some(idx) = self.column_index(name) else {
            return;
        };
        for row in &mut self.rows {
            if let Some(Value::Str(s)) = row.get_mut(idx) {
                *s = f(s);
            }
        }
    }

    /// Write the table as comma-delimited text, nulls rendered as empty cells.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        wtr.write_record(&self.headers)
            .context("writing header row")?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|v| v.to_string()))
                .context("writing data row")?;
        }
        wtr.flush().context("flushing csv output")?;
        Ok(())
    }
}

/// Left-join `right` onto `left` over equally named key columns. Every left
/// row appears exactly once in the output: unmatched rows carry nulls for the
/// right-hand columns, and duplicate right-side keys keep their first row so
/// a join can never multiply left rows.
pub fn left_join(left: &Table, right: &Table, key_columns: &[String]) -> Result<Table, JoinError> {
    let left_keys = key_indices(left, key_columns, "left")?;
    let right_keys = key_indices(right, key_columns, "right")?;

    let carried: Vec<usize> = (0..right.headers.len())
        .filter(|i| !right_keys.contains(i))
        .collect();

    let mut lookup: HashMap<String, &Vec<Value>> = HashMap::with_capacity(right.rows.len());
    let mut duplicate_keys = 0usize;
    for row in &right.rows {
        lookup
            .entry(build_key(row, &right_keys))
            .and_modify(|_| duplicate_keys += 1)
            .or_insert(row);
    }
    if duplicate_keys > 0 {
        trace!(duplicate_keys, "right table repeats join keys; first row wins");
    }

    let mut headers = left.headers.clone();
    headers.extend(carried.iter().map(|&i| right.headers[i].clone()));

    let mut rows = Vec::with_capacity(left.rows.len());
    for row in &left.rows {
        let mut out = row.clone();
        match lookup.get(&build_key(row, &left_keys)) {
            Some(matched) => out.extend(
                carried
                    .iter()
                    .map(|&i| matched.get(i).cloned().unwrap_or(Value::Null)),
            ),
            None => out.extend(std::iter::repeat(Value::Null).take(carried.len())),
        }
        rows.push(out);
    }

    Ok(Table { headers, rows })
}

fn key_indices(
    table: &Table,
    key_columns: &[String],
    side: &'static str,
) -> Result<Vec<usize>, JoinError> {
    key_columns
        .iter()
        .map(|name| {
            table.column_index(name).ok_or_else(|| JoinError::MissingKey {
                column: name.clone(),
                side,
            })
        })
        .collect()
}

fn build_key(row: &[Value], indices: &[usize]) -> String {
    indices
        .iter()
        .map(|&i| row.get(i).map(|v| v.to_string()).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}
