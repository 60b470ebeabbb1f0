//! Dataset sources
//!
//! A source is a read-only collection of named tables. The bot only ever
//! asks for the list of names and for one table at a time.

use crate::data::table::{Cell, Table};
use crate::error::{FinbotError, Result};
use calamine::{Data, DataType, Reader, open_workbook_auto};
use std::path::{Path, PathBuf};

/// Read-only access to the datasets the bot can chart
pub trait DatasetSource: Send + Sync {
    /// Dataset identifiers in source order
    fn dataset_names(&self) -> Result<Vec<String>>;

    /// Load one dataset's table
    fn load(&self, name: &str) -> Result<Table>;
}

/// Every worksheet of a spreadsheet is one dataset
///
/// The file is reopened on each `load`, so edited figures show up
/// without restarting the bot.
#[derive(Debug, Clone)]
pub struct WorkbookSource {
    path: PathBuf,
}

impl WorkbookSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetSource for WorkbookSource {
    fn dataset_names(&self) -> Result<Vec<String>> {
        let workbook = open_workbook_auto(&self.path).map_err(|e| {
            FinbotError::Workbook(format!("cannot open {}: {e}", self.path.display()))
        })?;
        Ok(workbook.sheet_names())
    }

    fn load(&self, name: &str) -> Result<Table> {
        let mut workbook = open_workbook_auto(&self.path).map_err(|e| {
            FinbotError::Workbook(format!("cannot open {}: {e}", self.path.display()))
        })?;

        if !workbook.sheet_names().iter().any(|sheet| sheet == name) {
            return Err(FinbotError::UnknownDataset(name.to_string()));
        }

        let range = workbook.worksheet_range(name)?;
        let mut rows = range.rows();

        let headers = rows
            .next()
            .map(|header| header.iter().map(|data| to_cell(data).label()).collect())
            .unwrap_or_default();

        let rows = rows
            .filter(|row| row.iter().any(|data| !matches!(data, Data::Empty)))
            .map(|row| row.iter().map(to_cell).collect())
            .collect();

        tracing::debug!(dataset = name, path = %self.path.display(), "loaded worksheet");
        Ok(Table::new(headers, rows))
    }
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(_) | Data::DateTimeIso(_) => data
            .as_datetime()
            .map_or_else(|| Cell::Text(data.to_string()), Cell::Date),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}

/// Tables held in memory, in insertion order
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    datasets: Vec<(String, Table)>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dataset, replacing one with the same name
    pub fn with_dataset(mut self, name: impl Into<String>, table: Table) -> Self {
        let name = name.into();
        match self.datasets.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = table,
            None => self.datasets.push((name, table)),
        }
        self
    }
}

impl DatasetSource for InMemorySource {
    fn dataset_names(&self) -> Result<Vec<String>> {
        Ok(self.datasets.iter().map(|(name, _)| name.clone()).collect())
    }

    fn load(&self, name: &str) -> Result<Table> {
        self.datasets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, table)| table.clone())
            .ok_or_else(|| FinbotError::UnknownDataset(name.to_string()))
    }
}
