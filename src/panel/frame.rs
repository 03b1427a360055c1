//! Column-oriented table keyed by (subject, time).

use crate::panel::DataError;
use ordered_float::OrderedFloat;
use std::collections::{BTreeSet, HashMap};

/// Row key of a panel table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey {
    pub subject: String,
    pub time: OrderedFloat<f64>,
}

impl RowKey {
    pub fn new(subject: impl Into<String>, time: f64) -> Self {
        RowKey {
            subject: subject.into(),
            time: OrderedFloat(time),
        }
    }
}

/// Cell storage of one column; `None` marks a missing value
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Categorical(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Numeric(values) => values[row].is_none(),
            ColumnData::Categorical(values) => values[row].is_none(),
        }
    }

    fn take(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(values) => {
                ColumnData::Numeric(rows.iter().map(|&row| values[row]).collect())
            }
            ColumnData::Categorical(values) => {
                ColumnData::Categorical(rows.iter().map(|&row| values[row].clone()).collect())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// Table of named columns sharing one row index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    index: Vec<RowKey>,
    columns: Vec<Column>,
    lookup: HashMap<String, usize>,
}

impl Frame {
    /// Creates a frame with the given rows and no columns
    pub fn new(index: Vec<RowKey>) -> Self {
        Frame {
            index,
            columns: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Appends a column; its length must match the index
    pub fn push_column(&mut self, name: impl Into<String>, data: ColumnData) -> Result<(), DataError> {
        let name = name.into();
        if data.len() != self.index.len() {
            return Err(DataError::LengthMismatch {
                expected: self.index.len(),
                found: data.len(),
            });
        }
        if self.lookup.contains_key(&name) {
            return Err(DataError::DuplicateColumn(name));
        }
        self.lookup.insert(name.clone(), self.columns.len());
        self.columns.push(Column { name, data });
        Ok(())
    }

    pub fn index(&self) -> &[RowKey] {
        &self.index
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.lookup.get(name).map(|&position| &self.columns[position])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// Numeric values of a column
    pub fn numeric(&self, name: &str) -> Result<&[Option<f64>], DataError> {
        let column = self
            .column(name)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))?;
        match &column.data {
            ColumnData::Numeric(values) => Ok(values),
            ColumnData::Categorical(_) => Err(DataError::NonNumeric(name.to_string())),
        }
    }

    /// New frame with only the named columns, in the requested order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Frame, DataError> {
        let mut selected = Frame::new(self.index.clone());
        for name in names {
            let name = name.as_ref();
            let column = self
                .column(name)
                .ok_or_else(|| DataError::MissingColumn(name.to_string()))?;
            selected.push_column(name, column.data.clone())?;
        }
        Ok(selected)
    }

    /// New frame with only the given rows, in the given order
    pub fn take_rows(&self, rows: &[usize]) -> Frame {
        let mut taken = Frame::new(rows.iter().map(|&row| self.index[row].clone()).collect());
        taken.lookup = self.lookup.clone();
        taken.columns = self
            .columns
            .iter()
            .map(|column| Column {
                name: column.name.clone(),
                data: column.data.take(rows),
            })
            .collect();
        taken
    }

    /// Side-by-side concatenation of frames over the same index
    pub fn hconcat(frames: &[&Frame]) -> Result<Frame, DataError> {
        let Some(first) = frames.first() else {
            return Ok(Frame::default());
        };
        let mut combined = Frame::new(first.index.clone());
        for frame in frames {
            if frame.index != combined.index {
                return Err(DataError::LengthMismatch {
                    expected: combined.len(),
                    found: frame.len(),
                });
            }
            for column in &frame.columns {
                combined.push_column(column.name.clone(), column.data.clone())?;
            }
        }
        Ok(combined)
    }

    /// Whether every column of `row` holds a value
    pub fn is_complete_row(&self, row: usize) -> bool {
        self.columns.iter().all(|column| !column.data.is_missing(row))
    }

    /// Rows with no missing cell
    pub fn complete_rows(&self) -> Vec<usize> {
        (0..self.len()).filter(|&row| self.is_complete_row(row)).collect()
    }

    /// Dummy-encodes categorical columns
    ///
    /// Numeric columns pass through. A categorical column `c` becomes one
    /// 0/1 column `c_<level>` per distinct level, levels in sorted order; a
    /// missing cell is 0 in every indicator.
    pub fn one_hot(&self) -> Frame {
        let mut encoded = Frame::new(self.index.clone());
        for column in &self.columns {
            match &column.data {
                ColumnData::Numeric(_) => {
                    encoded.columns.push(column.clone());
                }
                ColumnData::Categorical(values) => {
                    let levels: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
                    for level in levels {
                        let indicator = values
                            .iter()
                            .map(|value| Some(if value.as_deref() == Some(level) { 1.0 } else { 0.0 }))
                            .collect();
                        encoded.columns.push(Column {
                            name: format!("{}_{}", column.name, level),
                            data: ColumnData::Numeric(indicator),
                        });
                    }
                }
            }
        }
        encoded.lookup = encoded
            .columns
            .iter()
            .enumerate()
            .map(|(position, column)| (column.name.clone(), position))
            .collect();
        encoded
    }
}
