//! Long-format panel dataset and its CSV loader.

use crate::panel::frame::{ColumnData, Frame, RowKey};
use crate::panel::DataError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::io::Read;
use tracing::{debug, info};

/// Cell values read as missing
const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Names of the index columns in an incoming table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSchema {
    pub subject_column: String,
    pub time_column: String,
}

impl Default for PanelSchema {
    fn default() -> Self {
        PanelSchema {
            subject_column: "subject_id".to_string(),
            time_column: "time".to_string(),
        }
    }
}

impl PanelSchema {
    pub fn new(subject_column: impl Into<String>, time_column: impl Into<String>) -> Self {
        PanelSchema {
            subject_column: subject_column.into(),
            time_column: time_column.into(),
        }
    }
}

/// Panel table indexed by (subject, time)
///
/// Rows are kept sorted by subject, then time, and each (subject, time) pair
/// appears at most once. Every non-index column is a variable.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelDataset {
    frame: Frame,
}

impl PanelDataset {
    /// Wraps a frame, sorting its rows and rejecting duplicate keys
    pub fn from_frame(frame: Frame) -> Result<Self, DataError> {
        let mut order: Vec<usize> = (0..frame.len()).collect();
        order.sort_by(|&a, &b| frame.index()[a].cmp(&frame.index()[b]));

        for pair in order.windows(2) {
            let key = &frame.index()[pair[1]];
            if frame.index()[pair[0]] == *key {
                return Err(DataError::DuplicateRow {
                    subject: key.subject.clone(),
                    time: key.time.into_inner(),
                });
            }
        }

        let already_sorted = order.iter().enumerate().all(|(i, &row)| i == row);
        let frame = if already_sorted {
            frame
        } else {
            frame.take_rows(&order)
        };
        Ok(PanelDataset { frame })
    }

    /// Builds a dataset from an index and named columns
    pub fn from_columns(
        index: Vec<RowKey>,
        columns: Vec<(String, ColumnData)>,
    ) -> Result<Self, DataError> {
        let mut frame = Frame::new(index);
        for (name, data) in columns {
            frame.push_column(name, data)?;
        }
        Self::from_frame(frame)
    }

    /// Reads a long-format CSV table
    ///
    /// # Arguments
    /// * `reader` - CSV source with a header row
    /// * `schema` - Names of the subject and time columns
    ///
    /// # Returns
    /// The sorted dataset. A column is numeric when every non-missing cell
    /// parses as a number, and categorical otherwise. Time cells may be
    /// numbers or ISO-8601 dates/datetimes (read as epoch seconds).
    pub fn from_csv_reader<R: Read>(reader: R, schema: &PanelSchema) -> Result<Self, DataError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let position = |name: &str| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| DataError::MissingColumn(name.to_string()))
        };
        let subject_at = position(&schema.subject_column)?;
        let time_at = position(&schema.time_column)?;

        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(DataError::DuplicateColumn(header.clone()));
            }
        }

        let variable_positions: Vec<usize> = (0..headers.len())
            .filter(|&i| i != subject_at && i != time_at)
            .collect();

        let mut index = Vec::new();
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); variable_positions.len()];

        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            let subject = record
                .get(subject_at)
                .filter(|value| !is_missing(value))
                .ok_or_else(|| {
                    DataError::InvalidValue(format!("row {} has no subject", line + 1))
                })?;
            let time = record
                .get(time_at)
                .ok_or_else(|| DataError::InvalidValue(format!("row {} has no time", line + 1)))
                .and_then(parse_time)?;
            index.push(RowKey::new(subject, time));

            for (slot, &at) in variable_positions.iter().enumerate() {
                let cell = record
                    .get(at)
                    .filter(|value| !is_missing(value))
                    .map(str::to_string);
                cells[slot].push(cell);
            }
        }

        let mut frame = Frame::new(index);
        for (slot, values) in cells.into_iter().enumerate() {
            let name = &headers[variable_positions[slot]];
            let data = infer_column(values);
            debug!(column = %name, numeric = matches!(data, ColumnData::Numeric(_)), "loaded column");
            frame.push_column(name.clone(), data)?;
        }

        let dataset = Self::from_frame(frame)?;
        info!(
            rows = dataset.len(),
            subjects = dataset.subject_count(),
            variables = dataset.frame.width(),
            "loaded panel dataset"
        );
        Ok(dataset)
    }

    /// Reads a CSV table held in memory
    pub fn from_csv_str(text: &str, schema: &PanelSchema) -> Result<Self, DataError> {
        Self::from_csv_reader(text.as_bytes(), schema)
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Names of the non-index columns
    pub fn variables(&self) -> Vec<String> {
        self.frame
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Number of distinct subjects
    pub fn subject_count(&self) -> usize {
        // rows are sorted, so subjects are contiguous
        let index = self.frame.index();
        let changes = index
            .windows(2)
            .filter(|pair| pair[0].subject != pair[1].subject)
            .count();
        if index.is_empty() {
            0
        } else {
            changes + 1
        }
    }

    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Frame, DataError> {
        self.frame.select(names)
    }
}

fn is_missing(value: &str) -> bool {
    MISSING_TOKENS.contains(&value)
}

fn infer_column(values: Vec<Option<String>>) -> ColumnData {
    let parsed: Option<Vec<Option<f64>>> = values
        .iter()
        .map(|value| match value {
            None => Some(None),
            Some(text) => text.parse::<f64>().ok().map(Some),
        })
        .collect();
    match parsed {
        Some(numbers) => ColumnData::Numeric(numbers),
        None => ColumnData::Categorical(values),
    }
}

/// Parses a time cell into a sortable number
fn parse_time(value: &str) -> Result<f64, DataError> {
    if is_missing(value) {
        return Err(DataError::InvalidValue("missing time value".to_string()));
    }
    if let Ok(number) = value.parse::<f64>() {
        return Ok(number);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.timestamp() as f64);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc().timestamp() as f64);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc().timestamp() as f64);
        }
    }
    Err(DataError::InvalidValue(format!("unrecognised time: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
subject_id,time,age,sex,dose
p2,1,50,m,2.0
p1,1,30,f,1.0
p1,0,30,f,
p2,0,50,m,NA
";

    #[test]
    fn test_csv_rows_are_sorted_by_subject_then_time() {
        let panel = PanelDataset::from_csv_str(CSV, &PanelSchema::default()).unwrap();
        let keys: Vec<(String, f64)> = panel
            .frame()
            .index()
            .iter()
            .map(|key| (key.subject.clone(), key.time.into_inner()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("p1".to_string(), 0.0),
                ("p1".to_string(), 1.0),
                ("p2".to_string(), 0.0),
                ("p2".to_string(), 1.0),
            ]
        );
        assert_eq!(panel.subject_count(), 2);
    }

    #[test]
    fn test_column_types_and_missing_values() {
        let panel = PanelDataset::from_csv_str(CSV, &PanelSchema::default()).unwrap();
        assert_eq!(panel.variables(), vec!["age", "sex", "dose"]);
        assert_eq!(
            panel.frame().numeric("dose").unwrap(),
            &[None, Some(1.0), None, Some(2.0)]
        );
        assert!(matches!(
            panel.frame().column("sex").unwrap().data,
            ColumnData::Categorical(_)
        ));
    }

    #[test]
    fn test_custom_schema_and_missing_index_column() {
        let csv = "patient,visit,x\na,1,0.5\n";
        let schema = PanelSchema::new("patient", "visit");
        let panel = PanelDataset::from_csv_str(csv, &schema).unwrap();
        assert_eq!(panel.variables(), vec!["x"]);

        let err = PanelDataset::from_csv_str(csv, &PanelSchema::default()).unwrap_err();
        assert_eq!(err, DataError::MissingColumn("subject_id".to_string()));
    }

    #[test]
    fn test_duplicate_observation_is_rejected() {
        let csv = "subject_id,time,x\na,1,0.5\na,1,0.7\n";
        let err = PanelDataset::from_csv_str(csv, &PanelSchema::default()).unwrap_err();
        assert_eq!(
            err,
            DataError::DuplicateRow {
                subject: "a".to_string(),
                time: 1.0
            }
        );
    }

    #[test]
    fn test_dates_are_read_as_epoch_seconds() {
        let csv = "subject_id,time,x\na,2024-01-02,1\na,2024-01-01,2\n";
        let panel = PanelDataset::from_csv_str(csv, &PanelSchema::default()).unwrap();
        let first = panel.frame().index()[0].time.into_inner();
        let second = panel.frame().index()[1].time.into_inner();
        assert_eq!(second - first, 86_400.0);
        assert_eq!(panel.frame().numeric("x").unwrap(), &[Some(2.0), Some(1.0)]);
    }

    #[test]
    fn test_unparseable_time_is_invalid() {
        let csv = "subject_id,time,x\na,yesterday,1\n";
        let err = PanelDataset::from_csv_str(csv, &PanelSchema::default()).unwrap_err();
        assert!(matches!(err, DataError::InvalidValue(_)));
    }
}
