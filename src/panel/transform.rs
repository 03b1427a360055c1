//! Markov transform of dynamic panel columns.

use crate::graph::{lag_column, lead_column};
use crate::panel::frame::{ColumnData, Frame};
use crate::panel::DataError;
use std::collections::HashMap;
use tracing::debug;

/// Past, present and future views of a set of dynamic columns
///
/// All three share the row index of the input frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkovFrames {
    /// `{v}_tm{i}` for i in 1..=order, lag-major
    pub past: Frame,
    /// The input columns unchanged
    pub present: Frame,
    /// `{v}_tp{i}` for i in 1..=max_delta_t, horizon-major
    pub future: Frame,
}

/// Per-row position of each observation within its subject's timeline
struct SubjectTimeline<'a> {
    rows_by_subject: HashMap<&'a str, Vec<usize>>,
    position: Vec<usize>,
}

impl<'a> SubjectTimeline<'a> {
    fn new(frame: &'a Frame) -> Self {
        let mut rows_by_subject: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut position = Vec::with_capacity(frame.len());
        for (row, key) in frame.index().iter().enumerate() {
            let rows = rows_by_subject.entry(key.subject.as_str()).or_default();
            position.push(rows.len());
            rows.push(row);
        }
        SubjectTimeline {
            rows_by_subject,
            position,
        }
    }

    /// Row holding the same subject's observation `offset` steps away
    fn shifted(&self, frame: &Frame, row: usize, offset: i64) -> Option<usize> {
        let rows = self.rows_by_subject.get(frame.index()[row].subject.as_str())?;
        let target = self.position[row] as i64 + offset;
        usize::try_from(target).ok().and_then(|at| rows.get(at).copied())
    }
}

fn shifted_column(
    frame: &Frame,
    timeline: &SubjectTimeline<'_>,
    values: &[Option<f64>],
    offset: i64,
) -> ColumnData {
    ColumnData::Numeric(
        (0..frame.len())
            .map(|row| {
                timeline
                    .shifted(frame, row, offset)
                    .and_then(|source| values[source])
            })
            .collect(),
    )
}

/// Expands dynamic columns into lagged and led copies
///
/// Shifts are by observation position within each subject (rows must be
/// sorted by subject then time), so values never leak between subjects.
/// Positions that fall off either end of a subject's timeline are missing.
///
/// # Arguments
/// * `frame` - Numeric dynamic columns indexed by (subject, time)
/// * `order` - Number of past steps to expose
/// * `max_delta_t` - Number of future steps to expose
pub fn markov_transform(
    frame: &Frame,
    order: u32,
    max_delta_t: u32,
) -> Result<MarkovFrames, DataError> {
    let columns: Vec<(&str, &[Option<f64>])> = frame
        .column_names()
        .into_iter()
        .map(|name| frame.numeric(name).map(|values| (name, values)))
        .collect::<Result<_, _>>()?;

    let timeline = SubjectTimeline::new(frame);

    let mut past = Frame::new(frame.index().to_vec());
    for lag in 1..=order {
        for &(name, values) in &columns {
            past.push_column(
                lag_column(name, lag),
                shifted_column(frame, &timeline, values, -i64::from(lag)),
            )?;
        }
    }

    let mut future = Frame::new(frame.index().to_vec());
    for horizon in 1..=max_delta_t {
        for &(name, values) in &columns {
            future.push_column(
                lead_column(name, horizon),
                shifted_column(frame, &timeline, values, i64::from(horizon)),
            )?;
        }
    }

    debug!(
        variables = columns.len(),
        order,
        max_delta_t,
        past_columns = past.width(),
        future_columns = future.width(),
        "markov transform"
    );

    Ok(MarkovFrames {
        past,
        present: frame.clone(),
        future,
    })
}
