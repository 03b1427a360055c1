//! Plug-in estimator of interventional expectations.

use crate::estimation::model::{Matrix, Regressor};
use crate::estimation::query::EffectQuery;
use crate::estimation::{EstimationConfig, EstimationError};
use crate::graph::{lead_column, Dynamism, GroupedGraph};
use crate::panel::{DataDict, DataError, Frame};
use rayon::prelude::*;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, warn};

/// Expected response for every (intervention, delay) pair
///
/// `effect[i][j]` is the mean prediction with the cause fixed at
/// `interventions[i]`, observed `delays[j]` steps later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectGrid {
    #[serde(rename = "intervention")]
    pub interventions: Vec<f64>,
    #[serde(rename = "delta_t")]
    pub delays: Vec<u32>,
    #[serde(rename = "causal_effects", serialize_with = "serialize_finite")]
    pub effect: Vec<Vec<f64>>,
}

impl EffectGrid {
    /// (interventions, delays)
    pub fn shape(&self) -> (usize, usize) {
        (self.interventions.len(), self.delays.len())
    }

    pub fn get(&self, intervention: usize, delay: usize) -> Option<f64> {
        self.effect.get(intervention)?.get(delay).copied()
    }
}

/// JSON has no NaN or infinity; such cells are written as 0.0
fn serialize_finite<S: Serializer>(effect: &[Vec<f64>], serializer: S) -> Result<S::Ok, S::Error> {
    let finite: Vec<Vec<f64>> = effect
        .iter()
        .map(|row| {
            row.iter()
                .map(|&value| if value.is_finite() { value } else { 0.0 })
                .collect()
        })
        .collect();
    finite.serialize(serializer)
}

/// Feature table with the cause's present value as the last column
#[derive(Debug)]
struct Design {
    features: Matrix,
    names: Vec<String>,
}

impl Design {
    fn cause_column(&self) -> usize {
        self.features.cols() - 1
    }
}

fn dense(frame: &Frame, name: &str) -> Result<Vec<f64>, DataError> {
    frame
        .numeric(name)?
        .iter()
        .map(|value| {
            value.ok_or_else(|| DataError::InvalidValue(format!("missing value in {}", name)))
        })
        .collect()
}

fn build_design(
    data: &DataDict,
    graph: &GroupedGraph,
    cause_name: &str,
    dummies_for_categorical: bool,
) -> Result<Design, EstimationError> {
    let cause = graph
        .get_variable(cause_name)
        .ok_or_else(|| EstimationError::UnknownCause(cause_name.to_string()))?;

    let mut static_parents = Vec::new();
    let mut lagged = Vec::new();
    for parent in graph.variable_parents(cause)? {
        match graph.dynamism_of(parent)? {
            Dynamism::Static => static_parents.push(parent.name().to_string()),
            Dynamism::Dynamic => lagged.extend(graph.temporal_lag_names(parent, cause)?),
        }
    }

    let mut names = Vec::new();
    let mut columns = Vec::new();
    for name in &lagged {
        columns.push(dense(&data.past, name)?);
        names.push(name.clone());
    }

    match &data.statics {
        Some(statics) => {
            let selected = statics.select(&static_parents)?;
            let selected = if dummies_for_categorical {
                selected.one_hot()
            } else {
                selected
            };
            for name in selected.column_names() {
                columns.push(dense(&selected, name)?);
                names.push(name.to_string());
            }
        }
        None if !static_parents.is_empty() => {
            warn!(
                cause = cause_name,
                parents = ?static_parents,
                "static parents not conditioned on: no static data"
            );
        }
        None => {}
    }

    columns.push(dense(&data.present, cause_name)?);
    names.push(cause_name.to_string());

    let features = Matrix::from_columns(data.len(), &columns)?;
    Ok(Design { features, names })
}

/// Estimates the causal effect of `query.cause` on `query.response`
///
/// Conditions on the cause's graph parents: lagged copies of dynamic parents
/// and (optionally dummy-encoded) static parents. Each grid cell fits a fresh
/// model from `factory` on the observed features, then predicts with the
/// cause column overwritten by the intervention level and averages.
///
/// # Arguments
/// * `data` - Complete-case aligned frames
/// * `graph` - Graph supplying parents and lags
/// * `query` - Cause, response, delays and intervention levels
/// * `factory` - Builds an unfitted model per cell
/// * `config` - Parallelism and dummy-encoding switches
pub fn estimate_effect<R, F>(
    data: &DataDict,
    graph: &GroupedGraph,
    query: &EffectQuery,
    factory: F,
    config: &EstimationConfig,
) -> Result<EffectGrid, EstimationError>
where
    R: Regressor,
    F: Fn() -> R + Sync,
{
    query.validate()?;
    let design = build_design(data, graph, &query.cause, config.dummies_for_categorical)?;
    debug!(cause = %query.cause, features = ?design.names, "built design matrix");

    let targets: Vec<Vec<f64>> = query
        .delays
        .iter()
        .map(|&delay| dense(&data.future, &lead_column(&query.response, delay)))
        .collect::<Result<_, _>>()?;

    let cells: Vec<(usize, usize)> = (0..query.interventions.len())
        .flat_map(|i| (0..query.delays.len()).map(move |j| (i, j)))
        .collect();

    let cause_column = design.cause_column();
    let evaluate = |&(i, j): &(usize, usize)| -> Result<f64, EstimationError> {
        let mut model = factory();
        model.fit(&design.features, &targets[j])?;
        let counterfactual = design
            .features
            .with_column_replaced(cause_column, query.interventions[i])?;
        let predictions = model.predict(&counterfactual)?;
        let effect = predictions.iter().sum::<f64>() / predictions.len() as f64;
        debug!(
            intervention = query.interventions[i],
            delay = query.delays[j],
            effect,
            "evaluated grid cell"
        );
        Ok(effect)
    };

    let values: Vec<f64> = if config.parallel {
        cells.par_iter().map(evaluate).collect::<Result<_, _>>()?
    } else {
        cells.iter().map(evaluate).collect::<Result<_, _>>()?
    };

    let effect: Vec<Vec<f64>> = values
        .chunks(query.delays.len())
        .map(<[f64]>::to_vec)
        .collect();

    info!(
        cause = %query.cause,
        response = %query.response,
        rows = data.len(),
        features = design.names.len(),
        cells = cells.len(),
        "estimated causal effect grid"
    );

    Ok(EffectGrid {
        interventions: query.interventions.clone(),
        delays: query.delays.clone(),
        effect,
    })
}
