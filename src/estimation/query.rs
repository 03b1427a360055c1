//! Effect queries and the intervention grid.

use crate::estimation::EstimationError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_INTERVENTION: f64 = 0.0;
pub const DEFAULT_MAX_INTERVENTION: f64 = 5.0;
pub const DEFAULT_GRID_POINTS: usize = 11;
pub const DEFAULT_MIN_DELTA_T: u32 = 1;
pub const DEFAULT_MAX_DELTA_T: u32 = 10;

/// Which effect to estimate and over which grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectQuery {
    pub cause: String,
    pub response: String,
    /// Delays in time steps, one grid column each
    pub delays: Vec<u32>,
    /// Values the cause is fixed at, one grid row each
    pub interventions: Vec<f64>,
}

impl EffectQuery {
    pub fn new(
        cause: impl Into<String>,
        response: impl Into<String>,
        delays: Vec<u32>,
        interventions: Vec<f64>,
    ) -> Self {
        EffectQuery {
            cause: cause.into(),
            response: response.into(),
            delays,
            interventions,
        }
    }

    /// Builds a query from inclusive ranges
    ///
    /// # Arguments
    /// * `n_gridpts` - Number of evenly spaced intervention levels
    /// * `min_delta_t`, `max_delta_t` - Inclusive delay range
    ///
    /// # Returns
    /// A validated query; intervention levels are rounded to one decimal
    #[allow(clippy::too_many_arguments)]
    pub fn from_ranges(
        cause: impl Into<String>,
        response: impl Into<String>,
        min_intervention: f64,
        max_intervention: f64,
        n_gridpts: usize,
        min_delta_t: u32,
        max_delta_t: u32,
    ) -> Result<Self, EstimationError> {
        if min_intervention.is_nan() || max_intervention.is_nan() || min_intervention > max_intervention {
            return Err(EstimationError::InvalidQuery(format!(
                "min_intervention ({}) must not exceed max_intervention ({})",
                min_intervention, max_intervention
            )));
        }
        if min_delta_t > max_delta_t {
            return Err(EstimationError::InvalidQuery(format!(
                "min_delta_t ({}) must not exceed max_delta_t ({})",
                min_delta_t, max_delta_t
            )));
        }
        if n_gridpts == 0 {
            return Err(EstimationError::InvalidQuery(
                "n_gridpts_intervention must be at least 1".to_string(),
            ));
        }

        let query = EffectQuery::new(
            cause,
            response,
            (min_delta_t..=max_delta_t).collect(),
            intervention_grid(min_intervention, max_intervention, n_gridpts),
        );
        query.validate()?;
        Ok(query)
    }

    /// Checks the grid is non-empty and every delay looks forward
    pub fn validate(&self) -> Result<(), EstimationError> {
        if self.delays.is_empty() {
            return Err(EstimationError::InvalidQuery(
                "at least one delay is required".to_string(),
            ));
        }
        if self.delays.iter().any(|&delay| delay == 0) {
            return Err(EstimationError::InvalidQuery(
                "delays must be at least 1".to_string(),
            ));
        }
        if self.interventions.is_empty() {
            return Err(EstimationError::InvalidQuery(
                "at least one intervention level is required".to_string(),
            ));
        }
        if self.interventions.iter().any(|level| !level.is_finite()) {
            return Err(EstimationError::InvalidQuery(
                "intervention levels must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Longest delay, which sets how far the panel is led
    pub fn max_delay(&self) -> u32 {
        self.delays.iter().copied().max().unwrap_or(0)
    }
}

/// `n` evenly spaced values from `min` to `max` inclusive, rounded to one decimal
pub fn intervention_grid(min: f64, max: f64, n: usize) -> Vec<f64> {
    let round = |value: f64| (value * 10.0).round() / 10.0;
    match n {
        0 => Vec::new(),
        1 => vec![round(min)],
        _ => {
            let step = (max - min) / (n - 1) as f64;
            (0..n).map(|k| round(min + step * k as f64)).collect()
        }
    }
}
