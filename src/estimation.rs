//! Causal Effect Estimation
//!
//! This module turns a grouped graph and an assembled panel into an
//! intervention x delay grid of expected responses. It holds:
//! - the regression seam (`Matrix`, `Regressor`) with a linear model and a
//!   random forest
//! - the effect query and its evenly spaced grid builder
//! - the plug-in estimator that fits one fresh model per grid cell
//! - the pipeline that runs transform, assembly and estimation end to end

pub mod estimator;
pub mod forest;
pub mod model;
pub mod pipeline;
pub mod query;

pub use estimator::{estimate_effect, EffectGrid};
pub use forest::{ForestSettings, RandomForest};
pub use model::{LinearRegression, Matrix, Regressor};
pub use pipeline::{compute_causal_effect, compute_causal_effect_with_roles};
pub use query::{intervention_grid, EffectQuery};

use crate::graph::GraphError;
use crate::panel::DataError;

/// Errors raised by regression models
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Least-squares solve produced no finite solution
    Singular,
    /// Shapes of features, targets or fitted coefficients disagree
    DimensionMismatch { expected: usize, found: usize },
    /// `predict` called before `fit`
    NotFitted,
    /// `fit` called with zero rows
    EmptyTraining,
    /// Failure reported by the model library
    Backend(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::Singular => write!(f, "Singular design matrix"),
            ModelError::DimensionMismatch { expected, found } => {
                write!(f, "Dimension mismatch: expected {}, found {}", expected, found)
            }
            ModelError::NotFitted => write!(f, "Model has not been fitted"),
            ModelError::EmptyTraining => write!(f, "Cannot fit a model on zero rows"),
            ModelError::Backend(msg) => write!(f, "Model backend failed: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

/// Errors raised while estimating a causal effect
#[derive(Debug, Clone, PartialEq)]
pub enum EstimationError {
    Graph(GraphError),
    Data(DataError),
    Model(ModelError),
    /// Cause variable is not in the graph
    UnknownCause(String),
    /// Malformed request (empty grid, bad ranges, order below max lag)
    InvalidQuery(String),
}

impl std::fmt::Display for EstimationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimationError::Graph(err) => write!(f, "Graph error: {}", err),
            EstimationError::Data(err) => write!(f, "Data error: {}", err),
            EstimationError::Model(err) => write!(f, "Model error: {}", err),
            EstimationError::UnknownCause(name) => {
                write!(f, "Cause variable not found in graph: {}", name)
            }
            EstimationError::InvalidQuery(msg) => write!(f, "Invalid query: {}", msg),
        }
    }
}

impl std::error::Error for EstimationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EstimationError::Graph(err) => Some(err),
            EstimationError::Data(err) => Some(err),
            EstimationError::Model(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GraphError> for EstimationError {
    fn from(err: GraphError) -> Self {
        EstimationError::Graph(err)
    }
}

impl From<DataError> for EstimationError {
    fn from(err: DataError) -> Self {
        EstimationError::Data(err)
    }
}

impl From<ModelError> for EstimationError {
    fn from(err: ModelError) -> Self {
        EstimationError::Model(err)
    }
}

/// Which regressor a causal effect run fits per grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Linear,
    RandomForest,
}

impl std::str::FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(ModelKind::Linear),
            "random_forest" | "forest" => Ok(ModelKind::RandomForest),
            other => Err(format!("Unknown model: {}", other)),
        }
    }
}

/// Tuning knobs for a causal effect run
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationConfig {
    /// Regressor fitted per grid cell
    pub model: ModelKind,
    /// Ridge penalty of the linear model, on standardized features
    pub ridge: f64,
    /// Hyperparameters of the random forest
    pub forest: ForestSettings,
    /// Evaluate grid cells on the rayon pool
    pub parallel: bool,
    /// Dummy-encode categorical static parents in the feature table
    pub dummies_for_categorical: bool,
    /// Markov order override; defaults to the graph's maximum lag
    pub markov_order: Option<u32>,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        EstimationConfig {
            model: ModelKind::RandomForest,
            ridge: 1e-6,
            forest: ForestSettings::default(),
            parallel: true,
            dummies_for_categorical: true,
            markov_order: None,
        }
    }
}

/// A regressor chosen at runtime by `ModelKind`
#[derive(Debug)]
pub enum ConfiguredModel {
    Linear(LinearRegression),
    RandomForest(RandomForest),
}

impl Regressor for ConfiguredModel {
    fn fit(&mut self, features: &Matrix, target: &[f64]) -> Result<(), ModelError> {
        match self {
            ConfiguredModel::Linear(model) => model.fit(features, target),
            ConfiguredModel::RandomForest(model) => model.fit(features, target),
        }
    }

    fn predict(&self, features: &Matrix) -> Result<Vec<f64>, ModelError> {
        match self {
            ConfiguredModel::Linear(model) => model.predict(features),
            ConfiguredModel::RandomForest(model) => model.predict(features),
        }
    }
}

impl EstimationConfig {
    /// Linear model factory using this config's ridge penalty
    pub fn linear_model(&self) -> impl Fn() -> LinearRegression + Sync {
        let ridge = self.ridge;
        move || LinearRegression::with_ridge(ridge)
    }

    /// Factory for the configured model kind
    pub fn model_factory(&self) -> impl Fn() -> ConfiguredModel + Sync {
        let kind = self.model;
        let ridge = self.ridge;
        let forest = self.forest.clone();
        move || match kind {
            ModelKind::Linear => ConfiguredModel::Linear(LinearRegression::with_ridge(ridge)),
            ModelKind::RandomForest => {
                ConfiguredModel::RandomForest(RandomForest::with_settings(forest.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_errors_convert_and_chain() {
        let err: EstimationError = DataError::NoCompleteRows.into();
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("Data error"));

        let err: EstimationError = GraphError::UnknownVariable("dose".to_string()).into();
        assert_eq!(
            err,
            EstimationError::Graph(GraphError::UnknownVariable("dose".to_string()))
        );

        let err = EstimationError::UnknownCause("dose".to_string());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_default_config() {
        let config = EstimationConfig::default();
        assert!(config.parallel);
        assert!(config.dummies_for_categorical);
        assert_eq!(config.markov_order, None);
        assert!(config.ridge > 0.0);
        assert_eq!(config.model, ModelKind::RandomForest);
    }

    #[test]
    fn test_model_factory_follows_kind() {
        let mut config = EstimationConfig::default();
        assert!(matches!(
            (config.model_factory())(),
            ConfiguredModel::RandomForest(_)
        ));

        config.model = ModelKind::Linear;
        let mut model = (config.model_factory())();
        assert!(matches!(model, ConfiguredModel::Linear(_)));

        let features = Matrix::from_columns(3, &[vec![0.0, 1.0, 2.0]]).unwrap();
        model.fit(&features, &[1.0, 3.0, 5.0]).unwrap();
        let predictions = model.predict(&features).unwrap();
        assert!((predictions[2] - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_model_kind_parses_names() {
        assert_eq!("linear".parse::<ModelKind>(), Ok(ModelKind::Linear));
        assert_eq!("Random_Forest".parse::<ModelKind>(), Ok(ModelKind::RandomForest));
        assert!("boosting".parse::<ModelKind>().is_err());
    }
}
