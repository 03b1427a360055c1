//! Random forest regressor backed by smartcore.

use crate::estimation::model::{Matrix, Regressor};
use crate::estimation::ModelError;
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

type FittedForest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Forest hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct ForestSettings {
    pub n_trees: usize,
    /// Unlimited when `None`
    pub max_depth: Option<u16>,
    pub min_samples_leaf: usize,
    /// Bootstrap seed; a fixed seed makes every fit reproducible
    pub seed: u64,
}

impl Default for ForestSettings {
    fn default() -> Self {
        ForestSettings {
            n_trees: 100,
            max_depth: None,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

/// Bagged regression trees; every split considers all features
pub struct RandomForest {
    settings: ForestSettings,
    fitted: Option<FittedForest>,
}

impl RandomForest {
    pub fn new() -> Self {
        Self::with_settings(ForestSettings::default())
    }

    pub fn with_settings(settings: ForestSettings) -> Self {
        RandomForest {
            settings,
            fitted: None,
        }
    }

    pub fn settings(&self) -> &ForestSettings {
        &self.settings
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn parameters(&self, features: usize) -> RandomForestRegressorParameters {
        let parameters = RandomForestRegressorParameters::default()
            .with_n_trees(self.settings.n_trees)
            .with_min_samples_leaf(self.settings.min_samples_leaf)
            .with_m(features)
            .with_seed(self.settings.seed);
        match self.settings.max_depth {
            Some(depth) => parameters.with_max_depth(depth),
            None => parameters,
        }
    }
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RandomForest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomForest")
            .field("settings", &self.settings)
            .field("fitted", &self.is_fitted())
            .finish()
    }
}

fn dense(features: &Matrix) -> DenseMatrix<f64> {
    let inner = features.as_dmatrix();
    DenseMatrix::new(inner.nrows(), inner.ncols(), inner.as_slice().to_vec(), true)
}

impl Regressor for RandomForest {
    fn fit(&mut self, features: &Matrix, target: &[f64]) -> Result<(), ModelError> {
        if features.rows() == 0 {
            return Err(ModelError::EmptyTraining);
        }
        if target.len() != features.rows() {
            return Err(ModelError::DimensionMismatch {
                expected: features.rows(),
                found: target.len(),
            });
        }
        if features.cols() == 0 {
            return Err(ModelError::DimensionMismatch {
                expected: 1,
                found: 0,
            });
        }

        let forest = FittedForest::fit(
            &dense(features),
            &target.to_vec(),
            self.parameters(features.cols()),
        )
        .map_err(|err| ModelError::Backend(err.to_string()))?;
        self.fitted = Some(forest);
        Ok(())
    }

    fn predict(&self, features: &Matrix) -> Result<Vec<f64>, ModelError> {
        let forest = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;
        forest
            .predict(&dense(features))
            .map_err(|err| ModelError::Backend(err.to_string()))
    }
}
