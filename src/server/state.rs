//! Shared application state for the API server

use crate::estimation::EstimationConfig;
use crate::panel::PanelSchema;
use crate::store::SqliteStore;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Graph and dataset store
    /// Wrapped in Mutex because SQLite connections are not thread-safe
    pub store: Arc<Mutex<SqliteStore>>,
    /// Index column names of uploaded datasets
    pub schema: PanelSchema,
    /// Settings for every causal effect request
    pub estimation: EstimationConfig,
}

impl AppState {
    /// Creates state with the default schema and estimation settings
    pub fn new(store: SqliteStore) -> Self {
        Self::with_config(store, PanelSchema::default(), EstimationConfig::default())
    }

    pub fn with_config(store: SqliteStore, schema: PanelSchema, estimation: EstimationConfig) -> Self {
        AppState {
            store: Arc::new(Mutex::new(store)),
            schema,
            estimation,
        }
    }
}
