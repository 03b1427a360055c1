//! REST API server for dataset upload, graph upload and effect estimation

mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use handlers::{CausalEffectParams, GraphSummary, GraphVariablesResponse, VariablesResponse};
pub use routes::create_router;
pub use state::AppState;

use crate::estimation::{EstimationConfig, ModelKind};
use crate::panel::PanelSchema;
use crate::store::SqliteStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Server host address (default: "127.0.0.1")
    pub host: String,
    /// Server port (default: 8000)
    pub port: u16,
    /// Path to SQLite database
    pub database_path: String,
    /// Regressor fitted for causal effect requests (default: random forest)
    pub model: ModelKind,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            database_path: "causal_panel.db".to_string(),
            model: ModelKind::RandomForest,
        }
    }
}

impl ServerConfig {
    /// Creates a new server configuration
    pub fn new(host: impl Into<String>, port: u16, database_path: impl Into<String>) -> Self {
        ServerConfig {
            host: host.into(),
            port,
            database_path: database_path.into(),
            model: ModelKind::RandomForest,
        }
    }

    /// Reads `HOST`, `PORT`, `DATABASE_PATH` and `MODEL`, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = ServerConfig::default();
        let host = std::env::var("HOST").unwrap_or(defaults.host);
        let port = std::env::var("PORT")
            .ok()
            .and_then(|port| port.parse::<u16>().ok())
            .unwrap_or(defaults.port);
        let database_path = std::env::var("DATABASE_PATH").unwrap_or(defaults.database_path);
        let model = std::env::var("MODEL")
            .ok()
            .and_then(|model| model.parse::<ModelKind>().ok())
            .unwrap_or(defaults.model);
        ServerConfig {
            model,
            ..ServerConfig::new(host, port, database_path)
        }
    }
}

/// Runs the API server
///
/// # Arguments
/// * `config` - Server configuration
///
/// # Returns
/// Returns an error if the server fails to start or encounters a fatal error
///
/// # Example
/// ```rust,no_run
/// use causal_panel::server::{run_server, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServerConfig::default();
///     run_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG controls verbosity; info by default
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let store = SqliteStore::new(&config.database_path)?;
    let estimation = EstimationConfig {
        model: config.model,
        ..EstimationConfig::default()
    };
    let state = Arc::new(AppState::with_config(store, PanelSchema::default(), estimation));
    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8000);
        assert_eq!(
            ServerConfig::new("0.0.0.0", 9000, "x.db"),
            ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 9000,
                database_path: "x.db".to_string(),
                model: ModelKind::RandomForest,
            }
        );
    }

    #[test]
    fn test_router_builds() {
        let store = SqliteStore::new_in_memory().unwrap();
        let _router = create_router(Arc::new(AppState::new(store)));
    }
}
