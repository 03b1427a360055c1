//! HTTP request handlers for API endpoints

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiError;
use super::state::AppState;
use crate::estimation::query::{
    DEFAULT_GRID_POINTS, DEFAULT_MAX_DELTA_T, DEFAULT_MAX_INTERVENTION, DEFAULT_MIN_DELTA_T,
    DEFAULT_MIN_INTERVENTION,
};
use crate::estimation::{compute_causal_effect, EffectGrid, EffectQuery};
use crate::graph::{GraphDocument, GroupedGraph};
use crate::panel::PanelDataset;
use crate::store::{SqliteStore, DEFAULT_SLOT};

/// Health check endpoint
///
/// Returns a simple status response to verify the server is running
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok"
    }))
}

/// Response for dataset upload
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct VariablesResponse {
    pub variables: Vec<String>,
}

fn stored_dataset(store: &SqliteStore, state: &AppState) -> Result<PanelDataset, ApiError> {
    store
        .load_dataset(DEFAULT_SLOT, &state.schema)?
        .ok_or_else(|| ApiError::NotFound("No dataset has been uploaded".to_string()))
}

fn stored_graph(store: &SqliteStore) -> Result<GroupedGraph, ApiError> {
    store
        .load_graph(DEFAULT_SLOT)?
        .ok_or_else(|| ApiError::NotFound("No graph has been uploaded".to_string()))
}

/// POST /data - Upload a long-format CSV dataset
///
/// The CSV arrives as multipart form data in the `file` field.
pub async fn upload_data(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<VariablesResponse>, ApiError> {
    let mut body = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            body = Some(field.text().await?);
            break;
        }
    }
    let body =
        body.ok_or_else(|| ApiError::InvalidParameter("Missing form field: file".to_string()))?;
    if body.trim().is_empty() {
        return Err(ApiError::InvalidParameter("Uploaded file is empty".to_string()));
    }

    let store = state.store.lock().await;
    let dataset = store.save_dataset_csv(DEFAULT_SLOT, &body, &state.schema)?;

    Ok(Json(VariablesResponse {
        variables: dataset.variables(),
    }))
}

/// GET /variables - Variables of the uploaded dataset
pub async fn list_variables(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let store = state.store.lock().await;
    let dataset = stored_dataset(&store, &state)?;
    Ok(Json(dataset.variables()))
}

/// Response for graph upload
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct GraphSummary {
    pub groups: Vec<String>,
    pub variables: Vec<String>,
    pub max_lag: Option<u32>,
}

/// POST /parse_graph - Build, validate and store a grouped graph
pub async fn parse_graph(
    State(state): State<Arc<AppState>>,
    Json(document): Json<GraphDocument>,
) -> Result<Json<GraphSummary>, ApiError> {
    let graph = GroupedGraph::from_document(&document)?;

    let store = state.store.lock().await;
    store.save_graph(DEFAULT_SLOT, &graph)?;

    Ok(Json(GraphSummary {
        groups: graph.groups().map(|group| group.name().to_string()).collect(),
        variables: graph
            .groups()
            .flat_map(|group| group.variables())
            .map(|variable| variable.name().to_string())
            .collect(),
        max_lag: graph.max_lag(),
    }))
}

/// Response listing the graph's variables by dynamism
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct GraphVariablesResponse {
    #[serde(rename = "static")]
    pub statics: Vec<String>,
    pub dynamic: Vec<String>,
}

/// GET /graph/variables - Static and dynamic variables of the stored graph
pub async fn graph_variables(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GraphVariablesResponse>, ApiError> {
    let store = state.store.lock().await;
    let graph = stored_graph(&store)?;
    let partition = graph.partition_by_dynamism();

    Ok(Json(GraphVariablesResponse {
        statics: partition.static_names(),
        dynamic: partition.dynamic_names(),
    }))
}

fn default_min_intervention() -> f64 {
    DEFAULT_MIN_INTERVENTION
}

fn default_max_intervention() -> f64 {
    DEFAULT_MAX_INTERVENTION
}

fn default_min_delta_t() -> u32 {
    DEFAULT_MIN_DELTA_T
}

fn default_max_delta_t() -> u32 {
    DEFAULT_MAX_DELTA_T
}

fn default_grid_points() -> usize {
    DEFAULT_GRID_POINTS
}

/// Query parameters for the causal effect endpoint
#[derive(Debug, Deserialize)]
pub struct CausalEffectParams {
    pub cause_variable: String,
    pub response_variable: String,
    #[serde(default = "default_min_intervention")]
    pub min_intervention: f64,
    #[serde(default = "default_max_intervention")]
    pub max_intervention: f64,
    #[serde(default = "default_min_delta_t")]
    pub min_delta_t: u32,
    #[serde(default = "default_max_delta_t")]
    pub max_delta_t: u32,
    #[serde(default = "default_grid_points")]
    pub n_gridpts_intervention: usize,
}

/// GET /causal_effect - Estimate the effect grid of one variable on another
pub async fn causal_effect(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CausalEffectParams>,
) -> Result<Json<EffectGrid>, ApiError> {
    let query = EffectQuery::from_ranges(
        params.cause_variable,
        params.response_variable,
        params.min_intervention,
        params.max_intervention,
        params.n_gridpts_intervention,
        params.min_delta_t,
        params.max_delta_t,
    )?;

    let (panel, graph) = {
        let store = state.store.lock().await;
        (stored_dataset(&store, &state)?, stored_graph(&store)?)
    };

    // Model fitting is CPU-bound; keep it off the async workers
    let config = state.estimation.clone();
    let grid = tokio::task::spawn_blocking(move || {
        compute_causal_effect(&panel, &graph, &query, config.model_factory(), &config)
    })
    .await??;

    Ok(Json(grid))
}
