pub mod graph;
pub mod panel;
pub mod estimation;
pub mod store;
pub mod server;


pub use graph::{
    Dynamism, ErrorKind, GraphDocument, GraphError, Group, GroupEdge, GroupedGraph, LagInterval,
    LaggedEdge, NodeRef, Variable, VariableGraph,
};
pub use panel::{
    markov_transform, DataDict, DataDictBuilder, DataError, Frame, MarkovFrames, PanelDataset,
    PanelSchema, VariableRoles,
};
pub use estimation::{
    compute_causal_effect, compute_causal_effect_with_roles, estimate_effect, ConfiguredModel,
    EffectGrid, EffectQuery, EstimationConfig, EstimationError, ForestSettings, LinearRegression,
    Matrix, ModelError, ModelKind, RandomForest, Regressor,
};
pub use store::{SqliteStore, StoreError};
pub use server::{run_server, ApiError, AppState, ServerConfig};
