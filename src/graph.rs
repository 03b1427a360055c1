//! Grouped Causal Graph
//!
//! This module provides the two-level causal graph the estimator works on:
//! variables wired together inside groups, and groups wired together with
//! typed, lag-annotated edges. The grouped graph owns the global maximum lag
//! and answers the cross-group queries (flattened lookup, parent resolution,
//! temporal lag expansion) that the estimation pipeline needs.

pub mod document;
pub mod grouped;
pub mod types;
pub mod variable_graph;

pub use document::{
    GraphDocument, GroupDocument, GroupEdgeDocument, GroupEndpoint, NodeName,
    VariableDocument, VariableEdgeDocument, VariableGraphDocument,
};
pub use grouped::{Group, GroupedGraph, NodeRef, VariablePartition};
pub use types::{lag_column, lead_column, Dynamism, GroupEdge, GroupId, LagInterval, LaggedEdge, Variable};
pub use variable_graph::VariableGraph;

/// Broad classification of graph failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The graph was asked to hold something it cannot represent.
    Structural,
    /// A lag path between two variables could not be resolved.
    PathResolution,
}

/// Error types for graph construction and queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Group name not present in the grouped graph
    UnknownGroup(String),
    /// Variable name not present in the graph being queried
    UnknownVariable(String),
    /// A group with this name already exists
    DuplicateGroup(String),
    /// A variable with this name already exists somewhere in the grouped graph
    DuplicateVariable(String),
    /// Dynamic-to-dynamic group edge added without a lag interval
    MissingLag { from: String, to: String },
    /// An edge between these two endpoints already exists
    DuplicateEdge { from: String, to: String },
    /// Lag interval with min > max
    InvalidLag { min: u32, max: u32 },
    /// Edge from a dynamic group into a static group
    UnsupportedEdgeDirection { from: String, to: String },
    /// Static-to-dynamic edge whose endpoints are the same group
    SelfEdge(String),
    /// Variable inserted into a group of the opposite dynamism
    StatusMismatch {
        variable: String,
        group: String,
        required: Dynamism,
    },
    /// No edge (direct or group self-edge) supplies a lag for the pair
    NoCausalPath { parent: String, effect: String },
    /// Cross-group lag lookup hit an edge that carries no lag
    NotDynamicToDynamic { from: String, to: String },
    /// Serialized graph could not be read or contradicts itself
    InvalidDocument(String),
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::NoCausalPath { .. } | GraphError::NotDynamicToDynamic { .. } => {
                ErrorKind::PathResolution
            }
            _ => ErrorKind::Structural,
        }
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::UnknownGroup(name) => write!(f, "Group not found: {}", name),
            GraphError::UnknownVariable(name) => write!(f, "Variable not found: {}", name),
            GraphError::DuplicateGroup(name) => write!(f, "Group already exists: {}", name),
            GraphError::DuplicateVariable(name) => {
                write!(f, "Variable already exists: {}", name)
            }
            GraphError::DuplicateEdge { from, to } => {
                write!(f, "Edge already exists: {} -> {}", from, to)
            }
            GraphError::MissingLag { from, to } => write!(
                f,
                "Edge {} -> {} connects two dynamic groups and requires a time-to-effect",
                from, to
            ),
            GraphError::InvalidLag { min, max } => write!(
                f,
                "Invalid time-to-effect: min ({}) must not exceed max ({})",
                min, max
            ),
            GraphError::UnsupportedEdgeDirection { from, to } => write!(
                f,
                "Unsupported edge direction: dynamic group {} cannot cause static group {}",
                from, to
            ),
            GraphError::SelfEdge(name) => {
                write!(f, "Cannot create static-to-dynamic self-edge on group {}", name)
            }
            GraphError::StatusMismatch {
                variable,
                group,
                required,
            } => write!(
                f,
                "Cannot add {} variable {} to group {} of the other kind",
                required, variable, group
            ),
            GraphError::NoCausalPath { parent, effect } => write!(
                f,
                "No causal path from {} to {}: no edge supplies a time-to-effect",
                parent, effect
            ),
            GraphError::NotDynamicToDynamic { from, to } => write!(
                f,
                "Edge between groups {} and {} is not a dynamic-to-dynamic edge",
                from, to
            ),
            GraphError::InvalidDocument(msg) => write!(f, "Invalid graph document: {}", msg),
        }
    }
}

impl std::error::Error for GraphError {}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        GraphError::InvalidDocument(err.to_string())
    }
}
