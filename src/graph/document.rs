//! Serialized form of a grouped graph.
//!
//! Mirrors the JSON the diagram editor produces, and doubles as the format
//! the graph is persisted in.

use crate::graph::grouped::GroupedGraph;
use crate::graph::types::{Dynamism, LagInterval};
use crate::graph::GraphError;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Root of a serialized grouped graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<GroupDocument>,
    #[serde(default)]
    pub edges: Vec<GroupEdgeDocument>,
}

/// A group and its variable graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDocument {
    pub name: String,
    pub mode: Dynamism,
    #[serde(default)]
    pub graph: VariableGraphDocument,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableGraphDocument {
    #[serde(default)]
    pub nodes: Vec<VariableDocument>,
    #[serde(default)]
    pub edges: Vec<VariableEdgeDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDocument {
    pub name: String,
}

/// Reference to a node by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableEdgeDocument {
    pub from_node: NodeName,
    pub to_node: NodeName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_effect: Option<LagInterval>,
}

/// Group endpoint; the editor repeats the group's mode on every edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEndpoint {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Dynamism>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEdgeDocument {
    pub from_node: GroupEndpoint,
    pub to_node: GroupEndpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_effect: Option<LagInterval>,
}

impl GraphDocument {
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl GroupedGraph {
    /// Builds a graph by replaying a document through the construction API
    ///
    /// Groups (with their variables and variable edges) are added first, then
    /// group edges, so every invariant of the builder applies to documents too.
    pub fn from_document(document: &GraphDocument) -> Result<Self, GraphError> {
        let mut graph = GroupedGraph::new();

        for group in &document.nodes {
            graph.add_group(group.name.as_str(), group.mode)?;
            for variable in &group.graph.nodes {
                graph.add_variable(&group.name, variable.name.as_str())?;
            }
            for edge in &group.graph.edges {
                let lag = edge.time_to_effect.map(LagInterval::validated).transpose()?;
                graph.add_variable_edge(&group.name, &edge.from_node.name, &edge.to_node.name, lag)?;
            }
        }

        for edge in &document.edges {
            for endpoint in [&edge.from_node, &edge.to_node] {
                check_declared_mode(&graph, endpoint)?;
            }
            let lag = edge.time_to_effect.map(LagInterval::validated).transpose()?;
            graph.add_edge(&edge.from_node.name, &edge.to_node.name, lag)?;
        }

        info!(
            groups = graph.group_count(),
            variables = graph.variable_count(),
            max_lag = ?graph.max_lag(),
            "parsed grouped graph"
        );
        Ok(graph)
    }

    /// Parses editor JSON straight into a graph
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Self::from_document(&GraphDocument::from_json(json)?)
    }

    /// Serializes the graph into its document form
    pub fn to_document(&self) -> GraphDocument {
        let nodes = self
            .groups()
            .map(|group| GroupDocument {
                name: group.name().to_string(),
                mode: group.dynamism(),
                graph: VariableGraphDocument {
                    nodes: group
                        .variables()
                        .map(|variable| VariableDocument {
                            name: variable.name().to_string(),
                        })
                        .collect(),
                    edges: group
                        .graph()
                        .edges()
                        .map(|edge| VariableEdgeDocument {
                            from_node: NodeName {
                                name: edge.from.clone(),
                            },
                            to_node: NodeName {
                                name: edge.to.clone(),
                            },
                            time_to_effect: edge.lag,
                        })
                        .collect(),
                },
            })
            .collect();

        let edges = self
            .group_edges()
            .map(|edge| GroupEdgeDocument {
                from_node: self.endpoint(edge.from()),
                to_node: self.endpoint(edge.to()),
                time_to_effect: edge.lag(),
            })
            .collect();

        GraphDocument { nodes, edges }
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        self.to_document().to_json()
    }

    fn endpoint(&self, name: &str) -> GroupEndpoint {
        GroupEndpoint {
            name: name.to_string(),
            mode: self.group(name).map(|group| group.dynamism()),
        }
    }
}

fn check_declared_mode(graph: &GroupedGraph, endpoint: &GroupEndpoint) -> Result<(), GraphError> {
    let group = graph
        .group(&endpoint.name)
        .ok_or_else(|| GraphError::UnknownGroup(endpoint.name.clone()))?;
    match endpoint.mode {
        Some(mode) if mode != group.dynamism() => Err(GraphError::InvalidDocument(format!(
            "edge endpoint {} is declared {} but the group is {}",
            endpoint.name,
            mode,
            group.dynamism()
        ))),
        _ => Ok(()),
    }
}
