//! Variable-level causal graph owned by a single group.

use crate::graph::types::{GroupId, LagInterval, LaggedEdge, Variable};
use crate::graph::GraphError;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Directed graph over the variables of one group.
///
/// Keyed by variable name; at most one edge per ordered pair (re-adding an
/// edge replaces its lag).
#[derive(Debug, Clone)]
pub struct VariableGraph {
    /// Group owning this graph
    group: GroupId,
    /// The underlying petgraph graph
    graph: DiGraph<Variable, LaggedEdge>,
    /// Map from variable name to petgraph NodeIndex
    index: HashMap<String, NodeIndex>,
}

impl VariableGraph {
    /// Creates an empty graph owned by `group`
    pub fn new(group: GroupId) -> Self {
        VariableGraph {
            group,
            graph: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Adds a variable
    ///
    /// # Returns
    /// Returns the new variable, or `DuplicateVariable` if the name is taken
    pub fn add_variable(&mut self, name: impl Into<String>) -> Result<&Variable, GraphError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(GraphError::DuplicateVariable(name));
        }

        let node = self.graph.add_node(Variable::new(name.clone(), self.group));
        self.index.insert(name, node);
        Ok(&self.graph[node])
    }

    /// Adds an edge between two existing variables
    ///
    /// Both endpoints are resolved before anything is written, so a failed
    /// call leaves the graph untouched.
    pub fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        lag: Option<LagInterval>,
    ) -> Result<&LaggedEdge, GraphError> {
        let from_index = self.node_index(from)?;
        let to_index = self.node_index(to)?;
        let lag = lag.map(LagInterval::validated).transpose()?;
        if self.graph.find_edge(from_index, to_index).is_some() {
            return Err(GraphError::DuplicateEdge {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let edge = LaggedEdge {
            from: from.to_string(),
            to: to.to_string(),
            lag,
        };
        let edge_index = self.graph.add_edge(from_index, to_index, edge);
        Ok(&self.graph[edge_index])
    }

    /// Looks a variable up by name
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.index.get(name).map(|&node| &self.graph[node])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Variables in insertion order
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.graph.node_weights()
    }

    /// All edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &LaggedEdge> {
        self.graph.edge_weights()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Edges leaving `variable`, ordered by target insertion order
    pub fn outgoing(&self, variable: &Variable) -> Vec<&LaggedEdge> {
        let Some(&source) = self.index.get(variable.name()) else {
            return Vec::new();
        };
        self.graph
            .node_indices()
            .filter_map(|target| self.graph.find_edge(source, target))
            .map(|edge| &self.graph[edge])
            .collect()
    }

    /// Edges entering `variable`, found by scanning every variable in order
    pub fn incoming(&self, variable: &Variable) -> Vec<&LaggedEdge> {
        let Some(&target) = self.index.get(variable.name()) else {
            return Vec::new();
        };
        self.graph
            .node_indices()
            .filter_map(|source| self.graph.find_edge(source, target))
            .map(|edge| &self.graph[edge])
            .collect()
    }

    /// Sources of the incoming edges of `variable`
    pub fn parents_of(&self, variable: &Variable) -> Vec<&Variable> {
        self.incoming(variable)
            .into_iter()
            .filter_map(|edge| self.get(&edge.from))
            .collect()
    }

    /// Edge from `from` to `to`, if any
    pub fn edge_between(&self, from: &Variable, to: &Variable) -> Option<&LaggedEdge> {
        let source = self.index.get(from.name())?;
        let target = self.index.get(to.name())?;
        self.graph
            .find_edge(*source, *target)
            .map(|edge| &self.graph[edge])
    }

    fn node_index(&self, name: &str) -> Result<NodeIndex, GraphError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownVariable(name.to_string()))
    }
}
