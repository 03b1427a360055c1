//! Two-level graph: groups of variables connected by typed group edges.

use crate::graph::types::{lag_column, Dynamism, GroupEdge, GroupId, LagInterval, Variable};
use crate::graph::variable_graph::VariableGraph;
use crate::graph::GraphError;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// A named cluster of variables sharing one dynamism.
#[derive(Debug, Clone)]
pub struct Group {
    id: GroupId,
    name: String,
    dynamism: Dynamism,
    graph: VariableGraph,
}

impl Group {
    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dynamism(&self) -> Dynamism {
        self.dynamism
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamism.is_dynamic()
    }

    pub fn is_static(&self) -> bool {
        self.dynamism.is_static()
    }

    /// The variable graph wrapped by this group
    pub fn graph(&self) -> &VariableGraph {
        &self.graph
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.graph.variables()
    }
}

/// Either level of the grouped graph, for queries that accept both.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Group(&'a Group),
    Variable(&'a Variable),
}

impl<'a> NodeRef<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            NodeRef::Group(group) => group.name(),
            NodeRef::Variable(variable) => variable.name(),
        }
    }

    pub fn as_variable(&self) -> Option<&'a Variable> {
        match self {
            NodeRef::Variable(variable) => Some(variable),
            NodeRef::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&'a Group> {
        match self {
            NodeRef::Group(group) => Some(group),
            NodeRef::Variable(_) => None,
        }
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NodeRef::Group(a), NodeRef::Group(b)) => a.id() == b.id() && a.name() == b.name(),
            (NodeRef::Variable(a), NodeRef::Variable(b)) => a == b,
            _ => false,
        }
    }
}

/// Flattened variables split by dynamism.
#[derive(Debug, Clone, Default)]
pub struct VariablePartition<'a> {
    pub statics: Vec<&'a Variable>,
    pub dynamics: Vec<&'a Variable>,
}

impl VariablePartition<'_> {
    pub fn static_names(&self) -> Vec<String> {
        self.statics.iter().map(|v| v.name().to_string()).collect()
    }

    pub fn dynamic_names(&self) -> Vec<String> {
        self.dynamics.iter().map(|v| v.name().to_string()).collect()
    }
}

/// Grouped causal graph
///
/// Groups live in an arena indexed by `GroupId`; variables refer back to
/// their group by id. Variable names are unique across the whole graph.
#[derive(Debug, Clone, Default)]
pub struct GroupedGraph {
    /// Groups as nodes, typed group edges as edge weights
    graph: DiGraph<Group, GroupEdge>,
    /// Map from group name to NodeIndex
    index: HashMap<String, NodeIndex>,
    /// Largest `max` of every dynamic lag registered so far
    max_lag: Option<u32>,
}

impl GroupedGraph {
    /// Creates an empty grouped graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group with an empty variable graph
    pub fn add_group(
        &mut self,
        name: impl Into<String>,
        dynamism: Dynamism,
    ) -> Result<GroupId, GraphError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(GraphError::DuplicateGroup(name));
        }

        let id = GroupId(self.graph.node_count());
        let node = self.graph.add_node(Group {
            id,
            name: name.clone(),
            dynamism,
            graph: VariableGraph::new(id),
        });
        debug_assert_eq!(node.index(), id.0);
        debug!(group = %name, %dynamism, "added group");
        self.index.insert(name, node);
        Ok(id)
    }

    /// Adds a typed edge between two groups
    ///
    /// The variant is chosen from the groups' dynamism; dynamic-to-dynamic
    /// edges require `lag` and update the running maximum lag. Adding a
    /// second edge between the same two groups is a `DuplicateEdge` error.
    pub fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        lag: Option<LagInterval>,
    ) -> Result<&GroupEdge, GraphError> {
        let from_index = self.group_index(from)?;
        let to_index = self.group_index(to)?;
        // the running maximum never shrinks, so an edge is never replaced
        if self.graph.find_edge(from_index, to_index).is_some() {
            return Err(GraphError::DuplicateEdge {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let from_group = &self.graph[from_index];
        let to_group = &self.graph[to_index];
        if lag.is_some() && !(from_group.is_dynamic() && to_group.is_dynamic()) {
            warn!(from, to, "ignoring time-to-effect on edge involving a static group");
        }
        let edge = GroupEdge::between(
            (from_group.name(), from_group.dynamism()),
            (to_group.name(), to_group.dynamism()),
            lag,
        )?;

        if let Some(lag) = edge.lag() {
            self.register_lag(lag);
        }
        debug!(edge = %edge, "added group edge");
        let edge_index = self.graph.add_edge(from_index, to_index, edge);
        Ok(&self.graph[edge_index])
    }

    /// Adds a variable to a group
    ///
    /// Fails if the group is unknown or the name is used anywhere in the graph.
    pub fn add_variable(
        &mut self,
        group: &str,
        name: impl Into<String>,
    ) -> Result<&Variable, GraphError> {
        let name = name.into();
        let index = self.group_index(group)?;
        if self.get_variable(&name).is_some() {
            return Err(GraphError::DuplicateVariable(name));
        }
        self.graph[index].graph.add_variable(name)
    }

    /// Adds a variable that must have the given dynamism
    pub fn add_typed_variable(
        &mut self,
        group: &str,
        name: impl Into<String>,
        required: Dynamism,
    ) -> Result<&Variable, GraphError> {
        let name = name.into();
        let index = self.group_index(group)?;
        if self.graph[index].dynamism() != required {
            return Err(GraphError::StatusMismatch {
                variable: name,
                group: group.to_string(),
                required,
            });
        }
        self.add_variable(group, name)
    }

    /// Adds an edge between two variables of the same group
    pub fn add_variable_edge(
        &mut self,
        group: &str,
        from: &str,
        to: &str,
        lag: Option<LagInterval>,
    ) -> Result<(), GraphError> {
        let index = self.group_index(group)?;
        let owner = &mut self.graph[index];

        let lag = if owner.is_static() && lag.is_some() {
            warn!(group, from, to, "ignoring time-to-effect on edge in static group");
            None
        } else {
            lag
        };
        let lag = owner.graph.add_edge(from, to, lag)?.lag;

        if let Some(lag) = lag {
            self.register_lag(lag);
        }
        Ok(())
    }

    /// Folds a lag into the running maximum.
    ///
    /// Every edge-construction path calls this; the maximum never decreases.
    pub fn register_lag(&mut self, lag: LagInterval) {
        let current = self.max_lag.map_or(lag.max, |max| max.max(lag.max));
        self.max_lag = Some(current);
    }

    /// Largest lag declared anywhere in the graph, if any dynamic edge exists
    pub fn max_lag(&self) -> Option<u32> {
        self.max_lag
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.index.get(name).map(|&node| &self.graph[node])
    }

    pub fn group_by_id(&self, id: GroupId) -> Option<&Group> {
        self.graph.node_weight(NodeIndex::new(id.0))
    }

    /// Groups in insertion order
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.graph.node_weights()
    }

    /// Group edges in insertion order
    pub fn group_edges(&self) -> impl Iterator<Item = &GroupEdge> {
        self.graph.edge_weights()
    }

    pub fn group_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn variable_count(&self) -> usize {
        self.groups().map(|group| group.graph.len()).sum()
    }

    /// Edge from `from` to `to`, if any
    pub fn edge_between(&self, from: &Group, to: &Group) -> Option<&GroupEdge> {
        let source = self.index.get(from.name())?;
        let target = self.index.get(to.name())?;
        self.graph
            .find_edge(*source, *target)
            .map(|edge| &self.graph[edge])
    }

    pub fn outgoing(&self, group: &Group) -> Vec<&GroupEdge> {
        self.groups()
            .filter_map(|target| self.edge_between(group, target))
            .collect()
    }

    /// Edges entering `group`, found by scanning every group in order
    pub fn incoming(&self, group: &Group) -> Vec<&GroupEdge> {
        self.groups()
            .filter_map(|source| self.edge_between(source, group))
            .collect()
    }

    /// Groups with an edge into `group`
    pub fn group_parents(&self, group: &Group) -> Vec<&Group> {
        self.incoming(group)
            .into_iter()
            .filter_map(|edge| self.group(edge.from()))
            .collect()
    }

    /// Flattened lookup of a variable by name across all groups
    pub fn get_variable(&self, name: &str) -> Option<&Variable> {
        self.groups().find_map(|group| group.graph.get(name))
    }

    /// Group whose variable graph holds `variable`
    pub fn group_of(&self, variable: &Variable) -> Option<&Group> {
        self.group_by_id(variable.group())
            .filter(|group| group.graph.contains(variable.name()))
    }

    /// Dynamism inherited by `variable` from its group
    pub fn dynamism_of(&self, variable: &Variable) -> Result<Dynamism, GraphError> {
        self.group_of(variable)
            .map(Group::dynamism)
            .ok_or_else(|| GraphError::UnknownVariable(variable.name().to_string()))
    }

    /// Parents of a variable in the flattened graph
    ///
    /// The union of the variable's parents inside its own group and every
    /// variable of every parent group. Whole parent groups are included, not
    /// just the variables that target `variable`, so the conditioning set is
    /// deliberately wide.
    pub fn variable_parents(&self, variable: &Variable) -> Result<Vec<&Variable>, GraphError> {
        let group = self
            .group_of(variable)
            .ok_or_else(|| GraphError::UnknownVariable(variable.name().to_string()))?;

        let within = group.graph.parents_of(variable);
        let across = self
            .group_parents(group)
            .into_iter()
            .flat_map(|parent| parent.graph.variables());

        let mut seen = HashSet::new();
        let parents = within
            .into_iter()
            .chain(across)
            .filter(|parent| seen.insert(parent.name()))
            .collect();
        Ok(parents)
    }

    /// Parents of a group (groups) or of a variable (flattened variables)
    pub fn parents_of<'a>(&'a self, node: NodeRef<'_>) -> Result<Vec<NodeRef<'a>>, GraphError> {
        match node {
            NodeRef::Group(group) => {
                let own = self
                    .group(group.name())
                    .ok_or_else(|| GraphError::UnknownGroup(group.name().to_string()))?;
                Ok(self
                    .group_parents(own)
                    .into_iter()
                    .map(NodeRef::Group)
                    .collect())
            }
            NodeRef::Variable(variable) => Ok(self
                .variable_parents(variable)?
                .into_iter()
                .map(NodeRef::Variable)
                .collect()),
        }
    }

    /// All variables, split into static and dynamic
    pub fn partition_by_dynamism(&self) -> VariablePartition<'_> {
        let mut partition = VariablePartition::default();
        for group in self.groups() {
            let bucket = match group.dynamism() {
                Dynamism::Static => &mut partition.statics,
                Dynamism::Dynamic => &mut partition.dynamics,
            };
            bucket.extend(group.graph.variables());
        }
        partition
    }

    /// Lagged column names of `parent` that can influence `effect`
    ///
    /// Within a group the direct edge's lag is used, falling back to the
    /// group's dynamic self-edge. Across groups the group edge must be
    /// dynamic-to-dynamic. Names are ordered by ascending lag.
    pub fn temporal_lag_names(
        &self,
        parent: &Variable,
        effect: &Variable,
    ) -> Result<Vec<String>, GraphError> {
        let parent_group = self
            .group_of(parent)
            .ok_or_else(|| GraphError::UnknownVariable(parent.name().to_string()))?;
        let effect_group = self
            .group_of(effect)
            .ok_or_else(|| GraphError::UnknownVariable(effect.name().to_string()))?;

        let no_path = || GraphError::NoCausalPath {
            parent: parent.name().to_string(),
            effect: effect.name().to_string(),
        };

        let lag = if parent_group.id() == effect_group.id() {
            let direct = parent_group
                .graph
                .edge_between(parent, effect)
                .and_then(|edge| edge.lag);
            match direct {
                Some(lag) => lag,
                None => self
                    .edge_between(parent_group, parent_group)
                    .and_then(GroupEdge::lag)
                    .ok_or_else(no_path)?,
            }
        } else {
            let edge = self
                .edge_between(parent_group, effect_group)
                .ok_or_else(no_path)?;
            edge.lag().ok_or_else(|| GraphError::NotDynamicToDynamic {
                from: parent_group.name().to_string(),
                to: effect_group.name().to_string(),
            })?
        };

        debug!(
            parent = parent.name(),
            effect = effect.name(),
            lag = %lag,
            "resolved temporal lags"
        );
        Ok(lag.lags().map(|i| lag_column(parent.name(), i)).collect())
    }

    fn group_index(&self, name: &str) -> Result<NodeIndex, GraphError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownGroup(name.to_string()))
    }
}

impl std::fmt::Display for GroupedGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "--- Grouped Causal Graph ---")?;
        writeln!(f, "\nNodes:")?;
        for group in self.groups() {
            writeln!(f, "\t{} ({})", group.name(), group.dynamism())?;
            for edge in group.graph.edges() {
                writeln!(f, "\t\t{}", edge)?;
            }
        }
        writeln!(f, "\nEdges:")?;
        for edge in self.group_edges() {
            writeln!(f, "\t{}", edge)?;
        }
        Ok(())
    }
}
