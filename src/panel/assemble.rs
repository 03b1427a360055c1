//! Aligned past/present/future/static frames for model fitting.

use crate::graph::GroupedGraph;
use crate::panel::dataset::PanelDataset;
use crate::panel::frame::Frame;
use crate::panel::transform::markov_transform;
use crate::panel::DataError;
use tracing::info;

/// Which variables are static and which are dynamic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableRoles {
    pub statics: Vec<String>,
    pub dynamics: Vec<String>,
}

impl VariableRoles {
    pub fn new(statics: Vec<String>, dynamics: Vec<String>) -> Self {
        VariableRoles { statics, dynamics }
    }

    /// Roles inherited from each variable's group
    pub fn from_graph(graph: &GroupedGraph) -> Self {
        let partition = graph.partition_by_dynamism();
        VariableRoles {
            statics: partition.static_names(),
            dynamics: partition.dynamic_names(),
        }
    }
}

/// Complete-case aligned frames
///
/// Every frame holds the same rows, and no cell in any of them is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct DataDict {
    pub past: Frame,
    pub present: Frame,
    pub future: Frame,
    /// Present only when static variables were requested
    pub statics: Option<Frame>,
}

impl DataDict {
    /// Number of aligned rows
    pub fn len(&self) -> usize {
        self.present.len()
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// Copy with static columns dummy-encoded
    pub fn with_dummies(&self) -> DataDict {
        DataDict {
            statics: self.statics.as_ref().map(Frame::one_hot),
            ..self.clone()
        }
    }
}

/// Builder for [`DataDict`]
#[derive(Debug, Clone)]
pub struct DataDictBuilder<'a> {
    graph: Option<&'a GroupedGraph>,
    roles: Option<VariableRoles>,
    markov_order: u32,
    max_delta_t: u32,
    dummies_for_categorical: bool,
}

impl Default for DataDictBuilder<'_> {
    fn default() -> Self {
        DataDictBuilder {
            graph: None,
            roles: None,
            markov_order: 5,
            max_delta_t: 3,
            dummies_for_categorical: false,
        }
    }
}

impl<'a> DataDictBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take variable roles from the graph; wins over explicit roles
    pub fn graph(mut self, graph: &'a GroupedGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn roles(mut self, roles: VariableRoles) -> Self {
        self.roles = Some(roles);
        self
    }

    pub fn markov_order(mut self, order: u32) -> Self {
        self.markov_order = order;
        self
    }

    pub fn max_delta_t(mut self, max_delta_t: u32) -> Self {
        self.max_delta_t = max_delta_t;
        self
    }

    pub fn dummies_for_categorical(mut self, enabled: bool) -> Self {
        self.dummies_for_categorical = enabled;
        self
    }

    /// Builds the aligned frames from a panel
    ///
    /// Dynamic variables go through the Markov transform; static variables
    /// are taken as-is. Rows missing any value in any frame are dropped.
    pub fn build(&self, panel: &PanelDataset) -> Result<DataDict, DataError> {
        let roles = match (self.graph, &self.roles) {
            (Some(graph), _) => VariableRoles::from_graph(graph),
            (None, Some(roles)) => roles.clone(),
            (None, None) => {
                return Err(DataError::MissingRoles(
                    "provide a graph or explicit static and dynamic variables".to_string(),
                ))
            }
        };
        if roles.dynamics.is_empty() {
            return Err(DataError::MissingRoles(
                "at least one dynamic variable is required".to_string(),
            ));
        }

        let dynamic = panel.select(&roles.dynamics)?;
        let frames = markov_transform(&dynamic, self.markov_order, self.max_delta_t)?;
        let statics = if roles.statics.is_empty() {
            None
        } else {
            Some(panel.select(&roles.statics)?)
        };

        let keep: Vec<usize> = (0..panel.len())
            .filter(|&row| {
                frames.past.is_complete_row(row)
                    && frames.present.is_complete_row(row)
                    && frames.future.is_complete_row(row)
                    && statics.as_ref().map_or(true, |frame| frame.is_complete_row(row))
            })
            .collect();

        info!(
            rows = panel.len(),
            complete_rows = keep.len(),
            markov_order = self.markov_order,
            max_delta_t = self.max_delta_t,
            "assembled data dict"
        );
        if keep.is_empty() {
            return Err(DataError::NoCompleteRows);
        }

        let statics = statics.map(|frame| {
            let frame = frame.take_rows(&keep);
            if self.dummies_for_categorical {
                frame.one_hot()
            } else {
                frame
            }
        });

        Ok(DataDict {
            past: frames.past.take_rows(&keep),
            present: frames.present.take_rows(&keep),
            future: frames.future.take_rows(&keep),
            statics,
        })
    }
}
