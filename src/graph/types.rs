use crate::graph::GraphError;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Group identifier (index into the grouped graph's arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub usize);

/// Whether the variables of a group vary over time within a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dynamism {
    Dynamic,
    Static,
}

impl Dynamism {
    pub fn from_flag(dynamic: bool) -> Self {
        if dynamic {
            Dynamism::Dynamic
        } else {
            Dynamism::Static
        }
    }

    pub fn is_dynamic(self) -> bool {
        self == Dynamism::Dynamic
    }

    pub fn is_static(self) -> bool {
        self == Dynamism::Static
    }
}

impl std::fmt::Display for Dynamism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dynamism::Dynamic => write!(f, "dynamic"),
            Dynamism::Static => write!(f, "static"),
        }
    }
}

/// Inclusive time-to-effect interval, in time steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LagInterval {
    pub min: u32,
    pub max: u32,
}

impl LagInterval {
    pub fn new(min: u32, max: u32) -> Result<Self, GraphError> {
        LagInterval { min, max }.validated()
    }

    /// Interval covering exactly one lag.
    pub fn single(lag: u32) -> Self {
        LagInterval { min: lag, max: lag }
    }

    /// Re-checks an interval that was built field-by-field (e.g. deserialized).
    pub fn validated(self) -> Result<Self, GraphError> {
        if self.min > self.max {
            return Err(GraphError::InvalidLag {
                min: self.min,
                max: self.max,
            });
        }
        Ok(self)
    }

    /// Lags in ascending order.
    pub fn lags(&self) -> RangeInclusive<u32> {
        self.min..=self.max
    }
}

impl std::fmt::Display for LagInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.min, self.max)
    }
}

/// Column name of `variable` shifted `lag` steps into the past.
pub fn lag_column(variable: &str, lag: u32) -> String {
    format!("{}_tm{}", variable, lag)
}

/// Column name of `variable` shifted `horizon` steps into the future.
pub fn lead_column(variable: &str, horizon: u32) -> String {
    format!("{}_tp{}", variable, horizon)
}

/// A variable inside one group's graph.
///
/// Dynamism is not stored here; it is looked up through the owning group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    name: String,
    group: GroupId,
}

impl Variable {
    pub(crate) fn new(name: String, group: GroupId) -> Self {
        Variable { name, group }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the group whose graph owns this variable
    pub fn group(&self) -> GroupId {
        self.group
    }
}

/// Directed edge between two variables of the same group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaggedEdge {
    pub from: String,
    pub to: String,
    pub lag: Option<LagInterval>,
}

impl std::fmt::Display for LaggedEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.lag {
            Some(lag) => write!(f, "{} --{}--> {}", self.from, lag, self.to),
            None => write!(f, "{} ----> {}", self.from, self.to),
        }
    }
}

/// Edge between two groups, typed by the dynamism of its endpoints.
///
/// There is deliberately no dynamic-to-static variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupEdge {
    DynamicToDynamic {
        from: String,
        to: String,
        lag: LagInterval,
    },
    StaticToDynamic {
        from: String,
        to: String,
    },
    StaticToStatic {
        from: String,
        to: String,
    },
}

impl GroupEdge {
    /// Picks the variant from the endpoint dynamism.
    ///
    /// A lag is mandatory between dynamic groups and ignored otherwise.
    pub fn between(
        from: (&str, Dynamism),
        to: (&str, Dynamism),
        lag: Option<LagInterval>,
    ) -> Result<Self, GraphError> {
        let (from_name, from_kind) = from;
        let (to_name, to_kind) = to;

        match (from_kind, to_kind) {
            (Dynamism::Dynamic, Dynamism::Dynamic) => {
                let lag = lag.ok_or_else(|| GraphError::MissingLag {
                    from: from_name.to_string(),
                    to: to_name.to_string(),
                })?;
                Ok(GroupEdge::DynamicToDynamic {
                    from: from_name.to_string(),
                    to: to_name.to_string(),
                    lag: lag.validated()?,
                })
            }
            (Dynamism::Static, Dynamism::Dynamic) => {
                if from_name == to_name {
                    return Err(GraphError::SelfEdge(from_name.to_string()));
                }
                Ok(GroupEdge::StaticToDynamic {
                    from: from_name.to_string(),
                    to: to_name.to_string(),
                })
            }
            (Dynamism::Static, Dynamism::Static) => Ok(GroupEdge::StaticToStatic {
                from: from_name.to_string(),
                to: to_name.to_string(),
            }),
            (Dynamism::Dynamic, Dynamism::Static) => Err(GraphError::UnsupportedEdgeDirection {
                from: from_name.to_string(),
                to: to_name.to_string(),
            }),
        }
    }

    pub fn from(&self) -> &str {
        match self {
            GroupEdge::DynamicToDynamic { from, .. }
            | GroupEdge::StaticToDynamic { from, .. }
            | GroupEdge::StaticToStatic { from, .. } => from,
        }
    }

    pub fn to(&self) -> &str {
        match self {
            GroupEdge::DynamicToDynamic { to, .. }
            | GroupEdge::StaticToDynamic { to, .. }
            | GroupEdge::StaticToStatic { to, .. } => to,
        }
    }

    pub fn lag(&self) -> Option<LagInterval> {
        match self {
            GroupEdge::DynamicToDynamic { lag, .. } => Some(*lag),
            _ => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, GroupEdge::DynamicToDynamic { .. })
    }
}

impl std::fmt::Display for GroupEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupEdge::DynamicToDynamic { from, to, lag } => {
                write!(f, "{} --{}--> {}    (dynamic -> dynamic)", from, lag, to)
            }
            GroupEdge::StaticToDynamic { from, to } => {
                write!(f, "{} ----> {}    (static -> dynamic)", from, to)
            }
            GroupEdge::StaticToStatic { from, to } => {
                write!(f, "{} ----> {}    (static -> static)", from, to)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lag_interval_rejects_inverted_bounds() {
        assert_eq!(
            LagInterval::new(3, 1),
            Err(GraphError::InvalidLag { min: 3, max: 1 })
        );
        let lag = LagInterval::new(1, 3).unwrap();
        assert_eq!(lag.lags().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_column_names() {
        assert_eq!(lag_column("dose", 2), "dose_tm2");
        assert_eq!(lead_column("biomarker", 1), "biomarker_tp1");
    }

    #[test]
    fn test_edge_variant_selection() {
        let lag = Some(LagInterval::single(1));

        let edge = GroupEdge::between(("A", Dynamism::Dynamic), ("B", Dynamism::Dynamic), lag)
            .unwrap();
        assert!(edge.is_dynamic());
        assert_eq!(edge.lag(), lag);

        let edge = GroupEdge::between(("S", Dynamism::Static), ("B", Dynamism::Dynamic), lag)
            .unwrap();
        assert!(matches!(edge, GroupEdge::StaticToDynamic { .. }));
        assert_eq!(edge.lag(), None);

        let edge =
            GroupEdge::between(("S", Dynamism::Static), ("T", Dynamism::Static), None).unwrap();
        assert!(matches!(edge, GroupEdge::StaticToStatic { .. }));
    }

    #[test]
    fn test_dynamic_to_static_is_rejected() {
        let err = GroupEdge::between(("A", Dynamism::Dynamic), ("S", Dynamism::Static), None)
            .unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedEdgeDirection { .. }));
    }

    #[test]
    fn test_dynamic_edge_requires_lag() {
        let err = GroupEdge::between(("A", Dynamism::Dynamic), ("B", Dynamism::Dynamic), None)
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::MissingLag {
                from: "A".to_string(),
                to: "B".to_string()
            }
        );
    }

    #[test]
    fn test_static_to_dynamic_self_edge_is_rejected() {
        let err = GroupEdge::between(("S", Dynamism::Static), ("S", Dynamism::Dynamic), None)
            .unwrap_err();
        assert_eq!(err, GraphError::SelfEdge("S".to_string()));
    }

    #[test]
    fn test_edge_display() {
        let edge = LaggedEdge {
            from: "cat".to_string(),
            to: "dog".to_string(),
            lag: Some(LagInterval::single(2)),
        };
        assert_eq!(edge.to_string(), "cat --[2,2]--> dog");

        let edge = GroupEdge::StaticToDynamic {
            from: "Demographics".to_string(),
            to: "Vitals".to_string(),
        };
        assert_eq!(edge.to_string(), "Demographics ----> Vitals    (static -> dynamic)");
    }
}
