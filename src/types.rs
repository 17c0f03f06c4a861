// src/types.rs

//! Small closed enums shared by the graph, pipeline and engine modules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of node kinds a pipeline graph may contain.
///
/// Every concern that behaves differently per kind (default payloads,
/// configuration collection, propagation) matches on this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    /// Root node standing in for the external table.
    Source,
    /// Equality filters on `state` / `district` / `pincode`.
    RegionFilter,
    /// Display-label column selection.
    ColumnSelector,
    /// Threshold rule producing a [`Signal`].
    LogicProcessor,
    /// Consumes the signal of a directly connected logic processor.
    ActionOutput,
    /// Receives the fetched rows for rendering.
    Visualizer,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Source,
        NodeKind::RegionFilter,
        NodeKind::ColumnSelector,
        NodeKind::LogicProcessor,
        NodeKind::ActionOutput,
        NodeKind::Visualizer,
    ];

    /// Identifier prefix used when the engine assigns node ids.
    pub fn slug(self) -> &'static str {
        match self {
            NodeKind::Source => "source",
            NodeKind::RegionFilter => "regionFilter",
            NodeKind::ColumnSelector => "columnSelector",
            NodeKind::LogicProcessor => "logicProcessor",
            NodeKind::ActionOutput => "actionOutput",
            NodeKind::Visualizer => "visualizer",
        }
    }

    /// Whether edits to (or removal of) a node of this kind can change the
    /// outcome of the next pipeline run, and so should re-arm the debounce.
    ///
    /// Logic processors do not change the query specification, but their
    /// signal is only recomputed when a run completes.
    pub fn affects_run(self) -> bool {
        match self {
            NodeKind::Source
            | NodeKind::RegionFilter
            | NodeKind::ColumnSelector
            | NodeKind::LogicProcessor => true,
            NodeKind::ActionOutput | NodeKind::Visualizer => false,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.slug().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                format!(
                    "unknown node kind: {wanted} (expected one of source, regionFilter, \
                     columnSelector, logicProcessor, actionOutput, visualizer)"
                )
            })
    }
}

/// Output of the threshold evaluator.
///
/// Serialised as `null` / `true` / `false` so presentation layers see the
/// same tri-state shape they always have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Signal {
    /// No rows to evaluate yet.
    #[default]
    Unevaluated,
    /// Threshold breached (`true`).
    Alert,
    /// Threshold not breached (`false`).
    Nominal,
}

impl Signal {
    pub fn from_bool(alert: bool) -> Self {
        if alert { Signal::Alert } else { Signal::Nominal }
    }

    /// Collapse to the boolean an action output consumes; unevaluated reads as `false`.
    pub fn is_alert(self) -> bool {
        matches!(self, Signal::Alert)
    }
}

impl From<Option<bool>> for Signal {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Signal::Unevaluated,
            Some(alert) => Signal::from_bool(alert),
        }
    }
}

impl From<Signal> for Option<bool> {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Unevaluated => None,
            Signal::Alert => Some(true),
            Signal::Nominal => Some(false),
        }
    }
}

/// Aggregate computed over the fetched rows by a logic processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Sum of all three age columns.
    Total,
    /// Number of rows.
    Count,
    Age0To5,
    Age5To18,
    Age18Plus,
}

impl Metric {
    /// Parse a metric name; unrecognised names yield `None` and evaluate to 0.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "total" => Some(Metric::Total),
            "count" => Some(Metric::Count),
            "age_0_5" => Some(Metric::Age0To5),
            "age_5_18" => Some(Metric::Age5To18),
            "age_18_plus" => Some(Metric::Age18Plus),
            _ => None,
        }
    }
}

/// Comparison applied as `metric OPERATOR threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    Lt,
    #[default]
    Gt,
    Eq,
    Lte,
    Gte,
}

impl Operator {
    /// Parse an operator name, falling back to `gt` for anything unknown.
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Operator::Lt => lhs < rhs,
            Operator::Gt => lhs > rhs,
            Operator::Eq => lhs == rhs,
            Operator::Lte => lhs <= rhs,
            Operator::Gte => lhs >= rhs,
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lt" => Ok(Operator::Lt),
            "gt" => Ok(Operator::Gt),
            "eq" => Ok(Operator::Eq),
            "lte" => Ok(Operator::Lte),
            "gte" => Ok(Operator::Gte),
            other => Err(format!(
                "invalid operator: {other} (expected lt, gt, eq, lte or gte)"
            )),
        }
    }
}

/// Columns a region filter may constrain with an equality predicate.
///
/// Ordering matches the order predicates are applied to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKey {
    State,
    District,
    Pincode,
}

impl FilterKey {
    pub const ALL: [FilterKey; 3] = [FilterKey::State, FilterKey::District, FilterKey::Pincode];

    /// Physical column name in the data store.
    pub fn column(self) -> &'static str {
        match self {
            FilterKey::State => "state",
            FilterKey::District => "district",
            FilterKey::Pincode => "pincode",
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_parses_its_own_slug() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.slug().parse::<NodeKind>(), Ok(kind));
        }
        assert!("database".parse::<NodeKind>().is_err());
    }

    #[test]
    fn unknown_operator_falls_back_to_gt() {
        assert_eq!(Operator::parse_or_default("between"), Operator::Gt);
        assert_eq!(Operator::parse_or_default("LTE"), Operator::Lte);
    }

    #[test]
    fn signal_serialises_as_nullable_bool() {
        assert_eq!(serde_json::to_string(&Signal::Unevaluated).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Signal::Alert).unwrap(), "true");
        let parsed: Signal = serde_json::from_str("false").unwrap();
        assert_eq!(parsed, Signal::Nominal);
    }
}
