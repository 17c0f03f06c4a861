// src/pipeline/signal.rs

//! Threshold evaluation over fetched rows.

use serde_json::Value;

use crate::graph::node::LogicProcessorData;
use crate::store::Row;
use crate::types::{Metric, Operator, Signal};

const AGE_COLUMNS: [&str; 3] = ["age_0_5", "age_5_18", "age_18_plus"];

/// Evaluate a logic processor's rule against `rows`.
///
/// Empty or absent rows are [`Signal::Unevaluated`]; otherwise the metric is
/// compared against the threshold. Never fails: unknown metrics read as 0 and
/// unknown operators behave as `gt`.
pub fn evaluate(rows: Option<&[Row]>, rule: &LogicProcessorData) -> Signal {
    let rows = match rows {
        Some(rows) if !rows.is_empty() => rows,
        _ => return Signal::Unevaluated,
    };

    let value = metric_value(rows, &rule.metric);
    let operator = Operator::parse_or_default(&rule.operator);
    Signal::from_bool(operator.apply(value, rule.threshold))
}

/// Aggregate `metric` over `rows`, treating missing or non-numeric fields as 0.
pub fn metric_value(rows: &[Row], metric: &str) -> f64 {
    match Metric::parse(metric) {
        Some(Metric::Total) => rows
            .iter()
            .map(|row| AGE_COLUMNS.iter().map(|c| field(row, c)).sum::<f64>())
            .sum(),
        Some(Metric::Count) => rows.len() as f64,
        Some(Metric::Age0To5) => sum_field(rows, "age_0_5"),
        Some(Metric::Age5To18) => sum_field(rows, "age_5_18"),
        Some(Metric::Age18Plus) => sum_field(rows, "age_18_plus"),
        None => 0.0,
    }
}

fn sum_field(rows: &[Row], column: &str) -> f64 {
    rows.iter().map(|row| field(row, column)).sum()
}

fn field(row: &Row, column: &str) -> f64 {
    match row.get(column) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rows(value: serde_json::Value) -> Vec<Row> {
        serde_json::from_value(value).unwrap()
    }

    fn rule(metric: &str, operator: &str, threshold: f64) -> LogicProcessorData {
        LogicProcessorData {
            metric: metric.to_string(),
            operator: operator.to_string(),
            threshold,
            ..LogicProcessorData::default()
        }
    }

    #[test]
    fn empty_rows_are_unevaluated() {
        let empty: Vec<Row> = Vec::new();
        for r in [rule("total", "lt", 50.0), rule("count", "gt", -1.0)] {
            assert_eq!(evaluate(Some(empty.as_slice()), &r), Signal::Unevaluated);
            assert_eq!(evaluate(None, &r), Signal::Unevaluated);
        }
    }

    #[test]
    fn total_sums_all_age_groups() {
        let data = rows(json!([{ "age_0_5": 10, "age_5_18": 20, "age_18_plus": 5 }]));
        assert_eq!(evaluate(Some(data.as_slice()), &rule("total", "gt", 30.0)), Signal::Alert);
        assert_eq!(evaluate(Some(data.as_slice()), &rule("total", "lt", 30.0)), Signal::Nominal);
        assert_eq!(evaluate(Some(data.as_slice()), &rule("total", "eq", 35.0)), Signal::Alert);
    }

    #[test]
    fn missing_fields_count_as_zero() {
        let data = rows(json!([{ "age_0_5": 4 }, { "age_18_plus": "6" }, { "state": "Goa" }]));
        assert_eq!(metric_value(&data, "total"), 10.0);
        assert_eq!(metric_value(&data, "count"), 3.0);
        assert_eq!(metric_value(&data, "age_5_18"), 0.0);
        assert_eq!(metric_value(&data, "median"), 0.0);
    }

    #[test]
    fn unknown_operator_behaves_as_gt() {
        let data = rows(json!([{ "age_0_5": 7 }]));
        assert_eq!(evaluate(Some(data.as_slice()), &rule("age_0_5", "approx", 5.0)), Signal::Alert);
        assert_eq!(evaluate(Some(data.as_slice()), &rule("age_0_5", "approx", 7.0)), Signal::Nominal);
    }

    #[test]
    fn inclusive_operators() {
        let data = rows(json!([{ "age_5_18": 12 }]));
        assert_eq!(evaluate(Some(data.as_slice()), &rule("age_5_18", "lte", 12.0)), Signal::Alert);
        assert_eq!(evaluate(Some(data.as_slice()), &rule("age_5_18", "gte", 13.0)), Signal::Nominal);
    }
}
