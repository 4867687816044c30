//! PostgreSQL EXPLAIN Parser
//!
//! Parses `EXPLAIN (FORMAT JSON)` output, with or without `ANALYZE` and
//! `BUFFERS`.
//!
//! # Examples
//!
//! ```
//! use qopt_analyzer::explain::postgres::parse_postgres_explain;
//!
//! let json_output = r#"[
//!   {
//!     "Plan": {
//!       "Node Type": "Seq Scan",
//!       "Relation Name": "users",
//!       "Startup Cost": 0.0,
//!       "Total Cost": 10.0,
//!       "Plan Rows": 100
//!     }
//!   }
//! ]"#;
//!
//! let plan = parse_postgres_explain(json_output).unwrap();
//! assert!(plan.has_sequential_scans());
//! ```

use crate::explain::plan::{JoinType, NodeCost, NodeType, PlanNode, QueryPlan};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when parsing PostgreSQL EXPLAIN output
#[derive(Debug, Error)]
pub enum PostgresExplainError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Missing Plan object in EXPLAIN output")]
    MissingPlan,

    #[error("Invalid plan structure: {0}")]
    InvalidStructure(String),

    #[error("Unsupported format: expected EXPLAIN (FORMAT JSON) output")]
    UnsupportedFormat,
}

pub type Result<T> = std::result::Result<T, PostgresExplainError>;

/// Parses PostgreSQL `EXPLAIN (FORMAT JSON)` output
///
/// Accepts either the array PostgreSQL prints or a bare object with a
/// `Plan` key.
pub fn parse_postgres_explain(output: &str) -> Result<QueryPlan> {
    let trimmed = output.trim();
    if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
        return Err(PostgresExplainError::UnsupportedFormat);
    }

    let value: Value = serde_json::from_str(trimmed)?;
    let envelope = match &value {
        Value::Array(items) => items.first().ok_or(PostgresExplainError::MissingPlan)?,
        other => other,
    };
    let plan_obj = envelope
        .get("Plan")
        .ok_or(PostgresExplainError::MissingPlan)?;

    let mut plan = QueryPlan::new(parse_plan_node(plan_obj)?);
    if let Some(ms) = envelope.get("Planning Time").and_then(Value::as_f64) {
        plan.planning_time_ms = Some(ms);
    }
    if let Some(ms) = envelope.get("Execution Time").and_then(Value::as_f64) {
        plan.execution_time_ms = Some(ms);
    }

    Ok(plan)
}

fn parse_plan_node(value: &Value) -> Result<PlanNode> {
    let node_type = value
        .get("Node Type")
        .and_then(Value::as_str)
        .ok_or_else(|| PostgresExplainError::InvalidStructure("Missing Node Type".into()))?;

    let mut node = PlanNode::new(NodeType::from_postgres_str(node_type));

    node.relation = string_field(value, "Relation Name");
    node.alias = string_field(value, "Alias");

    if let (Some(startup), Some(total)) = (
        value.get("Startup Cost").and_then(Value::as_f64),
        value.get("Total Cost").and_then(Value::as_f64),
    ) {
        node.cost = Some(NodeCost::new(startup, total));
    }

    node.rows = u64_field(value, "Plan Rows");
    node.actual_rows = u64_field(value, "Actual Rows");
    node.loops = u64_field(value, "Actual Loops");

    node.filter = string_field(value, "Filter");
    node.rows_removed_by_filter = u64_field(value, "Rows Removed by Filter");

    node.index_name = string_field(value, "Index Name");
    node.index_cond = string_field(value, "Index Cond");

    node.join_type = value
        .get("Join Type")
        .and_then(Value::as_str)
        .and_then(JoinType::parse);
    node.join_cond = ["Hash Cond", "Merge Cond", "Join Filter"]
        .iter()
        .find_map(|key| string_field(value, key));

    node.sort_keys = string_list(value, "Sort Key");
    node.memory_used_kb = u64_field(value, "Sort Space Used");
    node.group_keys = string_list(value, "Group Key");

    node.shared_hit_blocks = u64_field(value, "Shared Hit Blocks");
    node.shared_read_blocks = u64_field(value, "Shared Read Blocks");

    if let Some(plans) = value.get("Plans").and_then(Value::as_array) {
        node.children = plans
            .iter()
            .map(parse_plan_node)
            .collect::<Result<Vec<_>>>()?;
    }

    Ok(node)
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(String::from)
}

fn u64_field(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(Value::as_u64)
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|k| k.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
