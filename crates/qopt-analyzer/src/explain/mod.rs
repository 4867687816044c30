//! Query EXPLAIN Module
//!
//! The plan model plus a parser for PostgreSQL JSON EXPLAIN output.
//!
//! # Example
//!
//! ```
//! use qopt_analyzer::explain::{parse_postgres_explain, NodeType};
//!
//! let json = r#"[{"Plan": {"Node Type": "Seq Scan", "Relation Name": "users"}}]"#;
//! let plan = parse_postgres_explain(json).unwrap();
//! assert_eq!(plan.root.node_type, NodeType::SeqScan);
//! assert_eq!(plan.root.operator_label(), "Seq Scan on users");
//! ```

pub mod plan;
pub mod postgres;

pub use plan::{JoinType, NodeCost, NodeType, PlanNode, PlanNodeIterator, QueryPlan};
pub use postgres::{PostgresExplainError, parse_postgres_explain};
