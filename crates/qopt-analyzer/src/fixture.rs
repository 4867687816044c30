//! Canned analysis used by the demo backend

use crate::explain::{JoinType, NodeType, PlanNode, QueryPlan};
use crate::result::{AnalysisResult, IndexRecommendation, optimized_query_text};
use crate::suggestions::{AnalyzerConfig, QueryAnalyzer};

/// Sample query the demo plan was "captured" from
pub const DEMO_QUERY: &str = "SELECT users.name, COUNT(orders.id) as order_count
FROM users
LEFT JOIN orders ON users.id = orders.user_id
WHERE users.created_at > '2024-01-01'
GROUP BY users.id, users.name
ORDER BY order_count DESC
LIMIT 100;";

const DEMO_IMPROVEMENT_PCT: u8 = 45;

/// Limit → Sort → Hash Aggregate → Hash Left Join → (Seq Scan users, Index Scan orders)
pub fn demo_plan() -> QueryPlan {
    let users = PlanNode::new(NodeType::SeqScan)
        .with_relation("users")
        .with_cost(0.0, 523.0)
        .with_rows(2_340_000)
        .with_filter("(created_at > '2024-01-01')");

    let orders = PlanNode::new(NodeType::IndexScan)
        .with_relation("orders")
        .with_index("idx_orders_user_id")
        .with_cost(0.0, 189.0)
        .with_rows(45_890);

    let join = PlanNode::new(NodeType::HashJoin)
        .with_join(JoinType::Left, "(users.id = orders.user_id)")
        .with_cost(0.0, 756.0)
        .with_rows(45_890)
        .with_child(users)
        .with_child(orders);

    let aggregate = PlanNode::new(NodeType::HashAggregate)
        .with_group_keys(["users.id", "users.name"])
        .with_cost(0.0, 987.0)
        .with_rows(2_340)
        .with_child(join);

    let sort = PlanNode::new(NodeType::Sort)
        .with_sort_keys(["order_count DESC"])
        .with_cost(0.0, 1_189.0)
        .with_rows(2_340)
        .with_child(aggregate);

    let limit = PlanNode::new(NodeType::Limit)
        .with_cost(0.0, 1_247.0)
        .with_rows(100)
        .with_child(sort);

    QueryPlan::new(limit).with_execution_time(142.0)
}

/// The fixed result for any submitted query. Only the optimized query text
/// depends on the input.
pub fn demo_result(query: &str, analyzer: &AnalyzerConfig) -> AnalysisResult {
    let plan = demo_plan();
    let analysis = QueryAnalyzer::with_config(analyzer.clone()).analyze(&plan);
    let recommendations = vec![
        IndexRecommendation::new("users", vec!["created_at".to_string()]),
        IndexRecommendation::new("orders", vec!["user_id".to_string()]),
    ];

    AnalysisResult {
        execution_time_ms: 142.0,
        rows_scanned: 2_300_000,
        buffer_hit_ratio: 0.952,
        cost_estimate: 1_247.0,
        optimized_query_text: optimized_query_text(
            query,
            Some(DEMO_IMPROVEMENT_PCT),
            &recommendations,
        ),
        plan,
        recommendations,
        analysis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::MetricKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_demo_plan_shape() {
        let plan = demo_plan();
        let labels: Vec<String> = plan.iter_nodes().map(|n| n.operator_label()).collect();
        assert_eq!(
            labels,
            vec![
                "Limit",
                "Sort",
                "Hash Aggregate",
                "Hash Left Join",
                "Seq Scan on users",
                "Index Scan on orders",
            ]
        );
        assert_eq!(plan.total_cost, Some(1_247.0));
        assert_eq!(plan.total_rows, Some(100));
    }

    #[test]
    fn test_demo_result_metrics() {
        let result = demo_result("SELECT 1", &AnalyzerConfig::default());
        let metrics: Vec<(MetricKind, String)> = result.metrics().into_iter().collect();
        assert_eq!(
            metrics,
            vec![
                (MetricKind::ExecutionTime, "142ms".to_string()),
                (MetricKind::RowsScanned, "2.3M".to_string()),
                (MetricKind::BufferHits, "95.2%".to_string()),
                (MetricKind::CostEstimate, "1,247".to_string()),
            ]
        );
    }

    #[test]
    fn test_demo_result_embeds_query_and_indexes() {
        let result = demo_result("SELECT * FROM t", &AnalyzerConfig::default());
        assert!(result.optimized_query_text.contains("\nSELECT * FROM t\n"));
        assert!(
            result
                .optimized_query_text
                .ends_with("-- CREATE INDEX idx_orders_user_id ON orders(user_id);")
        );
    }

    #[test]
    fn test_demo_analysis_flags_users_scan() {
        let result = demo_result(DEMO_QUERY, &AnalyzerConfig::default());
        assert!(result.analysis.has_critical_issues());
        assert_eq!(
            result.analysis.index_recommendations(),
            vec![IndexRecommendation::new("users", vec!["created_at".into()])]
        );
    }
}
