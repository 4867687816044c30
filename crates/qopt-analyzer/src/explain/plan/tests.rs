//! Tests for the Query Plan Model

use super::*;
use pretty_assertions::assert_eq;

fn join_tree() -> PlanNode {
    //       HashJoin
    //      /        \
    //   SeqScan   IndexScan
    PlanNode::new(NodeType::HashJoin)
        .with_join(JoinType::Left, "(users.id = orders.user_id)")
        .with_child(
            PlanNode::new(NodeType::SeqScan)
                .with_relation("users")
                .with_rows(5_000),
        )
        .with_child(
            PlanNode::new(NodeType::IndexScan)
                .with_relation("orders")
                .with_index("idx_orders_user_id")
                .with_rows(200),
        )
}

#[test]
fn test_query_plan_takes_totals_from_root() {
    let root = PlanNode::new(NodeType::SeqScan)
        .with_relation("users")
        .with_cost(0.0, 100.0)
        .with_rows(1000);

    let plan = QueryPlan::new(root);

    assert_eq!(plan.total_cost, Some(100.0));
    assert_eq!(plan.total_rows, Some(1000));
    assert!(plan.execution_time_ms.is_none());
}

#[test]
fn test_iteration_is_parent_first_in_child_order() {
    let plan = QueryPlan::new(PlanNode::new(NodeType::Limit).with_child(join_tree()));

    let types: Vec<NodeType> = plan.iter_nodes().map(|n| n.node_type).collect();
    assert_eq!(
        types,
        vec![
            NodeType::Limit,
            NodeType::HashJoin,
            NodeType::SeqScan,
            NodeType::IndexScan
        ]
    );
}

#[test]
fn test_node_count_and_depth() {
    let tree = join_tree();
    assert_eq!(tree.node_count(), 3);
    assert_eq!(tree.depth(), 2);
    assert!(!tree.is_leaf());
    assert!(tree.children[0].is_leaf());
}

#[test]
fn test_operator_labels() {
    let tree = join_tree();
    assert_eq!(tree.operator_label(), "Hash Left Join");
    assert_eq!(tree.children[0].operator_label(), "Seq Scan on users");
    assert_eq!(tree.children[1].operator_label(), "Index Scan on orders");

    let nested = PlanNode::new(NodeType::NestedLoop).with_join(JoinType::Anti, "(a.id = b.id)");
    assert_eq!(nested.operator_label(), "Nested Loop Anti Join");

    let inner = PlanNode::new(NodeType::MergeJoin).with_join(JoinType::Inner, "(a.id = b.id)");
    assert_eq!(inner.operator_label(), "Merge Join");

    assert_eq!(
        PlanNode::new(NodeType::HashAggregate).operator_label(),
        "Hash Aggregate"
    );
}

#[test]
fn test_detail_text_prefers_join_condition() {
    let tree = join_tree();
    assert_eq!(
        tree.detail_text().as_deref(),
        Some("Hash Cond: (users.id = orders.user_id)")
    );
    assert_eq!(
        tree.children[1].detail_text().as_deref(),
        Some("Index: idx_orders_user_id")
    );
    assert_eq!(
        PlanNode::new(NodeType::Sort)
            .with_sort_keys(["order_count DESC"])
            .detail_text()
            .as_deref(),
        Some("Sort Key: order_count DESC")
    );
    assert!(PlanNode::new(NodeType::Limit).detail_text().is_none());
}

#[test]
fn test_find_nodes_and_seq_scan_detection() {
    let plan = QueryPlan::new(join_tree());
    assert!(plan.has_sequential_scans());
    assert_eq!(plan.find_nodes_by_type(NodeType::IndexScan).len(), 1);
    assert!(plan.find_nodes_by_type(NodeType::Sort).is_empty());
}

#[test]
fn test_rows_scanned_sums_scan_nodes() {
    let plan = QueryPlan::new(join_tree());
    assert_eq!(plan.rows_scanned(), 5_200);
}

#[test]
fn test_buffer_hit_ratio() {
    let mut root = PlanNode::new(NodeType::SeqScan);
    assert!(QueryPlan::new(root.clone()).buffer_hit_ratio().is_none());

    root.shared_hit_blocks = Some(90);
    root.shared_read_blocks = Some(10);
    let ratio = QueryPlan::new(root).buffer_hit_ratio().unwrap();
    assert!((ratio - 0.9).abs() < f64::EPSILON);
}

#[test]
fn test_node_type_parsing() {
    assert_eq!(NodeType::from_postgres_str("Seq Scan"), NodeType::SeqScan);
    assert_eq!(
        NodeType::from_postgres_str("HashAggregate"),
        NodeType::HashAggregate
    );
    assert_eq!(NodeType::from_postgres_str("Frobnicate"), NodeType::Unknown);
    assert!(NodeType::SeqScan.is_potentially_slow());
    assert!(!NodeType::IndexScan.is_potentially_slow());
}

#[test]
fn test_join_type_parse() {
    assert_eq!(JoinType::parse("Left"), Some(JoinType::Left));
    assert_eq!(JoinType::parse("full outer"), Some(JoinType::Full));
    assert_eq!(JoinType::parse("sideways"), None);
}
