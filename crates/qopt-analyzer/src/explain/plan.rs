//! Query Plan Model - Data structures for query execution plans
//!
//! A plan is a tree with exactly one root. Child order is display order.

use serde::{Deserialize, Serialize};

/// A complete query execution plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryPlan {
    /// Root node of the plan tree
    pub root: PlanNode,
    /// Total estimated cost of the query
    pub total_cost: Option<f64>,
    /// Estimated rows returned by the root
    pub total_rows: Option<u64>,
    /// Planning time in milliseconds (EXPLAIN ANALYZE only)
    pub planning_time_ms: Option<f64>,
    /// Execution time in milliseconds (EXPLAIN ANALYZE only)
    pub execution_time_ms: Option<f64>,
}

impl QueryPlan {
    /// Creates a plan, taking total cost and rows from the root node
    pub fn new(root: PlanNode) -> Self {
        let total_cost = root.cost.map(|c| c.total);
        let total_rows = root.rows;
        Self {
            root,
            total_cost,
            total_rows,
            planning_time_ms: None,
            execution_time_ms: None,
        }
    }

    pub fn with_planning_time(mut self, ms: f64) -> Self {
        self.planning_time_ms = Some(ms);
        self
    }

    pub fn with_execution_time(mut self, ms: f64) -> Self {
        self.execution_time_ms = Some(ms);
        self
    }

    /// Iterates over all nodes depth-first, parent before children
    pub fn iter_nodes(&self) -> PlanNodeIterator<'_> {
        PlanNodeIterator::new(&self.root)
    }

    pub fn find_nodes_by_type(&self, node_type: NodeType) -> Vec<&PlanNode> {
        self.iter_nodes()
            .filter(|n| n.node_type == node_type)
            .collect()
    }

    pub fn has_sequential_scans(&self) -> bool {
        self.iter_nodes().any(|n| n.node_type == NodeType::SeqScan)
    }

    /// Rows read by scan nodes, preferring actual counts over estimates
    pub fn rows_scanned(&self) -> u64 {
        self.iter_nodes()
            .filter(|n| n.is_scan())
            .map(|n| {
                let rows = n.actual_rows.or(n.rows).unwrap_or(0);
                rows.saturating_mul(n.loops.unwrap_or(1))
            })
            .sum()
    }

    /// Fraction of shared buffer accesses served from cache, if the plan
    /// was captured with `BUFFERS`
    pub fn buffer_hit_ratio(&self) -> Option<f64> {
        let (hits, reads) = self.iter_nodes().fold((0u64, 0u64), |(h, r), n| {
            (
                h + n.shared_hit_blocks.unwrap_or(0),
                r + n.shared_read_blocks.unwrap_or(0),
            )
        });
        let total = hits + reads;
        (total > 0).then(|| hits as f64 / total as f64)
    }
}

/// A single node in the query plan tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanNode {
    pub node_type: NodeType,
    /// Relation/table name (scans)
    pub relation: Option<String>,
    pub alias: Option<String>,
    pub cost: Option<NodeCost>,
    /// Estimated number of rows
    pub rows: Option<u64>,
    /// Actual rows returned (EXPLAIN ANALYZE)
    pub actual_rows: Option<u64>,
    pub loops: Option<u64>,
    pub filter: Option<String>,
    pub rows_removed_by_filter: Option<u64>,
    pub index_name: Option<String>,
    pub index_cond: Option<String>,
    pub join_type: Option<JoinType>,
    /// Hash, merge or join filter condition
    pub join_cond: Option<String>,
    pub sort_keys: Vec<String>,
    pub memory_used_kb: Option<u64>,
    pub group_keys: Vec<String>,
    pub shared_hit_blocks: Option<u64>,
    pub shared_read_blocks: Option<u64>,
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            relation: None,
            alias: None,
            cost: None,
            rows: None,
            actual_rows: None,
            loops: None,
            filter: None,
            rows_removed_by_filter: None,
            index_name: None,
            index_cond: None,
            join_type: None,
            join_cond: None,
            sort_keys: Vec::new(),
            memory_used_kb: None,
            group_keys: Vec::new(),
            shared_hit_blocks: None,
            shared_read_blocks: None,
            children: Vec::new(),
        }
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    pub fn with_cost(mut self, startup: f64, total: f64) -> Self {
        self.cost = Some(NodeCost { startup, total });
        self
    }

    pub fn with_rows(mut self, rows: u64) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn with_child(mut self, child: PlanNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_join(mut self, join_type: JoinType, cond: impl Into<String>) -> Self {
        self.join_type = Some(join_type);
        self.join_cond = Some(cond.into());
        self
    }

    pub fn with_sort_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_group_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Total number of nodes in this subtree (including self)
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// Maximum depth of this subtree
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_scan(&self) -> bool {
        matches!(
            self.node_type,
            NodeType::SeqScan
                | NodeType::IndexScan
                | NodeType::IndexOnlyScan
                | NodeType::BitmapHeapScan
                | NodeType::CteScan
        )
    }

    pub fn is_join(&self) -> bool {
        matches!(
            self.node_type,
            NodeType::NestedLoop | NodeType::HashJoin | NodeType::MergeJoin
        )
    }

    /// Operator label as shown in the plan tree, e.g. `Hash Left Join` or
    /// `Seq Scan on users`
    pub fn operator_label(&self) -> String {
        let name = self.node_type.display_name();

        if self.is_join() {
            let join_type = match self.join_type {
                Some(JoinType::Inner) | None => return name.to_string(),
                Some(join_type) => join_type.display_name(),
            };
            return match self.node_type {
                NodeType::HashJoin => format!("Hash {join_type} Join"),
                NodeType::MergeJoin => format!("Merge {join_type} Join"),
                _ => format!("{name} {join_type} Join"),
            };
        }

        match &self.relation {
            Some(relation) if self.is_scan() => format!("{name} on {relation}"),
            _ => name.to_string(),
        }
    }

    /// The most relevant predicate or key for this node, if any
    pub fn detail_text(&self) -> Option<String> {
        if let Some(cond) = &self.join_cond {
            let label = match self.node_type {
                NodeType::HashJoin => "Hash Cond",
                NodeType::MergeJoin => "Merge Cond",
                _ => "Join Filter",
            };
            return Some(format!("{label}: {cond}"));
        }
        if !self.sort_keys.is_empty() {
            return Some(format!("Sort Key: {}", self.sort_keys.join(", ")));
        }
        if !self.group_keys.is_empty() {
            return Some(format!("Group Key: {}", self.group_keys.join(", ")));
        }
        if let Some(filter) = &self.filter {
            return Some(format!("Filter: {filter}"));
        }
        if let Some(index) = &self.index_name {
            return Some(format!("Index: {index}"));
        }
        None
    }
}

/// Cost information for a plan node
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NodeCost {
    /// Cost to return the first row
    pub startup: f64,
    /// Cost to return all rows
    pub total: f64,
}

impl NodeCost {
    pub fn new(startup: f64, total: f64) -> Self {
        Self { startup, total }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Semi,
    Anti,
}

impl JoinType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "inner" => Some(Self::Inner),
            "left" | "left outer" => Some(Self::Left),
            "right" | "right outer" => Some(Self::Right),
            "full" | "full outer" => Some(Self::Full),
            "semi" => Some(Self::Semi),
            "anti" => Some(Self::Anti),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Inner => "Inner",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Full => "Full",
            Self::Semi => "Semi",
            Self::Anti => "Anti",
        }
    }
}

/// Operation performed by a plan node
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    // Scans
    SeqScan,
    IndexScan,
    IndexOnlyScan,
    BitmapIndexScan,
    BitmapHeapScan,
    CteScan,

    // Joins
    NestedLoop,
    HashJoin,
    MergeJoin,

    // Aggregation
    Aggregate,
    GroupAggregate,
    HashAggregate,

    Sort,
    Limit,
    Hash,
    Materialize,
    Unique,
    Append,
    Gather,
    Result,

    Unknown,
}

impl NodeType {
    /// Parses a node type from PostgreSQL EXPLAIN output
    pub fn from_postgres_str(s: &str) -> Self {
        match s {
            "Seq Scan" => Self::SeqScan,
            "Index Scan" => Self::IndexScan,
            "Index Only Scan" => Self::IndexOnlyScan,
            "Bitmap Index Scan" => Self::BitmapIndexScan,
            "Bitmap Heap Scan" => Self::BitmapHeapScan,
            "CTE Scan" => Self::CteScan,
            "Nested Loop" => Self::NestedLoop,
            "Hash Join" => Self::HashJoin,
            "Merge Join" => Self::MergeJoin,
            "Aggregate" => Self::Aggregate,
            "GroupAggregate" | "Group Aggregate" => Self::GroupAggregate,
            "HashAggregate" | "Hash Aggregate" => Self::HashAggregate,
            "Sort" => Self::Sort,
            "Limit" => Self::Limit,
            "Hash" => Self::Hash,
            "Materialize" => Self::Materialize,
            "Unique" => Self::Unique,
            "Append" => Self::Append,
            "Gather" => Self::Gather,
            "Result" => Self::Result,
            _ => Self::Unknown,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SeqScan => "Seq Scan",
            Self::IndexScan => "Index Scan",
            Self::IndexOnlyScan => "Index Only Scan",
            Self::BitmapIndexScan => "Bitmap Index Scan",
            Self::BitmapHeapScan => "Bitmap Heap Scan",
            Self::CteScan => "CTE Scan",
            Self::NestedLoop => "Nested Loop",
            Self::HashJoin => "Hash Join",
            Self::MergeJoin => "Merge Join",
            Self::Aggregate => "Aggregate",
            Self::GroupAggregate => "Group Aggregate",
            Self::HashAggregate => "Hash Aggregate",
            Self::Sort => "Sort",
            Self::Limit => "Limit",
            Self::Hash => "Hash",
            Self::Materialize => "Materialize",
            Self::Unique => "Unique",
            Self::Append => "Append",
            Self::Gather => "Gather",
            Self::Result => "Result",
            Self::Unknown => "Unknown",
        }
    }

    /// Returns true if this operation typically indicates a performance concern
    pub fn is_potentially_slow(&self) -> bool {
        matches!(self, Self::SeqScan | Self::NestedLoop | Self::Sort)
    }
}

/// Depth-first iterator over plan nodes
pub struct PlanNodeIterator<'a> {
    stack: Vec<&'a PlanNode>,
}

impl<'a> PlanNodeIterator<'a> {
    fn new(root: &'a PlanNode) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'a> Iterator for PlanNodeIterator<'a> {
    type Item = &'a PlanNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // reversed so the first child is popped next
        for child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests;
