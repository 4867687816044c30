//! Analysis results handed from a backend to the workbench

use crate::explain::QueryPlan;
use crate::suggestions::{AnalyzerConfig, QueryAnalysis, QueryAnalyzer};
use serde::{Deserialize, Serialize};

/// Everything the results panel shows for one analyzed query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub execution_time_ms: f64,
    pub rows_scanned: u64,
    /// Fraction of buffer accesses served from cache (0.0 - 1.0)
    pub buffer_hit_ratio: f64,
    pub cost_estimate: f64,
    /// Input query plus optimizer commentary, rendered verbatim
    pub optimized_query_text: String,
    pub plan: QueryPlan,
    pub recommendations: Vec<IndexRecommendation>,
    pub analysis: QueryAnalysis,
}

impl AnalysisResult {
    /// Derives a result from a captured plan
    ///
    /// Execution time and buffer hits are only known for plans captured with
    /// `ANALYZE` / `BUFFERS`; they read as zero otherwise.
    pub fn from_plan(query: &str, plan: QueryPlan, config: &AnalyzerConfig) -> Self {
        let analysis = QueryAnalyzer::with_config(config.clone()).analyze(&plan);
        let recommendations = analysis.index_recommendations();

        Self {
            execution_time_ms: plan.execution_time_ms.unwrap_or(0.0),
            rows_scanned: plan.rows_scanned(),
            buffer_hit_ratio: plan.buffer_hit_ratio().unwrap_or(0.0),
            cost_estimate: plan.total_cost.unwrap_or(0.0),
            optimized_query_text: optimized_query_text(query, None, &recommendations),
            plan,
            recommendations,
            analysis,
        }
    }

    /// The four headline metrics, formatted for display
    pub fn metrics(&self) -> [(MetricKind, String); 4] {
        [
            (
                MetricKind::ExecutionTime,
                format_duration_ms(self.execution_time_ms),
            ),
            (MetricKind::RowsScanned, format_row_count(self.rows_scanned)),
            (MetricKind::BufferHits, format_ratio(self.buffer_hit_ratio)),
            (MetricKind::CostEstimate, format_cost(self.cost_estimate)),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    ExecutionTime,
    RowsScanned,
    BufferHits,
    CostEstimate,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        Self::ExecutionTime,
        Self::RowsScanned,
        Self::BufferHits,
        Self::CostEstimate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ExecutionTime => "Execution Time",
            Self::RowsScanned => "Rows Scanned",
            Self::BufferHits => "Buffer Hits",
            Self::CostEstimate => "Cost Estimate",
        }
    }
}

/// A suggested `CREATE INDEX` statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecommendation {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
}

impl IndexRecommendation {
    /// Creates a recommendation named `idx_<table>_<columns>`
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        let table = table.into();
        let name = format!("idx_{}_{}", table.replace('.', "_"), columns.join("_"));
        Self {
            name,
            table,
            columns,
        }
    }

    pub fn to_sql(&self) -> String {
        format!(
            "CREATE INDEX {} ON {}({});",
            self.name,
            self.table,
            self.columns.join(", ")
        )
    }
}

/// Builds the optimized query text: a header, the original query verbatim,
/// then the recommended indexes as SQL comments
pub fn optimized_query_text(
    original: &str,
    estimated_improvement_pct: Option<u8>,
    recommendations: &[IndexRecommendation],
) -> String {
    let mut text = String::from("-- Optimized with indexes\n");
    if let Some(pct) = estimated_improvement_pct {
        text.push_str(&format!("-- Estimated improvement: {pct}% faster\n"));
    }
    text.push('\n');
    text.push_str(original);
    text.push_str("\n\n-- Recommended indexes:");
    if recommendations.is_empty() {
        text.push_str("\n-- (none)");
    }
    for recommendation in recommendations {
        text.push_str("\n-- ");
        text.push_str(&recommendation.to_sql());
    }
    text
}

pub fn format_duration_ms(ms: f64) -> String {
    if ms >= 1000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else if ms.fract() == 0.0 {
        format!("{ms:.0}ms")
    } else {
        format!("{ms:.1}ms")
    }
}

/// Compact row counts: `950`, `45.9K`, `2.3M`
pub fn format_row_count(rows: u64) -> String {
    // Units switch where one-decimal rounding would reach 1000.0
    match rows {
        0..1_000 => rows.to_string(),
        1_000..999_950 => format!("{:.1}K", rows as f64 / 1_000.0),
        999_950..999_950_000 => format!("{:.1}M", rows as f64 / 1_000_000.0),
        _ => format!("{:.1}B", rows as f64 / 1_000_000_000.0),
    }
}

pub fn format_ratio(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Rounds to a whole number with thousands separators: `1,247`
pub fn format_cost(cost: f64) -> String {
    group_thousands(cost.round().max(0.0) as u64)
}

pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_metric_formatting() {
        assert_eq!(format_duration_ms(142.0), "142ms");
        assert_eq!(format_duration_ms(0.5), "0.5ms");
        assert_eq!(format_duration_ms(2500.0), "2.50s");
        assert_eq!(format_row_count(950), "950");
        assert_eq!(format_row_count(45_890), "45.9K");
        assert_eq!(format_row_count(2_340_000), "2.3M");
        assert_eq!(format_row_count(999_949), "999.9K");
        assert_eq!(format_row_count(999_950), "1.0M");
        assert_eq!(format_row_count(999_950_000), "1.0B");
        assert_eq!(format_ratio(0.952), "95.2%");
        assert_eq!(format_cost(1247.0), "1,247");
        assert_eq!(format_cost(12.6), "13");
        assert_eq!(group_thousands(2_340_000), "2,340,000");
        assert_eq!(group_thousands(0), "0");
    }

    #[test]
    fn test_index_recommendation_sql() {
        let rec = IndexRecommendation::new("users", vec!["created_at".to_string()]);
        assert_eq!(rec.name, "idx_users_created_at");
        assert_eq!(
            rec.to_sql(),
            "CREATE INDEX idx_users_created_at ON users(created_at);"
        );

        let qualified =
            IndexRecommendation::new("public.orders", vec!["user_id".into(), "status".into()]);
        assert_eq!(
            qualified.to_sql(),
            "CREATE INDEX idx_public_orders_user_id_status ON public.orders(user_id, status);"
        );
    }

    #[test]
    fn test_optimized_query_text_keeps_input_verbatim() {
        let recs = vec![
            IndexRecommendation::new("users", vec!["created_at".into()]),
            IndexRecommendation::new("orders", vec!["user_id".into()]),
        ];
        let text = optimized_query_text("SELECT * FROM t", Some(45), &recs);

        assert_eq!(
            text,
            indoc! {"
                -- Optimized with indexes
                -- Estimated improvement: 45% faster

                SELECT * FROM t

                -- Recommended indexes:
                -- CREATE INDEX idx_users_created_at ON users(created_at);
                -- CREATE INDEX idx_orders_user_id ON orders(user_id);"}
        );
    }

    #[test]
    fn test_from_plan_derives_metrics_and_indexes() {
        use crate::explain::{NodeType, PlanNode};

        let mut scan = PlanNode::new(NodeType::SeqScan)
            .with_relation("events")
            .with_cost(0.0, 4_210.5)
            .with_rows(80_000)
            .with_filter("(kind = 'click')");
        scan.shared_hit_blocks = Some(90);
        scan.shared_read_blocks = Some(10);
        let plan = QueryPlan::new(scan).with_execution_time(37.4);

        let result = AnalysisResult::from_plan(
            "SELECT * FROM events WHERE kind = 'click'",
            plan,
            &AnalyzerConfig::default(),
        );

        assert_eq!(
            result.metrics().map(|(_, value)| value),
            [
                "37.4ms".to_string(),
                "80.0K".to_string(),
                "90.0%".to_string(),
                "4,211".to_string()
            ]
        );
        assert_eq!(
            result.recommendations,
            vec![IndexRecommendation::new("events", vec!["kind".into()])]
        );
        assert!(
            result
                .optimized_query_text
                .ends_with("-- CREATE INDEX idx_events_kind ON events(kind);")
        );
    }

    #[test]
    fn test_from_plan_with_cast_filter_yields_valid_index_sql() {
        let plan = crate::explain::parse_postgres_explain(indoc! {r#"
            [{
              "Plan": {
                "Node Type": "Seq Scan",
                "Relation Name": "orders",
                "Startup Cost": 0.0,
                "Total Cost": 1834.0,
                "Plan Rows": 50000,
                "Filter": "((status)::text = 'open'::text)"
              }
            }]
        "#})
        .unwrap();

        let result = AnalysisResult::from_plan(
            "SELECT * FROM orders WHERE status = 'open'",
            plan,
            &AnalyzerConfig::default(),
        );

        assert_eq!(
            result
                .recommendations
                .iter()
                .map(IndexRecommendation::to_sql)
                .collect::<Vec<_>>(),
            vec!["CREATE INDEX idx_orders_status ON orders(status);".to_string()]
        );
    }

    #[test]
    fn test_optimized_query_text_without_recommendations() {
        let text = optimized_query_text("SELECT 1", None, &[]);
        assert!(text.starts_with("-- Optimized with indexes\n\nSELECT 1"));
        assert!(text.ends_with("-- Recommended indexes:\n-- (none)"));
    }
}
