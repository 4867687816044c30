//! Query Analyzer - Optimization Suggestions
//!
//! Walks a query plan, flags common performance problems and derives
//! index recommendations from filtered sequential scans.

use crate::explain::{NodeType, PlanNode, QueryPlan};
use crate::result::IndexRecommendation;
use serde::{Deserialize, Serialize};

/// Severity level for suggestions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLevel {
    /// Should be addressed immediately
    Critical,
    /// May impact performance
    Warning,
    Info,
}

impl SeverityLevel {
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Critical)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    fn penalty(&self) -> u8 {
        match self {
            Self::Critical => 25,
            Self::Warning => 10,
            Self::Info => 3,
        }
    }
}

/// Type of optimization suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    MissingIndex,
    FullTableScan,
    LargeSort,
    InefficientFilter,
    ExpensiveNestedLoop,
    MultipleSeqScans,
}

impl SuggestionType {
    pub fn description(&self) -> &'static str {
        match self {
            Self::MissingIndex => "Consider adding an index",
            Self::FullTableScan => "Full table scan detected",
            Self::LargeSort => "Sort on large dataset",
            Self::InefficientFilter => "Filter removing many rows",
            Self::ExpensiveNestedLoop => "Expensive nested loop join",
            Self::MultipleSeqScans => "Multiple sequential scans detected",
        }
    }
}

/// A single optimization suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub suggestion_type: SuggestionType,
    pub severity: SeverityLevel,
    /// Explains the issue
    pub message: String,
    /// Suggested action
    pub recommendation: String,
    pub table: Option<String>,
    pub columns: Vec<String>,
    /// Estimated impact on performance (0.0 - 1.0)
    pub estimated_impact: f64,
}

impl Suggestion {
    pub fn new(
        suggestion_type: SuggestionType,
        severity: SeverityLevel,
        message: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            suggestion_type,
            severity,
            message: message.into(),
            recommendation: recommendation.into(),
            table: None,
            columns: Vec::new(),
            estimated_impact: 0.5,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_impact(mut self, impact: f64) -> Self {
        self.estimated_impact = impact.clamp(0.0, 1.0);
        self
    }
}

/// Result of analyzing one plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub suggestions: Vec<Suggestion>,
    /// Overall score (0-100, higher = better)
    pub performance_score: u8,
    pub summary: String,
}

impl Default for QueryAnalysis {
    fn default() -> Self {
        Self {
            suggestions: Vec::new(),
            performance_score: 100,
            summary: String::new(),
        }
    }
}

impl QueryAnalysis {
    pub fn add_suggestion(&mut self, suggestion: Suggestion) {
        self.performance_score = self
            .performance_score
            .saturating_sub(suggestion.severity.penalty());
        self.suggestions.push(suggestion);
    }

    pub fn has_critical_issues(&self) -> bool {
        self.suggestions.iter().any(|s| s.severity.is_critical())
    }

    /// Suggestions ordered critical first, stable within a severity
    pub fn sorted_suggestions(&self) -> Vec<&Suggestion> {
        let mut sorted: Vec<_> = self.suggestions.iter().collect();
        sorted.sort_by_key(|s| s.severity);
        sorted
    }

    /// `CREATE INDEX` recommendations backed by missing-index suggestions
    pub fn index_recommendations(&self) -> Vec<IndexRecommendation> {
        let mut recommendations: Vec<IndexRecommendation> = Vec::new();
        for suggestion in &self.suggestions {
            if suggestion.suggestion_type != SuggestionType::MissingIndex
                || suggestion.columns.is_empty()
            {
                continue;
            }
            let Some(table) = &suggestion.table else {
                continue;
            };
            let recommendation = IndexRecommendation::new(table, suggestion.columns.clone());
            if !recommendations.contains(&recommendation) {
                recommendations.push(recommendation);
            }
        }
        recommendations
    }

    fn count(&self, severity: SeverityLevel) -> usize {
        self.suggestions
            .iter()
            .filter(|s| s.severity == severity)
            .count()
    }
}

/// Thresholds used by the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Rows above this make a finding critical
    pub high_row_threshold: u64,
    /// Sequential scans at or above this many rows are flagged
    pub large_table_threshold: u64,
    /// Share of rows removed by a filter that triggers a suggestion
    pub filter_efficiency_threshold: f64,
    pub suggest_indexes: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            high_row_threshold: 10_000,
            large_table_threshold: 1_000,
            filter_efficiency_threshold: 0.5,
            suggest_indexes: true,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_large_table_threshold(mut self, threshold: u64) -> Self {
        self.large_table_threshold = threshold;
        self
    }

    pub fn with_suggest_indexes(mut self, suggest: bool) -> Self {
        self.suggest_indexes = suggest;
        self
    }

    /// True if this node is a sequential scan over a large table
    pub fn is_large_seq_scan(&self, node: &PlanNode) -> bool {
        node.node_type == NodeType::SeqScan
            && node.rows.unwrap_or(0) >= self.large_table_threshold
    }
}

/// Query analyzer that provides optimization suggestions
#[derive(Debug, Clone, Default)]
pub struct QueryAnalyzer {
    config: AnalyzerConfig,
}

impl QueryAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze(&self, plan: &QueryPlan) -> QueryAnalysis {
        let mut analysis = QueryAnalysis::default();

        self.check_full_table_scans(plan, &mut analysis);
        self.check_missing_indexes(plan, &mut analysis);
        self.check_nested_loops(plan, &mut analysis);
        self.check_large_sorts(plan, &mut analysis);
        self.check_inefficient_filters(plan, &mut analysis);
        self.check_multiple_seq_scans(plan, &mut analysis);

        analysis.summary = summarize(&analysis);
        analysis
    }

    fn check_full_table_scans(&self, plan: &QueryPlan, analysis: &mut QueryAnalysis) {
        for node in plan.iter_nodes() {
            if !self.config.is_large_seq_scan(node) {
                continue;
            }
            let rows = node.rows.unwrap_or(0);
            let table = relation_or_unknown(node);
            let severity = if rows >= self.config.high_row_threshold {
                SeverityLevel::Critical
            } else {
                SeverityLevel::Warning
            };
            let impact = (rows as f64 / self.config.high_row_threshold as f64).min(1.0);

            analysis.add_suggestion(
                Suggestion::new(
                    SuggestionType::FullTableScan,
                    severity,
                    format!("Full table scan on '{table}' reading {rows} rows"),
                    format!(
                        "Consider adding an index on '{table}' or filtering on indexed columns"
                    ),
                )
                .with_table(&table)
                .with_impact(impact),
            );
        }
    }

    fn check_missing_indexes(&self, plan: &QueryPlan, analysis: &mut QueryAnalysis) {
        if !self.config.suggest_indexes {
            return;
        }

        for node in plan.iter_nodes() {
            let Some(filter) = node.filter.as_deref() else {
                continue;
            };
            if !self.config.is_large_seq_scan(node) {
                continue;
            }

            let table = relation_or_unknown(node);
            let columns = extract_columns_from_filter(filter);
            let statement = if columns.is_empty() {
                format!("CREATE INDEX ON {table} (...)")
            } else {
                IndexRecommendation::new(&table, columns.clone()).to_sql()
            };

            analysis.add_suggestion(
                Suggestion::new(
                    SuggestionType::MissingIndex,
                    SeverityLevel::Warning,
                    format!("Sequential scan with filter on '{table}': {filter}"),
                    format!("Consider creating an index: {statement}"),
                )
                .with_table(&table)
                .with_columns(columns)
                .with_impact(0.7),
            );
        }
    }

    fn check_nested_loops(&self, plan: &QueryPlan, analysis: &mut QueryAnalysis) {
        for node in plan.find_nodes_by_type(NodeType::NestedLoop) {
            let rows = node.rows.unwrap_or(0);
            let loops = node.loops.unwrap_or(1);
            if rows.saturating_mul(loops) < self.config.high_row_threshold {
                continue;
            }

            analysis.add_suggestion(
                Suggestion::new(
                    SuggestionType::ExpensiveNestedLoop,
                    SeverityLevel::Warning,
                    format!("Nested loop join processing {rows} rows with {loops} loops"),
                    "Consider adding indexes on join columns or restructuring the query",
                )
                .with_impact(0.6),
            );
        }
    }

    fn check_large_sorts(&self, plan: &QueryPlan, analysis: &mut QueryAnalysis) {
        for node in plan.find_nodes_by_type(NodeType::Sort) {
            let rows = node.rows.unwrap_or(0);
            let memory = node.memory_used_kb.unwrap_or(0);
            if rows < self.config.high_row_threshold && memory <= 1024 {
                continue;
            }

            let message = if memory > 0 {
                format!("Sort operation on {rows} rows using {memory}KB memory")
            } else {
                format!("Sort operation on {rows} rows")
            };

            analysis.add_suggestion(
                Suggestion::new(
                    SuggestionType::LargeSort,
                    SeverityLevel::Info,
                    message,
                    "Consider adding an index to avoid sorting or increasing work_mem",
                )
                .with_impact(0.4),
            );
        }
    }

    fn check_inefficient_filters(&self, plan: &QueryPlan, analysis: &mut QueryAnalysis) {
        for node in plan.iter_nodes() {
            let (Some(removed), Some(kept)) = (node.rows_removed_by_filter, node.actual_rows)
            else {
                continue;
            };
            let total = removed + kept;
            if total == 0 {
                continue;
            }

            let ratio = removed as f64 / total as f64;
            if ratio < self.config.filter_efficiency_threshold {
                continue;
            }

            let table = relation_or_unknown(node);
            analysis.add_suggestion(
                Suggestion::new(
                    SuggestionType::InefficientFilter,
                    SeverityLevel::Info,
                    format!(
                        "Filter removed {:.0}% of rows ({removed} of {total})",
                        ratio * 100.0
                    ),
                    format!("Consider adding an index on the filtered column(s) of '{table}'"),
                )
                .with_table(&table)
                .with_impact(ratio * 0.5),
            );
        }
    }

    fn check_multiple_seq_scans(&self, plan: &QueryPlan, analysis: &mut QueryAnalysis) {
        let seq_scans = plan.find_nodes_by_type(NodeType::SeqScan);
        if seq_scans.len() < 3 {
            return;
        }

        let tables: Vec<_> = seq_scans
            .iter()
            .filter_map(|n| n.relation.clone())
            .collect();

        analysis.add_suggestion(
            Suggestion::new(
                SuggestionType::MultipleSeqScans,
                SeverityLevel::Warning,
                format!(
                    "Query performs {} sequential scans on tables: {}",
                    seq_scans.len(),
                    tables.join(", ")
                ),
                "Consider adding indexes or restructuring the query to reduce full table scans",
            )
            .with_impact(0.5),
        );
    }
}

fn relation_or_unknown(node: &PlanNode) -> String {
    node.relation
        .clone()
        .unwrap_or_else(|| "unknown".to_string())
}

fn summarize(analysis: &QueryAnalysis) -> String {
    let critical = analysis.count(SeverityLevel::Critical);
    let warnings = analysis.count(SeverityLevel::Warning);
    let info = analysis.count(SeverityLevel::Info);
    let score = analysis.performance_score;

    if analysis.suggestions.is_empty() {
        "Query plan looks optimal - no issues detected.".to_string()
    } else if critical > 0 {
        format!(
            "Query has {critical} critical issue(s), {warnings} warning(s), and {info} suggestion(s). Performance score: {score}/100"
        )
    } else if warnings > 0 {
        format!(
            "Query has {warnings} warning(s) and {info} suggestion(s). Performance score: {score}/100"
        )
    } else {
        format!("Query has {info} minor suggestion(s). Performance score: {score}/100")
    }
}

/// Extracts column names from a filter expression (best effort)
fn extract_columns_from_filter(filter: &str) -> Vec<String> {
    const OPERATORS: [&str; 10] = [
        "<>", "!=", ">=", "<=", "=", ">", "<", " IS ", " LIKE ", " IN ",
    ];

    let mut columns = Vec::new();

    for part in filter.split(" AND ").flat_map(|p| p.split(" OR ")) {
        let trimmed = part.trim().trim_matches(|c: char| c == '(' || c == ')');

        // The leftmost operator splits the comparison; later matches may sit
        // inside a literal on the right-hand side
        let Some(idx) = OPERATORS.iter().filter_map(|op| trimmed.find(op)).min() else {
            continue;
        };

        // `((status)::text = ...)` leaves `status)::text` on the left
        let candidate = trimmed[..idx].trim();
        let candidate = candidate
            .split("::")
            .next()
            .unwrap_or(candidate)
            .trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace());

        let looks_like_value = candidate.starts_with('\'')
            || candidate.starts_with('"')
            || candidate.starts_with(|c: char| c.is_ascii_digit());
        if candidate.is_empty() || looks_like_value {
            continue;
        }

        // drop any table qualifier
        let column = candidate
            .rsplit('.')
            .next()
            .unwrap_or(candidate)
            .trim_matches(|c: char| c == '(' || c == ')')
            .to_string();

        if !column.is_empty() && !columns.contains(&column) {
            columns.push(column);
        }
    }

    columns
}
