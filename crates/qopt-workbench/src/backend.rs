//! Analysis backends
//!
//! The controller only sees [`AnalysisBackend`]. Swapping the fixture for a
//! real planner does not change any workbench logic.

use std::time::Duration;

use async_trait::async_trait;
use qopt_analyzer::{
    AnalysisResult, AnalyzerConfig, QueryPlan, demo_result, parse_postgres_explain,
};
use qopt_core::{QoptError, Result};

use crate::config::WorkbenchConfig;

#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Analyzes `sql`. The workbench applies its own timeout around this.
    async fn submit_query(&self, sql: &str) -> Result<AnalysisResult>;

    fn name(&self) -> &'static str;
}

/// Returns the canned demo analysis after a fixed latency
#[derive(Debug, Clone)]
pub struct FixtureBackend {
    latency: Duration,
    analyzer: AnalyzerConfig,
}

impl FixtureBackend {
    pub fn new(latency: Duration, analyzer: AnalyzerConfig) -> Self {
        Self { latency, analyzer }
    }

    pub fn from_config(config: &WorkbenchConfig) -> Self {
        Self::new(config.timings.analysis_latency(), config.analyzer.clone())
    }
}

#[async_trait]
impl AnalysisBackend for FixtureBackend {
    #[tracing::instrument(skip(self, sql), fields(backend = "fixture", sql_preview = %sql.chars().take(50).collect::<String>()))]
    async fn submit_query(&self, sql: &str) -> Result<AnalysisResult> {
        tokio::time::sleep(self.latency).await;
        tracing::debug!("returning fixture analysis");
        Ok(demo_result(sql, &self.analyzer))
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

/// Analyzes a plan captured with `EXPLAIN (FORMAT JSON)`
///
/// The plan is fixed at construction; every submitted query is analyzed
/// against it.
#[derive(Debug, Clone)]
pub struct ExplainBackend {
    plan: QueryPlan,
    analyzer: AnalyzerConfig,
    latency: Duration,
}

impl ExplainBackend {
    pub fn new(plan: QueryPlan, analyzer: AnalyzerConfig) -> Self {
        Self {
            plan,
            analyzer,
            latency: Duration::ZERO,
        }
    }

    pub fn from_explain_json(output: &str, analyzer: AnalyzerConfig) -> Result<Self> {
        let plan = parse_postgres_explain(output)
            .map_err(|e| QoptError::Backend(format!("could not read EXPLAIN output: {e}")))?;
        tracing::debug!(nodes = plan.iter_nodes().count(), "parsed EXPLAIN plan");
        Ok(Self::new(plan, analyzer))
    }

    /// Adds an artificial delay before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }
}

#[async_trait]
impl AnalysisBackend for ExplainBackend {
    #[tracing::instrument(skip(self, sql), fields(backend = "explain", sql_preview = %sql.chars().take(50).collect::<String>()))]
    async fn submit_query(&self, sql: &str) -> Result<AnalysisResult> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let result = AnalysisResult::from_plan(sql, self.plan.clone(), &self.analyzer);
        tracing::debug!(
            score = result.analysis.performance_score,
            recommendations = result.recommendations.len(),
            "analyzed captured plan"
        );
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "explain"
    }
}
