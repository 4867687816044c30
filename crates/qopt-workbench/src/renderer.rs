//! Results panel: headline metrics, optimized query, plan tree
//!
//! Metrics use a staged reveal. On render every slot shows the placeholder,
//! then after the reveal delay it receives its final value and is briefly
//! emphasized. Each render bumps a generation counter; reveal and settle
//! messages from an older render are ignored.

use std::time::Duration;

use qopt_analyzer::{
    AnalysisResult, AnalyzerConfig, MetricKind, PlanNode, Suggestion, group_thousands,
};

use crate::clipboard::CopyTarget;
use crate::config::WorkbenchConfig;
use crate::message::Message;
use crate::task::Scheduler;

pub const PLACEHOLDER: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    /// Nothing analyzed yet
    Empty,
    Populated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSlot {
    pub kind: MetricKind,
    /// What the slot currently shows
    pub value: String,
    pub emphasized: bool,
    target: String,
}

impl MetricSlot {
    fn new(kind: MetricKind) -> Self {
        Self {
            kind,
            value: PLACEHOLDER.to_string(),
            emphasized: false,
            target: PLACEHOLDER.to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    /// True once the final value is showing
    pub fn is_revealed(&self) -> bool {
        self.value == self.target
    }
}

/// One operator of the plan tree, flattened for display
#[derive(Debug, Clone, PartialEq)]
pub struct PlanLine {
    pub depth: usize,
    pub label: String,
    pub cost: Option<f64>,
    pub rows: Option<u64>,
    pub detail: Option<String>,
    /// Sequential scan over a large table
    pub warning: bool,
}

impl PlanLine {
    /// `Cost: 1,247 | Rows: 100`
    pub fn stats_text(&self) -> String {
        let cost = self
            .cost
            .map(|c| group_thousands(c.round().max(0.0) as u64))
            .unwrap_or_else(|| "?".to_string());
        let rows = self
            .rows
            .map(group_thousands)
            .unwrap_or_else(|| "?".to_string());
        format!("Cost: {cost} | Rows: {rows}")
    }
}

/// Flattens `root` depth-first, parent before children, in child order
pub fn flatten_plan(root: &PlanNode, analyzer: &AnalyzerConfig) -> Vec<PlanLine> {
    let mut lines = Vec::with_capacity(root.node_count());
    push_lines(root, 0, analyzer, &mut lines);
    lines
}

fn push_lines(node: &PlanNode, depth: usize, analyzer: &AnalyzerConfig, out: &mut Vec<PlanLine>) {
    out.push(PlanLine {
        depth,
        label: node.operator_label(),
        cost: node.cost.map(|c| c.total),
        rows: node.rows,
        detail: node.detail_text(),
        warning: analyzer.is_large_seq_scan(node),
    });
    for child in &node.children {
        push_lines(child, depth + 1, analyzer, out);
    }
}

pub struct ResultRenderer {
    panel: PanelState,
    metrics: Vec<MetricSlot>,
    optimized_query: String,
    index_statements: Vec<String>,
    plan_lines: Vec<PlanLine>,
    summary: String,
    suggestions: Vec<Suggestion>,
    score: Option<u8>,
    generation: u64,
    staged_reveal: bool,
    reveal_delay: Duration,
    emphasis: Duration,
    analyzer: AnalyzerConfig,
}

impl ResultRenderer {
    pub fn new(config: &WorkbenchConfig) -> Self {
        Self {
            panel: PanelState::Empty,
            metrics: MetricKind::ALL.into_iter().map(MetricSlot::new).collect(),
            optimized_query: String::new(),
            index_statements: Vec::new(),
            plan_lines: Vec::new(),
            summary: String::new(),
            suggestions: Vec::new(),
            score: None,
            generation: 0,
            staged_reveal: config.staged_reveal,
            reveal_delay: config.timings.reveal_delay(),
            emphasis: config.timings.emphasis(),
            analyzer: config.analyzer.clone(),
        }
    }

    pub fn render(&mut self, result: &AnalysisResult, scheduler: &Scheduler) {
        self.generation += 1;
        self.panel = PanelState::Populated;

        for (slot, (kind, value)) in self.metrics.iter_mut().zip(result.metrics()) {
            debug_assert_eq!(slot.kind, kind);
            slot.target = value;
            slot.emphasized = false;
            if self.staged_reveal {
                slot.value = PLACEHOLDER.to_string();
            } else {
                slot.value = slot.target.clone();
            }
        }
        if self.staged_reveal {
            for metric in MetricKind::ALL {
                scheduler.after(
                    self.reveal_delay,
                    Message::MetricRevealed {
                        generation: self.generation,
                        metric,
                    },
                );
            }
        }

        self.optimized_query = result.optimized_query_text.clone();
        self.index_statements = result
            .recommendations
            .iter()
            .map(|r| r.to_sql())
            .collect();
        self.plan_lines = flatten_plan(&result.plan.root, &self.analyzer);
        self.summary = result.analysis.summary.clone();
        self.suggestions = result
            .analysis
            .sorted_suggestions()
            .into_iter()
            .cloned()
            .collect();
        self.score = Some(result.analysis.performance_score);

        tracing::debug!(
            generation = self.generation,
            plan_nodes = self.plan_lines.len(),
            staged = self.staged_reveal,
            "rendered analysis"
        );
    }

    /// Shows the final value of `metric` and starts its emphasis
    pub fn reveal(&mut self, generation: u64, metric: MetricKind, scheduler: &Scheduler) -> bool {
        if generation != self.generation {
            return false;
        }
        let Some(slot) = self.metrics.iter_mut().find(|s| s.kind == metric) else {
            return false;
        };
        slot.value = slot.target.clone();
        slot.emphasized = true;
        scheduler.after(self.emphasis, Message::MetricSettled { generation, metric });
        true
    }

    /// Ends the emphasis on `metric`
    pub fn settle(&mut self, generation: u64, metric: MetricKind) -> bool {
        if generation != self.generation {
            return false;
        }
        match self.metrics.iter_mut().find(|s| s.kind == metric) {
            Some(slot) => {
                slot.emphasized = false;
                true
            }
            None => false,
        }
    }

    /// Text behind a copy button, if there is any to copy
    pub fn copy_text(&self, target: CopyTarget) -> Option<String> {
        if self.panel == PanelState::Empty {
            return None;
        }
        match target {
            CopyTarget::OptimizedQuery => Some(self.optimized_query.clone()),
            CopyTarget::IndexStatements if self.index_statements.is_empty() => None,
            CopyTarget::IndexStatements => Some(self.index_statements.join("\n")),
        }
    }

    pub fn panel(&self) -> PanelState {
        self.panel
    }

    pub fn metrics(&self) -> &[MetricSlot] {
        &self.metrics
    }

    pub fn metric(&self, kind: MetricKind) -> Option<&MetricSlot> {
        self.metrics.iter().find(|s| s.kind == kind)
    }

    pub fn optimized_query(&self) -> &str {
        &self.optimized_query
    }

    pub fn index_statements(&self) -> &[String] {
        &self.index_statements
    }

    pub fn plan_lines(&self) -> &[PlanLine] {
        &self.plan_lines
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn score(&self) -> Option<u8> {
        self.score
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
