//! End-to-end workbench scenarios on a paused clock

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use qopt_analyzer::{AnalysisResult, MetricKind};
use qopt_core::{QoptError, Severity};
use qopt_workbench::{
    AnalysisBackend, AnalysisState, CopyTarget, FixtureBackend, KeyPress, MemoryClipboard,
    Message, NotificationPhase, PanelState, Workbench, WorkbenchConfig, ANALYSIS_COMPLETE,
    COPIED_LABEL, COPY_LABEL, IDLE_LABEL,
};
use tokio::time::Instant;

fn workbench_with(config: WorkbenchConfig, clipboard: Arc<MemoryClipboard>) -> Workbench {
    let backend = Arc::new(FixtureBackend::from_config(&config));
    Workbench::new(config, backend, clipboard).unwrap()
}

fn workbench() -> Workbench {
    workbench_with(WorkbenchConfig::default(), Arc::new(MemoryClipboard::new()))
}

fn severities(workbench: &Workbench) -> Vec<Severity> {
    workbench
        .notifications()
        .entries()
        .iter()
        .map(|n| n.severity)
        .collect()
}

struct FailingBackend;

#[async_trait]
impl AnalysisBackend for FailingBackend {
    async fn submit_query(&self, _sql: &str) -> qopt_core::Result<AnalysisResult> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Err(QoptError::Backend("connection refused".into()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

#[tokio::test(start_paused = true)]
async fn input_stats_follow_the_editor() {
    let mut workbench = workbench();

    workbench.dispatch(Message::InputChanged("SELECT 1".into()));
    assert_eq!(workbench.input_stats().line_count, 1);
    assert_eq!(workbench.input_stats().char_count, 8);

    workbench.dispatch(Message::InputChanged("a\nb\nc".into()));
    assert_eq!(workbench.input_stats().line_count, 3);
    assert_eq!(workbench.input().gutter(), &[1, 2, 3]);

    workbench.dispatch(Message::InputChanged("a".into()));
    assert_eq!(workbench.input().gutter(), &[1]);
}

#[tokio::test(start_paused = true)]
async fn empty_submit_warns_without_transition() {
    let mut workbench = workbench();

    workbench.dispatch(Message::InputChanged("   \n ".into()));
    workbench.dispatch(Message::Submit);

    assert_eq!(workbench.controller().state(), AnalysisState::Idle);
    assert!(workbench.controller().trigger().enabled);
    assert_eq!(severities(&workbench), vec![Severity::Warning]);
    assert_eq!(
        workbench.notifications().entries()[0].message,
        "Please enter a SQL query"
    );

    workbench.settle().await;
    assert!(workbench.result().is_none());
    assert_eq!(workbench.renderer().panel(), PanelState::Empty);
    assert!(workbench.history().is_empty());
    assert!(workbench.notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn submit_runs_full_analysis_cycle() {
    let mut workbench = workbench();
    let start = Instant::now();

    workbench.dispatch(Message::InputChanged("SELECT * FROM t".into()));
    workbench.dispatch(Message::Submit);

    assert!(matches!(
        workbench.controller().state(),
        AnalysisState::Analyzing { .. }
    ));
    assert!(!workbench.controller().trigger().enabled);
    assert_eq!(workbench.controller().trigger().label, "Analyzing...");

    // Trigger stays disabled for the whole analysis
    let finished = workbench
        .run_until(|wb| {
            assert_eq!(wb.controller().trigger().enabled, !wb.controller().is_analyzing());
            wb.result().is_some()
        })
        .await;
    assert!(finished);
    assert!(start.elapsed() >= Duration::from_millis(1500));

    assert_eq!(workbench.controller().state(), AnalysisState::Idle);
    assert_eq!(workbench.controller().trigger().label, IDLE_LABEL);

    let result = workbench.result().unwrap();
    assert!(result.optimized_query_text.contains("SELECT * FROM t"));
    assert!(
        result
            .optimized_query_text
            .contains("-- Recommended indexes:\n-- CREATE INDEX")
    );
    assert_eq!(severities(&workbench), vec![Severity::Success]);
    assert_eq!(workbench.notifications().entries()[0].message, ANALYSIS_COMPLETE);
    assert_eq!(workbench.renderer().panel(), PanelState::Populated);
    assert_eq!(
        workbench.history().latest().map(|e| e.sql.as_str()),
        Some("SELECT * FROM t")
    );
}

#[tokio::test(start_paused = true)]
async fn metrics_reveal_after_delay() {
    let mut workbench = workbench();
    workbench.dispatch(Message::InputChanged("SELECT 1".into()));
    workbench.dispatch(Message::Submit);

    workbench.run_until(|wb| wb.result().is_some()).await;
    let slot = |wb: &Workbench| wb.renderer().metric(MetricKind::RowsScanned).cloned().unwrap();
    assert_eq!(slot(&workbench).value, "--");

    workbench.run_until(|wb| slot(wb).is_revealed()).await;
    assert_eq!(slot(&workbench).value, "2.3M");
    assert!(slot(&workbench).emphasized);

    workbench.settle().await;
    assert!(!slot(&workbench).emphasized);
    assert!(workbench.notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn submit_during_analysis_is_ignored() {
    let mut workbench = workbench();
    workbench.dispatch(Message::InputChanged("SELECT 1".into()));
    workbench.dispatch(Message::Submit);
    let AnalysisState::Analyzing { ticket } = workbench.controller().state() else {
        panic!("expected analyzing");
    };

    workbench.dispatch(Message::InputChanged("SELECT 2".into()));
    workbench.dispatch(Message::Submit);

    assert_eq!(workbench.controller().state(), AnalysisState::Analyzing { ticket });
    assert!(workbench.notifications().is_empty());

    workbench.run_until(|wb| wb.result().is_some()).await;
    assert_eq!(workbench.history().len(), 1);
    assert_eq!(workbench.history().latest().unwrap().sql, "SELECT 1");
}

#[tokio::test(start_paused = true)]
async fn ctrl_enter_submits() {
    let mut workbench = workbench();
    workbench.dispatch(Message::InputChanged("SELECT 1".into()));

    workbench.dispatch(Message::KeyPressed(KeyPress::new("Enter")));
    assert_eq!(workbench.controller().state(), AnalysisState::Idle);

    workbench.dispatch(Message::KeyPressed(KeyPress::new("Enter").with_ctrl()));
    assert!(workbench.controller().is_analyzing());
}

#[tokio::test(start_paused = true)]
async fn backend_failure_notifies_and_recovers() {
    let config = WorkbenchConfig::default();
    let mut workbench = Workbench::new(
        config,
        Arc::new(FailingBackend),
        Arc::new(MemoryClipboard::new()),
    )
    .unwrap();

    workbench.dispatch(Message::InputChanged("SELECT 1".into()));
    workbench.dispatch(Message::Submit);
    workbench
        .run_until(|wb| !wb.controller().is_analyzing())
        .await;

    assert!(workbench.controller().trigger().enabled);
    assert!(workbench.result().is_none());
    assert_eq!(severities(&workbench), vec![Severity::Error]);
    assert_eq!(
        workbench.notifications().entries()[0].message,
        "Analysis failed: connection refused"
    );
    assert!(!workbench.history().latest().unwrap().is_success());
}

#[tokio::test(start_paused = true)]
async fn slow_backend_times_out() {
    let mut config = WorkbenchConfig::default();
    config.timings.analysis_latency_ms = 10_000;
    config.timings.analysis_timeout_ms = 2_000;
    let mut workbench = workbench_with(config, Arc::new(MemoryClipboard::new()));

    workbench.dispatch(Message::InputChanged("SELECT 1".into()));
    workbench.dispatch(Message::Submit);
    workbench
        .run_until(|wb| !wb.controller().is_analyzing())
        .await;

    assert_eq!(severities(&workbench), vec![Severity::Error]);
    assert!(
        workbench.notifications().entries()[0]
            .message
            .starts_with("Timeout:")
    );
}

#[tokio::test(start_paused = true)]
async fn rapid_notifications_expire_independently() {
    let mut workbench = workbench();

    let first = workbench.notify("Saved", Severity::Info);
    workbench.run_until(|_| false).await;
    assert!(workbench.notifications().is_empty());

    let older = workbench.notify("One", Severity::Info);
    let second = workbench.notify("Two", Severity::Error);
    assert!(older > first);

    let entries = workbench.notifications().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, older);
    assert_eq!(entries[1].id, second);
    assert!(entries.iter().all(|n| n.phase == NotificationPhase::Visible));

    workbench.settle().await;
    assert!(workbench.notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn navigation_is_exclusive_and_ignores_unknown_views() {
    let mut workbench = workbench();

    workbench.dispatch(Message::Navigate("history".into()));
    workbench.dispatch(Message::Navigate("does-not-exist".into()));

    assert_eq!(workbench.router().active(), "history");
    let active: Vec<_> = workbench
        .router()
        .nav_items()
        .into_iter()
        .filter(|v| v.active)
        .map(|v| v.id)
        .collect();
    assert_eq!(active, vec!["history"]);
    assert!(workbench.notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn copy_confirms_then_reverts() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let mut workbench = workbench_with(WorkbenchConfig::default(), clipboard.clone());
    workbench.dispatch(Message::InputChanged("SELECT 1".into()));
    workbench.dispatch(Message::Submit);
    workbench.run_until(|wb| wb.result().is_some()).await;

    workbench.dispatch(Message::Copy(CopyTarget::IndexStatements));
    workbench
        .run_until(|wb| wb.clipboard().button(CopyTarget::IndexStatements).is_confirmed())
        .await;
    assert_eq!(
        workbench.clipboard().button(CopyTarget::IndexStatements).label,
        COPIED_LABEL
    );
    assert!(
        clipboard
            .contents()
            .unwrap()
            .starts_with("CREATE INDEX idx_users_created_at")
    );

    let copied_at = Instant::now();
    workbench
        .run_until(|wb| !wb.clipboard().button(CopyTarget::IndexStatements).is_confirmed())
        .await;
    assert!(copied_at.elapsed() >= Duration::from_millis(2000));
    assert_eq!(
        workbench.clipboard().button(CopyTarget::IndexStatements).label,
        COPY_LABEL
    );
}

#[tokio::test(start_paused = true)]
async fn denied_copy_notifies_error() {
    let mut workbench = workbench_with(
        WorkbenchConfig::default(),
        Arc::new(MemoryClipboard::denying()),
    );
    workbench.dispatch(Message::InputChanged("SELECT 1".into()));
    workbench.dispatch(Message::Submit);
    workbench.run_until(|wb| wb.result().is_some()).await;

    workbench.dispatch(Message::Copy(CopyTarget::OptimizedQuery));
    workbench
        .run_until(|wb| wb.notifications().len() == 2)
        .await;

    assert_eq!(severities(&workbench), vec![Severity::Success, Severity::Error]);
    assert_eq!(
        workbench.clipboard().button(CopyTarget::OptimizedQuery).label,
        COPY_LABEL
    );
}

#[tokio::test(start_paused = true)]
async fn copy_before_any_analysis_does_nothing() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let mut workbench = workbench_with(WorkbenchConfig::default(), clipboard.clone());

    workbench.dispatch(Message::Copy(CopyTarget::OptimizedQuery));
    workbench.settle().await;

    assert_eq!(clipboard.contents(), None);
    assert!(workbench.notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn teardown_cancels_pending_work() {
    let mut workbench = workbench();
    workbench.dispatch(Message::InputChanged("SELECT 1".into()));
    workbench.dispatch(Message::Submit);
    workbench.notify("Hello", Severity::Info);
    assert!(workbench.pending_tasks() > 0);

    workbench.teardown();
    workbench.settle().await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(workbench.is_torn_down());
    assert_eq!(workbench.pending_tasks(), 0);
    assert!(workbench.result().is_none());
    assert_eq!(workbench.controller().state(), AnalysisState::Idle);
    // Nothing dismissed it
    assert_eq!(workbench.notifications().len(), 1);

    workbench.dispatch(Message::Submit);
    assert!(!workbench.controller().is_analyzing());
}

#[tokio::test(start_paused = true)]
async fn run_for_stops_at_the_deadline() {
    let mut workbench = workbench();
    workbench.dispatch(Message::InputChanged("SELECT 1".into()));
    workbench.dispatch(Message::Submit);

    workbench.run_for(Duration::from_millis(1000)).await;
    assert!(workbench.controller().is_analyzing());

    workbench.run_for(Duration::from_millis(600)).await;
    assert!(!workbench.controller().is_analyzing());
    assert!(workbench.result().is_some());
}
