//! Plain-text rendering of the workbench for terminal output

use std::fmt::Write as _;

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use qopt_core::Severity;
use qopt_workbench::{CopyTarget, PanelState, Workbench};

const QUERY_PREVIEW_CHARS: usize = 60;

/// Renders the navigation bar, the active view and the notification stack
pub fn render(workbench: &Workbench) -> String {
    let mut out = String::new();
    render_nav(workbench, &mut out);

    match workbench.router().active() {
        "history" => render_history(workbench, &mut out),
        "indexes" => render_indexes(workbench, &mut out),
        "settings" => render_settings(workbench, &mut out),
        _ => render_analyzer(workbench, &mut out),
    }

    render_notifications(workbench, &mut out);
    out
}

fn render_nav(workbench: &Workbench, out: &mut String) {
    let items: Vec<String> = workbench
        .router()
        .nav_items()
        .into_iter()
        .map(|view| {
            if view.active {
                format!("[{}]", view.title)
            } else {
                view.title
            }
        })
        .collect();
    let _ = writeln!(out, "QueryOptim  {}\n", items.join("  "));
}

fn render_analyzer(workbench: &Workbench, out: &mut String) {
    let stats = workbench.input_stats();
    let gutter_width = workbench.input().gutter().len().to_string().len();
    for (marker, line) in workbench.input().gutter().iter().zip(workbench.query().split('\n')) {
        let _ = writeln!(out, "{marker:>gutter_width$} │ {line}");
    }
    let trigger = workbench.controller().trigger();
    let _ = writeln!(
        out,
        "{} lines · {} chars    [ {} ]{}    backend: {}\n",
        stats.line_count,
        stats.char_count,
        trigger.label,
        if trigger.enabled { "" } else { " (disabled)" },
        workbench.controller().backend_name()
    );

    let renderer = workbench.renderer();
    if renderer.panel() == PanelState::Empty {
        out.push_str("No analysis yet. Enter a query and press Analyze.\n");
        return;
    }

    let mut metrics = Table::new();
    metrics
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(renderer.metrics().iter().map(|slot| Cell::new(slot.label())));
    metrics.add_row(renderer.metrics().iter().map(|slot| {
        let value = if slot.emphasized {
            format!("{} *", slot.value)
        } else {
            slot.value.clone()
        };
        Cell::new(value).set_alignment(CellAlignment::Center)
    }));
    let _ = writeln!(out, "{metrics}\n");

    let button = workbench.clipboard().button(CopyTarget::OptimizedQuery);
    let _ = writeln!(out, "Optimized Query  [{}]", button.label);
    let _ = writeln!(out, "{}\n", renderer.optimized_query());

    out.push_str("Query Plan\n");
    for line in renderer.plan_lines() {
        let indent = "   ".repeat(line.depth);
        let branch = if line.depth == 0 { "" } else { "└─ " };
        let marker = if line.warning { "  ⚠" } else { "" };
        let _ = writeln!(
            out,
            "{indent}{branch}{}  ({}){marker}",
            line.label,
            line.stats_text()
        );
        if let Some(detail) = &line.detail {
            let pad = if line.depth == 0 { "" } else { "   " };
            let _ = writeln!(out, "{indent}{pad}   {detail}");
        }
    }

    if let Some(score) = renderer.score() {
        let _ = writeln!(out, "\nPerformance score: {score}/100");
    }
    if !renderer.summary().is_empty() {
        let _ = writeln!(out, "{}", renderer.summary());
    }
    for suggestion in renderer.suggestions() {
        let _ = writeln!(
            out,
            "  [{}] {}",
            suggestion.severity.as_str(),
            suggestion.message
        );
    }
}

fn render_history(workbench: &Workbench, out: &mut String) {
    let history = workbench.history();
    if history.is_empty() {
        out.push_str("No analyses yet.\n");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Finished", "Status", "Duration", "Cost", "Query"]);
    for entry in history.entries() {
        let status = match &entry.error {
            None => "ok".to_string(),
            Some(error) => format!("failed: {error}"),
        };
        let cost = entry
            .cost_estimate
            .map(qopt_analyzer::format_cost)
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(entry.analyzed_at.format("%H:%M:%S")),
            Cell::new(status),
            Cell::new(format!("{}ms", entry.duration_ms)).set_alignment(CellAlignment::Right),
            Cell::new(cost).set_alignment(CellAlignment::Right),
            Cell::new(preview(&entry.sql)),
        ]);
    }
    let _ = writeln!(out, "{table}");
}

fn render_indexes(workbench: &Workbench, out: &mut String) {
    let statements = workbench.renderer().index_statements();
    if statements.is_empty() {
        out.push_str("No index recommendations.\n");
        return;
    }
    let button = workbench.clipboard().button(CopyTarget::IndexStatements);
    let _ = writeln!(out, "Recommended Indexes  [{}]", button.label);
    for statement in statements {
        let _ = writeln!(out, "{statement}");
    }
}

fn render_settings(workbench: &Workbench, out: &mut String) {
    match toml::to_string_pretty(workbench.config()) {
        Ok(text) => out.push_str(&text),
        Err(err) => {
            let _ = writeln!(out, "Could not display settings: {err}");
        }
    }
}

fn render_notifications(workbench: &Workbench, out: &mut String) {
    let notifications = workbench.notifications().entries();
    if notifications.is_empty() {
        return;
    }
    out.push('\n');
    for notification in notifications {
        let icon = match notification.severity {
            Severity::Success => "✓",
            Severity::Error => "✗",
            Severity::Warning => "!",
            Severity::Info => "i",
        };
        let _ = writeln!(out, "{icon} {}", notification.message);
    }
}

/// First line of `sql`, shortened for table cells
fn preview(sql: &str) -> String {
    let first_line = sql.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let multi_line = sql.trim().lines().count() > 1;
    if first_line.chars().count() > QUERY_PREVIEW_CHARS {
        let truncated: String = first_line.chars().take(QUERY_PREVIEW_CHARS - 3).collect();
        format!("{truncated}...")
    } else if multi_line {
        format!("{first_line} ...")
    } else {
        first_line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qopt_workbench::{FixtureBackend, MemoryClipboard, Message, WorkbenchConfig};
    use std::sync::Arc;

    fn workbench() -> Workbench {
        let config = WorkbenchConfig::default();
        let backend = Arc::new(FixtureBackend::from_config(&config));
        Workbench::new(config, backend, Arc::new(MemoryClipboard::new())).unwrap()
    }

    async fn analyzed(query: &str) -> Workbench {
        let mut workbench = workbench();
        workbench.dispatch(Message::InputChanged(query.into()));
        workbench.dispatch(Message::Submit);
        workbench.run_until(|wb| wb.result().is_some()).await;
        workbench
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_workbench() {
        let screen = render(&workbench());
        assert!(screen.starts_with("QueryOptim  [Query Analyzer]  History"));
        assert!(screen.contains("1 lines · 0 chars    [ Analyze Query → ]    backend: fixture\n"));
        assert!(screen.contains("No analysis yet."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyzed_workbench() {
        let mut workbench = analyzed("SELECT *\nFROM t").await;
        workbench
            .run_until(|wb| {
                wb.renderer()
                    .metrics()
                    .iter()
                    .all(|m| m.is_revealed() && !m.emphasized)
            })
            .await;

        let screen = render(&workbench);
        assert!(screen.contains("1 │ SELECT *\n2 │ FROM t\n"));
        assert!(screen.contains("142ms"));
        assert!(screen.contains("Optimized Query  [Copy]"));
        assert!(screen.contains("Limit  (Cost: 1,247 | Rows: 100)\n"));
        assert!(screen.contains(
            "            └─ Seq Scan on users  (Cost: 523 | Rows: 2,340,000)  ⚠\n"
        ));
        assert!(screen.contains("✓ Analysis complete!"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_and_index_views() {
        let mut workbench = analyzed("SELECT 1").await;

        workbench.dispatch(Message::Navigate("history".into()));
        let history = render(&workbench);
        assert!(history.contains("[History]"));
        assert!(history.contains("SELECT 1"));
        assert!(history.contains("1,247"));

        workbench.dispatch(Message::Navigate("indexes".into()));
        let indexes = render(&workbench);
        assert!(indexes.contains("CREATE INDEX idx_orders_user_id ON orders(user_id);"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_view_shows_config() {
        let mut workbench = workbench();
        workbench.dispatch(Message::Navigate("settings".into()));
        let screen = render(&workbench);
        assert!(screen.contains("staged_reveal = true"));
        assert!(screen.contains("reveal_delay_ms = 300"));
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("SELECT 1"), "SELECT 1");
        assert_eq!(preview("\n  SELECT *\n  FROM t"), "SELECT * ...");
        let long = format!("SELECT {}", "x".repeat(100));
        assert_eq!(preview(&long).chars().count(), QUERY_PREVIEW_CHARS);
    }
}
