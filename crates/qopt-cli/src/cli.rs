//! `qopt` - analyze SQL queries from the terminal

mod logging;
mod screen;
mod script;

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use qopt_analyzer::DEMO_QUERY;
use qopt_workbench::{
    AnalysisBackend, ClipboardWriter, CopyTarget, ExplainBackend, FixtureBackend, MemoryClipboard,
    Message, Osc52Clipboard, Workbench, WorkbenchConfig,
};

use crate::logging::{LoggingConfig, TimingGuard};

#[derive(Parser)]
#[command(name = "qopt")]
#[command(about = "Analyze SQL query plans and recommend indexes", long_about = None)]
#[command(version)]
struct Cli {
    /// Workbench config file (defaults to <config dir>/qopt/config.toml)
    #[arg(long, global = true, env = "QOPT_CONFIG")]
    config: Option<PathBuf>,

    /// More log output on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write JSON logs to the log directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a query given inline, from a file, or on stdin
    Analyze(AnalyzeArgs),
    /// Analyze the built-in sample query
    Demo(OutputArgs),
    /// Replay a script of UI events and print the final screen
    Session {
        #[arg(long)]
        script: PathBuf,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// SQL to analyze
    query: Option<String>,

    /// Read the SQL from a file
    #[arg(long, conflicts_with = "query")]
    file: Option<PathBuf>,

    /// Analyze a captured `EXPLAIN (FORMAT JSON)` plan instead of the fixture
    #[arg(long)]
    explain: Option<PathBuf>,

    /// Copy the optimized query to the terminal clipboard (OSC 52)
    #[arg(long)]
    copy: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct OutputArgs {
    /// Print the analysis result as JSON
    #[arg(long)]
    json: bool,

    /// Show metrics immediately instead of after the reveal delay
    #[arg(long)]
    no_reveal: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match logging::init(
        LoggingConfig::for_verbosity(cli.verbose).with_json_logs(cli.log_file),
    ) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: logging disabled: {e:#}");
            None
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Analyze(args) => {
            let query = read_query(args.query, args.file.as_deref())?;
            let backend: Arc<dyn AnalysisBackend> = match &args.explain {
                Some(path) => {
                    let output = std::fs::read_to_string(path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    Arc::new(ExplainBackend::from_explain_json(&output, config.analyzer.clone())?)
                }
                None => Arc::new(FixtureBackend::from_config(&config)),
            };
            let clipboard: Arc<dyn ClipboardWriter> = if args.copy {
                Arc::new(Osc52Clipboard::stdout())
            } else {
                Arc::new(MemoryClipboard::new())
            };
            if args.output.no_reveal {
                config.staged_reveal = false;
            }
            analyze(config, backend, clipboard, &query, args.copy, &args.output).await
        }
        Command::Demo(output) => {
            if output.no_reveal {
                config.staged_reveal = false;
            }
            let backend = Arc::new(FixtureBackend::from_config(&config));
            analyze(
                config,
                backend,
                Arc::new(MemoryClipboard::new()),
                DEMO_QUERY,
                false,
                &output,
            )
            .await
        }
        Command::Session { script: path } => {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let steps = script::parse_script(&source)
                .with_context(|| format!("invalid script {}", path.display()))?;

            let backend = Arc::new(FixtureBackend::from_config(&config));
            let mut workbench = Workbench::new(config, backend, Arc::new(MemoryClipboard::new()))?;
            script::replay(&mut workbench, steps).await;
            print!("{}", screen::render(&workbench));
            workbench.teardown();
            Ok(())
        }
    }
}

async fn analyze(
    config: WorkbenchConfig,
    backend: Arc<dyn AnalysisBackend>,
    clipboard: Arc<dyn ClipboardWriter>,
    query: &str,
    copy: bool,
    output: &OutputArgs,
) -> Result<()> {
    let _timer = TimingGuard::new("analyze");
    let mut workbench = Workbench::new(config, backend, clipboard)?;

    workbench.dispatch(Message::InputChanged(query.to_string()));
    workbench.dispatch(Message::Submit);
    workbench
        .run_until(|wb| !wb.controller().is_analyzing())
        .await;

    if workbench.result().is_none() {
        let reason = workbench
            .notifications()
            .entries()
            .last()
            .map(|n| n.message.clone())
            .unwrap_or_else(|| "analysis did not complete".to_string());
        workbench.teardown();
        bail!(reason);
    }

    if output.json {
        println!("{}", serde_json::to_string_pretty(&workbench.result())?);
        workbench.teardown();
        return Ok(());
    }

    // Let the staged reveal finish so the metrics show their values
    workbench
        .run_until(|wb| wb.renderer().metrics().iter().all(|m| m.is_revealed()))
        .await;

    if copy {
        let notifications = workbench.notifications().len();
        workbench.dispatch(Message::Copy(CopyTarget::OptimizedQuery));
        workbench
            .run_until(|wb| {
                wb.clipboard().button(CopyTarget::OptimizedQuery).is_confirmed()
                    || wb.notifications().len() > notifications
            })
            .await;
    }

    print!("{}", screen::render(&workbench));
    workbench.teardown();
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<WorkbenchConfig> {
    if let Some(path) = path {
        return WorkbenchConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }
    match WorkbenchConfig::default_path() {
        Some(path) if path.exists() => WorkbenchConfig::load(&path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        _ => Ok(WorkbenchConfig::default()),
    }
}

fn read_query(inline: Option<String>, file: Option<&Path>) -> Result<String> {
    if let Some(query) = inline {
        return Ok(query);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }

    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        bail!("no query given; pass it as an argument, with --file, or on stdin");
    }
    let mut query = String::new();
    stdin
        .read_to_string(&mut query)
        .context("failed to read query from stdin")?;
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from([
            "qopt",
            "-vv",
            "analyze",
            "SELECT 1",
            "--explain",
            "plan.json",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.query.as_deref(), Some("SELECT 1"));
        assert_eq!(args.explain, Some(PathBuf::from("plan.json")));
        assert!(args.output.json);
        assert!(!args.copy);
    }

    #[test]
    fn test_query_and_file_conflict() {
        assert!(Cli::try_parse_from(["qopt", "analyze", "SELECT 1", "--file", "q.sql"]).is_err());
    }

    #[test]
    fn test_read_query_prefers_inline_then_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "SELECT * FROM t").unwrap();

        assert_eq!(
            read_query(Some("SELECT 1".into()), Some(file.path())).unwrap(),
            "SELECT 1"
        );
        assert_eq!(read_query(None, Some(file.path())).unwrap(), "SELECT * FROM t");
    }

    #[test]
    fn test_load_config_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "staged_reveal = false").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert!(!config.staged_reveal);

        let err = load_config(Some(Path::new("/nonexistent/qopt.toml"))).unwrap_err();
        assert!(format!("{err:#}").starts_with("failed to load config from"));
    }
}
