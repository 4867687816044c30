//! QueryOptim Workbench - Headless state for the query optimizer shell
//!
//! The workbench owns every interactive component and mutates them from a
//! single dispatch loop:
//!
//! - `ViewRouter` - Exclusive top-level view selection
//! - `InputStatsTracker` - Line/character counts and the line-number gutter
//! - `AnalysisController` - `Idle -> Analyzing -> Idle` around a backend call
//! - `ResultRenderer` - Metrics with staged reveal, optimized query, plan tree
//! - `NotificationCenter` - Stacked, auto-dismissing messages
//! - `ClipboardHelper` - Copy buttons with transient confirmation
//!
//! Timers and backend calls run as tasks on the tokio runtime and report
//! back through `Message`s, so nothing outside `Workbench::dispatch` touches
//! component state.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use qopt_workbench::{
//!     FixtureBackend, MemoryClipboard, Message, Workbench, WorkbenchConfig,
//! };
//!
//! # async fn run() -> qopt_core::Result<()> {
//! let config = WorkbenchConfig::default();
//! let backend = Arc::new(FixtureBackend::from_config(&config));
//! let mut workbench = Workbench::new(config, backend, Arc::new(MemoryClipboard::new()))?;
//!
//! workbench.dispatch(Message::InputChanged("SELECT 1".into()));
//! workbench.dispatch(Message::Submit);
//! workbench.settle().await;
//!
//! assert!(workbench.result().is_some());
//! # Ok(())
//! # }
//! ```

mod backend;
mod clipboard;
mod config;
mod controller;
mod history;
mod input_stats;
mod message;
mod notifications;
mod renderer;
mod task;
mod view_router;
mod workbench;

pub use backend::*;
pub use clipboard::*;
pub use config::*;
pub use controller::*;
pub use history::*;
pub use input_stats::*;
pub use message::*;
pub use notifications::*;
pub use renderer::*;
pub use task::*;
pub use view_router::*;
pub use workbench::*;
