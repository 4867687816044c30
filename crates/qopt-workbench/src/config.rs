//! Workbench configuration

use qopt_analyzer::AnalyzerConfig;
use qopt_core::{QoptError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbenchConfig {
    /// Clear metric slots and fill them after `reveal_delay_ms`
    pub staged_reveal: bool,
    pub history_limit: usize,
    pub timings: Timings,
    /// Top-level views in navigation order. The first one starts active.
    pub views: Vec<ViewConfig>,
    pub analyzer: AnalyzerConfig,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            staged_reveal: true,
            history_limit: 100,
            timings: Timings::default(),
            views: vec![
                ViewConfig::new("analyzer", "Query Analyzer"),
                ViewConfig::new("history", "History"),
                ViewConfig::new("indexes", "Index Advisor"),
                ViewConfig::new("settings", "Settings"),
            ],
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl WorkbenchConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| QoptError::Configuration(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loaded workbench config");
        Self::from_toml_str(&content)
    }

    /// `<config_dir>/qopt/config.toml`, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("qopt").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.views.is_empty() {
            return Err(QoptError::Configuration(
                "at least one view must be configured".into(),
            ));
        }

        let mut seen = HashSet::new();
        for view in &self.views {
            if view.id.trim().is_empty() {
                return Err(QoptError::Configuration("view id must not be empty".into()));
            }
            if !seen.insert(view.id.as_str()) {
                return Err(QoptError::Configuration(format!(
                    "duplicate view id '{}'",
                    view.id
                )));
            }
        }

        if self.history_limit == 0 {
            return Err(QoptError::Configuration(
                "history_limit must be greater than zero".into(),
            ));
        }

        if self.timings.analysis_timeout_ms == 0 {
            return Err(QoptError::Configuration(
                "analysis_timeout_ms must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Delays in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Simulated latency of the fixture backend
    pub analysis_latency_ms: u64,
    pub analysis_timeout_ms: u64,
    pub reveal_delay_ms: u64,
    pub emphasis_ms: u64,
    pub notification_display_ms: u64,
    pub notification_exit_ms: u64,
    pub copy_feedback_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            analysis_latency_ms: 1500,
            analysis_timeout_ms: 30_000,
            reveal_delay_ms: 300,
            emphasis_ms: 200,
            notification_display_ms: 3000,
            notification_exit_ms: 300,
            copy_feedback_ms: 2000,
        }
    }
}

impl Timings {
    pub fn analysis_latency(&self) -> Duration {
        Duration::from_millis(self.analysis_latency_ms)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_millis(self.analysis_timeout_ms)
    }

    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }

    pub fn emphasis(&self) -> Duration {
        Duration::from_millis(self.emphasis_ms)
    }

    pub fn notification_display(&self) -> Duration {
        Duration::from_millis(self.notification_display_ms)
    }

    pub fn notification_exit(&self) -> Duration {
        Duration::from_millis(self.notification_exit_ms)
    }

    pub fn copy_feedback(&self) -> Duration {
        Duration::from_millis(self.copy_feedback_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub id: String,
    pub title: String,
}

impl ViewConfig {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}
