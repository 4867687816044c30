//! Exclusive selection of the top-level view

use qopt_core::{QoptError, Result};

use crate::config::ViewConfig;

/// A top-level panel together with its navigation entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub id: String,
    pub title: String,
    pub active: bool,
}

/// Tracks which view is shown
///
/// The active view is stored as a single index, so exactly one view (and its
/// nav indicator) is active at any time.
#[derive(Debug, Clone)]
pub struct ViewRouter {
    views: Vec<ViewConfig>,
    active: usize,
}

impl ViewRouter {
    /// Builds a router over `views`, with the first one active
    pub fn new(views: &[ViewConfig]) -> Result<Self> {
        if views.is_empty() {
            return Err(QoptError::Configuration(
                "at least one view must be configured".into(),
            ));
        }
        for (i, view) in views.iter().enumerate() {
            if views[..i].iter().any(|other| other.id == view.id) {
                return Err(QoptError::Configuration(format!(
                    "duplicate view id '{}'",
                    view.id
                )));
            }
        }

        Ok(Self {
            views: views.to_vec(),
            active: 0,
        })
    }

    /// Switches to `view_id`. An unknown id leaves the router unchanged.
    pub fn activate(&mut self, view_id: &str) -> Result<()> {
        let index = self
            .views
            .iter()
            .position(|view| view.id == view_id)
            .ok_or_else(|| QoptError::UnknownView(view_id.to_string()))?;

        if index != self.active {
            tracing::debug!(from = %self.views[self.active].id, to = %view_id, "switching view");
        }
        self.active = index;
        Ok(())
    }

    pub fn active(&self) -> &str {
        &self.views[self.active].id
    }

    pub fn active_title(&self) -> &str {
        &self.views[self.active].title
    }

    pub fn is_active(&self, view_id: &str) -> bool {
        self.active() == view_id
    }

    /// Navigation entries in configured order
    pub fn nav_items(&self) -> Vec<View> {
        self.views
            .iter()
            .enumerate()
            .map(|(i, view)| View {
                id: view.id.clone(),
                title: view.title.clone(),
                active: i == self.active,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
