//! Line/character statistics for the query buffer and the gutter beside it

use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputStats {
    pub line_count: usize,
    /// Unicode scalar values, not bytes
    pub char_count: usize,
}

impl InputStats {
    pub fn of(text: &str) -> Self {
        Self {
            line_count: line_count(text),
            char_count: text.chars().count(),
        }
    }
}

impl Default for InputStats {
    fn default() -> Self {
        Self::of("")
    }
}

/// Number of `'\n'`-delimited segments. Always at least 1.
pub fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

/// How the gutter changed during reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GutterChange {
    Unchanged,
    Appended(RangeInclusive<usize>),
    Removed(RangeInclusive<usize>),
}

#[derive(Debug, Clone)]
pub struct InputStatsTracker {
    stats: InputStats,
    gutter: Vec<usize>,
}

impl InputStatsTracker {
    pub fn new() -> Self {
        Self {
            stats: InputStats::default(),
            gutter: vec![1],
        }
    }

    /// Recomputes statistics for `text` and brings the gutter in line
    pub fn on_input_changed(&mut self, text: &str) -> InputStats {
        self.stats = InputStats::of(text);
        self.reconcile_gutter(self.stats.line_count);
        self.stats
    }

    /// Appends or trims markers so there are exactly `lines` of them
    ///
    /// Existing markers are kept in place; only the tail changes.
    pub fn reconcile_gutter(&mut self, lines: usize) -> GutterChange {
        let current = self.gutter.len();
        if lines > current {
            self.gutter.extend(current + 1..=lines);
            GutterChange::Appended(current + 1..=lines)
        } else if lines < current {
            self.gutter.truncate(lines);
            GutterChange::Removed(lines + 1..=current)
        } else {
            GutterChange::Unchanged
        }
    }

    pub fn stats(&self) -> InputStats {
        self.stats
    }

    /// Line-number markers, `1..=n`
    pub fn gutter(&self) -> &[usize] {
        &self.gutter
    }
}

impl Default for InputStatsTracker {
    fn default() -> Self {
        Self::new()
    }
}
