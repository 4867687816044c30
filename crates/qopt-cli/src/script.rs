//! Session scripts: replayable sequences of UI events
//!
//! One step per line, `#` starts a comment:
//!
//! ```text
//! input SELECT *\nFROM users
//! key ctrl+enter
//! wait 1500
//! view history
//! copy query
//! settle
//! ```

use std::time::Duration;

use anyhow::{Context, Result, bail};
use qopt_workbench::{CopyTarget, KeyPress, Message, Workbench};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Input(String),
    Submit,
    Key(KeyPress),
    View(String),
    Copy(CopyTarget),
    /// Let timers run for this long
    Wait(Duration),
    /// Run until nothing is pending
    Settle,
}

impl Step {
    fn into_message(self) -> Option<Message> {
        match self {
            Self::Input(text) => Some(Message::InputChanged(text)),
            Self::Submit => Some(Message::Submit),
            Self::Key(key) => Some(Message::KeyPressed(key)),
            Self::View(id) => Some(Message::Navigate(id)),
            Self::Copy(target) => Some(Message::Copy(target)),
            Self::Wait(_) | Self::Settle => None,
        }
    }
}

pub fn parse_script(source: &str) -> Result<Vec<Step>> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| parse_step(line.trim()).with_context(|| format!("line {}", i + 1)))
        .collect()
}

fn parse_step(line: &str) -> Result<Step> {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    let step = match command {
        "input" => Step::Input(unescape(rest)),
        "submit" => Step::Submit,
        "key" => Step::Key(parse_key(rest)?),
        "view" if !rest.is_empty() => Step::View(rest.to_string()),
        "copy" => Step::Copy(match rest {
            "query" => CopyTarget::OptimizedQuery,
            "indexes" => CopyTarget::IndexStatements,
            other => bail!("unknown copy target '{other}' (expected 'query' or 'indexes')"),
        }),
        "wait" => {
            let ms: u64 = rest
                .trim_end_matches("ms")
                .parse()
                .with_context(|| format!("invalid wait duration '{rest}'"))?;
            Step::Wait(Duration::from_millis(ms))
        }
        "settle" => Step::Settle,
        "view" => bail!("view needs a view id"),
        other => bail!("unknown step '{other}'"),
    };
    Ok(step)
}

/// `ctrl+enter`, `enter`, `ctrl+a`
fn parse_key(spec: &str) -> Result<KeyPress> {
    let mut parts: Vec<&str> = spec.split('+').map(str::trim).collect();
    let Some(key) = parts.pop().filter(|k| !k.is_empty()) else {
        bail!("key needs a key name");
    };
    let key = if key.eq_ignore_ascii_case("enter") {
        "Enter"
    } else {
        key
    };

    let mut press = KeyPress::new(key);
    for modifier in parts {
        match modifier.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => press = press.with_ctrl(),
            other => bail!("unsupported modifier '{other}'"),
        }
    }
    Ok(press)
}

/// Interprets `\n`, `\t` and `\\` so multi-line queries fit on one line
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Applies every step in order
pub async fn replay(workbench: &mut Workbench, steps: Vec<Step>) {
    for step in steps {
        tracing::debug!(?step, "replaying step");
        match step {
            Step::Wait(duration) => workbench.run_for(duration).await,
            Step::Settle => workbench.settle().await,
            other => {
                if let Some(message) = other.into_message() {
                    workbench.dispatch(message);
                }
            }
        }
    }
}
