//! # Terminal Output
//!
//! Decides whether the CLI decorates its output with colors and emoji, and
//! provides the markers used in front of status lines.
//!
//! The `--color` flag wins when it is `always` or `never`. In `auto` mode
//! colors are disabled by `NO_COLOR` (any value), `CLICOLOR=0` and
//! `TERM=dumb`, forced by `CLICOLOR_FORCE=1`, and otherwise follow
//! whether stdout is a color-capable terminal.

use std::env;

use console::style;

/// Whether output is decorated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolve the `--color` flag (`always`, `never` or `auto`) against the
    /// environment.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => detect_color_support(),
        };
        Self { use_color }
    }

    pub fn plain() -> Self {
        Self { use_color: false }
    }

    /// The marker shown in front of a status line.
    pub fn marker(&self, marker: Marker) -> &'static str {
        let (decorated, plain) = match marker {
            Marker::Scan => ("🔍", "[SCAN]"),
            Marker::Ok => ("✅", "[OK]"),
            Marker::Warn => ("⚠️ ", "[WARN]"),
            Marker::Err => ("❌", "[ERR]"),
            Marker::Link => ("🔗", "[LINK]"),
            Marker::Plan => ("📋", "[PLAN]"),
        };
        if self.use_color {
            decorated
        } else {
            plain
        }
    }

    /// `text` highlighted as a warning when colors are on.
    pub fn warning(&self, text: &str) -> String {
        if self.use_color {
            style(text).yellow().to_string()
        } else {
            text.to_string()
        }
    }

    /// `text` dimmed when colors are on.
    pub fn dim(&self, text: &str) -> String {
        if self.use_color {
            style(text).dim().to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Status line markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Scan,
    Ok,
    Warn,
    Err,
    Link,
    Plan,
}

fn detect_color_support() -> bool {
    // https://no-color.org/: presence alone disables colors
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
        return false;
    }
    if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
        return true;
    }
    if env::var("TERM").is_ok_and(|v| v == "dumb") {
        return false;
    }
    console::Term::stdout().features().colors_supported()
}
