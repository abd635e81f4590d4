//! # Output Rendering
//!
//! Terminal rendering for the CLI: when to use color and emoji, and how a
//! plan or a consistency report is laid out for a human reader.
//!
//! ## Respecting User Preferences
//!
//! Color is decided once from the `--color=never|always|auto` flag and the
//! environment:
//! - `NO_COLOR` disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` disables colors
//! - `CLICOLOR_FORCE=1` forces colors even when stdout is not a terminal
//! - `TERM=dumb` disables colors
//!
//! ## Usage
//!
//! ```
//! use errata_scheduler::output::{emoji, OutputConfig};
//!
//! let config = OutputConfig::from_env_and_flag("never");
//! assert_eq!(emoji(&config, "✅", "[OK]"), "[OK]");
//! ```

use std::env;
use std::fmt::Write;

use console::style;

use crate::phases::replay::{ConsistencyReport, FindingKind};
use crate::plan::Plan;

/// Whether colors and emoji are used.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolve the `--color` flag against the environment.
    ///
    /// `always` and `never` win outright; anything else means auto-detect.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
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
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// The emoji when colors are on, the plain marker otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

fn paint_kind(config: &OutputConfig, kind: FindingKind) -> String {
    let label = kind.to_string();
    if !config.use_color {
        return label;
    }
    match kind {
        FindingKind::GoesBackwards | FindingKind::RemovesPackage => {
            style(label).red().bold().to_string()
        }
        FindingKind::Duplicate | FindingKind::ReusesPackage => style(label).yellow().to_string(),
        _ => style(label).magenta().to_string(),
    }
}

/// Every bucket with its packages and advisories, one block per bucket.
pub fn render_plan(config: &OutputConfig, plan: &Plan) -> String {
    let mut out = String::new();
    for (key, packages) in plan.buckets() {
        let title = plan.update_detail_message(key);
        let heading = title.lines().next().unwrap_or_default();
        let heading = if config.use_color {
            style(heading).bold().to_string()
        } else {
            heading.to_string()
        };
        let _ = writeln!(out, "{} {}", emoji(config, "📦", "*"), heading);
        for detail in plan.update_detail(key) {
            let _ = writeln!(out, "    {}: {}", detail.name, detail.summary);
        }
        for nevra in packages {
            let forced = if plan.is_forced(key, nevra) { " (forced)" } else { "" };
            let _ = writeln!(out, "    - {}{}", nevra, forced);
        }
    }
    out
}

/// Findings grouped by kind, each followed by its suggested directive.
pub fn render_report(config: &OutputConfig, report: &ConsistencyReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} Consistency check failed with {} findings",
        emoji(config, "❌", "[FAIL]"),
        report.len()
    );
    for (kind, findings) in report.by_kind() {
        let _ = writeln!(out, "\n{} ({})", paint_kind(config, kind), findings.len());
        for finding in findings {
            let _ = writeln!(out, "  {}", finding);
            let _ = writeln!(out, "    suggest: {}", finding.suggestion());
        }
    }
    out
}
