//! Terminal styling: spinners, status tags, titles and table styles.

use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tabled::settings::{Style, Width};

use crate::cli::StyleMode;

const SPINNER_FRAMES: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const SPINNER_TICK: Duration = Duration::from_millis(80);
const FALLBACK_WIDTH: usize = 80;

/// A stderr spinner for a slow operation.
///
/// `None` when quiet or when stderr is not a terminal, so piped runs stay
/// clean.
pub fn operation_spinner(message: &str, quiet: bool) -> Option<ProgressBar> {
    if quiet || !io::stderr().is_terminal() {
        return None;
    }
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_FRAMES);

    let pb = ProgressBar::new_spinner().with_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(SPINNER_TICK);
    Some(pb)
}

pub fn format_success(message: &str, no_color: bool) -> String {
    if no_color {
        format!("[OK] {message}")
    } else {
        format!("{} {message}", "[OK]".green())
    }
}

pub fn format_warning(message: &str, no_color: bool) -> String {
    if no_color {
        format!("[!!] {message}")
    } else {
        format!("{} {message}", "[!!]".yellow())
    }
}

/// A title followed by a heavy rule of the same width.
pub fn format_title(title: &str, no_color: bool) -> String {
    let rule = "━".repeat(title.chars().count());
    if no_color {
        format!("{title}\n{rule}")
    } else {
        format!("{}\n{}", title.bold(), rule.dimmed())
    }
}

pub fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(width, _)| usize::from(width.0))
        .unwrap_or(FALLBACK_WIDTH)
}

/// Rounded borders truncated to the terminal in rich mode, no borders in
/// plain mode.
pub fn apply_table_style(table: &mut tabled::Table, style: StyleMode) {
    match style {
        StyleMode::Rich => {
            table
                .with(Style::rounded())
                .with(Width::truncate(terminal_width()));
        }
        StyleMode::Plain => {
            table.with(Style::blank());
        }
    }
}
