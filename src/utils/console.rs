// src/utils/console.rs
use std::future::Future;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

const PANEL_MAX_WIDTH: usize = 100;

/// Runs `task` while a spinner with `message` ticks on stderr. The spinner is
/// cleared before the result is returned, and stays hidden when stderr is not a terminal.
pub async fn with_spinner<F: Future>(message: impl Into<String>, task: F) -> F::Output {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg:.green.bold}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"]),
    );
    spinner.enable_steady_tick(Duration::from_millis(90));
    spinner.set_message(message.into());

    let output = task.await;
    spinner.finish_and_clear();
    output
}

pub fn print_error(message: &str) {
    eprintln!("{}", format!("Error: {}", message).red().bold());
}

pub fn print_warning(message: &str) {
    eprintln!("{}", format!("Warning: {}", message).yellow());
}

/// Boxed panel as plain lines. Width follows the longest body line, capped at
/// 100 columns but never narrower than the title.
pub fn render_panel(title: &str, body: &str) -> Vec<String> {
    let title_width = title.chars().count();
    let width = body
        .lines()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0)
        .min(PANEL_MAX_WIDTH)
        .max(title_width + 2);

    let mut lines = Vec::with_capacity(body.lines().count() + 2);
    lines.push(format!("┌─ {} {}", title, "─".repeat(width.saturating_sub(title_width + 1))));
    lines.extend(body.lines().map(|line| format!("│ {}", line)));
    lines.push(format!("└{}", "─".repeat(width + 2)));
    lines
}

pub fn print_panel(title: &str, body: &str) {
    let lines = render_panel(title, body);
    let last = lines.len().saturating_sub(1);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            // Only the title is highlighted, so the plain layout keeps its widths
            println!("{}", line.replacen(title, &title.cyan().bold().to_string(), 1));
        } else if i == last {
            println!("{}", line.dimmed());
        } else {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_frames_body() {
        let lines = render_panel("Report", "first line\nsecond");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "┌─ Report ───");
        assert_eq!(lines[1], "│ first line");
        assert_eq!(lines[2], "│ second");
        assert_eq!(lines[3], format!("└{}", "─".repeat(12)));
    }

    #[test]
    fn test_panel_width_is_capped_and_never_narrower_than_title() {
        let long = "x".repeat(500);
        let lines = render_panel("T", &long);
        assert_eq!(lines.last().map(|l| l.chars().count()), Some(1 + PANEL_MAX_WIDTH + 2));

        let title = "Qualitative Analysis: WDGT";
        let lines = render_panel(title, "");
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("┌─ Qualitative Analysis: WDGT "));
        assert_eq!(lines[1].chars().count(), 1 + title.chars().count() + 2 + 2);
    }

    #[test]
    fn test_spinner_returns_task_output() {
        let value = tokio_test::block_on(with_spinner("Working...", async { 40 + 2 }));
        assert_eq!(value, 42);
    }
}
