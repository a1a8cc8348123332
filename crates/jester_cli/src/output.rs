use jester_core::{Doubloons, Rank};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Standard output formatting for the CLI
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Machine readable mode: outcomes print as JSON, decorations are skipped
    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Print a command outcome as pretty JSON
    pub fn json<T: Serialize>(&self, value: &T) -> miette::Result<()> {
        let rendered = serde_json::to_string_pretty(value)
            .map_err(|e| miette::miette!("Failed to render output as JSON: {}", e))?;
        println!("{}", rendered);
        Ok(())
    }

    /// Print a system/status message (indented)
    pub fn status(&self, message: &str) {
        println!("  {}", message.dimmed());
    }

    /// Print an info message (indented)
    pub fn info(&self, label: &str, value: &str) {
        println!("  {} {}", label.bright_blue(), value);
    }

    /// Print a success message (indented)
    pub fn success(&self, message: &str) {
        println!("  {} {}", "✓".bright_green(), message);
    }

    /// Print a warning message (indented)
    pub fn warning(&self, message: &str) {
        println!("  {} {}", "⚠".yellow(), message);
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        println!();
        println!("{}", title.bright_cyan().bold());
        println!("{}", "─".repeat(40).dimmed());
    }

    /// Print a list item (already indented)
    pub fn list_item(&self, item: &str) {
        println!("    • {}", item);
    }

    /// Print a key-value pair (indented)
    pub fn kv(&self, key: &str, value: &str) {
        println!("  {} {}", format!("{}:", key).dimmed(), value);
    }

    /// Print a table-like header
    pub fn table_header(&self, columns: &[&str]) {
        let header = columns.join(" | ");
        println!("  {}", header.bright_white().bold());
        println!("  {}", "─".repeat(header.chars().count()).dimmed());
    }

    /// Print a table row
    pub fn table_row(&self, cells: &[&str]) {
        let row = cells.join(" | ");
        println!("  {}", row);
    }
}

/// Rank with its emoji, colored by standing
pub fn format_rank(rank: Rank) -> String {
    let label = format!("{} {}", rank.emoji(), rank);
    match rank {
        Rank::Founder => label.bright_magenta().bold().to_string(),
        Rank::TheJestersHand | Rank::FoolsRegent => label.bright_yellow().to_string(),
        Rank::Motley => label.to_string(),
        _ => label.bright_green().to_string(),
    }
}

pub fn format_doubloons(amount: &Doubloons) -> String {
    format!("{} 💰", amount).bright_yellow().to_string()
}

/// Format a wait in seconds as a short human string
pub fn format_wait(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

/// Format a timestamp relative to now
pub fn format_relative_time(time: chrono::DateTime<chrono::Utc>) -> String {
    let now = chrono::Utc::now();
    let seconds = time.signed_duration_since(now).num_seconds();
    if seconds >= 0 {
        format!("in {}", format_wait(seconds)).dimmed().to_string()
    } else {
        format!("{} ago", format_wait(-seconds)).dimmed().to_string()
    }
}
