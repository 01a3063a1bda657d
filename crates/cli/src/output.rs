//! Terminal rendering of run reports.
//!
//! Text mode prints one line per recipe followed by a short stats block.
//! Problems go to stderr so that `--output json` keeps stdout parseable.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use imgcache_lib::run::{RecipeReport, RecipeStatus};
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const PUBLISHED: &str = "✓";
  pub const BUILD: &str = "+";
  pub const FAILED: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

/// Elapsed build time: `50ms`, `1.50s`, `2m 5s`.
pub fn format_elapsed(elapsed: Duration) -> String {
  match elapsed.as_secs() {
    0 => format!("{}ms", elapsed.subsec_millis()),
    1..60 => format!("{}.{:02}s", elapsed.as_secs(), elapsed.subsec_millis() / 10),
    secs => format!("{}m {}s", secs / 60, secs % 60),
  }
}

fn status_symbol(status: &RecipeStatus) -> &'static str {
  match status {
    RecipeStatus::Cached => symbols::PUBLISHED,
    RecipeStatus::WouldBuild | RecipeStatus::Built(_) => symbols::BUILD,
    RecipeStatus::Failed { .. } => symbols::FAILED,
  }
}

fn status_detail(status: &RecipeStatus) -> String {
  match status {
    RecipeStatus::Cached => "published".to_string(),
    RecipeStatus::WouldBuild => "would build".to_string(),
    RecipeStatus::Built(outcome) => format!(
      "built in {} {} {}",
      format_elapsed(outcome.elapsed),
      symbols::ARROW,
      outcome.artifact.display()
    ),
    RecipeStatus::Failed { stage, message } => format!("{} failed: {}", stage, message),
  }
}

/// `<image>:<version> (<what happened>)` without the leading symbol.
pub fn recipe_line(entry: &RecipeReport) -> String {
  format!("{}:{} ({})", entry.image, entry.version, status_detail(&entry.status))
}

pub fn print_recipes(entries: &[RecipeReport]) {
  for entry in entries {
    let symbol = status_symbol(&entry.status);
    let painted = match &entry.status {
      RecipeStatus::Cached => symbol.if_supports_color(Stream::Stdout, |s| s.green()).to_string(),
      RecipeStatus::Failed { .. } => symbol.if_supports_color(Stream::Stdout, |s| s.red()).to_string(),
      _ => symbol.if_supports_color(Stream::Stdout, |s| s.cyan()).to_string(),
    };
    println!("  {} {}", painted, recipe_line(entry));
  }
}

/// Aligned `label: value` block printed after the recipe lines.
pub fn print_stats(stats: &[(&str, String)]) {
  let width = stats.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
  for (label, value) in stats {
    let padded = format!("{:<width$}", format!("{}:", label), width = width + 1);
    println!("  {} {}", padded.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::PUBLISHED.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::FAILED.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
  println!("{}", json);
  Ok(())
}
