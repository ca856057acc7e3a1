use std::io::{self, Write};

use serde::Serialize;
use tracing::{info, warn};

use crate::app::{BatchReport, EventKind, ProgressEvent, ProgressSink};
use crate::cache::CacheCleanup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
    Json,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheLocation {
    pub path: String,
    pub exists: bool,
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryList {
    pub categories: Vec<&'static str>,
}

/// Prints results as pretty JSON on stdout; progress goes to the log.
pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(result: &BatchReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_cache_location(result: &CacheLocation) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_cleanup(result: &CacheCleanup) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_categories(result: &CategoryList) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, event: ProgressEvent) {
        let category = event.category.as_deref().unwrap_or("-");
        match event.kind {
            EventKind::Warning | EventKind::Failure => {
                warn!(category, "{}", event.message);
            }
            EventKind::CategoryFinished { ok } => {
                let elapsed_ms = event.elapsed.map(|d| d.as_millis() as u64).unwrap_or(0);
                info!(category, ok, elapsed_ms, "{}", event.message);
            }
            _ => info!(category, "{}", event.message),
        }
    }
}

/// Plain line-oriented progress for pipes and `--non-interactive`.
pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn render(event: &ProgressEvent) -> Option<String> {
        let line = match event.kind {
            EventKind::Info => format!("[INFO] {}", event.message),
            EventKind::Warning => format!("[WARNING] {}", event.message),
            EventKind::Success => format!("[SUCCESS] {}", event.message),
            EventKind::Failure => format!("💥 {}", event.message),
            EventKind::Item => format!("  {}", event.message),
            EventKind::CategoryStarted { index, total } => {
                format!("\n📦 [{}/{}] {}", index + 1, total, event.message)
            }
            EventKind::CategoryFinished { ok: true } => {
                let secs = event.elapsed.map(|d| d.as_secs_f64()).unwrap_or(0.0);
                format!(
                    "✅ {} ({secs:.1}s)",
                    event.category.as_deref().unwrap_or(&event.message)
                )
            }
            EventKind::CategoryFinished { ok: false } => return None,
        };
        Some(line)
    }

    pub fn print_categories(result: &CategoryList) {
        println!("Available categories ({}):", result.categories.len());
        for name in &result.categories {
            println!("  {name}");
        }
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        if let Some(line) = Self::render(&event) {
            println!("{line}");
        }
    }
}

/// Discards every event.
pub struct SilentOutput;

impl ProgressSink for SilentOutput {
    fn event(&self, _event: ProgressEvent) {}
}
