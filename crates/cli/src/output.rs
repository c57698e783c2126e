//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use framedev_common::{Interaction, InteractionRecord};

use crate::history::HistoryState;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print a single item
pub fn print_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let mut table = table();
            table.set_header(T::headers());
            table.add_row(item.row());
            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(item).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(item).unwrap_or_default());
        }
        OutputFormat::Plain => {
            let row = item.row();
            for (header, value) in T::headers().iter().zip(row.iter()) {
                println!("{}: {}", header, value);
            }
        }
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = table();
            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }
            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                let row = item.row();
                for (header, value) in T::headers().iter().zip(row.iter()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "!".yellow(), message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("{} {}", "i".blue(), message);
}

// ============================================================================
// Display rows
// ============================================================================

/// One frame route of the inspected application
#[derive(Serialize)]
pub struct RouteDisplay {
    pub route: String,
}

impl TableDisplay for RouteDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Route"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.route.clone()]
    }
}

/// Summary of an interaction record
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDisplay {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub method: String,
    pub url: String,
    pub status: String,
    pub buttons: usize,
    pub html_size: u64,
    pub image_size: u64,
    pub speed_ms: f64,
}

impl From<&InteractionRecord> for RecordDisplay {
    fn from(record: &InteractionRecord) -> Self {
        Self {
            id: record.id.clone(),
            kind: record.kind().to_string(),
            method: format!("{:?}", record.method).to_uppercase(),
            url: record
                .context
                .url
                .clone()
                .unwrap_or_else(|| record.interaction.frame_url().to_string()),
            status: format!("{} {}", record.response.status, record.response.status_text)
                .trim()
                .to_string(),
            buttons: record.frame.buttons.len(),
            html_size: record.metrics.html_size,
            image_size: record.metrics.image_size,
            speed_ms: record.metrics.speed,
        }
    }
}

impl TableDisplay for RecordDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Type", "Method", "URL", "Status", "Buttons", "HTML", "Image", "Speed"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.kind.clone(),
            self.method.clone(),
            self.url.clone(),
            self.status.clone(),
            self.buttons.to_string(),
            format_bytes(self.html_size),
            format_bytes(self.image_size),
            format!("{:.0}ms", self.speed_ms),
        ]
    }
}

/// One slot of the navigation stack
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryDisplay {
    pub position: usize,
    pub current: bool,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: u16,
    pub timestamp: String,
}

impl HistoryDisplay {
    pub fn rows(state: &HistoryState) -> Vec<Self> {
        state
            .entries()
            .map(|(position, record)| Self {
                position,
                current: position == state.stack_index(),
                id: record.id.clone(),
                kind: record.kind().to_string(),
                status: record.response.status,
                timestamp: chrono::DateTime::from_timestamp_millis(record.timestamp)
                    .map(|t| t.format("%H:%M:%S%.3f").to_string())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

impl TableDisplay for HistoryDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["#", "", "ID", "Type", "Status", "Time"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.position.to_string(),
            if self.current { "▶".to_string() } else { String::new() },
            self.id.clone(),
            self.kind.clone(),
            self.status.to_string(),
            self.timestamp.clone(),
        ]
    }
}

/// Print the frame of `record`: image, input and buttons.
pub fn print_frame(record: &InteractionRecord) {
    let frame = &record.frame;
    if !frame.is_present() {
        print_warning("document declares no frame tags");
        return;
    }

    if let Some(title) = &frame.title {
        println!("{}", title.bold());
    }
    if let Some(image) = &frame.image_url {
        let ratio = frame.image_aspect_ratio.as_deref().unwrap_or("1.91:1");
        println!("  image  {} ({})", truncate(image, 80), ratio);
    }
    if let Some(input) = &frame.input {
        println!("  input  [{}]", input.text.dimmed());
    }
    for button in &frame.buttons {
        let kind = serde_json::to_value(button.action)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let extra = button
            .target
            .as_deref()
            .or(button.post_url.as_deref())
            .map(|t| format!(" -> {}", t))
            .unwrap_or_default();
        println!("  [{}] {} ({}){}", button.index, button.title.cyan(), kind, extra);
    }
    if let Interaction::Redirect {
        location: Some(location),
        ..
    } = &record.interaction
    {
        println!("  redirect -> {}", location.underline());
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}
