use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;
use tabled::Tabled;

/// Output format for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Render rows as a rounded table.
pub(crate) fn render_table<T: Tabled>(rows: Vec<T>) -> String {
    let mut table = tabled::Table::new(rows);
    table.with(tabled::settings::Style::rounded());
    table.to_string()
}

/// Print rows in the requested format. `empty` is shown instead of an empty
/// table.
pub(crate) fn print_rows<T>(
    rows: Vec<T>,
    format: OutputFormat,
    empty: &str,
) -> Result<(), Box<dyn std::error::Error>>
where
    T: Tabled + Serialize,
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table if rows.is_empty() => println!("{}", console::style(empty).dim()),
        OutputFormat::Table => println!("{}", render_table(rows)),
    }
    Ok(())
}

/// Print any serializable value as pretty JSON.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M UTC").to_string()
}

pub(crate) fn format_optional_time(time: Option<DateTime<Utc>>) -> String {
    time.map(format_time).unwrap_or_else(|| "-".to_string())
}
