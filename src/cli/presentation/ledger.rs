//! Ledger listing.

use crate::error::DeployError;
use crate::ledger::{Ledger, LedgerEntry, STACK_ID_KEY};
use chrono::{DateTime, Utc};
use comfy_table::Table;
use owo_colors::OwoColorize;

const RESOURCE_ID_WIDTH: usize = 50;

/// Identifier shown for a unit: its stack id, else its function ARN.
pub fn resource_id(entry: &LedgerEntry) -> String {
    let id = entry
        .output(STACK_ID_KEY)
        .or_else(|| entry.output("FunctionArn"))
        .unwrap_or("-");
    truncate(id, RESOURCE_ID_WIDTH)
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let kept: String = value.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn format_timestamp(millis: Option<i64>) -> String {
    millis
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_ledger_text(ledger: &Ledger, environment: Option<&str>) -> String {
    let title = format!("Listing for {} environment", environment.unwrap_or("default"));
    if ledger.is_empty() {
        return format!("{}: (empty)", title.bold());
    }

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Index", "Name", "Type", "Region", "ResourceId", "LastUpdate"]);
    for (index, (name, entry)) in ledger.iter().enumerate() {
        table.add_row(vec![
            (index + 1).to_string(),
            name.to_string(),
            entry.kind().to_string(),
            entry.output("Region").unwrap_or("-").to_string(),
            resource_id(entry),
            format_timestamp(entry.last_update),
        ]);
    }
    format!("{}\n{}", title.bold(), table)
}

pub fn format_ledger_json(ledger: &Ledger) -> Result<String, DeployError> {
    serde_json::to_string_pretty(ledger)
        .map_err(|e| DeployError::ConfigError(format!("Failed to render ledger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::UnitKind;

    #[test]
    fn test_resource_id_truncates_long_arns() {
        let arn = format!("arn:aws:cloudformation:us-east-1:123:stack/{}", "x".repeat(80));
        let entry = LedgerEntry::default().with_output(STACK_ID_KEY, arn);
        let shown = resource_id(&entry);
        assert_eq!(shown.chars().count(), RESOURCE_ID_WIDTH);
        assert!(shown.ends_with("..."));

        let function = LedgerEntry::default().with_output("FunctionArn", "arn:fn");
        assert_eq!(resource_id(&function), "arn:fn");
    }

    #[test]
    fn test_ledger_table_lists_units_in_order() {
        let ledger: Ledger = [
            (
                "Website".to_string(),
                LedgerEntry::new(UnitKind::Stack, 0)
                    .with_output("Region", "eu-west-1")
                    .with_output(STACK_ID_KEY, "arn:stack"),
            ),
            ("Api".to_string(), LedgerEntry::default()),
        ]
        .into_iter()
        .collect();

        let text = format_ledger_text(&ledger, Some("demo"));
        assert!(text.contains("demo"));
        let website = text.find("Website").unwrap();
        let api = text.find("Api").unwrap();
        assert!(website < api);
        assert!(text.contains("CF-Stack"));
        assert!(text.contains("1970-01-01 00:00:00"));
    }

    #[test]
    fn test_empty_ledger() {
        assert!(format_ledger_text(&Ledger::new(), None).contains("(empty)"));
    }
}
