//! Deploy, plan and destroy results.

use crate::cleanup::{DestroyReport, DestroyStatus};
use crate::deploy::{DeployOutcome, DeployPlan};
use crate::error::DeployError;
use crate::resolver::ParameterSource;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

pub fn format_deploy_outcome(outcome: &DeployOutcome) -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Output", "Value"]);
    for (key, value) in &outcome.entry.outputs {
        table.add_row(vec![key.as_str(), value.as_str()]);
    }
    format!(
        "{} {} ({})\n{}",
        "Deployed".green().bold(),
        outcome.unit,
        outcome.stack_name,
        table
    )
}

fn describe_source(source: Option<&ParameterSource>) -> String {
    match source {
        Some(ParameterSource::Supplied) => "supplied".to_string(),
        Some(ParameterSource::Ledger { unit, key }) => format!("ledger {}.{}", unit, key),
        Some(ParameterSource::Default) => "default".to_string(),
        None => "-".to_string(),
    }
}

pub fn format_plan(plan: &DeployPlan, format: &str) -> Result<String, DeployError> {
    if format == "json" {
        let out = json!({
            "unit": plan.unit,
            "stack_name": plan.stack_name,
            "resolved": plan.resolution.resolved,
            "sources": plan.resolution.sources,
            "errors": plan.resolution.errors,
        });
        return serde_json::to_string_pretty(&out)
            .map_err(|e| DeployError::ConfigError(format!("Failed to render plan: {}", e)));
    }

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Parameter", "Value", "Source"]);
    for (name, value) in &plan.resolution.resolved {
        table.add_row(vec![
            name.clone(),
            value.clone(),
            describe_source(plan.resolution.sources.get(name)),
        ]);
    }
    for missing in &plan.resolution.errors {
        table.add_row(vec![
            missing.name.clone(),
            format!("<{}>", missing.param_type),
            "unresolved".to_string(),
        ]);
    }

    let status = if plan.resolution.is_complete() {
        "ready".green().to_string()
    } else {
        format!("{} unresolved", plan.resolution.errors.len())
            .red()
            .to_string()
    };
    Ok(format!(
        "Plan for {} ({}): {}\n{}",
        plan.unit, plan.stack_name, status, table
    ))
}

pub fn format_destroy_report(report: &DestroyReport) -> String {
    if report.units.is_empty() {
        return format!(
            "Nothing to destroy in {} environment",
            report.environment.as_deref().unwrap_or("default")
        );
    }

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Unit", "Status", "Detail"]);
    for unit in &report.units {
        let (status, detail) = match &unit.status {
            DestroyStatus::Destroyed { stack_name } => {
                ("destroyed".green().to_string(), stack_name.clone())
            }
            DestroyStatus::Skipped { reason } => ("skipped".yellow().to_string(), reason.clone()),
            DestroyStatus::Failed { error } => ("failed".red().to_string(), error.clone()),
        };
        table.add_row(vec![unit.unit.clone(), status, detail]);
    }
    table.to_string()
}
