//! CLI presentation: text and json formatters per command family.

mod deploy;
mod ledger;

pub use deploy::{format_deploy_outcome, format_destroy_report, format_plan};
pub use ledger::{format_ledger_json, format_ledger_text, resource_id};
