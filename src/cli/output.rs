//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::DeployError;

/// Map domain errors to the text printed on stderr.
pub fn map_error(e: &DeployError) -> String {
    match e {
        DeployError::UnresolvedParameters { unit, errors } => {
            let mut lines = vec![format!("Cannot deploy {}: parameters are missing.", unit)];
            lines.extend(
                errors
                    .iter()
                    .map(|p| format!("  - name={} type={} is not set.", p.name, p.param_type)),
            );
            lines.join("\n")
        }
        DeployError::LedgerWriteAfterRemote { .. } => format!(
            "{}\nThe remote change is live; deploy again to record its outputs.",
            e
        ),
        DeployError::CleanupIncomplete { summary, .. } => format!("{}\n{}", summary, e),
        _ => e.to_string(),
    }
}
