//! Shared fixtures for the deploy and cleanup flows

use simplify::deploy::DeployRequest;
use simplify::ledger::LocalLedger;
use simplify::parameters::ParameterSet;
use simplify::template::{LoadedTemplate, TemplateParameterSpec, TemplateSource, TemplateSpec};
use simplify::unit::DeploymentUnit;
use std::path::Path;

pub const ENV: &str = "demo";

/// Template declaring `String` parameters with no defaults.
pub fn string_template(names: &[&str]) -> TemplateSpec {
    names.iter().fold(TemplateSpec::new(), |spec, name| {
        spec.with_parameter(*name, TemplateParameterSpec::new("String"))
    })
}

pub fn request(unit: &str, spec: TemplateSpec, supplied: &[(&str, &str)]) -> DeployRequest {
    DeployRequest {
        unit: DeploymentUnit::stack(unit, Some(ENV.to_string())),
        template: LoadedTemplate {
            source: TemplateSource::File(format!("{}/template.yaml", unit).into()),
            local_path: format!("{}/template.yaml", unit).into(),
            spec,
        },
        supplied: supplied
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<ParameterSet>(),
    }
}

pub fn ledger_in(root: &Path) -> LocalLedger {
    LocalLedger::new(root.join(".simplify"))
}

/// Raw bytes of the ledger file, or `None` when it does not exist.
pub fn ledger_bytes(ledger: &LocalLedger) -> Option<Vec<u8>> {
    std::fs::read(ledger.path_for(Some(ENV))).ok()
}
