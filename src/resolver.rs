//! Parameter Resolution
//!
//! Computes the parameter set for a deployment from, highest precedence first:
//! values supplied for this run, outputs of previously deployed units recorded
//! in the ledger, and the template's declared defaults. Parameters with no value
//! anywhere are reported, never filled with an empty string.
//!
//! Ledger outputs are matched in two passes over a normalised index (every
//! character that is not alphanumeric is stripped):
//!
//! 1. exact match of the parameter name against `unit` + `outputKey`;
//! 2. the parameter name *contains* the bare output key.
//!
//! The second pass can match several outputs; the first one in ledger order
//! wins.

use crate::ledger::Ledger;
use crate::parameters::ParameterSet;
use crate::template::TemplateSpec;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A declared parameter for which no value was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
}

/// Where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ParameterSource {
    Supplied,
    Ledger { unit: String, key: String },
    Default,
}

/// Result of one resolution round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub resolved: ParameterSet,
    pub sources: IndexMap<String, ParameterSource>,
    pub errors: Vec<UnresolvedParameter>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Resolved parameters whose value came from the caller.
    pub fn supplied_values(&self) -> ParameterSet {
        self.resolved
            .iter()
            .filter(|(name, _)| matches!(self.sources.get(*name), Some(ParameterSource::Supplied)))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// Strip every non-alphanumeric character.
pub fn normalize_key(key: &str) -> String {
    key.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// One ledger output as seen by the lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputCandidate {
    pub unit: String,
    pub key: String,
    pub value: String,
    composite: String,
    bare: String,
}

impl OutputCandidate {
    /// `unit.key` label for display.
    pub fn label(&self) -> String {
        format!("{}.{}", self.unit, self.key)
    }
}

/// Normalised index over every output in a ledger, in ledger order.
#[derive(Debug, Clone, Default)]
pub struct OutputIndex {
    candidates: Vec<OutputCandidate>,
    by_composite: HashMap<String, usize>,
}

impl OutputIndex {
    pub fn build(ledger: &Ledger) -> Self {
        let mut index = OutputIndex::default();
        for (unit, entry) in ledger.iter() {
            for (key, value) in &entry.outputs {
                let candidate = OutputCandidate {
                    unit: unit.to_string(),
                    key: key.clone(),
                    value: value.clone(),
                    composite: normalize_key(&format!("{}{}", unit, key)),
                    bare: normalize_key(key),
                };
                let position = index.candidates.len();
                index
                    .by_composite
                    .entry(candidate.composite.clone())
                    .or_insert(position);
                index.candidates.push(candidate);
            }
        }
        index
    }

    pub fn candidates(&self) -> &[OutputCandidate] {
        &self.candidates
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Find the output feeding `parameter`, if any.
    pub fn lookup(&self, parameter: &str) -> Option<&OutputCandidate> {
        let wanted = normalize_key(parameter);
        if let Some(&position) = self.by_composite.get(&wanted) {
            return self.candidates.get(position);
        }
        self.candidates
            .iter()
            .find(|c| !c.bare.is_empty() && wanted.contains(&c.bare))
    }
}

/// Stateless resolver; identical inputs always give identical output.
pub struct ParameterResolver;

impl ParameterResolver {
    pub fn resolve(template: &TemplateSpec, supplied: &ParameterSet, ledger: &Ledger) -> Resolution {
        let index = OutputIndex::build(ledger);
        Self::resolve_with_index(template, supplied, &index)
    }

    pub fn resolve_with_index(
        template: &TemplateSpec,
        supplied: &ParameterSet,
        index: &OutputIndex,
    ) -> Resolution {
        let mut resolution = Resolution::default();

        for (name, spec) in &template.parameters {
            let found = if let Some(value) = supplied.get(name) {
                Some((value.clone(), ParameterSource::Supplied))
            } else if let Some(candidate) = index.lookup(name) {
                Some((
                    candidate.value.clone(),
                    ParameterSource::Ledger {
                        unit: candidate.unit.clone(),
                        key: candidate.key.clone(),
                    },
                ))
            } else {
                spec.default
                    .as_ref()
                    .map(|default| (default.clone(), ParameterSource::Default))
            };

            match found {
                Some((value, source)) => {
                    resolution.resolved.insert(name.clone(), value);
                    resolution.sources.insert(name.clone(), source);
                }
                None => resolution.errors.push(UnresolvedParameter {
                    name: name.clone(),
                    param_type: spec.param_type.clone(),
                }),
            }
        }

        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerEntry;
    use crate::template::TemplateParameterSpec;

    fn ledger_with(units: &[(&str, &[(&str, &str)])]) -> Ledger {
        units
            .iter()
            .map(|(unit, outputs)| {
                let entry = outputs
                    .iter()
                    .fold(LedgerEntry::default(), |e, (k, v)| e.with_output(*k, *v));
                (unit.to_string(), entry)
            })
            .collect()
    }

    fn supplied(pairs: &[(&str, &str)]) -> ParameterSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_precedence_supplied_over_ledger_over_default() {
        let template = TemplateSpec::new()
            .with_parameter("Foo", TemplateParameterSpec::new("String").with_default("d"));
        let ledger = ledger_with(&[("Other", &[("Foo", "l")])]);

        let all = ParameterResolver::resolve(&template, &supplied(&[("Foo", "s")]), &ledger);
        assert_eq!(all.resolved["Foo"], "s");
        assert_eq!(all.sources["Foo"], ParameterSource::Supplied);

        let no_supplied = ParameterResolver::resolve(&template, &ParameterSet::new(), &ledger);
        assert_eq!(no_supplied.resolved["Foo"], "l");

        let only_default =
            ParameterResolver::resolve(&template, &ParameterSet::new(), &Ledger::new());
        assert_eq!(only_default.resolved["Foo"], "d");
        assert_eq!(only_default.sources["Foo"], ParameterSource::Default);
    }

    #[test]
    fn test_composite_match_uses_unit_prefix() {
        let template = TemplateSpec::new()
            .with_parameter("WebsiteBucketName", TemplateParameterSpec::new("String"));
        let ledger = ledger_with(&[("Website", &[("BucketName", "b1")])]);

        let resolution = ParameterResolver::resolve(&template, &ParameterSet::new(), &ledger);
        assert_eq!(resolution.resolved["WebsiteBucketName"], "b1");
        assert_eq!(
            resolution.sources["WebsiteBucketName"],
            ParameterSource::Ledger {
                unit: "Website".to_string(),
                key: "BucketName".to_string()
            }
        );
    }

    #[test]
    fn test_normalisation_ignores_punctuation() {
        let template = TemplateSpec::new()
            .with_parameter("Http_Api-ServerUrl", TemplateParameterSpec::new("String"));
        let ledger = ledger_with(&[("Http-Api", &[("Server.Url", "https://x")])]);

        let resolution = ParameterResolver::resolve(&template, &ParameterSet::new(), &ledger);
        assert_eq!(resolution.resolved["Http_Api-ServerUrl"], "https://x");
    }

    #[test]
    fn test_exact_composite_beats_earlier_substring_candidate() {
        let template = TemplateSpec::new()
            .with_parameter("ApiBucketName", TemplateParameterSpec::new("String"));
        let ledger = ledger_with(&[
            ("Website", &[("BucketName", "website-bucket")]),
            ("Api", &[("BucketName", "api-bucket")]),
        ]);

        let resolution = ParameterResolver::resolve(&template, &ParameterSet::new(), &ledger);
        assert_eq!(resolution.resolved["ApiBucketName"], "api-bucket");
    }

    #[test]
    fn test_substring_fallback_takes_first_in_ledger_order() {
        let template = TemplateSpec::new()
            .with_parameter("LogsBucketName", TemplateParameterSpec::new("String"));
        let ledger = ledger_with(&[
            ("Website", &[("BucketName", "first")]),
            ("Api", &[("BucketName", "second")]),
        ]);

        let resolution = ParameterResolver::resolve(&template, &ParameterSet::new(), &ledger);
        assert_eq!(resolution.resolved["LogsBucketName"], "first");
    }

    #[test]
    fn test_empty_normalised_key_never_matches() {
        let template =
            TemplateSpec::new().with_parameter("Anything", TemplateParameterSpec::new("String"));
        let ledger = ledger_with(&[("X", &[("--", "dash")])]);

        let resolution = ParameterResolver::resolve(&template, &ParameterSet::new(), &ledger);
        assert!(resolution.resolved.is_empty());
        assert_eq!(resolution.errors.len(), 1);
    }

    #[test]
    fn test_unresolved_parameters_are_excluded() {
        let template = TemplateSpec::new()
            .with_parameter("Environment", TemplateParameterSpec::new("String"))
            .with_parameter("BucketName", TemplateParameterSpec::new("String"));

        let resolution = ParameterResolver::resolve(
            &template,
            &supplied(&[("Environment", "demo")]),
            &Ledger::new(),
        );
        assert_eq!(resolution.resolved, supplied(&[("Environment", "demo")]));
        assert_eq!(
            resolution.errors,
            vec![UnresolvedParameter {
                name: "BucketName".to_string(),
                param_type: "String".to_string()
            }]
        );
        assert!(!resolution.is_complete());
    }

    #[test]
    fn test_empty_values_count_as_resolved() {
        let template = TemplateSpec::new()
            .with_parameter("Suffix", TemplateParameterSpec::new("String").with_default(""))
            .with_parameter("Prefix", TemplateParameterSpec::new("String"));

        let resolution =
            ParameterResolver::resolve(&template, &supplied(&[("Prefix", "")]), &Ledger::new());
        assert!(resolution.is_complete());
        assert_eq!(resolution.resolved["Suffix"], "");
        assert_eq!(resolution.resolved["Prefix"], "");
    }

    #[test]
    fn test_supplied_values_not_declared_are_ignored() {
        let template =
            TemplateSpec::new().with_parameter("A", TemplateParameterSpec::new("String"));
        let resolution = ParameterResolver::resolve(
            &template,
            &supplied(&[("A", "1"), ("Undeclared", "2")]),
            &Ledger::new(),
        );
        assert_eq!(resolution.resolved.len(), 1);
        assert_eq!(resolution.supplied_values(), supplied(&[("A", "1")]));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let template = TemplateSpec::new()
            .with_parameter("Environment", TemplateParameterSpec::new("String"))
            .with_parameter("WebsiteBucketName", TemplateParameterSpec::new("String"))
            .with_parameter("Missing", TemplateParameterSpec::new("Number"));
        let ledger = ledger_with(&[("Website", &[("BucketName", "b1")])]);
        let input = supplied(&[("Environment", "demo")]);

        let first = ParameterResolver::resolve(&template, &input, &ledger);
        let second = ParameterResolver::resolve(&template, &input, &ledger);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first.resolved).unwrap(),
            serde_json::to_string(&second.resolved).unwrap()
        );
    }
}
