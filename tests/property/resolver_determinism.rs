//! Resolution is a pure function of template, supplied values and ledger

use proptest::prelude::*;
use simplify::ledger::{Ledger, LedgerEntry};
use simplify::parameters::ParameterSet;
use simplify::resolver::{ParameterResolver, ParameterSource};
use simplify::template::{TemplateParameterSpec, TemplateSpec};

fn name() -> impl Strategy<Value = String> {
    "[A-Z][a-zA-Z]{0,8}"
}

fn template_strategy() -> impl Strategy<Value = TemplateSpec> {
    prop::collection::vec((name(), prop::option::of("[a-z0-9]{1,6}")), 0..6).prop_map(|params| {
        params
            .into_iter()
            .fold(TemplateSpec::new(), |spec, (name, default)| {
                let mut param = TemplateParameterSpec::new("String");
                if let Some(default) = default {
                    param = param.with_default(default);
                }
                spec.with_parameter(name, param)
            })
    })
}

fn ledger_strategy() -> impl Strategy<Value = Ledger> {
    prop::collection::vec(
        (name(), prop::collection::vec((name(), "[a-z0-9-]{0,8}"), 0..4)),
        0..4,
    )
    .prop_map(|units| {
        units
            .into_iter()
            .map(|(unit, outputs)| {
                let entry = outputs
                    .into_iter()
                    .fold(LedgerEntry::default(), |e, (k, v)| e.with_output(k, v));
                (unit, entry)
            })
            .collect()
    })
}

fn supplied_strategy() -> impl Strategy<Value = ParameterSet> {
    prop::collection::vec((name(), "[a-z0-9]{0,6}"), 0..4)
        .prop_map(|pairs| pairs.into_iter().collect())
}

proptest! {
    #[test]
    fn test_resolution_is_deterministic(
        template in template_strategy(),
        supplied in supplied_strategy(),
        ledger in ledger_strategy(),
    ) {
        let first = ParameterResolver::resolve(&template, &supplied, &ledger);
        let second = ParameterResolver::resolve(&template, &supplied, &ledger);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_every_parameter_is_resolved_or_reported_once(
        template in template_strategy(),
        supplied in supplied_strategy(),
        ledger in ledger_strategy(),
    ) {
        let resolution = ParameterResolver::resolve(&template, &supplied, &ledger);
        prop_assert_eq!(
            resolution.resolved.len() + resolution.errors.len(),
            template.parameters.len()
        );
        for error in &resolution.errors {
            prop_assert!(!resolution.resolved.contains_key(&error.name));
        }
        let resolved_order: Vec<&String> = resolution.resolved.keys().collect();
        let template_order: Vec<&String> = template
            .parameters
            .keys()
            .filter(|k| resolution.resolved.contains_key(*k))
            .collect();
        prop_assert_eq!(resolved_order, template_order);
    }

    #[test]
    fn test_supplied_values_take_precedence(
        template in template_strategy(),
        supplied in supplied_strategy(),
        ledger in ledger_strategy(),
    ) {
        let resolution = ParameterResolver::resolve(&template, &supplied, &ledger);
        for name in template.parameters.keys() {
            if let Some(value) = supplied.get(name) {
                prop_assert_eq!(resolution.resolved.get(name), Some(value));
                prop_assert_eq!(resolution.sources.get(name), Some(&ParameterSource::Supplied));
            }
        }
    }

    #[test]
    fn test_feeding_resolution_back_is_idempotent(
        template in template_strategy(),
        supplied in supplied_strategy(),
        ledger in ledger_strategy(),
    ) {
        let first = ParameterResolver::resolve(&template, &supplied, &ledger);
        let second = ParameterResolver::resolve(&template, &first.resolved, &ledger);
        prop_assert_eq!(&first.resolved, &second.resolved);
        prop_assert_eq!(first.errors, second.errors);
    }
}
