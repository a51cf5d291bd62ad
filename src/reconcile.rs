//! Interactive parameter reconciliation.
//!
//! Lets an operator override resolved values and supply the missing ones before
//! a deploy. Every answer is fed back through [`ParameterResolver`] as a
//! supplied value so the result obeys the same precedence as a headless run.

use crate::error::DeployError;
use crate::ledger::Ledger;
use crate::parameters::ParameterSet;
use crate::resolver::{OutputIndex, ParameterResolver, Resolution};
use crate::template::{TemplateParameterSpec, TemplateSpec};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::debug;

const ENTER_MANUALLY: &str = "Enter manually";
const CONFIRM: &str = "Confirm";

/// Terminal interaction used by the reconciler.
pub trait Prompter: Send + Sync {
    /// Pick one of `items`; returns its index.
    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize, DeployError>;

    /// Free text, pre-filled with `initial` when given.
    fn input(&self, prompt: &str, initial: Option<&str>) -> Result<String, DeployError>;

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, DeployError>;
}

/// [`Prompter`] backed by the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize, DeployError> {
        use dialoguer::Select;

        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()
            .map_err(|e| DeployError::Prompt(format!("Failed to get user input: {}", e)))
    }

    fn input(&self, prompt: &str, initial: Option<&str>) -> Result<String, DeployError> {
        use dialoguer::Input;

        let mut input = Input::<String>::new().with_prompt(prompt).allow_empty(true);
        if let Some(initial) = initial {
            input = input.with_initial_text(initial);
        }
        input
            .interact_text()
            .map_err(|e| DeployError::Prompt(format!("Failed to get user input: {}", e)))
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, DeployError> {
        use dialoguer::Confirm;

        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(|e| DeployError::Prompt(format!("Failed to get user input: {}", e)))
    }
}

/// One scripted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Select(usize),
    Input(String),
    Confirm(bool),
}

/// [`Prompter`] that replays a fixed list of answers.
///
/// Running out of answers, or meeting an answer of the wrong kind, is a
/// prompt error rather than a panic.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts shown so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().len()
    }

    fn next(&self, prompt: &str) -> Result<Answer, DeployError> {
        self.prompts.lock().push(prompt.to_string());
        self.answers
            .lock()
            .pop_front()
            .ok_or_else(|| DeployError::Prompt(format!("No scripted answer for '{}'", prompt)))
    }
}

impl Prompter for ScriptedPrompter {
    fn select(&self, prompt: &str, items: &[String], _default: usize) -> Result<usize, DeployError> {
        match self.next(prompt)? {
            Answer::Select(index) if index < items.len() => Ok(index),
            other => Err(DeployError::Prompt(format!(
                "Unexpected answer {:?} for selection '{}'",
                other, prompt
            ))),
        }
    }

    fn input(&self, prompt: &str, _initial: Option<&str>) -> Result<String, DeployError> {
        match self.next(prompt)? {
            Answer::Input(value) => Ok(value),
            other => Err(DeployError::Prompt(format!(
                "Unexpected answer {:?} for input '{}'",
                other, prompt
            ))),
        }
    }

    fn confirm(&self, prompt: &str, _default: bool) -> Result<bool, DeployError> {
        match self.next(prompt)? {
            Answer::Confirm(value) => Ok(value),
            other => Err(DeployError::Prompt(format!(
                "Unexpected answer {:?} for confirmation '{}'",
                other, prompt
            ))),
        }
    }
}

/// Operator-in-the-loop completion of a parameter set.
pub struct InteractiveReconciler {
    prompter: Box<dyn Prompter>,
}

impl InteractiveReconciler {
    pub fn new(prompter: Box<dyn Prompter>) -> Self {
        Self { prompter }
    }

    pub fn terminal() -> Self {
        Self::new(Box::new(TerminalPrompter))
    }

    pub fn prompter(&self) -> &dyn Prompter {
        self.prompter.as_ref()
    }

    /// Walk the operator through every declared parameter, then loop on a
    /// review until it is confirmed. Returns a complete resolution whose
    /// `Supplied` sources include every operator override.
    pub fn reconcile(
        &self,
        template: &TemplateSpec,
        supplied: &ParameterSet,
        ledger: &Ledger,
        initial: Resolution,
    ) -> Result<Resolution, DeployError> {
        let index = OutputIndex::build(ledger);
        let mut overrides = supplied.clone();

        for (name, value) in &initial.resolved {
            let Some(spec) = template.parameter(name) else {
                continue;
            };
            let answer = self.ask_value(name, spec, &index, Some(value))?;
            if &answer != value {
                debug!(parameter = %name, "Operator override");
                overrides.insert(name.clone(), answer);
            }
        }

        let mut resolution = ParameterResolver::resolve_with_index(template, &overrides, &index);
        while !resolution.is_complete() {
            for missing in resolution.errors.clone() {
                let Some(spec) = template.parameter(&missing.name) else {
                    continue;
                };
                let answer = self.ask_value(&missing.name, spec, &index, None)?;
                overrides.insert(missing.name.clone(), answer);
            }
            resolution = ParameterResolver::resolve_with_index(template, &overrides, &index);
        }

        loop {
            let mut items: Vec<String> = resolution
                .resolved
                .iter()
                .map(|(name, value)| format!("{} = {}", name, value))
                .collect();
            let names: Vec<String> = resolution.resolved.keys().cloned().collect();
            items.push(CONFIRM.to_string());
            let confirm_index = items.len() - 1;

            let choice = self
                .prompter
                .select("Review parameters (select one to redo)", &items, confirm_index)?;
            if choice == confirm_index {
                break;
            }

            let name = &names[choice];
            if let Some(spec) = template.parameter(name) {
                let current = resolution.resolved.get(name).cloned();
                let answer = self.ask_value(name, spec, &index, current.as_deref())?;
                overrides.insert(name.clone(), answer);
                resolution = ParameterResolver::resolve_with_index(template, &overrides, &index);
            }
        }

        Ok(resolution)
    }

    fn ask_value(
        &self,
        name: &str,
        spec: &TemplateParameterSpec,
        index: &OutputIndex,
        current: Option<&str>,
    ) -> Result<String, DeployError> {
        let prompt = format!("{} ({})", name, spec.param_type);

        if !spec.allowed_values.is_empty() {
            let default = current
                .and_then(|c| spec.allowed_values.iter().position(|v| v == c))
                .unwrap_or(0);
            let choice = self.prompter.select(&prompt, &spec.allowed_values, default)?;
            return Ok(spec.allowed_values[choice].clone());
        }

        if current.is_none() && !index.is_empty() {
            let candidates = index.candidates();
            let mut items: Vec<String> = candidates
                .iter()
                .map(|c| format!("{} = {}", c.label(), c.value))
                .collect();
            items.push(ENTER_MANUALLY.to_string());

            let choice = self.prompter.select(&prompt, &items, items.len() - 1)?;
            if let Some(candidate) = candidates.get(choice) {
                return Ok(candidate.value.clone());
            }
        }

        self.prompter.input(&prompt, current)
    }
}
