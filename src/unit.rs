//! Deployment units and remote naming.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a deployment unit as recorded in the ledger `Type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    #[serde(rename = "CF-Stack")]
    Stack,
    #[serde(rename = "Function")]
    Function,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Stack => "CF-Stack",
            UnitKind::Function => "Function",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stack or function managed independently within one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentUnit {
    pub name: String,
    pub kind: UnitKind,
    /// `None` selects the single-environment ledger layout.
    pub environment: Option<String>,
}

impl DeploymentUnit {
    pub fn stack(name: impl Into<String>, environment: Option<String>) -> Self {
        Self {
            name: name.into(),
            kind: UnitKind::Stack,
            environment,
        }
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }
}

/// Derives remote stack names: `<project>-<unit>-<environment>`.
#[derive(Debug, Clone, Default)]
pub struct StackNaming {
    project_name: Option<String>,
}

impl StackNaming {
    pub fn new(project_name: Option<String>) -> Self {
        Self {
            project_name: project_name.filter(|p| !p.trim().is_empty()),
        }
    }

    pub fn stack_name(&self, unit_name: &str, environment: Option<&str>) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if let Some(project) = self.project_name.as_deref() {
            parts.push(project);
        }
        parts.push(unit_name);
        if let Some(env) = environment.filter(|e| !e.is_empty()) {
            parts.push(env);
        }
        parts.join("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_name_with_project_and_env() {
        let naming = StackNaming::new(Some("shop".to_string()));
        assert_eq!(naming.stack_name("Website", Some("demo")), "shop-Website-demo");
    }

    #[test]
    fn test_stack_name_without_optional_parts() {
        let naming = StackNaming::new(Some("  ".to_string()));
        assert_eq!(naming.stack_name("Website", None), "Website");
    }

    #[test]
    fn test_unit_kind_serializes_to_ledger_type() {
        assert_eq!(
            serde_json::to_string(&UnitKind::Stack).unwrap(),
            "\"CF-Stack\""
        );
        let kind: UnitKind = serde_json::from_str("\"Function\"").unwrap();
        assert_eq!(kind, UnitKind::Function);
    }
}
