//! Stack templates
//!
//! Only the `Parameters` section of a CloudFormation-style template is
//! interpreted here. Templates are read from a local path or an `https://`
//! location; remote templates are cached below the output folder so that the
//! provider always receives a local file.

use crate::error::DeployError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Conventional template file name inside a unit's folder.
pub const TEMPLATE_FILE_NAME: &str = "template.yaml";

/// Declared parameter as read from the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateParameterSpec {
    #[serde(rename = "Type")]
    pub param_type: String,
    #[serde(rename = "Default", skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(rename = "AllowedValues", default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TemplateParameterSpec {
    pub fn new(param_type: impl Into<String>) -> Self {
        Self {
            param_type: param_type.into(),
            default: None,
            allowed_values: Vec::new(),
            description: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }
}

/// Parameters declared by a template, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSpec {
    #[serde(rename = "Parameters", default)]
    pub parameters: IndexMap<String, TemplateParameterSpec>,
}

impl TemplateSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter(mut self, name: impl Into<String>, spec: TemplateParameterSpec) -> Self {
        self.parameters.insert(name.into(), spec);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&TemplateParameterSpec> {
        self.parameters.get(name)
    }

    /// Parse a YAML or JSON template body.
    pub fn parse(content: &str) -> Result<Self, DeployError> {
        let document: Value = serde_yaml::from_str(content)
            .map_err(|e| DeployError::ConfigError(format!("Malformed template: {}", e)))?;

        let parameters = match document.get("Parameters") {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Mapping(mapping)) => mapping,
            Some(_) => {
                return Err(DeployError::ConfigError(
                    "Malformed template: Parameters must be a mapping".to_string(),
                ))
            }
        };

        let mut spec = TemplateSpec::new();
        for (name, declaration) in parameters {
            let name = scalar_to_string(name).ok_or_else(|| {
                DeployError::ConfigError("Malformed template: non-scalar parameter name".to_string())
            })?;
            spec.parameters
                .insert(name.clone(), parse_parameter(&name, declaration)?);
        }
        Ok(spec)
    }

    /// Read and parse a local template file.
    pub fn load(path: &Path) -> Result<Self, DeployError> {
        if !path.exists() {
            return Err(DeployError::ConfigError(format!(
                "{} not found.",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            DeployError::ConfigError(format!("Failed to read template {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }
}

fn parse_parameter(name: &str, declaration: &Value) -> Result<TemplateParameterSpec, DeployError> {
    if !declaration.is_mapping() {
        return Err(DeployError::ConfigError(format!(
            "Malformed template: parameter {} must be a mapping",
            name
        )));
    }

    let field = |key: &str| declaration.get(key);

    let param_type = field("Type")
        .and_then(scalar_to_string)
        .unwrap_or_else(|| "String".to_string());
    let default = field("Default").and_then(scalar_to_string);
    let description = field("Description").and_then(scalar_to_string);
    let allowed_values = match field("AllowedValues") {
        Some(Value::Sequence(values)) => values.iter().filter_map(scalar_to_string).collect(),
        _ => Vec::new(),
    };

    Ok(TemplateParameterSpec {
        param_type,
        default,
        allowed_values,
        description,
    })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Where a template comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    File(PathBuf),
    Url(String),
}

impl TemplateSource {
    pub fn parse(location: &str) -> Self {
        if location.starts_with("https://") || location.starts_with("http://") {
            TemplateSource::Url(location.to_string())
        } else {
            TemplateSource::File(PathBuf::from(location))
        }
    }

    /// Default location: `<stack_folder>/<unit>/template.yaml`.
    pub fn for_unit(stack_folder: &Path, unit: &str) -> Self {
        TemplateSource::File(stack_folder.join(unit).join(TEMPLATE_FILE_NAME))
    }

    pub fn location(&self) -> String {
        match self {
            TemplateSource::File(path) => path.display().to_string(),
            TemplateSource::Url(url) => url.clone(),
        }
    }
}

/// GitHub `blob` pages are rewritten to their raw content URL.
pub fn raw_template_url(url: &str) -> String {
    if url.starts_with("https://github.com/") {
        url.replacen("https://github.com/", "https://raw.githubusercontent.com/", 1)
            .replacen("/blob/", "/", 1)
    } else {
        url.to_string()
    }
}

/// A parsed template together with the local file handed to the provider.
#[derive(Debug, Clone)]
pub struct LoadedTemplate {
    pub source: TemplateSource,
    pub local_path: PathBuf,
    pub spec: TemplateSpec,
}

impl LoadedTemplate {
    /// Load a template; remote templates are cached in `cache_dir/<unit>.yaml`.
    pub async fn load(
        source: TemplateSource,
        unit: &str,
        cache_dir: &Path,
    ) -> Result<Self, DeployError> {
        match &source {
            TemplateSource::File(path) => {
                let spec = TemplateSpec::load(path)?;
                debug!(path = %path.display(), parameters = spec.parameters.len(), "Template loaded");
                Ok(Self {
                    local_path: path.clone(),
                    spec,
                    source,
                })
            }
            TemplateSource::Url(url) => {
                let body = fetch_template(url).await?;
                let spec = TemplateSpec::parse(&body)?;
                std::fs::create_dir_all(cache_dir).map_err(|e| {
                    DeployError::ConfigError(format!(
                        "Failed to create template cache {}: {}",
                        cache_dir.display(),
                        e
                    ))
                })?;
                let local_path = cache_dir.join(format!("{}.yaml", unit));
                std::fs::write(&local_path, body).map_err(|e| {
                    DeployError::ConfigError(format!(
                        "Failed to cache template {}: {}",
                        local_path.display(),
                        e
                    ))
                })?;
                info!(url = %url, cached = %local_path.display(), "Remote template cached");
                Ok(Self {
                    local_path,
                    spec,
                    source,
                })
            }
        }
    }
}

async fn fetch_template(url: &str) -> Result<String, DeployError> {
    let raw_url = raw_template_url(url);
    let response = reqwest::get(&raw_url)
        .await
        .map_err(|e| DeployError::ConfigError(format!("Failed to download template {}: {}", raw_url, e)))?;
    let response = response
        .error_for_status()
        .map_err(|e| DeployError::ConfigError(format!("Failed to download template {}: {}", raw_url, e)))?;
    response
        .text()
        .await
        .map_err(|e| DeployError::ConfigError(format!("Failed to read template {}: {}", raw_url, e)))
}
