use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::ParameterSet;
use crate::error::{Error, Result};
use crate::pipeline::{Parameter, TransformStep};
use crate::utils::{io, paths};

pub const DEFAULT_RESPONSE_TEMPLATE: &str = "system/response/response.xsl";
pub const DEFAULT_RESPONSE_STEP_NAME: &str = "client-response";

/// Settings of one web application and the framework home it runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub home_dir: PathBuf,
    pub webapp_dir: PathBuf,
    pub development_mode: bool,
    pub response_template: String,
    pub response_step_name: String,
    pub parameters: Vec<Parameter>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            home_dir: PathBuf::from("."),
            webapp_dir: PathBuf::from("."),
            development_mode: false,
            response_template: DEFAULT_RESPONSE_TEMPLATE.to_string(),
            response_step_name: DEFAULT_RESPONSE_STEP_NAME.to_string(),
            parameters: Vec::new(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let path = paths::expand_home(path);
        let content = io::read_file(&path, "read engine config")?;
        Self::from_json_str(&content, &path.display().to_string())
    }

    /// Parses and validates a JSON document. `origin` names it in errors.
    pub fn from_json_str(content: &str, origin: &str) -> Result<Self> {
        let mut config: EngineConfig =
            serde_json::from_str(content).map_err(|e| Error::config_invalid_json(origin, e))?;
        config.home_dir = paths::expand_home(&config.home_dir);
        config.webapp_dir = paths::expand_home(&config.webapp_dir);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.response_template.trim().is_empty() {
            return Err(Error::config_invalid_value(
                "responseTemplate",
                Some(self.response_template.clone()),
                "must not be blank",
            ));
        }
        if self.response_step_name.trim().is_empty() {
            return Err(Error::config_invalid_value(
                "responseStepName",
                Some(self.response_step_name.clone()),
                "must not be blank",
            ));
        }
        if let Some(parameter) = self.parameters.iter().find(|p| p.name.trim().is_empty()) {
            return Err(Error::config_invalid_value(
                "parameters",
                Some(format!("{:?}", parameter.values)),
                "parameter name must not be blank",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Resolution
// ============================================================================

impl EngineConfig {
    /// User templates live under `<webappDir>/xsl`.
    pub fn user_template_path(&self, template: &str) -> PathBuf {
        resolve_under(&self.webapp_dir.join("xsl"), template)
    }

    /// Framework templates live under `<homeDir>/common/xsl`.
    pub fn system_template_path(&self, template: &str) -> PathBuf {
        resolve_under(&self.home_dir.join("common").join("xsl"), template)
    }

    pub fn template_path(&self, step: &TransformStep) -> PathBuf {
        if step.is_system_template {
            self.system_template_path(&step.template_path)
        } else {
            self.user_template_path(&step.template_path)
        }
    }

    /// The finishing transform appended to every executed pipeline.
    pub fn response_step(&self) -> TransformStep {
        TransformStep::system(self.response_template.clone(), self.response_step_name.clone())
    }

    /// Web-application parameters, bound before anything a request adds.
    pub fn base_parameters(&self) -> ParameterSet {
        ParameterSet::from(self.parameters.as_slice())
    }
}

fn resolve_under(dir: &Path, template: &str) -> PathBuf {
    let template = Path::new(template);
    if template.is_absolute() {
        return paths::normalize(template);
    }
    paths::normalize(&dir.join(template))
}
