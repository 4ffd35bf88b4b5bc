use std::collections::BTreeMap;

use serde::Serialize;

use super::parameter::Parameter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SerializerKind {
    Json,
    Zip,
    Fop,
}

impl SerializerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SerializerKind::Json => "json-serializer",
            SerializerKind::Zip => "zip-serializer",
            SerializerKind::Fop => "fop-serializer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformStep {
    pub name: String,
    pub enable_log: bool,
    pub template_path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    pub is_system_template: bool,
}

impl TransformStep {
    pub fn new(template_path: impl Into<String>, name: impl Into<String>, enable_log: bool) -> Self {
        Self {
            name: name.into(),
            enable_log,
            template_path: template_path.into(),
            parameters: Vec::new(),
            is_system_template: false,
        }
    }

    /// A framework-provided template, resolved against the system template
    /// directory instead of the web application's own.
    pub fn system(template_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            is_system_template: true,
            ..Self::new(template_path, name, false)
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaValidatorStep {
    pub name: String,
    pub enable_log: bool,
    pub schema_paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_report_param_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_report_param_namespace: Option<String>,
}

impl SchemaValidatorStep {
    pub fn new(name: impl Into<String>, schema_paths: Vec<String>) -> Self {
        Self {
            name: name.into(),
            enable_log: false,
            schema_paths,
            error_report_param_name: None,
            error_report_param_namespace: None,
        }
    }

    pub fn with_error_report_param(mut self, name: impl Into<String>, namespace: Option<String>) -> Self {
        self.error_report_param_name = Some(name.into());
        self.error_report_param_namespace = namespace;
        self
    }
}

/// Terminal step that turns the result tree into the response body.
/// `options` is the kind-specific output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializerStep {
    pub name: String,
    pub enable_log: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl SerializerStep {
    pub fn new(name: impl Into<String>, enable_log: bool) -> Self {
        Self {
            name: name.into(),
            enable_log,
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseStep {
    pub name: String,
    pub literal_body: String,
}

impl ResponseStep {
    pub fn new(literal_body: impl Into<String>) -> Self {
        Self {
            name: "response".to_string(),
            literal_body: literal_body.into(),
        }
    }
}

/// One stage of a pipeline. The set is closed: destination resolution and
/// execution match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Step {
    Transform(TransformStep),
    SchemaValidator(SchemaValidatorStep),
    JsonSerializer(SerializerStep),
    ZipSerializer(SerializerStep),
    FopSerializer(SerializerStep),
    Response(ResponseStep),
}

impl Step {
    pub fn name(&self) -> &str {
        match self {
            Step::Transform(step) => &step.name,
            Step::SchemaValidator(step) => &step.name,
            Step::JsonSerializer(step) | Step::ZipSerializer(step) | Step::FopSerializer(step) => {
                &step.name
            }
            Step::Response(step) => &step.name,
        }
    }

    pub fn enable_log(&self) -> bool {
        match self {
            Step::Transform(step) => step.enable_log,
            Step::SchemaValidator(step) => step.enable_log,
            Step::JsonSerializer(step) | Step::ZipSerializer(step) | Step::FopSerializer(step) => {
                step.enable_log
            }
            Step::Response(_) => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Step::Transform(_) => "transformer",
            Step::SchemaValidator(_) => "schema-validator",
            Step::JsonSerializer(_) => SerializerKind::Json.as_str(),
            Step::ZipSerializer(_) => SerializerKind::Zip.as_str(),
            Step::FopSerializer(_) => SerializerKind::Fop.as_str(),
            Step::Response(_) => "response",
        }
    }

    /// The serializer kind and configuration of a terminal step.
    pub fn as_serializer(&self) -> Option<(SerializerKind, &SerializerStep)> {
        match self {
            Step::JsonSerializer(step) => Some((SerializerKind::Json, step)),
            Step::ZipSerializer(step) => Some((SerializerKind::Zip, step)),
            Step::FopSerializer(step) => Some((SerializerKind::Fop, step)),
            Step::Transform(_) | Step::SchemaValidator(_) | Step::Response(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.as_serializer().is_some()
    }

    pub fn as_transform(&self) -> Option<&TransformStep> {
        match self {
            Step::Transform(step) => Some(step),
            _ => None,
        }
    }
}
