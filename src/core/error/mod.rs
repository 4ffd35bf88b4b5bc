use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod codes;
pub mod help;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    PipelineInvalidDefinition,
    PipelineMissingAttribute,
    PipelineUnexpectedElement,
    PipelineUnsupportedElement,
    PipelineMalformed,
    PipelineXmlSyntax,
    PipelineNotFound,

    EngineTransformationFailed,
    EngineValidationReported,
    EngineValidationFailed,
    EngineUnresolvableDestination,
    EngineSerializerUnavailable,

    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationInvalidArgument,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::PipelineInvalidDefinition => "pipeline.invalid_definition",
            ErrorCode::PipelineMissingAttribute => "pipeline.missing_attribute",
            ErrorCode::PipelineUnexpectedElement => "pipeline.unexpected_element",
            ErrorCode::PipelineUnsupportedElement => "pipeline.unsupported_element",
            ErrorCode::PipelineMalformed => "pipeline.malformed",
            ErrorCode::PipelineXmlSyntax => "pipeline.xml_syntax",
            ErrorCode::PipelineNotFound => "pipeline.not_found",

            ErrorCode::EngineTransformationFailed => "engine.transformation_failed",
            ErrorCode::EngineValidationReported => "engine.validation_reported",
            ErrorCode::EngineValidationFailed => "engine.validation_failed",
            ErrorCode::EngineUnresolvableDestination => "engine.unresolvable_destination",
            ErrorCode::EngineSerializerUnavailable => "engine.serializer_unavailable",

            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingAttributeDetails {
    pub element: String,
    pub attribute: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDetails {
    pub element: String,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MalformedDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDetails {
    pub step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
    pub cause: Option<Box<Error>>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
            cause: None,
        }
    }

    /// Wraps any parser-level failure so callers see a single structural
    /// error while the original stays reachable through `cause`.
    pub fn pipeline_invalid_definition(source: Option<String>, cause: Error) -> Self {
        let details = serde_json::json!({
            "source": source,
            "cause": {
                "code": cause.code.as_str(),
                "message": cause.message,
                "details": cause.details,
            },
        });

        let mut err = Self::new(
            ErrorCode::PipelineInvalidDefinition,
            format!("Invalid pipeline definition: {}", cause.message),
            details,
        );
        err.hints = cause.hints.clone();
        err.cause = Some(Box::new(cause));
        err
    }

    pub fn pipeline_missing_attribute(
        element: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        let element = element.into();
        let attribute = attribute.into();
        let message = format!(
            "Element \"{}\" must have an attribute \"{}\"",
            element, attribute
        );
        Self::new(
            ErrorCode::PipelineMissingAttribute,
            message,
            to_details(MissingAttributeDetails { element, attribute }),
        )
    }

    pub fn pipeline_unexpected_element(element: impl Into<String>) -> Self {
        let element = element.into();
        let problem = format!(
            "Element \"{}\" not expected at this location in pipeline definition",
            element
        );
        Self::new(
            ErrorCode::PipelineUnexpectedElement,
            problem.clone(),
            to_details(ElementDetails { element, problem }),
        )
    }

    pub fn pipeline_unsupported_element(element: impl Into<String>) -> Self {
        let element = element.into();
        let problem = format!("Pipeline element \"{}\" not supported", element);
        Self::new(
            ErrorCode::PipelineUnsupportedElement,
            problem.clone(),
            to_details(ElementDetails { element, problem }),
        )
    }

    pub fn pipeline_malformed(
        attribute: Option<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let problem = problem.into();
        Self::new(
            ErrorCode::PipelineMalformed,
            format!("Malformed pipeline: {}", problem),
            to_details(MalformedDetails {
                attribute,
                value,
                problem,
            }),
        )
    }

    pub fn pipeline_xml_syntax(error: impl Into<String>, position: Option<u64>) -> Self {
        Self::new(
            ErrorCode::PipelineXmlSyntax,
            "Pipeline definition is not well-formed XML",
            serde_json::json!({ "error": error.into(), "position": position }),
        )
    }

    pub fn pipeline_not_found(id: Option<String>) -> Self {
        Self::new(
            ErrorCode::PipelineNotFound,
            "Resource not found",
            serde_json::json!({ "id": id }),
        )
        .with_hint("The resolved pipeline has no steps for this request")
    }

    pub fn transformation_failed(step: impl Into<String>, cause: Error) -> Self {
        let step = step.into();
        let mut err = Self::new(
            ErrorCode::EngineTransformationFailed,
            format!("Transformation in step \"{}\" failed: {}", step, cause.message),
            to_details(StepDetails {
                step,
                next_step: None,
            }),
        );
        err.cause = Some(Box::new(cause));
        err
    }

    pub fn validation_reported(label: impl Into<String>, messages: Vec<String>) -> Self {
        let label = label.into();
        Self::new(
            ErrorCode::EngineValidationReported,
            format!("Schema validation reported {} problem(s)", messages.len()),
            serde_json::json!({ "label": label, "messages": messages }),
        )
    }

    pub fn validation_failed(step: impl Into<String>, cause: Error) -> Self {
        let step = step.into();
        let mut err = Self::new(
            ErrorCode::EngineValidationFailed,
            format!("Schema validation in step \"{}\" failed: {}", step, cause.message),
            to_details(StepDetails {
                step,
                next_step: None,
            }),
        );
        err.cause = Some(Box::new(cause));
        err
    }

    pub fn unresolvable_destination(step: impl Into<String>, next_step: Option<String>) -> Self {
        Self::new(
            ErrorCode::EngineUnresolvableDestination,
            "Could not determine destination",
            to_details(StepDetails {
                step: step.into(),
                next_step,
            }),
        )
    }

    pub fn serializer_unavailable(kind: impl Into<String>, step: impl Into<String>) -> Self {
        let kind = kind.into();
        Self::new(
            ErrorCode::EngineSerializerUnavailable,
            format!("No serializer available for \"{}\"", kind),
            serde_json::json!({ "kind": kind, "step": step.into() }),
        )
        .with_hint("Register a SerializerFactory that supports this serializer kind")
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            to_details(ConfigInvalidJsonDetails {
                path: path.into(),
                error: err.to_string(),
            }),
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            to_details(ConfigInvalidValueDetails {
                key: key.into(),
                value,
                problem: problem.into(),
            }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            to_details(InvalidArgumentDetails {
                field: field.into(),
                problem: problem.into(),
                id,
                tried,
            }),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalIoError,
            "IO error",
            to_details(InternalIoErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            to_details(InternalJsonErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    /// The innermost error in the `cause` chain.
    pub fn root_cause(&self) -> &Error {
        let mut current = self;
        while let Some(cause) = current.cause.as_deref() {
            current = cause;
        }
        current
    }

    pub fn is_not_found(&self) -> bool {
        self.root_cause().code == ErrorCode::PipelineNotFound
    }

    /// Every message in the chain, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut messages = vec![self.message.clone()];
        let mut current = self;
        while let Some(cause) = current.cause.as_deref() {
            messages.push(cause.message.clone());
            current = cause;
        }
        messages
    }
}
