use super::{codes, ErrorCode, Hint};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorHelpSummary {
    pub code: String,
    pub summary: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorHelp {
    pub code: String,
    pub summary: String,
    pub details_schema: serde_json::Value,
    pub hints: Vec<Hint>,
}

pub fn list() -> Vec<ErrorHelpSummary> {
    codes::all_codes()
        .iter()
        .copied()
        .map(|code| {
            let help = explain(code);
            ErrorHelpSummary {
                code: help.code,
                summary: help.summary,
            }
        })
        .collect()
}

fn help(code: ErrorCode, summary: &str, details_schema: serde_json::Value, hint: &str) -> ErrorHelp {
    ErrorHelp {
        code: code.as_str().to_string(),
        summary: summary.to_string(),
        details_schema,
        hints: vec![Hint {
            message: hint.to_string(),
        }],
    }
}

pub fn explain(code: ErrorCode) -> ErrorHelp {
    use serde_json::json;

    match code {
        ErrorCode::PipelineInvalidDefinition => help(
            code,
            "Pipeline definition could not be parsed",
            json!({"source":"string?","cause":{"code":"string","message":"string","details":"object"}}),
            "Look at cause.code for the specific problem",
        ),
        ErrorCode::PipelineMissingAttribute => help(
            code,
            "Required attribute is absent or blank",
            json!({"element":"string","attribute":"string"}),
            "Add the attribute with a non-blank value",
        ),
        ErrorCode::PipelineUnexpectedElement => help(
            code,
            "Element is not allowed at this position",
            json!({"element":"string","problem":"string"}),
            "A parameter must directly follow its transformer; value must sit inside a parameter",
        ),
        ErrorCode::PipelineUnsupportedElement => help(
            code,
            "Unknown element in the pipeline vocabulary",
            json!({"element":"string","problem":"string"}),
            "Supported elements: pipeline, transformer, parameter, value, json-serializer",
        ),
        ErrorCode::PipelineMalformed => help(
            code,
            "Pipeline attribute value cannot be interpreted",
            json!({"attribute":"string?","value":"string?","problem":"string"}),
            "cache-time-to-live and cache-time-to-idle must be whole numbers of seconds",
        ),
        ErrorCode::PipelineXmlSyntax => help(
            code,
            "Pipeline definition is not well-formed XML",
            json!({"error":"string","position":"number?"}),
            "Fix the XML syntax near the reported position",
        ),
        ErrorCode::PipelineNotFound => help(
            code,
            "No pipeline steps resolved for the request",
            json!({"id":"string?"}),
            "Check that the request dispatcher emits at least one step for this path",
        ),
        ErrorCode::EngineTransformationFailed => help(
            code,
            "A transformation step failed",
            json!({"step":"string"}),
            "Inspect the cause for the processor's error message",
        ),
        ErrorCode::EngineValidationReported => help(
            code,
            "Schema validation produced a report",
            json!({"label":"string","messages":"string[]"}),
            "Bind the report to a stylesheet parameter to handle it in the next transformer",
        ),
        ErrorCode::EngineValidationFailed => help(
            code,
            "Schema validation machinery failed",
            json!({"step":"string"}),
            "Check that every schema path exists and compiles",
        ),
        ErrorCode::EngineUnresolvableDestination => help(
            code,
            "No destination matches this pair of adjacent steps",
            json!({"step":"string","nextStep":"string?"}),
            "A transformer can only feed a transformer, a schema validator or a serializer",
        ),
        ErrorCode::EngineSerializerUnavailable => help(
            code,
            "Serializer kind has no registered factory",
            json!({"kind":"string","step":"string"}),
            "Provide a SerializerFactory that handles this kind",
        ),
        ErrorCode::ConfigInvalidJson => help(
            code,
            "Configuration JSON is invalid",
            json!({"path":"string","error":"string"}),
            "Fix JSON syntax in the referenced file",
        ),
        ErrorCode::ConfigInvalidValue => help(
            code,
            "Configuration value is invalid",
            json!({"key":"string","value":"string?","problem":"string"}),
            "Correct the config value to match expected type/format",
        ),
        ErrorCode::ValidationInvalidArgument => help(
            code,
            "Argument value is invalid",
            json!({"field":"string","problem":"string","id":"string?","tried":"string[]?"}),
            "Check the command usage with --help",
        ),
        ErrorCode::InternalIoError => help(
            code,
            "Internal IO error",
            json!({"error":"string","context":"string?"}),
            "Check file permissions and that the output sink is still open",
        ),
        ErrorCode::InternalJsonError => help(
            code,
            "Internal JSON error",
            json!({"error":"string","context":"string?"}),
            "Report as a bug if persistent",
        ),
        ErrorCode::InternalUnexpected => help(
            code,
            "Unexpected internal error",
            json!({}),
            "Report as a bug with steps to reproduce",
        ),
    }
}
