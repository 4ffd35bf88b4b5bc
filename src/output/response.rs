//! The JSON envelope every command prints, and exit codes per error code.

use std::io::{self, Write};

use serde::Serialize;
use xslpipe::error::Hint;
use xslpipe::{Error, ErrorCode, Result};

/// `{success, data}` on success, `{success, error}` on failure.
#[derive(Debug, Serialize)]
struct Envelope<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody<'a>>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    message: &'a str,
    details: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    hints: Option<&'a [Hint]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
}

impl<'a> Envelope<'a> {
    fn from_result(result: &'a Result<serde_json::Value>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(err) => Self {
                success: false,
                data: None,
                error: Some(ErrorBody {
                    code: err.code.as_str(),
                    message: &err.message,
                    details: &err.details,
                    hints: (!err.hints.is_empty()).then_some(err.hints.as_slice()),
                    retryable: err.retryable,
                }),
            },
        }
    }
}

pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                )),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

pub(crate) fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::PipelineInvalidDefinition
        | ErrorCode::PipelineMissingAttribute
        | ErrorCode::PipelineUnexpectedElement
        | ErrorCode::PipelineUnsupportedElement
        | ErrorCode::PipelineMalformed
        | ErrorCode::PipelineXmlSyntax
        | ErrorCode::ConfigInvalidJson
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ValidationInvalidArgument => 2,

        ErrorCode::PipelineNotFound => 4,

        ErrorCode::EngineTransformationFailed
        | ErrorCode::EngineValidationReported
        | ErrorCode::EngineValidationFailed
        | ErrorCode::EngineUnresolvableDestination
        | ErrorCode::EngineSerializerUnavailable => 20,

        ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => 1,
    }
}

/// Prints the envelope for `result` to stdout. A closed pipe is not an error.
pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    let payload = serde_json::to_string_pretty(&Envelope::from_result(&result))
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize response".to_string())))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match writeln!(handle, "{}", payload) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope_json(result: Result<serde_json::Value>) -> serde_json::Value {
        serde_json::to_value(Envelope::from_result(&result)).unwrap()
    }

    #[test]
    fn definition_errors_exit_with_two() {
        let err = Error::pipeline_invalid_definition(
            None,
            Error::pipeline_unsupported_element("serializer"),
        );
        let (result, code) = map_cmd_result_to_json::<()>(Err(err));
        assert!(result.is_err());
        assert_eq!(code, 2);
    }

    #[test]
    fn success_envelope_carries_data_only() {
        let value = envelope_json(Ok(serde_json::json!({ "stepCount": 2 })));
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["stepCount"], 2);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn error_envelope_omits_empty_hints() {
        let value = envelope_json(Err(Error::internal_unexpected("boom")));
        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "internal.unexpected");
        assert!(value["error"].get("hints").is_none());
        assert!(value.get("data").is_none());
    }

    #[test]
    fn not_found_envelope_keeps_hint() {
        let value = envelope_json(Err(Error::pipeline_not_found(None)));
        assert_eq!(value["error"]["code"], "pipeline.not_found");
        assert_eq!(
            value["error"]["hints"][0]["message"],
            "The resolved pipeline has no steps for this request"
        );
        assert_eq!(exit_code_for_error(ErrorCode::PipelineNotFound), 4);
    }
}
