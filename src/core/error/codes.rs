use super::ErrorCode;

pub fn all_codes() -> &'static [ErrorCode] {
    &[
        ErrorCode::PipelineInvalidDefinition,
        ErrorCode::PipelineMissingAttribute,
        ErrorCode::PipelineUnexpectedElement,
        ErrorCode::PipelineUnsupportedElement,
        ErrorCode::PipelineMalformed,
        ErrorCode::PipelineXmlSyntax,
        ErrorCode::PipelineNotFound,
        ErrorCode::EngineTransformationFailed,
        ErrorCode::EngineValidationReported,
        ErrorCode::EngineValidationFailed,
        ErrorCode::EngineUnresolvableDestination,
        ErrorCode::EngineSerializerUnavailable,
        ErrorCode::ConfigInvalidJson,
        ErrorCode::ConfigInvalidValue,
        ErrorCode::ValidationInvalidArgument,
        ErrorCode::InternalIoError,
        ErrorCode::InternalJsonError,
        ErrorCode::InternalUnexpected,
    ]
}

pub fn parse_code(code: &str) -> Option<ErrorCode> {
    all_codes()
        .iter()
        .copied()
        .find(|candidate| candidate.as_str() == code)
}
