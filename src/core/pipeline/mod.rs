//! Pipeline definitions: the step model and the streaming parser that
//! builds it.
//!
//! - `step` / `parameter` - the closed set of step kinds and their data
//! - `definition` - the parsed, immutable [`Pipeline`]
//! - `parser` - event-driven builder over the definition vocabulary

pub mod definition;
pub mod parameter;
pub mod parser;
pub mod step;

pub use definition::{CacheDirective, Pipeline};
pub use parameter::{Parameter, ParameterName, DEFAULT_PARAMETER_TYPE};
pub use parser::{parse, parse_events, parse_file, PipelineParser};
pub use step::{
    ResponseStep, SchemaValidatorStep, SerializerKind, SerializerStep, Step, TransformStep,
};

/// Namespace of the pipeline vocabulary.
pub const PIPELINE_NAMESPACE: &str = "http://www.armatiek.com/xslweb/pipeline";

/// Namespace of the literal response vocabulary.
pub const RESPONSE_NAMESPACE: &str = "http://www.armatiek.com/xslweb/response";
