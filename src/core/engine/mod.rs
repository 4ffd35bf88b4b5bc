//! Pipeline execution: destination resolution, parameter threading and the
//! request boundary, on top of pluggable processing capabilities.

pub mod capability;
pub mod charset;
pub mod destination;
pub mod diagnostics;
pub mod executor;
pub mod output;
pub mod params;
pub mod report;
pub mod request;
pub mod serializers;
pub mod template_cache;

pub use capability::{
    CompiledProgram, DiagnosticSink, ErrorListener, Processor, ResultSink, SerializerFactory, Source,
    Validation,
};
pub use charset::{Charset, EncodingWriter};
pub use destination::{resolve, DebugTee, Destination, DocumentDestination, FinalSerializer, ResolveContext};
pub use diagnostics::{MemoryDiagnostics, TracingDiagnostics, TransformationErrorListener};
pub use executor::{with_finishing_step, Engine, ExecutionSummary};
pub use output::{OutputMethod, OutputProperties};
pub use params::{ParameterSet, ParameterValue};
pub use report::{Severity, ValidationMessage, ValidationReport};
pub use request::{Request, RequestScope, ResponseHead};
pub use serializers::{BuiltinSerializers, JsonSerializer, ZipSerializer};
pub use template_cache::TemplateCache;
