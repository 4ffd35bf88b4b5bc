// Public modules
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod xml;

// Re-export common types for convenience
pub use config::EngineConfig;
pub use engine::{Engine, ExecutionSummary, ParameterSet, ParameterValue, Processor, Request, ResponseHead};
pub use error::{Error, ErrorCode, Result};
pub use pipeline::{Parameter, ParameterName, Pipeline, Step};
