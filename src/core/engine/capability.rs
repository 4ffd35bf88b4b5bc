//! Seams to the collaborators the engine drives but does not implement:
//! the transformation/validation processor, serializer factories and the
//! diagnostic sink.

use std::io::Write;
use std::path::Path;

use super::output::OutputProperties;
use super::params::ParameterSet;
use super::report::ValidationReport;
use crate::error::Result;
use crate::pipeline::{SerializerKind, SerializerStep};
use crate::xml::{XmlDocument, XmlEvent};

/// Input of a stage: serialized markup or a tree produced by the previous
/// stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Text(String),
    Document(XmlDocument),
}

impl Source {
    /// Serialized form, indented when it has to be rendered from a tree.
    pub fn to_text(&self) -> Result<String> {
        match self {
            Source::Text(text) => Ok(text.clone()),
            Source::Document(document) => document.to_xml_string(true),
        }
    }

    pub fn to_document(&self) -> Result<XmlDocument> {
        match self {
            Source::Text(text) => XmlDocument::parse(text),
            Source::Document(document) => Ok(document.clone()),
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Source::Document(_))
    }
}

/// Receiver of a stage's result tree.
pub trait ResultSink {
    fn write(&mut self, event: &XmlEvent) -> Result<()>;

    /// Called once after the producing stage succeeded.
    fn finish(&mut self) -> Result<()>;
}

/// Collects messages the processor reports while compiling or running.
pub trait ErrorListener {
    fn warning(&mut self, message: &str);
    fn error(&mut self, message: &str);
}

/// A compiled transformation program.
pub trait CompiledProgram: Send + Sync {
    /// Serialization parameters the program declares (`xsl:output`).
    fn output_properties(&self) -> OutputProperties;
}

/// Outcome of validating one document against a schema set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// The validated (possibly augmented) document, serialized.
    pub output: String,
    /// Present when validation produced findings.
    pub report: Option<ValidationReport>,
}

/// The document-transformation and validation engine.
///
/// Implementations must be pure functions of their inputs for a given
/// path: the template cache may compile the same path twice under a race.
pub trait Processor: Send + Sync {
    type Program: CompiledProgram;

    fn compile(&self, path: &Path, listener: &mut dyn ErrorListener) -> Result<Self::Program>;

    /// Writes the result tree into `destination`. The engine calls
    /// [`ResultSink::finish`] after this returns.
    fn transform(
        &self,
        program: &Self::Program,
        source: &Source,
        parameters: &ParameterSet,
        destination: &mut dyn ResultSink,
        listener: &mut dyn ErrorListener,
    ) -> Result<()>;

    /// Validation findings are returned as data; `Err` means the schema
    /// machinery itself failed.
    fn validate(&self, schema_paths: &[String], source: &Source, label: &str) -> Result<Validation>;
}

/// Builds the sink a terminal serializer step writes through.
pub trait SerializerFactory: Send + Sync {
    fn destination<'a>(
        &self,
        kind: SerializerKind,
        step: &SerializerStep,
        sink: &'a mut dyn Write,
        properties: &OutputProperties,
    ) -> Result<Box<dyn ResultSink + 'a>>;
}

/// Receives human-readable copies of step output in development mode.
pub trait DiagnosticSink: Send + Sync {
    fn step_output(&self, step_name: &str, content: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_source_renders_indented_text() {
        let document = XmlDocument::parse("<a><b>x</b></a>").unwrap();
        let text = Source::Document(document).to_text().unwrap();
        assert!(text.contains("\n  <b>x</b>"));
    }

    #[test]
    fn text_source_parses_to_document() {
        let source = Source::Text("<a/>".to_string());
        assert!(!source.is_document());
        assert_eq!(
            source.to_document().unwrap().root_name().map(|n| n.local.clone()),
            Some("a".to_string())
        );
    }
}
