//! Streaming builder for pipeline definitions.
//!
//! The parser is a plain state machine over [`XmlEvent`]s: feed events with
//! [`PipelineParser::handle`] in document order, then call
//! [`PipelineParser::finish`]. It never looks back at earlier events, so it
//! can be driven straight from a reader or from a hand-built event list.

use std::path::Path;

use super::definition::{CacheDirective, Pipeline, DEFAULT_CACHE_SECONDS, DEFAULT_CACHE_SCOPE};
use super::parameter::Parameter;
use super::step::{ResponseStep, SerializerStep, Step, TransformStep};
use super::{PIPELINE_NAMESPACE, RESPONSE_NAMESPACE};
use crate::error::{Error, Result};
use crate::utils::{io, validation};
use crate::xml::{ElementStart, EventReader, NamespaceBinding, QualifiedName, XmlEvent, XmlWriter};

/// Parse a definition held in memory.
pub fn parse(definition: &str) -> Result<Pipeline> {
    parse_labeled(definition, None)
}

/// Read and parse a definition file.
pub fn parse_file(path: &Path) -> Result<Pipeline> {
    let definition = io::read_file(path, "read pipeline definition")?;
    parse_labeled(&definition, Some(path.display().to_string()))
}

/// Parse from any event source, e.g. events produced by another stage.
pub fn parse_events<I>(events: I) -> Result<Pipeline>
where
    I: IntoIterator<Item = Result<XmlEvent>>,
{
    let mut parser = PipelineParser::new();
    for event in events {
        let event = event.map_err(|e| Error::pipeline_invalid_definition(None, e))?;
        parser.handle(&event)?;
    }
    parser.finish()
}

fn parse_labeled(definition: &str, source: Option<String>) -> Result<Pipeline> {
    let mut parser = PipelineParser::new();
    parser.source = source.clone();
    for event in EventReader::new(definition) {
        let event = event.map_err(|e| Error::pipeline_invalid_definition(source.clone(), e))?;
        parser.handle(&event)?;
    }
    parser.finish()
}

/// Re-emits a `response` sub-tree verbatim into memory.
struct LiteralCapture {
    writer: XmlWriter<Vec<u8>>,
    depth: usize,
}

#[derive(Default)]
pub struct PipelineParser {
    source: Option<String>,
    steps: Vec<Step>,
    cache: CacheDirective,
    text: String,
    current_parameter: Option<usize>,
    capture: Option<LiteralCapture>,
    scopes: Vec<Vec<NamespaceBinding>>,
}

impl PipelineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps built so far.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    pub fn handle(&mut self, event: &XmlEvent) -> Result<()> {
        self.apply(event)
            .map_err(|e| Error::pipeline_invalid_definition(self.source.clone(), e))
    }

    pub fn finish(self) -> Result<Pipeline> {
        if self.capture.is_some() {
            return Err(Error::pipeline_invalid_definition(
                self.source,
                Error::pipeline_malformed(None, None, "response element is never closed"),
            ));
        }
        Ok(Pipeline::new(self.steps, self.cache))
    }

    fn apply(&mut self, event: &XmlEvent) -> Result<()> {
        match event {
            XmlEvent::Open(start) => {
                self.scopes.push(start.namespaces.clone());
                if let Some(capture) = self.capture.as_mut() {
                    capture.depth += 1;
                    return capture.writer.write(event);
                }
                self.open(start)
            }
            XmlEvent::Text(text) => {
                self.text.push_str(text);
                if let Some(capture) = self.capture.as_mut() {
                    capture.writer.write(event)?;
                }
                Ok(())
            }
            XmlEvent::Close(name) => {
                let result = self.close(event, name);
                self.scopes.pop();
                self.text.clear();
                result
            }
        }
    }

    fn open(&mut self, start: &ElementStart) -> Result<()> {
        if start.name.in_namespace(PIPELINE_NAMESPACE) {
            match start.name.local.as_str() {
                "pipeline" => self.open_pipeline(start),
                "transformer" => self.open_transformer(start),
                "parameter" => self.open_parameter(start),
                "value" => {
                    if self.current_parameter.is_none() {
                        return Err(Error::pipeline_unexpected_element("value"));
                    }
                    self.text.clear();
                    Ok(())
                }
                "json-serializer" => self.open_json_serializer(start),
                other => Err(Error::pipeline_unsupported_element(other)),
            }
        } else if start.name.is(RESPONSE_NAMESPACE, "response") {
            self.begin_capture(start)
        } else {
            Ok(())
        }
    }

    fn close(&mut self, event: &XmlEvent, name: &QualifiedName) -> Result<()> {
        if let Some(capture) = self.capture.as_mut() {
            capture.writer.write(event)?;
            capture.depth -= 1;
            if capture.depth == 0 {
                return self.end_capture();
            }
            return Ok(());
        }

        if name.in_namespace(PIPELINE_NAMESPACE) {
            match name.local.as_str() {
                "value" => {
                    let value = self.text.clone();
                    if let Some(parameter) = self.current_parameter_mut() {
                        parameter.add_value(value);
                    }
                }
                "parameter" => self.current_parameter = None,
                _ => {}
            }
        }
        Ok(())
    }

    fn open_pipeline(&mut self, start: &ElementStart) -> Result<()> {
        let enabled = validation::flag(start.attribute("cache"));
        if !enabled {
            self.cache = CacheDirective::default();
            return Ok(());
        }

        self.cache = CacheDirective {
            enabled,
            key: start.attribute("cache-key").map(str::to_string),
            time_to_live_seconds: validation::seconds(
                start.attribute("cache-time-to-live"),
                "cache-time-to-live",
                DEFAULT_CACHE_SECONDS,
            )?,
            time_to_idle_seconds: validation::seconds(
                start.attribute("cache-time-to-idle"),
                "cache-time-to-idle",
                DEFAULT_CACHE_SECONDS,
            )?,
            scope: start
                .attribute("cache-scope")
                .unwrap_or(DEFAULT_CACHE_SCOPE)
                .to_string(),
            include_headers: validation::flag(start.attribute("cache-headers")),
        };
        Ok(())
    }

    fn open_transformer(&mut self, start: &ElementStart) -> Result<()> {
        let template_path =
            validation::require_attribute(start.attribute("xsl-path"), "transformer", "xsl-path")?;
        let name = self.step_name(start, "transformer");
        let enable_log = validation::flag(start.attribute("log"));

        self.current_parameter = None;
        self.steps.push(Step::Transform(TransformStep::new(
            template_path,
            name,
            enable_log,
        )));
        Ok(())
    }

    fn open_parameter(&mut self, start: &ElementStart) -> Result<()> {
        let Some(Step::Transform(step)) = self.steps.last_mut() else {
            return Err(Error::pipeline_unexpected_element("parameter"));
        };
        let name = validation::require_attribute(start.attribute("name"), "parameter", "name")?;

        step.parameters.push(Parameter::new(
            name,
            start.attribute("uri").map(str::to_string),
            start.attribute("type").map(str::to_string),
        ));
        self.current_parameter = Some(step.parameters.len() - 1);
        Ok(())
    }

    fn open_json_serializer(&mut self, start: &ElementStart) -> Result<()> {
        let mut step = SerializerStep::new(
            self.step_name(start, "json-serializer"),
            validation::flag(start.attribute("log")),
        );
        for attr in &start.attributes {
            if attr.name.namespace.is_none() && attr.name.local != "name" && attr.name.local != "log" {
                step.options.insert(attr.name.local.clone(), attr.value.clone());
            }
        }

        self.current_parameter = None;
        self.steps.push(Step::JsonSerializer(step));
        Ok(())
    }

    fn begin_capture(&mut self, start: &ElementStart) -> Result<()> {
        let mut root = start.clone();
        root.namespaces = self.in_scope_namespaces();

        let mut writer = XmlWriter::new(Vec::new(), false);
        writer.write(&XmlEvent::Open(root))?;
        self.capture = Some(LiteralCapture { writer, depth: 1 });
        Ok(())
    }

    fn end_capture(&mut self) -> Result<()> {
        let Some(capture) = self.capture.take() else {
            return Ok(());
        };
        let body = String::from_utf8(capture.writer.into_inner()).map_err(|e| {
            Error::pipeline_malformed(None, None, format!("response is not UTF-8: {}", e))
        })?;

        self.current_parameter = None;
        self.steps.push(Step::Response(ResponseStep::new(body)));
        Ok(())
    }

    /// Bindings visible on the innermost open element, outermost first.
    /// Inner declarations shadow outer ones with the same prefix.
    fn in_scope_namespaces(&self) -> Vec<NamespaceBinding> {
        let mut bindings: Vec<NamespaceBinding> = Vec::new();
        for scope in &self.scopes {
            for binding in scope {
                match bindings.iter_mut().find(|b| b.prefix == binding.prefix) {
                    Some(existing) => existing.uri = binding.uri.clone(),
                    None => bindings.push(binding.clone()),
                }
            }
        }
        bindings.retain(|binding| !binding.uri.is_empty() || binding.prefix.is_none());
        bindings
    }

    fn current_parameter_mut(&mut self) -> Option<&mut Parameter> {
        let index = self.current_parameter?;
        match self.steps.last_mut() {
            Some(Step::Transform(step)) => step.parameters.get_mut(index),
            _ => None,
        }
    }

    fn step_name(&self, start: &ElementStart, kind: &str) -> String {
        start
            .attribute("name")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}-{}", kind, self.steps.len() + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn pipeline_element(local: &str) -> ElementStart {
        ElementStart::new(QualifiedName::new(Some(PIPELINE_NAMESPACE), local))
    }

    fn close(local: &str) -> XmlEvent {
        XmlEvent::Close(QualifiedName::new(Some(PIPELINE_NAMESPACE), local))
    }

    #[test]
    fn transitions_work_without_a_reader() {
        let mut parser = PipelineParser::new();
        parser.handle(&XmlEvent::Open(pipeline_element("pipeline"))).unwrap();
        parser
            .handle(&XmlEvent::Open(
                pipeline_element("transformer").with_attribute("xsl-path", "a.xsl"),
            ))
            .unwrap();
        parser
            .handle(&XmlEvent::Open(
                pipeline_element("parameter").with_attribute("name", "p"),
            ))
            .unwrap();
        parser.handle(&XmlEvent::Open(pipeline_element("value"))).unwrap();
        parser.handle(&XmlEvent::Text("one".to_string())).unwrap();
        parser.handle(&close("value")).unwrap();
        parser.handle(&close("parameter")).unwrap();
        parser.handle(&close("transformer")).unwrap();
        parser.handle(&close("pipeline")).unwrap();

        let pipeline = parser.finish().unwrap();
        let step = pipeline.steps()[0].as_transform().unwrap();
        assert_eq!(step.name, "transformer-1");
        assert_eq!(step.parameters[0].values, vec!["one".to_string()]);
    }

    #[test]
    fn value_outside_parameter_is_unexpected() {
        let mut parser = PipelineParser::new();
        parser
            .handle(&XmlEvent::Open(
                pipeline_element("transformer").with_attribute("xsl-path", "a.xsl"),
            ))
            .unwrap();
        let err = parser
            .handle(&XmlEvent::Open(pipeline_element("value")))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PipelineInvalidDefinition);
        assert_eq!(err.root_cause().code, ErrorCode::PipelineUnexpectedElement);
    }

    #[test]
    fn unterminated_capture_fails_on_finish() {
        let mut parser = PipelineParser::new();
        parser
            .handle(&XmlEvent::Open(ElementStart::new(QualifiedName::new(
                Some(RESPONSE_NAMESPACE),
                "response",
            ))))
            .unwrap();
        assert!(parser.is_capturing());

        let err = parser.finish().unwrap_err();
        assert_eq!(err.root_cause().code, ErrorCode::PipelineMalformed);
    }

    #[test]
    fn foreign_elements_are_ignored_outside_capture() {
        let mut parser = PipelineParser::new();
        parser
            .handle(&XmlEvent::Open(ElementStart::new(QualifiedName::new(
                Some("urn:other"),
                "note",
            ))))
            .unwrap();
        parser
            .handle(&XmlEvent::Close(QualifiedName::new(Some("urn:other"), "note")))
            .unwrap();
        assert!(parser.finish().unwrap().is_empty());
    }

    #[test]
    fn in_scope_namespaces_are_declared_on_captured_root() {
        let mut parser = PipelineParser::new();
        parser
            .handle(&XmlEvent::Open(
                pipeline_element("pipeline")
                    .with_namespace(None, PIPELINE_NAMESPACE)
                    .with_namespace(Some("r"), RESPONSE_NAMESPACE),
            ))
            .unwrap();
        let response = QualifiedName::new(Some(RESPONSE_NAMESPACE), "response").with_prefix("r");
        parser
            .handle(&XmlEvent::Open(ElementStart::new(response.clone())))
            .unwrap();
        parser.handle(&XmlEvent::Close(response)).unwrap();

        let Step::Response(step) = &parser.steps()[0] else {
            panic!("expected response step");
        };
        assert!(step.literal_body.contains(&format!("xmlns:r=\"{}\"", RESPONSE_NAMESPACE)));
        assert!(step.literal_body.contains(&format!("xmlns=\"{}\"", PIPELINE_NAMESPACE)));
    }
}
