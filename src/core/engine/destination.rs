//! Where a step writes its result, decided from the step that follows it.

use std::io::Write;

use tracing::warn;

use super::capability::{DiagnosticSink, ResultSink, SerializerFactory};
use super::charset::{Charset, EncodingWriter};
use super::output::{OutputMethod, OutputProperties};
use crate::error::{Error, Result};
use crate::pipeline::{SerializerKind, Step};
use crate::xml::{QualifiedName, XmlDocument, XmlEvent, XmlWriter};

/// Collects a result tree in memory so the next stage can read it.
#[derive(Debug, Default)]
pub struct DocumentDestination {
    document: XmlDocument,
}

impl DocumentDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_document(self) -> XmlDocument {
        self.document
    }
}

impl ResultSink for DocumentDestination {
    fn write(&mut self, event: &XmlEvent) -> Result<()> {
        self.document.push(event.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Elements the HTML output method writes without an end tag.
const HTML_VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "br", "col", "embed", "frame", "hr", "img", "input", "link",
    "meta", "param", "source", "track", "wbr",
];

const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

fn is_html_void(name: &QualifiedName) -> bool {
    let html = match name.namespace.as_deref() {
        None => true,
        Some(namespace) => namespace == XHTML_NAMESPACE,
    };
    html && HTML_VOID_ELEMENTS
        .iter()
        .any(|void| void.eq_ignore_ascii_case(&name.local))
}

/// Serializes the last stage's result straight into the response sink.
pub struct FinalSerializer<'a> {
    writer: XmlWriter<EncodingWriter<'a>>,
    properties: OutputProperties,
    method: OutputMethod,
    started: bool,
    open_void: Option<QualifiedName>,
}

impl<'a> FinalSerializer<'a> {
    pub fn new(sink: &'a mut dyn Write, properties: OutputProperties) -> Self {
        let method = properties.method();
        let indent = method != OutputMethod::Text && properties.is_yes("indent");
        let label = properties.get("encoding").unwrap_or("UTF-8");
        let charset = Charset::from_label(label).unwrap_or_else(|| {
            warn!(encoding = %label, "unsupported output encoding, writing UTF-8");
            Charset::Utf8
        });
        let encoder = EncodingWriter::new(sink, charset, method != OutputMethod::Text);
        Self {
            writer: XmlWriter::new(encoder, indent),
            properties,
            method,
            started: false,
            open_void: None,
        }
    }

    fn start(&mut self) -> Result<()> {
        self.started = true;
        let wants_declaration = matches!(self.method, OutputMethod::Xml | OutputMethod::Xhtml)
            && !self.properties.is_yes("omit-xml-declaration");
        if wants_declaration {
            let encoding = self.writer.get_mut().charset().name();
            let standalone = self
                .properties
                .get("standalone")
                .filter(|value| *value == "yes" || *value == "no")
                .map(str::to_string);
            self.writer
                .write_declaration(Some(encoding), standalone.as_deref())?;
        }
        Ok(())
    }

    fn write_html(&mut self, event: &XmlEvent) -> Result<()> {
        match event {
            XmlEvent::Open(start) if is_html_void(&start.name) => {
                self.open_void = Some(start.name.clone());
                self.writer.write_void(start)
            }
            XmlEvent::Close(name) if self.open_void.as_ref() == Some(name) => {
                self.open_void = None;
                Ok(())
            }
            _ => self.writer.write(event),
        }
    }
}

impl ResultSink for FinalSerializer<'_> {
    fn write(&mut self, event: &XmlEvent) -> Result<()> {
        if !self.started {
            self.start()?;
        }
        match (self.method, event) {
            (OutputMethod::Text, XmlEvent::Text(text)) => self.writer.write_raw_text(text),
            (OutputMethod::Text, _) => Ok(()),
            (OutputMethod::Html, _) => self.write_html(event),
            _ => self.writer.write(event),
        }
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .get_mut()
            .flush()
            .map_err(|e| Error::internal_io(e.to_string(), Some("flush response".to_string())))
    }
}

/// Duplicates a step's result into the diagnostic sink as indented markup.
pub struct DebugTee<'a> {
    step_name: String,
    events: Vec<XmlEvent>,
    diagnostics: &'a dyn DiagnosticSink,
}

impl<'a> DebugTee<'a> {
    pub fn new(step_name: impl Into<String>, diagnostics: &'a dyn DiagnosticSink) -> Self {
        Self {
            step_name: step_name.into(),
            events: Vec::new(),
            diagnostics,
        }
    }
}

impl ResultSink for DebugTee<'_> {
    fn write(&mut self, event: &XmlEvent) -> Result<()> {
        self.events.push(event.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let content = crate::xml::writer::to_string(&self.events, true)?;
        self.diagnostics.step_output(&self.step_name, &content);
        Ok(())
    }
}

enum Target<'a> {
    Document(DocumentDestination),
    Serializer(Box<dyn ResultSink + 'a>),
}

/// A resolved destination, optionally teed to diagnostics.
pub struct Destination<'a> {
    target: Target<'a>,
    tee: Option<DebugTee<'a>>,
}

impl<'a> Destination<'a> {
    pub fn document() -> Self {
        Self {
            target: Target::Document(DocumentDestination::new()),
            tee: None,
        }
    }

    pub fn serializer(sink: Box<dyn ResultSink + 'a>) -> Self {
        Self {
            target: Target::Serializer(sink),
            tee: None,
        }
    }

    pub fn with_tee(mut self, tee: DebugTee<'a>) -> Self {
        self.tee = Some(tee);
        self
    }

    pub fn is_document(&self) -> bool {
        matches!(self.target, Target::Document(_))
    }

    pub fn is_teed(&self) -> bool {
        self.tee.is_some()
    }

    /// The collected tree when this is an intermediate destination.
    pub fn into_document(self) -> Option<XmlDocument> {
        match self.target {
            Target::Document(destination) => Some(destination.into_document()),
            Target::Serializer(_) => None,
        }
    }
}

impl ResultSink for Destination<'_> {
    fn write(&mut self, event: &XmlEvent) -> Result<()> {
        if let Some(tee) = self.tee.as_mut() {
            tee.write(event)?;
        }
        match &mut self.target {
            Target::Document(destination) => destination.write(event),
            Target::Serializer(sink) => sink.write(event),
        }
    }

    fn finish(&mut self) -> Result<()> {
        match &mut self.target {
            Target::Document(destination) => destination.finish()?,
            Target::Serializer(sink) => sink.finish()?,
        }
        if let Some(tee) = self.tee.as_mut() {
            tee.finish()?;
        }
        Ok(())
    }
}

/// Collaborators and settings shared by every resolution in one execution.
pub struct ResolveContext<'c> {
    pub output_properties: &'c OutputProperties,
    pub serializers: &'c dyn SerializerFactory,
    pub diagnostics: &'c dyn DiagnosticSink,
    pub dev_mode_log: bool,
}

/// Picks the destination `current` writes into, given the step after it.
pub fn resolve<'a>(
    current: &Step,
    next: Option<&Step>,
    sink: &'a mut dyn Write,
    context: &ResolveContext<'a>,
) -> Result<Destination<'a>> {
    let destination = match next {
        None => Destination::serializer(Box::new(FinalSerializer::new(
            sink,
            context.output_properties.for_serializer(),
        ))),
        Some(Step::Transform(_)) | Some(Step::SchemaValidator(_)) => Destination::document(),
        Some(Step::JsonSerializer(step)) => Destination::serializer(context.serializers.destination(
            SerializerKind::Json,
            step,
            sink,
            context.output_properties,
        )?),
        Some(Step::ZipSerializer(step)) => Destination::serializer(context.serializers.destination(
            SerializerKind::Zip,
            step,
            sink,
            context.output_properties,
        )?),
        Some(Step::FopSerializer(step)) => Destination::serializer(context.serializers.destination(
            SerializerKind::Fop,
            step,
            sink,
            context.output_properties,
        )?),
        Some(Step::Response(response)) => {
            return Err(Error::unresolvable_destination(
                current.name(),
                Some(response.name.clone()),
            ))
        }
    };

    if context.dev_mode_log && current.enable_log() {
        return Ok(destination.with_tee(DebugTee::new(current.name(), context.diagnostics)));
    }
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::diagnostics::MemoryDiagnostics;
    use crate::engine::serializers::BuiltinSerializers;
    use crate::error::ErrorCode;
    use crate::pipeline::{ResponseStep, SerializerStep, TransformStep};
    use std::sync::Mutex;

    /// Records each factory call and hands back an in-memory sink.
    #[derive(Default)]
    struct RecordingFactory {
        calls: Mutex<Vec<(SerializerKind, String)>>,
    }

    impl SerializerFactory for RecordingFactory {
        fn destination<'a>(
            &self,
            kind: SerializerKind,
            step: &SerializerStep,
            _sink: &'a mut dyn Write,
            _properties: &OutputProperties,
        ) -> Result<Box<dyn ResultSink + 'a>> {
            self.calls.lock().unwrap().push((kind, step.name.clone()));
            Ok(Box::new(DocumentDestination::new()))
        }
    }

    fn events(xml: &str) -> Vec<XmlEvent> {
        XmlDocument::parse(xml).unwrap().events().to_vec()
    }

    fn feed(destination: &mut dyn ResultSink, xml: &str) {
        for event in events(xml) {
            destination.write(&event).unwrap();
        }
        destination.finish().unwrap();
    }

    fn context<'c>(
        properties: &'c OutputProperties,
        serializers: &'c BuiltinSerializers,
        diagnostics: &'c MemoryDiagnostics,
        dev_mode_log: bool,
    ) -> ResolveContext<'c> {
        ResolveContext {
            output_properties: properties,
            serializers,
            diagnostics,
            dev_mode_log,
        }
    }

    #[test]
    fn last_step_writes_final_serialization() {
        let properties = OutputProperties::new().with("omit-xml-declaration", "yes");
        let (serializers, diagnostics) = (BuiltinSerializers, MemoryDiagnostics::new());
        let ctx = context(&properties, &serializers, &diagnostics, false);
        let step = Step::Transform(TransformStep::new("a.xsl", "a", false));
        let mut out = Vec::new();

        {
            let mut destination = resolve(&step, None, &mut out, &ctx).unwrap();
            assert!(!destination.is_document());
            feed(&mut destination, "<html><p>hi</p></html>");
        }

        assert_eq!(String::from_utf8(out).unwrap(), "<html><p>hi</p></html>");
    }

    #[test]
    fn declaration_written_unless_omitted() {
        let properties = OutputProperties::new();
        let (serializers, diagnostics) = (BuiltinSerializers, MemoryDiagnostics::new());
        let ctx = context(&properties, &serializers, &diagnostics, false);
        let step = Step::Transform(TransformStep::new("a.xsl", "a", false));
        let mut out = Vec::new();

        {
            let mut destination = resolve(&step, None, &mut out, &ctx).unwrap();
            feed(&mut destination, "<a/>");
        }

        assert!(String::from_utf8(out)
            .unwrap()
            .starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    }

    #[test]
    fn text_method_writes_character_data_only() {
        let properties = OutputProperties::new().with("method", "text");
        let (serializers, diagnostics) = (BuiltinSerializers, MemoryDiagnostics::new());
        let ctx = context(&properties, &serializers, &diagnostics, false);
        let step = Step::Transform(TransformStep::new("a.xsl", "a", false));
        let mut out = Vec::new();

        {
            let mut destination = resolve(&step, None, &mut out, &ctx).unwrap();
            feed(&mut destination, "<r>a &amp; b</r>");
        }

        assert_eq!(String::from_utf8(out).unwrap(), "a & b");
    }

    #[test]
    fn latin1_encoding_transcodes_body() {
        let properties = OutputProperties::new().with("encoding", "ISO-8859-1");
        let (serializers, diagnostics) = (BuiltinSerializers, MemoryDiagnostics::new());
        let ctx = context(&properties, &serializers, &diagnostics, false);
        let step = Step::Transform(TransformStep::new("a.xsl", "a", false));
        let mut out = Vec::new();

        {
            let mut destination = resolve(&step, None, &mut out, &ctx).unwrap();
            feed(&mut destination, "<a>café €</a>");
        }

        let mut expected = br#"<?xml version="1.0" encoding="ISO-8859-1"?><a>caf"#.to_vec();
        expected.push(0xe9);
        expected.extend_from_slice(b" &#8364;</a>");
        assert_eq!(out, expected);
    }

    #[test]
    fn unsupported_encoding_falls_back_to_utf8() {
        let properties = OutputProperties::new().with("encoding", "Shift_JIS");
        let (serializers, diagnostics) = (BuiltinSerializers, MemoryDiagnostics::new());
        let ctx = context(&properties, &serializers, &diagnostics, false);
        let step = Step::Transform(TransformStep::new("a.xsl", "a", false));
        let mut out = Vec::new();

        {
            let mut destination = resolve(&step, None, &mut out, &ctx).unwrap();
            feed(&mut destination, "<a>café</a>");
        }

        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<?xml version="1.0" encoding="UTF-8"?><a>café</a>"#
        );
    }

    #[test]
    fn html_method_writes_void_elements_without_end_tag() {
        let properties = OutputProperties::new().with("method", "html");
        let (serializers, diagnostics) = (BuiltinSerializers, MemoryDiagnostics::new());
        let ctx = context(&properties, &serializers, &diagnostics, false);
        let step = Step::Transform(TransformStep::new("a.xsl", "a", false));
        let mut out = Vec::new();

        {
            let mut destination = resolve(&step, None, &mut out, &ctx).unwrap();
            feed(
                &mut destination,
                r#"<html><body>a<br/>b<img src="x.png"/><p></p></body></html>"#,
            );
        }

        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<html><body>a<br>b<img src="x.png"><p></p></body></html>"#
        );
    }

    #[test]
    fn xml_method_keeps_empty_elements_closed() {
        let properties = OutputProperties::new().with("omit-xml-declaration", "yes");
        let (serializers, diagnostics) = (BuiltinSerializers, MemoryDiagnostics::new());
        let ctx = context(&properties, &serializers, &diagnostics, false);
        let step = Step::Transform(TransformStep::new("a.xsl", "a", false));
        let mut out = Vec::new();

        {
            let mut destination = resolve(&step, None, &mut out, &ctx).unwrap();
            feed(&mut destination, "<p>a<br/>b</p>");
        }

        assert_eq!(String::from_utf8(out).unwrap(), "<p>a<br></br>b</p>");
    }

    #[test]
    fn json_serializer_next_delegates_to_factory() {
        let properties = OutputProperties::new();
        let (factory, diagnostics) = (RecordingFactory::default(), MemoryDiagnostics::new());
        let ctx = ResolveContext {
            output_properties: &properties,
            serializers: &factory,
            diagnostics: &diagnostics,
            dev_mode_log: false,
        };
        let current = Step::Transform(TransformStep::new("a.xsl", "a", false));
        let next = Step::JsonSerializer(SerializerStep::new("json", false));
        let mut out = Vec::new();

        {
            let mut destination = resolve(&current, Some(&next), &mut out, &ctx).unwrap();
            feed(&mut destination, "<a/>");
        }

        assert_eq!(
            *factory.calls.lock().unwrap(),
            vec![(SerializerKind::Json, "json".to_string())]
        );
        assert!(out.is_empty());
    }

    #[test]
    fn transform_before_transform_collects_document() {
        let properties = OutputProperties::new();
        let (serializers, diagnostics) = (BuiltinSerializers, MemoryDiagnostics::new());
        let ctx = context(&properties, &serializers, &diagnostics, false);
        let current = Step::Transform(TransformStep::new("a.xsl", "a", false));
        let next = Step::Transform(TransformStep::new("b.xsl", "b", false));
        let mut out = Vec::new();

        let mut destination = resolve(&current, Some(&next), &mut out, &ctx).unwrap();
        feed(&mut destination, "<a><b/></a>");
        let document = destination.into_document().unwrap();

        assert_eq!(document, XmlDocument::parse("<a><b/></a>").unwrap());
        assert!(out.is_empty());
    }

    #[test]
    fn response_after_transform_is_unresolvable() {
        let properties = OutputProperties::new();
        let (serializers, diagnostics) = (BuiltinSerializers, MemoryDiagnostics::new());
        let ctx = context(&properties, &serializers, &diagnostics, false);
        let current = Step::Transform(TransformStep::new("a.xsl", "a", false));
        let next = Step::Response(ResponseStep::new("<r/>"));
        let mut out = Vec::new();

        let err = resolve(&current, Some(&next), &mut out, &ctx).err().unwrap();

        assert_eq!(err.code, ErrorCode::EngineUnresolvableDestination);
        assert_eq!(err.message, "Could not determine destination");
    }

    #[test]
    fn tee_copies_output_without_changing_it() {
        let properties = OutputProperties::new();
        let (serializers, diagnostics) = (BuiltinSerializers, MemoryDiagnostics::new());
        let ctx = context(&properties, &serializers, &diagnostics, true);
        let current = Step::Transform(TransformStep::new("a.xsl", "render", true));
        let next = Step::Transform(TransformStep::new("b.xsl", "b", false));
        let mut out = Vec::new();

        let mut destination = resolve(&current, Some(&next), &mut out, &ctx).unwrap();
        assert!(destination.is_teed());
        feed(&mut destination, "<a><b>x</b></a>");

        assert_eq!(
            destination.into_document().unwrap(),
            XmlDocument::parse("<a><b>x</b></a>").unwrap()
        );
        let entries = diagnostics.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "render");
        assert!(entries[0].1.contains("<b>x</b>"));
    }

    #[test]
    fn tee_requires_step_log_flag() {
        let properties = OutputProperties::new();
        let (serializers, diagnostics) = (BuiltinSerializers, MemoryDiagnostics::new());
        let ctx = context(&properties, &serializers, &diagnostics, true);
        let current = Step::Transform(TransformStep::new("a.xsl", "a", false));
        let next = Step::JsonSerializer(SerializerStep::new("json", false));
        let mut out = Vec::new();

        let destination = resolve(&current, Some(&next), &mut out, &ctx).unwrap();

        assert!(!destination.is_teed());
        assert!(!destination.is_document());
    }
}
