use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::event::{ElementStart, XmlEvent};
use crate::error::{Error, Result};

/// Serializes [`XmlEvent`]s as markup, with or without indentation.
pub struct XmlWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(inner: W, indent: bool) -> Self {
        let writer = if indent {
            Writer::new_with_indent(inner, b' ', 2)
        } else {
            Writer::new(inner)
        };
        Self { writer }
    }

    pub fn write_declaration(
        &mut self,
        encoding: Option<&str>,
        standalone: Option<&str>,
    ) -> Result<()> {
        self.emit(Event::Decl(BytesDecl::new("1.0", encoding, standalone)))
    }

    pub fn write(&mut self, event: &XmlEvent) -> Result<()> {
        match event {
            XmlEvent::Open(start) => self.emit(Event::Start(start_tag(start))),
            XmlEvent::Text(text) => self.emit(Event::Text(BytesText::new(text))),
            XmlEvent::Close(name) => self.emit(Event::End(BytesEnd::new(name.lexical()))),
        }
    }

    pub fn write_all<'e>(&mut self, events: impl IntoIterator<Item = &'e XmlEvent>) -> Result<()> {
        for event in events {
            self.write(event)?;
        }
        Ok(())
    }

    /// Start tag with no matching end tag, for HTML void elements. Written as
    /// pre-escaped text so the indentation level is left unchanged.
    pub fn write_void(&mut self, start: &ElementStart) -> Result<()> {
        let tag = start_tag(start);
        let markup = format!("<{}>", String::from_utf8_lossy(&tag));
        self.emit(Event::Text(BytesText::from_escaped(markup)))
    }

    /// Raw passthrough for content that is already serialized text.
    pub fn write_raw_text(&mut self, text: &str) -> Result<()> {
        self.writer
            .get_mut()
            .write_all(text.as_bytes())
            .map_err(|e| Error::internal_io(e.to_string(), Some("write xml".to_string())))
    }

    pub fn get_mut(&mut self) -> &mut W {
        self.writer.get_mut()
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn emit(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::internal_io(e.to_string(), Some("write xml".to_string())))
    }
}

fn start_tag(start: &ElementStart) -> BytesStart<'static> {
    let mut tag = BytesStart::new(start.name.lexical());
    for binding in &start.namespaces {
        let key = match &binding.prefix {
            Some(prefix) => format!("xmlns:{}", prefix),
            None => "xmlns".to_string(),
        };
        tag.push_attribute((key.as_str(), binding.uri.as_str()));
    }
    for attr in &start.attributes {
        let key = attr.name.lexical();
        tag.push_attribute((key.as_str(), attr.value.as_str()));
    }
    tag
}

/// Serializes a complete event sequence into a string.
pub fn to_string<'e>(events: impl IntoIterator<Item = &'e XmlEvent>, indent: bool) -> Result<String> {
    let mut writer = XmlWriter::new(Vec::new(), indent);
    writer.write_all(events)?;
    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::internal_unexpected(format!("serialized XML is not UTF-8: {}", e)))
}
