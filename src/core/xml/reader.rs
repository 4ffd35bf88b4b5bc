use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, ResolveResult};
use quick_xml::reader::NsReader;

use super::event::{Attribute, ElementStart, NamespaceBinding, QualifiedName, XmlEvent};
use crate::error::{Error, Result};

/// Single-pass event stream over a document held in memory.
///
/// Empty elements are reported as an open immediately followed by a close,
/// CDATA sections as text. Comments, processing instructions, the XML
/// declaration and DOCTYPE are dropped.
pub struct EventReader<'i> {
    reader: NsReader<&'i [u8]>,
    depth: usize,
    finished: bool,
}

impl<'i> EventReader<'i> {
    pub fn new(source: &'i str) -> Self {
        let mut reader = NsReader::from_str(source);
        let config = reader.config_mut();
        config.trim_text(false);
        config.expand_empty_elements = true;

        Self {
            reader,
            depth: 0,
            finished: false,
        }
    }

    pub fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        let result = self.read_next();
        if result.is_err() {
            self.finished = true;
        }
        result
    }

    fn read_next(&mut self) -> Result<Option<XmlEvent>> {
        loop {
            if self.finished {
                return Ok(None);
            }

            let position = self.reader.buffer_position() as u64;
            let (namespace, event) = {
                let (resolved, event) = self
                    .reader
                    .read_resolved_event()
                    .map_err(|e| Error::pipeline_xml_syntax(e.to_string(), Some(position)))?;
                (namespace_uri(resolved, position)?, event)
            };

            match event {
                Event::Start(start) => {
                    self.depth += 1;
                    let element = self.element_start(&start, namespace, position)?;
                    return Ok(Some(XmlEvent::Open(element)));
                }
                Event::End(end) => {
                    self.depth = self.depth.saturating_sub(1);
                    let name = QualifiedName {
                        prefix: end
                            .name()
                            .prefix()
                            .map(|prefix| utf8(prefix.as_ref(), position))
                            .transpose()?,
                        local: utf8(end.local_name().as_ref(), position)?,
                        namespace,
                    };
                    return Ok(Some(XmlEvent::Close(name)));
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| Error::pipeline_xml_syntax(e.to_string(), Some(position)))?;
                    if !text.is_empty() {
                        return Ok(Some(XmlEvent::Text(text.into_owned())));
                    }
                }
                Event::CData(cdata) => {
                    let text = utf8(&cdata, position)?;
                    if !text.is_empty() {
                        return Ok(Some(XmlEvent::Text(text)));
                    }
                }
                Event::Eof => {
                    self.finished = true;
                    if self.depth > 0 {
                        return Err(Error::pipeline_xml_syntax(
                            format!("Unexpected end of document, {} element(s) still open", self.depth),
                            Some(position),
                        ));
                    }
                    return Ok(None);
                }
                _ => {}
            }
        }
    }

    fn element_start(
        &self,
        start: &BytesStart<'_>,
        namespace: Option<String>,
        position: u64,
    ) -> Result<ElementStart> {
        let name = QualifiedName {
            prefix: start
                .name()
                .prefix()
                .map(|prefix| utf8(prefix.as_ref(), position))
                .transpose()?,
            local: utf8(start.local_name().as_ref(), position)?,
            namespace,
        };

        let mut element = ElementStart::new(name);
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::pipeline_xml_syntax(e.to_string(), Some(position)))?;
            let value = attr
                .unescape_value()
                .map_err(|e| Error::pipeline_xml_syntax(e.to_string(), Some(position)))?
                .into_owned();

            if let Some(declaration) = attr.key.as_namespace_binding() {
                let prefix = match declaration {
                    PrefixDeclaration::Default => None,
                    PrefixDeclaration::Named(prefix) => Some(utf8(prefix, position)?),
                };
                element.namespaces.push(NamespaceBinding { prefix, uri: value });
                continue;
            }

            let (resolved, local) = self.reader.resolve_attribute(attr.key);
            let attr_namespace = namespace_uri(resolved, position)?;
            element.attributes.push(Attribute {
                name: QualifiedName {
                    prefix: attr
                        .key
                        .prefix()
                        .map(|prefix| utf8(prefix.as_ref(), position))
                        .transpose()?,
                    local: utf8(local.as_ref(), position)?,
                    namespace: attr_namespace,
                },
                value,
            });
        }

        Ok(element)
    }
}

impl Iterator for EventReader<'_> {
    type Item = Result<XmlEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

fn namespace_uri(resolved: ResolveResult<'_>, position: u64) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(namespace) => Ok(Some(utf8(namespace.as_ref(), position)?)),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::pipeline_xml_syntax(
            format!(
                "Unknown namespace prefix \"{}\"",
                String::from_utf8_lossy(&prefix)
            ),
            Some(position),
        )),
    }
}

fn utf8(bytes: &[u8], position: u64) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| Error::pipeline_xml_syntax(e.to_string(), Some(position)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(source: &str) -> Result<Vec<XmlEvent>> {
        EventReader::new(source).collect()
    }

    #[test]
    fn resolves_default_and_prefixed_namespaces() {
        let events = read_all(r#"<p:a xmlns:p="urn:p" xmlns="urn:d"><b x="1"/></p:a>"#).unwrap();

        let XmlEvent::Open(root) = &events[0] else {
            panic!("expected open event");
        };
        assert!(root.name.is("urn:p", "a"));
        assert_eq!(root.namespaces.len(), 2);

        let XmlEvent::Open(child) = &events[1] else {
            panic!("expected open event");
        };
        assert!(child.name.is("urn:d", "b"));
        assert_eq!(child.attribute("x"), Some("1"));
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn empty_elements_expand_to_open_and_close() {
        let events = read_all("<a/>").unwrap();
        assert!(matches!(events[0], XmlEvent::Open(_)));
        assert!(matches!(events[1], XmlEvent::Close(_)));
    }

    #[test]
    fn text_is_unescaped_and_cdata_kept() {
        let events = read_all("<a>x &amp; y<![CDATA[<z>]]></a>").unwrap();
        assert_eq!(events[1], XmlEvent::Text("x & y".to_string()));
        assert_eq!(events[2], XmlEvent::Text("<z>".to_string()));
    }

    #[test]
    fn unknown_prefix_is_a_syntax_error() {
        let err = read_all("<q:a/>").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::PipelineXmlSyntax);
    }

    #[test]
    fn mismatched_end_tag_is_a_syntax_error() {
        let err = read_all("<a></b>").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::PipelineXmlSyntax);
    }
}
