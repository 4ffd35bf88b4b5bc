use super::event::{ElementStart, QualifiedName, XmlEvent};
use super::reader::EventReader;
use super::writer;
use crate::error::Result;

/// An owned, replayable document held as its event sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlDocument {
    events: Vec<XmlEvent>,
}

impl XmlDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<XmlEvent>) -> Self {
        Self { events }
    }

    pub fn parse(source: &str) -> Result<Self> {
        let events = EventReader::new(source).collect::<Result<Vec<_>>>()?;
        Ok(Self { events })
    }

    pub fn push(&mut self, event: XmlEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[XmlEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn root(&self) -> Option<&ElementStart> {
        self.events.iter().find_map(|event| match event {
            XmlEvent::Open(start) => Some(start),
            _ => None,
        })
    }

    pub fn root_name(&self) -> Option<&QualifiedName> {
        self.root().map(|start| &start.name)
    }

    /// Concatenated character data of the whole document.
    pub fn text(&self) -> String {
        self.events
            .iter()
            .filter_map(|event| match event {
                XmlEvent::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn to_xml_string(&self, indent: bool) -> Result<String> {
        writer::to_string(&self.events, indent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_serialize_preserve_structure() {
        let source = r#"<a xmlns="urn:a" k="v"><b>x</b><c/></a>"#;
        let document = XmlDocument::parse(source).unwrap();

        let reparsed = XmlDocument::parse(&document.to_xml_string(false).unwrap()).unwrap();

        assert_eq!(document, reparsed);
        assert_eq!(document.root_name().map(|n| n.local.as_str()), Some("a"));
        assert_eq!(document.text(), "x");
    }
}
