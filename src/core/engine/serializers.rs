//! Serializers shipped with the engine for terminal steps.

use std::io::{Cursor, Write};
use std::path::PathBuf;

use serde_json::{Map, Value};

use super::capability::{ResultSink, SerializerFactory};
use super::output::OutputProperties;
use crate::error::{Error, Result};
use crate::pipeline::{SerializerKind, SerializerStep};
use crate::xml::{XmlDocument, XmlEvent};

/// JSON and ZIP output. FOP has no built-in renderer.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinSerializers;

impl SerializerFactory for BuiltinSerializers {
    fn destination<'a>(
        &self,
        kind: SerializerKind,
        step: &SerializerStep,
        sink: &'a mut dyn Write,
        _properties: &OutputProperties,
    ) -> Result<Box<dyn ResultSink + 'a>> {
        match kind {
            SerializerKind::Json => Ok(Box::new(JsonSerializer::new(
                sink,
                step.option("pretty-print") == Some("true"),
            ))),
            SerializerKind::Zip => Ok(Box::new(ZipSerializer::new(
                sink,
                step.option("base-dir").map(PathBuf::from),
            ))),
            SerializerKind::Fop => Err(Error::serializer_unavailable(kind.as_str(), step.name.clone())),
        }
    }
}

/// Converts the result tree to JSON once the producing stage finishes.
pub struct JsonSerializer<'a> {
    sink: &'a mut dyn Write,
    pretty: bool,
    document: XmlDocument,
}

impl<'a> JsonSerializer<'a> {
    pub fn new(sink: &'a mut dyn Write, pretty: bool) -> Self {
        Self {
            sink,
            pretty,
            document: XmlDocument::new(),
        }
    }
}

impl ResultSink for JsonSerializer<'_> {
    fn write(&mut self, event: &XmlEvent) -> Result<()> {
        self.document.push(event.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let value = document_to_json(&self.document);
        let written = if self.pretty {
            serde_json::to_writer_pretty(&mut *self.sink, &value)
        } else {
            serde_json::to_writer(&mut *self.sink, &value)
        };
        written.map_err(|e| Error::internal_json(e.to_string(), Some("write json response".to_string())))
    }
}

struct Frame {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Frame {
    fn add_child(&mut self, name: String, value: Value) {
        match self.fields.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.fields.insert(name, value);
            }
        }
    }

    /// Surrounding whitespace is dropped from leaf text and `#text` alike,
    /// so whitespace-only content counts as empty.
    fn into_value(self) -> Value {
        let text = self.text.trim();
        let mut fields = self.fields;
        if fields.is_empty() {
            return if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            };
        }
        if !text.is_empty() {
            fields.insert("#text".to_string(), Value::String(text.to_string()));
        }
        Value::Object(fields)
    }
}

/// Maps a tree to JSON: the root element becomes the single top-level key,
/// attributes become `@name` fields, repeated children become arrays and
/// mixed text becomes `#text`.
pub fn document_to_json(document: &XmlDocument) -> Value {
    let mut stack: Vec<Frame> = Vec::new();
    let mut root = Map::new();

    for event in document.events() {
        match event {
            XmlEvent::Open(start) => {
                let mut fields = Map::new();
                for attr in &start.attributes {
                    fields.insert(
                        format!("@{}", attr.name.local),
                        Value::String(attr.value.clone()),
                    );
                }
                stack.push(Frame {
                    name: start.name.local.clone(),
                    fields,
                    text: String::new(),
                });
            }
            XmlEvent::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(text);
                }
            }
            XmlEvent::Close(_) => {
                let Some(frame) = stack.pop() else { continue };
                let name = frame.name.clone();
                let value = frame.into_value();
                match stack.last_mut() {
                    Some(parent) => parent.add_child(name, value),
                    None => {
                        root.insert(name, value);
                    }
                }
            }
        }
    }

    Value::Object(root)
}

/// Builds an archive from `inline-file[path]` and `file[src, path]`
/// entries of the result tree.
pub struct ZipSerializer<'a> {
    sink: &'a mut dyn Write,
    base_dir: Option<PathBuf>,
    document: XmlDocument,
}

impl<'a> ZipSerializer<'a> {
    pub fn new(sink: &'a mut dyn Write, base_dir: Option<PathBuf>) -> Self {
        Self {
            sink,
            base_dir,
            document: XmlDocument::new(),
        }
    }

    fn entries(&self) -> Result<Vec<ZipEntry>> {
        let mut entries = Vec::new();
        let mut inline: Option<(String, String)> = None;

        for event in self.document.events() {
            match event {
                XmlEvent::Open(start) if start.name.local == "inline-file" => {
                    let path = required(start.attribute("path"), "inline-file", "path")?;
                    inline = Some((path, String::new()));
                }
                XmlEvent::Open(start) if start.name.local == "file" => {
                    let src = required(start.attribute("src"), "file", "src")?;
                    let path = required(start.attribute("path"), "file", "path")?;
                    let src = match &self.base_dir {
                        Some(base) => base.join(src),
                        None => PathBuf::from(src),
                    };
                    entries.push(ZipEntry::File { src, path });
                }
                XmlEvent::Text(text) => {
                    if let Some((_, content)) = inline.as_mut() {
                        content.push_str(text);
                    }
                }
                XmlEvent::Close(name) if name.local == "inline-file" => {
                    if let Some((path, content)) = inline.take() {
                        entries.push(ZipEntry::Inline { path, content });
                    }
                }
                _ => {}
            }
        }
        Ok(entries)
    }
}

enum ZipEntry {
    Inline { path: String, content: String },
    File { src: PathBuf, path: String },
}

fn required(value: Option<&str>, element: &str, attribute: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::pipeline_missing_attribute(element, attribute))
}

fn zip_error(e: zip::result::ZipError) -> Error {
    Error::internal_io(e.to_string(), Some("write zip response".to_string()))
}

impl ResultSink for ZipSerializer<'_> {
    fn write(&mut self, event: &XmlEvent) -> Result<()> {
        self.document.push(event.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let entries = self.entries()?;
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default();

        for entry in entries {
            let (path, bytes) = match entry {
                ZipEntry::Inline { path, content } => (path, content.into_bytes()),
                ZipEntry::File { src, path } => {
                    let bytes = crate::utils::io::read_bytes(&src, "read zip entry")?;
                    (path, bytes)
                }
            };
            zip.start_file(path, options).map_err(zip_error)?;
            zip.write_all(&bytes)
                .map_err(|e| Error::internal_io(e.to_string(), Some("write zip response".to_string())))?;
        }

        let archive = zip.finish().map_err(zip_error)?.into_inner();
        self.sink
            .write_all(&archive)
            .map_err(|e| Error::internal_io(e.to_string(), Some("write zip response".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::io::Read;

    fn run(kind: SerializerKind, step: &SerializerStep, xml: &str) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        {
            let mut sink = BuiltinSerializers.destination(kind, step, &mut out, &OutputProperties::new())?;
            for event in XmlDocument::parse(xml)?.events() {
                sink.write(event)?;
            }
            sink.finish()?;
        }
        Ok(out)
    }

    #[test]
    fn json_maps_attributes_repeats_and_text() {
        let document =
            XmlDocument::parse(r#"<order id="7"><item>a</item><item>b</item><note/></order>"#).unwrap();

        let value = document_to_json(&document);

        assert_eq!(
            value,
            serde_json::json!({
                "order": { "@id": "7", "item": ["a", "b"], "note": null }
            })
        );
    }

    #[test]
    fn json_keeps_text_next_to_attributes() {
        let document = XmlDocument::parse(r#"<price currency="EUR">12.50</price>"#).unwrap();
        assert_eq!(
            document_to_json(&document),
            serde_json::json!({ "price": { "@currency": "EUR", "#text": "12.50" } })
        );
    }

    #[test]
    fn json_trims_leaf_and_mixed_text_alike() {
        let document = XmlDocument::parse(
            "<a>\n  <blank>   </blank>\n  <padded> x </padded>\n  <mixed k=\"v\"> y </mixed>\n</a>",
        )
        .unwrap();
        assert_eq!(
            document_to_json(&document),
            serde_json::json!({
                "a": {
                    "blank": null,
                    "padded": "x",
                    "mixed": { "@k": "v", "#text": "y" }
                }
            })
        );
    }

    #[test]
    fn json_serializer_writes_to_sink() {
        let step = SerializerStep::new("json-serializer-2", false);
        let out = run(SerializerKind::Json, &step, "<a><b>1</b></a>").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), r#"{"a":{"b":"1"}}"#);
    }

    #[test]
    fn zip_serializer_packs_inline_and_file_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.txt"), "from disk").unwrap();
        let step = SerializerStep::new("zip", false)
            .with_option("base-dir", dir.path().to_string_lossy().to_string());
        let xml = r#"<zip><inline-file path="hello.txt">hi there</inline-file><file src="data.txt" path="nested/data.txt"/></zip>"#;

        let out = run(SerializerKind::Zip, &step, xml).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(out)).unwrap();
        let mut content = String::new();
        archive.by_name("hello.txt").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "hi there");
        content.clear();
        archive
            .by_name("nested/data.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "from disk");
    }

    #[test]
    fn fop_is_unavailable() {
        let step = SerializerStep::new("pdf", false);
        let mut out = Vec::new();
        let err = BuiltinSerializers
            .destination(SerializerKind::Fop, &step, &mut out, &OutputProperties::new())
            .err()
            .unwrap();
        assert_eq!(err.code, ErrorCode::EngineSerializerUnavailable);
    }
}
