use std::collections::BTreeMap;

/// Serialization keys the final serializer understands. Anything else a
/// compiled program declares is skipped.
pub const KNOWN_PROPERTIES: &[&str] = &[
    "allow-duplicate-names",
    "byte-order-mark",
    "cdata-section-elements",
    "doctype-public",
    "doctype-system",
    "encoding",
    "escape-uri-attributes",
    "html-version",
    "include-content-type",
    "indent",
    "item-separator",
    "media-type",
    "method",
    "normalization-form",
    "omit-xml-declaration",
    "standalone",
    "suppress-indentation",
    "undeclare-prefixes",
    "use-character-maps",
    "version",
];

const CDATA_SECTION_ELEMENTS: &str = "cdata-section-elements";

/// Output method of the final serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMethod {
    Xml,
    Html,
    Xhtml,
    Text,
}

/// Declared serialization parameters (`xsl:output`) of a compiled program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputProperties {
    values: BTreeMap<String, String>,
}

impl OutputProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_yes(&self, key: &str) -> bool {
        matches!(self.get(key).map(str::trim), Some("yes" | "true" | "1"))
    }

    pub fn method(&self) -> OutputMethod {
        match self.get("method").map(str::trim) {
            Some("html") => OutputMethod::Html,
            Some("xhtml") => OutputMethod::Xhtml,
            Some("text") => OutputMethod::Text,
            _ => OutputMethod::Xml,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The subset handed to the final serializer: unknown keys dropped and
    /// the empty namespace in `cdata-section-elements` written as `{''}`.
    pub fn for_serializer(&self) -> OutputProperties {
        let mut filtered = OutputProperties::new();
        for (key, value) in &self.values {
            if !KNOWN_PROPERTIES.contains(&key.as_str()) {
                tracing::debug!(key = %key, "skipping unknown output property");
                continue;
            }
            let value = if key == CDATA_SECTION_ELEMENTS {
                value.replace("{}", "{''}")
            } else {
                value.clone()
            };
            filtered.set(key.clone(), value);
        }
        filtered
    }
}
