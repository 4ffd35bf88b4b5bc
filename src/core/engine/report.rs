use serde::Serialize;

use crate::error::Error;
use crate::xml::{ElementStart, QualifiedName, XmlDocument, XmlEvent};

pub const VALIDATION_NAMESPACE: &str = "http://www.armatiek.com/xslweb/validation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationMessage {
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u64>,
}

impl ValidationMessage {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            line: None,
            column: None,
        }
    }

    pub fn at(mut self, line: u64, column: u64) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

/// Findings of one schema validation, labelled with the step that ran it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub label: String,
    pub messages: Vec<ValidationMessage>,
}

impl ValidationReport {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            messages: Vec::new(),
        }
    }

    /// Label used for the report of a named step.
    pub fn step_label(step_name: &str) -> String {
        format!("Step: {}", step_name)
    }

    pub fn push(&mut self, message: ValidationMessage) {
        self.messages.push(message);
    }

    pub fn with_message(mut self, message: ValidationMessage) -> Self {
        self.push(message);
        self
    }

    /// Valid when nothing above warning level was reported.
    pub fn is_valid(&self) -> bool {
        self.messages
            .iter()
            .all(|message| message.severity == Severity::Warning)
    }

    /// The report as a tree, suitable for binding to a stylesheet parameter.
    pub fn to_document(&self) -> XmlDocument {
        let root = QualifiedName::new(Some(VALIDATION_NAMESPACE), "validation-report");
        let entry = QualifiedName::new(Some(VALIDATION_NAMESPACE), "message");
        let valid = if self.is_valid() { "true" } else { "false" };

        let mut document = XmlDocument::new();
        document.push(XmlEvent::Open(
            ElementStart::new(root.clone())
                .with_namespace(None, VALIDATION_NAMESPACE)
                .with_attribute("label", &self.label)
                .with_attribute("valid", valid),
        ));
        for message in &self.messages {
            let mut start =
                ElementStart::new(entry.clone()).with_attribute("severity", message.severity.as_str());
            if let Some(line) = message.line {
                start = start.with_attribute("line", &line.to_string());
            }
            if let Some(column) = message.column {
                start = start.with_attribute("column", &column.to_string());
            }
            document.push(XmlEvent::Open(start));
            document.push(XmlEvent::Text(message.message.clone()));
            document.push(XmlEvent::Close(entry.clone()));
        }
        document.push(XmlEvent::Close(root));
        document
    }

    pub fn to_error(&self) -> Error {
        Error::validation_reported(
            self.label.clone(),
            self.messages.iter().map(|m| m.message.clone()).collect(),
        )
    }
}
