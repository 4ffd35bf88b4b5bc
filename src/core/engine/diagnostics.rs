use std::sync::Mutex;

use tracing::{debug, error, warn};

use super::capability::{DiagnosticSink, ErrorListener};

pub const STEP_OUTPUT_SEPARATOR: &str = "----------";

/// Heading placed above the logged output of a step.
pub fn step_output_heading(step_name: &str) -> String {
    format!("{}\nOUTPUT OF STEP: \"{}\":\n", STEP_OUTPUT_SEPARATOR, step_name)
}

/// Writes tee output of logged steps as `debug` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn step_output(&self, step_name: &str, content: &str) {
        debug!(target: "xslpipe::steps", "{}{}", step_output_heading(step_name), content);
    }
}

/// Keeps tee output in memory, one entry per logged step.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    entries: Mutex<Vec<(String, String)>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DiagnosticSink for MemoryDiagnostics {
    fn step_output(&self, step_name: &str, content: &str) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push((step_name.to_string(), content.to_string()));
    }
}

/// Collects messages reported by the processor during one request and logs
/// them as they arrive.
#[derive(Debug, Default)]
pub struct TransformationErrorListener {
    development_mode: bool,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl TransformationErrorListener {
    pub fn new(development_mode: bool) -> Self {
        Self {
            development_mode,
            ..Self::default()
        }
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Text block listing everything reported, for development-mode error
    /// bodies.
    pub fn summary(&self) -> Option<String> {
        if self.warnings.is_empty() && self.errors.is_empty() {
            return None;
        }
        let mut lines = Vec::new();
        lines.extend(self.errors.iter().map(|e| format!("ERROR: {}", e)));
        lines.extend(self.warnings.iter().map(|w| format!("WARNING: {}", w)));
        Some(lines.join("\n"))
    }
}

impl ErrorListener for TransformationErrorListener {
    fn warning(&mut self, message: &str) {
        if self.development_mode {
            warn!(development_mode = true, "{}", message);
        } else {
            debug!("{}", message);
        }
        self.warnings.push(message.to_string());
    }

    fn error(&mut self, message: &str) {
        error!("{}", message);
        self.errors.push(message.to_string());
    }
}
