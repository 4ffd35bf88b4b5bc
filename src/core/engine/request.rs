//! The request boundary: status mapping, error bodies and per-request
//! resource cleanup around [`Engine::execute`].

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, warn};

use super::capability::Processor;
use super::diagnostics::TransformationErrorListener;
use super::executor::Engine;
use super::params::ParameterSet;
use crate::error::Result;
use crate::pipeline::Pipeline;

const UNAVAILABLE_BODY: &str = "<html><head><title>Service Unavailable</title></head><body>\
<h1>503 Service Unavailable</h1><p>The web application is temporarily unavailable. Please try again later.</p>\
</body></html>";

const SERVER_ERROR_BODY: &str = "<html><head><title>Internal Server Error</title></head><body>\
<h1>500 Internal Server Error</h1><p>The request could not be processed.</p>\
</body></html>";

const NOT_FOUND_BODY: &str = "Resource not found";

type Closeable = Box<dyn FnOnce() -> Result<()> + Send>;

/// Resources acquired while serving one request. Everything registered is
/// released when the scope is dropped: closeables in reverse registration
/// order, then temporary files and directories.
#[derive(Default)]
pub struct RequestScope {
    temp_files: Vec<PathBuf>,
    closeables: Vec<(String, Closeable)>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_temp_file(&mut self, path: impl Into<PathBuf>) {
        self.temp_files.push(path.into());
    }

    pub fn register_closeable(
        &mut self,
        name: impl Into<String>,
        close: impl FnOnce() -> Result<()> + Send + 'static,
    ) {
        self.closeables.push((name.into(), Box::new(close)));
    }

    pub fn pending(&self) -> usize {
        self.temp_files.len() + self.closeables.len()
    }

    /// Releases everything now. Failures are logged, never returned.
    pub fn release(&mut self) {
        while let Some((name, close)) = self.closeables.pop() {
            if let Err(e) = close() {
                warn!(resource = %name, error = %e, "error closing request resource");
            }
        }
        for path in self.temp_files.drain(..) {
            let removed = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            match removed {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "error deleting temporary file"),
            }
        }
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScope")
            .field("temp_files", &self.temp_files)
            .field("closeables", &self.closeables.len())
            .finish()
    }
}

/// One inbound request, already routed to its pipeline.
#[derive(Debug)]
pub struct Request {
    pub pipeline: Arc<Pipeline>,
    /// XML representation of the request, the first stage's input.
    pub xml: String,
    pub parameters: ParameterSet,
    pub scope: RequestScope,
}

impl Request {
    pub fn new(pipeline: Arc<Pipeline>, xml: impl Into<String>) -> Self {
        Self {
            pipeline,
            xml: xml.into(),
            parameters: ParameterSet::new(),
            scope: RequestScope::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters = parameters;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub content_type: String,
}

impl ResponseHead {
    fn new(status: u16, content_type: impl Into<String>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
        }
    }
}

/// Counts bytes passed through so error handling knows whether anything
/// reached the client.
struct CommitTracker<'a> {
    inner: &'a mut dyn Write,
    written: u64,
}

impl CommitTracker<'_> {
    fn is_committed(&self) -> bool {
        self.written > 0
    }
}

impl Write for CommitTracker<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn write_body(sink: &mut dyn Write, body: &str) {
    if let Err(e) = sink.write_all(body.as_bytes()).and_then(|_| sink.flush()) {
        warn!(error = %e, "could not write error response");
    }
}

impl<P: Processor> Engine<P> {
    /// Serves one request: runs its pipeline into `sink` and reports the
    /// status and content type to answer with. Request resources are
    /// released before returning, whatever the outcome.
    pub fn handle(&self, request: Request, sink: &mut dyn Write) -> ResponseHead {
        let Request {
            pipeline,
            xml,
            parameters,
            mut scope,
        } = request;

        let head = self.serve(&pipeline, &xml, &parameters, sink);
        scope.release();
        head
    }

    fn serve(
        &self,
        pipeline: &Pipeline,
        xml: &str,
        parameters: &ParameterSet,
        sink: &mut dyn Write,
    ) -> ResponseHead {
        if self.is_closed() {
            write_body(sink, UNAVAILABLE_BODY);
            return ResponseHead::new(503, "text/html");
        }

        let dev_mode = self.config().development_mode;
        let mut listener = TransformationErrorListener::new(dev_mode);
        let mut tracker = CommitTracker {
            inner: sink,
            written: 0,
        };

        let result =
            self.execute_with_listener(pipeline, xml, parameters, dev_mode, &mut tracker, &mut listener);

        let err = match result {
            Ok(summary) => return ResponseHead::new(200, summary.content_type()),
            Err(err) => err,
        };

        if err.is_not_found() {
            if !tracker.is_committed() {
                write_body(&mut tracker, NOT_FOUND_BODY);
            }
            return ResponseHead::new(404, "text/plain");
        }

        error!(code = err.code.as_str(), error = %err, "pipeline execution failed");

        if dev_mode {
            let mut body = err.chain().join("\n");
            if let Some(summary) = listener.summary() {
                body.push_str("\n\n");
                body.push_str(&summary);
            }
            write_body(&mut tracker, &body);
            return ResponseHead::new(500, "text/plain");
        }

        if !tracker.is_committed() {
            write_body(&mut tracker, SERVER_ERROR_BODY);
        }
        ResponseHead::new(500, "text/html")
    }
}
