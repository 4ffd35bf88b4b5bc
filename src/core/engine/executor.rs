use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use super::capability::{
    CompiledProgram, DiagnosticSink, Processor, ResultSink, SerializerFactory, Source,
};
use super::destination::{self, ResolveContext};
use super::diagnostics::{TracingDiagnostics, TransformationErrorListener};
use super::output::{OutputMethod, OutputProperties};
use super::params::{ParameterSet, ParameterValue};
use super::report::ValidationReport;
use super::serializers::BuiltinSerializers;
use super::template_cache::TemplateCache;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::pipeline::{ParameterName, Pipeline, SerializerKind, Step, TransformStep};

/// What a successful execution produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Steps actually run, the finishing transform included.
    pub steps_run: usize,
    pub output_properties: OutputProperties,
    /// The serializer that wrote the body, if the pipeline ended in one.
    pub serializer: Option<SerializerKind>,
}

impl ExecutionSummary {
    pub fn content_type(&self) -> String {
        match self.serializer {
            Some(SerializerKind::Json) => return "application/json".to_string(),
            Some(SerializerKind::Zip) => return "application/zip".to_string(),
            Some(SerializerKind::Fop) => return "application/pdf".to_string(),
            None => {}
        }
        if let Some(media_type) = self.output_properties.get("media-type") {
            return media_type.to_string();
        }
        match self.output_properties.method() {
            OutputMethod::Xml => "application/xml",
            OutputMethod::Html => "text/html",
            OutputMethod::Xhtml => "application/xhtml+xml",
            OutputMethod::Text => "text/plain",
        }
        .to_string()
    }
}

/// Runs pipelines for one web application.
///
/// Holds no per-request state: pipelines are borrowed, parameters and
/// buffers live on the calling thread. Compiled programs are shared
/// through the [`TemplateCache`].
pub struct Engine<P: Processor> {
    config: EngineConfig,
    processor: Arc<P>,
    templates: TemplateCache<P>,
    serializers: Arc<dyn SerializerFactory>,
    diagnostics: Arc<dyn DiagnosticSink>,
    closed: AtomicBool,
}

impl<P: Processor> Engine<P> {
    pub fn new(config: EngineConfig, processor: P) -> Self {
        Self {
            config,
            processor: Arc::new(processor),
            templates: TemplateCache::new(),
            serializers: Arc::new(BuiltinSerializers),
            diagnostics: Arc::new(TracingDiagnostics),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_serializers(mut self, serializers: Arc<dyn SerializerFactory>) -> Self {
        self.serializers = serializers;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn templates(&self) -> &TemplateCache<P> {
        &self.templates
    }

    /// Marks the web application as unavailable; requests get 503 until
    /// [`Engine::open`] is called.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn open(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn template_path(&self, step: &TransformStep) -> PathBuf {
        self.config.template_path(step)
    }

    /// Compiled program for a transform step, cached unless `dev_mode`.
    pub fn compile_and_cache(
        &self,
        step: &TransformStep,
        dev_mode: bool,
        listener: &mut TransformationErrorListener,
    ) -> Result<Arc<P::Program>> {
        let path = self.template_path(step);
        self.templates
            .get_or_compile(&self.processor, &path, !dev_mode, listener)
            .map_err(|e| Error::transformation_failed(step.name.clone(), e))
    }

    /// Output properties of the last transform step, or none.
    pub fn output_properties(
        &self,
        steps: &[Step],
        dev_mode: bool,
        listener: &mut TransformationErrorListener,
    ) -> Result<OutputProperties> {
        match steps.iter().rev().find_map(Step::as_transform) {
            Some(step) => Ok(self
                .compile_and_cache(step, dev_mode, listener)?
                .output_properties()),
            None => Ok(OutputProperties::new()),
        }
    }

    /// Runs `pipeline` over the request document `input`, writing the body
    /// to `out`. In `dev_mode` nothing reaches `out` unless every step
    /// succeeded.
    pub fn execute(
        &self,
        pipeline: &Pipeline,
        input: &str,
        base: &ParameterSet,
        dev_mode: bool,
        out: &mut dyn Write,
    ) -> Result<ExecutionSummary> {
        let mut listener = TransformationErrorListener::new(dev_mode);
        self.execute_with_listener(pipeline, input, base, dev_mode, out, &mut listener)
    }

    pub(crate) fn execute_with_listener(
        &self,
        pipeline: &Pipeline,
        input: &str,
        base: &ParameterSet,
        dev_mode: bool,
        out: &mut dyn Write,
        listener: &mut TransformationErrorListener,
    ) -> Result<ExecutionSummary> {
        if pipeline.is_empty() {
            return Err(Error::pipeline_not_found(None));
        }

        let output_properties = self.output_properties(pipeline.steps(), dev_mode, listener)?;

        let finishing = Step::Transform(self.config.response_step());
        let steps = with_finishing_step(pipeline.steps(), &finishing);

        let mut parameters = self.config.base_parameters();
        parameters.merge(base);

        if !dev_mode {
            return self.run_steps(&steps, input, &parameters, output_properties, dev_mode, out, listener);
        }

        let mut buffer = Vec::new();
        let summary = self.run_steps(
            &steps,
            input,
            &parameters,
            output_properties,
            dev_mode,
            &mut buffer,
            listener,
        )?;
        out.write_all(&buffer)
            .and_then(|_| out.flush())
            .map_err(|e| Error::internal_io(e.to_string(), Some("flush response".to_string())))?;
        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_steps(
        &self,
        steps: &[&Step],
        input: &str,
        base: &ParameterSet,
        output_properties: OutputProperties,
        dev_mode: bool,
        sink: &mut dyn Write,
        listener: &mut TransformationErrorListener,
    ) -> Result<ExecutionSummary> {
        let context = ResolveContext {
            output_properties: &output_properties,
            serializers: self.serializers.as_ref(),
            diagnostics: self.diagnostics.as_ref(),
            dev_mode_log: dev_mode,
        };

        let mut source = Source::Text(input.to_string());
        let mut extra = ParameterSet::new();
        let mut steps_run = 0;
        let mut serializer = None;

        for (index, &step) in steps.iter().enumerate() {
            let next = steps.get(index + 1).copied();
            debug!(step = step.name(), kind = step.kind(), "running pipeline step");

            match step {
                Step::JsonSerializer(_) | Step::ZipSerializer(_) | Step::FopSerializer(_) => {
                    serializer = step.as_serializer().map(|(kind, _)| kind);
                    break;
                }
                Step::Transform(transform) => {
                    let mut parameters = base.clone();
                    parameters.extend_declared(&transform.parameters);
                    parameters.merge(&extra.take());

                    let program = self.compile_and_cache(transform, dev_mode, listener)?;
                    let mut destination = destination::resolve(step, next, &mut *sink, &context)?;
                    self.processor
                        .transform(program.as_ref(), &source, &parameters, &mut destination, listener)
                        .map_err(|e| Error::transformation_failed(transform.name.clone(), e))?;
                    destination.finish()?;

                    if let Some(document) = destination.into_document() {
                        source = Source::Document(document);
                    }
                }
                Step::SchemaValidator(validator) => {
                    let input = Source::Text(source.to_text()?);
                    let label = ValidationReport::step_label(&validator.name);
                    let validation = self
                        .processor
                        .validate(&validator.schema_paths, &input, &label)
                        .map_err(|e| Error::validation_failed(validator.name.clone(), e))?;
                    source = Source::Text(validation.output);

                    if let Some(report) = validation.report {
                        match &validator.error_report_param_name {
                            Some(name) => extra.insert(
                                ParameterName::new(validator.error_report_param_namespace.as_deref(), name),
                                ParameterValue::Document(report.to_document()),
                            ),
                            None => log_unconsumed_report(&report),
                        }
                    }
                }
                Step::Response(response) => {
                    source = Source::Text(response.literal_body.clone());
                }
            }
            steps_run += 1;
        }

        if !extra.is_empty() {
            let names: Vec<String> = extra.names().map(ToString::to_string).collect();
            warn!(
                code = "engine.validation_reported",
                parameters = ?names,
                "validation report was not consumed by any transform"
            );
        }

        Ok(ExecutionSummary {
            steps_run,
            output_properties,
            serializer,
        })
    }
}

fn log_unconsumed_report(report: &ValidationReport) {
    let err = report.to_error();
    warn!(
        code = err.code.as_str(),
        label = %report.label,
        problems = report.messages.len(),
        "{}",
        err.message
    );
}

/// The executed step order: the finishing transform goes before a trailing
/// serializer, otherwise at the end.
pub fn with_finishing_step<'s>(steps: &'s [Step], finishing: &'s Step) -> Vec<&'s Step> {
    let mut ordered: Vec<&Step> = steps.iter().collect();
    match ordered.last() {
        Some(last) if last.is_terminal() => {
            let at = ordered.len() - 1;
            ordered.insert(at, finishing);
        }
        _ => ordered.push(finishing),
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ResponseStep, SerializerStep};

    fn names(steps: &[&Step]) -> Vec<String> {
        steps.iter().map(|s| s.name().to_string()).collect()
    }

    #[test]
    fn finishing_step_goes_before_trailing_serializer() {
        let steps = vec![
            Step::Transform(TransformStep::new("a.xsl", "a", false)),
            Step::JsonSerializer(SerializerStep::new("json", false)),
        ];
        let finishing = Step::Transform(TransformStep::system("system/response/response.xsl", "client-response"));

        let ordered = with_finishing_step(&steps, &finishing);

        assert_eq!(names(&ordered), vec!["a", "client-response", "json"]);
    }

    #[test]
    fn finishing_step_is_appended_otherwise() {
        let steps = vec![Step::Response(ResponseStep::new("<r/>"))];
        let finishing = Step::Transform(TransformStep::system("system/response/response.xsl", "client-response"));

        let ordered = with_finishing_step(&steps, &finishing);

        assert_eq!(names(&ordered), vec!["response", "client-response"]);
    }

    #[test]
    fn content_type_follows_serializer_then_properties() {
        let mut summary = ExecutionSummary {
            steps_run: 2,
            output_properties: OutputProperties::new().with("method", "html"),
            serializer: None,
        };
        assert_eq!(summary.content_type(), "text/html");

        summary.output_properties.set("media-type", "application/rss+xml");
        assert_eq!(summary.content_type(), "application/rss+xml");

        summary.serializer = Some(SerializerKind::Json);
        assert_eq!(summary.content_type(), "application/json");
    }
}
