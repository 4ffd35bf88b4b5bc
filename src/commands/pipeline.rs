use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde::Serialize;

use xslpipe::log_status;
use xslpipe::pipeline::{self, CacheDirective, Pipeline};
use xslpipe::{engine, EngineConfig, Step};

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct PipelineArgs {
    #[command(subcommand)]
    command: PipelineCommand,
}

#[derive(Subcommand)]
enum PipelineCommand {
    /// Parse a pipeline definition and print the resulting steps
    Inspect {
        /// Path to the pipeline definition XML
        definition: PathBuf,
    },
    /// Show the steps as they would execute, finishing transform included
    Plan {
        /// Path to the pipeline definition XML
        definition: PathBuf,

        /// Engine configuration JSON (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectOutput {
    pub definition: String,
    pub step_count: usize,
    pub pipeline: Pipeline,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedStep {
    pub position: usize,
    pub name: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOutput {
    pub definition: String,
    pub development_mode: bool,
    pub cache: CacheDirective,
    pub steps: Vec<PlannedStep>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum PipelineOutput {
    Inspect(InspectOutput),
    Plan(PlanOutput),
}

pub fn run(args: PipelineArgs, _global: &GlobalArgs) -> CmdResult<PipelineOutput> {
    match args.command {
        PipelineCommand::Inspect { definition } => {
            log_status!("pipeline", "Parsing {}", definition.display());
            let parsed = pipeline::parse_file(&definition)?;
            Ok((
                PipelineOutput::Inspect(InspectOutput {
                    definition: definition.display().to_string(),
                    step_count: parsed.len(),
                    pipeline: parsed,
                }),
                0,
            ))
        }
        PipelineCommand::Plan { definition, config } => {
            let config = match config {
                Some(path) => EngineConfig::load(&path)?,
                None => EngineConfig::default(),
            };
            log_status!("pipeline", "Planning {}", definition.display());
            let parsed = pipeline::parse_file(&definition)?;
            let finishing = Step::Transform(config.response_step());
            let steps = engine::with_finishing_step(parsed.steps(), &finishing)
                .into_iter()
                .enumerate()
                .map(|(index, step)| PlannedStep {
                    position: index + 1,
                    name: step.name().to_string(),
                    kind: step.kind(),
                    template: step
                        .as_transform()
                        .map(|t| config.template_path(t).display().to_string()),
                })
                .collect();

            Ok((
                PipelineOutput::Plan(PlanOutput {
                    definition: definition.display().to_string(),
                    development_mode: config.development_mode,
                    cache: parsed.cache().clone(),
                    steps,
                }),
                0,
            ))
        }
    }
}
