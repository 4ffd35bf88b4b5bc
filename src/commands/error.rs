use clap::{Args, Subcommand};
use serde::Serialize;

use xslpipe::error::codes;
use xslpipe::error::help::{self, ErrorHelp, ErrorHelpSummary};
use xslpipe::Error;

use super::CmdResult;

#[derive(Args)]
pub struct ErrorArgs {
    #[command(subcommand)]
    command: ErrorCommand,
}

#[derive(Subcommand)]
enum ErrorCommand {
    /// List every error code with a one-line summary
    List,
    /// Explain one error code: details schema and hints
    Explain {
        /// Error code, e.g. pipeline.missing_attribute
        code: String,
    },
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum ErrorOutput {
    List(Vec<ErrorHelpSummary>),
    Explain(ErrorHelp),
}

pub fn run_json(args: ErrorArgs) -> CmdResult<ErrorOutput> {
    match args.command {
        ErrorCommand::List => Ok((ErrorOutput::List(help::list()), 0)),
        ErrorCommand::Explain { code } => {
            let parsed = codes::parse_code(&code).ok_or_else(|| {
                Error::validation_invalid_argument(
                    "code",
                    format!("Unknown error code '{}'", code),
                    Some(code.clone()),
                    Some(
                        codes::all_codes()
                            .iter()
                            .map(|c| c.as_str().to_string())
                            .collect(),
                    ),
                )
                .with_hint("Run `xslpipe error list` to see every code")
            })?;
            Ok((ErrorOutput::Explain(help::explain(parsed)), 0))
        }
    }
}
