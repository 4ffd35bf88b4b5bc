pub type CmdResult<T> = xslpipe::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

pub mod error;
pub mod pipeline;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run_json($args))
    };
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (xslpipe::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Pipeline(args) => dispatch!(args, global, pipeline),
        crate::Commands::Error(args) => dispatch!(args, error),
    }
}
