pub type CmdResult<T> = pullman::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

pub mod app;
pub mod build;
pub mod checkout;
pub mod deploy;
pub mod logs;
pub mod run;
pub mod server;
pub mod ssh;
pub mod status;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (pullman::Result<serde_json::Value>, i32) {
    crate::tty::status("pullman is working...");

    match command {
        crate::Commands::Run(args) => dispatch!(args, global, run),
        crate::Commands::Checkout(args) => dispatch!(args, global, checkout),
        crate::Commands::Build(args) => dispatch!(args, global, build),
        crate::Commands::Test(args) => dispatch!(args, global, test),
        crate::Commands::Deploy(args) => dispatch!(args, global, deploy),
        crate::Commands::Status(args) => dispatch!(args, global, status),
        crate::Commands::Logs(args) => dispatch!(args, global, logs),
        crate::Commands::Ssh(args) => dispatch!(args, global, ssh),
        crate::Commands::App(args) => dispatch!(args, global, app),
        crate::Commands::Server(args) => dispatch!(args, global, server),
    }
}
