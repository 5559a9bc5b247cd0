use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{app, build, checkout, deploy, logs, run, server, ssh, status, test};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "pullman")]
#[command(version = VERSION)]
#[command(about = "CLI for pull-based deployment of Python web applications")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: checkout, build, test, deploy
    Run(run::RunArgs),
    /// Check out an app's repository into a fresh local working copy
    Checkout(checkout::CheckoutArgs),
    /// Provision the local dependency environment
    Build(build::BuildArgs),
    /// Run the test suite in the local working copy
    Test(test::TestArgs),
    /// Deploy an app to its remote host
    Deploy(deploy::DeployArgs),
    /// Inspect the deploy target without deploying
    Status(status::StatusArgs),
    /// View application logs on the deploy target
    Logs(logs::LogsArgs),
    /// SSH into an app's server or a configured server
    Ssh(ssh::SshArgs),
    /// Manage app configurations
    #[command(visible_alias = "apps")]
    App(app::AppArgs),
    /// Manage SSH server configurations
    #[command(visible_alias = "servers")]
    Server(server::ServerArgs),
}

#[derive(Debug, Clone, Copy)]
enum ResponseMode {
    Json,
    InteractivePassthrough,
}

fn response_mode(command: &Commands) -> ResponseMode {
    match command {
        Commands::Ssh(args) if ssh::is_interactive(args) => ResponseMode::InteractivePassthrough,
        _ => ResponseMode::Json,
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};

    let mode = response_mode(&cli.command);

    if let ResponseMode::InteractivePassthrough = mode {
        if !tty::require_tty_for_interactive() {
            let err = pullman::Error::validation_invalid_argument(
                "tty",
                "This command requires an interactive TTY",
                None,
            );
            let _ = output::print_result::<serde_json::Value>(Err(err));
            return std::process::ExitCode::from(2);
        }
    }

    let (json_result, exit_code) = commands::run_json(cli.command, &global);

    match mode {
        ResponseMode::Json => {
            let _ = output::print_json_result(json_result);
        }
        ResponseMode::InteractivePassthrough => {}
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
