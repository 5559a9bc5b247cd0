use clap::{Args, Subcommand};
use serde::Serialize;

use pullman::server::{self, Server};

use super::CmdResult;

#[derive(Args)]
pub struct ServerArgs {
    #[command(subcommand)]
    pub subcommand: ServerSubcommand,
}

#[derive(Subcommand)]
pub enum ServerSubcommand {
    /// Register a new server
    Add(AddArgs),
    /// List configured servers
    List,
    /// Show a server's configuration
    Show { server_id: String },
    /// Update fields on an existing server
    Set(SetArgs),
    /// Remove a server
    Remove { server_id: String },
    /// Manage the SSH identity file
    Key(KeyArgs),
}

#[derive(Args)]
pub struct AddArgs {
    /// Server ID
    pub server_id: String,

    /// Host name or address
    #[arg(long)]
    pub host: String,

    /// SSH user
    #[arg(long)]
    pub user: String,

    /// SSH port
    #[arg(long, default_value_t = 22)]
    pub port: u16,

    /// Identity file for key-based auth
    #[arg(long)]
    pub identity_file: Option<String>,
}

#[derive(Args)]
pub struct SetArgs {
    /// Server ID
    pub server_id: String,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub user: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Args)]
pub struct KeyArgs {
    #[command(subcommand)]
    pub subcommand: KeySubcommand,
}

#[derive(Subcommand)]
pub enum KeySubcommand {
    /// Point the server at an existing identity file
    Use { server_id: String, key_path: String },
    /// Clear the configured identity file
    Unset { server_id: String },
}

#[derive(Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServerOutput {
    Saved { server: Server },
    List { servers: Vec<Server> },
    Show { server: Server },
    Removed { server_id: String },
}

pub fn run(args: ServerArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<ServerOutput> {
    match args.subcommand {
        ServerSubcommand::Add(add) => {
            let identity_file = add
                .identity_file
                .map(|path| shellexpand::tilde(&path).to_string());
            let server = server::create(Server {
                id: add.server_id,
                host: add.host,
                user: add.user,
                port: add.port,
                identity_file,
            })?;
            Ok((ServerOutput::Saved { server }, 0))
        }
        ServerSubcommand::List => {
            let servers = server::list()?;
            Ok((ServerOutput::List { servers }, 0))
        }
        ServerSubcommand::Show { server_id } => {
            let server = server::load(&server_id)?;
            Ok((ServerOutput::Show { server }, 0))
        }
        ServerSubcommand::Set(set) => {
            let mut server = server::load(&set.server_id)?;
            if let Some(host) = set.host {
                server.host = host;
            }
            if let Some(user) = set.user {
                server.user = user;
            }
            if let Some(port) = set.port {
                server.port = port;
            }
            server::save(&server)?;
            Ok((ServerOutput::Saved { server }, 0))
        }
        ServerSubcommand::Remove { server_id } => {
            server::delete(&server_id)?;
            Ok((ServerOutput::Removed { server_id }, 0))
        }
        ServerSubcommand::Key(key) => match key.subcommand {
            KeySubcommand::Use {
                server_id,
                key_path,
            } => {
                let server = server::use_key(&server_id, &key_path)?;
                Ok((ServerOutput::Saved { server }, 0))
            }
            KeySubcommand::Unset { server_id } => {
                let server = server::unset_key(&server_id)?;
                Ok((ServerOutput::Saved { server }, 0))
            }
        },
    }
}
