//! Argument parsing and command dispatch.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crate::client::{AppContext, CliResult, load_settings};
use crate::commands::{
    handle_add, handle_connect, handle_list, handle_plugins, handle_validate,
};

/// Forward torrents to a Deluge server from the command line.
#[derive(Debug, Parser)]
#[command(name = "sluice", version, about)]
pub(crate) struct Cli {
    /// Settings file path (defaults to `$SLUICE_CONFIG`, then
    /// `~/.config/sluice/config.toml`).
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,

    /// Server index to target instead of the primary.
    #[arg(long, global = true)]
    pub(crate) server: Option<usize>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Connect to a server and report the resolved daemon.
    Connect,
    /// Add a torrent by magnet URI, remote URL, or local file.
    Add(AddArgs),
    /// List the torrents on a server.
    List,
    /// Show enabled plugins and known labels.
    Plugins,
    /// Test credentials against a server without saving them.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
pub(crate) struct AddArgs {
    /// Magnet URI, `http(s)` URL, or path to a `.torrent` file.
    pub(crate) source: String,

    /// Label to assign after the add.
    #[arg(long)]
    pub(crate) label: Option<String>,

    /// Add the torrent paused.
    #[arg(long)]
    pub(crate) paused: bool,

    /// Download directory on the server.
    #[arg(long)]
    pub(crate) download_dir: Option<String>,

    /// Move the payload here when complete.
    #[arg(long)]
    pub(crate) move_completed_path: Option<String>,

    /// Cookie forwarded with a URL fetch, as `name=value`. Repeatable.
    #[arg(long = "cookie")]
    pub(crate) cookies: Vec<String>,
}

#[derive(Debug, Args)]
pub(crate) struct ValidateArgs {
    /// Base URL of the Web-UI to test.
    pub(crate) url: String,

    /// Password; prompted for when omitted.
    #[arg(long)]
    pub(crate) password: Option<String>,
}

/// Parse arguments, dispatch the command, and turn failures into an
/// exit code (2 for validation, 3 for operational failure).
pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

pub(crate) async fn dispatch(cli: Cli) -> CliResult<()> {
    // Validation runs against arbitrary credentials and needs no settings.
    if let Command::Validate(args) = cli.command {
        return handle_validate(args).await;
    }

    let settings = load_settings(cli.config)?;
    let mut ctx = AppContext::from_settings(settings, cli.server)?;
    match cli.command {
        Command::Connect => handle_connect(&mut ctx).await,
        Command::Add(args) => handle_add(&mut ctx, args).await,
        Command::List => handle_list(&mut ctx).await,
        Command::Plugins => handle_plugins(&mut ctx).await,
        Command::Validate(_) => unreachable!("handled above"),
    }
}
