//! Command line front end for deploying and starting the aria2 daemon.
use std::{path::PathBuf, process::ExitCode, time::Duration};

use ariad::{
    config::{ConfigFormat, DeployConfig},
    launch::{DaemonMode, LaunchOptions, LaunchResult},
    provision::ProvisionFlags,
};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Entry point
fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(error) = init_logging(args.verbose) {
        eprintln!("could not initialize logging: {error}");
    }

    // Log any error from the wrapped main before reporting it to the shell.
    match main2(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            tracing::error!(?error, "main error");
            ExitCode::FAILURE
        }
    }
}

fn main2(args: &Args) -> anyhow::Result<bool> {
    let config = args.deploy_config()?;

    let success = match &args.command {
        Command::Deploy(flags) => deploy(&config, flags)?,
        Command::Start(start_args) => start(&config, start_args)?,
        Command::Run { flags, start: start_args } => {
            deploy(&config, flags)? && start(&config, start_args)?
        }
    };

    Ok(success)
}

fn deploy(config: &DeployConfig, flags: &FlagArgs) -> anyhow::Result<bool> {
    let flags = ProvisionFlags {
        force: flags.force,
        update: flags.update,
    };
    let report = ariad::provision(config, flags)?;

    for entry in &report.artifacts {
        tracing::debug!(artifact = entry.kind.name(), action = ?entry.action, removed = entry.removed, outcome = ?entry.outcome, "provisioned");
    }

    Ok(report.is_success())
}

fn start(config: &DeployConfig, start_args: &StartArgs) -> anyhow::Result<bool> {
    let mut options = LaunchOptions::default();
    options.probe_rpc = start_args.probe;
    options.mode = if start_args.foreground {
        DaemonMode::Foreground
    } else {
        DaemonMode::Background
    };

    let result = ariad::launch(config, &options)?;

    match &result {
        LaunchResult::Started(handle) => {
            tracing::info!(pid = handle.pid, session_id = ?handle.session_id, "aria2 started successfully");
        }
        LaunchResult::Failed(message) => {
            tracing::error!(%message, "startup failed");
        }
        LaunchResult::Exception(message) => {
            tracing::error!(%message, "exception occurred");
        }
    }

    Ok(result.is_started())
}

/// Initialize logging to stderr.
///
/// `RUST_LOG` takes precedence over the verbosity flags.
fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!(error))?;

    Ok(())
}

// Clap arguments:
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Program root (defaults to the directory of this binary)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Format of the daemon's main configuration file
    #[arg(long, global = true, value_enum, default_value_t = FormatArg::Aria2)]
    config_format: FormatArg,

    /// Time limit for each HTTP request, in seconds
    #[arg(long, global = true, default_value_t = 10)]
    timeout: u64,

    /// URL of the main configuration file (generated locally when absent)
    #[arg(long, global = true)]
    config_url: Option<String>,

    /// Increase log verbosity (repeatable)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    fn deploy_config(&self) -> anyhow::Result<DeployConfig> {
        let mut config = match &self.root {
            Some(root) => DeployConfig::with_root(root),
            None => DeployConfig::new()?,
        };
        config.config_format = self.config_format.into();
        config.fetch_timeout = Duration::from_secs(self.timeout);
        config.main_config_url = self.config_url.clone();

        Ok(config)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download the daemon and write its configuration
    Deploy(FlagArgs),
    /// Start the daemon
    Start(StartArgs),
    /// Deploy, then start the daemon
    Run {
        #[command(flatten)]
        flags: FlagArgs,
        #[command(flatten)]
        start: StartArgs,
    },
}

#[derive(Debug, ClapArgs)]
struct FlagArgs {
    /// Replace installed files
    #[arg(long, short)]
    force: bool,
    /// Replace installed files with the current version
    #[arg(long, short)]
    update: bool,
}

#[derive(Debug, ClapArgs)]
struct StartArgs {
    /// Query the daemon's JSON-RPC interface after starting
    #[arg(long)]
    probe: bool,
    /// Don't pass --daemon=true; spawn and return immediately
    #[arg(long)]
    foreground: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Aria2,
    Json,
    Toml,
}

impl From<FormatArg> for ConfigFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Aria2 => ConfigFormat::Aria2,
            FormatArg::Json => ConfigFormat::Json,
            FormatArg::Toml => ConfigFormat::Toml,
        }
    }
}
