//! Command line interface for macbundler.
//!
//! Parses arguments, sets up logging, loads the configuration file and
//! dispatches to the subcommand handlers in [`commands`].

mod args;
pub mod commands;
mod output;

pub use args::{
    Args, Command, CreateArgs, FixArgs, FixOptions, PackageArgs, RuntimeConfig, SignArgs,
};
pub use output::OutputManager;

use crate::{config::Config, error::Result};
use env_logger::{Env, WriteStyle};

/// Main CLI entry point. Returns the process exit code.
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    init_logging(args.verbose, args.no_color);

    let runtime = RuntimeConfig::from(&args);
    let config = Config::discover(args.config.as_deref())?;

    match &args.command {
        Command::Create(create) => commands::create::execute(create, &config, &runtime).await,
        Command::Fix(fix) => commands::fix::execute(fix, &config, &runtime).await,
        Command::Sign(sign) => commands::sign::execute(sign, &config, &runtime).await,
        Command::Package(package) => commands::package::execute(package, &config, &runtime).await,
    }
}

/// `info` by default, `debug` with `--verbose`; `RUST_LOG` overrides both.
fn init_logging(verbose: bool, no_color: bool) {
    let level = if verbose { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(level));
    builder.format_timestamp(None);

    if no_color {
        builder.write_style(WriteStyle::Never);
        colored::control::set_override(false);
    }

    if let Err(e) = builder.try_init() {
        eprintln!("Failed to initialize logging: {}", e);
    }
}
