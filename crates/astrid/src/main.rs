//! Astrid - interactive AI command shell.
//!
//! With trailing arguments: joins them into one command, routes it once,
//! exits. With no arguments: enters the interactive loop.

use anyhow::Result;
use astrid::repl;
use astrid::router::Router;
use astrid_common::config::AstridConfig;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "astrid")]
#[command(about = "Interactive AI command shell", long_about = None)]
#[command(version)]
struct Cli {
    /// Command to route once; empty starts the interactive session.
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AstridConfig::load_or_default();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut router = Router::with_defaults(config)?;

    if cli.command.is_empty() {
        repl::run(&mut router)
    } else {
        let line = cli.command.join(" ");
        repl::run_once(&mut router, &line);
        Ok(())
    }
}
