mod cli;
mod commands;
mod config;
mod file_io;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Commands::Inspect { input, json }) => {
            commands::inspect::handle(&input, json)?;
        }

        Some(Commands::Configure {
            opcodes,
            store_size,
            name,
            show,
        }) => {
            commands::configure::handle(opcodes, store_size, name, show)?;
        }

        None => {
            commands::embed::handle(&cli.embed)?;
        }
    }

    Ok(())
}

/// Log to stderr so JSON reports on stdout stay clean
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("gtasave=debug,gtasave_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "gtasave=info,gtasave_cli=info".into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
