//! stet CLI - Operator tooling for write conflicts
//!
//! Records failed version checks, shows what diverged, and resolves conflicts
//! against a JSON state file.

mod cli;
mod commands;
mod error;
mod state;


use std::sync::Arc;

use clap::Parser;
use stet_core::notify::ChannelObserver;
use stet_core::{ConflictService, ResolverConfig};

use crate::cli::{Cli, Commands};
use crate::commands::check::run_check;
use crate::commands::common::drain_notifications;
use crate::commands::completions::run_completions;
use crate::commands::list::run_list;
use crate::commands::report::run_report;
use crate::commands::resolve::{run_resolve, run_resolve_all};
use crate::commands::show::run_show;
use crate::error::CliError;
use crate::state::{load_store, resolve_config_path, resolve_state_path, save_store};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "stet=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let state_path = resolve_state_path(cli.state_path);
    let config = ResolverConfig::load_from_path(&resolve_config_path(cli.config))?;
    let service = ConflictService::with_config(load_store(&state_path)?, config);

    let (observer, receiver) = ChannelObserver::channel();
    service.subscribe(Arc::new(observer));
    let notifications = tokio::spawn(drain_notifications(receiver));

    let changed = match cli.command {
        Commands::Report { local, server } => run_report(&local, &server, &service)?,
        Commands::Check { local, server } => run_check(&local, &server, &service)?,
        Commands::List { status, json } => {
            run_list(status, json, &service)?;
            false
        }
        Commands::Show { id, json } => {
            run_show(&id, json, &service)?;
            false
        }
        Commands::Resolve {
            id,
            strategy,
            picks,
            sets,
        } => {
            run_resolve(&id, strategy.into(), &picks, &sets, &service)?;
            true
        }
        Commands::ResolveAll { strategy, json } => run_resolve_all(strategy.into(), json, &service)?,
        Commands::Completions { .. } => false,
    };

    if changed {
        save_store(service.store(), &state_path)?;
    }

    // Dropping the service closes the notification channel.
    drop(service);
    if let Err(error) = notifications.await {
        tracing::warn!("Notification task failed: {}", error);
    }

    Ok(())
}
