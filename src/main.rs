use std::io;

use clap::{Parser, Subcommand};
use funnel_migrate::{commands, CliError};
use funnel_persistence::{build_pool, ConnectionProvider, DbConfig, PoolProvider};
use log::error;

/// Migración `posthog_funnel.filters` (schema + backfill desde funnel steps).
#[derive(Parser, Debug)]
#[command(name = "funnel-migrate", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aplica esquema y data migrations pendientes en una transacción.
    Migrate,
    /// Revierte la última versión de esquema aplicada.
    Revert,
    /// Lista versiones aplicadas y pendientes.
    Status,
    /// Dry run del backfill (no escribe nada).
    Plan,
    /// Muestra `filters` de un funnel.
    Show {
        #[arg(long)]
        funnel: i32,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    // DATABASE_URL, DATABASE_MIN_CONNECTIONS, DATABASE_MAX_CONNECTIONS (.env incluido)
    let cfg = DbConfig::from_env()?;
    let provider = PoolProvider { pool: build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)? };
    let mut conn = provider.connection()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Migrate => commands::migrate(&mut conn, &mut out),
        Command::Revert => commands::revert(&mut conn, &mut out),
        Command::Status => commands::status(&mut conn, &mut out),
        Command::Plan => commands::plan(&mut conn, &mut out),
        Command::Show { funnel } => commands::show(&mut conn, funnel, &mut out),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{e}");
        std::process::exit(e.exit_code());
    }
}
