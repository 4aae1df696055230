//! Subcomandos de `funnel-migrate`.

use std::io::Write;

use diesel::pg::PgConnection;
use funnel_core::{plan_backfill, FunnelFilters, FunnelStore};
use funnel_persistence::{dry_run, migration_status, revert_last_migration, run_pending_migrations, PersistenceError, PgFunnelStore};
use log::info;

use crate::errors::CliError;

pub fn migrate<W: Write>(conn: &mut PgConnection, out: &mut W) -> Result<(), CliError> {
    let outcome = run_pending_migrations(conn)?;
    if outcome.is_empty() {
        writeln!(out, "sin migraciones pendientes")?;
        return Ok(());
    }
    for version in &outcome.schema_versions {
        writeln!(out, "schema aplicado version={version}")?;
    }
    for data in &outcome.data_migrations {
        writeln!(out,
                 "data aplicada name={} funnels={} steps={} changed={}",
                 data.name, data.report.funnels, data.report.steps, data.report.changed)?;
    }
    Ok(())
}

pub fn revert<W: Write>(conn: &mut PgConnection, out: &mut W) -> Result<(), CliError> {
    match revert_last_migration(conn)? {
        Some(outcome) => {
            for name in &outcome.data_migrations {
                writeln!(out, "data revertida name={name}")?;
            }
            writeln!(out, "schema revertido version={}", outcome.schema_version)?;
        }
        None => writeln!(out, "nada que revertir")?,
    }
    Ok(())
}

pub fn status<W: Write>(conn: &mut PgConnection, out: &mut W) -> Result<(), CliError> {
    let status = migration_status(conn)?;
    for s in &status.schema {
        let mark = if s.applied { "applied" } else { "pending" };
        writeln!(out, "schema {mark:<7} {}", s.name)?;
    }
    for d in &status.data {
        match d.applied_at {
            Some(ts) => writeln!(out, "data   applied {} (schema {}) at {}", d.name, d.schema_version, ts.to_rfc3339())?,
            None => writeln!(out, "data   pending {} (schema {})", d.name, d.schema_version)?,
        }
    }
    Ok(())
}

/// Dry run: aplica el esquema pendiente en una transacción descartada y
/// calcula lo que escribiría el backfill.
pub fn plan<W: Write>(conn: &mut PgConnection, out: &mut W) -> Result<(), CliError> {
    let (pending, plan) = dry_run(conn, |tx| plan_backfill(&mut PgFunnelStore::new(tx)))?;
    let report = plan.report();
    info!("plan: pending_schema={} funnels={}", pending.len(), report.funnels);
    for version in &pending {
        writeln!(out, "schema pendiente version={version}")?;
    }
    writeln!(out,
             "funnels={} steps={} changed={} digest={}",
             report.funnels,
             report.steps,
             report.changed,
             plan.digest())?;
    Ok(())
}

pub fn show<W: Write>(conn: &mut PgConnection, funnel_id: i32, out: &mut W) -> Result<(), CliError> {
    let value = match PgFunnelStore::new(conn).filters_for(funnel_id) {
        Ok(v) => v,
        Err(PersistenceError::NotFound) => return Err(CliError::FunnelNotFound(funnel_id)),
        Err(e) => return Err(e.into()),
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
    match FunnelFilters::from_value(&value)? {
        Some(filters) => writeln!(out, "actions={}", filters.actions.len())?,
        None => writeln!(out, "sin backfill")?,
    }
    Ok(())
}
