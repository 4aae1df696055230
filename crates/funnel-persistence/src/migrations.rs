//! Runner de migraciones: esquema (SQL embebido con Diesel) + data migrations.
//!
//! Todo `run_pending_migrations` ocurre en UNA transacción Postgres: cada
//! migración de esquema se anida como savepoint y sus data migrations corren
//! inmediatamente después. Si algo falla no queda ninguna versión marcada
//! como aplicada.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::migration::{Migration, MigrationSource};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use funnel_core::BackfillReport;
use log::{debug, info, warn};

use crate::data::{self, DataMigration, DATA_MIGRATIONS};
use crate::error::{migration_error, PersistenceError};
use crate::schema::__data_migrations;

/// Migraciones de esquema en `migrations/` de este crate.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const CREATE_DATA_MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS __data_migrations (
    name TEXT PRIMARY KEY,
    schema_version TEXT NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
);";

/// Data migration aplicada en una corrida.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMigrationOutcome {
    pub name: &'static str,
    pub report: BackfillReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub schema_versions: Vec<String>,
    pub data_migrations: Vec<DataMigrationOutcome>,
}

impl MigrationOutcome {
    pub fn is_empty(&self) -> bool {
        self.schema_versions.is_empty() && self.data_migrations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertOutcome {
    pub schema_version: String,
    pub data_migrations: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaVersionStatus {
    pub version: String,
    pub name: String,
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMigrationStatus {
    pub name: &'static str,
    pub schema_version: &'static str,
    pub applied_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub schema: Vec<SchemaVersionStatus>,
    pub data: Vec<DataMigrationStatus>,
}

fn ensure_data_migrations_table(conn: &mut PgConnection) -> Result<(), PersistenceError> {
    conn.batch_execute(CREATE_DATA_MIGRATIONS_TABLE)?;
    Ok(())
}

fn applied_schema_versions(conn: &mut PgConnection) -> Result<HashSet<String>, PersistenceError> {
    let applied = conn.applied_migrations().map_err(migration_error)?;
    Ok(applied.into_iter().map(|v| v.to_string()).collect())
}

fn is_recorded(conn: &mut PgConnection, name: &str) -> Result<bool, PersistenceError> {
    let found: Option<String> = __data_migrations::table.find(name)
                                                        .select(__data_migrations::name)
                                                        .first(conn)
                                                        .optional()?;
    Ok(found.is_some())
}

/// Borra el registro de `name`; `true` si existía.
fn forget_record(conn: &mut PgConnection, name: &str) -> Result<bool, PersistenceError> {
    let deleted = diesel::delete(__data_migrations::table.find(name)).execute(conn)?;
    Ok(deleted > 0)
}

/// Aplica `migration` si no figura en `__data_migrations`.
fn apply_if_pending(conn: &mut PgConnection,
                    migration: &'static dyn DataMigration)
                    -> Result<Option<DataMigrationOutcome>, PersistenceError> {
    if is_recorded(conn, migration.name())? {
        debug!("data migration already applied name={}", migration.name());
        return Ok(None);
    }
    info!("data migration:start name={} schema_version={}", migration.name(), migration.schema_version());
    let report = migration.forward(conn)?;
    diesel::insert_into(__data_migrations::table).values((__data_migrations::name.eq(migration.name()),
                                                           __data_migrations::schema_version.eq(migration.schema_version())))
                                                  .execute(conn)?;
    info!("data migration:done name={}", migration.name());
    Ok(Some(DataMigrationOutcome { name: migration.name(), report }))
}

fn apply_pending(conn: &mut PgConnection) -> Result<MigrationOutcome, PersistenceError> {
    ensure_data_migrations_table(conn)?;
    let mut outcome = MigrationOutcome::default();

    let pending = conn.pending_migrations(MIGRATIONS).map_err(migration_error)?;
    for migration in pending {
        let version = conn.run_migration(&*migration).map_err(migration_error)?.to_string();
        info!("schema migration applied version={version} name={}", migration.name());
        for data_migration in data::for_schema_version(&version) {
            // La versión se acaba de aplicar: un registro previo quedó de una
            // columna que ya no existe (revert hecho fuera de esta herramienta).
            if forget_record(conn, data_migration.name())? {
                warn!("data migration record stale name={} version={version}", data_migration.name());
            }
            if let Some(done) = apply_if_pending(conn, data_migration)? {
                outcome.data_migrations.push(done);
            }
        }
        outcome.schema_versions.push(version);
    }

    // Esquema aplicado por otra vía (p. ej. `diesel migration run`) pero sin
    // su data migration registrada.
    let applied = applied_schema_versions(conn)?;
    for data_migration in DATA_MIGRATIONS.iter().copied() {
        if applied.contains(data_migration.schema_version()) {
            if let Some(done) = apply_if_pending(conn, data_migration)? {
                outcome.data_migrations.push(done);
            }
        }
    }
    Ok(outcome)
}

/// Aplica todas las migraciones pendientes (esquema + datos) en una sola
/// transacción.
pub fn run_pending_migrations(conn: &mut PgConnection) -> Result<MigrationOutcome, PersistenceError> {
    info!("migrate:start");
    let outcome = conn.transaction(apply_pending)?;
    if outcome.is_empty() {
        info!("migrate:done nothing pending");
    } else {
        info!("migrate:done schema={:?} data={:?}",
              outcome.schema_versions,
              outcome.data_migrations.iter().map(|d| d.name).collect::<Vec<_>>());
    }
    Ok(outcome)
}

/// Revierte la última versión de esquema aplicada.
///
/// Primero corre el lado `backward` de sus data migrations y borra su
/// registro; luego el `down.sql`. `Ok(None)` si no hay nada aplicado.
pub fn revert_last_migration(conn: &mut PgConnection) -> Result<Option<RevertOutcome>, PersistenceError> {
    conn.transaction(|tx| {
            ensure_data_migrations_table(tx)?;
            let Some(last) = applied_schema_versions(tx)?.into_iter().max() else {
                info!("revert: no applied schema migrations");
                return Ok(None);
            };
            let mut reverted = Vec::new();
            for data_migration in data::for_schema_version(&last) {
                if is_recorded(tx, data_migration.name())? {
                    data_migration.backward(tx)?;
                    forget_record(tx, data_migration.name())?;
                    reverted.push(data_migration.name());
                }
            }
            let version = tx.revert_last_migration(MIGRATIONS).map_err(migration_error)?.to_string();
            if version != last {
                warn!("revert: expected version={last} reverted={version}");
            }
            info!("revert:done version={version} data={reverted:?}");
            Ok(Some(RevertOutcome { schema_version: version, data_migrations: reverted }))
        })
}

/// Estado de versiones de esquema y data migrations.
pub fn migration_status(conn: &mut PgConnection) -> Result<MigrationStatus, PersistenceError> {
    ensure_data_migrations_table(conn)?;
    let applied = applied_schema_versions(conn)?;
    let known: Vec<Box<dyn Migration<Pg>>> = MigrationSource::<Pg>::migrations(&MIGRATIONS).map_err(migration_error)?;
    let mut schema: Vec<SchemaVersionStatus> = known.iter()
                                                    .map(|m| {
                                                        let version = m.name().version().to_string();
                                                        SchemaVersionStatus { applied: applied.contains(&version),
                                                                              name: m.name().to_string(),
                                                                              version }
                                                    })
                                                    .collect();
    schema.sort_by(|a, b| a.version.cmp(&b.version));

    let rows: Vec<(String, DateTime<Utc>)> = __data_migrations::table.select((__data_migrations::name,
                                                                              __data_migrations::applied_at))
                                                                     .load(conn)?;
    let data = DATA_MIGRATIONS.iter()
                              .map(|m| DataMigrationStatus { name: m.name(),
                                                             schema_version: m.schema_version(),
                                                             applied_at: rows.iter()
                                                                             .find(|(name, _)| name == m.name())
                                                                             .map(|(_, ts)| *ts) })
                              .collect();
    Ok(MigrationStatus { schema, data })
}

/// Aplica las migraciones de esquema pendientes (sin data migrations), corre
/// `f` y deshace todo. Devuelve las versiones que se habrían aplicado y el
/// resultado de `f`.
pub fn dry_run<T, F>(conn: &mut PgConnection, f: F) -> Result<(Vec<String>, T), PersistenceError>
    where F: FnOnce(&mut PgConnection) -> Result<T, PersistenceError>
{
    let mut captured = None;
    let result = conn.transaction::<(), PersistenceError, _>(|tx| {
                         let pending = tx.pending_migrations(MIGRATIONS).map_err(migration_error)?;
                         let mut versions = Vec::with_capacity(pending.len());
                         for migration in pending {
                             versions.push(tx.run_migration(&*migration).map_err(migration_error)?.to_string());
                         }
                         captured = Some((versions, f(tx)?));
                         Err(PersistenceError::DryRunRollback)
                     });
    match (result, captured) {
        (Err(PersistenceError::DryRunRollback), Some(out)) => Ok(out),
        (Err(e), _) => Err(e),
        (Ok(()), _) => Err(PersistenceError::Unknown("dry run committed".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_data_migration_targets_an_embedded_schema_version() {
        let known: Vec<String> = MigrationSource::<Pg>::migrations(&MIGRATIONS).expect("embedded migrations")
                                                                              .iter()
                                                                              .map(|m| m.name().version().to_string())
                                                                              .collect();
        for m in DATA_MIGRATIONS {
            assert!(known.iter().any(|v| v == m.schema_version()),
                    "{} apunta a versión inexistente {}",
                    m.name(),
                    m.schema_version());
        }
    }

    #[test]
    fn embedded_versions_are_ordered_baseline_first() {
        let mut versions: Vec<String> = MigrationSource::<Pg>::migrations(&MIGRATIONS).expect("embedded migrations")
                                                                                     .iter()
                                                                                     .map(|m| m.name().version().to_string())
                                                                                     .collect();
        versions.sort();
        assert_eq!(versions, vec!["20200401000000".to_string(), "20200413193600".to_string()]);
    }
}
