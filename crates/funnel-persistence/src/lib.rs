//! funnel-persistence
//!
//! Capa Postgres (Diesel) de la migración de filtros de funnels.
//!
//! Módulos:
//! - `pg`: pool r2d2, `ConnectionProvider` y `PgFunnelStore`.
//! - `migrations`: runner embebido (esquema + data migrations en una sola
//!   transacción), revert y status.
//! - `data`: data migrations registradas contra una versión del esquema.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel declaradas para compilar queries.

pub mod config;
pub mod data;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::DbConfig;
pub use error::PersistenceError;
pub use migrations::{dry_run, migration_status, revert_last_migration, run_pending_migrations, MigrationOutcome, MigrationStatus, RevertOutcome};
pub use pg::{build_pool, ConnectionProvider, PgFunnelStore, PgPool, PoolProvider};
