//! Data migrations: transformaciones de filas ligadas a una versión del
//! esquema.
//!
//! Diesel sólo embebe SQL; las transformaciones que necesitan lógica (como
//! el backfill de `filters`) se registran aquí y el runner de
//! `crate::migrations` las ejecuta justo después de aplicar la versión de
//! esquema que declaran, dentro de la misma transacción.

mod funnel_steps;

use diesel::pg::PgConnection;
use funnel_core::BackfillReport;

use crate::error::PersistenceError;

pub use funnel_steps::MoveFunnelSteps;

pub trait DataMigration: Sync {
    /// Nombre estable; clave en `__data_migrations`.
    fn name(&self) -> &'static str;
    /// Versión Diesel (sólo dígitos) tras la cual corre.
    fn schema_version(&self) -> &'static str;
    fn forward(&self, conn: &mut PgConnection) -> Result<BackfillReport, PersistenceError>;
    fn backward(&self, conn: &mut PgConnection) -> Result<(), PersistenceError>;
}

/// Data migrations registradas, en orden de aplicación.
pub static DATA_MIGRATIONS: &[&dyn DataMigration] = &[&MoveFunnelSteps];

/// Data migrations ligadas a una versión de esquema.
pub fn for_schema_version(version: &str) -> impl Iterator<Item = &'static dyn DataMigration> + '_ {
    DATA_MIGRATIONS.iter().copied().filter(move |m| m.schema_version() == version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let names: HashSet<&str> = DATA_MIGRATIONS.iter().map(|m| m.name()).collect();
        assert_eq!(names.len(), DATA_MIGRATIONS.len());
    }

    #[test]
    fn lookup_by_schema_version() {
        let found: Vec<&str> = for_schema_version("20200413193600").map(|m| m.name()).collect();
        assert_eq!(found, vec!["move_funnel_steps"]);
        assert_eq!(for_schema_version("20200401000000").count(), 0);
    }
}
