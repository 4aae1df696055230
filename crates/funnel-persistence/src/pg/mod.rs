//! Implementaciones Postgres (Diesel).
//!
//! - Pool r2d2 y `ConnectionProvider` para obtener conexiones.
//! - `PgFunnelStore`: `FunnelStore` sobre una conexión prestada. Se usa
//!   dentro de la transacción de la migración, por eso no toma conexiones
//!   del pool por su cuenta.

use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use funnel_core::{FunnelStep, FunnelStore};
use log::{debug, warn};
use serde_json::Value;

use crate::error::PersistenceError;
use crate::schema::{posthog_funnel, posthog_funnelstep};

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Contrato:
/// - Debe devolver una conexión válida o `PersistenceError::TransientIo`.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `PgPool`.
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Fila de `posthog_funnelstep` en el orden de columnas del `select`.
#[derive(Queryable, Debug)]
struct StepRow {
    id: i32,
    funnel_id: i32,
    action_id: i32,
    step_order: i32,
}

impl From<StepRow> for FunnelStep {
    fn from(row: StepRow) -> Self {
        FunnelStep { id: row.id,
                     funnel_id: row.funnel_id,
                     action_id: row.action_id,
                     order: row.step_order }
    }
}

/// `FunnelStore` sobre Postgres.
pub struct PgFunnelStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgFunnelStore<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

impl FunnelStore for PgFunnelStore<'_> {
    type Error = PersistenceError;

    fn funnel_ids(&mut self) -> Result<Vec<i32>, PersistenceError> {
        posthog_funnel::table.select(posthog_funnel::id)
                             .order(posthog_funnel::id.asc())
                             .load(&mut *self.conn)
                             .map_err(PersistenceError::from)
    }

    fn steps_for(&mut self, funnel_id: i32) -> Result<Vec<FunnelStep>, PersistenceError> {
        let rows: Vec<StepRow> = posthog_funnelstep::table.filter(posthog_funnelstep::funnel_id.eq(funnel_id))
                                                          .order((posthog_funnelstep::step_order.asc(), posthog_funnelstep::id.asc()))
                                                          .select((posthog_funnelstep::id,
                                                                   posthog_funnelstep::funnel_id,
                                                                   posthog_funnelstep::action_id,
                                                                   posthog_funnelstep::step_order))
                                                          .load(&mut *self.conn)?;
        Ok(rows.into_iter().map(FunnelStep::from).collect())
    }

    fn filters_for(&mut self, funnel_id: i32) -> Result<Value, PersistenceError> {
        posthog_funnel::table.find(funnel_id)
                             .select(posthog_funnel::filters)
                             .first(&mut *self.conn)
                             .map_err(PersistenceError::from)
    }

    fn write_filters(&mut self, funnel_id: i32, filters: &Value) -> Result<(), PersistenceError> {
        let updated = diesel::update(posthog_funnel::table.find(funnel_id)).set(posthog_funnel::filters.eq(filters))
                                                                           .execute(&mut *self.conn)?;
        if updated == 0 {
            debug!("write_filters: funnel_id={funnel_id} no existe");
            return Err(PersistenceError::NotFound);
        }
        Ok(())
    }
}

/// Construye un pool Postgres r2d2 a partir de URL (sin migrar).
///
/// - Tamaños 0 se elevan a 1; si `min_size > max_size`, usa `min = max`.
/// - Devuelve `PersistenceError::TransientIo` ante errores del pool/manager.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    r2d2::Pool::builder().min_idle(Some(validated_min.min(validated_max)))
                         .max_size(validated_max)
                         .build(manager)
                         .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))
}
