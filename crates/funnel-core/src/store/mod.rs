//! Acceso a funnels y steps para el backfill.

mod memory;

use serde_json::Value;

use crate::model::FunnelStep;

pub use memory::InMemoryFunnelStore;

/// Fuente/destino de datos del backfill de filtros.
///
/// Contrato:
/// - `funnel_ids`: todos los funnels existentes, orden ascendente por id.
/// - `steps_for`: steps del funnel ordenados por `order` (empate por `id`).
/// - `write_filters`: reemplaza el payload completo; un funnel inexistente
///   es un error.
pub trait FunnelStore {
    type Error: std::fmt::Debug + std::fmt::Display;

    fn funnel_ids(&mut self) -> Result<Vec<i32>, Self::Error>;
    fn steps_for(&mut self, funnel_id: i32) -> Result<Vec<FunnelStep>, Self::Error>;
    fn filters_for(&mut self, funnel_id: i32) -> Result<Value, Self::Error>;
    fn write_filters(&mut self, funnel_id: i32, filters: &Value) -> Result<(), Self::Error>;
}
