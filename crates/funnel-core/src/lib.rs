//! funnel-core: modelo y transformación de filtros de funnels.
//!
//! Contiene la parte pura de la migración `funnel.filters`:
//! - `filters`: forma tipada `{"actions": [...]}` y el tag compartido `FilterType`.
//! - `model`: shape de `FunnelStep` fijada a la versión del esquema migrado.
//! - `store`: trait `FunnelStore` + backend en memoria (paridad con Postgres).
//! - `backfill`: recorrido funnel → steps → filtros, con reporte y plan (dry run).
//! - `hashing`: JSON canónico y digest para comparar payloads.
pub mod backfill;
pub mod errors;
pub mod filters;
pub mod hashing;
pub mod model;
pub mod store;

pub use backfill::{backfill_filters, plan_backfill, BackfillPlan, BackfillReport, PlannedFilters};
pub use errors::CoreError;
pub use filters::{ActionFilter, FilterType, FunnelFilters};
pub use model::FunnelStep;
pub use store::{FunnelStore, InMemoryFunnelStore};
