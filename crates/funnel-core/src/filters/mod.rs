//! Filtros de funnel: payload JSONB `posthog_funnel.filters`.

pub mod types;

pub use types::{ActionFilter, FilterType, FunnelFilters};
