//! Errores del core (simples por ahora).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CoreError {
    #[error("funnel not found: {0}")] FunnelNotFound(i32),
    #[error("invalid filters payload: {0}")] InvalidFilters(String),
    /// Fallo de un `FunnelStore` externo (backend propio, wrappers de test)
    /// que no tiene error tipado; el backend en memoria no lo emite.
    #[error("store: {0}")] Store(String),
}
