//! funnel-migrate
//!
//! Binario de operación de la migración `funnel.filters`:
//! - `commands`: implementación de cada subcomando sobre una conexión
//!   Postgres, escribiendo a cualquier `Write` (stdout o buffer en tests).
//! - `errors`: error de la CLI y su código de salida.

pub mod commands;
pub mod errors;

pub use errors::CliError;
