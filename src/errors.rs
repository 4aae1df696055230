use funnel_core::CoreError;
use funnel_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("funnel no encontrado: {0}")]
    FunnelNotFound(i32),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// 4: entidad inexistente; 5: base de datos / migración / IO.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::FunnelNotFound(_) | CliError::Persistence(PersistenceError::NotFound) => 4,
            _ => 5,
        }
    }
}
