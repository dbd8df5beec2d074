// ============================================================================
// ERRORES DE SINCRONIZACIÓN
// ============================================================================

use thiserror::Error;

/// Errores del subsistema de borradores y sincronización
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// No hay usuario autenticado en el momento de leer/escribir
    #[error("No hay usuario autenticado")]
    Unauthenticated,

    #[error("Error escribiendo en el almacén remoto: {0}")]
    RemoteWrite(String),

    #[error("Error leyendo del almacén remoto: {0}")]
    RemoteRead(String),

    /// localStorage lleno (QuotaExceededError)
    #[error("Almacenamiento local lleno: {0}")]
    QuotaExceeded(String),

    #[error("No se pudo acceder a localStorage")]
    StorageUnavailable,

    #[error("Error de almacenamiento local: {0}")]
    Storage(String),

    #[error("Error de serialización: {0}")]
    Serialization(String),

    #[error("Fila sin identificador")]
    MissingRowId,
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

impl SyncError {
    /// Errores de escritura que el siguiente ciclo puede reintentar
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::RemoteWrite(_) | SyncError::Unauthenticated | SyncError::QuotaExceeded(_)
        )
    }
}
