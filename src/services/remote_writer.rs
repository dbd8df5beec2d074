// ============================================================================
// REMOTE WRITER - Escritura de filas de sección en el almacén remoto
// ============================================================================

use std::rc::Rc;

use crate::error::SyncError;
use crate::models::paths::row_document_path;
use crate::models::{Document, SectionKind};
use crate::services::remote_store::{DocumentWrite, RemoteStore};
use crate::state::AuthProvider;

#[derive(Clone)]
pub struct RemoteWriter {
    store: Rc<dyn RemoteStore>,
    auth: Rc<dyn AuthProvider>,
}

impl RemoteWriter {
    pub fn new(store: Rc<dyn RemoteStore>, auth: Rc<dyn AuthProvider>) -> Self {
        Self { store, auth }
    }

    fn user_id(&self) -> Result<String, SyncError> {
        self.auth.current_user_id().ok_or(SyncError::Unauthenticated)
    }

    /// Upsert atómico de todas las filas (merge por id).
    /// Idempotente: repetir el mismo lote deja el mismo estado.
    pub async fn flush(
        &self,
        trip_id: &str,
        kind: SectionKind,
        rows: &[Document],
    ) -> Result<(), SyncError> {
        let user_id = self.user_id()?;

        let writes = rows
            .iter()
            .map(|row| {
                let row_id = row
                    .get("id")
                    .and_then(|id| id.as_str())
                    .filter(|id| !id.is_empty())
                    .ok_or(SyncError::MissingRowId)?;
                Ok(DocumentWrite {
                    path: row_document_path(&user_id, trip_id, kind, row_id),
                    fields: row.clone(),
                })
            })
            .collect::<Result<Vec<_>, SyncError>>()?;

        if writes.is_empty() {
            return Ok(());
        }

        let count = writes.len();
        self.store.commit_upserts(writes).await?;
        log::info!("✅ {} filas de {} escritas para el viaje {}", count, kind, trip_id);
        Ok(())
    }

    /// Borra exactamente una fila
    pub async fn remove(&self, trip_id: &str, kind: SectionKind, row_id: &str) -> Result<(), SyncError> {
        let user_id = self.user_id()?;
        let path = row_document_path(&user_id, trip_id, kind, row_id);
        self.store.delete_document(&path).await?;
        log::info!("🗑️ Fila {} eliminada de {} ({})", row_id, kind, trip_id);
        Ok(())
    }
}
