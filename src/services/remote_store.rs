// ============================================================================
// ALMACÉN REMOTO DE DOCUMENTOS
// ============================================================================
// Rutas jerárquicas (`users/{uid}/trips/{tripId}/{sección}/{rowId}`),
// consulta en vivo, lectura de un documento, upsert por lotes con merge
// y borrado de un documento.
// ============================================================================

use std::rc::Rc;

use async_trait::async_trait;

use crate::error::SyncError;
use crate::models::Document;

/// Upsert con merge de un documento dentro de un lote
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentWrite {
    pub path: String,
    pub fields: Document,
}

/// Recibe la lista completa de la colección (no un diff) o el error de entrega
pub type SnapshotListener = Rc<dyn Fn(Result<Vec<Document>, SyncError>)>;

#[async_trait(?Send)]
pub trait RemoteStore {
    /// Todos los documentos de una colección
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, SyncError>;

    async fn get_document(&self, path: &str) -> Result<Option<Document>, SyncError>;

    /// Reemplaza el documento completo
    async fn set_document(&self, path: &str, fields: Document) -> Result<(), SyncError>;

    /// Lote atómico de upserts con merge: o se aplican todos o ninguno
    async fn commit_upserts(&self, writes: Vec<DocumentWrite>) -> Result<(), SyncError>;

    /// Borrar un documento inexistente no es un error
    async fn delete_document(&self, path: &str) -> Result<(), SyncError>;

    /// Instantánea inicial + una notificación por cada cambio.
    /// Soltar la `Subscription` cancela el listener.
    fn subscribe(&self, collection: &str, listener: SnapshotListener) -> Subscription;
}

/// Listener activo; se cancela al soltarse
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Sin listener remoto (p. ej. sin usuario)
    pub fn inert() -> Self {
        Self { cancel: None }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
