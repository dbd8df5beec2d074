// ============================================================================
// TRIP SERVICE - Documento del viaje
// ============================================================================
// El viaje se guarda completo (sin merge); las filas de sección viven en
// subcolecciones y no pasan por aquí.
// ============================================================================

use std::rc::Rc;

use crate::error::SyncError;
use crate::models::paths::trip_document_path;
use crate::models::{Document, Trip};
use crate::services::remote_store::RemoteStore;
use crate::state::AuthProvider;

#[derive(Clone)]
pub struct TripService {
    store: Rc<dyn RemoteStore>,
    auth: Rc<dyn AuthProvider>,
}

impl TripService {
    pub fn new(store: Rc<dyn RemoteStore>, auth: Rc<dyn AuthProvider>) -> Self {
        Self { store, auth }
    }

    fn trip_path(&self, trip_id: &str) -> Result<String, SyncError> {
        let user_id = self.auth.current_user_id().ok_or(SyncError::Unauthenticated)?;
        Ok(trip_document_path(&user_id, trip_id))
    }

    pub async fn fetch_trip(&self, trip_id: &str) -> Result<Option<Trip>, SyncError> {
        let path = self.trip_path(trip_id)?;
        let mut doc = match self.store.get_document(&path).await? {
            Some(doc) => doc,
            None => {
                log::warn!("⚠️ Viaje {} no encontrado", trip_id);
                return Ok(None);
            }
        };
        // El id es el del documento, no un campo
        doc.insert("id".to_string(), serde_json::Value::String(trip_id.to_string()));
        let trip: Trip = serde_json::from_value(serde_json::Value::Object(doc))?;
        log::info!("📥 Viaje {} cargado: {}", trip_id, trip.name);
        Ok(Some(trip))
    }

    pub async fn save_trip(&self, trip: &Trip) -> Result<(), SyncError> {
        let path = self.trip_path(&trip.id)?;
        let fields: Document = match serde_json::to_value(trip)? {
            serde_json::Value::Object(map) => map,
            _ => return Err(SyncError::Serialization("el viaje no es un objeto".to_string())),
        };
        self.store.set_document(&path, fields).await?;
        log::info!("💾 Viaje {} guardado", trip.id);
        Ok(())
    }

    /// Tamaño del grupo, usado por los campos derivados de las secciones
    pub async fn number_of_people(&self, trip_id: &str) -> Result<u32, SyncError> {
        Ok(self
            .fetch_trip(trip_id)
            .await?
            .map(|trip| trip.number_of_people)
            .unwrap_or(1))
    }
}
