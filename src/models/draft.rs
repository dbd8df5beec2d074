use serde::{Deserialize, Serialize};

use crate::models::Document;

/// Copia local de todas las filas de una sección para un viaje.
/// Su presencia significa que el estado local puede ir por delante del remoto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftEntry {
    pub rows: Vec<Document>,
    /// Identifica esta escritura concreta (uuid v4); permite borrar el
    /// borrador solo si nadie lo ha reescrito durante el flush.
    pub stamp: String,
    /// Epoch en milisegundos
    pub saved_at: i64,
}

impl DraftEntry {
    pub fn new(rows: Vec<Document>) -> Self {
        Self {
            rows,
            stamp: uuid::Uuid::new_v4().to_string(),
            saved_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Conjunto ordenado de viajes con algún borrador pendiente
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnsavedTripsIndex {
    trip_ids: Vec<String>,
}

impl UnsavedTripsIndex {
    pub fn trip_ids(&self) -> &[String] {
        &self.trip_ids
    }

    pub fn contains(&self, trip_id: &str) -> bool {
        self.trip_ids.iter().any(|id| id == trip_id)
    }

    /// Devuelve true si el viaje no estaba
    pub fn insert(&mut self, trip_id: &str) -> bool {
        if self.contains(trip_id) {
            return false;
        }
        self.trip_ids.push(trip_id.to_string());
        true
    }

    /// Devuelve true si el viaje estaba
    pub fn remove(&mut self, trip_id: &str) -> bool {
        let before = self.trip_ids.len();
        self.trip_ids.retain(|id| id != trip_id);
        before != self.trip_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trip_ids.is_empty()
    }
}
