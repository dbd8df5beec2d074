// ============================================================================
// DRAFT STORE - Borradores locales por (viaje, sección)
// ============================================================================
// Clave: `unsaved-<sección>-<tripId>`. Siempre se escribe la lista completa.
// Índice `unsaved-trips`: viajes con algún borrador pendiente; se escribe
// antes que el borrador, de modo que nunca hay borrador sin entrada.
// ============================================================================

use std::rc::Rc;

use crate::error::SyncError;
use crate::models::{Document, DraftEntry, SectionKind, UnsavedTripsIndex};
use crate::utils::constants::{CORRUPT_KEY_PREFIX, DRAFT_KEY_PREFIX, UNSAVED_TRIPS_KEY};
use crate::utils::storage::ScratchSpace;

pub fn draft_key(trip_id: &str, kind: SectionKind) -> String {
    format!("{}-{}-{}", DRAFT_KEY_PREFIX, kind.as_str(), trip_id)
}

#[derive(Clone)]
pub struct DraftStore {
    scratch: Rc<dyn ScratchSpace>,
}

impl DraftStore {
    pub fn new(scratch: Rc<dyn ScratchSpace>) -> Self {
        Self { scratch }
    }

    /// Guarda la instantánea completa de la sección
    pub fn write(
        &self,
        trip_id: &str,
        kind: SectionKind,
        rows: Vec<Document>,
    ) -> Result<DraftEntry, SyncError> {
        self.mark_unsaved(trip_id)?;

        let entry = DraftEntry::new(rows);
        let json = serde_json::to_string(&entry)?;
        self.scratch.set(&draft_key(trip_id, kind), &json)?;

        log::info!(
            "💾 Borrador guardado: {} / {} ({} filas)",
            trip_id,
            kind,
            entry.len()
        );
        Ok(entry)
    }

    /// Último borrador escrito. Un contenido ilegible se aparta a
    /// `corrupt-<clave>` y se trata como ausente.
    pub fn read(&self, trip_id: &str, kind: SectionKind) -> Result<Option<DraftEntry>, SyncError> {
        let key = draft_key(trip_id, kind);
        let raw = match self.scratch.get(&key)? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        match serde_json::from_str::<DraftEntry>(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                log::error!("❌ Borrador ilegible en {}: {}. Se aparta para revisión", key, e);
                self.quarantine(&key, &raw)?;
                Ok(None)
            }
        }
    }

    fn quarantine(&self, key: &str, raw: &str) -> Result<(), SyncError> {
        let corrupt_key = format!("{}-{}", CORRUPT_KEY_PREFIX, key);
        if let Err(e) = self.scratch.set(&corrupt_key, raw) {
            // Sin espacio para la copia: se descarta igualmente para no
            // bloquear el flush de la sección
            log::warn!("⚠️ No se pudo apartar {}: {}", key, e);
        }
        self.scratch.remove(key)
    }

    pub fn has_draft(&self, trip_id: &str, kind: SectionKind) -> bool {
        matches!(self.scratch.get(&draft_key(trip_id, kind)), Ok(Some(_)))
    }

    pub fn has_any_draft(&self, trip_id: &str) -> bool {
        SectionKind::ALL
            .into_iter()
            .any(|kind| self.has_draft(trip_id, kind))
    }

    pub fn clear(&self, trip_id: &str, kind: SectionKind) -> Result<(), SyncError> {
        self.scratch.remove(&draft_key(trip_id, kind))?;
        log::info!("🗑️ Borrador eliminado: {} / {}", trip_id, kind);
        Ok(())
    }

    /// Borra el borrador solo si sigue siendo el de `stamp`.
    /// false = alguien lo reescribió mientras tanto y se conserva.
    pub fn clear_if_unchanged(
        &self,
        trip_id: &str,
        kind: SectionKind,
        stamp: &str,
    ) -> Result<bool, SyncError> {
        match self.read(trip_id, kind)? {
            Some(entry) if entry.stamp != stamp => {
                log::info!(
                    "📝 Borrador {} / {} modificado durante el flush, se conserva",
                    trip_id,
                    kind
                );
                Ok(false)
            }
            Some(_) => {
                self.clear(trip_id, kind)?;
                Ok(true)
            }
            None => Ok(true),
        }
    }

    // ==========================================
    // ÍNDICE DE VIAJES SIN GUARDAR
    // ==========================================

    pub fn unsaved_index(&self) -> Result<UnsavedTripsIndex, SyncError> {
        match self.scratch.get(UNSAVED_TRIPS_KEY)? {
            Some(raw) => match serde_json::from_str::<UnsavedTripsIndex>(&raw) {
                Ok(index) => Ok(index),
                Err(e) => {
                    // El índice se puede reconstruir: no se pierde nada
                    log::error!("❌ Índice de viajes ilegible, se reinicia: {}", e);
                    Ok(UnsavedTripsIndex::default())
                }
            },
            None => Ok(UnsavedTripsIndex::default()),
        }
    }

    pub fn unsaved_trips(&self) -> Result<Vec<String>, SyncError> {
        Ok(self.unsaved_index()?.trip_ids().to_vec())
    }

    fn save_index(&self, index: &UnsavedTripsIndex) -> Result<(), SyncError> {
        if index.is_empty() {
            return self.scratch.remove(UNSAVED_TRIPS_KEY);
        }
        let json = serde_json::to_string(index)?;
        self.scratch.set(UNSAVED_TRIPS_KEY, &json)
    }

    pub fn mark_unsaved(&self, trip_id: &str) -> Result<(), SyncError> {
        let mut index = self.unsaved_index()?;
        if index.insert(trip_id) {
            self.save_index(&index)?;
        }
        Ok(())
    }

    pub fn mark_saved(&self, trip_id: &str) -> Result<(), SyncError> {
        let mut index = self.unsaved_index()?;
        if index.remove(trip_id) {
            self.save_index(&index)?;
            log::info!("✅ Viaje {} sin borradores pendientes", trip_id);
        }
        Ok(())
    }
}
