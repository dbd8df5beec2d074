// ============================================================================
// SERVICIO DE SINCRONIZACIÓN DE BORRADORES
// ============================================================================
// Camino común de flush para las secciones montadas y el barrido global:
//   1. leer el borrador de (viaje, sección)
//   2. upsert por lotes en el almacén remoto
//   3. si fue bien, borrar el borrador (solo si nadie lo reescribió)
// Los fallos dejan el borrador intacto para el siguiente ciclo.
// ============================================================================

use crate::error::SyncError;
use crate::models::{Document, SectionKind};
use crate::services::draft_store::DraftStore;
use crate::services::remote_writer::RemoteWriter;
use crate::state::FlushTracker;

/// Resultado de un intento de flush
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// No había borrador
    Clean,
    /// Escrito y borrador eliminado
    Saved { rows: usize },
    /// Escrito, pero el borrador cambió durante la escritura y se conserva
    Superseded,
    /// Ya había un flush en curso para el par
    Skipped,
    /// El borrador sigue ahí para el siguiente ciclo
    Failed(SyncError),
}

impl FlushOutcome {
    /// Sin nada pendiente para el par tras este intento
    pub fn is_settled(&self) -> bool {
        matches!(self, FlushOutcome::Clean | FlushOutcome::Saved { .. })
    }
}

/// Servicio de sincronización de borradores
#[derive(Clone)]
pub struct DraftSyncService {
    drafts: DraftStore,
    writer: RemoteWriter,
    tracker: FlushTracker,
}

impl DraftSyncService {
    pub fn new(drafts: DraftStore, writer: RemoteWriter, tracker: FlushTracker) -> Self {
        Self {
            drafts,
            writer,
            tracker,
        }
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.drafts
    }

    pub fn writer(&self) -> &RemoteWriter {
        &self.writer
    }

    pub fn tracker(&self) -> &FlushTracker {
        &self.tracker
    }

    /// Guarda el borrador y marca el par como Dirty
    pub fn stage(&self, trip_id: &str, kind: SectionKind, rows: Vec<Document>) -> Result<(), SyncError> {
        self.drafts.write(trip_id, kind, rows)?;
        self.tracker.mark_dirty(trip_id, kind);
        Ok(())
    }

    /// Intenta volcar el borrador de (viaje, sección). Nunca devuelve error:
    /// los fallos se registran y quedan en el resultado.
    pub async fn flush_section(&self, trip_id: &str, kind: SectionKind) -> FlushOutcome {
        let entry = match self.drafts.read(trip_id, kind) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                self.tracker.mark_clean(trip_id, kind);
                return FlushOutcome::Clean;
            }
            Err(e) => {
                log::error!("❌ Error leyendo borrador {} / {}: {}", trip_id, kind, e);
                return FlushOutcome::Failed(e);
            }
        };

        let guard = match self.tracker.begin(trip_id, kind) {
            Some(guard) => guard,
            None => {
                log::info!("🔄 Flush de {} / {} ya en curso, saltando...", trip_id, kind);
                return FlushOutcome::Skipped;
            }
        };

        log::info!("🔄 Volcando {} filas de {} / {}", entry.len(), trip_id, kind);

        if let Err(e) = self.writer.flush(trip_id, kind, &entry.rows).await {
            if e.is_retryable() {
                log::warn!("⚠️ Flush de {} / {} fallido, se reintentará: {}", trip_id, kind, e);
            } else {
                log::error!("❌ Flush de {} / {} fallido: {}", trip_id, kind, e);
            }
            // guard -> Dirty al soltarse
            return FlushOutcome::Failed(e);
        }

        match self.drafts.clear_if_unchanged(trip_id, kind, &entry.stamp) {
            Ok(true) => {
                guard.succeed();
                FlushOutcome::Saved { rows: entry.len() }
            }
            Ok(false) => {
                guard.superseded();
                FlushOutcome::Superseded
            }
            Err(e) => {
                log::error!("❌ Error limpiando borrador {} / {}: {}", trip_id, kind, e);
                FlushOutcome::Failed(e)
            }
        }
    }

    /// Escritura directa de filas que no llegaron a localStorage
    pub async fn flush_rows(&self, trip_id: &str, kind: SectionKind, rows: &[Document]) -> FlushOutcome {
        let guard = match self.tracker.begin(trip_id, kind) {
            Some(guard) => guard,
            None => return FlushOutcome::Skipped,
        };
        match self.writer.flush(trip_id, kind, rows).await {
            Ok(()) => {
                guard.succeed();
                FlushOutcome::Saved { rows: rows.len() }
            }
            Err(e) => {
                log::warn!("⚠️ Flush en memoria de {} / {} fallido: {}", trip_id, kind, e);
                FlushOutcome::Failed(e)
            }
        }
    }
}
