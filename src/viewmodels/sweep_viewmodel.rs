// ============================================================================
// SWEEP VIEWMODEL - Barrido global de borradores
// ============================================================================
// Recorre el índice de viajes sin guardar y vuelca sus cinco secciones.
// Un viaje sale del índice solo si todas sus secciones quedan limpias.
// El índice es por viaje, no por sección: qué sección falló se ve en el log.
// ============================================================================

use std::rc::Rc;

use crate::error::SyncError;
use crate::models::SectionKind;
use crate::services::{DraftSyncService, FlushOutcome};
use crate::utils::timers::PeriodicTask;

/// Resultado de una pasada
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    /// Viajes que salieron del índice
    pub saved: Vec<String>,
    /// Viajes que siguen pendientes
    pub pending: Vec<String>,
    pub errors: Vec<(String, SectionKind, SyncError)>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.pending.is_empty() && self.errors.is_empty()
    }
}

#[derive(Clone)]
pub struct GlobalSweep {
    service: DraftSyncService,
}

impl GlobalSweep {
    pub fn new(service: DraftSyncService) -> Self {
        Self { service }
    }

    pub async fn sweep_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        let trips = match self.service.drafts().unsaved_trips() {
            Ok(trips) => trips,
            Err(e) => {
                log::error!("❌ No se pudo leer el índice de viajes: {}", e);
                return report;
            }
        };
        if trips.is_empty() {
            return report;
        }

        log::info!("🔄 Barrido de {} viajes con borradores", trips.len());

        for trip_id in trips {
            let mut all_settled = true;
            for kind in SectionKind::ALL {
                match self.service.flush_section(&trip_id, kind).await {
                    FlushOutcome::Failed(e) => {
                        all_settled = false;
                        report.errors.push((trip_id.clone(), kind, e));
                    }
                    outcome => all_settled &= outcome.is_settled(),
                }
            }

            if all_settled && !self.service.drafts().has_any_draft(&trip_id) {
                match self.service.drafts().mark_saved(&trip_id) {
                    Ok(()) => report.saved.push(trip_id),
                    Err(e) => {
                        log::error!("❌ No se pudo actualizar el índice para {}: {}", trip_id, e);
                        report.pending.push(trip_id);
                    }
                }
            } else {
                report.pending.push(trip_id);
            }
        }

        if report.is_clean() {
            log::info!("✅ Barrido completo: {} viajes guardados", report.saved.len());
        } else {
            log::warn!(
                "⚠️ Barrido: {} guardados, {} pendientes, {} errores",
                report.saved.len(),
                report.pending.len(),
                report.errors.len()
            );
        }
        report
    }

    /// Barrido cada `period_ms`. Los errores no salen del temporizador:
    /// se registran y se pasan a `on_report` si se da.
    pub fn start(&self, period_ms: u32, on_report: Option<Rc<dyn Fn(SweepReport)>>) -> PeriodicTask {
        let sweep = self.clone();
        PeriodicTask::start("sweep", period_ms, move || {
            let sweep = sweep.clone();
            let on_report = on_report.clone();
            async move {
                let report = sweep.sweep_once().await;
                if let Some(callback) = on_report {
                    callback(report);
                }
            }
        })
    }
}
