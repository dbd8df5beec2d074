// ============================================================================
// TAREAS PERIÓDICAS
// ============================================================================
// Envoltorio sobre gloo_timers::Interval. El intervalo vive mientras vive la
// tarea: al soltarla (drop) se cancela, incluso en caminos de error.
// ============================================================================

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

use gloo_timers::callback::Interval;
use wasm_bindgen_futures::spawn_local;

/// Un tick a la vez: mientras vive el `TickPass`, los siguientes se saltan
#[derive(Clone, Default)]
pub struct TickGate {
    busy: Rc<Cell<bool>>,
}

impl TickGate {
    pub fn try_enter(&self) -> Option<TickPass> {
        if self.busy.get() {
            return None;
        }
        self.busy.set(true);
        Some(TickPass {
            busy: self.busy.clone(),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }
}

pub struct TickPass {
    busy: Rc<Cell<bool>>,
}

impl Drop for TickPass {
    fn drop(&mut self) {
        self.busy.set(false);
    }
}

pub struct PeriodicTask {
    label: &'static str,
    interval: Option<Interval>,
}

impl PeriodicTask {
    /// Ejecuta `job` cada `period_ms`. Si el trabajo anterior sigue en curso
    /// el tick se salta; así dos flush del mismo ámbito nunca se solapan.
    pub fn start<F, Fut>(label: &'static str, period_ms: u32, job: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let gate = TickGate::default();

        let interval = Interval::new(period_ms, move || {
            let Some(pass) = gate.try_enter() else {
                log::info!("⏳ [{}] Tick anterior aún en curso, saltando...", label);
                return;
            };
            let pending = job();
            spawn_local(async move {
                pending.await;
                drop(pass);
            });
        });

        log::info!("⏰ [{}] Tarea periódica cada {} segundos", label, period_ms / 1000);

        Self {
            label,
            interval: Some(interval),
        }
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(interval) = self.interval.take() {
            // Interval cancela el setInterval al soltarse
            drop(interval);
            log::info!("🛑 [{}] Tarea periódica cancelada", self.label);
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
