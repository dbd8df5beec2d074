// ============================================================================
// SYNC STATE - Estado de flush por (viaje, sección)
// ============================================================================
// Clean -> Dirty -> Flushing -> Clean | Dirty
// Compartido entre las secciones montadas y el barrido global.
// ============================================================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use futures::channel::oneshot;

use crate::models::SectionKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushState {
    /// Sin borrador
    Clean,
    /// Borrador presente, sin intentar o fallido
    Dirty,
    /// Escritura remota en curso
    Flushing,
}

type PairKey = (String, SectionKind);

#[derive(Clone, Default)]
pub struct FlushTracker {
    states: Rc<RefCell<HashMap<PairKey, FlushState>>>,
    /// Esperando a que termine el flush en curso del par
    idle_waiters: Rc<RefCell<HashMap<PairKey, Vec<oneshot::Sender<()>>>>>,
}

impl FlushTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, trip_id: &str, kind: SectionKind) -> FlushState {
        self.states
            .borrow()
            .get(&(trip_id.to_string(), kind))
            .copied()
            .unwrap_or(FlushState::Clean)
    }

    fn set(&self, trip_id: &str, kind: SectionKind, state: FlushState) {
        let key = (trip_id.to_string(), kind);
        let previous = {
            let mut states = self.states.borrow_mut();
            if state == FlushState::Clean {
                states.remove(&key)
            } else {
                states.insert(key.clone(), state)
            }
        };

        if previous == Some(FlushState::Flushing) && state != FlushState::Flushing {
            let waiters = self.idle_waiters.borrow_mut().remove(&key).unwrap_or_default();
            for waiter in waiters {
                let _ = waiter.send(());
            }
        }
    }

    /// Se resuelve cuando el par no tiene un flush en curso
    pub fn wait_idle(&self, trip_id: &str, kind: SectionKind) -> impl Future<Output = ()> {
        let receiver = if self.state(trip_id, kind) == FlushState::Flushing {
            let (sender, receiver) = oneshot::channel();
            self.idle_waiters
                .borrow_mut()
                .entry((trip_id.to_string(), kind))
                .or_default()
                .push(sender);
            Some(receiver)
        } else {
            None
        };

        async move {
            if let Some(receiver) = receiver {
                // Canceled = el tracker desapareció; tampoco hay flush
                let _ = receiver.await;
            }
        }
    }

    /// Tras escribir un borrador. Un flush en curso conserva su estado;
    /// al terminar comprobará el sello del borrador.
    pub fn mark_dirty(&self, trip_id: &str, kind: SectionKind) {
        if self.state(trip_id, kind) != FlushState::Flushing {
            self.set(trip_id, kind, FlushState::Dirty);
        }
    }

    pub fn mark_clean(&self, trip_id: &str, kind: SectionKind) {
        if self.state(trip_id, kind) != FlushState::Flushing {
            self.set(trip_id, kind, FlushState::Clean);
        }
    }

    /// Pasa a Flushing. None si ya hay un flush en curso para el par.
    pub fn begin(&self, trip_id: &str, kind: SectionKind) -> Option<FlushGuard> {
        if self.state(trip_id, kind) == FlushState::Flushing {
            return None;
        }
        self.set(trip_id, kind, FlushState::Flushing);
        Some(FlushGuard {
            tracker: self.clone(),
            trip_id: trip_id.to_string(),
            kind,
            finished: false,
        })
    }

    /// Pares con borrador o flush en curso
    pub fn pending_count(&self) -> usize {
        self.states.borrow().len()
    }
}

/// Flush en curso. Si se suelta sin `succeed`, el par vuelve a Dirty.
pub struct FlushGuard {
    tracker: FlushTracker,
    trip_id: String,
    kind: SectionKind,
    finished: bool,
}

impl FlushGuard {
    pub fn succeed(mut self) {
        self.finished = true;
        self.tracker.set(&self.trip_id, self.kind, FlushState::Clean);
    }

    /// Escritura correcta pero el borrador cambió mientras tanto
    pub fn superseded(mut self) {
        self.finished = true;
        self.tracker.set(&self.trip_id, self.kind, FlushState::Dirty);
    }
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.tracker.set(&self.trip_id, self.kind, FlushState::Dirty);
        }
    }
}
