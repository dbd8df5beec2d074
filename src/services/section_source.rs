// ============================================================================
// FUENTE DE DATOS DE SECCIÓN
// ============================================================================
// Consulta en vivo de `users/{uid}/trips/{tripId}/{sección}`.
// Emite primero `loading`, luego la lista completa en cada cambio remoto.
// ============================================================================

use std::rc::Rc;

use crate::models::paths::section_collection_path;
use crate::models::{Document, SectionKind};
use crate::services::remote_store::{RemoteStore, Subscription};
use crate::state::AuthProvider;

/// Lo que ve la sección en cada entrega
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SectionSnapshot {
    pub rows: Vec<Document>,
    pub loading: bool,
    pub error: Option<String>,
}

impl SectionSnapshot {
    fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    fn failed(error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Soltarla cancela el listener remoto
pub type SectionSubscription = Subscription;

#[derive(Clone)]
pub struct SectionSource {
    store: Rc<dyn RemoteStore>,
    auth: Rc<dyn AuthProvider>,
    kind: SectionKind,
}

impl SectionSource {
    pub fn new(store: Rc<dyn RemoteStore>, auth: Rc<dyn AuthProvider>, kind: SectionKind) -> Self {
        Self { store, auth, kind }
    }

    pub fn kind(&self) -> SectionKind {
        self.kind
    }

    /// Los errores remotos se entregan como `error`; no se reintenta
    pub fn subscribe<F>(&self, trip_id: &str, listener: F) -> SectionSubscription
    where
        F: Fn(SectionSnapshot) + 'static,
    {
        let user_id = match self.auth.current_user_id() {
            Some(uid) => uid,
            None => {
                log::warn!("⚠️ Sin usuario: {} de {} no se carga", self.kind, trip_id);
                listener(SectionSnapshot::failed("Usuario no autenticado".to_string()));
                return Subscription::inert();
            }
        };

        listener(SectionSnapshot::loading());

        let collection = section_collection_path(&user_id, trip_id, self.kind);
        let kind = self.kind;
        log::info!("📥 Escuchando {}", collection);

        self.store.subscribe(
            &collection,
            Rc::new(move |result| match result {
                Ok(rows) => listener(SectionSnapshot {
                    rows,
                    loading: false,
                    error: None,
                }),
                Err(e) => {
                    log::error!("❌ Error en la consulta de {}: {}", kind, e);
                    listener(SectionSnapshot::failed(e.to_string()));
                }
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_store::MemoryRemoteStore;
    use crate::state::AuthState;
    use serde_json::json;
    use std::cell::RefCell;

    fn recorder() -> (Rc<RefCell<Vec<SectionSnapshot>>>, impl Fn(SectionSnapshot) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |snapshot| sink.borrow_mut().push(snapshot))
    }

    #[test]
    fn test_loading_then_full_lists() {
        let store = MemoryRemoteStore::new();
        let source = SectionSource::new(
            Rc::new(store.clone()),
            Rc::new(AuthState::signed_in("u1")),
            SectionKind::Food,
        );
        let (seen, listener) = recorder();
        let _sub = source.subscribe("T1", listener);

        store.insert_document(
            "users/u1/trips/T1/food/f1",
            json!({"id": "f1"}).as_object().cloned().unwrap(),
        );

        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].loading);
        assert!(seen[1].rows.is_empty() && !seen[1].loading);
        assert_eq!(seen[2].rows.len(), 1);
    }

    #[test]
    fn test_unauthenticated_reports_error_without_listener() {
        let store = MemoryRemoteStore::new();
        let source = SectionSource::new(
            Rc::new(store.clone()),
            Rc::new(AuthState::new()),
            SectionKind::Transport,
        );
        let (seen, listener) = recorder();
        let sub = source.subscribe("T1", listener);

        assert!(!sub.is_active());
        assert_eq!(store.listener_count(), 0);
        assert_eq!(seen.borrow().len(), 1);
        assert!(seen.borrow()[0].error.is_some());
    }

    #[test]
    fn test_remote_error_is_surfaced() {
        let store = MemoryRemoteStore::new();
        store.fail_reads(true);
        let source = SectionSource::new(
            Rc::new(store.clone()),
            Rc::new(AuthState::signed_in("u1")),
            SectionKind::Activities,
        );
        let (seen, listener) = recorder();
        let sub = source.subscribe("T1", listener);

        let last = seen.borrow().last().cloned().unwrap();
        assert!(last.error.unwrap().contains("lectura denegada"));

        drop(sub);
        assert_eq!(store.listener_count(), 0);
    }
}
