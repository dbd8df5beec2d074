// ============================================================================
// ALMACÉN REMOTO EN MEMORIA
// ============================================================================
// Misma semántica que Firestore para este subsistema (merge por campos de
// primer nivel, lotes atómicos, notificación con la colección completa).
// Sirve para el modo demo sin backend y para los tests: permite inyectar
// fallos y consultar el diario de llamadas.
// ============================================================================

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use async_trait::async_trait;
use futures::channel::oneshot;

use crate::error::SyncError;
use crate::models::paths::parent_collection;
use crate::models::Document;
use crate::services::remote_store::{DocumentWrite, RemoteStore, SnapshotListener, Subscription};

/// Llamada registrada en el diario
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    List(String),
    Get(String),
    Set(String),
    Commit(Vec<String>),
    Delete(String),
}

struct Listener {
    id: u64,
    collection: String,
    callback: SnapshotListener,
}

#[derive(Default)]
struct Inner {
    documents: BTreeMap<String, Document>,
    listeners: Vec<Listener>,
    next_listener_id: u64,
    failing_prefixes: Vec<String>,
    failing_reads: bool,
    holding_commits: bool,
    held_commits: Vec<oneshot::Sender<()>>,
    journal: Vec<StoreCall>,
}

impl Inner {
    fn collection(&self, collection: &str) -> Vec<Document> {
        self.documents
            .iter()
            .filter(|(path, _)| parent_collection(path) == collection)
            .map(|(_, doc)| doc.clone())
            .collect()
    }

    fn write_denied(&self, path: &str) -> bool {
        self.failing_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

#[derive(Clone, Default)]
pub struct MemoryRemoteStore {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sembrar un documento (notifica a los listeners)
    pub fn insert_document(&self, path: &str, fields: Document) {
        self.inner.borrow_mut().documents.insert(path.to_string(), fields);
        self.notify(&[parent_collection(path).to_string()]);
    }

    pub fn document(&self, path: &str) -> Option<Document> {
        self.inner.borrow().documents.get(path).cloned()
    }

    /// Documentos de una colección, ordenados por ruta
    pub fn documents_in(&self, collection: &str) -> Vec<Document> {
        self.inner.borrow().collection(collection)
    }

    /// Las escrituras y borrados bajo `prefix` fallarán hasta `heal()`
    pub fn fail_writes_under(&self, prefix: &str) {
        self.inner.borrow_mut().failing_prefixes.push(prefix.to_string());
    }

    pub fn fail_reads(&self, failing: bool) {
        self.inner.borrow_mut().failing_reads = failing;
    }

    /// Los lotes quedan en espera (sin aplicarse) hasta `release_commits()`
    pub fn hold_commits(&self) {
        self.inner.borrow_mut().holding_commits = true;
    }

    pub fn release_commits(&self) {
        let held = {
            let mut inner = self.inner.borrow_mut();
            inner.holding_commits = false;
            std::mem::take(&mut inner.held_commits)
        };
        for commit in held {
            let _ = commit.send(());
        }
    }

    pub fn heal(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.failing_prefixes.clear();
        inner.failing_reads = false;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.borrow().journal.clone()
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Delete(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn commit_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, StoreCall::Commit(_)))
            .count()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    fn record(&self, call: StoreCall) {
        self.inner.borrow_mut().journal.push(call);
    }

    /// Entrega la colección completa a sus listeners. Los callbacks se
    /// ejecutan sin ningún préstamo activo sobre `inner`.
    fn notify(&self, collections: &[String]) {
        let deliveries: Vec<(SnapshotListener, Vec<Document>)> = {
            let inner = self.inner.borrow();
            inner
                .listeners
                .iter()
                .filter(|listener| collections.contains(&listener.collection))
                .map(|listener| (listener.callback.clone(), inner.collection(&listener.collection)))
                .collect()
        };
        for (callback, docs) in deliveries {
            callback(Ok(docs));
        }
    }
}

#[async_trait(?Send)]
impl RemoteStore for MemoryRemoteStore {
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, SyncError> {
        self.record(StoreCall::List(collection.to_string()));
        let inner = self.inner.borrow();
        if inner.failing_reads {
            return Err(SyncError::RemoteRead(format!("lectura denegada: {}", collection)));
        }
        Ok(inner.collection(collection))
    }

    async fn get_document(&self, path: &str) -> Result<Option<Document>, SyncError> {
        self.record(StoreCall::Get(path.to_string()));
        let inner = self.inner.borrow();
        if inner.failing_reads {
            return Err(SyncError::RemoteRead(format!("lectura denegada: {}", path)));
        }
        Ok(inner.documents.get(path).cloned())
    }

    async fn set_document(&self, path: &str, fields: Document) -> Result<(), SyncError> {
        self.record(StoreCall::Set(path.to_string()));
        {
            let mut inner = self.inner.borrow_mut();
            if inner.write_denied(path) {
                return Err(SyncError::RemoteWrite(format!("permiso denegado: {}", path)));
            }
            inner.documents.insert(path.to_string(), fields);
        }
        self.notify(&[parent_collection(path).to_string()]);
        Ok(())
    }

    async fn commit_upserts(&self, writes: Vec<DocumentWrite>) -> Result<(), SyncError> {
        self.record(StoreCall::Commit(writes.iter().map(|w| w.path.clone()).collect()));

        let gate = {
            let mut inner = self.inner.borrow_mut();
            if inner.holding_commits {
                let (sender, receiver) = oneshot::channel();
                inner.held_commits.push(sender);
                Some(receiver)
            } else {
                None
            }
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let mut touched: Vec<String> = Vec::new();
        {
            let mut inner = self.inner.borrow_mut();
            if let Some(denied) = writes.iter().find(|w| inner.write_denied(&w.path)) {
                return Err(SyncError::RemoteWrite(format!("permiso denegado: {}", denied.path)));
            }
            for write in writes {
                let collection = parent_collection(&write.path).to_string();
                if !touched.contains(&collection) {
                    touched.push(collection);
                }
                let doc = inner.documents.entry(write.path).or_default();
                for (field, value) in write.fields {
                    doc.insert(field, value);
                }
            }
        }
        self.notify(&touched);
        Ok(())
    }

    async fn delete_document(&self, path: &str) -> Result<(), SyncError> {
        self.record(StoreCall::Delete(path.to_string()));
        let removed = {
            let mut inner = self.inner.borrow_mut();
            if inner.write_denied(path) {
                return Err(SyncError::RemoteWrite(format!("permiso denegado: {}", path)));
            }
            inner.documents.remove(path).is_some()
        };
        if removed {
            self.notify(&[parent_collection(path).to_string()]);
        }
        Ok(())
    }

    fn subscribe(&self, collection: &str, listener: SnapshotListener) -> Subscription {
        let (id, initial) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_listener_id;
            inner.next_listener_id += 1;
            inner.listeners.push(Listener {
                id,
                collection: collection.to_string(),
                callback: listener.clone(),
            });
            let initial = if inner.failing_reads {
                Err(SyncError::RemoteRead(format!("lectura denegada: {}", collection)))
            } else {
                Ok(inner.collection(collection))
            };
            (id, initial)
        };

        listener(initial);

        let weak: Weak<RefCell<Inner>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().listeners.retain(|l| l.id != id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;
    use std::cell::Cell;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    const FOOD: &str = "users/u1/trips/T1/food";

    #[test]
    fn test_commit_merges_fields() {
        let store = MemoryRemoteStore::new();
        let path = format!("{}/f1", FOOD);
        store.insert_document(&path, doc(json!({"id": "f1", "name": "Ramen", "notes": "picante"})));

        block_on(store.commit_upserts(vec![DocumentWrite {
            path: path.clone(),
            fields: doc(json!({"id": "f1", "name": "Ramen Ichiran"})),
        }]))
        .unwrap();

        let stored = store.document(&path).unwrap();
        assert_eq!(stored.get("name"), Some(&json!("Ramen Ichiran")));
        assert_eq!(stored.get("notes"), Some(&json!("picante")));
    }

    #[test]
    fn test_commit_is_all_or_nothing() {
        let store = MemoryRemoteStore::new();
        store.fail_writes_under("users/u1/trips/T1/food/f2");
        let result = block_on(store.commit_upserts(vec![
            DocumentWrite { path: format!("{}/f1", FOOD), fields: doc(json!({"id": "f1"})) },
            DocumentWrite { path: format!("{}/f2", FOOD), fields: doc(json!({"id": "f2"})) },
        ]));
        assert!(matches!(result, Err(SyncError::RemoteWrite(_))));
        assert!(store.documents_in(FOOD).is_empty());
    }

    #[test]
    fn test_held_commit_applies_on_release() {
        use futures::FutureExt;

        let store = MemoryRemoteStore::new();
        store.hold_commits();
        let mut commit = Box::pin(store.commit_upserts(vec![DocumentWrite {
            path: format!("{}/f1", FOOD),
            fields: doc(json!({"id": "f1"})),
        }]));

        assert!(commit.as_mut().now_or_never().is_none());
        assert!(store.documents_in(FOOD).is_empty());

        store.release_commits();
        assert_eq!(commit.as_mut().now_or_never(), Some(Ok(())));
        assert_eq!(store.documents_in(FOOD).len(), 1);
    }

    #[test]
    fn test_subscription_receives_full_lists_until_dropped() {
        let store = MemoryRemoteStore::new();
        let deliveries = Rc::new(RefCell::new(Vec::<usize>::new()));
        let sink = deliveries.clone();
        let sub = store.subscribe(
            FOOD,
            Rc::new(move |snapshot| sink.borrow_mut().push(snapshot.unwrap().len())),
        );

        store.insert_document(&format!("{}/f1", FOOD), doc(json!({"id": "f1"})));
        store.insert_document(&format!("{}/f2", FOOD), doc(json!({"id": "f2"})));
        // Otra colección: no notifica
        store.insert_document("users/u1/trips/T1/transport/t1", doc(json!({"id": "t1"})));
        assert_eq!(*deliveries.borrow(), vec![0, 1, 2]);
        assert_eq!(store.listener_count(), 1);

        drop(sub);
        assert_eq!(store.listener_count(), 0);
        store.insert_document(&format!("{}/f3", FOOD), doc(json!({"id": "f3"})));
        assert_eq!(deliveries.borrow().len(), 3);
    }

    #[test]
    fn test_delete_is_idempotent_and_journaled() {
        let store = MemoryRemoteStore::new();
        let path = format!("{}/f1", FOOD);
        store.insert_document(&path, doc(json!({"id": "f1"})));
        let notified = Rc::new(Cell::new(0));
        let counter = notified.clone();
        let _sub = store.subscribe(FOOD, Rc::new(move |_| counter.set(counter.get() + 1)));

        block_on(store.delete_document(&path)).unwrap();
        block_on(store.delete_document(&path)).unwrap();
        assert!(store.document(&path).is_none());
        assert_eq!(store.delete_calls(), vec![path.clone(), path]);
        // Instantánea inicial + un único cambio real
        assert_eq!(notified.get(), 2);
    }
}
