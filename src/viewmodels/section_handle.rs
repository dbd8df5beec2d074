// ============================================================================
// SECTION HANDLE - Sección sin tipo de fila, para la página JS
// ============================================================================
// La página no conoce los tipos de fila: habla JSON (camelCase, el mismo
// formato del borrador y de Firestore) y elige la sección por nombre.
// ============================================================================

use futures::future::LocalBoxFuture;
use serde::Serialize;

use crate::error::SyncError;
use crate::models::{SectionKind, SectionRow, SortColumn};
use crate::state::SortDirection;
use crate::viewmodels::{SectionMount, SectionViewModel};

/// Estado visible de la tabla, serializado para la página
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionStatus {
    pub loading: bool,
    pub error: Option<String>,
    pub showing_draft: bool,
    pub unsaved_in_memory: bool,
    pub storage_warning: Option<String>,
    pub pending_delete: Option<String>,
    pub sort_column: Option<SortColumn>,
    pub sort_descending: bool,
}

pub trait SectionHandle {
    fn kind(&self) -> SectionKind;

    /// Monta la sección; con `autosave` usa el periodo configurado
    fn mount(&self, autosave: bool) -> SectionMount;

    /// Filas en el orden de la tabla, como array JSON
    fn rows_json(&self) -> Result<String, SyncError>;

    /// Devuelve el id asignado
    fn add_row_json(&self, row_json: &str) -> Result<String, SyncError>;

    /// Sustituye la fila con el mismo id. false si no existe.
    fn replace_row_json(&self, row_json: &str) -> Result<bool, SyncError>;

    fn duplicate_row(&self, row_id: &str) -> Option<String>;

    fn set_number_of_people(&self, number_of_people: u32);

    /// `column` en camelCase: name, price, date, location, createdAt
    fn sort_by(&self, column: &str) -> Result<(), SyncError>;

    fn status(&self) -> SectionStatus;

    fn request_delete(&self, row_id: &str);

    fn cancel_delete(&self);

    fn confirm_delete(&self) -> LocalBoxFuture<'static, Result<(), SyncError>>;

    fn on_change(&self, callback: Box<dyn Fn()>);
}

impl<R: SectionRow> SectionHandle for SectionViewModel<R> {
    fn kind(&self) -> SectionKind {
        R::KIND
    }

    fn mount(&self, autosave: bool) -> SectionMount {
        if autosave {
            self.mount_with_default_autosave()
        } else {
            SectionViewModel::mount(self)
        }
    }

    fn rows_json(&self) -> Result<String, SyncError> {
        Ok(serde_json::to_string(&self.display_rows())?)
    }

    fn add_row_json(&self, row_json: &str) -> Result<String, SyncError> {
        let row: R = serde_json::from_str(row_json)?;
        Ok(self.add_row(row))
    }

    fn replace_row_json(&self, row_json: &str) -> Result<bool, SyncError> {
        let row: R = serde_json::from_str(row_json)?;
        if row.id().is_empty() {
            return Err(SyncError::MissingRowId);
        }
        let row_id = row.id().to_string();
        Ok(self.edit_row(&row_id, move |current| *current = row))
    }

    fn duplicate_row(&self, row_id: &str) -> Option<String> {
        SectionViewModel::duplicate_row(self, row_id)
    }

    fn set_number_of_people(&self, number_of_people: u32) {
        SectionViewModel::set_number_of_people(self, number_of_people)
    }

    fn sort_by(&self, column: &str) -> Result<(), SyncError> {
        let column: SortColumn = serde_json::from_value(serde_json::Value::String(column.to_string()))?;
        SectionViewModel::sort_by(self, column);
        Ok(())
    }

    fn status(&self) -> SectionStatus {
        let state = self.state();
        let sort = self.active_sort();
        SectionStatus {
            loading: state.get_loading(),
            error: state.get_error(),
            showing_draft: state.get_showing_draft(),
            unsaved_in_memory: state.get_unsaved_in_memory(),
            storage_warning: state.get_storage_warning(),
            pending_delete: state.get_pending_delete(),
            sort_column: sort.active_column(),
            sort_descending: sort.direction() == SortDirection::Descending,
        }
    }

    fn request_delete(&self, row_id: &str) {
        SectionViewModel::request_delete(self, row_id)
    }

    fn cancel_delete(&self) {
        SectionViewModel::cancel_delete(self)
    }

    fn confirm_delete(&self) -> LocalBoxFuture<'static, Result<(), SyncError>> {
        let vm = self.clone();
        Box::pin(async move { vm.confirm_delete().await })
    }

    fn on_change(&self, callback: Box<dyn Fn()>) {
        self.state().subscribe_to_changes(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FoodCard, RowContext, TransportRow};
    use crate::services::{DraftStore, DraftSyncService, MemoryRemoteStore, RemoteWriter};
    use crate::state::{AuthState, FlushTracker};
    use crate::utils::storage::MemoryScratchSpace;
    use futures::executor::block_on;
    use serde_json::{json, Value};
    use std::cell::Cell;
    use std::rc::Rc;

    fn handle<R: SectionRow>(store: &MemoryRemoteStore) -> Box<dyn SectionHandle> {
        let auth = AuthState::signed_in("u1");
        let writer = RemoteWriter::new(Rc::new(store.clone()), Rc::new(auth.clone()));
        let drafts = DraftStore::new(Rc::new(MemoryScratchSpace::new()));
        Box::new(SectionViewModel::<R>::new(
            "T1",
            Rc::new(store.clone()),
            Rc::new(auth),
            DraftSyncService::new(drafts, writer, FlushTracker::new()),
            RowContext { number_of_people: 2 },
        ))
    }

    fn rows(section: &dyn SectionHandle) -> Vec<Value> {
        serde_json::from_str(&section.rows_json().unwrap()).unwrap()
    }

    #[test]
    fn test_json_edits_go_through_the_draft() {
        let store = MemoryRemoteStore::new();
        let section = handle::<FoodCard>(&store);
        let _mount = section.mount(false);
        assert_eq!(section.kind(), SectionKind::Food);

        let changes = Rc::new(Cell::new(0));
        let counter = changes.clone();
        section.on_change(Box::new(move || counter.set(counter.get() + 1)));

        let id = section
            .add_row_json(r#"{"id": "", "name": "Ramen", "price": 12}"#)
            .unwrap();
        assert!(!id.is_empty());
        assert!(section.status().showing_draft);

        let replaced = section
            .replace_row_json(&json!({"id": id, "name": "Ramen Ichiran", "price": 15}).to_string())
            .unwrap();
        assert!(replaced);
        assert!(!section
            .replace_row_json(r#"{"id": "nope", "name": "x"}"#)
            .unwrap());

        let copy = section.duplicate_row(&id).unwrap();
        let listed = rows(section.as_ref());
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1]["id"], json!(copy));
        assert_eq!(listed[0]["name"], json!("Ramen Ichiran"));
        assert!(changes.get() >= 3);

        section.request_delete(&copy);
        assert_eq!(section.status().pending_delete, Some(copy.clone()));
        block_on(section.confirm_delete()).unwrap();
        assert_eq!(rows(section.as_ref()).len(), 1);
        assert_eq!(section.status().pending_delete, None);
    }

    #[test]
    fn test_bad_input_is_reported_not_applied() {
        let store = MemoryRemoteStore::new();
        let section = handle::<TransportRow>(&store);
        let _mount = section.mount(false);

        assert!(matches!(
            section.add_row_json("{no es json"),
            Err(SyncError::Serialization(_))
        ));
        assert_eq!(
            section.replace_row_json(r#"{"id": ""}"#),
            Err(SyncError::MissingRowId)
        );
        assert!(matches!(section.sort_by("altitude"), Err(SyncError::Serialization(_))));
        assert!(rows(section.as_ref()).is_empty());
    }

    #[test]
    fn test_sort_by_column_name_cycles() {
        let store = MemoryRemoteStore::new();
        let section = handle::<FoodCard>(&store);
        let _mount = section.mount(false);
        section.add_row_json(r#"{"id": "f1", "name": "B", "price": 5, "createdAt": 1}"#).unwrap();
        section.add_row_json(r#"{"id": "f2", "name": "A", "price": 9, "createdAt": 2}"#).unwrap();

        section.sort_by("price").unwrap();
        section.sort_by("price").unwrap();
        let status = section.status();
        assert_eq!(status.sort_column, Some(SortColumn::Price));
        assert!(status.sort_descending);
        assert_eq!(rows(section.as_ref())[0]["id"], json!("f2"));

        section.sort_by("price").unwrap();
        assert_eq!(section.status().sort_column, None);
        assert_eq!(rows(section.as_ref())[0]["id"], json!("f1"));

        let status = serde_json::to_value(section.status()).unwrap();
        assert_eq!(status["sortColumn"], Value::Null);
        assert_eq!(status["showingDraft"], json!(true));
    }
}
