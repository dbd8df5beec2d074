// ============================================================================
// SECTION STATE - Estado de una sección montada
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::models::RowContext;
use crate::state::table_sort::TableSort;

/// Estado de una sección (filas mostradas + banderas de UI)
pub struct SectionState<R> {
    pub rows: Rc<RefCell<Vec<R>>>,
    pub loading: Rc<RefCell<bool>>,
    pub error: Rc<RefCell<Option<String>>>,
    /// Las filas mostradas vienen del borrador local
    pub showing_draft: Rc<RefCell<bool>>,
    /// localStorage lleno: las filas solo están en memoria
    pub unsaved_in_memory: Rc<RefCell<bool>>,
    pub storage_warning: Rc<RefCell<Option<String>>>,
    /// Fila marcada para borrar, a la espera de confirmación
    pub pending_delete: Rc<RefCell<Option<String>>>,
    pub sort: Rc<RefCell<TableSort>>,
    pub context: Rc<RefCell<RowContext>>,
    change_subscribers: Rc<RefCell<Vec<Rc<dyn Fn()>>>>,
}

impl<R> Clone for SectionState<R> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            loading: self.loading.clone(),
            error: self.error.clone(),
            showing_draft: self.showing_draft.clone(),
            unsaved_in_memory: self.unsaved_in_memory.clone(),
            storage_warning: self.storage_warning.clone(),
            pending_delete: self.pending_delete.clone(),
            sort: self.sort.clone(),
            context: self.context.clone(),
            change_subscribers: self.change_subscribers.clone(),
        }
    }
}

impl<R: Clone> SectionState<R> {
    pub fn new(context: RowContext) -> Self {
        Self {
            rows: Rc::new(RefCell::new(Vec::new())),
            loading: Rc::new(RefCell::new(false)),
            error: Rc::new(RefCell::new(None)),
            showing_draft: Rc::new(RefCell::new(false)),
            unsaved_in_memory: Rc::new(RefCell::new(false)),
            storage_warning: Rc::new(RefCell::new(None)),
            pending_delete: Rc::new(RefCell::new(None)),
            sort: Rc::new(RefCell::new(TableSort::default())),
            context: Rc::new(RefCell::new(context)),
            change_subscribers: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Filas en orden de almacenamiento (sin ordenar)
    pub fn get_rows(&self) -> Vec<R> {
        self.rows.borrow().clone()
    }

    pub fn set_rows(&self, rows: Vec<R>) {
        *self.rows.borrow_mut() = rows;
    }

    pub fn set_loading(&self, loading: bool) {
        *self.loading.borrow_mut() = loading;
    }

    pub fn get_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn set_error(&self, error: Option<String>) {
        *self.error.borrow_mut() = error;
    }

    pub fn get_error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub fn set_showing_draft(&self, value: bool) {
        *self.showing_draft.borrow_mut() = value;
    }

    pub fn get_showing_draft(&self) -> bool {
        *self.showing_draft.borrow()
    }

    pub fn set_unsaved_in_memory(&self, value: bool) {
        *self.unsaved_in_memory.borrow_mut() = value;
    }

    pub fn get_unsaved_in_memory(&self) -> bool {
        *self.unsaved_in_memory.borrow()
    }

    pub fn set_storage_warning(&self, warning: Option<String>) {
        *self.storage_warning.borrow_mut() = warning;
    }

    pub fn get_storage_warning(&self) -> Option<String> {
        self.storage_warning.borrow().clone()
    }

    pub fn set_pending_delete(&self, row_id: Option<String>) {
        *self.pending_delete.borrow_mut() = row_id;
    }

    pub fn get_pending_delete(&self) -> Option<String> {
        self.pending_delete.borrow().clone()
    }

    pub fn get_sort(&self) -> TableSort {
        *self.sort.borrow()
    }

    pub fn get_context(&self) -> RowContext {
        *self.context.borrow()
    }

    pub fn set_context(&self, context: RowContext) {
        *self.context.borrow_mut() = context;
    }

    /// Suscribirse a cambios (la vista re-renderiza)
    pub fn subscribe_to_changes<F>(&self, callback: F)
    where
        F: Fn() + 'static,
    {
        self.change_subscribers.borrow_mut().push(Rc::new(callback));
    }

    pub fn notify_subscribers(&self) {
        // Copia: un callback puede suscribir a otro
        let subscribers: Vec<Rc<dyn Fn()>> = self.change_subscribers.borrow().clone();
        for callback in subscribers {
            callback();
        }
    }
}
