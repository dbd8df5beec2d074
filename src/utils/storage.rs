// ============================================================================
// ESPACIO LOCAL PERSISTENTE (localStorage)
// ============================================================================
// Clave -> texto, síncrono. La ausencia de una clave no es un error.
// ============================================================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::JsValue;
use web_sys::{window, Storage};

use crate::error::SyncError;

pub trait ScratchSpace {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError>;

    /// Falla con `QuotaExceeded` si el navegador no admite más datos
    fn set(&self, key: &str, value: &str) -> Result<(), SyncError>;

    fn remove(&self, key: &str) -> Result<(), SyncError>;
}

/// `window.localStorage`
#[derive(Clone, Default)]
pub struct BrowserScratchSpace;

impl BrowserScratchSpace {
    pub fn new() -> Self {
        Self
    }

    fn storage(&self) -> Result<Storage, SyncError> {
        window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or(SyncError::StorageUnavailable)
    }
}

/// QuotaExceededError (o el código 22 / 1014 de navegadores antiguos)
fn is_quota_error(err: &JsValue) -> bool {
    let name = js_sys::Reflect::get(err, &JsValue::from_str("name"))
        .ok()
        .and_then(|v| v.as_string());
    if matches!(name.as_deref(), Some("QuotaExceededError") | Some("NS_ERROR_DOM_QUOTA_REACHED")) {
        return true;
    }
    let code = js_sys::Reflect::get(err, &JsValue::from_str("code"))
        .ok()
        .and_then(|v| v.as_f64());
    matches!(code, Some(c) if c == 22.0 || c == 1014.0)
}

impl ScratchSpace for BrowserScratchSpace {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        self.storage()?
            .get_item(key)
            .map_err(|e| SyncError::Storage(format!("Error leyendo localStorage: {:?}", e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        self.storage()?.set_item(key, value).map_err(|e| {
            if is_quota_error(&e) {
                SyncError::QuotaExceeded(format!("{} ({} bytes)", key, value.len()))
            } else {
                SyncError::Storage(format!("Error guardando en localStorage: {:?}", e))
            }
        })
    }

    fn remove(&self, key: &str) -> Result<(), SyncError> {
        self.storage()?
            .remove_item(key)
            .map_err(|e| SyncError::Storage(format!("Error eliminando de localStorage: {:?}", e)))
    }
}

/// Espacio en memoria (modo sin navegador y tests).
/// `capacity` limita la suma de bytes de claves y valores.
#[derive(Clone, Default)]
pub struct MemoryScratchSpace {
    items: Rc<RefCell<HashMap<String, String>>>,
    capacity: Option<usize>,
}

impl MemoryScratchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            items: Rc::default(),
            capacity: Some(bytes),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.items.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.items
            .borrow()
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl ScratchSpace for MemoryScratchSpace {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        if let Some(capacity) = self.capacity {
            let needed = self.used_bytes_without(key) + key.len() + value.len();
            if needed > capacity {
                return Err(SyncError::QuotaExceeded(format!(
                    "{} ({} de {} bytes)",
                    key, needed, capacity
                )));
            }
        }
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SyncError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}
