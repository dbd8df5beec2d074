// ============================================================================
// TRIP DRAFT SYNC - Borradores locales + reconciliación periódica (RUST PURO)
// ============================================================================
// Arquitectura:
// - Models: viaje, filas de sección, borradores
// - Services: localStorage, Firestore REST, flush común
// - State: Rc<RefCell> (auth, estado de flush, estado de sección)
// - ViewModels: sección genérica + barrido global
// ============================================================================

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;
pub mod viewmodels;

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_logger::Config;

use crate::config::CONFIG;
use crate::models::{
    AccommodationRow, ActivityCard, FoodCard, ItineraryDay, RowContext, SectionKind, SectionRow,
    TransportRow,
};
use crate::services::{
    DraftStore, DraftSyncService, FirestoreClient, MemoryRemoteStore, RemoteStore, RemoteWriter,
    TripService,
};
use crate::state::{AuthState, AuthUser, FlushTracker};
use crate::utils::storage::BrowserScratchSpace;
use crate::utils::timers::PeriodicTask;
use crate::viewmodels::{GlobalSweep, SectionHandle, SectionMount, SectionViewModel};

/// Dependencias compartidas por todas las secciones de la página
#[derive(Clone)]
pub struct SyncRuntime {
    pub auth: AuthState,
    store: Rc<dyn RemoteStore>,
    sync: DraftSyncService,
    trips: TripService,
}

impl SyncRuntime {
    pub fn new(auth: AuthState, store: Rc<dyn RemoteStore>, drafts: DraftStore) -> Self {
        let writer = RemoteWriter::new(store.clone(), Rc::new(auth.clone()));
        Self {
            sync: DraftSyncService::new(drafts, writer, FlushTracker::new()),
            trips: TripService::new(store.clone(), Rc::new(auth.clone())),
            store,
            auth,
        }
    }

    /// localStorage + Firestore; sin proyecto configurado, almacén en memoria
    pub fn browser() -> Self {
        let auth = AuthState::new();
        let store: Rc<dyn RemoteStore> = if CONFIG.firestore.project_id.is_empty() {
            log::warn!("⚠️ FIRESTORE_PROJECT_ID vacío: modo demo con almacén en memoria");
            Rc::new(MemoryRemoteStore::new())
        } else {
            Rc::new(FirestoreClient::from_app_config(&CONFIG, Rc::new(auth.clone())))
        };
        Self::new(auth, store, DraftStore::new(Rc::new(BrowserScratchSpace::new())))
    }

    pub fn section<R: SectionRow>(&self, trip_id: &str, context: RowContext) -> SectionViewModel<R> {
        SectionViewModel::new(
            trip_id,
            self.store.clone(),
            Rc::new(self.auth.clone()),
            self.sync.clone(),
            context,
        )
    }

    /// Sección elegida por nombre, sin tipo de fila
    pub fn section_handle(
        &self,
        kind: SectionKind,
        trip_id: &str,
        context: RowContext,
    ) -> Box<dyn SectionHandle> {
        match kind {
            SectionKind::Accommodation => Box::new(self.section::<AccommodationRow>(trip_id, context)),
            SectionKind::Food => Box::new(self.section::<FoodCard>(trip_id, context)),
            SectionKind::Activities => Box::new(self.section::<ActivityCard>(trip_id, context)),
            SectionKind::Transport => Box::new(self.section::<TransportRow>(trip_id, context)),
            SectionKind::Itinerary => Box::new(self.section::<ItineraryDay>(trip_id, context)),
        }
    }

    pub fn sweep(&self) -> GlobalSweep {
        GlobalSweep::new(self.sync.clone())
    }

    pub fn trips(&self) -> &TripService {
        &self.trips
    }

    pub fn drafts(&self) -> &DraftStore {
        self.sync.drafts()
    }
}

// Runtime global de la página y tarea del barrido
thread_local! {
    static RUNTIME: SyncRuntime = SyncRuntime::browser();
    static SWEEP_TASK: RefCell<Option<PeriodicTask>> = RefCell::new(None);
}

/// Acceso al runtime global
pub fn with_runtime<T>(f: impl FnOnce(&SyncRuntime) -> T) -> T {
    RUNTIME.with(f)
}

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let level = if CONFIG.is_logging_enabled() {
        log::Level::Info
    } else {
        log::Level::Warn
    };
    wasm_logger::init(Config::new(level));
    log::info!("🚀 Trip Draft Sync ({})", CONFIG.environment);

    Ok(())
}

/// La página llama aquí tras el login y en cada renovación del token
#[wasm_bindgen]
pub fn set_auth_user(uid: String, id_token: Option<String>) {
    log::info!("🔐 Usuario activo: {}", uid);
    with_runtime(|rt| rt.auth.set_user(Some(AuthUser { uid, id_token })));
}

#[wasm_bindgen]
pub fn clear_auth_user() {
    log::info!("🔐 Logout");
    with_runtime(|rt| rt.auth.logout());
}

/// Arranca el barrido global (idempotente)
#[wasm_bindgen]
pub fn start_global_sweep() {
    SWEEP_TASK.with(|task| {
        let mut task = task.borrow_mut();
        if task.as_ref().map(|t| t.is_running()).unwrap_or(false) {
            return;
        }
        let sweep = with_runtime(|rt| rt.sweep());
        *task = Some(sweep.start(CONFIG.timers.sweep_interval_ms, None));
    });
}

#[wasm_bindgen]
pub fn stop_global_sweep() {
    SWEEP_TASK.with(|task| {
        // Soltar la tarea cancela el intervalo
        task.borrow_mut().take();
    });
}

/// Ids de viajes con borradores pendientes, como array JSON
#[wasm_bindgen]
pub fn unsaved_trips_json() -> Result<String, JsValue> {
    let trips = with_runtime(|rt| rt.drafts().unsaved_trips())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_json::to_string(&trips).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// ==========================================
// SECCIONES PARA LA PÁGINA
// ==========================================

/// Sección montada desde JS. Las filas entran y salen como JSON camelCase.
/// Al liberarla (`free()`) se cancelan la consulta en vivo y el autosave.
#[wasm_bindgen]
pub struct SectionController {
    section: Box<dyn SectionHandle>,
    _mount: SectionMount,
}

#[wasm_bindgen]
impl SectionController {
    /// `kind`: accommodation, food, activities, transport, itinerary
    #[wasm_bindgen(constructor)]
    pub fn new(kind: &str, trip_id: &str, number_of_people: u32) -> Result<SectionController, JsValue> {
        let kind = SectionKind::parse(kind).ok_or_else(|| js_error(format!("Sección desconocida: {}", kind)))?;
        let section = with_runtime(|rt| rt.section_handle(kind, trip_id, RowContext { number_of_people }));
        let mount = section.mount(true);
        Ok(Self {
            section,
            _mount: mount,
        })
    }

    pub fn rows_json(&self) -> Result<String, JsValue> {
        self.section.rows_json().map_err(js_error)
    }

    pub fn status_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.section.status()).map_err(js_error)
    }

    pub fn add_row(&self, row_json: &str) -> Result<String, JsValue> {
        self.section.add_row_json(row_json).map_err(js_error)
    }

    pub fn replace_row(&self, row_json: &str) -> Result<bool, JsValue> {
        self.section.replace_row_json(row_json).map_err(js_error)
    }

    pub fn duplicate_row(&self, row_id: &str) -> Option<String> {
        self.section.duplicate_row(row_id)
    }

    pub fn set_number_of_people(&self, number_of_people: u32) {
        self.section.set_number_of_people(number_of_people);
    }

    pub fn sort_by(&self, column: &str) -> Result<(), JsValue> {
        self.section.sort_by(column).map_err(js_error)
    }

    pub fn request_delete(&self, row_id: &str) {
        self.section.request_delete(row_id);
    }

    pub fn cancel_delete(&self) {
        self.section.cancel_delete();
    }

    /// Promise que se rechaza con el error remoto
    pub fn confirm_delete(&self) -> js_sys::Promise {
        let pending = self.section.confirm_delete();
        wasm_bindgen_futures::future_to_promise(async move {
            pending.await.map(|()| JsValue::UNDEFINED).map_err(js_error)
        })
    }

    /// `callback()` tras cada cambio visible de la tabla
    pub fn on_change(&self, callback: js_sys::Function) {
        self.section.on_change(Box::new(move || {
            if let Err(e) = callback.call0(&JsValue::NULL) {
                log::error!("❌ Error en el callback de la sección: {:?}", e);
            }
        }));
    }
}
