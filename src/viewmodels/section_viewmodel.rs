// ============================================================================
// SECTION VIEWMODEL - Reconciliador genérico de secciones
// ============================================================================
// Una sola máquina de estados para las cinco secciones, parametrizada por el
// tipo de fila (`SectionRow`):
// - Montaje: el borrador local manda; si no hay, filas remotas en vivo
// - Cada edición reescribe el borrador completo al momento
// - Autosave periódico por el camino común de flush
// - Borrado con confirmación: un único delete remoto por fila
// ============================================================================

use std::rc::Rc;

use crate::config::CONFIG;
use crate::error::SyncError;
use crate::models::rows::{decode_rows_counted, encode_rows};
use crate::models::{Document, RowContext, SectionRow, SortColumn};
use crate::services::{
    DraftSyncService, FlushOutcome, RemoteStore, SectionSnapshot, SectionSource,
    SectionSubscription,
};
use crate::state::{AuthProvider, FlushState, SectionState, TableSort};
use crate::utils::timers::PeriodicTask;

/// Sección montada. Al soltarla se cancelan la consulta en vivo y el
/// autosave; el borrador no se toca.
pub struct SectionMount {
    label: &'static str,
    _subscription: SectionSubscription,
    autosave: Option<PeriodicTask>,
}

impl SectionMount {
    pub fn is_autosaving(&self) -> bool {
        self.autosave.as_ref().map(|task| task.is_running()).unwrap_or(false)
    }
}

impl Drop for SectionMount {
    fn drop(&mut self) {
        log::info!("🛑 Sección {} desmontada", self.label);
    }
}

/// ViewModel de una sección para un viaje
pub struct SectionViewModel<R: SectionRow> {
    trip_id: String,
    state: SectionState<R>,
    source: SectionSource,
    sync: DraftSyncService,
}

impl<R: SectionRow> Clone for SectionViewModel<R> {
    fn clone(&self) -> Self {
        Self {
            trip_id: self.trip_id.clone(),
            state: self.state.clone(),
            source: self.source.clone(),
            sync: self.sync.clone(),
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn new_row_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl<R: SectionRow> SectionViewModel<R> {
    pub fn new(
        trip_id: impl Into<String>,
        store: Rc<dyn RemoteStore>,
        auth: Rc<dyn AuthProvider>,
        sync: DraftSyncService,
        context: RowContext,
    ) -> Self {
        Self {
            trip_id: trip_id.into(),
            state: SectionState::new(context),
            source: SectionSource::new(store, auth, R::KIND),
            sync,
        }
    }

    pub fn trip_id(&self) -> &str {
        &self.trip_id
    }

    pub fn state(&self) -> &SectionState<R> {
        &self.state
    }

    // ==========================================
    // MONTAJE
    // ==========================================

    pub fn mount(&self) -> SectionMount {
        log::info!("📂 Montando {} de {}", R::KIND, self.trip_id);
        self.restore_draft();

        let vm = self.clone();
        let subscription = self
            .source
            .subscribe(&self.trip_id, move |snapshot| vm.apply_snapshot(snapshot));

        SectionMount {
            label: R::KIND.as_str(),
            _subscription: subscription,
            autosave: None,
        }
    }

    /// `mount` + autosave cada `period_ms`
    pub fn mount_with_autosave(&self, period_ms: u32) -> SectionMount {
        let mut mount = self.mount();
        let vm = self.clone();
        mount.autosave = Some(PeriodicTask::start(R::KIND.as_str(), period_ms, move || {
            let vm = vm.clone();
            async move {
                vm.autosave_tick().await;
            }
        }));
        mount
    }

    /// Autosave con el periodo configurado (SECTION_FLUSH_INTERVAL_MS)
    pub fn mount_with_default_autosave(&self) -> SectionMount {
        self.mount_with_autosave(CONFIG.timers.section_flush_interval_ms)
    }

    /// Decodifica y recalcula derivados. Los documentos que no encajan
    /// se avisan en `error` sin ocultar el resto de la tabla.
    fn decode(&self, docs: &[Document]) -> Vec<R> {
        let decoded = decode_rows_counted::<R>(docs);
        let context = self.state.get_context();
        let mut rows = decoded.rows;
        rows.iter_mut().for_each(|row| row.recompute_derived(&context));

        if decoded.skipped > 0 {
            self.state.set_error(Some(format!(
                "{} filas de {} no se pudieron leer",
                decoded.skipped,
                R::KIND
            )));
        } else {
            self.state.set_error(None);
        }
        rows
    }

    fn restore_draft(&self) {
        match self.sync.drafts().read(&self.trip_id, R::KIND) {
            Ok(Some(entry)) => {
                let rows = self.decode(&entry.rows);
                log::info!("📝 {} filas de {} restauradas del borrador", rows.len(), R::KIND);
                self.state.set_rows(rows);
                self.state.set_showing_draft(true);
                self.sync.tracker().mark_dirty(&self.trip_id, R::KIND);
                self.state.notify_subscribers();
            }
            Ok(None) => {}
            Err(e) => log::error!("❌ No se pudo leer el borrador de {}: {}", R::KIND, e),
        }
    }

    fn has_local_changes(&self) -> bool {
        self.state.get_unsaved_in_memory() || self.sync.drafts().has_draft(&self.trip_id, R::KIND)
    }

    fn apply_snapshot(&self, snapshot: SectionSnapshot) {
        self.state.set_loading(snapshot.loading);

        if let Some(error) = snapshot.error {
            self.state.set_error(Some(error));
        } else if !snapshot.loading {
            if self.has_local_changes() {
                log::info!("📝 {} con cambios locales, se ignora la instantánea remota", R::KIND);
            } else {
                let rows = self.decode(&snapshot.rows);
                self.state.set_rows(rows);
                self.state.set_showing_draft(false);
            }
        }

        self.state.notify_subscribers();
    }

    // ==========================================
    // EDICIÓN
    // ==========================================

    /// Reemplaza las filas y reescribe el borrador completo
    fn commit_rows(&self, rows: Vec<R>) {
        self.state.set_rows(rows);
        self.persist_draft();
        self.state.notify_subscribers();
    }

    fn persist_draft(&self) {
        let result = encode_rows(&self.state.get_rows())
            .and_then(|docs| self.sync.stage(&self.trip_id, R::KIND, docs));

        match result {
            Ok(()) => {
                self.state.set_showing_draft(true);
                self.state.set_unsaved_in_memory(false);
                self.state.set_storage_warning(None);
            }
            Err(e) => {
                match &e {
                    SyncError::QuotaExceeded(_) => {
                        log::warn!("⚠️ localStorage lleno: {} de {} solo en memoria", R::KIND, self.trip_id)
                    }
                    _ => log::error!("❌ Error guardando borrador de {}: {}", R::KIND, e),
                }
                // El borrador anterior quedó por detrás de la memoria: fuera,
                // para que ni el barrido ni un remontaje lo den por bueno
                if let Err(clear_error) = self.sync.drafts().clear(&self.trip_id, R::KIND) {
                    log::error!("❌ No se pudo retirar el borrador antiguo de {}: {}", R::KIND, clear_error);
                }
                self.state.set_showing_draft(false);
                self.state.set_unsaved_in_memory(true);
                self.state
                    .set_storage_warning(Some(format!("Cambios sin guardar en este dispositivo: {}", e)));
                self.sync.tracker().mark_dirty(&self.trip_id, R::KIND);
            }
        }
    }

    /// Añade una fila; sin id se le asigna uno nuevo. Devuelve el id.
    pub fn add_row(&self, mut row: R) -> String {
        if row.id().is_empty() {
            row.assign_identity(new_row_id(), now_ms());
        }
        row.recompute_derived(&self.state.get_context());
        let id = row.id().to_string();

        let mut rows = self.state.get_rows();
        rows.push(row);
        self.commit_rows(rows);
        id
    }

    /// Aplica `edit` a la fila `row_id`. false si no existe.
    pub fn edit_row<F>(&self, row_id: &str, edit: F) -> bool
    where
        F: FnOnce(&mut R),
    {
        let mut rows = self.state.get_rows();
        let Some(row) = rows.iter_mut().find(|row| row.id() == row_id) else {
            log::warn!("⚠️ Fila {} no encontrada en {}", row_id, R::KIND);
            return false;
        };
        edit(row);
        row.recompute_derived(&self.state.get_context());
        self.commit_rows(rows);
        true
    }

    /// Copia con id y fecha de creación nuevos, justo después del original
    pub fn duplicate_row(&self, row_id: &str) -> Option<String> {
        let mut rows = self.state.get_rows();
        let position = rows.iter().position(|row| row.id() == row_id)?;

        let mut copy = rows[position].clone();
        let id = new_row_id();
        copy.assign_identity(id.clone(), now_ms());
        copy.recompute_derived(&self.state.get_context());
        rows.insert(position + 1, copy);

        self.commit_rows(rows);
        Some(id)
    }

    /// Cambio del tamaño del grupo: recalcula los derivados y, si algo
    /// cambia, reescribe el borrador
    pub fn set_number_of_people(&self, number_of_people: u32) {
        let context = RowContext { number_of_people };
        if context == self.state.get_context() {
            return;
        }
        self.state.set_context(context);

        let before = self.state.get_rows();
        let mut rows = before.clone();
        rows.iter_mut().for_each(|row| row.recompute_derived(&context));

        if rows != before {
            self.commit_rows(rows);
        } else {
            self.state.notify_subscribers();
        }
    }

    // ==========================================
    // ORDEN
    // ==========================================

    pub fn sort_by(&self, column: SortColumn) {
        self.state.sort.borrow_mut().click(column);
        self.state.notify_subscribers();
    }

    pub fn active_sort(&self) -> TableSort {
        self.state.get_sort()
    }

    /// Filas en el orden de la tabla
    pub fn display_rows(&self) -> Vec<R> {
        let mut rows = self.state.get_rows();
        self.state.get_sort().apply(&mut rows);
        rows
    }

    // ==========================================
    // BORRADO
    // ==========================================

    pub fn request_delete(&self, row_id: &str) {
        self.state.set_pending_delete(Some(row_id.to_string()));
        self.state.notify_subscribers();
    }

    pub fn cancel_delete(&self) {
        self.state.set_pending_delete(None);
        self.state.notify_subscribers();
    }

    /// Quita la fila marcada de la tabla y del borrador, y la borra en
    /// remoto. Si hay un flush en curso del par (que aún puede llevar la
    /// fila), el delete sale cuando termina. El error remoto se devuelve
    /// para avisar al usuario.
    pub async fn confirm_delete(&self) -> Result<(), SyncError> {
        let Some(row_id) = self.state.get_pending_delete() else {
            return Ok(());
        };
        self.state.set_pending_delete(None);

        let rows: Vec<R> = self
            .state
            .get_rows()
            .into_iter()
            .filter(|row| row.id() != row_id)
            .collect();
        self.commit_rows(rows);

        let tracker = self.sync.tracker();
        if tracker.state(&self.trip_id, R::KIND) == FlushState::Flushing {
            log::info!("⏳ Esperando al flush de {} antes de borrar {}", R::KIND, row_id);
        }
        tracker.wait_idle(&self.trip_id, R::KIND).await;

        self.sync
            .writer()
            .remove(&self.trip_id, R::KIND, &row_id)
            .await
            .map_err(|e| {
                log::error!("❌ Error borrando {} de {}: {}", row_id, R::KIND, e);
                e
            })
    }

    // ==========================================
    // AUTOSAVE
    // ==========================================

    /// Un ciclo de autosave. Los fallos solo se registran.
    pub async fn autosave_tick(&self) -> FlushOutcome {
        let in_memory = self.state.get_unsaved_in_memory();
        let flushed = self.state.get_rows();
        let outcome = if in_memory {
            match encode_rows(&flushed) {
                Ok(docs) => self.sync.flush_rows(&self.trip_id, R::KIND, &docs).await,
                Err(e) => FlushOutcome::Failed(e),
            }
        } else {
            self.sync.flush_section(&self.trip_id, R::KIND).await
        };

        match &outcome {
            FlushOutcome::Saved { rows } => {
                log::info!("✅ Autosave de {}: {} filas", R::KIND, rows);
                // Solo si nadie editó durante la escritura
                if in_memory && self.state.get_unsaved_in_memory() && self.state.get_rows() == flushed {
                    self.state.set_unsaved_in_memory(false);
                    self.state.set_storage_warning(None);
                }
                if !self.sync.drafts().has_draft(&self.trip_id, R::KIND) {
                    self.state.set_showing_draft(false);
                }
                self.state.notify_subscribers();
            }
            FlushOutcome::Failed(e) => {
                log::warn!("⚠️ Autosave de {} fallido: {}", R::KIND, e);
            }
            FlushOutcome::Clean | FlushOutcome::Superseded | FlushOutcome::Skipped => {}
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccommodationRow, FoodCard, LocationCard, SectionKind};
    use crate::services::{DraftStore, MemoryRemoteStore, RemoteWriter};
    use crate::state::{AuthState, FlushTracker};
    use crate::utils::storage::MemoryScratchSpace;
    use crate::viewmodels::GlobalSweep;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;
    use serde_json::json;
    use std::cell::RefCell;

    const ACCOMMODATION: &str = "users/u1/trips/T1/accommodation";

    struct Fixture {
        store: MemoryRemoteStore,
        sync: DraftSyncService,
        auth: AuthState,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_scratch(MemoryScratchSpace::new())
        }

        fn with_scratch(scratch: MemoryScratchSpace) -> Self {
            let store = MemoryRemoteStore::new();
            let auth = AuthState::signed_in("u1");
            let drafts = DraftStore::new(Rc::new(scratch));
            let writer = RemoteWriter::new(Rc::new(store.clone()), Rc::new(auth.clone()));
            Self {
                sync: DraftSyncService::new(drafts, writer, FlushTracker::new()),
                store,
                auth,
            }
        }

        fn section<R: SectionRow>(&self, people: u32) -> SectionViewModel<R> {
            SectionViewModel::new(
                "T1",
                Rc::new(self.store.clone()),
                Rc::new(self.auth.clone()),
                self.sync.clone(),
                RowContext { number_of_people: people },
            )
        }
    }

    fn stay(id: &str, total_price: f64, created_at: i64) -> AccommodationRow {
        serde_json::from_value(json!({
            "id": id,
            "name": format!("Hotel {}", id),
            "totalPrice": total_price,
            "checkIn": "2025-06-01T00:00",
            "checkOut": "2025-06-04T00:00",
            "createdAt": created_at,
        }))
        .unwrap()
    }

    fn food(name: &str) -> FoodCard {
        FoodCard(LocationCard {
            id: String::new(),
            name: name.to_string(),
            location: None,
            date: None,
            price: 10.0,
            notes: String::new(),
            included_in_total: true,
            created_at: 0,
        })
    }

    fn draft_ids(f: &Fixture, kind: SectionKind) -> Vec<String> {
        f.sync
            .drafts()
            .read("T1", kind)
            .unwrap()
            .map(|entry| {
                entry
                    .rows
                    .iter()
                    .filter_map(|row| row.get("id").and_then(|id| id.as_str()).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_derived_price_for_group_of_two() {
        let f = Fixture::new();
        let vm = f.section::<AccommodationRow>(2);
        let _mount = vm.mount();

        vm.add_row(stay("a1", 300.0, 1));
        let rows = vm.display_rows();
        assert_eq!(rows[0].price_per_night_per_person, Some(50.0));

        vm.set_number_of_people(3);
        let rows = vm.display_rows();
        assert!((rows[0].price_per_night_per_person.unwrap() - 300.0 / 3.0 / 3.0).abs() < 1e-9);
        let entry = f.sync.drafts().read("T1", SectionKind::Accommodation).unwrap().unwrap();
        assert_eq!(
            entry.rows[0].get("pricePerNightPerPerson"),
            Some(&json!(300.0 / 3.0 / 3.0))
        );
    }

    #[test]
    fn test_remote_rows_shown_until_a_draft_exists() {
        let f = Fixture::new();
        f.store.insert_document(
            &format!("{}/a1", ACCOMMODATION),
            serde_json::to_value(stay("a1", 300.0, 1)).unwrap().as_object().cloned().unwrap(),
        );
        let vm = f.section::<AccommodationRow>(2);
        let _mount = vm.mount();

        assert_eq!(vm.display_rows().len(), 1);
        assert!(!vm.state().get_showing_draft());
        // Los derivados se calculan también sobre filas remotas
        assert_eq!(vm.display_rows()[0].price_per_night_per_person, Some(50.0));

        vm.edit_row("a1", |row| row.name = "Ryokan".to_string());
        assert!(vm.state().get_showing_draft());

        // Cambio remoto mientras hay borrador: se ignora
        f.store.insert_document(
            &format!("{}/a2", ACCOMMODATION),
            serde_json::to_value(stay("a2", 90.0, 2)).unwrap().as_object().cloned().unwrap(),
        );
        let rows = vm.display_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Ryokan");
    }

    #[test]
    fn test_draft_wins_on_mount() {
        let f = Fixture::new();
        f.store.insert_document(
            &format!("{}/a1", ACCOMMODATION),
            serde_json::to_value(stay("a1", 300.0, 1)).unwrap().as_object().cloned().unwrap(),
        );
        {
            let vm = f.section::<AccommodationRow>(2);
            let _mount = vm.mount();
            vm.edit_row("a1", |row| row.total_price = 600.0);
        }

        let vm = f.section::<AccommodationRow>(2);
        let _mount = vm.mount();
        assert!(vm.state().get_showing_draft());
        assert_eq!(vm.display_rows()[0].total_price, 600.0);
        assert_eq!(vm.display_rows()[0].price_per_night_per_person, Some(100.0));
    }

    #[test]
    fn test_draft_tracks_last_of_many_edits() {
        let f = Fixture::new();
        let vm = f.section::<AccommodationRow>(1);
        let _mount = vm.mount();
        vm.add_row(stay("a1", 0.0, 1));

        for price in 1..=25 {
            vm.edit_row("a1", |row| row.total_price = price as f64 * 10.0);
        }
        let entry = f.sync.drafts().read("T1", SectionKind::Accommodation).unwrap().unwrap();
        assert_eq!(entry.rows[0].get("totalPrice"), Some(&json!(250.0)));
        assert!(!vm.edit_row("nope", |row| row.total_price = 1.0));
    }

    #[test]
    fn test_new_and_duplicated_rows_get_fresh_identity() {
        let f = Fixture::new();
        let vm = f.section::<FoodCard>(1);
        let _mount = vm.mount();

        let id = vm.add_row(food("Ramen"));
        assert!(!id.is_empty());
        let copy = vm.duplicate_row(&id).unwrap();
        assert_ne!(copy, id);

        let rows = vm.state().get_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].id, copy);
        assert_eq!(rows[1].name, "Ramen");
        assert!(rows[0].created_at > 0);
        assert_eq!(draft_ids(&f, SectionKind::Food), vec![id, copy]);
        assert_eq!(vm.duplicate_row("nope"), None);
    }

    #[test]
    fn test_autosave_flushes_and_clears_draft() {
        let f = Fixture::new();
        let vm = f.section::<AccommodationRow>(2);
        let _mount = vm.mount();
        vm.add_row(stay("a1", 300.0, 1));

        let outcome = block_on(vm.autosave_tick());
        assert_eq!(outcome, FlushOutcome::Saved { rows: 1 });
        assert!(!f.sync.drafts().has_draft("T1", SectionKind::Accommodation));
        assert!(!vm.state().get_showing_draft());
        assert_eq!(f.store.documents_in(ACCOMMODATION).len(), 1);
    }

    #[test]
    fn test_failed_autosave_keeps_draft() {
        let f = Fixture::new();
        f.store.fail_writes_under(ACCOMMODATION);
        let vm = f.section::<AccommodationRow>(2);
        let _mount = vm.mount();
        vm.add_row(stay("a1", 300.0, 1));

        let outcome = block_on(vm.autosave_tick());
        assert!(matches!(outcome, FlushOutcome::Failed(_)));
        assert!(f.sync.drafts().has_draft("T1", SectionKind::Accommodation));
        assert!(vm.state().get_showing_draft());
    }

    #[test]
    fn test_delete_removes_row_everywhere_with_one_remote_call() {
        let f = Fixture::new();
        let vm = f.section::<AccommodationRow>(2);
        let _mount = vm.mount();
        vm.add_row(stay("a1", 300.0, 1));
        vm.add_row(stay("a2", 150.0, 2));
        block_on(vm.autosave_tick());

        // Edición pendiente de flush mientras se borra
        vm.edit_row("a2", |row| row.notes = "vistas al mar".to_string());

        vm.request_delete("a1");
        assert_eq!(vm.state().get_pending_delete().as_deref(), Some("a1"));
        block_on(vm.confirm_delete()).unwrap();

        let ids: Vec<String> = vm.display_rows().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["a2".to_string()]);
        assert_eq!(draft_ids(&f, SectionKind::Accommodation), vec!["a2".to_string()]);
        assert_eq!(f.store.delete_calls(), vec![format!("{}/a1", ACCOMMODATION)]);
        assert_eq!(vm.state().get_pending_delete(), None);

        block_on(vm.autosave_tick());
        assert_eq!(f.store.delete_calls().len(), 1);
        assert!(f.store.document(&format!("{}/a1", ACCOMMODATION)).is_none());
    }

    #[test]
    fn test_cancelled_delete_and_remote_error() {
        let f = Fixture::new();
        let vm = f.section::<AccommodationRow>(2);
        let _mount = vm.mount();
        vm.add_row(stay("a1", 300.0, 1));

        vm.request_delete("a1");
        vm.cancel_delete();
        block_on(vm.confirm_delete()).unwrap();
        assert_eq!(vm.display_rows().len(), 1);
        assert!(f.store.delete_calls().is_empty());

        f.store.fail_writes_under(ACCOMMODATION);
        vm.request_delete("a1");
        let err = block_on(vm.confirm_delete()).unwrap_err();
        assert!(matches!(err, SyncError::RemoteWrite(_)));
        assert!(vm.display_rows().is_empty());
    }

    #[test]
    fn test_quota_keeps_rows_in_memory_and_autosave_writes_them() {
        let f = Fixture::with_scratch(MemoryScratchSpace::with_capacity(40));
        let vm = f.section::<AccommodationRow>(2);
        let _mount = vm.mount();

        vm.add_row(stay("a1", 300.0, 1));
        assert_eq!(vm.display_rows().len(), 1);
        assert!(vm.state().get_unsaved_in_memory());
        assert!(vm.state().get_storage_warning().is_some());

        let outcome = block_on(vm.autosave_tick());
        assert_eq!(outcome, FlushOutcome::Saved { rows: 1 });
        assert!(!vm.state().get_unsaved_in_memory());
        assert!(vm.state().get_storage_warning().is_none());
        assert_eq!(f.store.documents_in(ACCOMMODATION).len(), 1);
    }

    #[test]
    fn test_sort_cycle_on_section() {
        let f = Fixture::new();
        let vm = f.section::<AccommodationRow>(1);
        let _mount = vm.mount();
        vm.add_row(stay("b", 200.0, 1));
        vm.add_row(stay("c", 100.0, 2));
        vm.add_row(stay("a", 300.0, 3));

        let ids = |vm: &SectionViewModel<AccommodationRow>| -> Vec<String> {
            vm.display_rows().iter().map(|r| r.id.clone()).collect()
        };
        assert_eq!(ids(&vm), ["b", "c", "a"]);
        vm.sort_by(SortColumn::Price);
        assert_eq!(ids(&vm), ["c", "b", "a"]);
        vm.sort_by(SortColumn::Price);
        assert_eq!(ids(&vm), ["a", "b", "c"]);
        vm.sort_by(SortColumn::Price);
        assert_eq!(vm.active_sort().active_column(), None);
        assert_eq!(ids(&vm), ["b", "c", "a"]);
    }

    #[test]
    fn test_dropping_mount_stops_listening_but_keeps_draft() {
        let f = Fixture::new();
        let vm = f.section::<AccommodationRow>(2);
        let mount = vm.mount();
        assert_eq!(f.store.listener_count(), 1);
        assert!(!mount.is_autosaving());
        vm.add_row(stay("a1", 300.0, 1));

        drop(mount);
        assert_eq!(f.store.listener_count(), 0);
        assert!(f.sync.drafts().has_draft("T1", SectionKind::Accommodation));
    }

    #[test]
    fn test_unauthenticated_section_shows_error() {
        let f = Fixture::new();
        f.auth.logout();
        let vm = f.section::<AccommodationRow>(2);
        let _mount = vm.mount();
        assert!(vm.state().get_error().is_some());
        assert!(!vm.state().get_loading());
    }

    #[test]
    fn test_failed_draft_write_never_resurrects_older_values() {
        let f = Fixture::with_scratch(MemoryScratchSpace::with_capacity(1000));
        let vm = f.section::<AccommodationRow>(1);
        let mount = vm.mount();
        vm.add_row(stay("a1", 100.0, 1));
        assert!(f.sync.drafts().has_draft("T1", SectionKind::Accommodation));

        // Esta edición ya no cabe en localStorage
        vm.edit_row("a1", |row| {
            row.total_price = 999.0;
            row.notes = "x".repeat(1000);
        });
        assert!(vm.state().get_unsaved_in_memory());
        assert!(!f.sync.drafts().has_draft("T1", SectionKind::Accommodation));

        let outcome = block_on(vm.autosave_tick());
        assert_eq!(outcome, FlushOutcome::Saved { rows: 1 });
        assert!(!vm.state().get_unsaved_in_memory());

        block_on(GlobalSweep::new(f.sync.clone()).sweep_once());
        let stored = f.store.document(&format!("{}/a1", ACCOMMODATION)).unwrap();
        assert_eq!(stored.get("totalPrice"), Some(&json!(999.0)));

        drop(mount);
        let again = f.section::<AccommodationRow>(1);
        let _mount = again.mount();
        assert!(!again.state().get_showing_draft());
        assert_eq!(again.display_rows()[0].total_price, 999.0);
    }

    #[test]
    fn test_delete_during_in_flight_flush_is_not_undone() {
        let f = Fixture::new();
        let vm = f.section::<AccommodationRow>(2);
        let _mount = vm.mount();
        vm.add_row(stay("a1", 300.0, 1));
        vm.add_row(stay("a2", 150.0, 2));

        let mut pool = LocalPool::new();
        let spawner = pool.spawner();

        // Flush con a1 dentro, detenido antes de aplicar el lote
        f.store.hold_commits();
        let flushing = vm.clone();
        spawner
            .spawn_local(async move {
                flushing.autosave_tick().await;
            })
            .unwrap();
        pool.run_until_stalled();
        assert_eq!(
            f.sync.tracker().state("T1", SectionKind::Accommodation),
            FlushState::Flushing
        );

        vm.request_delete("a1");
        let result = Rc::new(RefCell::new(None));
        let sink = result.clone();
        let deleting = vm.clone();
        spawner
            .spawn_local(async move {
                let outcome = deleting.confirm_delete().await;
                *sink.borrow_mut() = Some(outcome);
            })
            .unwrap();
        pool.run_until_stalled();

        let ids: Vec<String> = vm.display_rows().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["a2".to_string()]);
        assert!(f.store.delete_calls().is_empty());

        f.store.release_commits();
        pool.run_until_stalled();

        assert_eq!(*result.borrow(), Some(Ok(())));
        assert_eq!(f.store.delete_calls(), vec![format!("{}/a1", ACCOMMODATION)]);
        assert!(f.store.document(&format!("{}/a1", ACCOMMODATION)).is_none());
        assert!(f.store.document(&format!("{}/a2", ACCOMMODATION)).is_some());

        // El borrador pendiente ya no lleva a1
        block_on(vm.autosave_tick());
        assert!(f.store.document(&format!("{}/a1", ACCOMMODATION)).is_none());
    }

    #[test]
    fn test_undecodable_remote_rows_are_reported() {
        let f = Fixture::new();
        f.store.insert_document(
            &format!("{}/a1", ACCOMMODATION),
            serde_json::to_value(stay("a1", 300.0, 1)).unwrap().as_object().cloned().unwrap(),
        );
        f.store.insert_document(
            &format!("{}/a2", ACCOMMODATION),
            json!({"id": "a2", "totalPrice": "trescientos"}).as_object().cloned().unwrap(),
        );
        let vm = f.section::<AccommodationRow>(2);
        let _mount = vm.mount();

        assert_eq!(vm.display_rows().len(), 1);
        assert!(vm.state().get_error().unwrap().contains("1 filas"));

        f.store.insert_document(
            &format!("{}/a2", ACCOMMODATION),
            json!({"id": "a2", "totalPrice": 300}).as_object().cloned().unwrap(),
        );
        assert_eq!(vm.display_rows().len(), 2);
        assert_eq!(vm.state().get_error(), None);
    }
}
