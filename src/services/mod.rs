pub mod remote_store;
pub mod memory_store;
pub mod firestore;
pub mod draft_store;
pub mod remote_writer;
pub mod draft_sync_service;
pub mod section_source;
pub mod trip_service;

pub use remote_store::{DocumentWrite, RemoteStore, SnapshotListener, Subscription};
pub use memory_store::{MemoryRemoteStore, StoreCall};
pub use firestore::FirestoreClient;
pub use draft_store::{draft_key, DraftStore};
pub use remote_writer::RemoteWriter;
pub use draft_sync_service::{DraftSyncService, FlushOutcome};
pub use section_source::{SectionSnapshot, SectionSource, SectionSubscription};
pub use trip_service::TripService;
