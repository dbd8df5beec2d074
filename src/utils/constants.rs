/// Periodo del autosave de cada sección montada
pub const SECTION_FLUSH_INTERVAL_MS: u32 = 5 * 60 * 1000; // 5 minutos

/// Periodo del barrido global de viajes con borradores
pub const SWEEP_INTERVAL_MS: u32 = 60 * 1000; // 1 minuto

/// Periodo de consulta para las suscripciones sobre REST
pub const SUBSCRIPTION_POLL_INTERVAL_MS: u32 = 15 * 1000;

/// URL base de la API REST de Firestore.
/// Se puede sobreescribir con FIRESTORE_API_URL (p. ej. el emulador local).
pub const DEFAULT_FIRESTORE_API_URL: &str = "https://firestore.googleapis.com/v1";

/// Prefijo de las claves de borrador: `unsaved-<sección>-<tripId>`
pub const DRAFT_KEY_PREFIX: &str = "unsaved";

/// Clave del índice de viajes con borradores pendientes
pub const UNSAVED_TRIPS_KEY: &str = "unsaved-trips";

/// Prefijo bajo el que se apartan los borradores ilegibles
pub const CORRUPT_KEY_PREFIX: &str = "corrupt";

/// Tamaño de página al listar colecciones
pub const LIST_PAGE_SIZE: u32 = 300;
