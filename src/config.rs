use serde::{Deserialize, Serialize};

use crate::utils::constants::{
    DEFAULT_FIRESTORE_API_URL, SECTION_FLUSH_INTERVAL_MS, SUBSCRIPTION_POLL_INTERVAL_MS,
    SWEEP_INTERVAL_MS,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub enable_logging: bool,
    pub firestore: FirestoreConfig,
    pub timers: TimerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            enable_logging: true,
            firestore: FirestoreConfig::default(),
            timers: TimerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub api_url: String,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            api_url: DEFAULT_FIRESTORE_API_URL.to_string(),
        }
    }
}

impl FirestoreConfig {
    /// Raíz de documentos: `{api_url}/projects/{id}/databases/(default)/documents`
    pub fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.api_url.trim_end_matches('/'),
            self.project_id
        )
    }

    /// Nombre completo de un documento tal como lo espera `:commit`
    pub fn document_name(&self, path: &str) -> String {
        format!(
            "projects/{}/databases/(default)/documents/{}",
            self.project_id,
            path.trim_start_matches('/')
        )
    }
}

/// Periodos de los temporizadores (milisegundos)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    pub section_flush_interval_ms: u32,
    pub sweep_interval_ms: u32,
    pub subscription_poll_interval_ms: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            section_flush_interval_ms: SECTION_FLUSH_INTERVAL_MS,
            sweep_interval_ms: SWEEP_INTERVAL_MS,
            subscription_poll_interval_ms: SUBSCRIPTION_POLL_INTERVAL_MS,
        }
    }
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno en tiempo de compilación
    pub fn from_env() -> Self {
        Self {
            environment: option_env!("ENVIRONMENT")
                .unwrap_or("development").to_string(),
            enable_logging: option_env!("ENABLE_LOGGING")
                .unwrap_or("true").parse().unwrap_or(true),
            firestore: FirestoreConfig {
                project_id: option_env!("FIRESTORE_PROJECT_ID")
                    .unwrap_or("").to_string(),
                api_url: option_env!("FIRESTORE_API_URL")
                    .unwrap_or(DEFAULT_FIRESTORE_API_URL).to_string(),
            },
            timers: TimerConfig {
                section_flush_interval_ms: option_env!("SECTION_FLUSH_INTERVAL_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(SECTION_FLUSH_INTERVAL_MS),
                sweep_interval_ms: option_env!("SWEEP_INTERVAL_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(SWEEP_INTERVAL_MS),
                subscription_poll_interval_ms: option_env!("SUBSCRIPTION_POLL_INTERVAL_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(SUBSCRIPTION_POLL_INTERVAL_MS),
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Verifica si el modo de logging está habilitado
    pub fn is_logging_enabled(&self) -> bool {
        self.enable_logging
    }
}

// Configuración global estática
lazy_static::lazy_static! {
    pub static ref CONFIG: AppConfig = AppConfig::from_env();
}
