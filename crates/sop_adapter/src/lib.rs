#![forbid(unsafe_code)]

use std::env;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use sop_engines::sopgen::{GeneratorError, SopGenProviderConfig, TextGenerator};
use sop_kernel_contracts::sop::{SopDraft, SopRecord};
use sop_kernel_contracts::sopgen::SopGenMode;
use sop_storage::query::{self, QueryCommand, QueryParam, QueryResult};
use sop_storage::store::{SopStore, StorageError};

pub mod http;

pub mod app_ui_assets {
    pub const APP_HTML: &str = include_str!("web/app.html");
    pub const APP_CSS: &str = include_str!("web/app.css");
    pub const APP_JS: &str = include_str!("web/app.js");
}

pub const LIVENESS_TEXT: &str = "Backend running fine and CORS open.";
pub const DELETE_OK_MESSAGE: &str = "SOP deleted successfully";

const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("storage query failed: {0}")]
    Storage(#[from] StorageError),
    #[error("sop store lock poisoned")]
    LockPoisoned,
    #[error("insert returned no rows")]
    EmptyInsert,
    #[error("AI not connected")]
    AiNotConnected,
    #[error("text generator setup failed: {0}")]
    Generator(#[from] GeneratorError),
    #[error("invalid {key}: {reason}")]
    Config { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AdapterHealthResponse {
    pub status: String,
    pub record_count: usize,
    pub ai_enabled: bool,
    pub ai_mode: SopGenMode,
}

/// Process-level settings read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    pub bind_addr: SocketAddr,
    pub seed_store: bool,
    pub log_json: bool,
}

impl AdapterConfig {
    pub fn from_env() -> Result<Self, AdapterError> {
        Self::from_env_var_map(|key| env::var(key).ok())
    }

    pub fn from_env_var_map<F>(lookup: F) -> Result<Self, AdapterError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT").map(|v| v.trim().to_string()) {
            Some(raw) if !raw.is_empty() => raw.parse::<u16>().map_err(|_| AdapterError::Config {
                key: "PORT",
                reason: format!("not a port number: {raw}"),
            })?,
            _ => DEFAULT_PORT,
        };
        let bind_addr = match lookup("SOP_HTTP_BIND").map(|v| v.trim().to_string()) {
            Some(raw) if !raw.is_empty() => {
                raw.parse::<SocketAddr>()
                    .map_err(|_| AdapterError::Config {
                        key: "SOP_HTTP_BIND",
                        reason: format!("not a socket address: {raw}"),
                    })?
            }
            _ => SocketAddr::from(([0, 0, 0, 0], port)),
        };
        Ok(Self {
            bind_addr,
            seed_store: parse_flag(lookup("SOP_STORE_SEED"), true),
            log_json: parse_flag(lookup("SOP_LOG_JSON"), false),
        })
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            seed_store: true,
            log_json: false,
        }
    }
}

fn parse_flag(raw: Option<String>, default: bool) -> bool {
    match raw.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => !matches!(
            v.to_ascii_lowercase().as_str(),
            "0" | "false" | "off" | "no"
        ),
        None => default,
    }
}

/// Composition root: owns the record store and the text generator.
///
/// Cloning shares the same store; every store access goes through the query
/// dispatcher while holding the store mutex.
#[derive(Debug, Clone)]
pub struct AdapterRuntime {
    store: Arc<Mutex<SopStore>>,
    generator: Arc<TextGenerator>,
}

impl Default for AdapterRuntime {
    fn default() -> Self {
        Self::new(SopStore::new_seeded(), TextGenerator::Disabled)
    }
}

impl AdapterRuntime {
    pub fn new(store: SopStore, generator: TextGenerator) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            generator: Arc::new(generator),
        }
    }

    pub fn from_config(
        config: &AdapterConfig,
        provider_config: SopGenProviderConfig,
    ) -> Result<Self, AdapterError> {
        let store = if config.seed_store {
            SopStore::new_seeded()
        } else {
            SopStore::new_in_memory()
        };
        let generator = TextGenerator::from_provider_config(provider_config)?;
        Ok(Self::new(store, generator))
    }

    pub fn ai_mode(&self) -> SopGenMode {
        self.generator.mode()
    }

    pub fn list_sops(&self) -> Result<Vec<SopRecord>, AdapterError> {
        Ok(self.run_query(QueryCommand::Select, &[])?.rows)
    }

    pub fn create_sop(&self, draft: SopDraft) -> Result<SopRecord, AdapterError> {
        let params: [QueryParam; 2] = [draft.title.into(), draft.description.into()];
        self.run_query(QueryCommand::Insert, &params)?
            .into_first()
            .ok_or(AdapterError::EmptyInsert)
    }

    /// `raw_id` is the unparsed path segment; `Ok(None)` means no such SOP.
    pub fn update_sop(
        &self,
        raw_id: &str,
        draft: SopDraft,
    ) -> Result<Option<SopRecord>, AdapterError> {
        let params: [QueryParam; 3] = [
            draft.title.into(),
            draft.description.into(),
            QueryParam::from(raw_id),
        ];
        Ok(self.run_query(QueryCommand::Update, &params)?.into_first())
    }

    pub fn delete_sop(&self, raw_id: &str) -> Result<Option<SopRecord>, AdapterError> {
        let params = [QueryParam::from(raw_id)];
        Ok(self.run_query(QueryCommand::Delete, &params)?.into_first())
    }

    /// Blocking when the generator is live; call from a blocking context.
    pub fn generate_sop(&self, raw_text: &str) -> Result<String, AdapterError> {
        if !self.generator.is_enabled() {
            return Err(AdapterError::AiNotConnected);
        }
        Ok(self.generator.generate_sop(raw_text))
    }

    pub fn health_report(&self) -> Result<AdapterHealthResponse, AdapterError> {
        let record_count = self
            .store
            .lock()
            .map_err(|_| AdapterError::LockPoisoned)?
            .len();
        Ok(AdapterHealthResponse {
            status: "ok".to_string(),
            record_count,
            ai_enabled: self.generator.is_enabled(),
            ai_mode: self.generator.mode(),
        })
    }

    fn run_query(
        &self,
        command: QueryCommand,
        params: &[QueryParam],
    ) -> Result<QueryResult, AdapterError> {
        let mut store = self.store.lock().map_err(|_| AdapterError::LockPoisoned)?;
        Ok(query::execute(&mut *store, command, params)?)
    }
}

#[cfg(test)]
impl AdapterRuntime {
    /// Leaves the store mutex poisoned by panicking while holding it.
    pub(crate) fn poison_store(&self) {
        let store = Arc::clone(&self.store);
        let _ = std::thread::spawn(move || {
            let _guard = store.lock().unwrap();
            panic!("store writer died mid-request");
        })
        .join();
    }
}
