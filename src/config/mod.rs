use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub collection: CollectionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// None means no client-side timeout; the transport default applies
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub validate_on_boot: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub default_page_size: usize,
    pub rollback_failed_delete: bool,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("VET_API_URL") {
            if !v.trim().is_empty() {
                self.api.base_url = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("VET_REQUEST_TIMEOUT_SECS") {
            // "0" disables the timeout
            self.api.request_timeout_secs = v.parse::<u64>().ok().filter(|secs| *secs > 0);
        }

        if let Ok(v) = env::var("VET_VALIDATE_SESSION_ON_BOOT") {
            self.session.validate_on_boot = v.parse().unwrap_or(self.session.validate_on_boot);
        }

        if let Ok(v) = env::var("VET_PAGE_SIZE") {
            self.collection.default_page_size = v
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .unwrap_or(self.collection.default_page_size);
        }
        if let Ok(v) = env::var("VET_ROLLBACK_FAILED_DELETE") {
            self.collection.rollback_failed_delete = v.parse().unwrap_or(self.collection.rollback_failed_delete);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_url: "http://localhost:8000/api".to_string(),
                request_timeout_secs: None,
            },
            session: SessionConfig { validate_on_boot: true },
            collection: CollectionConfig {
                default_page_size: 5,
                rollback_failed_delete: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                base_url: "https://staging.vetclinic.example.com/api".to_string(),
                request_timeout_secs: Some(30),
            },
            session: SessionConfig { validate_on_boot: true },
            collection: CollectionConfig {
                default_page_size: 5,
                rollback_failed_delete: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_url: "https://vetclinic.example.com/api".to_string(),
                request_timeout_secs: Some(15),
            },
            session: SessionConfig { validate_on_boot: true },
            collection: CollectionConfig {
                default_page_size: 5,
                rollback_failed_delete: true,
            },
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::development()
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<ClientConfig> = Lazy::new(ClientConfig::from_env);

pub fn config() -> &'static ClientConfig {
    &CONFIG
}
