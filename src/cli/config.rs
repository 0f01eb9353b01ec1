use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::{ApiClient, CredentialProvider, HttpTransport};
use crate::config::config;
use crate::notify::Notifier;
use crate::session::{FileTokenStore, SessionOptions, SessionStore};

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("VET_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("vet").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn token_store() -> anyhow::Result<FileTokenStore> {
    Ok(FileTokenStore::in_dir(get_config_dir()?))
}

/// Boot a session against the configured server with the persisted credential
pub async fn open_session(notifier: Arc<dyn Notifier>) -> anyhow::Result<SessionStore> {
    let cfg = config();
    let transport = HttpTransport::from_config(&cfg.api)?;
    let client = ApiClient::new(Arc::new(transport), CredentialProvider::new());

    let store = SessionStore::boot(
        client,
        Arc::new(token_store()?),
        notifier,
        SessionOptions::from(&cfg.session),
    );
    store.resolve().await;
    Ok(store)
}
