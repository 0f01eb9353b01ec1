use std::sync::{Arc, RwLock};

/// Bearer credential shared by every outgoing request.
///
/// Only the session store writes it (login, register, logout). Requests read it
/// at send time, so a credential change takes effect on the very next request.
#[derive(Debug, Clone, Default)]
pub struct CredentialProvider {
    token: Arc<RwLock<Option<String>>>,
}

impl CredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let provider = Self::new();
        provider.set(token);
        provider
    }

    pub fn get(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    pub fn set(&self, token: impl Into<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }

    /// Value for the `Authorization` header, if a credential is attached
    pub fn authorization(&self) -> Option<String> {
        self.get().map(|t| format!("Bearer {}", t))
    }
}
