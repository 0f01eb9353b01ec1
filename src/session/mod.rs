pub mod token_store;

pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::api::ApiClient;
use crate::collection::{CollectionController, ControllerOptions};
use crate::config::SessionConfig;
use crate::error::ApiError;
use crate::models::principal::{RegisterProfile, UserProfile};
use crate::models::{Entity, Principal};
use crate::notify::{Notification, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Resolving,
    Authenticated,
    Anonymous,
}

/// Last auth failure, shaped for the form that caused it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SessionError {
    Message(String),
    /// Registration rejections annotate individual inputs
    Fields {
        message: String,
        fields: HashMap<String, String>,
    },
}

impl SessionError {
    fn from_api(err: &ApiError) -> Self {
        match err.field_errors() {
            Some(fields) => SessionError::Fields {
                message: err.message(),
                fields: fields.clone(),
            },
            None => SessionError::Message(err.message()),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SessionError::Message(m) => m,
            SessionError::Fields { message, .. } => message,
        }
    }
}

/// Snapshot of the authentication lifecycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub principal: Option<Principal>,
    pub status: SessionStatus,
    pub last_error: Option<SessionError>,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Round-trip `/me` before trusting a persisted credential
    pub validate_on_boot: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { validate_on_boot: true }
    }
}

impl From<&SessionConfig> for SessionOptions {
    fn from(config: &SessionConfig) -> Self {
        Self { validate_on_boot: config.validate_on_boot }
    }
}

/// Single source of truth for who is signed in.
///
/// Owns the only writer of the shared bearer credential: `login`, `register`
/// and `logout` attach or detach it for every request made through the client.
pub struct SessionStore {
    client: ApiClient,
    tokens: Arc<dyn TokenStore>,
    notifier: Arc<dyn Notifier>,
    options: SessionOptions,
    session: RwLock<Session>,
}

impl SessionStore {
    /// Start a session. A persisted credential is attached right away and the
    /// session stays `Resolving` until `resolve` runs; otherwise it starts `Anonymous`.
    pub fn boot(
        client: ApiClient,
        tokens: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
        options: SessionOptions,
    ) -> Self {
        let persisted = tokens.load().unwrap_or_else(|e| {
            tracing::warn!("Could not read persisted credential: {}", e);
            None
        });

        let status = match persisted {
            Some(token) => {
                client.credentials().set(token);
                SessionStatus::Resolving
            }
            None => {
                client.credentials().clear();
                SessionStatus::Anonymous
            }
        };
        tracing::debug!("Session booted as {:?}", status);

        Self {
            client,
            tokens,
            notifier,
            options,
            session: RwLock::new(Session {
                principal: None,
                status,
                last_error: None,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.read().status
    }

    pub fn principal(&self) -> Option<Principal> {
        self.read().principal.clone()
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.read().last_error.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    /// Finish boot. Never returns to `Resolving`; a no-op once resolved.
    pub async fn resolve(&self) -> SessionStatus {
        if self.status() != SessionStatus::Resolving {
            return self.status();
        }

        if !self.options.validate_on_boot {
            // A bare token cannot back a principal; keep it attached but stay anonymous
            self.settle(None, None);
            return self.status();
        }

        let Some(token) = self.client.credentials().get() else {
            self.settle(None, None);
            return self.status();
        };

        match self.client.me::<UserProfile>().await {
            Ok(profile) => {
                let principal = Principal::new(profile, token);
                let (email, role) = (principal.email.clone(), principal.role());
                if self.settle(Some(principal), None) {
                    tracing::info!("Session restored for {} ({})", email, role);
                }
            }
            Err(err @ (ApiError::Auth { .. } | ApiError::NotFound(_) | ApiError::Forbidden(_))) => {
                if self.settle(None, Some(true)) {
                    tracing::warn!("Persisted credential rejected: {}", err);
                }
            }
            Err(err) => {
                // Server unreachable; keep the stored credential for the next boot
                if self.settle(None, Some(false)) {
                    tracing::warn!("Could not validate persisted credential: {}", err);
                    self.notifier.notify(Notification::error(format!(
                        "Could not restore your session: {}",
                        err.message()
                    )));
                }
            }
        }
        self.status()
    }

    /// Apply a resolve outcome unless login/register/logout already settled the session.
    ///
    /// `detach` drops the in-memory credential under the same lock, and the
    /// persisted copy too when `Some(true)`. Returns whether the outcome applied.
    fn settle(&self, principal: Option<Principal>, detach: Option<bool>) -> bool {
        let mut session = self.write();
        if session.status != SessionStatus::Resolving {
            tracing::debug!("Session already settled, discarding boot validation result");
            return false;
        }
        if let Some(forget_persisted) = detach {
            self.detach_credential(forget_persisted);
        }
        session.status = if principal.is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Anonymous
        };
        session.principal = principal;
        true
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Principal, ApiError> {
        let result = self.client.login(email, password).await;
        self.complete_auth(result, "Signed in")
    }

    pub async fn register(&self, profile: &RegisterProfile) -> Result<Principal, ApiError> {
        let result = self.client.register(profile).await;
        self.complete_auth(result, "Account created")
    }

    fn complete_auth(
        &self,
        result: Result<crate::models::principal::AuthResponse, ApiError>,
        verb: &str,
    ) -> Result<Principal, ApiError> {
        match result {
            Ok(response) => {
                let principal = Principal::from_auth(response);
                {
                    // Credential and session change together so a pending resolve cannot split them
                    let mut session = self.write();
                    self.client.credentials().set(principal.token());
                    if let Err(e) = self.tokens.save(principal.token()) {
                        tracing::warn!("Could not persist credential: {}", e);
                    }
                    session.principal = Some(principal.clone());
                    session.status = SessionStatus::Authenticated;
                    session.last_error = None;
                }
                tracing::info!("{} as {} ({})", verb, principal.email, principal.role());
                self.notifier.notify(Notification::success(format!("{} as {}", verb, principal.name)));
                Ok(principal)
            }
            Err(err) => {
                let err = err.into_auth();
                {
                    let mut session = self.write();
                    self.detach_credential(true);
                    session.principal = None;
                    session.status = SessionStatus::Anonymous;
                    session.last_error = Some(SessionError::from_api(&err));
                }
                self.notifier.notify(Notification::error(err.message()));
                Err(err)
            }
        }
    }

    /// Drop the credential and principal. Never fails; a no-op without a session.
    pub fn logout(&self) {
        let had_session = {
            let mut session = self.write();
            let had = session.principal.is_some() || self.client.credentials().is_set();
            session.principal = None;
            session.status = SessionStatus::Anonymous;
            session.last_error = None;
            self.detach_credential(true);
            had
        };
        if had_session {
            tracing::info!("Signed out");
            self.notifier.notify(Notification::info("Signed out"));
        }
    }

    fn detach_credential(&self, forget_persisted: bool) {
        self.client.credentials().clear();
        if forget_persisted {
            if let Err(e) = self.tokens.clear() {
                tracing::warn!("Could not clear persisted credential: {}", e);
            }
        }
    }

    /// Controller for `T`, scoped to the signed-in principal's role
    pub fn controller<T: Entity>(&self, options: ControllerOptions) -> Result<CollectionController<T>, ApiError> {
        let principal = self
            .principal()
            .ok_or_else(|| ApiError::auth("You need to sign in first"))?;
        Ok(CollectionController::for_principal(
            self.client.clone(),
            &principal,
            Arc::clone(&self.notifier),
            options,
        ))
    }
}
