use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::types::Role;

/// The authenticated identity behind a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    role: Role,
    #[serde(skip_serializing, default)]
    token: String,
}

impl Principal {
    pub fn new(profile: UserProfile, token: impl Into<String>) -> Self {
        Self {
            id: profile.id,
            name: profile.display_name(),
            email: profile.email,
            role: profile.role,
            token: token.into(),
        }
    }

    pub fn from_auth(response: AuthResponse) -> Self {
        Self::new(response.user, response.token)
    }

    /// Role cannot change without re-authenticating, so there is no setter
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// User record as returned by `/login`, `/register` and `/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
    pub role: Role,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            self.email.clone()
        } else {
            joined
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Account creation payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_confirmation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}
