pub mod credential;
pub mod envelope;
pub mod http;
pub mod transport;

pub use credential::CredentialProvider;
pub use http::HttpTransport;
pub use transport::{ApiRequest, Method, Transport};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::principal::{AuthResponse, LoginRequest, RegisterProfile};
use crate::models::{Entity, EntityId};

/// REST client for the clinic backend.
///
/// Cheap to clone; every clone shares the transport and the credential slot.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    credentials: CredentialProvider,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, credentials: CredentialProvider) -> Self {
        Self { transport, credentials }
    }

    pub fn credentials(&self) -> &CredentialProvider {
        &self.credentials
    }

    /// Attach the current credential and send. The credential is read here, at send time.
    pub async fn send(&self, mut request: ApiRequest) -> Result<Value, ApiError> {
        request.authorization = self.credentials.authorization();
        tracing::debug!(
            "{} {} (authorized: {})",
            request.method,
            request.path,
            request.authorization.is_some()
        );
        self.transport.send(request).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let payload = serde_json::to_value(LoginRequest { email, password })?;
        let body = self.send(ApiRequest::new(Method::Post, "/login").with_body(payload)).await?;
        decode_auth(body)
    }

    pub async fn register(&self, profile: &RegisterProfile) -> Result<AuthResponse, ApiError> {
        let payload = serde_json::to_value(profile)?;
        let body = self.send(ApiRequest::new(Method::Post, "/register").with_body(payload)).await?;
        decode_auth(body)
    }

    /// Fetch the user behind the attached credential
    pub async fn me<U: DeserializeOwned>(&self) -> Result<U, ApiError> {
        let body = self.send(ApiRequest::new(Method::Get, "/me")).await?;
        envelope::decode_item(body)
    }

    pub async fn list<T: Entity>(&self, query: Vec<(String, String)>) -> Result<Vec<T>, ApiError> {
        let request = ApiRequest::new(Method::Get, collection_path::<T>()).with_query(query);
        envelope::decode_collection(self.send(request).await?)
    }

    pub async fn create<T: Entity>(&self, fields: Value) -> Result<T, ApiError> {
        let request = ApiRequest::new(Method::Post, collection_path::<T>()).with_body(fields);
        envelope::decode_item(self.send(request).await?)
    }

    pub async fn update<T: Entity>(&self, id: EntityId, fields: Value) -> Result<T, ApiError> {
        let request = ApiRequest::new(Method::Put, record_path::<T>(id)).with_body(fields);
        envelope::decode_item(self.send(request).await?)
    }

    pub async fn delete<T: Entity>(&self, id: EntityId) -> Result<(), ApiError> {
        self.send(ApiRequest::new(Method::Delete, record_path::<T>(id))).await?;
        Ok(())
    }
}

fn collection_path<T: Entity>() -> String {
    format!("/{}", T::COLLECTION)
}

fn record_path<T: Entity>(id: EntityId) -> String {
    format!("/{}/{}", T::COLLECTION, id)
}

fn decode_auth(body: Value) -> Result<AuthResponse, ApiError> {
    // Some deployments wrap the auth payload in a data envelope as well
    let body = envelope::unwrap_item(body)?;
    serde_json::from_value(body).map_err(|e| ApiError::decode(format!("malformed auth response: {}", e)))
}
