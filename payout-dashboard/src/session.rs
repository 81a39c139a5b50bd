//! Session store: the signed-in user and their bearer token.
//!
//! Both values are persisted under two well-known keys. A session only counts
//! as restored when both keys are present and the user parses. Reading the
//! keys is an explicit hydration step, so callers can tell "not loaded yet"
//! apart from "signed out" and never redirect before storage has been read.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use dashboard_core::error::AppError;
use secrecy::Secret;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tower_sessions::Session;

use crate::models::User;
use crate::services::payout_api::{ApiError, PayoutApiClient};
use crate::validation::LoginCredentials;

pub const TOKEN_KEY: &str = "payout_token";
pub const USER_KEY: &str = "payout_user";
/// One-shot banner message shown on the next rendered page.
pub const FLASH_KEY: &str = "payout_flash";

#[derive(Debug, Error)]
#[error("session storage failed: {0}")]
pub struct SessionError(pub String);

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::SessionError(err.0)
    }
}

#[derive(Debug, Error)]
pub enum LoginFailure {
    #[error(transparent)]
    Rejected(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] SessionError),
}

/// Durable string storage behind a session.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>, SessionError>;
    async fn write(&self, key: &str, value: String) -> Result<(), SessionError>;
    async fn delete(&self, key: &str) -> Result<(), SessionError>;
}

#[async_trait]
impl SessionStorage for Session {
    async fn read(&self, key: &str) -> Result<Option<String>, SessionError> {
        self.get::<String>(key)
            .await
            .map_err(|e| SessionError(e.to_string()))
    }

    async fn write(&self, key: &str, value: String) -> Result<(), SessionError> {
        self.insert(key, value)
            .await
            .map_err(|e| SessionError(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), SessionError> {
        self.remove::<String>(key)
            .await
            .map(|_| ())
            .map_err(|e| SessionError(e.to_string()))
    }
}

/// In-process storage for tools and tests.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, SessionError> {
        self.values
            .lock()
            .map_err(|_| SessionError("memory storage poisoned".to_string()))
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn write(&self, key: &str, value: String) -> Result<(), SessionError> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SessionError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub enum TokenState {
    /// Storage has not been read yet.
    #[default]
    Undetermined,
    Absent,
    Present(Secret<String>),
}

pub struct SessionContext<S> {
    storage: S,
    token: TokenState,
    user: Option<User>,
}

impl<S: SessionStorage> SessionContext<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            token: TokenState::Undetermined,
            user: None,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn token_state(&self) -> &TokenState {
        &self.token
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Read the persisted token and user and resolve the token state.
    pub async fn hydrate(&mut self) -> Result<&TokenState, SessionError> {
        let token = self.storage.read(TOKEN_KEY).await?;
        let user = self.storage.read(USER_KEY).await?;

        let restored = match (token, user) {
            (Some(token), Some(user_json)) if !token.is_empty() => {
                match serde_json::from_str::<User>(&user_json) {
                    Ok(user) => Some((token, user)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Discarding unreadable persisted user");
                        None
                    }
                }
            }
            _ => None,
        };

        match restored {
            Some((token, user)) => {
                self.token = TokenState::Present(Secret::new(token));
                self.user = Some(user);
            }
            None => {
                self.token = TokenState::Absent;
                self.user = None;
            }
        }
        Ok(&self.token)
    }

    /// The user and token, once hydration found both.
    pub fn authenticated(&self) -> Option<(User, Secret<String>)> {
        match (&self.token, &self.user) {
            (TokenState::Present(token), Some(user)) => Some((user.clone(), token.clone())),
            _ => None,
        }
    }

    /// Exchange credentials for a token and persist the result.
    ///
    /// On failure nothing is written and the previous state is kept.
    pub async fn login(
        &mut self,
        api: &PayoutApiClient,
        credentials: &LoginCredentials,
    ) -> Result<User, LoginFailure> {
        let session = api.login(&credentials.email, &credentials.password).await?;
        self.establish(session.user.clone(), session.token).await?;
        Ok(session.user)
    }

    pub async fn establish(&mut self, user: User, token: Secret<String>) -> Result<(), SessionError> {
        use secrecy::ExposeSecret;

        let user_json =
            serde_json::to_string(&user).map_err(|e| SessionError(e.to_string()))?;
        self.storage
            .write(TOKEN_KEY, token.expose_secret().clone())
            .await?;
        self.storage.write(USER_KEY, user_json).await?;

        self.token = TokenState::Present(token);
        self.user = Some(user);
        Ok(())
    }

    pub async fn logout(&mut self) -> Result<(), SessionError> {
        self.storage.delete(TOKEN_KEY).await?;
        self.storage.delete(USER_KEY).await?;
        self.token = TokenState::Absent;
        self.user = None;
        Ok(())
    }
}

pub async fn set_flash<S: SessionStorage + ?Sized>(
    storage: &S,
    message: impl Into<String>,
) -> Result<(), SessionError> {
    storage.write(FLASH_KEY, message.into()).await
}

/// Read and clear the pending banner message.
pub async fn take_flash<S: SessionStorage + ?Sized>(
    storage: &S,
) -> Result<Option<String>, SessionError> {
    let message = storage.read(FLASH_KEY).await?;
    if message.is_some() {
        storage.delete(FLASH_KEY).await?;
    }
    Ok(message)
}

/// Signed-in user extracted from the session. Redirects to `/login` when the
/// session holds no token.
#[derive(Clone)]
pub struct AuthUser {
    pub user: User,
    pub token: Secret<String>,
    pub session: Session,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|rejection| rejection.into_response())?;

        let mut context = SessionContext::new(session.clone());
        context
            .hydrate()
            .await
            .map_err(|e| AppError::from(e).into_response())?;

        match context.authenticated() {
            Some((user, token)) => Ok(AuthUser {
                user,
                token,
                session,
            }),
            None => Err(Redirect::to("/login").into_response()),
        }
    }
}

impl AuthUser {
    pub async fn flash(&self, message: impl Into<String>) -> Result<(), SessionError> {
        set_flash(&self.session, message).await
    }

    pub async fn take_flash(&self) -> Result<Option<String>, SessionError> {
        take_flash(&self.session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use secrecy::ExposeSecret;

    fn ops_user() -> User {
        User {
            id: "u1".into(),
            email: "ops@acme.in".into(),
            role: Role::Ops,
        }
    }

    #[tokio::test]
    async fn starts_undetermined_until_hydrated() {
        let mut context = SessionContext::new(MemoryStorage::default());
        assert!(matches!(context.token_state(), TokenState::Undetermined));

        let state = context.hydrate().await.unwrap();
        assert!(matches!(state, TokenState::Absent));
        assert!(context.authenticated().is_none());
    }

    #[tokio::test]
    async fn established_session_survives_reload() {
        let storage = MemoryStorage::default();
        let mut first = SessionContext::new(storage.clone());
        first
            .establish(ops_user(), Secret::new("tok-1".to_string()))
            .await
            .unwrap();

        let mut reloaded = SessionContext::new(storage);
        assert!(matches!(
            reloaded.hydrate().await.unwrap(),
            TokenState::Present(_)
        ));
        let (user, token) = reloaded.authenticated().unwrap();
        assert_eq!(user, ops_user());
        assert_eq!(token.expose_secret(), "tok-1");
    }

    #[tokio::test]
    async fn both_keys_are_required() {
        let storage = MemoryStorage::default();
        storage.write(TOKEN_KEY, "tok-1".into()).await.unwrap();

        let mut context = SessionContext::new(storage.clone());
        assert!(matches!(context.hydrate().await.unwrap(), TokenState::Absent));

        storage.delete(TOKEN_KEY).await.unwrap();
        storage
            .write(USER_KEY, serde_json::to_string(&ops_user()).unwrap())
            .await
            .unwrap();
        assert!(matches!(context.hydrate().await.unwrap(), TokenState::Absent));
    }

    #[tokio::test]
    async fn unreadable_user_counts_as_signed_out() {
        let storage = MemoryStorage::default();
        storage.write(TOKEN_KEY, "tok-1".into()).await.unwrap();
        storage.write(USER_KEY, "{not json".into()).await.unwrap();

        let mut context = SessionContext::new(storage);
        assert!(matches!(context.hydrate().await.unwrap(), TokenState::Absent));
        assert!(context.user().is_none());
    }

    #[tokio::test]
    async fn logout_clears_both_keys() {
        let storage = MemoryStorage::default();
        let mut context = SessionContext::new(storage.clone());
        context
            .establish(ops_user(), Secret::new("tok-1".to_string()))
            .await
            .unwrap();

        context.logout().await.unwrap();
        assert!(matches!(context.token_state(), TokenState::Absent));
        assert_eq!(storage.read(TOKEN_KEY).await.unwrap(), None);
        assert_eq!(storage.read(USER_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn flash_is_read_once() {
        let storage = MemoryStorage::default();
        set_flash(&storage, "Bad account").await.unwrap();
        assert_eq!(
            take_flash(&storage).await.unwrap().as_deref(),
            Some("Bad account")
        );
        assert_eq!(take_flash(&storage).await.unwrap(), None);
    }
}
