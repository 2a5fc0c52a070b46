use std::sync::Arc;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use secrecy::ExposeSecret;
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::{
    dto::{Credentials, SignUpRequest},
    error::AuthError,
    jwt::TokenIssuer,
    password::{PasswordError, PasswordHasher},
    repo::{CredentialStore, StoreError},
    repo_types::{NewUser, PublicUser},
};
use crate::state::AppState;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.to_lowercase()
}

fn checked_email(raw: &str) -> Result<String, AuthError> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AuthError::Validation("Invalid email".into()));
    }
    Ok(email)
}

fn persistence(e: StoreError) -> AuthError {
    error!(error = %e, "credential store failed");
    AuthError::Persistence
}

fn sign(tokens: &TokenIssuer, user_id: Uuid, email: &str) -> Result<String, AuthError> {
    let mut extra = Map::new();
    extra.insert("email".into(), Value::String(email.to_owned()));
    tokens.issue(user_id, extra).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        AuthError::Internal
    })
}

/// Creates accounts.
#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl FromRef<AppState> for RegistrationService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.store.clone(), state.hasher.clone(), state.tokens.clone())
    }
}

impl RegistrationService {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    /// Returns the new user and a token bound to it. Nothing is written
    /// unless the whole call succeeds up to the insert.
    pub async fn register(&self, req: SignUpRequest) -> Result<(PublicUser, String), AuthError> {
        let SignUpRequest {
            credentials,
            gender,
            avatar,
        } = req;
        let email = checked_email(&credentials.email)?;

        if credentials.password.expose_secret().is_empty() {
            warn!("empty password");
            return Err(AuthError::Validation("Password is required".into()));
        }
        if gender.is_empty() {
            warn!("missing gender");
            return Err(AuthError::Validation("Gender is required".into()));
        }

        let hasher = self.hasher.clone();
        let password = credentials.password;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(password.expose_secret()))
            .await
            .map_err(|e| {
                error!(error = %e, "hashing task failed");
                AuthError::Internal
            })?
            .map_err(|e| {
                warn!(error = %e, "password rejected by hasher");
                AuthError::Validation("Password is too long".into())
            })?;

        let user = self
            .store
            .insert(NewUser {
                email,
                password_hash,
                gender,
                avatar,
            })
            .await
            .map_err(|e| match e {
                StoreError::DuplicateEmail => {
                    warn!("email already registered");
                    AuthError::DuplicateEmail
                }
                other => persistence(other),
            })?;

        let token = sign(&self.tokens, user.id, &user.email)?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok((user.into(), token))
    }
}

/// Exchanges credentials for a token.
#[derive(Clone)]
pub struct LoginService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl FromRef<AppState> for LoginService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.store.clone(), state.hasher.clone(), state.tokens.clone())
    }
}

impl LoginService {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    /// Unknown email, wrong password and empty password all come back as
    /// `InvalidCredentials`.
    pub async fn login(&self, credentials: Credentials) -> Result<String, AuthError> {
        let email = checked_email(&credentials.email)?;
        let user = self.store.find_by_email(&email).await.map_err(persistence)?;

        let hasher = self.hasher.clone();
        let password = credentials.password;
        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        let verdict = tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&hash, password.expose_secret()),
            None => {
                hasher.verify_dummy(password.expose_secret());
                Err(PasswordError::Mismatch)
            }
        })
        .await
        .map_err(|e| {
            error!(error = %e, "verify task failed");
            AuthError::Internal
        })?;

        let user = match (user, verdict) {
            (Some(user), Ok(())) => user,
            (None, _) => {
                warn!(email = %email, "login unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            (Some(user), Err(e)) => {
                warn!(user_id = %user.id, reason = %e, "login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let token = sign(&self.tokens, user.id, &user.email)?;
        info!(user_id = %user.id, "user logged in");
        Ok(token)
    }
}
