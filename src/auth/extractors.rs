use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::{error, warn};

use super::{
    error::AuthError, jwt::TokenIssuer, repo::CredentialStore, repo_types::PublicUser,
};
use crate::state::AppState;

/// Resolves a bearer token to the user it was issued for.
#[derive(Clone)]
pub struct AuthGate {
    tokens: TokenIssuer,
    store: Arc<dyn CredentialStore>,
}

impl FromRef<AppState> for AuthGate {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.tokens.clone(), state.store.clone())
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = auth
        .strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

impl AuthGate {
    pub fn new(tokens: TokenIssuer, store: Arc<dyn CredentialStore>) -> Self {
        Self { tokens, store }
    }

    /// Validates the token, then looks the subject up again so a user removed
    /// after issuance is refused.
    pub async fn authenticate(&self, token: &str) -> Result<PublicUser, AuthError> {
        let claims = self.tokens.validate(token).map_err(|e| {
            warn!(reason = %e, "token rejected");
            AuthError::Unauthenticated
        })?;

        match self.store.find_by_id(claims.sub).await {
            Ok(Some(user)) => Ok(user.into()),
            Ok(None) => {
                warn!(user_id = %claims.sub, "token subject no longer exists");
                Err(AuthError::Unauthenticated)
            }
            Err(e) => {
                error!(error = %e, user_id = %claims.sub, "identity lookup failed");
                Err(AuthError::Persistence)
            }
        }
    }
}

/// The authenticated caller, as handed to protected handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub PublicUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AuthGate: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            warn!("missing or malformed Authorization header");
            AuthError::Unauthenticated
        })?;
        let gate = AuthGate::from_ref(state);
        gate.authenticate(token).await.map(CurrentUser)
    }
}
