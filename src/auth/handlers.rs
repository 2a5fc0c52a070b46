use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{SignInRequest, SignUpRequest, SignUpResponse, TokenResponse},
        error::AuthError,
        extractors::CurrentUser,
        repo_types::PublicUser,
        services::{LoginService, RegistrationService},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
    payload.map(|Json(v)| v).map_err(|e| {
        warn!(error = %e, "rejected request body");
        AuthError::Validation(e.body_text())
    })
}

#[instrument(skip(service, payload))]
pub async fn signup(
    State(service): State<RegistrationService>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<Json<SignUpResponse>, AuthError> {
    let (user, token) = service.register(body(payload)?).await?;
    Ok(Json(SignUpResponse { token, user }))
}

#[instrument(skip(service, payload))]
pub async fn signin(
    State(service): State<LoginService>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AuthError> {
    let token = service.login(body(payload)?.credentials).await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(user)
}
