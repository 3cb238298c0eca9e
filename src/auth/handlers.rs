use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use tracing::instrument;

use super::{
    dto::{
        LoginRequest, ManageInfoRequest, PublicUser, RefreshRequest, RegisterRequest,
        TokenResponse,
    },
    error::AuthError,
    extractors::ValidJson,
    middleware::{require_auth, AuthUser},
};
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}

pub fn me_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(hello))
        .route("/me", get(get_me))
        .route("/manage/info", get(get_me).post(update_info))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> Result<Json<PublicUser>, AuthError> {
    let user = state
        .engine
        .register(&payload.username, &payload.email, &payload.password)
        .await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let pair = state
        .engine
        .login(&payload.username, &payload.password)
        .await?;
    Ok(Json(pair.into()))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RefreshRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let pair = state.engine.refresh(&payload.refresh_token).await?;
    Ok(Json(pair.into()))
}

pub async fn get_me(Extension(AuthUser(user)): Extension<AuthUser>) -> Json<PublicUser> {
    Json(user.into())
}

pub async fn hello(Extension(AuthUser(user)): Extension<AuthUser>) -> Json<String> {
    Json(format!("hello {}", user.username))
}

#[instrument(skip(state, user, payload))]
pub async fn update_info(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ValidJson(payload): ValidJson<ManageInfoRequest>,
) -> Result<Json<PublicUser>, AuthError> {
    let user = state
        .engine
        .update_info(
            user,
            payload.new_email.as_deref(),
            payload.new_password.as_deref(),
            payload.old_password.as_deref(),
        )
        .await?;
    Ok(Json(user.into()))
}
