use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MeResponse, RegisterRequest},
        jwt::AuthUser,
        services,
    },
    error::AppResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let Json(payload) = payload?;
    let issued = services::register(&state, &payload.username, &payload.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token: issued.token,
            user_id: issued.user_id,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let Json(payload) = payload?;
    let issued = services::login(&state, &payload.username, &payload.password).await?;
    Ok(Json(AuthResponse {
        success: true,
        token: issued.token,
        user_id: issued.user_id,
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<MeResponse>> {
    let user = services::current_user(&state, user.id).await?;
    Ok(Json(MeResponse {
        success: true,
        data: user.into(),
    }))
}
