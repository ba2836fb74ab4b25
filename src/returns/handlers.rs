use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        DefaultBodyLimit, Path, Query, State,
    },
    http::{header, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::AuthUser,
    error::AppResult,
    returns::{
        dto::{ListQuery, ReturnResponse, ReturnSubmission},
        services,
    },
    state::AppState,
};

pub fn return_routes(max_body_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/returns", get(list_returns).post(create_return))
        .route("/returns/:id", get(get_return))
        .layer(DefaultBodyLimit::max(max_body_bytes))
}

/// POST /returns, multipart `description` + `image` file, or JSON with a data-URI `image`.
#[instrument(skip(state, submission), fields(caller = %user.id))]
pub async fn create_return(
    State(state): State<AppState>,
    user: AuthUser,
    submission: ReturnSubmission,
) -> AppResult<(StatusCode, [(header::HeaderName, String); 1], Json<ReturnResponse>)> {
    let record = services::create_return(&state, &user, submission).await?;
    let location = format!("/api/returns/{}", record.return_id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(record.into()),
    ))
}

#[instrument(skip(state, query), fields(caller = %user.id))]
pub async fn list_returns(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> AppResult<Json<Vec<ReturnResponse>>> {
    let Query(query) = query?;
    let records = services::list_returns(&state, &user, query.user_id).await?;
    Ok(Json(records.into_iter().map(ReturnResponse::from).collect()))
}

#[instrument(skip(state, id), fields(caller = %user.id))]
pub async fn get_return(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<ReturnResponse>> {
    let Path(return_id) = id?;
    let record = services::get_return(&state, &user, return_id).await?;
    Ok(Json(record.into()))
}
