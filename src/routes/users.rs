use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::{Map, Value};

use crate::{
    dto::users::{CreateUserRequest, PatchUserRequest, ReplaceUserRequest},
    error::AppResult,
    extract::AppJson,
    models::User,
    response::{Created, Deleted, Message, Modified, Page, no_cache},
    routes::params::ListQuery,
    services::user_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/{id}",
            get(get_user)
                .patch(update_user)
                .put(replace_user)
                .delete(delete_user),
        )
}

#[utoipa::path(
    get,
    path = "/user",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of users, passwords excluded", body = Page<User>),
        (status = 500, description = "Store failure", body = Message),
    ),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    query: ListQuery,
) -> AppResult<impl IntoResponse> {
    let page = user_service::list_users(&state, query).await?;
    Ok((no_cache(), Json(page)))
}

#[utoipa::path(
    get,
    path = "/user/{id}",
    params(
        ("id" = String, Path, description = "User object id")
    ),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found", body = Message),
    ),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let user = user_service::get_user(&state, &id).await?;
    Ok((no_cache(), Json(user)))
}

#[utoipa::path(
    post,
    path = "/user",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = Created),
        (status = 400, description = "Missing data or duplicate username/email", body = Message),
    ),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<Created>)> {
    let created = user_service::create_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    patch,
    path = "/user/{id}",
    params(
        ("id" = String, Path, description = "User object id")
    ),
    request_body = PatchUserRequest,
    responses(
        (status = 200, description = "User updated", body = Modified),
        (status = 400, description = "Duplicate username/email", body = Message),
        (status = 404, description = "User not found", body = Message),
    ),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<Map<String, Value>>,
) -> AppResult<Json<Modified>> {
    let modified = user_service::update_user(&state, &id, payload).await?;
    Ok(Json(modified))
}

#[utoipa::path(
    put,
    path = "/user/{id}",
    params(
        ("id" = String, Path, description = "User object id")
    ),
    request_body = ReplaceUserRequest,
    responses(
        (status = 200, description = "User replaced", body = Modified),
        (status = 400, description = "Missing data or duplicate username/email", body = Message),
        (status = 404, description = "User not found", body = Message),
    ),
    tag = "Users"
)]
pub async fn replace_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<ReplaceUserRequest>,
) -> AppResult<Json<Modified>> {
    let modified = user_service::replace_user(&state, &id, payload).await?;
    Ok(Json(modified))
}

#[utoipa::path(
    delete,
    path = "/user/{id}",
    params(
        ("id" = String, Path, description = "User object id")
    ),
    responses(
        (status = 200, description = "User deleted", body = Deleted),
        (status = 404, description = "User not found", body = Message),
    ),
    tag = "Users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Deleted>> {
    let deleted = user_service::delete_user(&state, &id).await?;
    Ok(Json(deleted))
}
