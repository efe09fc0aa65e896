use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::{Map, Value};

use crate::{
    dto::items::{CreateItemRequest, PatchItemRequest},
    error::AppResult,
    extract::AppJson,
    models::Item,
    response::{Created, Deleted, Message, Modified, Page, no_cache},
    routes::params::ListQuery,
    services::item_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route(
            "/{id}",
            get(get_item)
                .patch(update_item)
                .put(replace_item)
                .delete(delete_item),
        )
}

#[utoipa::path(
    get,
    path = "/item",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of items", body = Page<Item>),
        (status = 500, description = "Store failure", body = Message),
    ),
    tag = "Items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    query: ListQuery,
) -> AppResult<impl IntoResponse> {
    let page = item_service::list_items(&state, query).await?;
    Ok((no_cache(), Json(page)))
}

#[utoipa::path(
    get,
    path = "/item/{id}",
    params(
        ("id" = String, Path, description = "Item object id")
    ),
    responses(
        (status = 200, description = "Item", body = Item),
        (status = 404, description = "Item not found", body = Message),
    ),
    tag = "Items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let item = item_service::get_item(&state, &id).await?;
    Ok((no_cache(), Json(item)))
}

#[utoipa::path(
    post,
    path = "/item",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = Created),
        (status = 400, description = "Missing required fields", body = Message),
    ),
    tag = "Items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<Created>)> {
    let created = item_service::create_item(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    patch,
    path = "/item/{id}",
    params(
        ("id" = String, Path, description = "Item object id")
    ),
    request_body = PatchItemRequest,
    responses(
        (status = 200, description = "Item updated", body = Modified),
        (status = 404, description = "Item not found", body = Message),
    ),
    tag = "Items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<Map<String, Value>>,
) -> AppResult<Json<Modified>> {
    let modified = item_service::update_item(&state, &id, payload).await?;
    Ok(Json(modified))
}

#[utoipa::path(
    put,
    path = "/item/{id}",
    params(
        ("id" = String, Path, description = "Item object id")
    ),
    request_body(content = Object, description = "Fields to store; `_id`, `createdAt` and `updatedAt` are ignored"),
    responses(
        (status = 200, description = "Item replaced", body = Modified),
        (status = 404, description = "Item not found", body = Message),
    ),
    tag = "Items"
)]
pub async fn replace_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<Map<String, Value>>,
) -> AppResult<Json<Modified>> {
    let modified = item_service::replace_item(&state, &id, payload).await?;
    Ok(Json(modified))
}

#[utoipa::path(
    delete,
    path = "/item/{id}",
    params(
        ("id" = String, Path, description = "Item object id")
    ),
    responses(
        (status = 200, description = "Item deleted", body = Deleted),
        (status = 404, description = "Item not found", body = Message),
    ),
    tag = "Items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Deleted>> {
    let deleted = item_service::delete_item(&state, &id).await?;
    Ok(Json(deleted))
}
