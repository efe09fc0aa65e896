use axum::{
    Json, Router,
    extract::{Multipart, State, multipart::MultipartRejection},
    routing::{get, post},
};
use serde_json::Value;

use crate::{
    dto::profile::{ImageUpload, ImageUploadForm, ImageUrl},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::Message,
    services::profile_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile))
        .route("/profile/image", post(upload_image).delete(delete_image))
}

#[utoipa::path(
    get,
    path = "/user/profile",
    responses(
        (status = 200, description = "Caller's user document, passwords excluded", body = User),
        (status = 401, description = "Missing or invalid bearer token", body = Message),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Option<Value>>> {
    let profile = profile_service::get_profile(&state, &user).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    post,
    path = "/user/profile/image",
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image stored", body = ImageUrl),
        (status = 400, description = "Missing file or not an image", body = Message),
        (status = 401, description = "Missing or invalid bearer token", body = Message),
        (status = 500, description = "Failed to update user", body = Message),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn upload_image(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ImageUrl>> {
    let multipart = multipart.map_err(|_| invalid_form())?;
    let upload = read_file_field(multipart)
        .await?
        .ok_or_else(|| AppError::BadRequest("No file uploaded".into()))?;
    let image = profile_service::upload_image(&state, &user, upload).await?;
    Ok(Json(image))
}

#[utoipa::path(
    delete,
    path = "/user/profile/image",
    responses(
        (status = 200, description = "Image removed", body = Message),
        (status = 401, description = "Missing or invalid bearer token", body = Message),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn delete_image(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Message>> {
    let message = profile_service::delete_image(&state, &user).await?;
    Ok(Json(message))
}

/// First `file` part that carries a file name; plain text fields named
/// `file` do not count as an upload.
async fn read_file_field(mut multipart: Multipart) -> AppResult<Option<ImageUpload>> {
    while let Some(field) = multipart.next_field().await.map_err(|_| invalid_form())? {
        if field.name() != Some("file") || field.file_name().is_none() {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|_| invalid_form())?;
        return Ok(Some(ImageUpload {
            file_name,
            content_type,
            bytes,
        }));
    }
    Ok(None)
}

fn invalid_form() -> AppError {
    AppError::BadRequest("Invalid form data".into())
}
