use mongodb::bson::{Bson, doc};
use serde_json::Value;

use crate::{
    dto::profile::{ImageUpload, ImageUrl},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::document_to_json,
    response::Message,
    services::user_service::without_password,
    state::AppState,
    storage::is_allowed_image,
};

/// The caller's own user document, or `None` if the token outlived the user.
pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<Option<Value>> {
    let profile = state
        .db
        .users()
        .find_one(doc! { "email": user.email.as_str() })
        .projection(without_password())
        .await?;
    Ok(profile.map(document_to_json))
}

pub async fn upload_image(
    state: &AppState,
    user: &AuthUser,
    upload: ImageUpload,
) -> AppResult<ImageUrl> {
    let content_type = upload.content_type.as_deref().unwrap_or_default();
    if !is_allowed_image(content_type) {
        return Err(AppError::BadRequest(
            "Only image files allowed (jpeg, png, gif, webp)".into(),
        ));
    }

    let image_url = state
        .images
        .save(upload.file_name.as_deref(), content_type, &upload.bytes)
        .await?;

    if let Err(err) = attach_image(state, user, &image_url).await {
        tracing::error!(error = %err, email = %user.email, "profile image update failed");
        state.images.remove(&image_url).await;
        return Err(AppError::Internal(anyhow::anyhow!("Failed to update user")));
    }

    tracing::info!(email = %user.email, image = %image_url, "profile image updated");
    Ok(ImageUrl { image_url })
}

/// Point the user at `image_url`, then remove the file it referenced before.
/// The swap is a single document update, so each upload only ever deletes
/// the file it replaced.
async fn attach_image(state: &AppState, user: &AuthUser, image_url: &str) -> AppResult<()> {
    let previous = state
        .db
        .users()
        .find_one_and_update(
            doc! { "email": user.email.as_str() },
            doc! { "$set": { "profileImage": image_url } },
        )
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if let Ok(old) = previous.get_str("profileImage") {
        if old != image_url {
            state.images.remove(old).await;
        }
    }
    Ok(())
}

pub async fn delete_image(state: &AppState, user: &AuthUser) -> AppResult<Message> {
    let users = state.db.users();
    let filter = doc! { "email": user.email.as_str() };

    let profile = users.find_one(filter.clone()).await?;
    if let Some(image) = profile
        .as_ref()
        .and_then(|doc| doc.get_str("profileImage").ok())
        .filter(|image| !image.is_empty())
    {
        state.images.remove(image).await;
        users
            .update_one(filter, doc! { "$set": { "profileImage": Bson::Null } })
            .await?;
        tracing::info!(email = %user.email, "profile image removed");
    }

    Ok(Message::new("Image deleted"))
}
