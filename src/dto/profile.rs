use axum::body::Bytes;
use serde::Serialize;
use utoipa::ToSchema;

/// The `file` part of a profile image upload.
#[derive(Debug)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageUrl {
    pub image_url: String,
}

/// Multipart body schema for the OpenAPI document.
#[derive(ToSchema)]
pub struct ImageUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
