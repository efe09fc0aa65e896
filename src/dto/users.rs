use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

/// Full replacement. Omitted optional fields fall back to their defaults.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReplaceUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub status: Option<String>,
}

/// Sparse update; only the keys present in the body are written.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PatchUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub status: Option<String>,
}
