use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateItemRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    /// Number or numeric string.
    #[schema(value_type = Option<f64>)]
    pub price: Option<Value>,
}

/// Sparse update; only the keys present in the body are written.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PatchItemRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Value>,
    pub status: Option<String>,
}
