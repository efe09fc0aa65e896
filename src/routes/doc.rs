use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse},
        items::{CreateItemRequest, PatchItemRequest},
        profile::{ImageUploadForm, ImageUrl},
        users::{CreateUserRequest, PatchUserRequest, ReplaceUserRequest},
    },
    models::{Item, Status, User},
    response::{Created, Deleted, Message, Modified, Page, Pagination},
    routes::{auth, health, items, profile, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        items::list_items,
        items::get_item,
        items::create_item,
        items::update_item,
        items::replace_item,
        items::delete_item,
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::replace_user,
        users::delete_user,
        profile::get_profile,
        profile::upload_image,
        profile::delete_image
    ),
    components(
        schemas(
            Item,
            User,
            Status,
            CreateItemRequest,
            PatchItemRequest,
            CreateUserRequest,
            PatchUserRequest,
            ReplaceUserRequest,
            LoginRequest,
            LoginResponse,
            ImageUploadForm,
            ImageUrl,
            Pagination,
            Created,
            Modified,
            Deleted,
            Message,
            Page<Item>,
            Page<User>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Items", description = "Item endpoints"),
        (name = "Users", description = "User endpoints"),
        (name = "Profile", description = "Endpoints for the bearer token's own user"),
        (name = "Auth", description = "Authentication endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
