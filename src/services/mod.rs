pub mod auth_service;
pub mod item_service;
pub mod profile_service;
pub mod user_service;
