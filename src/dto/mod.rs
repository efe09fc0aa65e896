pub mod auth;
pub mod items;
pub mod profile;
pub mod users;
