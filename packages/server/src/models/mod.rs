pub mod admin;
pub mod auth;
pub mod ingredient;
pub mod profile;
pub mod rating;
pub mod recipe;
pub mod saved;
pub mod shared;
