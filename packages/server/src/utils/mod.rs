pub mod jwt;
pub mod password;
pub mod recipe;
pub mod user;
