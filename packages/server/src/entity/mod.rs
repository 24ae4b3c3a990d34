pub mod ingredient;
pub mod profile;
pub mod rating;
pub mod recipe;
pub mod recipe_ingredient;
pub mod saved_recipe;
pub mod user;
