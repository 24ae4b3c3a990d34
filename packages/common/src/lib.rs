pub mod rating;
pub mod recipe_sort;

pub use rating::{Score, ScoreError, average_score};
pub use recipe_sort::{ParseSortError, RecipeSortField, SortOrder};
