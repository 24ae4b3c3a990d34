use chrono::{DateTime, Utc};
use common::{RecipeSortField, SortOrder};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{message} ({code}, HTTP {status})")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("not logged in; run `recipebox login` first")]
    NotLoggedIn,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    error: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct AccountDeletionSummary {
    pub user_id: i32,
    pub profiles: u64,
    pub saved_recipes: u64,
    pub recipes: u64,
    pub ratings: u64,
}

#[derive(Debug, Deserialize)]
pub struct Profile {
    pub user_id: i32,
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub pronouns: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Ingredient {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub is_allergen: bool,
    pub nutrition_info: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecipeIngredient {
    pub ingredient_id: i32,
    pub name: String,
    pub category: String,
    pub is_allergen: bool,
    pub quantity: String,
}

#[derive(Debug, Deserialize)]
pub struct RecipeSummary {
    pub id: i32,
    pub name: String,
    pub time_to_make: i32,
    pub is_approved: bool,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Deserialize)]
pub struct RecipePage {
    pub data: Vec<RecipeSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct Recipe {
    pub id: i32,
    pub author_username: Option<String>,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub time_to_make: i32,
    pub is_approved: bool,
    pub average_rating: Option<f64>,
    pub ingredients: Vec<RecipeIngredient>,
}

#[derive(Debug, Deserialize)]
pub struct Rating {
    pub id: i32,
    pub user_id: i32,
    pub username: Option<String>,
    pub score: i32,
    pub review: Option<String>,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RatingCreated {
    pub rating: Rating,
    pub average_rating: f64,
    pub rating_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct SavedRecipe {
    pub saved_at: DateTime<Utc>,
    pub recipe: Recipe,
}

#[derive(Debug, Deserialize)]
pub struct Total {
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub struct Stats {
    pub users: u64,
    pub admins: u64,
    pub recipes: u64,
    pub ratings: u64,
}

#[derive(Debug, Serialize)]
pub struct NewRecipe {
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub time_to_make: i32,
    pub ingredients: Vec<NewIngredientLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIngredientLine {
    pub ingredient_id: i32,
    pub quantity: String,
}

#[derive(Debug, Serialize)]
pub struct NewIngredient {
    pub name: String,
    pub category: String,
    pub is_allergen: bool,
    pub nutrition_info: Option<String>,
}

#[derive(Debug, Default)]
pub struct RecipeFilter {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub search: Option<String>,
    pub approved: Option<bool>,
    pub user_id: Option<i32>,
    pub sort_by: Option<RecipeSortField>,
    pub sort_order: Option<SortOrder>,
}

impl RecipeFilter {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut q = Vec::new();
        if let Some(page) = self.page {
            q.push(("page", page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            q.push(("per_page", per_page.to_string()));
        }
        if let Some(ref search) = self.search {
            q.push(("search", search.clone()));
        }
        if let Some(approved) = self.approved {
            q.push(("approved", approved.to_string()));
        }
        if let Some(user_id) = self.user_id {
            q.push(("user_id", user_id.to_string()));
        }
        if let Some(sort_by) = self.sort_by {
            q.push(("sort_by", sort_by.as_str().to_string()));
        }
        if let Some(sort_order) = self.sort_order {
            q.push(("sort_order", sort_order.as_str().to_string()));
        }
        q
    }
}

/// Blocking wrapper around every RecipeBox REST call.
pub struct ApiClient {
    base: String,
    http: Client,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(server: &str, token: Option<String>) -> Self {
        Self {
            base: format!("{}/api", server.trim_end_matches('/')),
            http: Client::new(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn authed(&self, req: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NotLoggedIn)?;
        Ok(req.bearer_auth(token))
    }

    fn check(res: Response) -> Result<Response, ClientError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let text = res.text().unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => (body.code, body.error),
            Err(_) => ("HTTP_ERROR".to_string(), text),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        Ok(Self::check(req.send()?)?.json()?)
    }

    fn send_empty(&self, req: RequestBuilder) -> Result<StatusCode, ClientError> {
        Ok(Self::check(req.send()?)?.status())
    }

    pub fn signup(
        &self,
        email: &str,
        username: &str,
        display_name: Option<&str>,
        password: &str,
    ) -> Result<User, ClientError> {
        self.send(self.http.post(self.url("/auth/signup")).json(&json!({
            "email": email,
            "username": username,
            "display_name": display_name,
            "password": password,
        })))
    }

    pub fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        self.send(
            self.http
                .post(self.url("/auth/login"))
                .json(&json!({"username": username, "password": password})),
        )
    }

    pub fn me(&self) -> Result<User, ClientError> {
        self.send(self.authed(self.http.get(self.url("/auth/me")))?)
    }

    pub fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ClientError> {
        let req = self
            .http
            .put(self.url(&format!("/auth/user/{user_id}/password")))
            .json(&json!({
                "current_password": current_password,
                "new_password": new_password,
            }));
        self.send_empty(self.authed(req)?).map(|_| ())
    }

    pub fn delete_account(&self, user_id: i32) -> Result<AccountDeletionSummary, ClientError> {
        let req = self.http.delete(self.url(&format!("/auth/user/{user_id}")));
        self.send(self.authed(req)?)
    }

    pub fn own_profile(&self) -> Result<Profile, ClientError> {
        self.send(self.authed(self.http.get(self.url("/profile")))?)
    }

    pub fn profile(&self, user_id: i32) -> Result<Profile, ClientError> {
        self.send(self.http.get(self.url(&format!("/profile/{user_id}"))))
    }

    /// `body` follows the PUT semantics: absent keys are kept, `null` clears.
    pub fn update_profile(&self, body: &Value) -> Result<Profile, ClientError> {
        self.send(self.authed(self.http.put(self.url("/profile")).json(body))?)
    }

    pub fn ingredients(&self, category: Option<&str>) -> Result<Vec<Ingredient>, ClientError> {
        let mut req = self.http.get(self.url("/ingredients"));
        if let Some(category) = category {
            req = req.query(&[("category", category)]);
        }
        self.send(req)
    }

    pub fn add_ingredient(&self, ingredient: &NewIngredient) -> Result<Ingredient, ClientError> {
        self.send(self.authed(self.http.post(self.url("/ingredients")).json(ingredient))?)
    }

    pub fn recipe_ingredients(&self, recipe_id: i32) -> Result<Vec<RecipeIngredient>, ClientError> {
        self.send(
            self.http
                .get(self.url(&format!("/recipes/{recipe_id}/ingredients"))),
        )
    }

    pub fn recipes(&self, filter: &RecipeFilter) -> Result<RecipePage, ClientError> {
        self.send(self.http.get(self.url("/recipes")).query(&filter.query()))
    }

    pub fn recipe(&self, recipe_id: i32) -> Result<Recipe, ClientError> {
        self.send(self.http.get(self.url(&format!("/recipes/{recipe_id}"))))
    }

    pub fn create_recipe(&self, recipe: &NewRecipe) -> Result<Recipe, ClientError> {
        self.send(self.authed(self.http.post(self.url("/recipes")).json(recipe))?)
    }

    pub fn delete_recipe(&self, recipe_id: i32) -> Result<(), ClientError> {
        let req = self.http.delete(self.url(&format!("/recipes/{recipe_id}")));
        self.send_empty(self.authed(req)?).map(|_| ())
    }

    pub fn set_approval(&self, recipe_id: i32, approved: bool) -> Result<Recipe, ClientError> {
        let req = self
            .http
            .put(self.url(&format!("/recipes/{recipe_id}/approval")))
            .json(&json!({"approved": approved}));
        self.send(self.authed(req)?)
    }

    pub fn ratings(&self, recipe_id: i32) -> Result<Vec<Rating>, ClientError> {
        self.send(self.http.get(self.url(&format!("/recipes/{recipe_id}/ratings"))))
    }

    pub fn rate(
        &self,
        recipe_id: i32,
        score: common::Score,
        review: Option<&str>,
    ) -> Result<RatingCreated, ClientError> {
        let req = self
            .http
            .post(self.url(&format!("/recipes/{recipe_id}/ratings")))
            .json(&json!({"score": score, "review": review}));
        self.send(self.authed(req)?)
    }

    pub fn save(&self, recipe_id: i32) -> Result<(), ClientError> {
        let req = self.http.post(self.url(&format!("/recipes/{recipe_id}/save")));
        self.send_empty(self.authed(req)?).map(|_| ())
    }

    pub fn unsave(&self, recipe_id: i32) -> Result<(), ClientError> {
        let req = self.http.delete(self.url(&format!("/recipes/{recipe_id}/save")));
        self.send_empty(self.authed(req)?).map(|_| ())
    }

    pub fn saved(&self) -> Result<Vec<SavedRecipe>, ClientError> {
        self.send(self.authed(self.http.get(self.url("/saved-recipes")))?)
    }

    pub fn total(&self, what: &str) -> Result<Total, ClientError> {
        self.send(self.authed(self.http.get(self.url(&format!("/admin/total-{what}"))))?)
    }

    pub fn stats(&self) -> Result<Stats, ClientError> {
        self.send(self.authed(self.http.get(self.url("/admin/stats")))?)
    }
}
