use utoipa_axum::{router::OpenApiRouter, routes};

use crate::state::AppState;

pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/profile", profile_routes())
        .nest("/ingredients", ingredient_routes())
        .nest("/recipes", recipe_routes())
        .nest("/saved-recipes", saved_routes())
        .nest("/admin", admin_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    use crate::handlers::auth::*;

    OpenApiRouter::new()
        .routes(routes!(signup))
        .routes(routes!(login))
        .routes(routes!(me))
        .routes(routes!(delete_account))
        .routes(routes!(change_password))
}

fn profile_routes() -> OpenApiRouter<AppState> {
    use crate::handlers::profile::*;

    OpenApiRouter::new()
        .routes(routes!(get_own_profile, create_profile, upsert_profile))
        .routes(routes!(get_profile))
}

fn ingredient_routes() -> OpenApiRouter<AppState> {
    use crate::handlers::ingredient::*;

    OpenApiRouter::new().routes(routes!(list_ingredients, create_ingredient))
}

fn recipe_routes() -> OpenApiRouter<AppState> {
    use crate::handlers::ingredient::*;
    use crate::handlers::rating::*;
    use crate::handlers::recipe::*;
    use crate::handlers::saved::*;

    OpenApiRouter::new()
        .routes(routes!(list_recipes, create_recipe))
        .routes(routes!(get_recipe, delete_recipe))
        .routes(routes!(set_approval))
        .routes(routes!(list_recipe_ingredients))
        .routes(routes!(list_ratings, create_rating))
        .routes(routes!(save_recipe, unsave_recipe))
}

fn saved_routes() -> OpenApiRouter<AppState> {
    use crate::handlers::saved::*;

    OpenApiRouter::new().routes(routes!(list_saved_recipes))
}

fn admin_routes() -> OpenApiRouter<AppState> {
    use crate::handlers::admin::*;

    OpenApiRouter::new()
        .routes(routes!(total_users))
        .routes(routes!(total_admins))
        .routes(routes!(total_recipes))
        .routes(routes!(stats))
}
