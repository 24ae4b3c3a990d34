use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct TotalResponse {
    #[schema(example = 128)]
    pub total: u64,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct StatsResponse {
    pub users: u64,
    pub admins: u64,
    pub recipes: u64,
    pub ratings: u64,
}
