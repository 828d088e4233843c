use sea_orm::{EntityTrait, QueryOrder};

use crate::{
    entity::categories::{Column as CategoryCol, Entity as Categories},
    error::AppResult,
    models::Category,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<Vec<Category>>> {
    let items: Vec<Category> = Categories::find()
        .order_by_asc(CategoryCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();

    let meta = Meta::unpaged(items.len());
    Ok(ApiResponse::success("Categories", items, Some(meta)))
}
