use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddWishlistRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateWishlistItemRequest {
    pub product_id: Uuid,
}

/// Number of entries actually stored by an import; unknown and duplicate products are skipped.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WishlistImport {
    pub requested: usize,
    pub imported: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WishlistItemDto {
    pub id: Uuid,
    pub product: Product,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct WishlistView {
    #[schema(value_type = Vec<WishlistItemDto>)]
    pub items: Vec<WishlistItemDto>,
}
