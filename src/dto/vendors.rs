use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{models::Vendor, routes::params::Paged};

#[derive(Debug, Deserialize, ToSchema)]
pub struct VendorApplyRequest {
    pub shop_name: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct VendorListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// `pending`, `active` (or `approved`), `rejected`, `suspended`.
    pub status: Option<String>,
}

impl Paged for VendorListQuery {
    fn page_fields(&self) -> (Option<i64>, Option<i64>) {
        (self.page, self.per_page)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VendorList {
    pub items: Vec<Vendor>,
}

/// Outcome of a vendor status change.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VendorStatusChange {
    pub vendor: Vendor,
    pub previous_status: String,
    /// Role slugs held by the vendor owner after the change.
    pub owner_roles: Vec<String>,
    pub audit_logged: bool,
}
