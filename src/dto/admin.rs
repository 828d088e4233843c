use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{AuditLog, User},
    routes::params::Paged,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserList {
    pub items: Vec<User>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AuditLogQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub action: Option<String>,
    pub actor_id: Option<Uuid>,
}

impl Paged for AuditLogQuery {
    fn page_fields(&self) -> (Option<i64>, Option<i64>) {
        (self.page, self.per_page)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditLogList {
    pub items: Vec<AuditLog>,
}
