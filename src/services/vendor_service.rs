use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{AuditEntry, log_audit_best_effort},
    db::{DbPool, OrmConn},
    dto::vendors::{VendorApplyRequest, VendorList, VendorListQuery, VendorStatusChange},
    entity::vendors::{ActiveModel as VendorActive, Column as VendorCol, Entity as Vendors},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Vendor, VendorStatus},
    response::{ApiResponse, Meta},
    routes::params::Paged,
    services::role_service::{
        ELEVATED_ROLE, OrmRoleGranter, ROLE_USER, RoleGranter, UserWithRoles,
        load_user_with_roles,
    },
    state::AppState,
};

pub const UPDATE_VENDOR_STATUS: &str = "update_vendor_status";

/// One role adjustment implied by a vendor status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Grant(&'static str),
    Revoke(&'static str),
}

/// Role adjustments for the owner of a vendor entering `status`, in application order.
pub fn role_changes_for(status: VendorStatus) -> &'static [RoleChange] {
    match status {
        VendorStatus::Active => &[RoleChange::Grant(ELEVATED_ROLE), RoleChange::Grant(ROLE_USER)],
        VendorStatus::Rejected | VendorStatus::Suspended => {
            &[RoleChange::Revoke(ELEVATED_ROLE), RoleChange::Grant(ROLE_USER)]
        }
        VendorStatus::Pending => &[],
    }
}

pub async fn sync_vendor_roles<G: RoleGranter>(
    granter: &G,
    owner: &mut UserWithRoles,
    status: VendorStatus,
) -> AppResult<()> {
    for change in role_changes_for(status) {
        match *change {
            RoleChange::Grant(slug) => granter.grant_role(owner, slug).await?,
            RoleChange::Revoke(slug) => granter.revoke_role(owner, slug).await?,
        }
    }
    Ok(())
}

/// Reject a transition onto the status the vendor already has.
pub fn check_transition(current: &str, target: VendorStatus) -> AppResult<()> {
    let current_status = current.parse::<VendorStatus>().ok();
    if current_status == Some(target) {
        return Err(AppError::NoOpTransition(target.to_string()));
    }
    Ok(())
}

/// Vendor applications, review, and the role changes that follow a review.
pub struct VendorLifecycle<G> {
    orm: OrmConn,
    pool: DbPool,
    roles: G,
}

impl VendorLifecycle<OrmRoleGranter> {
    pub fn from_state(state: &AppState) -> Self {
        Self::new(state, OrmRoleGranter::new(state.orm.clone()))
    }
}

impl<G: RoleGranter> VendorLifecycle<G> {
    pub fn new(state: &AppState, roles: G) -> Self {
        Self {
            orm: state.orm.clone(),
            pool: state.pool.clone(),
            roles,
        }
    }

    pub async fn apply(
        &self,
        user: &AuthUser,
        payload: VendorApplyRequest,
    ) -> AppResult<ApiResponse<Vendor>> {
        let shop_name = payload.shop_name.trim().to_string();
        if shop_name.is_empty() {
            return Err(AppError::BadRequest("shop_name is required".into()));
        }

        let existing = Vendors::find()
            .filter(VendorCol::UserId.eq(user.user_id))
            .one(&self.orm)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict("You already applied as vendor".into()));
        }

        let now = Utc::now();
        let vendor = VendorActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.user_id),
            shop_name: Set(shop_name),
            status: Set(VendorStatus::Pending.as_str().to_string()),
            approved_by: Set(None),
            approved_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&self.orm)
        .await?;

        log_audit_best_effort(
            &self.pool,
            AuditEntry::new(Some(user.user_id), "vendor_apply", format!("vendor:{}", vendor.id))
                .new_value(json!({ "shop_name": vendor.shop_name, "status": vendor.status })),
        )
        .await;

        tracing::info!(vendor_id = %vendor.id, user_id = %user.user_id, "vendor application submitted");

        Ok(ApiResponse::success(
            "Vendor application submitted",
            Vendor::from(vendor),
            Some(Meta::empty()),
        ))
    }

    pub async fn list(&self, query: VendorListQuery) -> AppResult<ApiResponse<VendorList>> {
        let (page, limit, offset) = query.pagination().normalize();
        let mut condition = Condition::all();
        if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
            let status = status.parse::<VendorStatus>()?;
            condition = condition.add(VendorCol::Status.eq(status.as_str()));
        }

        let finder = Vendors::find()
            .filter(condition)
            .order_by_desc(VendorCol::CreatedAt);
        let total = finder.clone().count(&self.orm).await? as i64;

        let items = finder
            .limit(limit as u64)
            .offset(offset as u64)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(Vendor::from)
            .collect();

        Ok(ApiResponse::success(
            "Vendors",
            VendorList { items },
            Some(Meta::new(page, limit, total)),
        ))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<ApiResponse<Vendor>> {
        let vendor = Vendors::find_by_id(id)
            .one(&self.orm)
            .await?
            .ok_or(AppError::NotFound("Vendor"))?;
        Ok(ApiResponse::success("Vendor", Vendor::from(vendor), Some(Meta::empty())))
    }

    /// Move a vendor to `target` and bring its owner's roles in line.
    ///
    /// The status change stands even when the audit append fails; the
    /// returned `audit_logged` flag and message report that case.
    pub async fn update_status(
        &self,
        actor: Option<&AuthUser>,
        vendor_id: Uuid,
        target: VendorStatus,
    ) -> AppResult<ApiResponse<VendorStatusChange>> {
        let vendor = Vendors::find_by_id(vendor_id)
            .one(&self.orm)
            .await?
            .ok_or(AppError::NotFound("Vendor"))?;

        let old_status = vendor.status.clone();
        check_transition(&old_status, target)?;

        let actor_id = actor
            .map(|a| a.user_id)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

        let mut owner = load_user_with_roles(&self.orm, vendor.user_id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("vendor owner {} missing", vendor.user_id)))?;

        sync_vendor_roles(&self.roles, &mut owner, target).await?;

        let now = Utc::now();
        let mut active: VendorActive = vendor.into();
        active.status = Set(target.as_str().to_string());
        if target == VendorStatus::Active {
            active.approved_by = Set(Some(actor_id));
            active.approved_at = Set(Some(now.into()));
        } else {
            active.approved_by = Set(None);
            active.approved_at = Set(None);
        }
        active.updated_at = Set(now.into());
        let vendor = active.update(&self.orm).await?;

        tracing::info!(
            vendor_id = %vendor.id,
            actor_id = %actor_id,
            from = %old_status,
            to = %target,
            "vendor status updated"
        );

        let audit_logged = log_audit_best_effort(
            &self.pool,
            AuditEntry::new(Some(actor_id), UPDATE_VENDOR_STATUS, format!("vendor:{}", vendor.id))
                .old_value(json!({ "status": old_status }))
                .new_value(json!({ "status": target.as_str() })),
        )
        .await;

        let message = if audit_logged {
            "Vendor status updated successfully"
        } else {
            "Vendor status updated but audit log failed"
        };

        Ok(ApiResponse::success(
            message,
            VendorStatusChange {
                vendor: Vendor::from(vendor),
                previous_status: old_status,
                owner_roles: owner.role_slugs(),
                audit_logged,
            },
            Some(Meta::empty()),
        ))
    }

    pub async fn approve(&self, actor: Option<&AuthUser>, id: Uuid) -> AppResult<ApiResponse<VendorStatusChange>> {
        self.update_status(actor, id, VendorStatus::Active).await
    }

    pub async fn reject(&self, actor: Option<&AuthUser>, id: Uuid) -> AppResult<ApiResponse<VendorStatusChange>> {
        self.update_status(actor, id, VendorStatus::Rejected).await
    }

    pub async fn suspend(&self, actor: Option<&AuthUser>, id: Uuid) -> AppResult<ApiResponse<VendorStatusChange>> {
        self.update_status(actor, id, VendorStatus::Suspended).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::{
        entity::{roles, users},
        error::ErrorKind,
    };

    fn role(slug: &str) -> roles::Model {
        roles::Model {
            id: Uuid::new_v4(),
            name: slug.to_string(),
            slug: slug.to_string(),
            created_at: Utc::now().into(),
        }
    }

    /// In-memory granter over a fixed catalog; records every association write.
    struct MemoryGranter {
        catalog: Vec<roles::Model>,
        writes: Mutex<Vec<String>>,
    }

    impl MemoryGranter {
        fn new(slugs: &[&str]) -> Self {
            Self {
                catalog: slugs.iter().map(|s| role(s)).collect(),
                writes: Mutex::new(Vec::new()),
            }
        }

        fn role(&self, slug: &str) -> roles::Model {
            self.catalog.iter().find(|r| r.slug == slug).cloned().unwrap()
        }

        fn writes(&self) -> Vec<String> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl RoleGranter for MemoryGranter {
        async fn grant_role(&self, user: &mut UserWithRoles, slug: &str) -> AppResult<()> {
            let role = self
                .catalog
                .iter()
                .find(|r| r.slug == slug)
                .cloned()
                .ok_or_else(|| AppError::RoleNotFound(slug.to_string()))?;
            if user.has_role_id(role.id) {
                return Ok(());
            }
            self.writes.lock().unwrap().push(format!("+{slug}"));
            user.roles.push(role);
            Ok(())
        }

        async fn revoke_role(&self, user: &mut UserWithRoles, slug: &str) -> AppResult<()> {
            self.writes.lock().unwrap().push(format!("-{slug}"));
            user.roles.retain(|r| r.slug != slug);
            Ok(())
        }
    }

    fn owner(roles: Vec<roles::Model>) -> UserWithRoles {
        let now = Utc::now();
        UserWithRoles {
            user: users::Model {
                id: Uuid::new_v4(),
                name: "Owner".into(),
                email: "owner@example.com".into(),
                password_hash: "x".into(),
                is_active: true,
                last_login_at: None,
                created_at: now.into(),
                updated_at: now.into(),
            },
            roles,
        }
    }

    #[tokio::test]
    async fn approval_grants_elevated_role_once() {
        let granter = MemoryGranter::new(&["user", "admin", "superadmin"]);
        let mut user = owner(vec![granter.role("user")]);

        sync_vendor_roles(&granter, &mut user, VendorStatus::Active).await.unwrap();
        sync_vendor_roles(&granter, &mut user, VendorStatus::Active).await.unwrap();

        assert!(user.has_role("admin"));
        assert!(user.has_role("user"));
        assert_eq!(user.roles.iter().filter(|r| r.slug == "admin").count(), 1);
        assert_eq!(granter.writes(), vec!["+admin".to_string()]);
    }

    #[tokio::test]
    async fn suspension_revokes_elevated_role_and_keeps_baseline() {
        let granter = MemoryGranter::new(&["user", "admin"]);
        let mut user = owner(vec![granter.role("admin")]);

        sync_vendor_roles(&granter, &mut user, VendorStatus::Suspended).await.unwrap();

        assert!(!user.has_role("admin"));
        assert!(user.has_role("user"));
        assert_eq!(granter.writes(), vec!["-admin".to_string(), "+user".to_string()]);
    }

    #[tokio::test]
    async fn rejecting_a_user_without_elevated_role_is_harmless() {
        let granter = MemoryGranter::new(&["user", "admin"]);
        let mut user = owner(vec![granter.role("user")]);

        sync_vendor_roles(&granter, &mut user, VendorStatus::Rejected).await.unwrap();

        assert_eq!(user.role_slugs(), vec!["user".to_string()]);
    }

    #[tokio::test]
    async fn missing_elevated_role_surfaces_role_not_found() {
        let granter = MemoryGranter::new(&["user"]);
        let mut user = owner(Vec::new());

        let err = sync_vendor_roles(&granter, &mut user, VendorStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RoleNotFound(ref slug) if slug == "admin"));
        assert!(user.roles.is_empty());
    }

    #[test]
    fn transition_onto_same_status_is_a_no_op_conflict() {
        let err = check_transition("active", VendorStatus::Active).unwrap_err();
        assert!(matches!(err, AppError::NoOpTransition(_)));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // the legacy spelling of the active status counts as the same status
        assert!(check_transition("approved", VendorStatus::Active).is_err());
        assert!(check_transition("pending", VendorStatus::Active).is_ok());
        assert!(check_transition("active", VendorStatus::Suspended).is_ok());
        assert!(check_transition("suspended", VendorStatus::Active).is_ok());
    }

    #[test]
    fn pending_target_changes_no_roles() {
        assert!(role_changes_for(VendorStatus::Pending).is_empty());
        assert_eq!(
            role_changes_for(VendorStatus::Active),
            &[RoleChange::Grant("admin"), RoleChange::Grant("user")]
        );
    }
}
