use std::future::Future;

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, Set,
    sea_query::OnConflict,
};
use uuid::Uuid;

use crate::{
    db::OrmConn,
    entity::{
        roles::{self, Column as RoleCol, Entity as Roles},
        user_roles::{ActiveModel as UserRoleActive, Column as UserRoleCol, Entity as UserRoles},
        users::{self, Entity as Users},
    },
    error::{AppError, AppResult},
};

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SUPERADMIN: &str = "superadmin";

/// Granted to a vendor's owner on approval; unlocks product management.
pub const ELEVATED_ROLE: &str = ROLE_ADMIN;

/// A user together with the role set loaded for it.
#[derive(Debug, Clone)]
pub struct UserWithRoles {
    pub user: users::Model,
    pub roles: Vec<roles::Model>,
}

impl UserWithRoles {
    pub fn has_role(&self, slug: &str) -> bool {
        has_role(&self.roles, slug)
    }

    pub fn has_role_id(&self, role_id: Uuid) -> bool {
        self.roles.iter().any(|r| r.id == role_id)
    }

    pub fn role_slugs(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.slug.clone()).collect()
    }
}

pub fn has_role(roles: &[roles::Model], slug: &str) -> bool {
    roles.iter().any(|r| r.slug == slug)
}

/// Capability to change a user's role associations.
///
/// Both operations keep `user.roles` in step with what was persisted.
pub trait RoleGranter: Send + Sync {
    /// Fails with [`AppError::RoleNotFound`] when `slug` is not configured.
    /// A role the user already holds is left alone.
    fn grant_role(
        &self,
        user: &mut UserWithRoles,
        slug: &str,
    ) -> impl Future<Output = AppResult<()>> + Send;

    /// Removing a role the user does not hold is not an error.
    fn revoke_role(
        &self,
        user: &mut UserWithRoles,
        slug: &str,
    ) -> impl Future<Output = AppResult<()>> + Send;
}

#[derive(Clone)]
pub struct OrmRoleGranter {
    conn: OrmConn,
}

impl OrmRoleGranter {
    pub fn new(conn: OrmConn) -> Self {
        Self { conn }
    }
}

impl RoleGranter for OrmRoleGranter {
    async fn grant_role(&self, user: &mut UserWithRoles, slug: &str) -> AppResult<()> {
        let role = find_role_by_slug(&self.conn, slug).await?;
        if user.has_role_id(role.id) {
            return Ok(());
        }
        attach_role(&self.conn, user.user.id, role.id).await?;
        tracing::debug!(user_id = %user.user.id, role = slug, "role granted");
        user.roles.push(role);
        Ok(())
    }

    async fn revoke_role(&self, user: &mut UserWithRoles, slug: &str) -> AppResult<()> {
        let role = Roles::find()
            .filter(RoleCol::Slug.eq(slug))
            .one(&self.conn)
            .await?;
        let Some(role) = role else {
            return Ok(());
        };

        UserRoles::delete_many()
            .filter(UserRoleCol::UserId.eq(user.user.id))
            .filter(UserRoleCol::RoleId.eq(role.id))
            .exec(&self.conn)
            .await?;
        tracing::debug!(user_id = %user.user.id, role = slug, "role revoked");
        user.roles.retain(|r| r.id != role.id);
        Ok(())
    }
}

pub async fn find_role_by_slug<C: ConnectionTrait>(conn: &C, slug: &str) -> AppResult<roles::Model> {
    Roles::find()
        .filter(RoleCol::Slug.eq(slug))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::RoleNotFound(slug.to_string()))
}

/// Insert the association; a concurrent duplicate insert is absorbed by the primary key.
pub async fn attach_role<C: ConnectionTrait>(conn: &C, user_id: Uuid, role_id: Uuid) -> AppResult<()> {
    let link = UserRoleActive {
        user_id: Set(user_id),
        role_id: Set(role_id),
    };
    UserRoles::insert(link)
        .on_conflict(
            OnConflict::columns([UserRoleCol::UserId, UserRoleCol::RoleId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub async fn load_user_with_roles<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<Option<UserWithRoles>> {
    let Some(user) = Users::find_by_id(user_id).one(conn).await? else {
        return Ok(None);
    };
    let roles = user.find_related(Roles).all(conn).await?;
    Ok(Some(UserWithRoles { user, roles }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn role(slug: &str) -> roles::Model {
        roles::Model {
            id: Uuid::new_v4(),
            name: slug.to_uppercase(),
            slug: slug.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn user_holding(roles: Vec<roles::Model>) -> UserWithRoles {
        let now = Utc::now();
        UserWithRoles {
            user: users::Model {
                id: Uuid::new_v4(),
                name: "Test".into(),
                email: "test@example.com".into(),
                password_hash: "x".into(),
                is_active: true,
                last_login_at: None,
                created_at: now.into(),
                updated_at: now.into(),
            },
            roles,
        }
    }

    #[test]
    fn has_role_matches_on_slug_not_name() {
        let admin = role("admin");
        let user = user_holding(vec![role("user"), admin.clone()]);
        assert!(user.has_role("admin"));
        assert!(!user.has_role("ADMIN"));
        assert!(!user.has_role("superadmin"));
        assert!(user.has_role_id(admin.id));
        assert_eq!(user.role_slugs(), vec!["user".to_string(), "admin".to_string()]);
    }

    #[test]
    fn empty_role_set_holds_nothing() {
        assert!(!has_role(&[], ROLE_USER));
    }
}
