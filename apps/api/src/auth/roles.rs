//! Who may do what. Row-level scoping for recruiters lives next to each query;
//! the capability checks here run before any database access.

use uuid::Uuid;

use crate::models::user::Role;

impl Role {
    pub fn can_manage_users(&self) -> bool {
        *self == Role::Admin
    }

    pub fn can_list_users(&self) -> bool {
        matches!(self, Role::Admin | Role::AccountManager)
    }

    pub fn can_manage_clients(&self) -> bool {
        matches!(self, Role::Admin | Role::AccountManager)
    }

    pub fn can_deactivate_clients(&self) -> bool {
        *self == Role::Admin
    }

    pub fn can_manage_requirements(&self) -> bool {
        matches!(self, Role::Admin | Role::AccountManager)
    }

    pub fn can_delete_candidates(&self) -> bool {
        matches!(self, Role::Admin | Role::AccountManager)
    }

    pub fn can_delete_applications(&self) -> bool {
        *self == Role::Admin
    }

    pub fn can_view_team_analytics(&self) -> bool {
        matches!(self, Role::Admin | Role::AccountManager)
    }

    /// Recruiters only see rows assigned to them; everyone else sees all rows.
    pub fn is_scoped_to_own_work(&self) -> bool {
        *self == Role::Recruiter
    }
}

/// True when `role` (acting as `actor`) may touch a row assigned to `assignee`.
pub fn can_access_assigned(role: Role, actor: Uuid, assignee: Option<Uuid>) -> bool {
    !role.is_scoped_to_own_work() || assignee == Some(actor)
}
