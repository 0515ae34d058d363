use prodreview_core::UserId;

use crate::{JwtClaims, Permission, Role, permissions_for_roles};

/// An authenticated caller, derived from verified token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn new(user_id: UserId, username: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id,
            username: username.into(),
            roles,
        }
    }

    /// Effective permissions granted by the principal's roles.
    pub fn permissions(&self) -> Vec<Permission> {
        permissions_for_roles(&self.roles)
    }
}

impl From<JwtClaims> for Principal {
    fn from(claims: JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            roles: claims.roles,
        }
    }
}
