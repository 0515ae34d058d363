//! Role → permission policy and authorization checks.

use thiserror::Error;

use prodreview_core::UserId;

use crate::{Permission, Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("forbidden: only the owner may modify this resource")]
    NotOwner,
}

/// Map roles to the permissions they grant.
///
/// Every authenticated user may write reviews. Sellers create products,
/// moderators manage any review, admins get the wildcard.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    let mut perms = vec![Permission::REVIEWS_CREATE];

    for role in roles {
        match role.as_str() {
            Role::ADMIN => return vec![Permission::WILDCARD],
            Role::SELLER => perms.push(Permission::PRODUCTS_CREATE),
            Role::MODERATOR => perms.push(Permission::REVIEWS_MANAGE),
            _ => {}
        }
    }

    perms.dedup();
    perms
}

/// Check that the principal holds `required`.
///
/// - No IO
/// - No panics
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let granted = principal
        .permissions()
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Object-level check: the principal owns the resource, or holds `override_perm`.
pub fn authorize_owner(
    principal: &Principal,
    owner: Option<UserId>,
    override_perm: &Permission,
) -> Result<(), AuthzError> {
    if owner == Some(principal.user_id) {
        return Ok(());
    }
    authorize(principal, override_perm).map_err(|_| AuthzError::NotOwner)
}
