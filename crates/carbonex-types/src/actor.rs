//! The authenticated caller of a settlement operation.
//!
//! Produced once at the authentication boundary and passed explicitly into
//! every operation. Role checks happen before the engine is invoked; the
//! engine only relies on `org_id`.

use serde::{Deserialize, Serialize};

use crate::{CarbonexError, OrgId, Result, UserId};

/// Role of a user within their organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Manager,
    Admin,
    Superadmin,
}

/// A verified `(user, role, org)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    pub org_id: Option<OrgId>,
}

impl Actor {
    #[must_use]
    pub fn new(user_id: UserId, role: Role, org_id: OrgId) -> Self {
        Self {
            user_id,
            role,
            org_id: Some(org_id),
        }
    }

    /// The organization this actor acts for.
    ///
    /// # Errors
    /// Returns [`CarbonexError::ActorWithoutOrg`] if the user has no org.
    pub fn org(&self) -> Result<OrgId> {
        self.org_id.ok_or(CarbonexError::ActorWithoutOrg)
    }
}

/// Fixture actor for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Actor {
    pub fn manager_of(org_id: OrgId) -> Self {
        Self::new(UserId::new(), Role::Manager, org_id)
    }
}
