//! Organizations and projects known to the ledger.

use serde::{Deserialize, Serialize};

use crate::{ListingMetadata, OrgCode, OrgId, ProjectId};

/// A credit-holding organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub org_id: OrgId,
    pub org_code: OrgCode,
    pub org_name: String,
}

impl Organization {
    #[must_use]
    pub fn new(org_code: impl Into<String>, org_name: impl Into<String>) -> Self {
        Self {
            org_id: OrgId::new(),
            org_code: OrgCode::new(org_code),
            org_name: org_name.into(),
        }
    }
}

/// A registry project whose credits are traded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: ProjectId,
    pub name: String,
    pub registry: String,
    pub vintage_year: Option<i32>,
}

impl Project {
    #[must_use]
    pub fn new(name: impl Into<String>, registry: impl Into<String>) -> Self {
        Self {
            project_id: ProjectId::new(),
            name: name.into(),
            registry: registry.into(),
            vintage_year: None,
        }
    }

    /// Listing attributes inherited from this project.
    #[must_use]
    pub fn listing_metadata(&self) -> ListingMetadata {
        ListingMetadata {
            project_name: self.name.clone(),
            registry: self.registry.clone(),
            vintage_year: self.vintage_year,
            external_trade_id: None,
        }
    }
}
