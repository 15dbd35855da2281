//! Immutable ledger movement records.
//!
//! A [`Transaction`] is written once per settled movement and never
//! updated. It is the system of record for history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ListingId, OrgId, ProjectId, TransactionId};

/// Kind of ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Buy,
    Sell,
    Transfer,
    Retire,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
            Self::Transfer => write!(f, "transfer"),
            Self::Retire => write!(f, "retire"),
        }
    }
}

/// One ledger movement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub tx_id: TransactionId,
    pub tx_type: TransactionType,
    /// Source org. `None` for registry-issued credits.
    pub from_org_id: Option<OrgId>,
    /// Destination org. `None` for retirements.
    pub to_org_id: Option<OrgId>,
    pub project_id: ProjectId,
    pub amount: Decimal,
    pub related_listing_id: Option<ListingId>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// A purchase from a listing. `seller` is `None` for registry listings.
    #[must_use]
    pub fn buy(
        seller: Option<OrgId>,
        buyer: OrgId,
        project_id: ProjectId,
        amount: Decimal,
        listing_id: ListingId,
    ) -> Self {
        Self::record(
            TransactionType::Buy,
            seller,
            Some(buyer),
            project_id,
            amount,
            Some(listing_id),
        )
    }

    /// A direct org-to-org transfer.
    #[must_use]
    pub fn transfer(from: OrgId, to: OrgId, project_id: ProjectId, amount: Decimal) -> Self {
        Self::record(
            TransactionType::Transfer,
            Some(from),
            Some(to),
            project_id,
            amount,
            None,
        )
    }

    /// A permanent burn.
    #[must_use]
    pub fn retire(org: OrgId, project_id: ProjectId, amount: Decimal) -> Self {
        Self::record(TransactionType::Retire, Some(org), None, project_id, amount, None)
    }

    fn record(
        tx_type: TransactionType,
        from_org_id: Option<OrgId>,
        to_org_id: Option<OrgId>,
        project_id: ProjectId,
        amount: Decimal,
        related_listing_id: Option<ListingId>,
    ) -> Self {
        Self {
            tx_id: TransactionId::new(),
            tx_type,
            from_org_id,
            to_org_id,
            project_id,
            amount,
            related_listing_id,
            created_at: Utc::now(),
        }
    }

    /// Whether `org` is on either side of this movement.
    #[must_use]
    pub fn involves(&self, org: OrgId) -> bool {
        self.from_org_id == Some(org) || self.to_org_id == Some(org)
    }
}
