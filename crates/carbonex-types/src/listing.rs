//! # Listing: an open offer to sell credits at a price
//!
//! ## State Machine
//!
//! ```text
//!   ┌──────┐  depleted / cancelled  ┌────────┐
//!   │ OPEN ├───────────────────────▶│ CLOSED │
//!   └──────┘                        └────────┘
//! ```
//!
//! Closing is **irreversible**: there is no path back to `OPEN`. Listings
//! are never physically deleted.
//!
//! A listing with `seller_id = None` is registry-owned. Registry listings
//! are sold like any other but no organization may edit or cancel them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CarbonexError, ListingId, OrgId, ProjectId, Result, credits};

/// Lifecycle status of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    /// Credits can be bought from this listing.
    Open,
    /// Terminal. Fully filled or cancelled.
    Closed,
}

impl ListingStatus {
    /// Can a listing in this status transition to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Open, Self::Closed))
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Descriptive attributes copied from the project at listing time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingMetadata {
    pub project_name: String,
    pub registry: String,
    pub vintage_year: Option<i32>,
    pub external_trade_id: Option<String>,
}

/// Result of removing credits from a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillOutcome {
    /// Credits removed by this fill.
    pub filled: Decimal,
    /// Credits still listed afterwards.
    pub remaining: Decimal,
    /// Whether the fill depleted and closed the listing.
    pub closed: bool,
}

/// A sale listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    pub listing_id: ListingId,
    pub project_id: ProjectId,
    /// `None` for registry-owned listings.
    pub seller_id: Option<OrgId>,
    pub credits_available: Decimal,
    pub price_per_credit: Decimal,
    pub status: ListingStatus,
    pub metadata: ListingMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Create a new open listing. Quantity and price are rounded to ledger precision.
    #[must_use]
    pub fn open(
        seller_id: Option<OrgId>,
        project_id: ProjectId,
        credits_available: Decimal,
        price_per_credit: Decimal,
        metadata: ListingMetadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            listing_id: ListingId::new(),
            project_id,
            seller_id,
            credits_available: credits::round_credits(credits_available),
            price_per_credit: credits::round_credits(price_per_credit),
            status: ListingStatus::Open,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == ListingStatus::Open
    }

    #[must_use]
    pub fn is_registry_owned(&self) -> bool {
        self.seller_id.is_none()
    }

    /// Fail unless the listing is open.
    ///
    /// # Errors
    /// Returns [`CarbonexError::ListingNotOpen`].
    pub fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CarbonexError::ListingNotOpen {
                listing: self.listing_id,
                status: self.status,
            })
        }
    }

    /// Fail unless `org` may edit or cancel this listing.
    ///
    /// Checks, in order: open, not registry-owned, owned by `org`.
    ///
    /// # Errors
    /// `ListingNotOpen`, `RegistryListingImmutable` or `NotListingOwner`.
    pub fn ensure_mutable_by(&self, org: OrgId) -> Result<()> {
        self.ensure_open()?;
        match self.seller_id {
            None => Err(CarbonexError::RegistryListingImmutable(self.listing_id)),
            Some(seller) if seller != org => Err(CarbonexError::NotListingOwner {
                listing: self.listing_id,
                actor: org,
            }),
            Some(_) => Ok(()),
        }
    }

    /// Remove `amount` credits. Closes the listing when it reaches exactly zero.
    ///
    /// # Errors
    /// `ListingNotOpen` or `InsufficientInventory`.
    pub fn reduce_available(&mut self, amount: Decimal) -> Result<FillOutcome> {
        self.ensure_open()?;
        if self.credits_available < amount {
            return Err(CarbonexError::InsufficientInventory {
                requested: amount,
                listed: self.credits_available,
            });
        }
        self.credits_available = credits::sub(self.credits_available, amount);
        let closed = self.credits_available.is_zero();
        if closed {
            self.transition(ListingStatus::Closed)?;
        }
        self.touch();
        Ok(FillOutcome {
            filled: amount,
            remaining: self.credits_available,
            closed,
        })
    }

    /// Add `amount` credits to an open listing (sell-merge path).
    ///
    /// # Errors
    /// `ListingNotOpen`, or `InvalidAmount` if the quantity would overflow.
    pub fn increase_available(&mut self, amount: Decimal) -> Result<()> {
        self.ensure_open()?;
        self.credits_available = credits::add(self.credits_available, amount)?;
        self.touch();
        Ok(())
    }

    /// Overwrite the listed quantity (edit path). Only legal while open.
    ///
    /// # Errors
    /// `ListingNotOpen`.
    pub fn set_available(&mut self, quantity: Decimal) -> Result<()> {
        self.ensure_open()?;
        self.credits_available = credits::round_credits(quantity);
        self.touch();
        Ok(())
    }

    /// Overwrite the price (edit path). Only legal while open.
    ///
    /// # Errors
    /// `ListingNotOpen` or `InvalidPrice`.
    pub fn set_price(&mut self, price: Decimal) -> Result<()> {
        self.ensure_open()?;
        self.price_per_credit = credits::validate_price(price)?;
        self.touch();
        Ok(())
    }

    /// Close an open listing explicitly.
    ///
    /// # Errors
    /// `ListingNotOpen`.
    pub fn cancel(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.transition(ListingStatus::Closed)?;
        self.touch();
        Ok(())
    }

    fn transition(&mut self, target: ListingStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(CarbonexError::ListingNotOpen {
                listing: self.listing_id,
                status: self.status,
            });
        }
        self.status = target;
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Fixture listing for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Listing {
    pub fn dummy(seller_id: Option<OrgId>, credits: Decimal, price: Decimal) -> Self {
        Self::open(
            seller_id,
            ProjectId::new(),
            credits,
            price,
            ListingMetadata {
                project_name: format!("Project {}", rand::random::<u16>()),
                registry: "ICR".to_string(),
                vintage_year: Some(2024),
                external_trade_id: None,
            },
        )
    }
}
