//! Seller-side listing operations: sell, edit and cancel.
//!
//! None of these change any `credit_balance`. They move credits between
//! available and locked, and keep every open listing's inventory covered
//! by its seller's lock.

use carbonex_ledger::{holding_ledger, listing_store};
use carbonex_types::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::SettlementEngine;

/// Parameters for listing credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellRequest {
    pub project_id: ProjectId,
    pub amount: Decimal,
    pub price_per_credit: Decimal,
}

/// Outcome of a sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellReceipt {
    pub listing_id: ListingId,
    /// Inventory of the listing after this sell.
    pub credits_available: Decimal,
    /// `true` if the credits joined an existing listing at the same price.
    pub merged: bool,
}

/// Owner edit of an open listing. At least one field must change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRequest {
    pub listing_id: ListingId,
    pub new_price: Option<Decimal>,
    pub new_quantity: Option<Decimal>,
}

impl SettlementEngine {
    /// List credits the actor's org already holds.
    ///
    /// Joins an existing open listing by the same seller for the same
    /// project at the same price; otherwise opens a new one. Either way
    /// `amount` more credits are locked on the seller's holding.
    ///
    /// # Errors
    /// `InvalidAmount`, `InvalidPrice`, `ActorWithoutOrg`, `OrgNotFound`,
    /// `ProjectNotFound`, `HoldingNotFound` or `InsufficientCredits`.
    pub fn sell_credits(&self, actor: &Actor, request: SellRequest) -> Result<SellReceipt> {
        let seller = actor.org()?;
        let amount = credits::validate_amount("amount", request.amount)?;
        let price = credits::validate_price(request.price_per_credit)?;
        let project_id = request.project_id;

        self.store().transaction("sell_credits", |uow| {
            let org = uow.org(seller)?;
            let project = uow.project(project_id)?;

            let available = holding_ledger::require(uow, seller, project_id)?.available();
            if available < amount {
                return Err(CarbonexError::InsufficientCredits {
                    needed: amount,
                    available,
                });
            }

            let receipt = match listing_store::find_open(uow, seller, project_id, price) {
                Some(existing) => {
                    let listing =
                        listing_store::merge(uow, existing.listing_id, amount, org.org_code)?;
                    SellReceipt {
                        listing_id: listing.listing_id,
                        credits_available: listing.credits_available,
                        merged: true,
                    }
                }
                None => {
                    let listing = listing_store::create(
                        uow,
                        Some(seller),
                        project_id,
                        amount,
                        price,
                        project.listing_metadata(),
                        Some(org.org_code),
                    )?;
                    SellReceipt {
                        listing_id: listing.listing_id,
                        credits_available: listing.credits_available,
                        merged: false,
                    }
                }
            };
            holding_ledger::lock(uow, seller, project_id, amount)?;

            tracing::info!(
                org = %seller,
                project = %project_id,
                listing = %receipt.listing_id,
                amount = %amount,
                price = %price,
                merged = receipt.merged,
                "credits listed"
            );
            Ok(receipt)
        })
    }

    /// Change the price and/or quantity of the actor's open listing.
    ///
    /// Growing the quantity locks the difference from the seller's
    /// available credits; shrinking it unlocks the difference.
    ///
    /// # Errors
    /// `ActorWithoutOrg`, `ListingNotFound`, `ListingNotOpen`,
    /// `RegistryListingImmutable`, `NotListingOwner`, `InvalidPrice`,
    /// `InvalidAmount`, `NoValidChanges`, `HoldingNotFound`,
    /// `InsufficientCredits` or `InvalidLockState`.
    pub fn edit_listing(&self, actor: &Actor, request: EditRequest) -> Result<Listing> {
        let editor = actor.org()?;

        self.store().transaction("edit_listing", |uow| {
            let org = uow.org(editor)?;
            let outcome = listing_store::edit(
                uow,
                request.listing_id,
                editor,
                request.new_price,
                request.new_quantity,
                org.org_code,
            )?;
            let project_id = outcome.listing.project_id;
            let delta = outcome.quantity_delta;
            if delta > Decimal::ZERO {
                let available = holding_ledger::require(uow, editor, project_id)?.available();
                if available < delta {
                    return Err(CarbonexError::InsufficientCredits {
                        needed: delta,
                        available,
                    });
                }
                holding_ledger::lock(uow, editor, project_id, delta)?;
            } else if delta < Decimal::ZERO {
                holding_ledger::unlock(uow, editor, project_id, -delta)?;
            }

            tracing::info!(
                org = %editor,
                listing = %request.listing_id,
                price = %outcome.listing.price_per_credit,
                credits = %outcome.listing.credits_available,
                delta = %delta,
                "listing edited"
            );
            Ok(outcome.listing)
        })
    }

    /// Close the actor's open listing and release its remaining inventory.
    ///
    /// # Errors
    /// `ActorWithoutOrg`, `ListingNotFound`, `ListingNotOpen`,
    /// `RegistryListingImmutable`, `NotListingOwner`, `HoldingNotFound` or
    /// `InvalidLockState`.
    pub fn cancel_listing(&self, actor: &Actor, listing_id: ListingId) -> Result<Listing> {
        let owner = actor.org()?;

        self.store().transaction("cancel_listing", |uow| {
            let org = uow.org(owner)?;
            let (listing, remaining) = listing_store::cancel(uow, listing_id, owner, org.org_code)?;
            if remaining > Decimal::ZERO {
                holding_ledger::unlock(uow, owner, listing.project_id, remaining)?;
            }

            tracing::info!(
                org = %owner,
                listing = %listing_id,
                released = %remaining,
                "listing cancelled"
            );
            Ok(listing)
        })
    }
}
