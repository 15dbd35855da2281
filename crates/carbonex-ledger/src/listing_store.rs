//! Listing mutations inside a unit of work.
//!
//! Every state change made here appends its audit event to the same unit
//! of work, so a listing and its event history always commit together.
//!
//! ```text
//!   create ──▶ OPEN ──┬── merge / edit ──▶ OPEN
//!                     ├── reduce (partial) ──▶ OPEN        [PARTIALLY_FILLED]
//!                     ├── reduce (to zero) ──▶ CLOSED      [FILLED, CLOSED]
//!                     └── cancel ──▶ CLOSED                [CANCELLED]
//! ```

use carbonex_types::credits;
use carbonex_types::*;
use rust_decimal::Decimal;

use crate::event_log;
use crate::unit_of_work::UnitOfWork;

/// Result of an owner edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub listing: Listing,
    /// Signed change to `credits_available`. Zero if the quantity was kept.
    pub quantity_delta: Decimal,
}

/// Create an open listing and record `CREATED`.
///
/// Registry listings (`seller_id = None`) are recorded with a null actor.
///
/// # Errors
/// `InvalidAmount` or `InvalidPrice`.
pub fn create(
    uow: &mut UnitOfWork<'_>,
    seller_id: Option<OrgId>,
    project_id: ProjectId,
    quantity: Decimal,
    price_per_credit: Decimal,
    metadata: ListingMetadata,
    actor: Option<OrgCode>,
) -> Result<Listing> {
    let quantity = credits::validate_amount("credits_available", quantity)?;
    let price = credits::validate_price(price_per_credit)?;
    let listing = Listing::open(seller_id, project_id, quantity, price, metadata);
    let event = match (seller_id, actor) {
        (Some(_), Some(actor)) => ListingEvent::created(listing.listing_id, quantity, price, actor),
        _ => ListingEvent::registry_created(listing.listing_id, quantity, price),
    };
    uow.put_listing(listing.clone());
    event_log::append(uow, event);
    Ok(listing)
}

/// Oldest open listing by `seller_id` for `project_id` at exactly `price`.
#[must_use]
pub fn find_open(
    uow: &UnitOfWork<'_>,
    seller_id: OrgId,
    project_id: ProjectId,
    price: Decimal,
) -> Option<Listing> {
    uow.find_listing(|l| {
        l.is_open()
            && l.seller_id == Some(seller_id)
            && l.project_id == project_id
            && l.price_per_credit == price
    })
}

/// Add credits to an open listing and record `UPDATED`.
///
/// # Errors
/// `ListingNotFound` or `ListingNotOpen`.
pub fn merge(
    uow: &mut UnitOfWork<'_>,
    listing_id: ListingId,
    amount: Decimal,
    actor: OrgCode,
) -> Result<Listing> {
    let mut listing = uow.listing(listing_id)?;
    listing.increase_available(amount)?;
    event_log::append(
        uow,
        ListingEvent::merged(
            listing_id,
            amount,
            listing.credits_available,
            listing.price_per_credit,
            actor,
        ),
    );
    uow.put_listing(listing.clone());
    Ok(listing)
}

/// Remove `amount` credits from an open listing.
///
/// Records `PARTIALLY_FILLED` or `FILLED`; a fill that depletes the
/// listing closes it and records `CLOSED` after the fill event.
///
/// # Errors
/// `ListingNotFound`, `ListingNotOpen` or `InsufficientInventory`.
pub fn reduce_available(
    uow: &mut UnitOfWork<'_>,
    listing_id: ListingId,
    amount: Decimal,
    actor: Option<OrgCode>,
) -> Result<(Listing, FillOutcome)> {
    let mut listing = uow.listing(listing_id)?;
    let outcome = listing.reduce_available(amount)?;
    event_log::append(
        uow,
        ListingEvent::fill(
            listing_id,
            outcome.filled,
            outcome.remaining,
            listing.price_per_credit,
            actor,
        ),
    );
    if outcome.closed {
        event_log::append(uow, ListingEvent::fully_filled(listing_id));
    }
    uow.put_listing(listing.clone());
    Ok((listing, outcome))
}

/// Apply an owner edit and record `UPDATED` with the changed fields.
///
/// A price equal to the current one is not a change. A quantity equal to
/// the current one is not a change. The caller adjusts the seller's lock
/// by the returned delta.
///
/// # Errors
/// `ListingNotFound`, `ListingNotOpen`, `RegistryListingImmutable`,
/// `NotListingOwner`, `InvalidPrice`, `InvalidAmount` or `NoValidChanges`.
pub fn edit(
    uow: &mut UnitOfWork<'_>,
    listing_id: ListingId,
    editor: OrgId,
    new_price: Option<Decimal>,
    new_quantity: Option<Decimal>,
    actor: OrgCode,
) -> Result<EditOutcome> {
    let mut listing = uow.listing(listing_id)?;
    listing.ensure_mutable_by(editor)?;

    let price_change = match new_price {
        Some(price) => {
            let price = credits::validate_price(price)?;
            (price != listing.price_per_credit).then_some(price)
        }
        None => None,
    };
    let quantity_change = match new_quantity {
        Some(quantity) => {
            let quantity = credits::validate_amount("new_quantity", quantity)?;
            let delta = credits::sub(quantity, listing.credits_available);
            (!delta.is_zero()).then_some((delta, quantity))
        }
        None => None,
    };
    if price_change.is_none() && quantity_change.is_none() {
        return Err(CarbonexError::NoValidChanges);
    }

    if let Some(price) = price_change {
        listing.set_price(price)?;
    }
    if let Some((_, quantity)) = quantity_change {
        listing.set_available(quantity)?;
    }
    event_log::append(
        uow,
        ListingEvent::edited(listing_id, price_change, quantity_change, actor),
    );
    uow.put_listing(listing.clone());
    Ok(EditOutcome {
        listing,
        quantity_delta: quantity_change.map_or(Decimal::ZERO, |(delta, _)| delta),
    })
}

/// Close an open listing on its owner's request and record `CANCELLED`.
///
/// Returns the listing as closed together with the quantity that was
/// still listed, which the caller unlocks.
///
/// # Errors
/// `ListingNotFound`, `ListingNotOpen`, `RegistryListingImmutable` or
/// `NotListingOwner`.
pub fn cancel(
    uow: &mut UnitOfWork<'_>,
    listing_id: ListingId,
    owner: OrgId,
    actor: OrgCode,
) -> Result<(Listing, Decimal)> {
    let mut listing = uow.listing(listing_id)?;
    listing.ensure_mutable_by(owner)?;
    let remaining = listing.credits_available;
    listing.cancel()?;
    event_log::append(uow, ListingEvent::cancelled(listing_id, remaining, actor));
    uow.put_listing(listing.clone());
    Ok((listing, remaining))
}
