//! Append-only listing event log.
//!
//! Writes go through a unit of work; reads see committed events only.

use carbonex_types::*;

use crate::state::MarketState;
use crate::unit_of_work::UnitOfWork;

/// Stage an event. It becomes visible when the unit of work commits.
pub fn append(uow: &mut UnitOfWork<'_>, event: ListingEvent) {
    tracing::debug!(
        listing = %event.listing_id,
        event_type = %event.event_type,
        "listing event staged"
    );
    uow.append_event(event);
}

/// Events of one listing, in append order.
#[must_use]
pub fn for_listing(state: &MarketState, listing_id: ListingId) -> Vec<&ListingEvent> {
    state
        .events()
        .iter()
        .filter(|e| e.listing_id == listing_id)
        .collect()
}

/// Events caused by an org, in append order.
#[must_use]
pub fn by_actor<'s>(state: &'s MarketState, actor: &OrgCode) -> Vec<&'s ListingEvent> {
    state
        .events()
        .iter()
        .filter(|e| e.actor_org_code.as_ref() == Some(actor))
        .collect()
}
