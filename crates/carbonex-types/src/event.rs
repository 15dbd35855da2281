//! Listing audit events.
//!
//! Events are append-only and purely observational: listing and holding
//! state is never rebuilt from them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{EventId, ListingId, OrgCode};

/// Kind of listing state transition being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingEventType {
    Created,
    Updated,
    PartiallyFilled,
    Filled,
    Closed,
    Cancelled,
}

impl std::fmt::Display for ListingEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Updated => write!(f, "UPDATED"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingEvent {
    pub event_id: EventId,
    pub listing_id: ListingId,
    pub event_type: ListingEventType,
    pub event_data: Value,
    /// Code of the org that caused the event. `None` for system events.
    pub actor_org_code: Option<OrgCode>,
    pub created_at: DateTime<Utc>,
}

impl ListingEvent {
    #[must_use]
    pub fn new(
        listing_id: ListingId,
        event_type: ListingEventType,
        event_data: Value,
        actor_org_code: Option<OrgCode>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            listing_id,
            event_type,
            event_data,
            actor_org_code,
            created_at: Utc::now(),
        }
    }

    /// `CREATED` for a seller listing.
    #[must_use]
    pub fn created(
        listing_id: ListingId,
        credits_available: Decimal,
        price_per_credit: Decimal,
        actor: OrgCode,
    ) -> Self {
        Self::new(
            listing_id,
            ListingEventType::Created,
            json!({
                "credits_available": credits_available,
                "price_per_credit": price_per_credit,
            }),
            Some(actor),
        )
    }

    /// `CREATED` for a registry-seeded listing.
    #[must_use]
    pub fn registry_created(
        listing_id: ListingId,
        credits_available: Decimal,
        price_per_credit: Decimal,
    ) -> Self {
        Self::new(
            listing_id,
            ListingEventType::Created,
            json!({
                "credits_available": credits_available,
                "price_per_credit": price_per_credit,
                "source": "registry",
            }),
            None,
        )
    }

    /// `UPDATED` when a sell merges into an existing listing at the same price.
    #[must_use]
    pub fn merged(
        listing_id: ListingId,
        credits_added: Decimal,
        new_credits_available: Decimal,
        price_per_credit: Decimal,
        actor: OrgCode,
    ) -> Self {
        Self::new(
            listing_id,
            ListingEventType::Updated,
            json!({
                "credits_added": credits_added,
                "new_credits_available": new_credits_available,
                "price_per_credit": price_per_credit,
            }),
            Some(actor),
        )
    }

    /// `UPDATED` after an owner edit. Only the changed fields are recorded;
    /// a quantity change is `(delta, new_credits_available)`.
    #[must_use]
    pub fn edited(
        listing_id: ListingId,
        new_price_per_credit: Option<Decimal>,
        quantity_change: Option<(Decimal, Decimal)>,
        actor: OrgCode,
    ) -> Self {
        let mut data = serde_json::Map::new();
        if let Some(price) = new_price_per_credit {
            data.insert("new_price_per_credit".into(), json!(price));
        }
        if let Some((delta, new_available)) = quantity_change {
            data.insert("quantity_delta".into(), json!(delta));
            data.insert("new_credits_available".into(), json!(new_available));
        }
        Self::new(listing_id, ListingEventType::Updated, Value::Object(data), Some(actor))
    }

    /// `FILLED` or `PARTIALLY_FILLED`, depending on what is left.
    #[must_use]
    pub fn fill(
        listing_id: ListingId,
        bought_quantity: Decimal,
        remaining_quantity: Decimal,
        price_per_credit: Decimal,
        actor: Option<OrgCode>,
    ) -> Self {
        let event_type = if remaining_quantity.is_zero() {
            ListingEventType::Filled
        } else {
            ListingEventType::PartiallyFilled
        };
        Self::new(
            listing_id,
            event_type,
            json!({
                "bought_quantity": bought_quantity,
                "remaining_quantity": remaining_quantity,
                "price_per_credit": price_per_credit,
            }),
            actor,
        )
    }

    /// `CLOSED` after depletion.
    #[must_use]
    pub fn fully_filled(listing_id: ListingId) -> Self {
        Self::new(
            listing_id,
            ListingEventType::Closed,
            json!({ "reason": "fully_filled" }),
            None,
        )
    }

    /// `CANCELLED` with the quantity that was still listed.
    #[must_use]
    pub fn cancelled(listing_id: ListingId, remaining_credits: Decimal, actor: OrgCode) -> Self {
        Self::new(
            listing_id,
            ListingEventType::Cancelled,
            json!({ "remaining_credits": remaining_credits }),
            Some(actor),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_display_matches_wire() {
        assert_eq!(ListingEventType::PartiallyFilled.to_string(), "PARTIALLY_FILLED");
        let json = serde_json::to_string(&ListingEventType::PartiallyFilled).unwrap();
        assert_eq!(json, "\"PARTIALLY_FILLED\"");
    }

    #[test]
    fn fill_picks_type_from_remaining() {
        let id = ListingId::new();
        let partial = ListingEvent::fill(id, Decimal::new(15, 0), Decimal::new(25, 0), Decimal::new(5, 0), None);
        assert_eq!(partial.event_type, ListingEventType::PartiallyFilled);
        let full = ListingEvent::fill(id, Decimal::new(25, 0), Decimal::ZERO, Decimal::new(5, 0), None);
        assert_eq!(full.event_type, ListingEventType::Filled);
    }

    #[test]
    fn closed_event_carries_reason() {
        let ev = ListingEvent::fully_filled(ListingId::new());
        assert_eq!(ev.event_data["reason"], "fully_filled");
        assert!(ev.actor_org_code.is_none());
    }

    #[test]
    fn registry_created_marks_source() {
        let ev = ListingEvent::registry_created(ListingId::new(), Decimal::TEN, Decimal::ONE);
        assert_eq!(ev.event_data["source"], "registry");
        assert_eq!(ev.event_data["credits_available"], "10");
    }

    #[test]
    fn cancelled_records_remaining() {
        let ev = ListingEvent::cancelled(ListingId::new(), Decimal::new(25, 0), OrgCode::new("AAA-1"));
        assert_eq!(ev.event_type, ListingEventType::Cancelled);
        assert_eq!(ev.event_data["remaining_credits"], "25");
    }

    #[test]
    fn edited_records_only_changes() {
        let ev = ListingEvent::edited(
            ListingId::new(),
            Some(Decimal::new(6, 0)),
            None,
            OrgCode::new("AAA-1"),
        );
        assert_eq!(ev.event_type, ListingEventType::Updated);
        assert_eq!(ev.event_data["new_price_per_credit"], "6");
        assert!(ev.event_data.get("quantity_delta").is_none());

        let ev = ListingEvent::edited(
            ListingId::new(),
            None,
            Some((Decimal::new(-10, 0), Decimal::new(30, 0))),
            OrgCode::new("AAA-1"),
        );
        assert_eq!(ev.event_data["quantity_delta"], "-10");
        assert_eq!(ev.event_data["new_credits_available"], "30");
    }
}
