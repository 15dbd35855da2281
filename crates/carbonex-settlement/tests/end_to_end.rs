//! End-to-end scenarios across the ledger and settlement engine.
//!
//! Covers the full listing lifecycle (sell → partial buy → final buy →
//! close), off-market transfers and retirements, duplicate payment
//! delivery, atomic rollback, and supply conservation under concurrency.

use std::sync::Arc;
use std::thread;

use carbonex_settlement::*;
use carbonex_types::*;
use rust_decimal::Decimal;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn dec(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

/// A market with a seller org A holding 100 credits of project P and a
/// buyer org B (`BBB-123456`) holding nothing.
struct Market {
    engine: SettlementEngine,
    a: Actor,
    b: Actor,
    a_code: OrgCode,
    b_code: OrgCode,
    project: ProjectId,
}

impl Market {
    fn new() -> Self {
        init_tracing();
        let engine = SettlementEngine::default();
        let a = engine
            .register_org(Organization::new("AAA-654321", "Alpha Forestry"))
            .unwrap();
        let b = engine
            .register_org(Organization::new("BBB-123456", "Beta Logistics"))
            .unwrap();
        let mut project = Project::new("Kalimantan Peatland", "Verra");
        project.vintage_year = Some(2022);
        let project = engine.register_project(project).unwrap().project_id;
        engine.seed_holding(a.org_id, project, dec(100)).unwrap();
        Self {
            engine,
            a: Actor::manager_of(a.org_id),
            b: Actor::manager_of(b.org_id),
            a_code: a.org_code,
            b_code: b.org_code,
            project,
        }
    }

    fn org(actor: &Actor) -> OrgId {
        actor.org_id.unwrap()
    }

    fn holding(&self, actor: &Actor) -> (Decimal, Decimal) {
        self.engine
            .holding(Self::org(actor), self.project)
            .unwrap()
            .map_or((Decimal::ZERO, Decimal::ZERO), |h| {
                (h.credit_balance, h.locked_for_sale)
            })
    }

    fn sell(&self, amount: i64, price: Decimal) -> SellReceipt {
        self.engine
            .sell_credits(
                &self.a,
                SellRequest {
                    project_id: self.project,
                    amount: dec(amount),
                    price_per_credit: price,
                },
            )
            .unwrap()
    }

    fn buy(&self, listing: ListingId, amount: i64, payment_intent: &str) -> Result<BuyOutcome> {
        self.engine.buy_via_webhook(PurchaseRequest {
            listing_id: listing,
            buyer_org_id: Self::org(&self.b),
            amount: dec(amount),
            payment: PaymentDetails::dummy(payment_intent),
        })
    }

    fn event_types(&self, listing: ListingId) -> Vec<ListingEventType> {
        self.engine
            .listing_events(listing)
            .unwrap()
            .iter()
            .map(|e| e.event_type)
            .collect()
    }

    fn assert_holdings_consistent(&self) {
        for actor in [&self.a, &self.b] {
            for h in self.engine.holdings_for_org(Self::org(actor)).unwrap() {
                assert!(h.is_consistent(), "inconsistent holding {h:?}");
            }
        }
    }
}

// =========================================================================
// Listing lifecycle
// =========================================================================

#[test]
fn full_listing_lifecycle() {
    let m = Market::new();
    let price = Decimal::new(50, 1);

    // Sell 40 @ 5.0: holding {100, 40}, new open listing, CREATED.
    let receipt = m.sell(40, price);
    assert_eq!(receipt.credits_available, dec(40));
    assert_eq!(m.holding(&m.a), (dec(100), dec(40)));
    let listing = m.engine.listing(receipt.listing_id).unwrap().unwrap();
    assert_eq!(listing.status, ListingStatus::Open);
    assert_eq!(listing.price_per_credit, price);
    assert_eq!(m.event_types(receipt.listing_id), vec![ListingEventType::Created]);

    // B buys 15: listing {25, open}, PARTIALLY_FILLED, seller {85, 25}, buyer {15, 0}.
    let outcome = m.buy(receipt.listing_id, 15, "pi_first").unwrap();
    assert!(!outcome.is_duplicate());
    let listing = m.engine.listing(receipt.listing_id).unwrap().unwrap();
    assert_eq!(listing.credits_available, dec(25));
    assert_eq!(listing.status, ListingStatus::Open);
    assert_eq!(m.holding(&m.a), (dec(85), dec(25)));
    assert_eq!(m.holding(&m.b), (dec(15), Decimal::ZERO));

    // B buys the remaining 25: listing {0, closed}, FILLED then CLOSED, seller {60, 0}.
    m.buy(receipt.listing_id, 25, "pi_second").unwrap();
    let listing = m.engine.listing(receipt.listing_id).unwrap().unwrap();
    assert_eq!(listing.credits_available, Decimal::ZERO);
    assert_eq!(listing.status, ListingStatus::Closed);
    assert_eq!(m.holding(&m.a), (dec(60), Decimal::ZERO));
    assert_eq!(m.holding(&m.b), (dec(40), Decimal::ZERO));
    assert_eq!(
        m.event_types(receipt.listing_id),
        vec![
            ListingEventType::Created,
            ListingEventType::PartiallyFilled,
            ListingEventType::Filled,
            ListingEventType::Closed,
        ]
    );

    let events = m.engine.listing_events(receipt.listing_id).unwrap();
    assert_eq!(events[1].actor_org_code.as_ref(), Some(&m.b_code));
    assert_eq!(events[1].event_data["bought_quantity"], "15");
    assert_eq!(events[1].event_data["remaining_quantity"], "25");
    assert_eq!(events[3].event_data["reason"], "fully_filled");
    assert!(events[3].actor_org_code.is_none());

    // A closed listing accepts no further purchases.
    let err = m.buy(receipt.listing_id, 1, "pi_third").unwrap_err();
    assert!(matches!(err, CarbonexError::ListingNotOpen { .. }));

    assert!(m.engine.verify_supply(m.project).is_ok());
    m.assert_holdings_consistent();
}

#[test]
fn listings_queryable_by_status_and_seller() {
    let m = Market::new();
    let open = m.sell(10, dec(5));
    let cancelled = m.sell(10, dec(6));
    m.engine.cancel_listing(&m.a, cancelled.listing_id).unwrap();

    let open_ids: Vec<_> = m
        .engine
        .listings_for_seller(Market::org(&m.a), ListingStatus::Open)
        .unwrap()
        .into_iter()
        .map(|l| l.listing_id)
        .collect();
    assert_eq!(open_ids, vec![open.listing_id]);
    let closed = m.engine.listings(ListingStatus::Closed).unwrap();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].listing_id, cancelled.listing_id);

    let by_a = m.engine.events_by_org_code(&m.a_code).unwrap();
    let types: Vec<_> = by_a.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![
            ListingEventType::Created,
            ListingEventType::Created,
            ListingEventType::Cancelled,
        ]
    );
}

// =========================================================================
// Transfers and retirements
// =========================================================================

#[test]
fn transfer_beyond_available_changes_nothing() {
    let m = Market::new();
    let receipt = m.sell(40, dec(5));
    m.buy(receipt.listing_id, 40, "pi_all").unwrap();
    assert_eq!(m.holding(&m.a), (dec(60), Decimal::ZERO));

    let err = m
        .engine
        .transfer_credits(
            &m.a,
            TransferRequest {
                project_id: m.project,
                to_org_code: OrgCode::new("BBB-123456"),
                amount: dec(1000),
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(m.holding(&m.a), (dec(60), Decimal::ZERO));
    assert_eq!(m.holding(&m.b), (dec(40), Decimal::ZERO));
    assert_eq!(m.engine.transactions_for_org(Market::org(&m.a)).unwrap().len(), 1);
}

#[test]
fn transfer_and_retire_history() {
    let m = Market::new();
    m.engine
        .transfer_credits(
            &m.a,
            TransferRequest {
                project_id: m.project,
                to_org_code: m.b_code.clone(),
                amount: Decimal::new(3050, 2),
            },
        )
        .unwrap();
    let retired = m
        .engine
        .retire_credits(
            &m.b,
            RetireRequest {
                project_id: m.project,
                amount: Decimal::new(1025, 2),
                purpose: Some("FY24 travel".into()),
                beneficiary: Some("Beta Logistics".into()),
            },
        )
        .unwrap();

    assert_eq!(m.holding(&m.a), (Decimal::new(6950, 2), Decimal::ZERO));
    assert_eq!(m.holding(&m.b), (Decimal::new(2025, 2), Decimal::ZERO));

    let history = m.engine.transactions_for_org(Market::org(&m.b)).unwrap();
    let types: Vec<_> = history.iter().map(|tx| tx.tx_type).collect();
    assert_eq!(types, vec![TransactionType::Retire, TransactionType::Transfer]);

    let certs = m.engine.certificates_for_org(Market::org(&m.b)).unwrap();
    assert_eq!(certs.len(), 1);
    assert_eq!(certs[0].certificate_number, retired.certificate.certificate_number);

    // Retirement is the only operation that shrinks supply.
    let supply: Decimal = [&m.a, &m.b].iter().map(|actor| m.holding(actor).0).sum();
    assert_eq!(supply, dec(100) - Decimal::new(1025, 2));
    assert!(m.engine.verify_supply(m.project).is_ok());
}

#[test]
fn certificate_numbers_are_unique() {
    let m = Market::new();
    let mut numbers = std::collections::HashSet::new();
    for _ in 0..20 {
        let receipt = m
            .engine
            .retire_credits(
                &m.a,
                RetireRequest {
                    project_id: m.project,
                    amount: Decimal::ONE,
                    purpose: None,
                    beneficiary: None,
                },
            )
            .unwrap();
        assert!(numbers.insert(receipt.certificate.certificate_number));
    }
    assert_eq!(m.holding(&m.a), (dec(80), Decimal::ZERO));
}

// =========================================================================
// Idempotence and atomicity
// =========================================================================

#[test]
fn replayed_payment_applies_once() {
    let m = Market::new();
    let receipt = m.sell(40, dec(5));

    let first = m.buy(receipt.listing_id, 15, "pi_replay").unwrap();
    let second = m.buy(receipt.listing_id, 15, "pi_replay").unwrap();
    let third = m.buy(receipt.listing_id, 15, "pi_replay").unwrap();

    assert!(!first.is_duplicate());
    assert!(second.is_duplicate() && third.is_duplicate());
    assert_eq!(second.transaction_id(), first.transaction_id());

    assert_eq!(m.holding(&m.b), (dec(15), Decimal::ZERO));
    assert_eq!(m.engine.transactions_for_org(Market::org(&m.b)).unwrap().len(), 1);
    assert_eq!(m.event_types(receipt.listing_id).len(), 2);
    assert!(m.engine.payment("pi_replay").unwrap().is_some());
}

#[test]
fn failed_purchase_can_be_redelivered() {
    let m = Market::new();
    let receipt = m.sell(10, dec(5));

    // Too large: whole unit aborts, payment not recorded.
    assert!(m.buy(receipt.listing_id, 11, "pi_retry").is_err());
    assert!(m.engine.payment("pi_retry").unwrap().is_none());

    // The seller lists more; the provider's redelivery now succeeds.
    m.sell(5, dec(5));
    let outcome = m.buy(receipt.listing_id, 11, "pi_retry").unwrap();
    assert!(!outcome.is_duplicate());
    assert_eq!(m.holding(&m.b), (dec(11), Decimal::ZERO));
}

// =========================================================================
// Concurrency and conservation
// =========================================================================

#[test]
fn concurrent_buyers_never_oversell() {
    let m = Market::new();
    let receipt = m.sell(40, dec(5));
    let engine = Arc::new(m.engine.clone());
    let buyer = Market::org(&m.b);

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine
                    .buy_via_webhook(PurchaseRequest {
                        listing_id: receipt.listing_id,
                        buyer_org_id: buyer,
                        amount: dec(3),
                        payment: PaymentDetails::dummy(&format!("pi_race_{i}")),
                    })
                    .is_ok()
            })
        })
        .collect();
    let filled = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    // 40 credits in lots of 3: 13 lots fit, the rest find too little inventory.
    assert_eq!(filled, 13);
    assert_eq!(m.holding(&m.b), (dec(39), Decimal::ZERO));
    assert_eq!(m.holding(&m.a), (dec(61), dec(1)));
    let listing = m.engine.listing(receipt.listing_id).unwrap().unwrap();
    assert_eq!(listing.credits_available, Decimal::ONE);
    assert!(m.engine.verify_all_supply().is_ok());
    m.assert_holdings_consistent();
}

#[test]
fn registry_sales_grow_supply_consistently() {
    let m = Market::new();
    let registry = m
        .engine
        .seed_registry_listing(m.project, dec(1000), dec(8), Some("REG-7781".into()))
        .unwrap();
    m.buy(registry.listing_id, 250, "pi_registry").unwrap();

    let err = m
        .engine
        .edit_listing(
            &m.a,
            EditRequest {
                listing_id: registry.listing_id,
                new_price: Some(dec(9)),
                new_quantity: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, CarbonexError::RegistryListingImmutable(_)));

    assert_eq!(m.holding(&m.b), (dec(250), Decimal::ZERO));
    assert!(m.engine.verify_supply(m.project).is_ok());
}
