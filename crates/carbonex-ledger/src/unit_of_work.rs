//! Transactional context for one settlement operation.
//!
//! A [`UnitOfWork`] reads through to the committed [`MarketState`] and
//! stages every write in an owned [`ChangeSet`]. The store applies the
//! change set only if the operation returns `Ok`; otherwise it is dropped
//! and nothing the operation did is visible.
//!
//! Uniqueness constraints (org codes, certificate numbers, payment
//! references) are checked when a write is staged, so applying a change
//! set never fails.

use std::collections::{BTreeMap, HashMap};

use carbonex_types::*;
use rust_decimal::Decimal;

use crate::state::MarketState;
use crate::supply_conservation::ProjectSupply;

/// Writes staged by a unit of work.
#[derive(Debug, Default)]
pub struct ChangeSet {
    pub(crate) orgs: Vec<Organization>,
    pub(crate) projects: Vec<Project>,
    pub(crate) holdings: HashMap<(OrgId, ProjectId), Holding>,
    pub(crate) listings: BTreeMap<ListingId, Listing>,
    pub(crate) transactions: Vec<Transaction>,
    pub(crate) certificates: Vec<RetirementCertificate>,
    pub(crate) events: Vec<ListingEvent>,
    pub(crate) payments: Vec<Payment>,
    /// Resulting totals, not deltas.
    pub(crate) supply: HashMap<ProjectId, ProjectSupply>,
}

impl ChangeSet {
    /// Whether nothing was staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orgs.is_empty()
            && self.projects.is_empty()
            && self.holdings.is_empty()
            && self.listings.is_empty()
            && self.transactions.is_empty()
            && self.certificates.is_empty()
            && self.events.is_empty()
            && self.payments.is_empty()
            && self.supply.is_empty()
    }

    #[must_use]
    pub fn events(&self) -> &[ListingEvent] {
        &self.events
    }

    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }
}

/// Overlay of staged writes on top of committed state.
#[derive(Debug)]
pub struct UnitOfWork<'a> {
    base: &'a MarketState,
    changes: ChangeSet,
}

impl<'a> UnitOfWork<'a> {
    #[must_use]
    pub fn new(base: &'a MarketState) -> Self {
        Self {
            base,
            changes: ChangeSet::default(),
        }
    }

    /// Consume the unit of work, yielding its writes.
    #[must_use]
    pub fn into_changes(self) -> ChangeSet {
        self.changes
    }

    // =================================================================
    // Directory
    // =================================================================

    /// # Errors
    /// Returns [`CarbonexError::OrgNotFound`].
    pub fn org(&self, org_id: OrgId) -> Result<Organization> {
        self.changes
            .orgs
            .iter()
            .find(|o| o.org_id == org_id)
            .or_else(|| self.base.org(org_id))
            .cloned()
            .ok_or(CarbonexError::OrgNotFound(org_id))
    }

    /// # Errors
    /// Returns [`CarbonexError::OrgCodeNotFound`].
    pub fn org_by_code(&self, code: &OrgCode) -> Result<Organization> {
        self.changes
            .orgs
            .iter()
            .find(|o| &o.org_code == code)
            .or_else(|| self.base.org_by_code(code))
            .cloned()
            .ok_or_else(|| CarbonexError::OrgCodeNotFound(code.clone()))
    }

    /// # Errors
    /// Returns [`CarbonexError::ProjectNotFound`].
    pub fn project(&self, project_id: ProjectId) -> Result<Project> {
        self.changes
            .projects
            .iter()
            .find(|p| p.project_id == project_id)
            .or_else(|| self.base.project(project_id))
            .cloned()
            .ok_or(CarbonexError::ProjectNotFound(project_id))
    }

    /// Stage a new organization.
    ///
    /// # Errors
    /// Returns [`CarbonexError::DuplicateRecord`] if the id or code is taken.
    pub fn insert_org(&mut self, org: Organization) -> Result<()> {
        if self.org(org.org_id).is_ok() {
            return Err(CarbonexError::DuplicateRecord {
                what: "org_id",
                value: org.org_id.to_string(),
            });
        }
        if self.org_by_code(&org.org_code).is_ok() {
            return Err(CarbonexError::DuplicateRecord {
                what: "org_code",
                value: org.org_code.to_string(),
            });
        }
        self.changes.orgs.push(org);
        Ok(())
    }

    /// Stage a new project.
    ///
    /// # Errors
    /// Returns [`CarbonexError::DuplicateRecord`] if the id is taken.
    pub fn insert_project(&mut self, project: Project) -> Result<()> {
        if self.project(project.project_id).is_ok() {
            return Err(CarbonexError::DuplicateRecord {
                what: "project_id",
                value: project.project_id.to_string(),
            });
        }
        self.changes.projects.push(project);
        Ok(())
    }

    // =================================================================
    // Holdings
    // =================================================================

    /// Current holding, staged version first.
    #[must_use]
    pub fn holding(&self, org_id: OrgId, project_id: ProjectId) -> Option<Holding> {
        let key = (org_id, project_id);
        self.changes
            .holdings
            .get(&key)
            .or_else(|| self.base.holdings.get(&key))
            .cloned()
    }

    /// Stage a holding write.
    ///
    /// # Errors
    /// Returns [`CarbonexError::InvalidLockState`] if the lock invariant is broken.
    pub fn put_holding(&mut self, holding: Holding) -> Result<()> {
        holding.check_invariants()?;
        self.changes.holdings.insert(holding.key(), holding);
        Ok(())
    }

    // =================================================================
    // Listings
    // =================================================================

    /// # Errors
    /// Returns [`CarbonexError::ListingNotFound`].
    pub fn listing(&self, listing_id: ListingId) -> Result<Listing> {
        self.changes
            .listings
            .get(&listing_id)
            .or_else(|| self.base.listings.get(&listing_id))
            .cloned()
            .ok_or(CarbonexError::ListingNotFound(listing_id))
    }

    pub fn put_listing(&mut self, listing: Listing) {
        self.changes.listings.insert(listing.listing_id, listing);
    }

    /// First open listing, in creation order, matching all of `predicate`.
    #[must_use]
    pub fn find_listing(&self, predicate: impl Fn(&Listing) -> bool) -> Option<Listing> {
        let staged = self.changes.listings.values();
        let committed = self
            .base
            .listings
            .values()
            .filter(|l| !self.changes.listings.contains_key(&l.listing_id));
        staged
            .chain(committed)
            .filter(|l| predicate(l))
            .min_by_key(|l| l.listing_id)
            .cloned()
    }

    // =================================================================
    // History
    // =================================================================

    pub fn append_transaction(&mut self, tx: Transaction) {
        self.changes.transactions.push(tx);
    }

    pub fn append_event(&mut self, event: ListingEvent) {
        self.changes.events.push(event);
    }

    /// Stage a certificate.
    ///
    /// # Errors
    /// Returns [`CarbonexError::DuplicateRecord`] if the number is already issued.
    pub fn insert_certificate(&mut self, cert: RetirementCertificate) -> Result<()> {
        let taken = self
            .base
            .certificate_numbers
            .contains(&cert.certificate_number)
            || self
                .changes
                .certificates
                .iter()
                .any(|c| c.certificate_number == cert.certificate_number);
        if taken {
            return Err(CarbonexError::DuplicateRecord {
                what: "certificate_number",
                value: cert.certificate_number,
            });
        }
        self.changes.certificates.push(cert);
        Ok(())
    }

    /// Payment already recorded (committed or staged) for a payment intent.
    #[must_use]
    pub fn payment(&self, payment_intent_id: &str) -> Option<Payment> {
        self.changes
            .payments
            .iter()
            .find(|p| p.stripe_payment_intent_id == payment_intent_id)
            .or_else(|| self.base.payments.get(payment_intent_id))
            .cloned()
    }

    /// Stage a payment record.
    ///
    /// # Errors
    /// Returns [`CarbonexError::DuplicateSettlement`] if either provider id is
    /// already recorded.
    pub fn insert_payment(&mut self, payment: Payment) -> Result<()> {
        if self.payment(&payment.stripe_payment_intent_id).is_some() {
            return Err(CarbonexError::DuplicateSettlement(
                payment.stripe_payment_intent_id,
            ));
        }
        let event_seen = self
            .base
            .payment_event_ids
            .contains(&payment.stripe_event_id)
            || self
                .changes
                .payments
                .iter()
                .any(|p| p.stripe_event_id == payment.stripe_event_id);
        if event_seen {
            return Err(CarbonexError::DuplicateSettlement(payment.stripe_event_id));
        }
        self.changes.payments.push(payment);
        Ok(())
    }

    // =================================================================
    // Supply
    // =================================================================

    #[must_use]
    pub fn project_supply(&self, project_id: ProjectId) -> ProjectSupply {
        self.changes
            .supply
            .get(&project_id)
            .copied()
            .unwrap_or_else(|| self.base.supply().project(project_id))
    }

    /// # Errors
    /// Returns [`CarbonexError::InvalidAmount`] if the issued total would overflow.
    pub fn record_issuance(&mut self, project_id: ProjectId, amount: Decimal) -> Result<()> {
        let next = self.project_supply(project_id).issue(amount)?;
        self.changes.supply.insert(project_id, next);
        Ok(())
    }

    /// # Errors
    /// Returns [`CarbonexError::InvalidAmount`] if the retired total would overflow.
    pub fn record_retirement(&mut self, project_id: ProjectId, amount: Decimal) -> Result<()> {
        let next = self.project_supply(project_id).retire(amount)?;
        self.changes.supply.insert(project_id, next);
        Ok(())
    }
}
