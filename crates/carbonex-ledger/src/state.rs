//! Committed market state and its read-side queries.
//!
//! [`MarketState`] is only ever mutated by applying a [`ChangeSet`]
//! produced by a successful unit of work. Readers see committed data
//! exclusively.

use std::collections::{BTreeMap, HashMap, HashSet};

use carbonex_types::*;
use rust_decimal::Decimal;

use crate::supply_conservation::SupplyRegister;
use crate::unit_of_work::ChangeSet;

/// All tables of the ledger.
#[derive(Debug, Default)]
pub struct MarketState {
    pub(crate) orgs: HashMap<OrgId, Organization>,
    pub(crate) org_codes: HashMap<OrgCode, OrgId>,
    pub(crate) projects: HashMap<ProjectId, Project>,
    pub(crate) holdings: HashMap<(OrgId, ProjectId), Holding>,
    /// Keyed by time-ordered id, so iteration is creation order.
    pub(crate) listings: BTreeMap<ListingId, Listing>,
    pub(crate) transactions: Vec<Transaction>,
    pub(crate) certificates: BTreeMap<CertificateId, RetirementCertificate>,
    pub(crate) certificate_numbers: HashSet<String>,
    /// Append order.
    pub(crate) events: Vec<ListingEvent>,
    /// Keyed by payment intent id.
    pub(crate) payments: HashMap<String, Payment>,
    pub(crate) payment_event_ids: HashSet<String>,
    pub(crate) supply: SupplyRegister,
}

impl MarketState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a committed change set into the tables.
    ///
    /// Uniqueness was enforced when the writes were staged, so this cannot fail.
    pub(crate) fn apply(&mut self, changes: ChangeSet) {
        for org in changes.orgs {
            self.org_codes.insert(org.org_code.clone(), org.org_id);
            self.orgs.insert(org.org_id, org);
        }
        for project in changes.projects {
            self.projects.insert(project.project_id, project);
        }
        self.holdings.extend(changes.holdings);
        self.listings.extend(changes.listings);
        self.transactions.extend(changes.transactions);
        for cert in changes.certificates {
            self.certificate_numbers
                .insert(cert.certificate_number.clone());
            self.certificates.insert(cert.certificate_id, cert);
        }
        self.events.extend(changes.events);
        for payment in changes.payments {
            self.payment_event_ids
                .insert(payment.stripe_event_id.clone());
            self.payments
                .insert(payment.stripe_payment_intent_id.clone(), payment);
        }
        for (project, totals) in changes.supply {
            self.supply.set(project, totals);
        }
    }

    // =================================================================
    // Directory
    // =================================================================

    #[must_use]
    pub fn org(&self, org_id: OrgId) -> Option<&Organization> {
        self.orgs.get(&org_id)
    }

    #[must_use]
    pub fn org_by_code(&self, code: &OrgCode) -> Option<&Organization> {
        self.org_codes.get(code).and_then(|id| self.orgs.get(id))
    }

    #[must_use]
    pub fn project(&self, project_id: ProjectId) -> Option<&Project> {
        self.projects.get(&project_id)
    }

    // =================================================================
    // Holdings
    // =================================================================

    #[must_use]
    pub fn holding(&self, org_id: OrgId, project_id: ProjectId) -> Option<&Holding> {
        self.holdings.get(&(org_id, project_id))
    }

    /// All holdings of an org, ordered by project.
    #[must_use]
    pub fn holdings_for_org(&self, org_id: OrgId) -> Vec<&Holding> {
        let mut out: Vec<&Holding> = self
            .holdings
            .values()
            .filter(|h| h.org_id == org_id)
            .collect();
        out.sort_by_key(|h| h.project_id);
        out
    }

    /// Σ credit_balance across all orgs for a project.
    ///
    /// # Errors
    /// Returns [`CarbonexError::SupplyInvariantViolation`] if the sum overflows.
    pub fn circulating_supply(&self, project_id: ProjectId) -> Result<Decimal> {
        self.holdings
            .values()
            .filter(|h| h.project_id == project_id)
            .try_fold(Decimal::ZERO, |sum, h| {
                sum.checked_add(h.credit_balance)
                    .ok_or_else(|| CarbonexError::SupplyInvariantViolation {
                        reason: format!("holdings of project {project_id} exceed {}", Decimal::MAX),
                    })
            })
    }

    // =================================================================
    // Listings
    // =================================================================

    #[must_use]
    pub fn listing(&self, listing_id: ListingId) -> Option<&Listing> {
        self.listings.get(&listing_id)
    }

    /// Listings in creation order, optionally filtered by status.
    #[must_use]
    pub fn listings(&self, status: Option<ListingStatus>) -> Vec<&Listing> {
        self.listings
            .values()
            .filter(|l| status.is_none_or(|s| l.status == s))
            .collect()
    }

    /// Listings sold by `org_id`, optionally filtered by status.
    #[must_use]
    pub fn listings_for_seller(
        &self,
        org_id: OrgId,
        status: Option<ListingStatus>,
    ) -> Vec<&Listing> {
        self.listings(status)
            .into_iter()
            .filter(|l| l.seller_id == Some(org_id))
            .collect()
    }

    // =================================================================
    // History
    // =================================================================

    /// All events, in append order.
    #[must_use]
    pub fn events(&self) -> &[ListingEvent] {
        &self.events
    }

    /// All transactions, in commit order.
    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Transactions where `org_id` is sender or receiver, newest first.
    #[must_use]
    pub fn transactions_for_org(&self, org_id: OrgId) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .rev()
            .filter(|tx| tx.involves(org_id))
            .collect()
    }

    #[must_use]
    pub fn certificate(&self, certificate_id: CertificateId) -> Option<&RetirementCertificate> {
        self.certificates.get(&certificate_id)
    }

    /// Certificates issued to `org_id`, newest first.
    #[must_use]
    pub fn certificates_for_org(&self, org_id: OrgId) -> Vec<&RetirementCertificate> {
        self.certificates
            .values()
            .rev()
            .filter(|c| c.org_id == org_id)
            .collect()
    }

    /// Payment recorded for a payment intent, if it was settled.
    #[must_use]
    pub fn payment(&self, payment_intent_id: &str) -> Option<&Payment> {
        self.payments.get(payment_intent_id)
    }

    #[must_use]
    pub fn supply(&self) -> &SupplyRegister {
        &self.supply
    }

    /// Reconcile one project's holdings against its registry totals.
    ///
    /// # Errors
    /// Returns [`CarbonexError::SupplyInvariantViolation`] on a mismatch.
    pub fn reconcile_supply(&self, project_id: ProjectId) -> Result<()> {
        self.supply
            .reconcile(project_id, self.circulating_supply(project_id)?)
    }

    /// Check supply conservation for every project the registry touched.
    ///
    /// # Errors
    /// Returns [`CarbonexError::SupplyInvariantViolation`] on the first mismatch.
    pub fn verify_supply(&self) -> Result<()> {
        for project in self.supply.projects() {
            self.reconcile_supply(project)?;
        }
        Ok(())
    }
}
