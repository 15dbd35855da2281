//! The settlement engine: entry point for every ledger mutation.
//!
//! Each public operation runs as exactly one unit of work on the shared
//! [`MarketStore`]. The operations live in sibling modules as further
//! `impl SettlementEngine` blocks; this module holds construction, the
//! registry bootstrap paths, and the read-side queries.

use std::sync::Arc;

use carbonex_ledger::{MarketStore, event_log, holding_ledger, listing_store};
use carbonex_types::*;
use rust_decimal::Decimal;

/// Applies settlement operations to a shared market store.
#[derive(Debug, Clone)]
pub struct SettlementEngine {
    store: Arc<MarketStore>,
}

impl SettlementEngine {
    #[must_use]
    pub fn new(config: LedgerConfig) -> Self {
        Self::with_store(Arc::new(MarketStore::new(config)))
    }

    #[must_use]
    pub fn with_store(store: Arc<MarketStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<MarketStore> {
        &self.store
    }

    // =================================================================
    // Directory and registry bootstrap
    // =================================================================

    /// Register an organization.
    ///
    /// # Errors
    /// `DuplicateRecord` if the org id or code is taken.
    pub fn register_org(&self, org: Organization) -> Result<Organization> {
        self.store.transaction("register_org", |uow| {
            uow.insert_org(org.clone())?;
            tracing::info!(org = %org.org_id, code = %org.org_code, "org registered");
            Ok(org)
        })
    }

    /// Register a project.
    ///
    /// # Errors
    /// `DuplicateRecord` if the project id is taken.
    pub fn register_project(&self, project: Project) -> Result<Project> {
        self.store.transaction("register_project", |uow| {
            uow.insert_project(project.clone())?;
            tracing::info!(project = %project.project_id, name = %project.name, "project registered");
            Ok(project)
        })
    }

    /// Credit newly issued registry credits to an org's holding.
    ///
    /// Counts as issuance for supply conservation. No transaction is written.
    ///
    /// # Errors
    /// `OrgNotFound`, `ProjectNotFound` or `InvalidAmount`.
    pub fn seed_holding(
        &self,
        org_id: OrgId,
        project_id: ProjectId,
        amount: Decimal,
    ) -> Result<Holding> {
        self.store.transaction("seed_holding", |uow| {
            uow.org(org_id)?;
            uow.project(project_id)?;
            let holding = holding_ledger::credit(uow, org_id, project_id, amount)?;
            uow.record_issuance(project_id, credits::round_credits(amount))?;
            tracing::info!(
                org = %org_id,
                project = %project_id,
                amount = %amount,
                balance = %holding.credit_balance,
                "holding seeded"
            );
            Ok(holding)
        })
    }

    /// Create an open registry-owned listing (`seller_id = None`).
    ///
    /// # Errors
    /// `ProjectNotFound`, `InvalidAmount` or `InvalidPrice`.
    pub fn seed_registry_listing(
        &self,
        project_id: ProjectId,
        quantity: Decimal,
        price_per_credit: Decimal,
        external_trade_id: Option<String>,
    ) -> Result<Listing> {
        self.store.transaction("seed_registry_listing", |uow| {
            let project = uow.project(project_id)?;
            let mut metadata = project.listing_metadata();
            metadata.external_trade_id = external_trade_id;
            let listing = listing_store::create(
                uow,
                None,
                project_id,
                quantity,
                price_per_credit,
                metadata,
                None,
            )?;
            tracing::info!(
                listing = %listing.listing_id,
                project = %project_id,
                credits = %listing.credits_available,
                "registry listing seeded"
            );
            Ok(listing)
        })
    }

    // =================================================================
    // Invariants
    // =================================================================

    /// Check `Σ credit_balance == issued − retired` for one project.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` or `LockTimeout`.
    pub fn verify_supply(&self, project_id: ProjectId) -> Result<()> {
        self.store
            .read(|s| s.reconcile_supply(project_id))?
    }

    /// Check supply conservation for every project with recorded movement.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` or `LockTimeout`.
    pub fn verify_all_supply(&self) -> Result<()> {
        self.store.read(carbonex_ledger::MarketState::verify_supply)?
    }

    // =================================================================
    // Queries (committed state only)
    // =================================================================

    /// # Errors
    /// `LockTimeout`.
    pub fn org(&self, org_id: OrgId) -> Result<Option<Organization>> {
        self.store.read(|s| s.org(org_id).cloned())
    }

    /// # Errors
    /// `LockTimeout`.
    pub fn holding(&self, org_id: OrgId, project_id: ProjectId) -> Result<Option<Holding>> {
        self.store.read(|s| s.holding(org_id, project_id).cloned())
    }

    /// # Errors
    /// `LockTimeout`.
    pub fn holdings_for_org(&self, org_id: OrgId) -> Result<Vec<Holding>> {
        self.store
            .read(|s| s.holdings_for_org(org_id).into_iter().cloned().collect())
    }

    /// # Errors
    /// `LockTimeout`.
    pub fn listing(&self, listing_id: ListingId) -> Result<Option<Listing>> {
        self.store.read(|s| s.listing(listing_id).cloned())
    }

    /// All listings with `status`, oldest first.
    ///
    /// # Errors
    /// `LockTimeout`.
    pub fn listings(&self, status: ListingStatus) -> Result<Vec<Listing>> {
        self.store
            .read(|s| s.listings(Some(status)).into_iter().cloned().collect())
    }

    /// An org's listings with `status`, oldest first.
    ///
    /// # Errors
    /// `LockTimeout`.
    pub fn listings_for_seller(
        &self,
        org_id: OrgId,
        status: ListingStatus,
    ) -> Result<Vec<Listing>> {
        self.store.read(|s| {
            s.listings_for_seller(org_id, Some(status))
                .into_iter()
                .cloned()
                .collect()
        })
    }

    /// # Errors
    /// `LockTimeout`.
    pub fn listing_events(&self, listing_id: ListingId) -> Result<Vec<ListingEvent>> {
        self.store.read(|s| {
            event_log::for_listing(s, listing_id)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    /// Events attributed to an org, in chronological order.
    ///
    /// # Errors
    /// `LockTimeout`.
    pub fn events_by_org_code(&self, code: &OrgCode) -> Result<Vec<ListingEvent>> {
        self.store
            .read(|s| event_log::by_actor(s, code).into_iter().cloned().collect())
    }

    /// Transactions touching an org, newest first.
    ///
    /// # Errors
    /// `LockTimeout`.
    pub fn transactions_for_org(&self, org_id: OrgId) -> Result<Vec<Transaction>> {
        self.store
            .read(|s| s.transactions_for_org(org_id).into_iter().cloned().collect())
    }

    /// # Errors
    /// `LockTimeout`.
    pub fn certificates_for_org(&self, org_id: OrgId) -> Result<Vec<RetirementCertificate>> {
        self.store
            .read(|s| s.certificates_for_org(org_id).into_iter().cloned().collect())
    }

    /// # Errors
    /// `CertificateNotFound` or `LockTimeout`.
    pub fn certificate(&self, certificate_id: CertificateId) -> Result<RetirementCertificate> {
        self.store
            .read(|s| s.certificate(certificate_id).cloned())?
            .ok_or(CarbonexError::CertificateNotFound(certificate_id))
    }

    /// # Errors
    /// `LockTimeout`.
    pub fn payment(&self, payment_intent_id: &str) -> Result<Option<Payment>> {
        self.store.read(|s| s.payment(payment_intent_id).cloned())
    }
}

impl Default for SettlementEngine {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    #[test]
    fn seed_holding_requires_known_org_and_project() {
        let engine = SettlementEngine::default();
        let project = engine
            .register_project(Project::new("Mangrove", "ICR"))
            .unwrap();
        let err = engine
            .seed_holding(OrgId::new(), project.project_id, dec(10))
            .unwrap_err();
        assert!(matches!(err, CarbonexError::OrgNotFound(_)));

        let org = engine.register_org(Organization::new("AAA-1", "Alpha")).unwrap();
        let err = engine
            .seed_holding(org.org_id, ProjectId::new(), dec(10))
            .unwrap_err();
        assert!(matches!(err, CarbonexError::ProjectNotFound(_)));
    }

    #[test]
    fn seeding_counts_as_issuance() {
        let engine = SettlementEngine::default();
        let org = engine.register_org(Organization::new("AAA-1", "Alpha")).unwrap();
        let project = engine
            .register_project(Project::new("Mangrove", "ICR"))
            .unwrap();
        engine
            .seed_holding(org.org_id, project.project_id, dec(100))
            .unwrap();
        engine
            .seed_holding(org.org_id, project.project_id, dec(50))
            .unwrap();
        let holding = engine.holding(org.org_id, project.project_id).unwrap().unwrap();
        assert_eq!(holding.credit_balance, dec(150));
        assert!(engine.verify_supply(project.project_id).is_ok());
        assert!(engine.transactions_for_org(org.org_id).unwrap().is_empty());
    }

    #[test]
    fn seeding_past_decimal_range_fails_cleanly() {
        let engine = SettlementEngine::default();
        let alpha = engine.register_org(Organization::new("AAA-1", "Alpha")).unwrap();
        let beta = engine.register_org(Organization::new("BBB-2", "Beta")).unwrap();
        let project = engine
            .register_project(Project::new("Mangrove", "ICR"))
            .unwrap()
            .project_id;
        engine.seed_holding(alpha.org_id, project, Decimal::MAX).unwrap();

        let err = engine.seed_holding(alpha.org_id, project, dec(1)).unwrap_err();
        assert!(matches!(err, CarbonexError::InvalidAmount { .. }));
        let err = engine.seed_holding(beta.org_id, project, dec(1)).unwrap_err();
        assert!(matches!(err, CarbonexError::InvalidAmount { .. }));

        assert!(engine.holding(beta.org_id, project).unwrap().is_none());
        let holding = engine.holding(alpha.org_id, project).unwrap().unwrap();
        assert_eq!(holding.credit_balance, Decimal::MAX);
        engine.verify_supply(project).unwrap();
        engine.verify_all_supply().unwrap();
    }

    #[test]
    fn unknown_certificate_is_not_found() {
        let engine = SettlementEngine::default();
        let missing = CertificateId::new();
        let err = engine.certificate(missing).unwrap_err();
        assert!(matches!(err, CarbonexError::CertificateNotFound(id) if id == missing));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn registry_listing_copies_project_metadata() {
        let engine = SettlementEngine::default();
        let mut project = Project::new("Mangrove", "ICR");
        project.vintage_year = Some(2023);
        let project = engine.register_project(project).unwrap();
        let listing = engine
            .seed_registry_listing(project.project_id, dec(500), dec(12), Some("ext-9".into()))
            .unwrap();
        assert!(listing.is_registry_owned());
        assert_eq!(listing.metadata.project_name, "Mangrove");
        assert_eq!(listing.metadata.vintage_year, Some(2023));
        assert_eq!(listing.metadata.external_trade_id.as_deref(), Some("ext-9"));

        let events = engine.listing_events(listing.listing_id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, ListingEventType::Created);
        assert!(events[0].actor_org_code.is_none());
    }

    #[test]
    fn duplicate_org_code_rejected() {
        let engine = SettlementEngine::default();
        engine.register_org(Organization::new("AAA-1", "Alpha")).unwrap();
        let err = engine
            .register_org(Organization::new("AAA-1", "Other"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
