//! Holding mutations inside a unit of work.
//!
//! Each holding tracks a `credit_balance` and the part of it that is
//! `locked_for_sale`:
//! - **Available** (`balance - locked`): can be listed, transferred or retired
//! - **Locked**: reserved by open listings
//!
//! The lifecycle for a listed credit:
//! 1. `credit` → credits arrive (issuance, purchase, transfer)
//! 2. `lock` → seller lists them, locked increases
//! 3. `fulfill` → a buyer takes them, locked and balance both decrease
//! 4. `unlock` → listing cancelled or shrunk, locked decreases
//!
//! Every write goes through [`UnitOfWork::put_holding`], which rejects a
//! holding whose lock exceeds its balance.

use carbonex_types::credits;
use carbonex_types::*;
use rust_decimal::Decimal;

use crate::unit_of_work::UnitOfWork;

/// Load a holding that must already exist.
///
/// # Errors
/// Returns [`CarbonexError::HoldingNotFound`].
pub fn require(uow: &UnitOfWork<'_>, org_id: OrgId, project_id: ProjectId) -> Result<Holding> {
    uow.holding(org_id, project_id)
        .ok_or(CarbonexError::HoldingNotFound {
            org: org_id,
            project: project_id,
        })
}

/// Add credits to a holding, creating it if absent.
///
/// # Errors
/// Returns `InvalidAmount` if `amount` is not positive or the balance
/// would overflow.
pub fn credit(
    uow: &mut UnitOfWork<'_>,
    org_id: OrgId,
    project_id: ProjectId,
    amount: Decimal,
) -> Result<Holding> {
    let amount = credits::validate_amount("amount", amount)?;
    let mut holding = uow
        .holding(org_id, project_id)
        .unwrap_or_else(|| Holding::new(org_id, project_id));
    holding.credit_balance = credits::add(holding.credit_balance, amount)?;
    stamp_and_put(uow, holding)
}

/// Remove available credits from a holding.
///
/// # Errors
/// `InvalidAmount`, `HoldingNotFound` or `InsufficientCredits`.
pub fn debit(
    uow: &mut UnitOfWork<'_>,
    org_id: OrgId,
    project_id: ProjectId,
    amount: Decimal,
) -> Result<Holding> {
    let amount = credits::validate_amount("amount", amount)?;
    let mut holding = require(uow, org_id, project_id)?;
    ensure_available(&holding, amount)?;
    holding.credit_balance = credits::sub(holding.credit_balance, amount);
    stamp_and_put(uow, holding)
}

/// Reserve credits for a listing.
///
/// Settlement operations compare the request against `available()` first
/// and report a shortfall as `InsufficientCredits`.
///
/// # Errors
/// `InvalidAmount`, `HoldingNotFound` or `InvalidLockState` if the lock
/// would exceed `credit_balance`.
pub fn lock(
    uow: &mut UnitOfWork<'_>,
    org_id: OrgId,
    project_id: ProjectId,
    amount: Decimal,
) -> Result<Holding> {
    let amount = credits::validate_amount("amount", amount)?;
    let mut holding = require(uow, org_id, project_id)?;
    let locked = credits::add(holding.locked_for_sale, amount)?;
    if locked > holding.credit_balance {
        return Err(CarbonexError::InvalidLockState {
            reason: format!(
                "cannot lock {amount}: {} of {} already locked",
                holding.locked_for_sale, holding.credit_balance
            ),
        });
    }
    holding.locked_for_sale = locked;
    stamp_and_put(uow, holding)
}

/// Release reserved credits back to available.
///
/// # Errors
/// `InvalidAmount`, `HoldingNotFound` or `InvalidLockState` if fewer than
/// `amount` credits are locked.
pub fn unlock(
    uow: &mut UnitOfWork<'_>,
    org_id: OrgId,
    project_id: ProjectId,
    amount: Decimal,
) -> Result<Holding> {
    let amount = credits::validate_amount("amount", amount)?;
    let mut holding = require(uow, org_id, project_id)?;
    if holding.locked_for_sale < amount {
        return Err(CarbonexError::InvalidLockState {
            reason: format!(
                "cannot unlock {amount}: only {} locked",
                holding.locked_for_sale
            ),
        });
    }
    holding.locked_for_sale = credits::sub(holding.locked_for_sale, amount);
    stamp_and_put(uow, holding)
}

/// Consume locked credits sold through a listing: locked and balance
/// both decrease by `amount`.
///
/// # Errors
/// `InvalidAmount`, `HoldingNotFound` or `InsufficientLockedCredits`.
pub fn fulfill(
    uow: &mut UnitOfWork<'_>,
    org_id: OrgId,
    project_id: ProjectId,
    amount: Decimal,
) -> Result<Holding> {
    let amount = credits::validate_amount("amount", amount)?;
    let mut holding = require(uow, org_id, project_id)?;
    if holding.locked_for_sale < amount {
        return Err(CarbonexError::InsufficientLockedCredits {
            needed: amount,
            locked: holding.locked_for_sale,
        });
    }
    holding.locked_for_sale = credits::sub(holding.locked_for_sale, amount);
    holding.credit_balance = credits::sub(holding.credit_balance, amount);
    stamp_and_put(uow, holding)
}

fn ensure_available(holding: &Holding, amount: Decimal) -> Result<()> {
    let available = holding.available();
    if available < amount {
        return Err(CarbonexError::InsufficientCredits {
            needed: amount,
            available,
        });
    }
    Ok(())
}

fn stamp_and_put(uow: &mut UnitOfWork<'_>, mut holding: Holding) -> Result<Holding> {
    holding.updated_at = chrono::Utc::now();
    uow.put_holding(holding.clone())?;
    Ok(holding)
}
