//! Off-market movements: direct transfers and retirements.
//!
//! Both touch only available credits. Locked credits stay with their
//! listings.

use carbonex_ledger::holding_ledger;
use carbonex_types::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::SettlementEngine;

/// Parameters for a direct org-to-org transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub project_id: ProjectId,
    /// Recipient, addressed by public org code.
    pub to_org_code: OrgCode,
    pub amount: Decimal,
}

/// Parameters for a retirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetireRequest {
    pub project_id: ProjectId,
    pub amount: Decimal,
    pub purpose: Option<String>,
    pub beneficiary: Option<String>,
}

/// A retirement's transaction and the certificate backed by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetirementReceipt {
    pub transaction: Transaction,
    pub certificate: RetirementCertificate,
}

impl SettlementEngine {
    /// Move available credits to another org.
    ///
    /// # Errors
    /// `InvalidAmount`, `ActorWithoutOrg`, `OrgCodeNotFound`, `SelfTransfer`,
    /// `HoldingNotFound` or `InsufficientCredits`.
    pub fn transfer_credits(&self, actor: &Actor, request: TransferRequest) -> Result<Transaction> {
        let sender = actor.org()?;
        let amount = credits::validate_amount("amount", request.amount)?;
        let project_id = request.project_id;

        self.store().transaction("transfer_credits", |uow| {
            let recipient = uow.org_by_code(&request.to_org_code)?;
            if recipient.org_id == sender {
                return Err(CarbonexError::SelfTransfer);
            }

            holding_ledger::debit(uow, sender, project_id, amount)?;
            holding_ledger::credit(uow, recipient.org_id, project_id, amount)?;
            let tx = Transaction::transfer(sender, recipient.org_id, project_id, amount);
            uow.append_transaction(tx.clone());

            tracing::info!(
                tx = %tx.tx_id,
                from = %sender,
                to = %recipient.org_code,
                project = %project_id,
                amount = %amount,
                "credits transferred"
            );
            Ok(tx)
        })
    }

    /// Permanently burn available credits and issue a certificate.
    ///
    /// The `retire` transaction and its certificate commit together.
    ///
    /// # Errors
    /// `InvalidAmount`, `ActorWithoutOrg`, `HoldingNotFound`,
    /// `InsufficientCredits` or `DuplicateRecord`.
    pub fn retire_credits(&self, actor: &Actor, request: RetireRequest) -> Result<RetirementReceipt> {
        let org_id = actor.org()?;
        let amount = credits::validate_amount("amount", request.amount)?;
        let RetireRequest {
            project_id,
            purpose,
            beneficiary,
            ..
        } = request;

        self.store().transaction("retire_credits", |uow| {
            holding_ledger::debit(uow, org_id, project_id, amount)?;
            let tx = Transaction::retire(org_id, project_id, amount);
            let certificate = RetirementCertificate::issue(
                org_id,
                project_id,
                amount,
                tx.tx_id,
                non_blank(purpose),
                non_blank(beneficiary),
            );
            uow.append_transaction(tx.clone());
            uow.insert_certificate(certificate.clone())?;
            uow.record_retirement(project_id, amount)?;

            tracing::info!(
                tx = %tx.tx_id,
                org = %org_id,
                project = %project_id,
                amount = %amount,
                certificate = %certificate.certificate_number,
                "credits retired"
            );
            Ok(RetirementReceipt {
                transaction: tx,
                certificate,
            })
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
