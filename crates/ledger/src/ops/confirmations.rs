//! Gateway confirmation adapter.
//!
//! Payment gateways retry notifications, so confirmations are idempotent:
//! every handled payment id is recorded in `processed_payments` and a
//! duplicate is acknowledged without touching the ledger. Records expire
//! after a TTL and are purged on the way in.

use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    ConfirmPaymentCmd, PaymentOutcome, ResultLedger, Transaction, TransactionStatus,
    UpdateTransactionCmd, processed_payments, transactions,
};

use super::{Ledger, transactions::update_transaction_in, with_tx};

/// What a confirmation did.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfirmationOutcome {
    /// The payment id was already handled; nothing changed.
    Duplicate,
    /// The referenced transaction was settled or rejected.
    Updated(Transaction),
    /// No transaction matched the reference. The notification is still
    /// acknowledged so the gateway stops retrying.
    UnknownReference,
}

/// Resolves a gateway reference: transaction id first, then invoice id.
async fn find_by_reference_in(
    db_tx: &DatabaseTransaction,
    reference: &str,
) -> ResultLedger<Option<transactions::Model>> {
    if let Ok(id) = Uuid::parse_str(reference) {
        let found = transactions::Entity::find_by_id(id.to_string())
            .one(db_tx)
            .await?;
        if found.is_some() {
            return Ok(found);
        }
    }

    let found = transactions::Entity::find()
        .filter(transactions::Column::InvoiceId.eq(reference))
        .one(db_tx)
        .await?;
    Ok(found)
}

impl Ledger {
    /// Handles a payment confirmation from the gateway.
    ///
    /// On `approved` the referenced transaction settles; on `declined` it is
    /// rejected. Re-settling an already settled transaction is a status-only
    /// no-op, so even a duplicate that slips past the processed-payment check
    /// cannot apply the balance effect twice.
    pub async fn confirm_payment(
        &self,
        cmd: ConfirmPaymentCmd,
    ) -> ResultLedger<ConfirmationOutcome> {
        let now = Utc::now();

        with_tx!(self, |db_tx| {
            processed_payments::Entity::delete_many()
                .filter(processed_payments::Column::ExpiresAt.lte(now))
                .exec(&db_tx)
                .await?;

            let seen = processed_payments::Entity::find_by_id(cmd.payment_id.clone())
                .one(&db_tx)
                .await?;
            if seen.is_some() {
                tracing::debug!(payment_id = %cmd.payment_id, "duplicate payment notification");
                Ok(ConfirmationOutcome::Duplicate)
            } else {
                let record = processed_payments::ActiveModel {
                    payment_id: ActiveValue::Set(cmd.payment_id.clone()),
                    processed_at: ActiveValue::Set(now),
                    expires_at: ActiveValue::Set(now + self.confirmation_ttl),
                };
                record.insert(&db_tx).await?;

                match find_by_reference_in(&db_tx, &cmd.reference).await? {
                    None => {
                        tracing::warn!(
                            payment_id = %cmd.payment_id,
                            reference = %cmd.reference,
                            "payment confirmation for unknown reference"
                        );
                        Ok(ConfirmationOutcome::UnknownReference)
                    }
                    Some(model) => {
                        let new_status = match cmd.outcome {
                            PaymentOutcome::Approved => TransactionStatus::Approved,
                            PaymentOutcome::Declined => TransactionStatus::Rejected,
                        };

                        let tx = update_transaction_in(
                            &db_tx,
                            model,
                            UpdateTransactionCmd::new().status(new_status),
                        )
                        .await?;

                        Ok(ConfirmationOutcome::Updated(tx))
                    }
                }
            }
        })
    }
}
