//! Credit ledger operations.
//!
//! This is the only code that mutates `current_balance`. The transaction
//! engine and the confirmation adapter both go through
//! [`apply_operation_in`]; nothing else touches the balance column.

use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Client, CreditBalance, LedgerError, ResultLedger, clients, transactions::CreditOperation,
};

use super::{Ledger, with_tx};

/// Loads a client row scoped by owner, for update inside `db_tx`.
pub(super) async fn require_client_in(
    db_tx: &DatabaseTransaction,
    client_id: Uuid,
    owner_id: &str,
) -> ResultLedger<clients::Model> {
    clients::Entity::find_by_id(client_id.to_string())
        .filter(clients::Column::OwnerId.eq(owner_id))
        .one(db_tx)
        .await?
        .ok_or_else(|| LedgerError::KeyNotFound("client not exists".to_string()))
}

/// Applies a credit operation to a client balance inside an open transaction.
///
/// Runs the pure rule on the domain struct and persists the new balance. The
/// caller owns the commit, so a failing settle rolls back the whole unit.
pub(super) async fn apply_operation_in(
    db_tx: &DatabaseTransaction,
    client_id: Uuid,
    owner_id: &str,
    op: CreditOperation,
) -> ResultLedger<Client> {
    let model = require_client_in(db_tx, client_id, owner_id).await?;
    let mut client = Client::try_from(model)?;
    client.apply_operation(op)?;

    let update = clients::ActiveModel {
        id: ActiveValue::Set(client.id.to_string()),
        current_balance_minor: ActiveValue::Set(client.current_balance_minor),
        ..Default::default()
    };
    update.update(db_tx).await?;

    Ok(client)
}

impl Ledger {
    /// Returns `true` if the client balance covers an expense of
    /// `amount_minor`.
    pub async fn check_sufficient_credits(
        &self,
        client_id: Uuid,
        owner_id: &str,
        amount_minor: i64,
    ) -> ResultLedger<bool> {
        with_tx!(self, |db_tx| {
            let model = require_client_in(&db_tx, client_id, owner_id).await?;
            let client = Client::try_from(model)?;
            Ok(client.has_sufficient_credit(amount_minor))
        })
    }

    /// Applies a credit operation to a client balance.
    ///
    /// The read and the write run in one database transaction.
    pub async fn apply_operation(
        &self,
        client_id: Uuid,
        owner_id: &str,
        op: CreditOperation,
    ) -> ResultLedger<Client> {
        with_tx!(self, |db_tx| {
            apply_operation_in(&db_tx, client_id, owner_id, op).await
        })
    }

    /// Read-only balance snapshot.
    pub async fn balance(&self, client_id: Uuid, owner_id: &str) -> ResultLedger<CreditBalance> {
        with_tx!(self, |db_tx| {
            let model = require_client_in(&db_tx, client_id, owner_id).await?;
            Ok(CreditBalance {
                current_balance_minor: model.current_balance_minor,
                credit_limit_minor: model.credit_limit_minor,
            })
        })
    }
}
