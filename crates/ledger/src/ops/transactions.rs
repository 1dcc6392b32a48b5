//! Transaction lifecycle operations.
//!
//! Settling drives the credit ledger exactly once: the balance effect is
//! applied when the status first becomes settled, and reversed when it leaves
//! a settled state or the transaction is deleted while settled. Every
//! transition runs inside one database transaction, so a failed credit check
//! aborts the status change with it.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    ClientRef, CreateTransactionCmd, LedgerError, ResultLedger, Transaction, TransactionStatus,
    UpdateTransactionCmd, clients, transactions,
};

use super::{
    Ledger,
    clients::resolve_or_create_client_in,
    credits::{apply_operation_in, require_client_in},
    with_tx,
};

/// Maximum page size for listings.
const MAX_PAGE_SIZE: u64 = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListOrder {
    Asc,
    #[default]
    Desc,
}

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
/// `client_search` matches client name, lastname or document,
/// case-insensitive.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub min_amount_minor: Option<i64>,
    pub max_amount_minor: Option<i64>,
    pub client_search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub status: Option<TransactionStatus>,
    pub order: ListOrder,
    pub page: u64,
    pub page_size: u64,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultLedger<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(LedgerError::InvalidAmount(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if let (Some(min), Some(max)) = (filter.min_amount_minor, filter.max_amount_minor)
        && min > max
    {
        return Err(LedgerError::InvalidAmount(
            "invalid range: min_amount must be <= max_amount".to_string(),
        ));
    }
    Ok(())
}

/// Loads a transaction and enforces ownership.
///
/// A transaction that exists but belongs to another owner surfaces as
/// [`LedgerError::Forbidden`], not as a miss.
pub(super) async fn require_transaction_in(
    db_tx: &DatabaseTransaction,
    transaction_id: Uuid,
    user_id: &str,
) -> ResultLedger<transactions::Model> {
    let model = transactions::Entity::find_by_id(transaction_id.to_string())
        .one(db_tx)
        .await?
        .ok_or_else(|| LedgerError::KeyNotFound("transaction not exists".to_string()))?;

    if model.owner_id != user_id {
        return Err(LedgerError::Forbidden(
            "transaction belongs to another owner".to_string(),
        ));
    }

    Ok(model)
}

/// Undoes a settled transaction's balance effect.
///
/// A reversal that the credit rule rejects means the stored balance no
/// longer matches the transaction history, so it surfaces as
/// [`LedgerError::Consistency`] rather than a business error.
async fn reverse_operation_in(
    db_tx: &DatabaseTransaction,
    tx: &Transaction,
) -> ResultLedger<()> {
    let result = apply_operation_in(
        db_tx,
        tx.client_id,
        &tx.owner_id,
        tx.credit_operation().inverse(),
    )
    .await;
    match result {
        Ok(_) => Ok(()),
        Err(err @ LedgerError::Database(_)) => Err(err),
        Err(LedgerError::KeyNotFound(key)) => Err(LedgerError::KeyNotFound(key)),
        Err(err) => Err(LedgerError::Consistency(format!(
            "failed to reverse transaction {}: {err}",
            tx.id
        ))),
    }
}

/// Applies the status/detail patch and drives the ledger for the
/// settle/reverse transitions. Shared by update, confirmation and deletion
/// paths.
pub(super) async fn update_transaction_in(
    db_tx: &DatabaseTransaction,
    model: transactions::Model,
    cmd: UpdateTransactionCmd,
) -> ResultLedger<Transaction> {
    let mut tx = Transaction::try_from(model)?;
    let old_status = tx.status;
    let new_status = cmd.status.unwrap_or(old_status);

    if !old_status.is_settled() && new_status.is_settled() {
        apply_operation_in(db_tx, tx.client_id, &tx.owner_id, tx.credit_operation()).await?;
    } else if old_status.is_settled() && !new_status.is_settled() {
        reverse_operation_in(db_tx, &tx).await?;
    }
    // settled -> settled (approved -> completed) is a status-only change;
    // the balance effect is never applied twice.

    tx.status = new_status;
    if let Some(detail) = cmd.detail {
        tx.detail = Some(detail);
    }

    let update = transactions::ActiveModel {
        id: ActiveValue::Set(tx.id.to_string()),
        status: ActiveValue::Set(tx.status.as_str().to_string()),
        detail: ActiveValue::Set(
            tx.detail
                .as_ref()
                .and_then(|v| serde_json::to_string(v).ok()),
        ),
        ..Default::default()
    };
    update.update(db_tx).await?;

    Ok(tx)
}

impl Ledger {
    /// Creates a transaction, resolving or creating the client record.
    ///
    /// When the initial status is settled the balance effect is applied in
    /// the same database transaction; if the credit rule rejects it, nothing
    /// is persisted.
    pub async fn create_transaction(&self, cmd: CreateTransactionCmd) -> ResultLedger<Transaction> {
        if cmd.amount_minor <= 0 {
            return Err(LedgerError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let client = match &cmd.client {
                ClientRef::Id(client_id) => {
                    let model = require_client_in(&db_tx, *client_id, &cmd.owner_id).await?;
                    crate::Client::try_from(model)?
                }
                ClientRef::Data(data) => {
                    resolve_or_create_client_in(&db_tx, &cmd.owner_id, data).await?
                }
            };

            let mut tx = Transaction::new(
                cmd.owner_id.clone(),
                client.id,
                cmd.operation,
                cmd.status,
                cmd.amount_minor,
            )?;
            tx.detail = cmd.detail.clone();
            tx.invoice_id = cmd.invoice_id.clone();

            if tx.status.is_settled() {
                apply_operation_in(&db_tx, tx.client_id, &tx.owner_id, tx.credit_operation())
                    .await?;
            }

            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;

            Ok(tx)
        })
    }

    /// Returns a [`Transaction`] (snapshot from DB).
    pub async fn transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultLedger<Transaction> {
        with_tx!(self, |db_tx| {
            let model = require_transaction_in(&db_tx, transaction_id, user_id).await?;
            Transaction::try_from(model)
        })
    }

    /// Patches a transaction with the whitelisted fields of
    /// [`UpdateTransactionCmd`] and drives the ledger accordingly.
    ///
    /// On a failing settle the status change rolls back with the balance; the
    /// transaction keeps its previous status.
    pub async fn update_transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
        cmd: UpdateTransactionCmd,
    ) -> ResultLedger<Transaction> {
        with_tx!(self, |db_tx| {
            let model = require_transaction_in(&db_tx, transaction_id, user_id).await?;
            update_transaction_in(&db_tx, model, cmd).await
        })
    }

    /// Deletes a transaction, reversing its balance effect when settled.
    ///
    /// Deleting a transaction that never settled has no balance effect.
    pub async fn remove_transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultLedger<()> {
        with_tx!(self, |db_tx| {
            let model = require_transaction_in(&db_tx, transaction_id, user_id).await?;
            let tx = Transaction::try_from(model)?;

            if tx.status.is_settled() {
                reverse_operation_in(&db_tx, &tx).await?;
            }

            transactions::Entity::delete_by_id(tx.id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Lists the owner's transactions with filters and offset pagination.
    ///
    /// Returns `(items, total)` where `total` counts all rows matching the
    /// filter. Page size is clamped to 100.
    pub async fn transactions(
        &self,
        user_id: &str,
        filter: &TransactionListFilter,
    ) -> ResultLedger<(Vec<Transaction>, u64)> {
        validate_list_filter(filter)?;

        let page = filter.page.max(1);
        let page_size = filter.page_size.clamp(1, MAX_PAGE_SIZE);

        with_tx!(self, |db_tx| {
            let mut query = transactions::Entity::find()
                .filter(transactions::Column::OwnerId.eq(user_id));

            if let Some(min) = filter.min_amount_minor {
                query = query.filter(transactions::Column::AmountMinor.gte(min));
            }
            if let Some(max) = filter.max_amount_minor {
                query = query.filter(transactions::Column::AmountMinor.lte(max));
            }
            if let Some(from) = filter.from {
                query = query.filter(transactions::Column::CreatedAt.gte(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(transactions::Column::CreatedAt.lt(to));
            }
            if let Some(status) = filter.status {
                query = query.filter(transactions::Column::Status.eq(status.as_str()));
            }
            if let Some(search) = filter.client_search.as_deref().map(str::trim)
                && !search.is_empty()
            {
                let pattern = format!("%{}%", search.to_lowercase());
                let matching: Vec<String> = clients::Entity::find()
                    .filter(clients::Column::OwnerId.eq(user_id))
                    .filter(
                        Condition::any()
                            .add(Expr::cust("LOWER(name)").like(&pattern))
                            .add(Expr::cust("LOWER(lastname)").like(&pattern))
                            .add(Expr::cust("LOWER(document)").like(&pattern)),
                    )
                    .all(&db_tx)
                    .await?
                    .into_iter()
                    .map(|c| c.id)
                    .collect();
                query = query.filter(transactions::Column::ClientId.is_in(matching));
            }

            let total = query.clone().count(&db_tx).await?;

            query = match filter.order {
                ListOrder::Asc => query
                    .order_by_asc(transactions::Column::CreatedAt)
                    .order_by_asc(transactions::Column::Id),
                ListOrder::Desc => query
                    .order_by_desc(transactions::Column::CreatedAt)
                    .order_by_desc(transactions::Column::Id),
            };

            let models = query
                .offset((page - 1).saturating_mul(page_size).min(i64::MAX as u64))
                .limit(page_size)
                .all(&db_tx)
                .await?;

            let items = models
                .into_iter()
                .map(Transaction::try_from)
                .collect::<ResultLedger<Vec<_>>>()?;

            Ok((items, total))
        })
    }
}
