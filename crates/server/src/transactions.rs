//! Transaction API endpoints

use api_types::transaction::{
    TransactionListQuery, TransactionNew, TransactionUpdate, TransactionView,
    TransactionsResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, clients::client_data, server::ServerState, user};
use ledger::{
    ClientRef, CreateTransactionCmd, ListOrder, TransactionListFilter, UpdateTransactionCmd,
};

fn map_operation(op: api_types::Operation) -> ledger::Operation {
    match op {
        api_types::Operation::Income => ledger::Operation::Income,
        api_types::Operation::Expense => ledger::Operation::Expense,
    }
}

fn map_operation_view(op: ledger::Operation) -> api_types::Operation {
    match op {
        ledger::Operation::Income => api_types::Operation::Income,
        ledger::Operation::Expense => api_types::Operation::Expense,
    }
}

fn map_status(status: api_types::TransactionStatus) -> ledger::TransactionStatus {
    match status {
        api_types::TransactionStatus::Pending => ledger::TransactionStatus::Pending,
        api_types::TransactionStatus::Approved => ledger::TransactionStatus::Approved,
        api_types::TransactionStatus::Rejected => ledger::TransactionStatus::Rejected,
        api_types::TransactionStatus::Completed => ledger::TransactionStatus::Completed,
    }
}

fn map_status_view(status: ledger::TransactionStatus) -> api_types::TransactionStatus {
    match status {
        ledger::TransactionStatus::Pending => api_types::TransactionStatus::Pending,
        ledger::TransactionStatus::Approved => api_types::TransactionStatus::Approved,
        ledger::TransactionStatus::Rejected => api_types::TransactionStatus::Rejected,
        ledger::TransactionStatus::Completed => api_types::TransactionStatus::Completed,
    }
}

pub(crate) fn transaction_view(tx: ledger::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        client_id: tx.client_id,
        operation: map_operation_view(tx.operation),
        status: map_status_view(tx.status),
        amount_minor: tx.amount_minor,
        detail: tx.detail,
        invoice_id: tx.invoice_id,
        created_at: tx.created_at,
    }
}

pub(crate) fn build_create_cmd(payload: TransactionNew) -> Result<CreateTransactionCmd, ServerError> {
    let client = match (payload.client_id, payload.client_data) {
        (Some(id), None) => ClientRef::Id(id),
        (None, Some(data)) => ClientRef::Data(client_data(data)),
        _ => {
            return Err(ServerError::Generic(
                "exactly one of client_id and client_data required".to_string(),
            ));
        }
    };

    let mut cmd = CreateTransactionCmd::new(
        payload.owner_id,
        client,
        payload.amount_minor,
        map_operation(payload.operation),
    );
    if let Some(status) = payload.status {
        cmd = cmd.status(map_status(status));
    }
    if let Some(detail) = payload.detail {
        cmd = cmd.detail(detail);
    }
    if let Some(invoice_id) = payload.invoice_id {
        cmd = cmd.invoice_id(invoice_id);
    }

    Ok(cmd)
}

/// Handle server-to-server transaction intake.
///
/// A settled initial status applies the balance effect immediately; on a
/// credit failure nothing is persisted and the error maps to 422.
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let cmd = build_create_cmd(payload)?;
    let tx = state.ledger.create_transaction(cmd).await?;

    Ok((StatusCode::CREATED, Json(transaction_view(tx))))
}

/// Handle requests for listing transactions with filters and pagination.
pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<TransactionsResponse>, ServerError> {
    let order = match query.order.as_deref() {
        None | Some("desc") => ListOrder::Desc,
        Some("asc") => ListOrder::Asc,
        Some(other) => {
            return Err(ServerError::Generic(format!("invalid order: {other}")));
        }
    };

    let filter = TransactionListFilter {
        min_amount_minor: query.min_amount_minor,
        max_amount_minor: query.max_amount_minor,
        client_search: query.client_search,
        from: query.from,
        to: query.to,
        status: query.status.map(map_status),
        order,
        page: query.page.unwrap_or(1),
        page_size: query.page_size.unwrap_or(20),
    };

    let (items, total) = state.ledger.transactions(&user.username, &filter).await?;

    Ok(Json(TransactionsResponse {
        transactions: items.into_iter().map(transaction_view).collect(),
        total,
        page: filter.page.max(1),
        page_size: filter.page_size.clamp(1, 100),
    }))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.ledger.transaction(id, &user.username).await?;
    Ok(Json(transaction_view(tx)))
}

/// Handle requests for patching a transaction.
///
/// Only `status` and `detail` are mutable; status transitions drive the
/// credit ledger. A failing settle leaves the previous status in place.
pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    let mut cmd = UpdateTransactionCmd::new();
    if let Some(status) = payload.status {
        cmd = cmd.status(map_status(status));
    }
    if let Some(detail) = payload.detail {
        cmd = cmd.detail(detail);
    }

    let tx = state
        .ledger
        .update_transaction(id, &user.username, cmd)
        .await?;
    Ok(Json(transaction_view(tx)))
}

/// Handle requests for deleting a transaction.
///
/// Deleting a settled transaction reverses its balance effect first.
pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.ledger.remove_transaction(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
