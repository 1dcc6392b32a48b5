use axum::{Json, http::StatusCode, response::IntoResponse};
use ledger::LedgerError;

use serde::Serialize;
pub use server::{run, run_with_listener, spawn_with_listener};

mod clients;
mod server;
mod transactions;
mod user;
mod webhook;

pub mod types {
    pub mod client {
        pub use api_types::client::{
            BalanceView, ClientListQuery, ClientNew, ClientUpdate, ClientView, ClientsResponse,
        };
    }

    pub mod transaction {
        pub use api_types::transaction::{
            TransactionListQuery, TransactionNew, TransactionUpdate, TransactionView,
            TransactionsResponse,
        };
    }

    pub mod event {
        pub use api_types::event::{BusinessEvent, EventAck, InvoiceData};
    }

    pub mod payment {
        pub use api_types::payment::{PaymentAck, PaymentNotification, PaymentResult};
    }
}

pub enum ServerError {
    Ledger(LedgerError),
    Generic(String),
}

//TODO: Find a better solution
#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_ledger_error(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::Forbidden(_) => StatusCode::FORBIDDEN,
        LedgerError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::Conflict(_) => StatusCode::CONFLICT,
        LedgerError::Database(_) | LedgerError::Consistency(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        LedgerError::InsufficientCredit { .. }
        | LedgerError::CreditLimitExceeded { .. }
        | LedgerError::InvalidOperation(_)
        | LedgerError::InvalidAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_ledger_error(err: LedgerError) -> String {
    match err {
        LedgerError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        LedgerError::Consistency(detail) => {
            tracing::error!("consistency error: {detail}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Ledger(err) => (status_for_ledger_error(&err), message_for_ledger_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<LedgerError> for ServerError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}
