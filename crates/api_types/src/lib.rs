use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Income,
    Expense,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

pub mod client {
    use super::*;

    /// Request body for creating a client, also embedded in transaction
    /// creation for on-the-fly resolution.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ClientNew {
        pub name: String,
        pub lastname: Option<String>,
        pub document: String,
        pub phone: Option<String>,
        pub email: Option<String>,
        pub city: Option<String>,
        /// Credit limit in minor units. Defaults to 0 when absent.
        pub credit_limit_minor: Option<i64>,
    }

    /// Partial client update. Missing fields are left untouched.
    ///
    /// The balance is not part of this body; it only moves through
    /// transaction settlement.
    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct ClientUpdate {
        pub name: Option<String>,
        pub lastname: Option<String>,
        pub document: Option<String>,
        pub phone: Option<String>,
        pub email: Option<String>,
        pub city: Option<String>,
        pub credit_limit_minor: Option<i64>,
        pub trusted: Option<bool>,
        pub blocked: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ClientView {
        pub id: Uuid,
        pub name: String,
        pub lastname: Option<String>,
        pub document: String,
        pub phone: Option<String>,
        pub email: Option<String>,
        pub city: Option<String>,
        pub credit_limit_minor: i64,
        pub current_balance_minor: i64,
        pub trusted: bool,
        pub blocked: bool,
        /// RFC3339 timestamp, UTC.
        pub created_at: DateTime<Utc>,
    }

    /// Query string for listing clients.
    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct ClientListQuery {
        pub blocked: Option<bool>,
        pub city: Option<String>,
        pub document: Option<String>,
        /// 1-based page number.
        pub page: Option<u64>,
        /// Clamped to 100.
        pub page_size: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ClientsResponse {
        pub clients: Vec<ClientView>,
        pub total: u64,
        pub page: u64,
        pub page_size: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub current_balance_minor: i64,
        pub credit_limit_minor: i64,
    }
}

pub mod transaction {
    use super::*;

    /// Request body for creating a transaction.
    ///
    /// Exactly one of `client_id` and `client_data` must be supplied.
    /// `owner_id` names the account the transaction belongs to; the intake
    /// endpoint is server-to-server, so the owner travels in the body.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub owner_id: String,
        pub client_id: Option<Uuid>,
        pub client_data: Option<client::ClientNew>,
        pub amount_minor: i64,
        pub operation: Operation,
        /// Initial status. Defaults to `pending` when absent; a settled
        /// status applies the balance effect at creation.
        pub status: Option<TransactionStatus>,
        pub detail: Option<serde_json::Value>,
        pub invoice_id: Option<String>,
    }

    /// Partial transaction update: only `status` and `detail` are mutable.
    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub status: Option<TransactionStatus>,
        pub detail: Option<serde_json::Value>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub client_id: Uuid,
        pub operation: Operation,
        pub status: TransactionStatus,
        pub amount_minor: i64,
        pub detail: Option<serde_json::Value>,
        pub invoice_id: Option<String>,
        /// RFC3339 timestamp, UTC.
        pub created_at: DateTime<Utc>,
    }

    /// Query string for listing transactions.
    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct TransactionListQuery {
        pub min_amount_minor: Option<i64>,
        pub max_amount_minor: Option<i64>,
        /// Matches client name or document, case-insensitive.
        pub client_search: Option<String>,
        pub from: Option<DateTime<Utc>>,
        pub to: Option<DateTime<Utc>>,
        pub status: Option<TransactionStatus>,
        /// `asc` or `desc` by creation time. Defaults to `desc`.
        pub order: Option<String>,
        /// 1-based page number.
        pub page: Option<u64>,
        /// Clamped to 100.
        pub page_size: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionsResponse {
        pub transactions: Vec<TransactionView>,
        pub total: u64,
        pub page: u64,
        pub page_size: u64,
    }
}

pub mod event {
    use super::*;

    /// Envelope for business events delivered by the event bus.
    ///
    /// Unknown event types are acknowledged and ignored.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct BusinessEvent {
        pub id: String,
        #[serde(rename = "type")]
        pub event_type: String,
        pub source: Option<String>,
        pub timestamp: Option<DateTime<Utc>>,
        pub data: EventData,
        pub metadata: EventMetadata,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct EventMetadata {
        pub user_id: String,
        pub trace_id: Option<String>,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct EventData {
        pub invoice: Option<InvoiceData>,
    }

    /// Invoice payload carried by `invoice.created` and `payment.completed`.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct InvoiceData {
        pub id: String,
        pub payment_type: Option<String>,
        pub payment_status: Option<String>,
        pub total_amount_minor: Option<i64>,
        pub tracking_number: Option<String>,
        pub client: Option<InvoiceClient>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct InvoiceClient {
        pub name: Option<String>,
        pub lastname: Option<String>,
        pub document_number: Option<String>,
        pub phone: Option<String>,
        pub email: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EventAck {
        pub success: bool,
        pub message: String,
    }
}

pub mod payment {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PaymentResult {
        Approved,
        Declined,
    }

    /// Gateway payment notification.
    ///
    /// `reference` is a transaction id or an invoice id; `payment_id` is the
    /// gateway's own id, used for idempotency.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct PaymentNotification {
        pub payment_id: String,
        pub reference: String,
        pub result: PaymentResult,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentAck {
        pub success: bool,
        pub message: String,
    }
}
