//! Command structs for ledger operations.
//!
//! These types group parameters for write operations (client and transaction
//! creation, updates, payment confirmations), keeping call sites readable and
//! avoiding long argument lists.

use uuid::Uuid;

use crate::transactions::{Operation, TransactionStatus};

/// Client fields supplied by a caller, either to create a client directly or
/// embedded in a transaction for on-the-fly resolution.
#[derive(Clone, Debug)]
pub struct ClientData {
    pub name: String,
    pub lastname: Option<String>,
    pub document: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    pub credit_limit_minor: Option<i64>,
}

impl ClientData {
    #[must_use]
    pub fn new(name: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lastname: None,
            document: document.into(),
            phone: None,
            email: None,
            city: None,
            credit_limit_minor: None,
        }
    }

    #[must_use]
    pub fn lastname(mut self, lastname: impl Into<String>) -> Self {
        self.lastname = Some(lastname.into());
        self
    }

    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    #[must_use]
    pub fn credit_limit_minor(mut self, limit: i64) -> Self {
        self.credit_limit_minor = Some(limit);
        self
    }
}

/// How a transaction refers to its client: an existing id, or inline data to
/// resolve (by phone, document or email) and create on miss.
#[derive(Clone, Debug)]
pub enum ClientRef {
    Id(Uuid),
    Data(ClientData),
}

/// Whitelisted client patch. `current_balance` is deliberately absent: the
/// balance only moves through transaction settlement.
#[derive(Clone, Debug, Default)]
pub struct UpdateClientCmd {
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

impl UpdateClientCmd {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn lastname(mut self, lastname: impl Into<String>) -> Self {
        self.lastname = Some(lastname.into());
        self
    }

    #[must_use]
    pub fn document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    #[must_use]
    pub fn credit_limit_minor(mut self, limit: i64) -> Self {
        self.credit_limit_minor = Some(limit);
        self
    }

    #[must_use]
    pub fn trusted(mut self, trusted: bool) -> Self {
        self.trusted = Some(trusted);
        self
    }

    #[must_use]
    pub fn blocked(mut self, blocked: bool) -> Self {
        self.blocked = Some(blocked);
        self
    }
}

/// Create a transaction.
#[derive(Clone, Debug)]
pub struct CreateTransactionCmd {
    pub owner_id: String,
    pub client: ClientRef,
    pub amount_minor: i64,
    pub operation: Operation,
    pub status: TransactionStatus,
    pub detail: Option<serde_json::Value>,
    pub invoice_id: Option<String>,
}

impl CreateTransactionCmd {
    #[must_use]
    pub fn new(
        owner_id: impl Into<String>,
        client: ClientRef,
        amount_minor: i64,
        operation: Operation,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            client,
            amount_minor,
            operation,
            status: TransactionStatus::Pending,
            detail: None,
            invoice_id: None,
        }
    }

    #[must_use]
    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }

    #[must_use]
    pub fn invoice_id(mut self, invoice_id: impl Into<String>) -> Self {
        self.invoice_id = Some(invoice_id.into());
        self
    }
}

/// Whitelisted transaction patch: only `status` and `detail` are mutable.
/// Amount, operation, client and owner are immutable after creation.
#[derive(Clone, Debug, Default)]
pub struct UpdateTransactionCmd {
    pub status: Option<TransactionStatus>,
    pub detail: Option<serde_json::Value>,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Gateway verdict for a payment notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentOutcome {
    Approved,
    Declined,
}

/// Settle or reject a transaction from a gateway notification.
///
/// `reference` is matched against transaction ids first, then invoice ids.
#[derive(Clone, Debug)]
pub struct ConfirmPaymentCmd {
    pub payment_id: String,
    pub reference: String,
    pub outcome: PaymentOutcome,
}

impl ConfirmPaymentCmd {
    #[must_use]
    pub fn new(
        payment_id: impl Into<String>,
        reference: impl Into<String>,
        outcome: PaymentOutcome,
    ) -> Self {
        Self {
            payment_id: payment_id.into(),
            reference: reference.into(),
            outcome,
        }
    }
}
