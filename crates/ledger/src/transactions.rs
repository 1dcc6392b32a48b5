//! Transaction primitives.
//!
//! A `Transaction` records a single credit movement against a client. Its
//! balance effect is applied exactly once, when the status first becomes
//! settled (`approved` or `completed`), and reversed exactly once when it
//! leaves a settled state or is deleted while settled.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, ResultLedger};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Income,
    Expense,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// The operation that undoes this one on the balance.
    #[must_use]
    pub fn inverse(self) -> Self {
        match self {
            Self::Income => Self::Expense,
            Self::Expense => Self::Income,
        }
    }
}

impl TryFrom<&str> for Operation {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(LedgerError::InvalidOperation(format!(
                "invalid operation: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }

    /// Returns `true` for statuses whose balance effect has been applied.
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Approved | Self::Completed)
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "completed" => Ok(Self::Completed),
            other => Err(LedgerError::InvalidOperation(format!(
                "invalid status: {other}"
            ))),
        }
    }
}

/// A credit movement to run against a client balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreditOperation {
    pub operation: Operation,
    pub amount_minor: i64,
}

impl CreditOperation {
    #[must_use]
    pub fn new(operation: Operation, amount_minor: i64) -> Self {
        Self {
            operation,
            amount_minor,
        }
    }

    #[must_use]
    pub fn income(amount_minor: i64) -> Self {
        Self::new(Operation::Income, amount_minor)
    }

    #[must_use]
    pub fn expense(amount_minor: i64) -> Self {
        Self::new(Operation::Expense, amount_minor)
    }

    /// The movement that undoes this one.
    #[must_use]
    pub fn inverse(self) -> Self {
        Self::new(self.operation.inverse(), self.amount_minor)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub owner_id: String,
    pub client_id: Uuid,
    pub operation: Operation,
    pub status: TransactionStatus,
    pub amount_minor: i64,
    pub detail: Option<serde_json::Value>,
    pub invoice_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        owner_id: String,
        client_id: Uuid,
        operation: Operation,
        status: TransactionStatus,
        amount_minor: i64,
    ) -> ResultLedger<Self> {
        if amount_minor <= 0 {
            return Err(LedgerError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            client_id,
            operation,
            status,
            amount_minor,
            detail: None,
            invoice_id: None,
            created_at: Utc::now(),
        })
    }

    /// The credit movement this transaction applies when it settles.
    #[must_use]
    pub fn credit_operation(&self) -> CreditOperation {
        CreditOperation::new(self.operation, self.amount_minor)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub client_id: String,
    pub operation: String,
    pub status: String,
    pub amount_minor: i64,
    pub detail: Option<String>,
    pub invoice_id: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::clients::Entity",
        from = "Column::ClientId",
        to = "super::clients::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Clients,
}

impl Related<super::clients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clients.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            owner_id: ActiveValue::Set(tx.owner_id.clone()),
            client_id: ActiveValue::Set(tx.client_id.to_string()),
            operation: ActiveValue::Set(tx.operation.as_str().to_string()),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            detail: ActiveValue::Set(
                tx.detail
                    .as_ref()
                    .and_then(|v| serde_json::to_string(v).ok()),
            ),
            invoice_id: ActiveValue::Set(tx.invoice_id.clone()),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::KeyNotFound("transaction not exists".to_string()))?,
            owner_id: model.owner_id,
            client_id: Uuid::parse_str(&model.client_id)
                .map_err(|_| LedgerError::KeyNotFound("client not exists".to_string()))?,
            operation: Operation::try_from(model.operation.as_str())?,
            status: TransactionStatus::try_from(model.status.as_str())?,
            amount_minor: model.amount_minor,
            detail: model
                .detail
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok()),
            invoice_id: model.invoice_id,
            created_at: model.created_at,
        })
    }
}
