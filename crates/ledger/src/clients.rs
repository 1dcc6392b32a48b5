//! The module contains the representation of a client credit account.
//!
//! A client carries a credit limit and a running balance. The balance moves
//! only through [`Client::apply_operation`]: expenses consume credit, incomes
//! (payments) restore it.
//!
//! Amounts are stored as integer minor units (`i64`).
//!
//! # Examples
//!
//! Suppose a client with a credit limit of $1000.00 (100000 minor) and a
//! balance of $1000.00. An approved expense of $400.00 (40000 minor) brings
//! the balance to $600.00. Reverting that expense brings it back to $1000.00.
//!
//! The rule is symmetric: an expense may not exceed the current balance, and
//! an income may not push the balance above the credit limit.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    LedgerError, ResultLedger,
    transactions::{CreditOperation, Operation},
};

/// A client credit account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub owner_id: String,
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
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn new(
        owner_id: String,
        name: String,
        document: String,
        credit_limit_minor: Option<i64>,
    ) -> ResultLedger<Self> {
        let credit_limit_minor = credit_limit_minor.unwrap_or(0);
        if credit_limit_minor < 0 {
            return Err(LedgerError::InvalidAmount(
                "credit_limit_minor must be >= 0".to_string(),
            ));
        }
        // A fresh account starts with its full credit available.
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            lastname: None,
            document,
            phone: None,
            email: None,
            city: None,
            credit_limit_minor,
            current_balance_minor: credit_limit_minor,
            trusted: false,
            blocked: false,
            created_at: Utc::now(),
        })
    }

    /// Returns `true` if the balance covers an expense of `amount_minor`.
    #[must_use]
    pub fn has_sufficient_credit(&self, amount_minor: i64) -> bool {
        self.current_balance_minor >= amount_minor
    }

    /// Applies a credit operation to the balance.
    ///
    /// - `expense` fails with [`LedgerError::InsufficientCredit`] when the
    ///   balance does not cover the amount.
    /// - `income` fails with [`LedgerError::CreditLimitExceeded`] when the
    ///   resulting balance would go above the credit limit.
    ///
    /// On error the balance is left untouched.
    pub fn apply_operation(&mut self, op: CreditOperation) -> ResultLedger<()> {
        let amount = op.amount_minor;
        match op.operation {
            Operation::Expense => {
                if self.current_balance_minor < amount {
                    return Err(LedgerError::InsufficientCredit {
                        available: self.current_balance_minor,
                        requested: amount,
                    });
                }
                self.current_balance_minor -= amount;
            }
            Operation::Income => {
                // An amount that overflows i64 can only be over the limit.
                let attempted = self
                    .current_balance_minor
                    .checked_add(amount)
                    .ok_or(LedgerError::CreditLimitExceeded {
                        limit: self.credit_limit_minor,
                        attempted: i64::MAX,
                    })?;
                if attempted > self.credit_limit_minor {
                    return Err(LedgerError::CreditLimitExceeded {
                        limit: self.credit_limit_minor,
                        attempted,
                    });
                }
                self.current_balance_minor = attempted;
            }
        }
        Ok(())
    }
}

/// Read-only balance snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBalance {
    pub current_balance_minor: i64,
    pub credit_limit_minor: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
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
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Client> for ActiveModel {
    fn from(client: &Client) -> Self {
        Self {
            id: ActiveValue::Set(client.id.to_string()),
            owner_id: ActiveValue::Set(client.owner_id.clone()),
            name: ActiveValue::Set(client.name.clone()),
            lastname: ActiveValue::Set(client.lastname.clone()),
            document: ActiveValue::Set(client.document.clone()),
            phone: ActiveValue::Set(client.phone.clone()),
            email: ActiveValue::Set(client.email.clone()),
            city: ActiveValue::Set(client.city.clone()),
            credit_limit_minor: ActiveValue::Set(client.credit_limit_minor),
            current_balance_minor: ActiveValue::Set(client.current_balance_minor),
            trusted: ActiveValue::Set(client.trusted),
            blocked: ActiveValue::Set(client.blocked),
            created_at: ActiveValue::Set(client.created_at),
        }
    }
}

impl TryFrom<Model> for Client {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::KeyNotFound("client not exists".to_string()))?,
            owner_id: model.owner_id,
            name: model.name,
            lastname: model.lastname,
            document: model.document,
            phone: model.phone,
            email: model.email,
            city: model.city,
            credit_limit_minor: model.credit_limit_minor,
            current_balance_minor: model.current_balance_minor,
            trusted: model.trusted,
            blocked: model.blocked,
            created_at: model.created_at,
        })
    }
}
