//! Credit ledger for shop-credit ("fiado") accounts.
//!
//! Clients carry a credit limit and a running balance. Transactions move the
//! balance through a pending → approved/completed lifecycle, with every
//! balance mutation running inside a database transaction so a settle and its
//! balance effect land (or fail) together.

pub use clients::{Client, CreditBalance};
pub use commands::{
    ClientData, ClientRef, ConfirmPaymentCmd, CreateTransactionCmd, PaymentOutcome,
    UpdateClientCmd, UpdateTransactionCmd,
};
pub use error::LedgerError;
pub use ops::{
    ClientListFilter, ConfirmationOutcome, Ledger, LedgerBuilder, ListOrder, TransactionListFilter,
};
pub use transactions::{CreditOperation, Operation, Transaction, TransactionStatus};

pub mod clients;
mod commands;
mod error;
mod ops;
pub mod processed_payments;
pub mod transactions;

type ResultLedger<T> = Result<T, LedgerError>;
