use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use ledger::{
    Client, ClientData, ClientListFilter, ClientRef, ConfirmPaymentCmd, ConfirmationOutcome,
    CreateTransactionCmd, Ledger, LedgerError, ListOrder, Operation, PaymentOutcome,
    TransactionListFilter, TransactionStatus, UpdateTransactionCmd,
};
use migration::MigratorTrait;

async fn ledger_with_db() -> (Ledger, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password) VALUES (?, ?)",
        vec!["alice".into(), "password".into()],
    ))
    .await
    .unwrap();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password) VALUES (?, ?)",
        vec!["bob".into(), "password".into()],
    ))
    .await
    .unwrap();
    let ledger = Ledger::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (ledger, db)
}

async fn client_with_limit(ledger: &Ledger, limit: i64) -> Client {
    ledger
        .create_client(
            "alice",
            ClientData::new("Maria", "12345678").credit_limit_minor(limit),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn settled_expense_at_creation_debits_balance() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    let tx = ledger
        .create_transaction(
            CreateTransactionCmd::new("alice", ClientRef::Id(client.id), 40_000, Operation::Expense)
                .status(TransactionStatus::Approved),
        )
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Approved);

    let balance = ledger.balance(client.id, "alice").await.unwrap();
    assert_eq!(balance.current_balance_minor, 60_000);
    assert_eq!(balance.credit_limit_minor, 100_000);
}

#[tokio::test]
async fn reverting_to_pending_restores_balance() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    let tx = ledger
        .create_transaction(
            CreateTransactionCmd::new("alice", ClientRef::Id(client.id), 40_000, Operation::Expense)
                .status(TransactionStatus::Approved),
        )
        .await
        .unwrap();

    let tx = ledger
        .update_transaction(
            tx.id,
            "alice",
            UpdateTransactionCmd::new().status(TransactionStatus::Pending),
        )
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);

    let balance = ledger.balance(client.id, "alice").await.unwrap();
    assert_eq!(balance.current_balance_minor, 100_000);
}

#[tokio::test]
async fn insufficient_credit_rejects_and_persists_nothing() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    // Bring the balance down to 50_000 first.
    ledger
        .create_transaction(
            CreateTransactionCmd::new("alice", ClientRef::Id(client.id), 50_000, Operation::Expense)
                .status(TransactionStatus::Approved),
        )
        .await
        .unwrap();

    let err = ledger
        .create_transaction(
            CreateTransactionCmd::new("alice", ClientRef::Id(client.id), 60_000, Operation::Expense)
                .status(TransactionStatus::Approved),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientCredit {
            available: 50_000,
            requested: 60_000,
        }
    );

    let balance = ledger.balance(client.id, "alice").await.unwrap();
    assert_eq!(balance.current_balance_minor, 50_000);

    // The rejected transaction must not have been persisted.
    let (items, total) = ledger
        .transactions("alice", &TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn income_over_limit_is_rejected() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    ledger
        .create_transaction(
            CreateTransactionCmd::new("alice", ClientRef::Id(client.id), 10_000, Operation::Expense)
                .status(TransactionStatus::Approved),
        )
        .await
        .unwrap();

    let err = ledger
        .create_transaction(
            CreateTransactionCmd::new("alice", ClientRef::Id(client.id), 20_000, Operation::Income)
                .status(TransactionStatus::Approved),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::CreditLimitExceeded {
            limit: 100_000,
            attempted: 110_000,
        }
    );

    let balance = ledger.balance(client.id, "alice").await.unwrap();
    assert_eq!(balance.current_balance_minor, 90_000);
}

#[tokio::test]
async fn oversized_income_is_rejected_with_typed_error() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    ledger
        .create_transaction(
            CreateTransactionCmd::new("alice", ClientRef::Id(client.id), 10_000, Operation::Expense)
                .status(TransactionStatus::Approved),
        )
        .await
        .unwrap();

    let err = ledger
        .create_transaction(
            CreateTransactionCmd::new(
                "alice",
                ClientRef::Id(client.id),
                i64::MAX,
                Operation::Income,
            )
            .status(TransactionStatus::Approved),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::CreditLimitExceeded { .. }));

    let balance = ledger.balance(client.id, "alice").await.unwrap();
    assert_eq!(balance.current_balance_minor, 90_000);
}

#[tokio::test]
async fn deleting_settled_expense_restores_balance() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    let tx = ledger
        .create_transaction(
            CreateTransactionCmd::new("alice", ClientRef::Id(client.id), 10_000, Operation::Expense)
                .status(TransactionStatus::Approved),
        )
        .await
        .unwrap();

    ledger.remove_transaction(tx.id, "alice").await.unwrap();

    let balance = ledger.balance(client.id, "alice").await.unwrap();
    assert_eq!(balance.current_balance_minor, 100_000);

    let err = ledger.transaction(tx.id, "alice").await.unwrap_err();
    assert!(matches!(err, LedgerError::KeyNotFound(_)));
}

#[tokio::test]
async fn deleting_pending_transaction_leaves_balance_alone() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    let tx = ledger
        .create_transaction(CreateTransactionCmd::new(
            "alice",
            ClientRef::Id(client.id),
            10_000,
            Operation::Expense,
        ))
        .await
        .unwrap();

    ledger.remove_transaction(tx.id, "alice").await.unwrap();

    let balance = ledger.balance(client.id, "alice").await.unwrap();
    assert_eq!(balance.current_balance_minor, 100_000);
}

#[tokio::test]
async fn settling_twice_applies_effect_once() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    let tx = ledger
        .create_transaction(CreateTransactionCmd::new(
            "alice",
            ClientRef::Id(client.id),
            40_000,
            Operation::Expense,
        ))
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);

    let tx = ledger
        .update_transaction(
            tx.id,
            "alice",
            UpdateTransactionCmd::new().status(TransactionStatus::Approved),
        )
        .await
        .unwrap();
    assert_eq!(
        ledger
            .balance(client.id, "alice")
            .await
            .unwrap()
            .current_balance_minor,
        60_000
    );

    // approved -> completed is a status-only change.
    let tx = ledger
        .update_transaction(
            tx.id,
            "alice",
            UpdateTransactionCmd::new().status(TransactionStatus::Completed),
        )
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Completed);
    assert_eq!(
        ledger
            .balance(client.id, "alice")
            .await
            .unwrap()
            .current_balance_minor,
        60_000
    );
}

#[tokio::test]
async fn detail_only_update_never_touches_balance() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    let tx = ledger
        .create_transaction(
            CreateTransactionCmd::new("alice", ClientRef::Id(client.id), 40_000, Operation::Expense)
                .status(TransactionStatus::Approved),
        )
        .await
        .unwrap();

    let tx = ledger
        .update_transaction(
            tx.id,
            "alice",
            UpdateTransactionCmd::new().detail(serde_json::json!({"note": "groceries"})),
        )
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Approved);
    assert_eq!(tx.detail, Some(serde_json::json!({"note": "groceries"})));

    assert_eq!(
        ledger
            .balance(client.id, "alice")
            .await
            .unwrap()
            .current_balance_minor,
        60_000
    );
}

#[tokio::test]
async fn update_enforces_ownership() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    let tx = ledger
        .create_transaction(CreateTransactionCmd::new(
            "alice",
            ClientRef::Id(client.id),
            10_000,
            Operation::Expense,
        ))
        .await
        .unwrap();

    let err = ledger
        .update_transaction(
            tx.id,
            "bob",
            UpdateTransactionCmd::new().status(TransactionStatus::Approved),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden(_)));
}

#[tokio::test]
async fn inline_client_data_resolves_existing_client() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    let tx = ledger
        .create_transaction(CreateTransactionCmd::new(
            "alice",
            ClientRef::Data(ClientData::new("Maria", "12345678")),
            10_000,
            Operation::Expense,
        ))
        .await
        .unwrap();
    assert_eq!(tx.client_id, client.id);

    let (clients, total) = ledger
        .clients("alice", &ClientListFilter::default())
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(clients.len(), 1);
}

#[tokio::test]
async fn inline_client_data_creates_client_on_miss() {
    let (ledger, _db) = ledger_with_db().await;

    let tx = ledger
        .create_transaction(
            CreateTransactionCmd::new(
                "alice",
                ClientRef::Data(ClientData::new("Pedro", "87654321").credit_limit_minor(50_000)),
                20_000,
                Operation::Expense,
            )
            .status(TransactionStatus::Approved),
        )
        .await
        .unwrap();

    // Fresh client starts at its limit, then gets debited.
    let balance = ledger.balance(tx.client_id, "alice").await.unwrap();
    assert_eq!(balance.credit_limit_minor, 50_000);
    assert_eq!(balance.current_balance_minor, 30_000);
}

#[tokio::test]
async fn confirm_payment_settles_by_invoice_reference() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    ledger
        .create_transaction(
            CreateTransactionCmd::new("alice", ClientRef::Id(client.id), 40_000, Operation::Expense)
                .invoice_id("INV-1"),
        )
        .await
        .unwrap();

    let outcome = ledger
        .confirm_payment(ConfirmPaymentCmd::new(
            "pay-1",
            "INV-1",
            PaymentOutcome::Approved,
        ))
        .await
        .unwrap();
    let ConfirmationOutcome::Updated(tx) = outcome else {
        panic!("expected updated transaction");
    };
    assert_eq!(tx.status, TransactionStatus::Approved);

    assert_eq!(
        ledger
            .balance(client.id, "alice")
            .await
            .unwrap()
            .current_balance_minor,
        60_000
    );
}

#[tokio::test]
async fn duplicate_payment_notification_is_ignored() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    let tx = ledger
        .create_transaction(CreateTransactionCmd::new(
            "alice",
            ClientRef::Id(client.id),
            40_000,
            Operation::Expense,
        ))
        .await
        .unwrap();

    ledger
        .confirm_payment(ConfirmPaymentCmd::new(
            "pay-1",
            tx.id.to_string(),
            PaymentOutcome::Approved,
        ))
        .await
        .unwrap();

    let outcome = ledger
        .confirm_payment(ConfirmPaymentCmd::new(
            "pay-1",
            tx.id.to_string(),
            PaymentOutcome::Approved,
        ))
        .await
        .unwrap();
    assert_eq!(outcome, ConfirmationOutcome::Duplicate);

    assert_eq!(
        ledger
            .balance(client.id, "alice")
            .await
            .unwrap()
            .current_balance_minor,
        60_000
    );
}

#[tokio::test]
async fn declined_payment_rejects_without_balance_effect() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    let tx = ledger
        .create_transaction(CreateTransactionCmd::new(
            "alice",
            ClientRef::Id(client.id),
            40_000,
            Operation::Expense,
        ))
        .await
        .unwrap();

    let outcome = ledger
        .confirm_payment(ConfirmPaymentCmd::new(
            "pay-1",
            tx.id.to_string(),
            PaymentOutcome::Declined,
        ))
        .await
        .unwrap();
    let ConfirmationOutcome::Updated(tx) = outcome else {
        panic!("expected updated transaction");
    };
    assert_eq!(tx.status, TransactionStatus::Rejected);

    assert_eq!(
        ledger
            .balance(client.id, "alice")
            .await
            .unwrap()
            .current_balance_minor,
        100_000
    );
}

#[tokio::test]
async fn unknown_reference_is_acknowledged() {
    let (ledger, _db) = ledger_with_db().await;

    let outcome = ledger
        .confirm_payment(ConfirmPaymentCmd::new(
            "pay-1",
            "INV-missing",
            PaymentOutcome::Approved,
        ))
        .await
        .unwrap();
    assert_eq!(outcome, ConfirmationOutcome::UnknownReference);
}

#[tokio::test]
async fn list_filters_by_status_and_amount() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    for (amount, status) in [
        (10_000, TransactionStatus::Approved),
        (20_000, TransactionStatus::Pending),
        (30_000, TransactionStatus::Pending),
    ] {
        ledger
            .create_transaction(
                CreateTransactionCmd::new(
                    "alice",
                    ClientRef::Id(client.id),
                    amount,
                    Operation::Expense,
                )
                .status(status),
            )
            .await
            .unwrap();
    }

    let filter = TransactionListFilter {
        status: Some(TransactionStatus::Pending),
        ..Default::default()
    };
    let (items, total) = ledger.transactions("alice", &filter).await.unwrap();
    assert_eq!(total, 2);
    assert!(items.iter().all(|t| t.status == TransactionStatus::Pending));

    let filter = TransactionListFilter {
        min_amount_minor: Some(15_000),
        max_amount_minor: Some(25_000),
        ..Default::default()
    };
    let (items, total) = ledger.transactions("alice", &filter).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(items[0].amount_minor, 20_000);
}

#[tokio::test]
async fn list_searches_by_client_and_paginates() {
    let (ledger, _db) = ledger_with_db().await;
    let maria = client_with_limit(&ledger, 100_000).await;
    let pedro = ledger
        .create_client(
            "alice",
            ClientData::new("Pedro", "87654321").credit_limit_minor(100_000),
        )
        .await
        .unwrap();

    for client_id in [maria.id, maria.id, pedro.id] {
        ledger
            .create_transaction(CreateTransactionCmd::new(
                "alice",
                ClientRef::Id(client_id),
                10_000,
                Operation::Expense,
            ))
            .await
            .unwrap();
    }

    let filter = TransactionListFilter {
        client_search: Some("mar".to_string()),
        ..Default::default()
    };
    let (items, total) = ledger.transactions("alice", &filter).await.unwrap();
    assert_eq!(total, 2);
    assert!(items.iter().all(|t| t.client_id == maria.id));

    let filter = TransactionListFilter {
        order: ListOrder::Asc,
        page: 2,
        page_size: 2,
        ..Default::default()
    };
    let (items, total) = ledger.transactions("alice", &filter).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(items.len(), 1);

    // A page far past the end is an empty page, not an arithmetic error.
    let filter = TransactionListFilter {
        page: u64::MAX,
        page_size: 50,
        ..Default::default()
    };
    let (items, total) = ledger.transactions("alice", &filter).await.unwrap();
    assert_eq!(total, 3);
    assert!(items.is_empty());
}

#[tokio::test]
async fn list_never_leaks_other_owners() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    ledger
        .create_transaction(CreateTransactionCmd::new(
            "alice",
            ClientRef::Id(client.id),
            10_000,
            Operation::Expense,
        ))
        .await
        .unwrap();

    let (items, total) = ledger
        .transactions("bob", &TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(total, 0);
    assert!(items.is_empty());
}

#[tokio::test]
async fn rejects_non_positive_amount() {
    let (ledger, _db) = ledger_with_db().await;
    let client = client_with_limit(&ledger, 100_000).await;

    let err = ledger
        .create_transaction(CreateTransactionCmd::new(
            "alice",
            ClientRef::Id(client.id),
            0,
            Operation::Expense,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));
}
