//! Webhook endpoints for the event bus and the payment gateway.
//!
//! Both endpoints sit behind the service credential. Notifications for
//! unknown references are acknowledged so the sender stops retrying.

use api_types::event::{BusinessEvent, EventAck, InvoiceData};
use api_types::payment::{PaymentAck, PaymentNotification, PaymentResult};
use axum::{Json, extract::State};
use serde_json::json;

use crate::{ServerError, server::ServerState};
use ledger::{
    ClientData, ClientRef, ConfirmPaymentCmd, ConfirmationOutcome, CreateTransactionCmd,
    Operation, PaymentOutcome, TransactionStatus,
};

/// Payment type that routes an invoice into the credit ledger.
const CREDIT_PAYMENT_TYPE: &str = "Fiar";

fn invoice_client_data(invoice: &InvoiceData) -> ClientData {
    let client = invoice.client.as_ref();
    let mut data = ClientData::new(
        client
            .and_then(|c| c.name.clone())
            .unwrap_or_default(),
        client
            .and_then(|c| c.document_number.clone())
            .unwrap_or_default(),
    );
    if let Some(lastname) = client.and_then(|c| c.lastname.clone()) {
        data = data.lastname(lastname);
    }
    if let Some(phone) = client.and_then(|c| c.phone.clone()) {
        data = data.phone(phone);
    }
    if let Some(email) = client.and_then(|c| c.email.clone()) {
        data = data.email(email);
    }
    data
}

async fn handle_invoice_created(
    state: &ServerState,
    event: &BusinessEvent,
) -> Result<String, ServerError> {
    let Some(invoice) = event.data.invoice.as_ref() else {
        return Err(ServerError::Generic(
            "invoice data not found in event".to_string(),
        ));
    };

    if invoice.payment_type.as_deref() != Some(CREDIT_PAYMENT_TYPE) {
        tracing::debug!(invoice_id = %invoice.id, "invoice does not use shop credit, skipping");
        return Ok(format!("event {} skipped", event.id));
    }

    let Some(amount_minor) = invoice.total_amount_minor else {
        return Err(ServerError::Generic(
            "invoice total amount missing".to_string(),
        ));
    };

    let status = if invoice.payment_status.as_deref() == Some("Paid") {
        TransactionStatus::Approved
    } else {
        TransactionStatus::Pending
    };

    let cmd = CreateTransactionCmd::new(
        event.metadata.user_id.clone(),
        ClientRef::Data(invoice_client_data(invoice)),
        amount_minor,
        Operation::Expense,
    )
    .status(status)
    .detail(json!({
        "invoice_id": invoice.id,
        "tracking_number": invoice.tracking_number,
        "source": event.source,
    }))
    .invoice_id(invoice.id.clone());

    let tx = state.ledger.create_transaction(cmd).await?;
    tracing::info!(transaction_id = %tx.id, invoice_id = %invoice.id, "credit transaction created");

    Ok(format!("event {} processed", event.id))
}

async fn handle_payment_completed(
    state: &ServerState,
    event: &BusinessEvent,
) -> Result<String, ServerError> {
    let Some(invoice) = event.data.invoice.as_ref() else {
        return Err(ServerError::Generic(
            "invoice data not found in event".to_string(),
        ));
    };

    let outcome = state
        .ledger
        .confirm_payment(ConfirmPaymentCmd::new(
            event.id.clone(),
            invoice.id.clone(),
            PaymentOutcome::Approved,
        ))
        .await?;

    let message = match outcome {
        ConfirmationOutcome::Updated(tx) => {
            tracing::info!(transaction_id = %tx.id, invoice_id = %invoice.id, "transaction settled");
            format!("event {} processed", event.id)
        }
        ConfirmationOutcome::Duplicate => format!("event {} already processed", event.id),
        ConfirmationOutcome::UnknownReference => format!("event {} ignored", event.id),
    };

    Ok(message)
}

/// Handle business events delivered by the event bus.
pub async fn handle_event(
    State(state): State<ServerState>,
    Json(event): Json<BusinessEvent>,
) -> Result<Json<EventAck>, ServerError> {
    tracing::debug!(event_id = %event.id, event_type = %event.event_type, "received event");

    let message = match event.event_type.as_str() {
        "invoice.created" => handle_invoice_created(&state, &event).await?,
        "payment.completed" => handle_payment_completed(&state, &event).await?,
        other => {
            tracing::debug!(event_type = %other, "ignoring event type");
            format!("event {} ignored", event.id)
        }
    };

    Ok(Json(EventAck {
        success: true,
        message,
    }))
}

/// Handle payment notifications from the gateway.
///
/// Duplicate notifications (same `payment_id`) are acknowledged without
/// touching the ledger.
pub async fn handle_payment(
    State(state): State<ServerState>,
    Json(payload): Json<PaymentNotification>,
) -> Result<Json<PaymentAck>, ServerError> {
    let outcome = match payload.result {
        PaymentResult::Approved => PaymentOutcome::Approved,
        PaymentResult::Declined => PaymentOutcome::Declined,
    };

    let confirmation = state
        .ledger
        .confirm_payment(ConfirmPaymentCmd::new(
            payload.payment_id,
            payload.reference,
            outcome,
        ))
        .await?;

    let message = match confirmation {
        ConfirmationOutcome::Updated(tx) => format!("transaction {} updated", tx.id),
        ConfirmationOutcome::Duplicate => "payment already processed".to_string(),
        ConfirmationOutcome::UnknownReference => "unknown reference".to_string(),
    };

    Ok(Json(PaymentAck {
        success: true,
        message,
    }))
}
