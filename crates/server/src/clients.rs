//! Client API endpoints

use api_types::client::{
    BalanceView, ClientListQuery, ClientNew, ClientUpdate, ClientView, ClientsResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};
use ledger::{ClientData, ClientListFilter, UpdateClientCmd};

fn client_view(client: ledger::Client) -> ClientView {
    ClientView {
        id: client.id,
        name: client.name,
        lastname: client.lastname,
        document: client.document,
        phone: client.phone,
        email: client.email,
        city: client.city,
        credit_limit_minor: client.credit_limit_minor,
        current_balance_minor: client.current_balance_minor,
        trusted: client.trusted,
        blocked: client.blocked,
        created_at: client.created_at,
    }
}

pub(crate) fn client_data(payload: ClientNew) -> ClientData {
    let mut data = ClientData::new(payload.name, payload.document);
    if let Some(lastname) = payload.lastname {
        data = data.lastname(lastname);
    }
    if let Some(phone) = payload.phone {
        data = data.phone(phone);
    }
    if let Some(email) = payload.email {
        data = data.email(email);
    }
    if let Some(city) = payload.city {
        data = data.city(city);
    }
    if let Some(limit) = payload.credit_limit_minor {
        data = data.credit_limit_minor(limit);
    }
    data
}

/// Handle requests for creating a new client account.
pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ClientNew>,
) -> Result<(StatusCode, Json<ClientView>), ServerError> {
    let client = state
        .ledger
        .create_client(&user.username, client_data(payload))
        .await?;

    Ok((StatusCode::CREATED, Json(client_view(client))))
}

/// Handle requests for listing the user's clients with filters and
/// pagination.
pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<ClientListQuery>,
) -> Result<Json<ClientsResponse>, ServerError> {
    let filter = ClientListFilter {
        blocked: query.blocked,
        city: query.city,
        document: query.document,
        page: query.page.unwrap_or(1),
        page_size: query.page_size.unwrap_or(20),
    };

    let (clients, total) = state.ledger.clients(&user.username, &filter).await?;

    Ok(Json(ClientsResponse {
        clients: clients.into_iter().map(client_view).collect(),
        total,
        page: filter.page.max(1),
        page_size: filter.page_size.clamp(1, 100),
    }))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClientView>, ServerError> {
    let client = state.ledger.client(id, &user.username).await?;
    Ok(Json(client_view(client)))
}

/// Handle requests for patching a client.
///
/// Only the whitelisted fields of [`ClientUpdate`] are applied.
pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClientUpdate>,
) -> Result<Json<ClientView>, ServerError> {
    let mut cmd = UpdateClientCmd::new();
    if let Some(name) = payload.name {
        cmd = cmd.name(name);
    }
    if let Some(lastname) = payload.lastname {
        cmd = cmd.lastname(lastname);
    }
    if let Some(document) = payload.document {
        cmd = cmd.document(document);
    }
    if let Some(phone) = payload.phone {
        cmd = cmd.phone(phone);
    }
    if let Some(email) = payload.email {
        cmd = cmd.email(email);
    }
    if let Some(city) = payload.city {
        cmd = cmd.city(city);
    }
    if let Some(limit) = payload.credit_limit_minor {
        cmd = cmd.credit_limit_minor(limit);
    }
    if let Some(trusted) = payload.trusted {
        cmd = cmd.trusted(trusted);
    }
    if let Some(blocked) = payload.blocked {
        cmd = cmd.blocked(blocked);
    }

    let client = state.ledger.update_client(id, &user.username, cmd).await?;
    Ok(Json(client_view(client)))
}

/// Handle requests for removing a client.
///
/// A client with transaction history is kept and marked `blocked`; the
/// response carries the resulting state either way.
pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClientView>, ServerError> {
    let client = state.ledger.remove_client(id, &user.username).await?;
    Ok(Json(client_view(client)))
}

/// Handle requests for the read-only balance snapshot.
pub async fn balance(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BalanceView>, ServerError> {
    let balance = state.ledger.balance(id, &user.username).await?;

    Ok(Json(BalanceView {
        current_balance_minor: balance.current_balance_minor,
        credit_limit_minor: balance.credit_limit_minor,
    }))
}
