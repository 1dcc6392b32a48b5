use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Client, ClientData, LedgerError, ResultLedger, UpdateClientCmd, clients, transactions,
};

use super::{
    Ledger, credits::require_client_in, normalize_optional_text, normalize_required_text, with_tx,
};

/// Filters for listing clients. Listings are newest first.
#[derive(Clone, Debug, Default)]
pub struct ClientListFilter {
    pub blocked: Option<bool>,
    pub city: Option<String>,
    pub document: Option<String>,
    pub page: u64,
    pub page_size: u64,
}

const MAX_PAGE_SIZE: u64 = 100;

fn build_client(owner_id: &str, data: &ClientData) -> ResultLedger<Client> {
    let mut client = Client::new(
        owner_id.to_string(),
        normalize_required_text(&data.name, "client name")?,
        normalize_required_text(&data.document, "client document")?,
        data.credit_limit_minor,
    )?;
    client.lastname = normalize_optional_text(data.lastname.as_deref());
    client.phone = normalize_optional_text(data.phone.as_deref());
    client.email = normalize_optional_text(data.email.as_deref());
    client.city = normalize_optional_text(data.city.as_deref());
    Ok(client)
}

/// Resolves a client from inline data, creating one on miss.
///
/// Lookup order: phone, then document, then email, all scoped to the owner.
/// A freshly created client starts with `current_balance = credit_limit`.
pub(super) async fn resolve_or_create_client_in(
    db_tx: &DatabaseTransaction,
    owner_id: &str,
    data: &ClientData,
) -> ResultLedger<Client> {
    if let Some(phone) = normalize_optional_text(data.phone.as_deref()) {
        let found = clients::Entity::find()
            .filter(clients::Column::OwnerId.eq(owner_id))
            .filter(clients::Column::Phone.eq(&phone))
            .one(db_tx)
            .await?;
        if let Some(model) = found {
            return Client::try_from(model);
        }
    }

    let document = normalize_required_text(&data.document, "client document")?;
    let found = clients::Entity::find()
        .filter(clients::Column::OwnerId.eq(owner_id))
        .filter(clients::Column::Document.eq(&document))
        .one(db_tx)
        .await?;
    if let Some(model) = found {
        return Client::try_from(model);
    }

    if let Some(email) = normalize_optional_text(data.email.as_deref()) {
        let found = clients::Entity::find()
            .filter(clients::Column::OwnerId.eq(owner_id))
            .filter(clients::Column::Email.eq(&email))
            .one(db_tx)
            .await?;
        if let Some(model) = found {
            return Client::try_from(model);
        }
    }

    let client = build_client(owner_id, data)?;
    clients::ActiveModel::from(&client).insert(db_tx).await?;

    Ok(client)
}

impl Ledger {
    /// Creates a client account.
    ///
    /// Fails with [`LedgerError::Conflict`] when the owner already has a
    /// client with the same document.
    pub async fn create_client(&self, owner_id: &str, data: ClientData) -> ResultLedger<Client> {
        let document = normalize_required_text(&data.document, "client document")?;

        with_tx!(self, |db_tx| {
            let existing = clients::Entity::find()
                .filter(clients::Column::OwnerId.eq(owner_id))
                .filter(clients::Column::Document.eq(&document))
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(LedgerError::Conflict(document));
            }

            let client = build_client(owner_id, &data)?;
            clients::ActiveModel::from(&client).insert(&db_tx).await?;

            Ok(client)
        })
    }

    /// Returns a [`Client`] (snapshot from DB).
    pub async fn client(&self, client_id: Uuid, owner_id: &str) -> ResultLedger<Client> {
        with_tx!(self, |db_tx| {
            let model = require_client_in(&db_tx, client_id, owner_id).await?;
            Client::try_from(model)
        })
    }

    /// Lists the owner's clients, newest first.
    ///
    /// Returns `(items, total)` where `total` counts all rows matching the
    /// filter. Page size is clamped to 100.
    pub async fn clients(
        &self,
        owner_id: &str,
        filter: &ClientListFilter,
    ) -> ResultLedger<(Vec<Client>, u64)> {
        let page = filter.page.max(1);
        let page_size = filter.page_size.clamp(1, MAX_PAGE_SIZE);

        with_tx!(self, |db_tx| {
            let mut query =
                clients::Entity::find().filter(clients::Column::OwnerId.eq(owner_id));

            if let Some(blocked) = filter.blocked {
                query = query.filter(clients::Column::Blocked.eq(blocked));
            }
            if let Some(city) = filter.city.as_deref().map(str::trim)
                && !city.is_empty()
            {
                query = query.filter(clients::Column::City.eq(city));
            }
            if let Some(document) = filter.document.as_deref().map(str::trim)
                && !document.is_empty()
            {
                query = query.filter(clients::Column::Document.eq(document));
            }

            let total = query.clone().count(&db_tx).await?;

            let models = query
                .order_by_desc(clients::Column::CreatedAt)
                .offset((page - 1).saturating_mul(page_size).min(i64::MAX as u64))
                .limit(page_size)
                .all(&db_tx)
                .await?;

            let items = models
                .into_iter()
                .map(Client::try_from)
                .collect::<ResultLedger<Vec<_>>>()?;

            Ok((items, total))
        })
    }

    /// Patches a client with the whitelisted fields of [`UpdateClientCmd`].
    ///
    /// The balance is not patchable; it only moves through settlement.
    pub async fn update_client(
        &self,
        client_id: Uuid,
        owner_id: &str,
        cmd: UpdateClientCmd,
    ) -> ResultLedger<Client> {
        with_tx!(self, |db_tx| {
            let model = require_client_in(&db_tx, client_id, owner_id).await?;

            let mut update = clients::ActiveModel {
                id: ActiveValue::Set(model.id.clone()),
                ..Default::default()
            };

            if let Some(name) = cmd.name.as_deref() {
                update.name = ActiveValue::Set(normalize_required_text(name, "client name")?);
            }
            if let Some(lastname) = cmd.lastname.as_deref() {
                update.lastname = ActiveValue::Set(normalize_optional_text(Some(lastname)));
            }
            if let Some(document) = cmd.document.as_deref() {
                let document = normalize_required_text(document, "client document")?;
                if document != model.document {
                    let taken = clients::Entity::find()
                        .filter(clients::Column::OwnerId.eq(owner_id))
                        .filter(clients::Column::Document.eq(&document))
                        .one(&db_tx)
                        .await?;
                    if taken.is_some() {
                        return Err(LedgerError::Conflict(document));
                    }
                }
                update.document = ActiveValue::Set(document);
            }
            if let Some(phone) = cmd.phone.as_deref() {
                update.phone = ActiveValue::Set(normalize_optional_text(Some(phone)));
            }
            if let Some(email) = cmd.email.as_deref() {
                update.email = ActiveValue::Set(normalize_optional_text(Some(email)));
            }
            if let Some(city) = cmd.city.as_deref() {
                update.city = ActiveValue::Set(normalize_optional_text(Some(city)));
            }
            if let Some(trusted) = cmd.trusted {
                update.trusted = ActiveValue::Set(trusted);
            }
            if let Some(blocked) = cmd.blocked {
                update.blocked = ActiveValue::Set(blocked);
            }
            if let Some(limit) = cmd.credit_limit_minor {
                if limit < 0 {
                    return Err(LedgerError::InvalidAmount(
                        "credit_limit_minor must be >= 0".to_string(),
                    ));
                }
                update.credit_limit_minor = ActiveValue::Set(limit);
            }

            update.update(&db_tx).await?;

            let model = require_client_in(&db_tx, client_id, owner_id).await?;
            Client::try_from(model)
        })
    }

    /// Removes a client account.
    ///
    /// While transactions still reference the client the row is kept and
    /// marked `blocked` instead of being deleted, so the history stays
    /// consistent. An unreferenced client is deleted outright.
    pub async fn remove_client(&self, client_id: Uuid, owner_id: &str) -> ResultLedger<Client> {
        with_tx!(self, |db_tx| {
            let model = require_client_in(&db_tx, client_id, owner_id).await?;

            let referenced = transactions::Entity::find()
                .filter(transactions::Column::ClientId.eq(&model.id))
                .one(&db_tx)
                .await?;
            if referenced.is_some() {
                let update = clients::ActiveModel {
                    id: ActiveValue::Set(model.id.clone()),
                    blocked: ActiveValue::Set(true),
                    ..Default::default()
                };
                update.update(&db_tx).await?;

                let model = require_client_in(&db_tx, client_id, owner_id).await?;
                Client::try_from(model)
            } else {
                let client = Client::try_from(model)?;
                clients::Entity::delete_by_id(client.id.to_string())
                    .exec(&db_tx)
                    .await?;
                Ok(client)
            }
        })
    }
}
