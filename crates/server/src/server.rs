use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, Error as AxumError, Header, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{clients, transactions, user, webhook};
use ledger::Ledger;

static API_KEY_HEADER: axum::http::HeaderName = axum::http::HeaderName::from_static("x-api-key");

#[derive(Clone)]
pub struct ServerState {
    pub ledger: Arc<Ledger>,
    pub db: DatabaseConnection,
    pub api_key: Arc<str>,
}

/// `TypedHeader` for the service credential.
///
/// Server-to-server requests (transaction intake, webhooks) must carry an
/// "x-api-key" entry in the header.
#[derive(Debug)]
struct ApiKeyHeader(String);

impl Header for ApiKeyHeader {
    fn name() -> &'static axum::http::HeaderName {
        &API_KEY_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };

        Ok(ApiKeyHeader(value.to_string()))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        match axum::http::HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-api-key header"),
        }
    }
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let user = if let Some(user) = user {
        user
    } else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

async fn service_auth(
    api_key_header: TypedHeader<ApiKeyHeader>,
    State(state): State<ServerState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if api_key_header.0.0.is_empty() || api_key_header.0.0 != *state.api_key {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    let user_routes = Router::new()
        .route("/transactions", get(transactions::list))
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .put(transactions::update)
                .delete(transactions::remove),
        )
        .route("/clients", post(clients::create).get(clients::list))
        .route(
            "/clients/{id}",
            get(clients::get)
                .put(clients::update)
                .delete(clients::remove),
        )
        .route("/clients/{id}/balance", get(clients::balance))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    let service_routes = Router::new()
        .route("/transactions", post(transactions::create))
        .route("/events/webhook", post(webhook::handle_event))
        .route("/payments/webhook", post(webhook::handle_payment))
        .route_layer(middleware::from_fn_with_state(state.clone(), service_auth));

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .merge(user_routes)
        .merge(service_routes)
        .with_state(state)
}

pub async fn run(ledger: Ledger, db: DatabaseConnection, api_key: String) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(ledger, db, api_key, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    ledger: Ledger,
    db: DatabaseConnection,
    api_key: String,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        ledger: Arc::new(ledger),
        db,
        api_key: api_key.into(),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    ledger: Ledger,
    db: DatabaseConnection,
    api_key: String,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(ledger, db, api_key, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, header},
    };
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use sea_orm::{ConnectionTrait, Statement};
    use tower::ServiceExt;

    const API_KEY: &str = "test-api-key";

    async fn test_state() -> ServerState {
        let db = sea_orm::Database::connect("sqlite::memory:")
            .await
            .unwrap();
        migration::Migrator::up(&db, None).await.unwrap();

        db.execute(Statement::from_string(
            sea_orm::DatabaseBackend::Sqlite,
            "INSERT INTO users (username, password) VALUES ('shopkeeper', 'secret')".to_string(),
        ))
        .await
        .unwrap();

        let ledger = Ledger::builder().database(db.clone()).build().await.unwrap();

        ServerState {
            ledger: Arc::new(ledger),
            db,
            api_key: API_KEY.into(),
        }
    }

    fn basic_auth() -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode("shopkeeper:secret");
        format!("Basic {encoded}")
    }

    #[tokio::test]
    async fn health_needs_no_auth() {
        let app = router(test_state().await);
        let res = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn intake_rejects_wrong_api_key() {
        let app = router(test_state().await);
        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/transactions")
                    .header("x-api-key", "wrong")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn intake_rejects_missing_api_key() {
        let app = router(test_state().await);
        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/transactions")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(res.status().is_client_error());
    }

    #[tokio::test]
    async fn clients_reject_bad_credentials() {
        let app = router(test_state().await);
        let encoded = base64::engine::general_purpose::STANDARD.encode("shopkeeper:wrong");
        let res = app
            .oneshot(
                Request::builder()
                    .uri("/clients")
                    .header(header::AUTHORIZATION, format!("Basic {encoded}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn intake_creates_transaction_and_applies_balance() {
        let state = test_state().await;
        let app = router(state.clone());

        let body = serde_json::json!({
            "owner_id": "shopkeeper",
            "client_data": {
                "name": "Maria",
                "document": "12345678",
                "phone": null,
                "email": null,
                "credit_limit_minor": 100_000,
            },
            "amount_minor": 40_000,
            "operation": "expense",
            "status": "approved",
        });

        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/transactions")
                    .header("x-api-key", API_KEY)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let created: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(created["status"], "approved");
        assert_eq!(created["amount_minor"], 40_000);

        // The client was created on the fly with its balance already debited.
        let app = router(state);
        let res = app
            .oneshot(
                Request::builder()
                    .uri("/clients")
                    .header(header::AUTHORIZATION, basic_auth())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let listed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(listed["clients"][0]["current_balance_minor"], 60_000);
    }
}
