use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracechain_common::transaction::{self, ContractMetadata, Transaction};

use crate::error::GatewayError;
use crate::peer::LocalPeer;

pub struct AppState {
    pub peer: LocalPeer,
    /// Human-readable description of where the world state lives.
    pub backend: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(peer: LocalPeer, backend: impl Into<String>) -> Self {
        Self {
            peer,
            backend: backend.into(),
            started_at: Utc::now(),
        }
    }
}

// ─── API types ───────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct ResultResponse {
    result: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    contract: String,
    backend: String,
    started_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct CreateProductRequest {
    /// The product object, or the product already serialized to a JSON string.
    #[serde(default)]
    product: Value,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ShipProductRequest {
    new_location: String,
    arrival_date: String,
}

// ─── Handlers ────────────────────────────────────────────────────────────────

async fn invoke(state: &AppState, tx: Transaction) -> Result<Json<ResultResponse>, GatewayError> {
    let payload = state.peer.invoke(tx).await?;
    let result = if payload.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&payload).map_err(|e| GatewayError::Payload(e.to_string()))?
    };
    Ok(Json(ResultResponse { result }))
}

async fn index_handler() -> String {
    format!("{} gateway", transaction::CONTRACT_TITLE)
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        contract: transaction::CONTRACT_TITLE.to_string(),
        backend: state.backend.clone(),
        started_at: state.started_at,
    })
}

async fn metadata_handler() -> Json<ContractMetadata> {
    Json(transaction::metadata())
}

async fn product_exists_handler(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> Result<Json<ResultResponse>, GatewayError> {
    invoke(&state, Transaction::ProductExists { product_id }).await
}

async fn get_product_handler(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> Result<Json<ResultResponse>, GatewayError> {
    invoke(&state, Transaction::GetProduct { product_id }).await
}

async fn get_product_with_history_handler(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> Result<Json<ResultResponse>, GatewayError> {
    invoke(&state, Transaction::GetProductWithHistory { product_id }).await
}

async fn create_product_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<Json<ResultResponse>, GatewayError> {
    let product_json = match req.product {
        Value::String(text) => text,
        other => other.to_string(),
    };
    invoke(&state, Transaction::CreateProduct { product_json }).await
}

async fn ship_product_handler(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
    Json(req): Json<ShipProductRequest>,
) -> Result<Json<ResultResponse>, GatewayError> {
    invoke(
        &state,
        Transaction::ShipProductTo {
            product_id,
            new_location: req.new_location,
            arrival_date: req.arrival_date,
        },
    )
    .await
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/metadata", get(metadata_handler))
        .route("/productExists/{id}", get(product_exists_handler))
        .route("/getProduct/{id}", get(get_product_handler))
        .route(
            "/getProductWithHistory/{id}",
            get(get_product_with_history_handler),
        )
        .route("/createProduct", post(create_product_handler))
        .route("/shipProductTo/{id}", post(ship_product_handler))
        .layer(cors)
        .with_state(state)
}
