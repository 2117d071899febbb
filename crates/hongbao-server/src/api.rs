use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use hongbao_engine::{ClaimOutcome, CreatePacket, PacketDetails, PacketEngine};
use hongbao_store::Packet;

use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PacketEngine>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/packets", post(create_packet))
        .route("/packets/{id}", get(packet_details))
        .route("/packets/{id}/claim", post(claim_packet))
        .route("/rooms/{room_id}/packets", get(room_packets))
        .route("/rooms/{room_id}/events", get(room_events))
        .route("/wallets/{user_id}", get(wallet_balance))
        .route("/admin/deposit", post(admin_deposit))
        .route("/admin/sweep", post(admin_sweep))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    packet_expiry_secs: u64,
    sweep_interval_secs: u64,
}

#[derive(Deserialize)]
struct CreatePacketRequest {
    room_id: String,
    sender_id: String,
    sender_name: String,
    total_amount: i64,
    total_slots: u32,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ClaimRequest {
    user_id: String,
    username: String,
}

#[derive(Serialize)]
struct BalanceResponse {
    user_id: String,
    balance: i64,
}

#[derive(Deserialize)]
struct DepositRequest {
    user_id: String,
    amount: i64,
    description: Option<String>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        packet_expiry_secs: state.config.packet_expiry.as_secs(),
        sweep_interval_secs: state.config.sweep_interval.as_secs(),
    })
}

async fn create_packet(
    State(state): State<AppState>,
    Json(req): Json<CreatePacketRequest>,
) -> Result<Json<Packet>, ServerError> {
    let packet = state
        .engine
        .create_packet(CreatePacket {
            room_id: req.room_id,
            sender_id: req.sender_id,
            sender_name: req.sender_name,
            total_amount: req.total_amount,
            total_slots: req.total_slots,
            message: req.message,
        })
        .await?;

    Ok(Json(packet))
}

async fn claim_packet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<ClaimOutcome>, ServerError> {
    let outcome = state.engine.claim(id, &req.user_id, &req.username).await?;
    Ok(Json(outcome))
}

async fn packet_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PacketDetails>, ServerError> {
    let details = state.engine.packet_details(id).await?;
    Ok(Json(details))
}

async fn room_packets(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<Packet>>, ServerError> {
    let packets = state.engine.list_active(&room_id).await?;
    Ok(Json(packets))
}

/// SSE stream of one room's packet events, for the notification layer.
async fn room_events(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.engine.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |item| {
        let room_id = room_id.clone();
        async move {
            // Lagged receivers drop missed events; clients re-list on resume.
            let event = item.ok()?;
            if event.room_id() != room_id {
                return None;
            }
            let sse = Event::default().event(event.name()).json_data(&event).ok()?;
            Some(Ok::<_, Infallible>(sse))
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn wallet_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<BalanceResponse>, ServerError> {
    let balance = state.engine.balance(&user_id).await?;
    Ok(Json(BalanceResponse { user_id, balance }))
}

fn verify_admin_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.admin_token else {
        return Err(ServerError::Forbidden(
            "Admin API is disabled (no ADMIN_TOKEN configured)".into(),
        ));
    };

    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    // Compare fixed-length digests in constant time so neither the token's
    // content nor its length leaks through timing.
    use subtle::ConstantTimeEq;
    let token_digest = blake3::hash(token.as_bytes());
    let expected_digest = blake3::hash(expected.as_bytes());
    if token_digest
        .as_bytes()
        .ct_eq(expected_digest.as_bytes())
        .unwrap_u8()
        != 1
    {
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }

    Ok(())
}

async fn admin_deposit(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let description = req.description.as_deref().unwrap_or("Admin deposit");
    let balance = state
        .engine
        .deposit(&req.user_id, req.amount, description)
        .await?;

    info!(user = %req.user_id, amount = req.amount, "Admin deposit");
    Ok(Json(serde_json::json!({ "balance": balance })))
}

async fn admin_sweep(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let refunded = state.engine.sweep_expired().await?;
    Ok(Json(serde_json::json!({ "refunded": refunded })))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
