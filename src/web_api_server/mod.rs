//! The HTTP/WebSocket seam (spec.md §6.1/§6.2). Kept in the teacher's
//! `axum::Router` shape (`web_api_server/mod.rs::WebApiServer::run`,
//! `CorsLayer::permissive()`, a single `TcpListener::bind` + `axum::serve`),
//! but rebuilt on raw `axum::extract::ws::WebSocket` instead of the
//! teacher's `socketioxide` layer (spec.md §6.2 names a plain WebSocket,
//! not Socket.IO), and routed to the simulation through the command queue
//! and the read-path `sim::query` channel instead of an `AgentController`.
//!
//! Out of core scope per spec.md §1: this module exists to exercise the
//! seam, not to re-implement auth, rate limiting, or the full route surface
//! of `original_source/src/api/routes.py`. `TokenVerifier` is a stub; swap
//! it for real JWT validation at the deployment layer.

use crate::ecs::Command;
use crate::events::EventSink;
use crate::notify::Notifier;
use crate::persist::Bridge;
use crate::sim::query::{Query, QueryRequest};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query as AxumQuery, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{mpsc::Sender as StdSender, Arc, Mutex};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Authenticates a bearer/query token into a user id. The shipped
/// implementation accepts any non-empty numeric token as that user's id,
/// matching spec.md's explicit non-goal of implementing real JWT
/// validation in the core; swap in a real verifier (e.g. over
/// `jsonwebtoken`) at the deployment layer.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Option<i64>;
}

#[derive(Default)]
pub struct StubTokenVerifier;

impl TokenVerifier for StubTokenVerifier {
    fn verify(&self, token: &str) -> Option<i64> {
        token.trim().parse().ok()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub commands: Arc<Mutex<StdSender<Command>>>,
    pub queries: Arc<Mutex<StdSender<QueryRequest>>>,
    pub notifier: Arc<dyn Notifier>,
    pub events: Arc<EventSink>,
    pub bridge: Arc<Bridge>,
    pub verifier: Arc<dyn TokenVerifier>,
}

fn send_command(state: &AppState, command: Command) {
    let Ok(tx) = state.commands.lock() else { return };
    if tx.send(command).is_err() {
        warn!("command queue receiver gone; dropping command");
    }
}

async fn ask(state: &AppState, query: Query) -> Value {
    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    {
        let Ok(tx) = state.queries.lock() else { return Value::Null };
        if tx.send(QueryRequest { query, reply: reply_tx }).is_err() {
            return Value::Null;
        }
    }
    tokio::time::timeout(Duration::from_secs(2), reply_rx)
        .await
        .ok()
        .and_then(|r| r.ok())
        .unwrap_or(Value::Null)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Aurelia game server", "status": "running" }))
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let metrics_snapshot = crate::metrics::snapshot();
    Json(json!({
        "status": "ok",
        "database_enabled": state.bridge.db().is_some(),
        "metrics": metrics_snapshot,
    }))
}

async fn healthz_db(State(state): State<AppState>) -> Json<Value> {
    let enabled = state.bridge.db().is_some();
    let ok = match state.bridge.db() {
        Some(db) => db.list_users().await.is_ok(),
        None => false,
    };
    Json(json!({ "database": { "enabled": enabled, "status": if ok { "ok" } else { "fail" } } }))
}

async fn metrics_handler() -> Json<Value> {
    Json(crate::metrics::snapshot())
}

async fn get_player(State(state): State<AppState>, Path(user_id): Path<i64>) -> Json<Value> {
    Json(ask(&state, Query::Player { user_id }).await)
}

async fn get_fleet(State(state): State<AppState>, Path(user_id): Path<i64>) -> Json<Value> {
    Json(ask(&state, Query::Fleet { user_id }).await)
}

async fn get_research(State(state): State<AppState>, Path(user_id): Path<i64>) -> Json<Value> {
    Json(ask(&state, Query::Research { user_id }).await)
}

#[derive(Deserialize)]
struct BuildBuildingBody {
    building_type: String,
}

async fn build_building(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(body): Json<BuildBuildingBody>,
) -> Json<Value> {
    send_command(&state, Command::BuildBuilding { user_id, building_type: body.building_type.clone() });
    Json(json!({ "message": format!("build command queued for {}", body.building_type) }))
}

async fn demolish_building(
    State(state): State<AppState>,
    Path((user_id, building_type)): Path<(i64, String)>,
) -> Json<Value> {
    send_command(&state, Command::DemolishBuilding { user_id, building_type });
    Json(json!({ "message": "demolish command queued" }))
}

async fn cancel_build_queue(
    State(state): State<AppState>,
    Path((user_id, index)): Path<(i64, usize)>,
) -> Json<Value> {
    send_command(&state, Command::CancelBuildQueue { user_id, index: Some(index) });
    Json(json!({ "message": "cancel build queue command queued" }))
}

#[derive(Deserialize)]
struct ColonizeBody {
    #[serde(default)]
    galaxy: i64,
    #[serde(default)]
    system: i64,
    #[serde(default)]
    position: i64,
    #[serde(default)]
    planet_name: Option<String>,
}

async fn colonize(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(body): Json<ColonizeBody>,
) -> Json<Value> {
    send_command(
        &state,
        Command::Colonize {
            user_id,
            galaxy: body.galaxy,
            system: body.system,
            position: body.position,
            planet_name: body.planet_name,
        },
    );
    Json(json!({ "message": "colonize command queued" }))
}

#[derive(Deserialize)]
struct StartResearchBody {
    research_type: String,
}

async fn start_research(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(body): Json<StartResearchBody>,
) -> Json<Value> {
    send_command(&state, Command::StartResearch { user_id, research_type: body.research_type.clone() });
    Json(json!({ "message": format!("research command queued for {}", body.research_type) }))
}

#[derive(Deserialize)]
struct BuildShipsBody {
    ship_type: String,
    #[serde(default = "default_quantity")]
    quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

async fn build_ships(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(body): Json<BuildShipsBody>,
) -> Json<Value> {
    send_command(
        &state,
        Command::BuildShips { user_id, ship_type: body.ship_type.clone(), quantity: body.quantity },
    );
    Json(json!({ "message": format!("ship build command queued for {}", body.ship_type) }))
}

#[derive(Deserialize)]
struct FleetDispatchBody {
    #[serde(default)]
    galaxy: i64,
    #[serde(default)]
    system: i64,
    #[serde(default)]
    position: i64,
    mission: Option<String>,
    speed: Option<f64>,
    ships: Option<HashMap<String, i64>>,
}

async fn dispatch_fleet(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(body): Json<FleetDispatchBody>,
) -> Json<Value> {
    send_command(
        &state,
        Command::FleetDispatch {
            user_id,
            galaxy: body.galaxy,
            system: body.system,
            position: body.position,
            mission: body.mission,
            speed: body.speed,
            ships: body.ships,
        },
    );
    Json(json!({ "message": "fleet dispatch command queued" }))
}

async fn recall_fleet(State(state): State<AppState>, Path((user_id, fleet_id)): Path<(i64, i64)>) -> Json<Value> {
    send_command(&state, Command::FleetRecall { user_id, fleet_id: Some(fleet_id) });
    Json(json!({ "message": "fleet recall command queued" }))
}

#[derive(Deserialize)]
struct TradeCreateOfferBody {
    offered_resource: Option<String>,
    #[serde(default)]
    offered_amount: i64,
    requested_resource: Option<String>,
    #[serde(default)]
    requested_amount: i64,
}

async fn create_trade_offer(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(body): Json<TradeCreateOfferBody>,
) -> Json<Value> {
    send_command(
        &state,
        Command::TradeCreateOffer {
            user_id,
            offered_resource: body.offered_resource,
            offered_amount: body.offered_amount,
            requested_resource: body.requested_resource,
            requested_amount: body.requested_amount,
        },
    );
    Json(json!({ "message": "trade offer command queued" }))
}

async fn accept_trade_offer(
    State(state): State<AppState>,
    Path((offer_id, user_id)): Path<(i64, i64)>,
) -> Json<Value> {
    send_command(&state, Command::TradeAcceptOffer { user_id, offer_id });
    Json(json!({ "message": "trade accept command queued" }))
}

#[derive(Deserialize)]
struct PageParams {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
    #[serde(default)]
    status: Option<String>,
}

fn default_limit() -> usize {
    50
}

async fn list_trade_offers(State(state): State<AppState>, AxumQuery(p): AxumQuery<PageParams>) -> Json<Value> {
    Json(ask(&state, Query::TradeOffers { status: p.status, limit: p.limit, offset: p.offset }).await)
}

async fn list_trade_history(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    AxumQuery(p): AxumQuery<PageParams>,
) -> Json<Value> {
    Json(ask(&state, Query::TradeHistory { user_id, limit: p.limit, offset: p.offset }).await)
}

async fn list_battle_reports(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    AxumQuery(p): AxumQuery<PageParams>,
) -> Json<Value> {
    Json(ask(&state, Query::BattleReports { user_id, limit: p.limit, offset: p.offset }).await)
}

async fn list_espionage_reports(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    AxumQuery(p): AxumQuery<PageParams>,
) -> Json<Value> {
    Json(ask(&state, Query::EspionageReports { user_id, limit: p.limit, offset: p.offset }).await)
}

async fn list_notifications(State(state): State<AppState>, Path(user_id): Path<i64>) -> Json<Value> {
    Json(ask(&state, Query::Notifications { user_id }).await)
}

async fn delete_notification(
    State(state): State<AppState>,
    Path((user_id, notification_id)): Path<(i64, i64)>,
) -> impl IntoResponse {
    if state.notifier.dismiss(user_id, notification_id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Deserialize)]
struct WsAuth {
    #[serde(default)]
    token: Option<String>,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    AxumQuery(auth): AxumQuery<WsAuth>,
) -> impl IntoResponse {
    let Some(token) = auth.token else {
        return (StatusCode::UNAUTHORIZED, "missing token").into_response();
    };
    let Some(user_id) = state.verifier.verify(&token) else {
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

/// Per-connection receive loop, unchanged from `original_source/src/api/
/// ws.py::websocket_endpoint`: `ping` text frames get a `pong`, everything
/// else is echoed back as an `info` frame. Close 1008 is reserved for the
/// auth failure handled above; a plain disconnect here is not an error.
async fn handle_socket(mut socket: WebSocket, state: AppState, user_id: i64) {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    state.events.register(user_id, tx);
    info!(user_id, "websocket connected");

    let welcome = json!({
        "type": "welcome",
        "user_id": user_id,
        "server_time": crate::time_util::isoformat_utc(chrono::Utc::now()),
    });
    if socket.send(Message::Text(welcome.to_string().into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            outgoing = rx.recv() => {
                match outgoing {
                    Some(message) => {
                        if socket.send(message).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let reply = if text.trim().eq_ignore_ascii_case("ping") {
                            json!({ "type": "pong", "server_time": crate::time_util::isoformat_utc(chrono::Utc::now()) })
                        } else {
                            json!({ "type": "info", "message": text.to_string() })
                        };
                        if socket.send(Message::Text(reply.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.events.unregister_closed(user_id);
    info!(user_id, "websocket disconnected");
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/healthz/db", get(healthz_db))
        .route("/metrics", get(metrics_handler))
        .route("/ws", get(ws_handler))
        .route("/players/{user_id}", get(get_player))
        .route("/players/{user_id}/fleet", get(get_fleet))
        .route("/players/{user_id}/research", get(get_research))
        .route("/players/{user_id}/buildings", post(build_building))
        .route("/players/{user_id}/buildings/{building_type}", delete(demolish_building))
        .route("/players/{user_id}/build-queue/{index}", delete(cancel_build_queue))
        .route("/players/{user_id}/choose-start", post(colonize))
        .route("/players/{user_id}/research", post(start_research))
        .route("/players/{user_id}/ships", post(build_ships))
        .route("/players/{user_id}/fleet/dispatch", post(dispatch_fleet))
        .route("/players/{user_id}/fleet/{fleet_id}/recall", post(recall_fleet))
        .route("/players/{user_id}/battle_reports", get(list_battle_reports))
        .route("/players/{user_id}/espionage_reports", get(list_espionage_reports))
        .route("/players/{user_id}/notifications", get(list_notifications))
        .route("/players/{user_id}/notifications/{notification_id}", delete(delete_notification))
        .route("/players/{user_id}/trade_history", get(list_trade_history))
        .route("/trade/offers", get(list_trade_offers).post(create_trade_offer_placeholder))
        .route("/players/{user_id}/trade/offers", post(create_trade_offer))
        .route("/trade/offers/{offer_id}/accept/{user_id}", post(accept_trade_offer))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// `POST /trade/offers` without a user id in the path isn't a supported
/// shape (offers are always created on behalf of a path-scoped user); kept
/// only so the route table lists the method for discoverability.
async fn create_trade_offer_placeholder() -> impl IntoResponse {
    StatusCode::METHOD_NOT_ALLOWED
}

pub async fn serve(state: AppState, bind_addr: &str) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await
}
