use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use jobber_api::middleware::require_auth;
use jobber_api::state::{AppState, AppStateInner};
use jobber_api::{connections, messages, notifications};
use jobber_gateway::connection::{self, GatewayContext};
use jobber_gateway::dispatcher::Dispatcher;
use jobber_social::{ConnectionGraph, MessageStore, NotificationService, PairLocks};
use jobber_types::api::Claims;

/// Seen notifications older than the retention window are purged this often.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone)]
struct ServerState {
    app: AppState,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobber=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("JOBBER_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("JOBBER_DB_PATH").unwrap_or_else(|_| "jobber.db".into());
    let host = std::env::var("JOBBER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("JOBBER_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = Arc::new(jobber_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let dispatcher = Dispatcher::new();
    let message_store = MessageStore::new(db.clone(), PairLocks::new());
    let connection_graph = ConnectionGraph::new(db.clone());
    let notification_service = NotificationService::new(db.clone());

    let app_state: AppState = Arc::new(AppStateInner {
        messages: message_store,
        connections: connection_graph,
        notifications: notification_service,
        dispatcher: dispatcher.clone(),
    });

    let state = ServerState {
        app: app_state.clone(),
        jwt_secret: jwt_secret.clone(),
    };

    spawn_retention_sweep(app_state.clone());

    // Routes
    let protected_routes = Router::new()
        .route("/connections", get(connections::list_connections))
        .route("/messages/unseen", get(messages::unseen_counts))
        .route("/messages/{counterpart_id}/seen", post(messages::mark_seen))
        .route(
            "/conversations/{counterpart_id}",
            delete(messages::hide_conversation),
        )
        .route(
            "/conversations/{counterpart_id}/messages",
            get(messages::conversation),
        )
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications", post(notifications::create_notification))
        .route("/notifications/seen", post(notifications::mark_all_seen))
        .route(
            "/notifications/unseen-count",
            get(notifications::unseen_count),
        )
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state);

    let app = Router::new()
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Jobber server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Hourly background task purging seen notifications past the retention
/// window. Unseen notifications are never touched.
fn spawn_retention_sweep(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            match state.notifications.sweep().await {
                Ok(0) => {}
                Ok(purged) => info!("Retention sweep purged {} seen notifications", purged),
                Err(e) => warn!("Retention sweep failed: {}", e),
            }
        }
    });
}

#[derive(Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// Authenticate the upgrade request before switching protocols: a bad token
/// gets a plain 401 instead of an accepted-then-closed socket. The token
/// rides in the `token` query parameter (browsers cannot set headers on
/// WebSocket requests) or a standard Authorization header.
async fn ws_upgrade(
    State(state): State<ServerState>,
    Query(query): Query<WsQuery>,
    headers: axum::http::HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let token = query.token.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string)
    });

    let Some(token) = token else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let claims = match decode::<Claims>(
        &token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => data.claims,
        Err(e) => {
            warn!("Gateway upgrade rejected: {}", e);
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let ctx = GatewayContext {
        dispatcher: state.app.dispatcher.clone(),
        messages: state.app.messages.clone(),
        notifications: state.app.notifications.clone(),
    };

    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, ctx, claims.sub, claims.username)
    })
}
