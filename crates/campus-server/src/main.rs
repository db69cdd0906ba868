use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use campus_api::auth::{AppState, AppStateInner};
use campus_gateway::connection;
use campus_gateway::presence::Presence;
use campus_gateway::relay::ChatRelay;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Clone)]
struct GatewayState {
    relay: ChatRelay,
    jwt_secret: String,
}

#[derive(Deserialize)]
struct GatewayQuery {
    token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "campus=debug,campus_api=debug,campus_gateway=debug,campus_social=debug,tower_http=debug".into()
            }),
        )
        .init();

    // Config
    let jwt_secret = std::env::var("CAMPUS_JWT_SECRET").unwrap_or_default();
    if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
        eprintln!("FATAL: CAMPUS_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let db_path: PathBuf = std::env::var("CAMPUS_DB_PATH")
        .unwrap_or_else(|_| "campus.db".into())
        .into();
    let host = std::env::var("CAMPUS_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CAMPUS_PORT")
        .unwrap_or_else(|_| "5000".into())
        .parse()?;
    let token_ttl_hours: i64 = std::env::var("CAMPUS_TOKEN_TTL_HOURS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(2);

    // Init database
    let db = Arc::new(campus_db::Database::open(&db_path)?);

    // Shared state
    let relay = ChatRelay::new(db.clone(), Presence::new());
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: jwt_secret.clone(),
        token_ttl: chrono::Duration::hours(token_ttl_hours),
        relay: relay.clone(),
    });

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(GatewayState { relay, jwt_secret });

    let app = Router::new()
        .merge(campus_api::router(app_state))
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Campus server listening on {}", addr);
    info!("Database: {}, token lifetime: {}h", db_path.display(), token_ttl_hours);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn ws_upgrade(
    State(state): State<GatewayState>,
    Query(query): Query<GatewayQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.relay, query.token, state.jwt_secret)
    })
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
