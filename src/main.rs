use std::panic;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use coedit_relay::bridge::run_bridge;
use coedit_relay::bus::EventBus;
use coedit_relay::config::{self, Config};
use coedit_relay::db::DocumentStore;
use coedit_relay::docs::ApiDoc;
use coedit_relay::presence::{BroadcastGateway, PresenceRegistry};
use coedit_relay::routes::create_api_routes;
use coedit_relay::services::document_service::DocumentService;
use coedit_relay::AppState;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "coedit_relay=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting relay...");

    // Load configuration
    let cfg = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    config::init_config(cfg.clone());

    // Wire up the relay: registry, gateway, bus, document service
    let registry = Arc::new(PresenceRegistry::new());
    registry.start().await;
    let gateway = Arc::new(BroadcastGateway::new(registry.clone()));
    let bus = EventBus::new(cfg.bus_capacity);
    let store = Arc::new(DocumentStore::new());
    let documents = Arc::new(DocumentService::new(store, bus.clone()));
    let app_state = Arc::new(AppState {
        registry,
        gateway: gateway.clone(),
        documents,
    });

    // Bridge bus events into the gateway. If the bridge dies only the
    // bridged rebroadcasts stop; direct real-time traffic keeps flowing.
    tokio::spawn(run_bridge(bus.subscribe(), gateway));

    let cors = match &cfg.cors_origins {
        Some(origins) => {
            let list: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(list))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    };

    // Combine all routes
    let app_routes = Router::new()
        .merge(create_api_routes(app_state))
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        // Add tracing layer
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(cfg.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", cfg.server_address()));

    info!("🚀 Relay running on http://{}", cfg.server_address());
    info!("📡 WebSocket available at ws://{}/ws", cfg.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", cfg.server_address());

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
