use std::sync::Arc;

use axum::{routing::get, Router};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crm_lead_api::airtable::LeadService;
use crm_lead_api::config::Config;
use crm_lead_api::handlers::{self, AppState};
use crm_lead_api::transport::RetryingClient;

/// Main entry point for the application.
///
/// Initializes logging, loads configuration, wires the upsert pipeline, and
/// starts the Axum server with CORS, rate limiting, and request tracing.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm_lead_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration once; components receive it by reference instead of
    // reading ambient env state per call.
    let config = Config::from_env()?;

    let transport = RetryingClient::new()
        .map_err(|e| anyhow::anyhow!("Failed to initialize HTTP transport: {}", e))?;
    let lead_service = LeadService::new(&config, transport);
    tracing::info!("Lead upsert pipeline initialized");

    let app_state = Arc::new(AppState { lead_service });

    // Rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Health stays outside the limiter so platform probes always get
    // through; CORS sits outermost so preflights are answered even for
    // throttled clients.
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(handlers::protected_routes().layer(GovernorLayer {
            config: governor_conf,
        }))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(handlers::cors_layer());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
