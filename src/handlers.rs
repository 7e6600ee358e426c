use crate::airtable::LeadService;
use crate::errors::AppError;
use crate::models::{ConsultationStatus, LeadPayload, LeadSubmission, DEFAULT_ASSET_NAME};
use crate::validation::{is_valid_email, sanitize_phone};
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
};

/// Shared application state injected into handlers.
pub struct AppState {
    /// Lead upsert pipeline (asset resolution + store writes).
    pub lead_service: LeadService,
}

/// Health check endpoint.
///
/// Returns the service status and version.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "crm-lead-api",
            "version": "0.1.0"
        })),
    )
}

/// Trims and validates a raw form submission into a `LeadPayload`.
///
/// Names are trimmed, email is trimmed and lowercased (it is the merge key;
/// case differences must not fork records), phone is stripped of characters
/// a dial pad cannot produce. Empty names or a malformed email reject the
/// submission before any network call.
pub fn normalize_submission(submission: LeadSubmission) -> Result<LeadPayload, AppError> {
    let first_name = submission.first_name.unwrap_or_default().trim().to_string();
    let last_name = submission.last_name.unwrap_or_default().trim().to_string();
    let email = submission.email.unwrap_or_default().trim().to_lowercase();
    let phone = sanitize_phone(&submission.phone.unwrap_or_default());
    let asset_name = submission
        .asset_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_ASSET_NAME)
        .to_string();

    if first_name.is_empty() || last_name.is_empty() || !is_valid_email(&email) {
        return Err(AppError::InvalidInput);
    }

    Ok(LeadPayload {
        first_name,
        last_name,
        email,
        phone,
        asset_name,
        asset_id: None,
        consultation_status: ConsultationStatus::NotBooked,
    })
}

/// POST /crm/lead
///
/// Validates and normalizes the form submission, then records it in the
/// store via the upsert pipeline.
///
/// # Returns
///
/// * `200 {ok:true, result}` with the created/updated record on success.
/// * `400 {ok:false, error:"INVALID_INPUT"}` when validation fails.
/// * `429` / `500 {ok:false, error}` for upstream failures (see `AppError`).
pub async fn submit_lead(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<LeadSubmission>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let payload = normalize_submission(submission)?;
    tracing::info!(
        "POST /crm/lead - email: {}, asset: '{}'",
        payload.email,
        payload.asset_name
    );

    let result = state.lead_service.upsert_lead(&payload).await?;

    Ok((StatusCode::OK, Json(json!({ "ok": true, "result": result }))))
}

/// Fallback for unsupported methods on /crm/lead.
pub async fn method_not_allowed() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "ok": false, "error": "Method not allowed" })),
    )
}

/// Browser form submissions are cross-origin; the form embeds on the
/// marketing site, not on this API's host. OPTIONS preflights are answered
/// by this layer with a 200 and no body. Applied outermost so preflights
/// never reach the rate limiter.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Routes that sit behind the abuse-protection layers. `main` adds the
/// per-IP rate limiter on top; `/health` is deliberately not in here so
/// platform probes from one IP are never throttled.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/crm/lead", post(submit_lead).fallback(method_not_allowed))
        // Lead submissions are tiny; anything larger is abuse
        .layer(RequestBodyLimitLayer::new(64 * 1024))
}

/// Assembles the application router (minus the rate limiter, which needs
/// per-IP connect info). Shared by `main` and the integration tests so both
/// exercise the same layering.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(protected_routes())
        .with_state(state)
        .layer(cors_layer())
}
