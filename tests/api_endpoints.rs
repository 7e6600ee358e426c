/// HTTP surface tests driving the router directly with `tower::ServiceExt`.
/// Airtable is mocked with wiremock; no socket is bound.
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use crm_lead_api::airtable::LeadService;
use crm_lead_api::config::{Config, LeadFieldIds};
use crm_lead_api::handlers::{build_router, AppState};
use crm_lead_api::transport::{RetryPolicy, RetryingClient};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_config(api_url: String) -> Config {
    Config {
        port: 8080,
        airtable_api_url: api_url,
        airtable_base_id: "appTEST".to_string(),
        airtable_leads_table_id: "tblLeads".to_string(),
        airtable_assets_table_id: "tblAssets".to_string(),
        airtable_token: "test_token".to_string(),
        airtable_asset_id_cost_calculator: None,
        lead_field_ids: LeadFieldIds::default(),
    }
}

fn test_app(config: Config) -> axum::Router {
    let transport = RetryingClient::with_policy(RetryPolicy {
        max_attempts: 5,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(50),
    })
    .unwrap();
    let lead_service = LeadService::new(&config, transport);
    build_router(Arc::new(AppState { lead_service }))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_lead(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/crm/lead")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_healthy() {
    let mock_server = MockServer::start().await;
    let app = test_app(create_test_config(mock_server.uri()));

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], serde_json::json!("healthy"));
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_network_call() {
    let mock_server = MockServer::start().await;
    let app = test_app(create_test_config(mock_server.uri()));

    // lastName missing
    let response = app
        .oneshot(post_lead(serde_json::json!({
            "firstName": "Ada",
            "email": "ada@example.com"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["ok"], serde_json::json!(false));
    assert_eq!(json["error"], serde_json::json!("INVALID_INPUT"));

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.is_empty(), "validation must run before the store is touched");
}

#[tokio::test]
async fn submission_is_normalized_and_upserted_end_to_end() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appTEST/tblAssets"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"records": [{"id": "recAsset"}]})),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/appTEST/tblLeads"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"records": [{"id": "recLead"}]})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = test_app(create_test_config(mock_server.uri()));

    let response = app
        .oneshot(post_lead(serde_json::json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ADA@EXAMPLE.com ",
            "phone": "(555) 123-4567!!"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], serde_json::json!(true));
    assert_eq!(
        json["result"]["records"][0]["id"],
        serde_json::json!("recLead")
    );

    let requests = mock_server.received_requests().await.unwrap();
    let upsert = requests
        .iter()
        .find(|r| r.method.as_str() == "PATCH")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&upsert.body).unwrap();
    let fields = &body["records"][0]["fields"];
    assert_eq!(fields["fldFiL8aVLy0T9dIf"], serde_json::json!("ada@example.com"));
    assert_eq!(fields["fldKQ1oaoF2KJbJgu"], serde_json::json!("(555) 123-4567"));
    assert_eq!(fields["fldwn42WCMRaJvfDx"], serde_json::json!("Not Booked"));
}

#[tokio::test]
async fn upstream_rate_limit_maps_to_429_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appTEST/tblAssets"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"records": [{"id": "recAsset"}]})),
        )
        .mount(&mock_server)
        .await;

    // Rate limited past the retry ceiling
    Mock::given(method("PATCH"))
        .and(path("/appTEST/tblLeads"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit exceeded"))
        .expect(5)
        .mount(&mock_server)
        .await;

    let app = test_app(create_test_config(mock_server.uri()));

    let response = app
        .oneshot(post_lead(serde_json::json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_json(response).await;
    assert_eq!(json["ok"], serde_json::json!(false));
}

#[tokio::test]
async fn upstream_client_error_maps_to_500_with_detail() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appTEST/tblAssets"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"records": [{"id": "recAsset"}]})),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/appTEST/tblLeads"))
        .respond_with(ResponseTemplate::new(422).set_body_string("INVALID_MULTIPLE_CHOICE_OPTIONS"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = test_app(create_test_config(mock_server.uri()));

    let response = app
        .oneshot(post_lead(serde_json::json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["ok"], serde_json::json!(false));
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("422"));
    assert!(message.contains("INVALID_MULTIPLE_CHOICE_OPTIONS"));
}

#[tokio::test]
async fn oversized_submission_is_rejected_without_reaching_the_store() {
    let mock_server = MockServer::start().await;
    let app = test_app(create_test_config(mock_server.uri()));

    // Body limit guards /crm/lead; a form post has no business being this big
    let response = app
        .clone()
        .oneshot(post_lead(serde_json::json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "phone": "5".repeat(70 * 1024)
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.is_empty());

    // Health sits outside the protected routes and is unaffected
    let health = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn unsupported_method_returns_405() {
    let mock_server = MockServer::start().await;
    let app = test_app(create_test_config(mock_server.uri()));

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/crm/lead")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let json = body_json(response).await;
    assert_eq!(json["error"], serde_json::json!("Method not allowed"));
}

#[tokio::test]
async fn options_preflight_gets_cors_headers() {
    let mock_server = MockServer::start().await;
    let app = test_app(create_test_config(mock_server.uri()));

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/crm/lead")
                .header(header::ORIGIN, "https://www.example-marketing-site.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|v| v.to_str().unwrap()),
        Some("*")
    );
    let allow_methods = headers
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .map(|v| v.to_str().unwrap())
        .unwrap_or_default();
    assert!(allow_methods.contains("POST"));
}
