//! Route handlers for the metrics API.

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use pulse_core::{Metric, MetricError, MetricKind, MetricPayload};
use tracing::{error, warn};

use super::render;
use super::ApiState;
use crate::storage::StorageError;

pub const ERR_INVALID_JSON: &str = "invalid JSON";
pub const ERR_INVALID_METRIC_KIND: &str = "invalid metric type";
pub const ERR_METRIC_NOT_FOUND: &str = "metric not found";
pub const ERR_INVALID_HASH: &str = "invalid hash";
pub const ERR_KIND_CONFLICT: &str = "metric kind conflict";
pub const ERR_STORAGE: &str = "storage error";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(list))
        .route("/update", web::post().to(update))
        .route("/updates", web::post().to(update_many))
        .route("/value", web::post().to(value))
        .route("/ping", web::get().to(ping));
}

fn plain(status: StatusCode, body: &'static str) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/plain; charset=utf-8")
        .body(body)
}

/// Decode an inbound payload into a domain metric and verify its
/// signature when one was supplied. Unsigned payloads skip verification
/// for backward compatibility with unsigned agents.
fn decode_and_verify(payload: &MetricPayload, state: &ApiState) -> Result<Metric, HttpResponse> {
    let metric = match payload.to_metric() {
        Ok(metric) => metric,
        Err(MetricError::InvalidKind(kind)) => {
            warn!("received invalid metric kind '{kind}'");
            return Err(plain(StatusCode::NOT_IMPLEMENTED, ERR_INVALID_METRIC_KIND));
        }
        Err(err) => {
            warn!("received undecodable payload: {err}");
            return Err(plain(StatusCode::BAD_REQUEST, ERR_INVALID_JSON));
        }
    };

    if let Some(signature) = payload.signature() {
        if !state.hasher.check(&metric, signature) {
            warn!("signature mismatch for metric '{}'", metric.name());
            return Err(plain(StatusCode::BAD_REQUEST, ERR_INVALID_HASH));
        }
    }
    Ok(metric)
}

fn storage_error_response(err: StorageError) -> HttpResponse {
    match err {
        StorageError::Metric(MetricError::KindConflict { name }) => {
            warn!("rejected kind conflict for metric '{name}'");
            plain(StatusCode::CONFLICT, ERR_KIND_CONFLICT)
        }
        err => {
            error!("storage failure: {err}");
            plain(StatusCode::INTERNAL_SERVER_ERROR, ERR_STORAGE)
        }
    }
}

async fn update(state: web::Data<ApiState>, body: web::Bytes) -> HttpResponse {
    let payload: MetricPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!("received invalid JSON: {err}");
            return plain(StatusCode::BAD_REQUEST, ERR_INVALID_JSON);
        }
    };

    let metric = match decode_and_verify(&payload, &state) {
        Ok(metric) => metric,
        Err(response) => return response,
    };

    match state.service.update(metric).await {
        Ok(stored) => HttpResponse::Ok().json(MetricPayload::from_metric(&stored, Some(&state.hasher))),
        Err(err) => storage_error_response(err),
    }
}

async fn update_many(state: web::Data<ApiState>, body: web::Bytes) -> HttpResponse {
    let payloads: Vec<MetricPayload> = match serde_json::from_slice(&body) {
        Ok(payloads) => payloads,
        Err(err) => {
            warn!("received invalid JSON batch: {err}");
            return plain(StatusCode::BAD_REQUEST, ERR_INVALID_JSON);
        }
    };

    let mut metrics = Vec::with_capacity(payloads.len());
    for payload in &payloads {
        match decode_and_verify(payload, &state) {
            Ok(metric) => metrics.push(metric),
            Err(response) => return response,
        }
    }

    match state.service.update_many(metrics).await {
        Ok(stored) => {
            let response: Vec<MetricPayload> = stored
                .iter()
                .map(|m| MetricPayload::from_metric(m, Some(&state.hasher)))
                .collect();
            HttpResponse::Ok().json(response)
        }
        Err(err) => storage_error_response(err),
    }
}

async fn value(state: web::Data<ApiState>, body: web::Bytes) -> HttpResponse {
    let payload: MetricPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!("received invalid JSON: {err}");
            return plain(StatusCode::BAD_REQUEST, ERR_INVALID_JSON);
        }
    };

    let kind = match MetricKind::parse(&payload.kind) {
        Ok(kind) => kind,
        Err(_) => {
            warn!("received invalid metric kind '{}'", payload.kind);
            return plain(StatusCode::NOT_IMPLEMENTED, ERR_INVALID_METRIC_KIND);
        }
    };

    match state.service.get(&payload.id).await {
        Ok(Some(metric)) if metric.kind() == kind => {
            HttpResponse::Ok().json(MetricPayload::from_metric(&metric, Some(&state.hasher)))
        }
        Ok(_) => {
            warn!("metric '{}/{}' not found", payload.kind, payload.id);
            plain(StatusCode::NOT_FOUND, ERR_METRIC_NOT_FOUND)
        }
        Err(err) => storage_error_response(err),
    }
}

async fn list(state: web::Data<ApiState>) -> HttpResponse {
    match state.service.list().await {
        Ok(mut metrics) => {
            metrics.sort_by_key(|m| m.name().to_lowercase());
            HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(render::render_list(&metrics))
        }
        Err(err) => storage_error_response(err),
    }
}

async fn ping(state: web::Data<ApiState>) -> HttpResponse {
    for component in &state.pingables {
        if !component.ping().await {
            return plain(StatusCode::INTERNAL_SERVER_ERROR, "");
        }
    }
    plain(StatusCode::OK, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::MetricsService;
    use crate::storage::{MemoryRepository, MetricsRepository, Pingable};
    use actix_web::test::{call_service, init_service, read_body, TestRequest};
    use actix_web::{web, App};
    use async_trait::async_trait;
    use pulse_core::MetricHasher;
    use serde_json::{json, Value};
    use std::sync::Arc;

    async fn seeded_state() -> ApiState {
        let repo = Arc::new(MemoryRepository::new());
        repo.store(Metric::counter("PollCount", 5)).await.unwrap();
        repo.store(Metric::gauge("Alloc", 10.123)).await.unwrap();
        ApiState {
            service: Arc::new(MetricsService::new(repo.clone())),
            hasher: MetricHasher::new("s3cr3t-k3y"),
            pingables: vec![repo],
        }
    }

    async fn empty_state() -> ApiState {
        let repo = Arc::new(MemoryRepository::new());
        ApiState {
            service: Arc::new(MetricsService::new(repo.clone())),
            hasher: MetricHasher::new("s3cr3t-k3y"),
            pingables: vec![repo],
        }
    }

    macro_rules! test_app {
        ($state:expr) => {
            init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .configure(configure),
            )
            .await
        };
    }

    fn post(uri: &str, body: &str) -> TestRequest {
        TestRequest::post()
            .uri(uri)
            .insert_header(("content-type", "application/json"))
            .set_payload(body.to_string())
    }

    async fn body_json(response: actix_web::dev::ServiceResponse) -> Value {
        let body = read_body(response).await;
        serde_json::from_slice(&body).unwrap()
    }

    #[actix_web::test]
    async fn update_counter_accumulates() {
        let app = test_app!(seeded_state().await);
        let response =
            call_service(&app, post("/update", r#"{"id":"PollCount","type":"counter","delta":5}"#).to_request())
                .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "id": "PollCount",
                "type": "counter",
                "delta": 10,
                "hash": "953f4bbe05b8225241fbe00f63f2d84ae756165a81b25f89d96436c64f374793"
            })
        );
    }

    #[actix_web::test]
    async fn update_gauge_overwrites() {
        let app = test_app!(seeded_state().await);
        let response =
            call_service(&app, post("/update", r#"{"id":"Alloc","type":"gauge","value":10.20}"#).to_request())
                .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "id": "Alloc",
                "type": "gauge",
                "value": 10.2,
                "hash": "380f160a870d57bafccffae49443dd8d227c806485c2b4b80bcfaf96f19447b3"
            })
        );
    }

    #[actix_web::test]
    async fn update_with_valid_signature_is_accepted() {
        let app = test_app!(seeded_state().await);
        let body = r#"{"id":"PollCount","type":"counter","delta":5,"hash":"7148ff92910a879bba42647839901cdd4f9c68f952657e36ead4e894511d82af"}"#;
        let response = call_service(&app, post("/update", body).to_request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["delta"], json!(10));
    }

    #[actix_web::test]
    async fn update_with_bad_signature_is_rejected() {
        let app = test_app!(seeded_state().await);
        let response = call_service(
            &app,
            post("/update", r#"{"id":"PollCount","type":"counter","delta":5,"hash":"-"}"#).to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_body(response).await, ERR_INVALID_HASH.as_bytes());
    }

    #[actix_web::test]
    async fn update_with_malformed_json_is_rejected() {
        let app = test_app!(seeded_state().await);
        let response = call_service(&app, post("/update", "{not json").to_request()).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_body(response).await, ERR_INVALID_JSON.as_bytes());
    }

    #[actix_web::test]
    async fn update_with_unknown_kind_is_not_implemented() {
        let app = test_app!(seeded_state().await);
        let response = call_service(
            &app,
            post("/update", r#"{"id":"X","type":"histogram","delta":1}"#).to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(read_body(response).await, ERR_INVALID_METRIC_KIND.as_bytes());
    }

    #[actix_web::test]
    async fn update_with_conflicting_kind_is_rejected() {
        let app = test_app!(seeded_state().await);
        let response = call_service(
            &app,
            post("/update", r#"{"id":"PollCount","type":"gauge","value":1.0}"#).to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(read_body(response).await, ERR_KIND_CONFLICT.as_bytes());
    }

    #[actix_web::test]
    async fn update_many_self_merges_the_batch() {
        let app = test_app!(empty_state().await);
        let body = r#"[
            {"id":"X","type":"counter","delta":5},
            {"id":"X","type":"counter","delta":3},
            {"id":"Y","type":"gauge","value":1.0},
            {"id":"Y","type":"gauge","value":2.0}
        ]"#;
        let response = call_service(&app, post("/updates", body).to_request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        let stored = body_json(response).await;
        let stored = stored.as_array().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0]["id"], json!("X"));
        assert_eq!(stored[0]["delta"], json!(8));
        assert_eq!(stored[1]["id"], json!("Y"));
        assert_eq!(stored[1]["value"], json!(2.0));
    }

    #[actix_web::test]
    async fn value_returns_stored_counter_with_signature() {
        let app = test_app!(seeded_state().await);
        let response =
            call_service(&app, post("/value", r#"{"id":"PollCount","type":"counter"}"#).to_request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "id": "PollCount",
                "type": "counter",
                "delta": 5,
                "hash": "7148ff92910a879bba42647839901cdd4f9c68f952657e36ead4e894511d82af"
            })
        );
    }

    #[actix_web::test]
    async fn value_returns_stored_gauge_with_signature() {
        let app = test_app!(seeded_state().await);
        let response = call_service(&app, post("/value", r#"{"id":"Alloc","type":"gauge"}"#).to_request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "id": "Alloc",
                "type": "gauge",
                "value": 10.123,
                "hash": "7e9e3da35d6b5e7bd5b2458f14fd54f566cfeb0e5b192cc220a08cf0b42f14a3"
            })
        );
    }

    #[actix_web::test]
    async fn value_for_missing_metric_is_not_found() {
        let app = test_app!(seeded_state().await);
        let response =
            call_service(&app, post("/value", r#"{"id":"Missing","type":"counter"}"#).to_request()).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(read_body(response).await, ERR_METRIC_NOT_FOUND.as_bytes());
    }

    #[actix_web::test]
    async fn value_with_mismatched_kind_is_not_found() {
        let app = test_app!(seeded_state().await);
        let response =
            call_service(&app, post("/value", r#"{"id":"PollCount","type":"gauge"}"#).to_request()).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn value_with_unknown_kind_is_not_implemented() {
        let app = test_app!(seeded_state().await);
        let response =
            call_service(&app, post("/value", r#"{"id":"PollCount","type":"nope"}"#).to_request()).await;

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[actix_web::test]
    async fn list_renders_sorted_html() {
        let app = test_app!(seeded_state().await);
        let response = call_service(&app, TestRequest::get().uri("/").to_request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_body(response).await;
        let html = std::str::from_utf8(&body).unwrap();
        let alloc = html.find("Alloc").unwrap();
        let poll_count = html.find("PollCount").unwrap();
        assert!(alloc < poll_count, "case-insensitive name order violated");
    }

    #[actix_web::test]
    async fn ping_reports_healthy_components() {
        let app = test_app!(seeded_state().await);
        let response = call_service(&app, TestRequest::get().uri("/ping").to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    struct DeadComponent;

    #[async_trait]
    impl Pingable for DeadComponent {
        async fn ping(&self) -> bool {
            false
        }
    }

    #[actix_web::test]
    async fn ping_reports_unhealthy_components() {
        let mut state = seeded_state().await;
        state.pingables.push(Arc::new(DeadComponent));
        let app = test_app!(state);

        let response = call_service(&app, TestRequest::get().uri("/ping").to_request()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn repeated_update_accumulates_end_to_end() {
        let app = test_app!(empty_state().await);
        let body = r#"{"id":"PollCount","type":"counter","delta":5}"#;

        let first = call_service(&app, post("/update", body).to_request()).await;
        assert_eq!(first.status(), StatusCode::OK);
        let first = body_json(first).await;
        assert_eq!(first["delta"], json!(5));
        assert!(first["hash"].is_string());

        let second = call_service(&app, post("/update", body).to_request()).await;
        assert_eq!(body_json(second).await["delta"], json!(10));
    }
}
