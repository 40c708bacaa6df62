// 🌐 HTTP Surface
// JSON routes over the request façade; admin token rides in a header

use crate::api::{
    ApiResponse, Forge, GenerateAddressRequest, GenerateAddressesRequest, GenerateCardRequest,
    GenerateCardsRequest, GenerateNameRequest, LoginRequest, SettingRequest, UpdateBinRequest,
};
use crate::error::{ErrorKind, ForgeError};
use crate::registry::{BinPatch, NewBin};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::error;

/// Header carrying the admin session token
pub const SESSION_HEADER: &str = "x-session-token";

#[derive(Debug, Deserialize)]
pub struct LoadDatasetRequest {
    pub path: PathBuf,
}

/// HTTP status for an envelope
pub fn status_for(kind: Option<ErrorKind>) -> StatusCode {
    match kind {
        None => StatusCode::OK,
        Some(ErrorKind::InvalidPattern)
        | Some(ErrorKind::InvalidCount)
        | Some(ErrorKind::InvalidOptions)
        | Some(ErrorKind::InvalidDataset)
        | Some(ErrorKind::Config) => StatusCode::BAD_REQUEST,
        Some(ErrorKind::InvalidCredentials) | Some(ErrorKind::SessionExpired) => {
            StatusCode::UNAUTHORIZED
        }
        Some(ErrorKind::NotFound) | Some(ErrorKind::NoMatchingAddress) => StatusCode::NOT_FOUND,
        Some(ErrorKind::DatasetNotLoaded) => StatusCode::SERVICE_UNAVAILABLE,
        Some(ErrorKind::Persistence) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reply<T: Serialize>(response: ApiResponse<T>) -> Response {
    (status_for(response.error), Json(response)).into_response()
}

fn session_token(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Run a façade call on the blocking pool (SQLite and argon2 block)
async fn blocking<T, F>(forge: Arc<Forge>, f: F) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce(&Forge) -> ApiResponse<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || f(&forge)).await {
        Ok(response) => reply(response),
        Err(e) => {
            error!("request task failed: {}", e);
            reply(ApiResponse::<()>::fail(&ForgeError::Persistence(
                "request aborted".to_string(),
            )))
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/health
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/cards
async fn generate_card(
    State(forge): State<Arc<Forge>>,
    Json(req): Json<GenerateCardRequest>,
) -> Response {
    reply(forge.generate_card(&req))
}

/// POST /api/cards/bulk
async fn generate_cards(
    State(forge): State<Arc<Forge>>,
    Json(req): Json<GenerateCardsRequest>,
) -> Response {
    reply(forge.generate_cards(&req))
}

/// POST /api/address
async fn generate_address(
    State(forge): State<Arc<Forge>>,
    Json(req): Json<GenerateAddressRequest>,
) -> Response {
    reply(forge.generate_address(&req))
}

/// POST /api/address/bulk
async fn generate_addresses(
    State(forge): State<Arc<Forge>>,
    Json(req): Json<GenerateAddressesRequest>,
) -> Response {
    reply(forge.generate_addresses(&req))
}

/// POST /api/name
async fn generate_name(
    State(forge): State<Arc<Forge>>,
    Json(req): Json<GenerateNameRequest>,
) -> Response {
    reply(forge.generate_name(&req))
}

/// GET /api/dataset
async fn dataset_status(State(forge): State<Arc<Forge>>) -> Response {
    reply(forge.dataset_status())
}

/// POST /api/dataset/load (admin)
async fn load_dataset(
    State(forge): State<Arc<Forge>>,
    headers: HeaderMap,
    Json(req): Json<LoadDatasetRequest>,
) -> Response {
    let token = session_token(&headers);
    reply(forge.load_dataset_bounded(&token, req.path).await)
}

/// POST /api/admin/login
async fn admin_login(State(forge): State<Arc<Forge>>, Json(req): Json<LoginRequest>) -> Response {
    blocking(forge, move |f| f.admin_login(&req)).await
}

/// GET /api/admin/session
async fn admin_verify_session(State(forge): State<Arc<Forge>>, headers: HeaderMap) -> Response {
    let token = session_token(&headers);
    blocking(forge, move |f| f.admin_verify_session(&token)).await
}

/// POST /api/admin/logout
async fn admin_logout(State(forge): State<Arc<Forge>>, headers: HeaderMap) -> Response {
    let token = session_token(&headers);
    blocking(forge, move |f| f.admin_logout(&token)).await
}

/// GET /api/bins (admin)
async fn get_all_bins(State(forge): State<Arc<Forge>>, headers: HeaderMap) -> Response {
    let token = session_token(&headers);
    blocking(forge, move |f| f.get_all_bins(&token)).await
}

/// GET /api/bins/active
async fn get_active_bins(State(forge): State<Arc<Forge>>) -> Response {
    blocking(forge, |f| f.get_active_bins()).await
}

/// POST /api/bins (admin)
async fn add_bin(
    State(forge): State<Arc<Forge>>,
    headers: HeaderMap,
    Json(record): Json<NewBin>,
) -> Response {
    let token = session_token(&headers);
    blocking(forge, move |f| f.add_bin(&token, record)).await
}

/// PUT /api/bins/:id (admin)
async fn update_bin(
    State(forge): State<Arc<Forge>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<BinPatch>,
) -> Response {
    let token = session_token(&headers);
    blocking(forge, move |f| {
        f.update_bin(&token, UpdateBinRequest { id, patch })
    })
    .await
}

/// DELETE /api/bins/:id (admin)
async fn delete_bin(
    State(forge): State<Arc<Forge>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let token = session_token(&headers);
    blocking(forge, move |f| f.delete_bin(&token, &id)).await
}

/// GET /api/settings/:key
async fn get_setting(State(forge): State<Arc<Forge>>, Path(key): Path<String>) -> Response {
    blocking(forge, move |f| f.get_setting(&key)).await
}

/// PUT /api/settings (admin)
async fn set_setting(
    State(forge): State<Arc<Forge>>,
    headers: HeaderMap,
    Json(req): Json<SettingRequest>,
) -> Response {
    let token = session_token(&headers);
    blocking(forge, move |f| f.set_setting(&token, &req)).await
}

/// GET /api/config/path
async fn get_config_path(State(forge): State<Arc<Forge>>) -> Response {
    reply(forge.get_config_path())
}

/// POST /api/config/reset (admin)
async fn reset_config(State(forge): State<Arc<Forge>>, headers: HeaderMap) -> Response {
    let token = session_token(&headers);
    blocking(forge, move |f| f.reset_config(&token)).await
}

// ============================================================================
// Router
// ============================================================================

pub fn router(forge: Arc<Forge>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/cards", post(generate_card))
        .route("/cards/bulk", post(generate_cards))
        .route("/address", post(generate_address))
        .route("/address/bulk", post(generate_addresses))
        .route("/name", post(generate_name))
        .route("/dataset", get(dataset_status))
        .route("/dataset/load", post(load_dataset))
        .route("/admin/login", post(admin_login))
        .route("/admin/session", get(admin_verify_session))
        .route("/admin/logout", post(admin_logout))
        .route("/bins", get(get_all_bins).post(add_bin))
        .route("/bins/active", get(get_active_bins))
        .route("/bins/:id", put(update_bin).delete(delete_bin))
        .route("/settings", put(set_setting))
        .route("/settings/:key", get(get_setting))
        .route("/config/path", get(get_config_path))
        .route("/config/reset", post(reset_config))
        .with_state(forge);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(Forge::in_memory(AppConfig::default()).unwrap()))
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header(SESSION_HEADER, token);
        }
        let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let (status, body) = call(&app, Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_bulk_generation_route() {
        let app = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/cards/bulk",
            None,
            Some(json!({"pattern": "552461xxxxxxxxxx", "count": 4, "format": "csv"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["cards"].as_array().unwrap().len(), 4);
        assert!(body["data"]["rendered"]
            .as_str()
            .unwrap()
            .starts_with("number,exp_month"));
    }

    #[tokio::test]
    async fn test_invalid_count_is_bad_request() {
        let app = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/cards/bulk",
            None,
            Some(json!({"pattern": "552461xxxxxxxxxx", "count": -1})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_count");
    }

    #[tokio::test]
    async fn test_address_without_dataset_is_unavailable() {
        let app = app();
        let (status, body) = call(&app, Method::POST, "/api/address", None, Some(json!({}))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_admin_flow_over_http() {
        let app = app();

        let (status, _) = call(&app, Method::GET, "/api/bins", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/admin/login",
            None,
            Some(json!({"username": "admin", "password": "admin123"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/bins",
            Some(&token),
            Some(json!({"pattern": "411111XXXXXXXXXX", "description": "visa"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["cardType"], "visa");
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/api/bins/{}", id),
            Some(&token),
            Some(json!({"active": false})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["active"], false);

        let (_, body) = call(&app, Method::GET, "/api/bins/active", None, None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let (status, _) = call(
            &app,
            Method::DELETE,
            &format!("/api/bins/{}", id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            Method::DELETE,
            &format!("/api/bins/{}", id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        let (status, _) = call(&app, Method::POST, "/api/admin/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, Method::GET, "/api/admin/session", Some(&token), None).await;
        assert_eq!(body["data"]["valid"], false);
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let app = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/admin/login",
            None,
            Some(json!({"username": "admin", "password": "nope"})),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_credentials");
    }

    #[tokio::test]
    async fn test_dataset_load_requires_session() {
        let app = app();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("us-US.csv");
        std::fs::write(&path, "FULL ADDRESS,CITY,JURISDICTION,ZIP\n1 A St,Houston,Texas,77001\n")
            .unwrap();

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/dataset/load",
            None,
            Some(json!({"path": path})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "session_expired");

        let (_, body) = call(&app, Method::GET, "/api/dataset", None, None).await;
        assert_eq!(body["data"]["loaded"], false);

        let (_, body) = call(
            &app,
            Method::POST,
            "/api/admin/login",
            None,
            Some(json!({"username": "admin", "password": "admin123"})),
        )
        .await;
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/dataset/load",
            Some(&token),
            Some(json!({"path": path})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["count"], 1);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/address/bulk",
            None,
            Some(json!({"count": 3, "include_name": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_oversized_expiry_horizon_is_bad_request() {
        let app = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/cards",
            None,
            Some(json!({"pattern": "552461xxxxxxxxxx", "years_ahead": 4294967295u32})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_options");
    }
}
