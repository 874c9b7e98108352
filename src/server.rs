//! Interactions endpoint
//!
//! Discord delivers interactions as signed HTTP POSTs. Each request is
//! checked against the application's Ed25519 public key before it reaches
//! the router.
//!
//! Endpoints:
//! - `POST /interactions`: interaction webhook
//! - `GET /health`: liveness

use crate::config::ServerConfig;
use crate::error::ConfigError;
use crate::interactions::{Interaction, InteractionRouter};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Verifies `timestamp || body` against the application public key
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    pub fn from_hex(public_key: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            field: "discord.public_key",
            reason,
        };
        let bytes = hex::decode(public_key.trim())
            .map_err(|e| invalid(format!("invalid hex: {}", e)))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| invalid(format!("expected 32 bytes, got {}", b.len())))?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| invalid(format!("not an Ed25519 point: {}", e)))?;
        Ok(Self { key })
    }

    pub fn verify(&self, timestamp: &str, body: &[u8], signature_hex: &str) -> bool {
        let sig_bytes = match hex::decode(signature_hex.trim()) {
            Ok(b) => b,
            Err(e) => {
                debug!("Failed to decode signature hex: {}", e);
                return false;
            }
        };
        let Ok(sig_array) = <[u8; 64]>::try_from(sig_bytes.as_slice()) else {
            debug!("Invalid signature length: {} (expected 64)", sig_bytes.len());
            return false;
        };
        let signature = Signature::from_bytes(&sig_array);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key.verify(&message, &signature).is_ok()
    }
}

pub struct ServerState {
    pub router: InteractionRouter,
    pub verifier: SignatureVerifier,
}

pub fn app(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/interactions", post(handle_interaction))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn handle_interaction(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (Some(signature), Some(timestamp)) = (
        header_str(&headers, SIGNATURE_HEADER),
        header_str(&headers, TIMESTAMP_HEADER),
    ) else {
        warn!("Interaction request without signature headers");
        return (StatusCode::UNAUTHORIZED, "missing request signature").into_response();
    };

    if !state.verifier.verify(timestamp, &body, signature) {
        warn!("Interaction request with invalid signature");
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(i) => i,
        Err(e) => {
            warn!("Malformed interaction payload: {}", e);
            return (StatusCode::BAD_REQUEST, "malformed interaction").into_response();
        }
    };

    Json(state.router.dispatch(&interaction).await).into_response()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub async fn run_server(config: &ServerConfig, state: Arc<ServerState>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Interactions endpoint listening on {}", addr);
    info!("  POST /interactions - Discord interaction webhook");
    info!("  GET  /health       - Health check");

    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use crate::context::AppContext;
    use crate::platform::memory::MemoryTransport;
    use crate::registration_store::SqliteSubmissionStore;
    use axum::body::Body;
    use axum::http::Request;
    use ed25519_dalek::{Signer, SigningKey};
    use tower::ServiceExt;

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn test_app() -> Router {
        let ctx = AppContext::new(
            BotConfig::default(),
            Arc::new(SqliteSubmissionStore::in_memory().unwrap()),
            Arc::new(MemoryTransport::default()),
        );
        let verifier =
            SignatureVerifier::from_hex(&hex::encode(signing_key().verifying_key().to_bytes()))
                .unwrap();
        app(Arc::new(ServerState {
            router: InteractionRouter::new(Arc::new(ctx)),
            verifier,
        }))
    }

    fn signed_request(body: &str, key: &SigningKey) -> Request<Body> {
        let timestamp = "1700000000";
        let signature = key.sign(format!("{}{}", timestamp, body).as_bytes());
        Request::post("/interactions")
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, hex::encode(signature.to_bytes()))
            .header(TIMESTAMP_HEADER, timestamp)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_verifier_rejects_bad_input() {
        let key = signing_key();
        let verifier =
            SignatureVerifier::from_hex(&hex::encode(key.verifying_key().to_bytes())).unwrap();
        let signature = hex::encode(key.sign(b"123body").to_bytes());

        assert!(verifier.verify("123", b"body", &signature));
        assert!(!verifier.verify("124", b"body", &signature));
        assert!(!verifier.verify("123", b"bodx", &signature));
        assert!(!verifier.verify("123", b"body", "zz"));
        assert!(!verifier.verify("123", b"body", "abcd"));
    }

    #[test]
    fn test_bad_public_key_is_config_error() {
        for key in ["abcd", "not hex", ""] {
            assert!(matches!(
                SignatureVerifier::from_hex(key),
                Err(ConfigError::Invalid {
                    field: "discord.public_key",
                    ..
                })
            ));
        }
    }

    #[tokio::test]
    async fn test_ping_round_trip() {
        let response = test_app()
            .oneshot(signed_request(r#"{"type":1}"#, &signing_key()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"type":1}"#);
    }

    #[tokio::test]
    async fn test_wrong_key_is_unauthorized() {
        let other = SigningKey::from_bytes(&[9u8; 32]);
        let response = test_app()
            .oneshot(signed_request(r#"{"type":1}"#, &other))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_headers_is_unauthorized() {
        let request = Request::post("/interactions")
            .body(Body::from(r#"{"type":1}"#))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let response = test_app()
            .oneshot(signed_request("not json", &signing_key()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "OK");
    }
}
