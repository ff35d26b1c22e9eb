//! API handlers for the Relay Service
//!
//! Route paths and JSON field names form the wire contract clients encrypt
//! against; the handlers stay thin and push all semantics into the relay
//! core.

use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use deaddrop_core::{EnvelopeId, RelayError, Timestamp, UserId};
use deaddrop_relay::EnvelopeView;

use crate::error::ApiError;
use crate::AppState;

/// Configure API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/register-key", web::post().to(register_key))
            .route("/get-public-key/{user_id}", web::get().to(get_public_key))
            .route("/send-message", web::post().to(send_message))
            .route("/get-messages/{user_id}", web::get().to(get_messages))
            .route("/mark-read", web::post().to(mark_read))
            .route("/status", web::get().to(status)),
    )
    .route("/health", web::get().to(health));
}

/// Reject absent or empty string fields uniformly
fn require_str<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ApiError> {
    match value.as_deref() {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(ApiError(RelayError::MissingField(name))),
    }
}

/// Client identifier used for rate limiting: the peer IP, with a shared
/// bucket for anything that arrives without one.
fn client_id(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Register key request
#[derive(Debug, Deserialize)]
pub struct RegisterKeyRequest {
    pub user_id: Option<String>,
    pub public_key: Option<serde_json::Value>,
}

/// Register a user's public key so others can encrypt messages for them
async fn register_key(
    state: web::Data<AppState>,
    req: web::Json<RegisterKeyRequest>,
) -> ActixResult<HttpResponse, ApiError> {
    let req = req.into_inner();
    let user_id = require_str(&req.user_id, "user_id")?;
    let public_key = req
        .public_key
        .filter(|v| !v.is_null())
        .ok_or(ApiError(RelayError::MissingField("public_key")))?;

    state
        .relay
        .register_key(UserId::from(user_id), public_key);

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

/// Public key response
#[derive(Debug, Serialize)]
pub struct PublicKeyResponse {
    pub success: bool,
    pub public_key: serde_json::Value,
}

/// Fetch a user's public key
async fn get_public_key(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse, ApiError> {
    let user_id = UserId::from_string(path.into_inner());
    debug!("public key lookup for {}", user_id);

    let public_key = state.relay.lookup_key(&user_id)?;

    Ok(HttpResponse::Ok().json(PublicKeyResponse {
        success: true,
        public_key,
    }))
}

/// Send message request
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub recipient_id: Option<String>,
    pub encrypted_data: Option<serde_json::Value>,
    pub sender_id: Option<String>,
}

/// Send message response
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message_id: String,
}

/// Accept an already-encrypted message for a recipient
async fn send_message(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    req: web::Json<SendMessageRequest>,
) -> ActixResult<HttpResponse, ApiError> {
    let req = req.into_inner();
    let recipient = require_str(&req.recipient_id, "recipient_id")?.into();
    let payload = req
        .encrypted_data
        .filter(|v| !v.is_null())
        .ok_or(ApiError(RelayError::MissingField("encrypted_data")))?;
    let sender = req
        .sender_id
        .filter(|s| !s.is_empty())
        .map(UserId::from);

    let message_id = state.relay.send_message(
        recipient,
        payload,
        sender,
        &client_id(&http_req),
        Timestamp::now(),
    )?;

    Ok(HttpResponse::Ok().json(SendMessageResponse {
        success: true,
        message_id: message_id.to_string(),
    }))
}

/// One message as returned to its recipient
#[derive(Debug, Serialize)]
pub struct MessageItem {
    pub id: String,
    pub encrypted_data: serde_json::Value,
    pub timestamp: String,
    pub sender_id: Option<String>,
}

impl From<EnvelopeView> for MessageItem {
    fn from(view: EnvelopeView) -> Self {
        Self {
            id: view.id.to_string(),
            encrypted_data: view.payload,
            timestamp: view.created_at.to_rfc3339(),
            sender_id: view.sender.map(|s| s.to_string()),
        }
    }
}

/// Fetch the unread messages for a user
async fn get_messages(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse, ApiError> {
    let user_id = UserId::from_string(path.into_inner());

    let messages: Vec<MessageItem> = state
        .relay
        .get_messages(&user_id)
        .into_iter()
        .map(MessageItem::from)
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "messages": messages
    })))
}

/// Mark read request
#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub user_id: Option<String>,
    pub message_id: Option<String>,
}

/// Acknowledge a message, scheduling its deletion
async fn mark_read(
    state: web::Data<AppState>,
    req: web::Json<MarkReadRequest>,
) -> ActixResult<HttpResponse, ApiError> {
    let req = req.into_inner();
    let user_id = UserId::from(require_str(&req.user_id, "user_id")?);
    let message_id = EnvelopeId::from_string(require_str(&req.message_id, "message_id")?);

    // Fire-and-forget: unknown ids are indistinguishable from already-reaped
    // ones, so this always reports success.
    state.relay.mark_read(&user_id, &message_id);

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

/// Server status with store counters and the lifetime echo
async fn status(state: web::Data<AppState>) -> ActixResult<HttpResponse, ApiError> {
    let stats = state.relay.status();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "active",
        "users_with_keys": stats.users_with_keys,
        "mailboxes": stats.mailbox_count,
        "total_messages": stats.total_messages,
        "message_lifetime_secs": stats.message_lifetime_secs
    })))
}

/// Health check endpoint for deployment probes
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "deaddrop",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
