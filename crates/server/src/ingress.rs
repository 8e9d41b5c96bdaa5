//! Inbound HTTP surface for Slack callbacks.
//!
//! A single POST endpoint receives everything Slack sends: the
//! `url_verification` handshake, interactive payloads (form-encoded under a
//! `payload=` key), and Events API envelopes. Interactive callbacks are
//! acknowledged within Slack's window while their handlers run in the
//! background; event and fallback callbacks answer with the handler result.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use secrecy::SecretString;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use uuid::Uuid;

use courier_slack::events::{
    classify_callback, AckError, Acknowledger, CallbackDispatcher, CallbackKind, CallbackPayload,
    EventContext, NoopAcknowledger,
};

use crate::signature::{self, SignatureError};

/// Slack retries interactive callbacks not answered within three seconds.
const ACK_WINDOW: Duration = Duration::from_secs(3);

#[derive(Clone)]
pub struct IngressState {
    pub dispatcher: Arc<CallbackDispatcher>,
    pub signing_secret: SecretString,
    pub ack_window: Duration,
}

impl IngressState {
    pub fn new(dispatcher: Arc<CallbackDispatcher>, signing_secret: SecretString) -> Self {
        Self { dispatcher, signing_secret, ack_window: ACK_WINDOW }
    }

    pub fn with_ack_window(mut self, ack_window: Duration) -> Self {
        self.ack_window = ack_window;
        self
    }
}

pub fn router(state: IngressState) -> Router {
    Router::new().route("/slack/events", post(receive_callback)).with_state(state)
}

/// Acknowledger backed by the pending HTTP response. The first call releases
/// the response; later calls report `AlreadyAcknowledged`.
struct HttpAcknowledger {
    tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl HttpAcknowledger {
    fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Mutex::new(Some(tx)) }, rx)
    }
}

#[async_trait]
impl Acknowledger for HttpAcknowledger {
    async fn acknowledge(&self) -> Result<(), AckError> {
        let sender = match self.tx.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        match sender {
            Some(tx) => tx.send(()).map_err(|_| AckError::ChannelClosed),
            None => Err(AckError::AlreadyAcknowledged),
        }
    }
}

async fn receive_callback(
    State(state): State<IngressState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Ok(raw_body) = std::str::from_utf8(&body) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    if let Err(error) = verify_headers(&headers, raw_body, &state.signing_secret) {
        tracing::warn!(
            event_name = "ingress.http.signature_rejected",
            error = %error,
            "rejecting unsigned or stale callback"
        );
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let parsed = decode_body(raw_body);

    // The handshake is answered at the boundary; it never reaches handlers.
    if let Some(challenge) = parsed.get("challenge").and_then(Value::as_str) {
        if parsed.get("type").and_then(Value::as_str) == Some("url_verification") {
            return Json(json!({ "challenge": challenge })).into_response();
        }
    }

    let payload = match classify_callback(&parsed) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::warn!(
                event_name = "ingress.http.payload_unclassified",
                error = %error,
                "callback did not classify; routing to fallback"
            );
            CallbackPayload::Unrecognized { body: parsed }
        }
    };

    let ctx = EventContext { correlation_id: Uuid::new_v4().to_string() };

    match payload.kind() {
        CallbackKind::Shortcut | CallbackKind::ViewSubmission => {
            dispatch_interactive(state.dispatcher, payload, ctx, state.ack_window).await
        }
        _ => dispatch_inline(&state.dispatcher, &payload, &ctx).await,
    }
}

/// Interactive callbacks must be answered inside [`ACK_WINDOW`] even when the
/// outbound sends take longer, so the handler runs in a background task and
/// the response is released as soon as it acknowledges. The status is 200
/// either way; delivery failures surface as in-Slack notices and logs.
async fn dispatch_interactive(
    dispatcher: Arc<CallbackDispatcher>,
    payload: CallbackPayload,
    ctx: EventContext,
    ack_window: Duration,
) -> Response {
    let (ack, acked) = HttpAcknowledger::new();
    let task_ctx = ctx.clone();
    tokio::spawn(async move {
        if let Err(error) = dispatcher.dispatch(&payload, &task_ctx, &ack).await {
            tracing::error!(
                event_name = "ingress.http.interactive_dispatch_failed",
                correlation_id = %task_ctx.correlation_id,
                error = %error,
                "interactive callback handler failed"
            );
        }
    });

    if tokio::time::timeout(ack_window, acked).await.is_err() {
        tracing::warn!(
            correlation_id = %ctx.correlation_id,
            "handler did not acknowledge within the window; answering anyway"
        );
    }
    StatusCode::OK.into_response()
}

async fn dispatch_inline(
    dispatcher: &CallbackDispatcher,
    payload: &CallbackPayload,
    ctx: &EventContext,
) -> Response {
    match dispatcher.dispatch(payload, ctx, &NoopAcknowledger).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(error) => {
            tracing::error!(
                event_name = "ingress.http.dispatch_failed",
                correlation_id = %ctx.correlation_id,
                error = %error,
                "callback handler failed"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn verify_headers(
    headers: &HeaderMap,
    body: &str,
    signing_secret: &SecretString,
) -> Result<(), SignatureError> {
    let timestamp = headers
        .get("x-slack-request-timestamp")
        .and_then(|v| v.to_str().ok())
        .ok_or(SignatureError::MissingHeader("x-slack-request-timestamp"))?;
    let signature = headers
        .get("x-slack-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(SignatureError::MissingHeader("x-slack-signature"))?;

    signature::verify(body, timestamp, signature, signing_secret)
}

/// Interactive payloads arrive form-encoded as `payload=<urlencoded json>`;
/// events and the handshake arrive as bare JSON. Anything that fails to
/// parse becomes `Value::Null` and lands in the fallback handler.
fn decode_body(raw: &str) -> Value {
    let json_text = match raw.strip_prefix("payload=") {
        Some(encoded) => {
            let spaced = encoded.replace('+', " ");
            percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
        }
        None => raw.to_owned(),
    };

    serde_json::from_str(&json_text).unwrap_or(Value::Null)
}
