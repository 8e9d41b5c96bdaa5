use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::{
    client::ChatClient,
    relay::{DeliveryOutcome, ShortcutHandler, SubmissionHandler},
};

/// Callback identifier of the global "send a message" shortcut.
pub const SEND_MESSAGE_SHORTCUT: &str = "send_message_shortcut";
/// Callback identifier of the modal opened by the shortcut.
pub const SEND_MESSAGE_MODAL: &str = "send_message_modal";

/// Block and action ids the modal submission state is keyed by.
pub const USER_SELECT_BLOCK: &str = "user_select";
pub const USER_SELECT_ACTION: &str = "selected_user";
pub const MESSAGE_INPUT_BLOCK: &str = "message_input";
pub const MESSAGE_INPUT_ACTION: &str = "message";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShortcutInvocation {
    pub user_id: String,
    pub trigger_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModalSubmission {
    pub sender_id: String,
    pub recipient_id: String,
    pub message_text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventCallback {
    pub event_type: String,
}

/// One inbound callback, classified by its discriminant fields.
///
/// `UrlVerification` is answered at the HTTP boundary and never reaches the
/// dispatcher; it is modeled here so classification is total.
#[derive(Clone, Debug, PartialEq)]
pub enum CallbackPayload {
    UrlVerification { challenge: String },
    Shortcut(ShortcutInvocation),
    ViewSubmission(ModalSubmission),
    Event(EventCallback),
    Unrecognized { body: Value },
}

impl CallbackPayload {
    pub fn kind(&self) -> CallbackKind {
        match self {
            Self::UrlVerification { .. } => CallbackKind::Handshake,
            Self::Shortcut(_) => CallbackKind::Shortcut,
            Self::ViewSubmission(_) => CallbackKind::ViewSubmission,
            Self::Event(_) => CallbackKind::Event,
            Self::Unrecognized { .. } => CallbackKind::Unrecognized,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    Handshake,
    Shortcut,
    ViewSubmission,
    Event,
    Unrecognized,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PayloadParseError {
    #[error("callback payload is missing field `{0}`")]
    MissingField(&'static str),
    #[error("callback body is not a JSON object")]
    NotAnObject,
}

/// Classify an inbound callback body by its discriminant fields.
///
/// Shortcuts and view submissions carrying a foreign callback id fall through
/// to `Unrecognized` rather than erroring; a payload that matches one of our
/// callback ids but is missing required fields is malformed and errors.
pub fn classify_callback(body: &Value) -> Result<CallbackPayload, PayloadParseError> {
    if !body.is_object() {
        return Err(PayloadParseError::NotAnObject);
    }

    match body.get("type").and_then(Value::as_str) {
        Some("url_verification") => {
            let challenge = str_at(body, &["challenge"])
                .ok_or(PayloadParseError::MissingField("challenge"))?;
            return Ok(CallbackPayload::UrlVerification { challenge: challenge.to_owned() });
        }
        Some("shortcut") => {
            if str_at(body, &["callback_id"]) == Some(SEND_MESSAGE_SHORTCUT) {
                return shortcut_from_body(body).map(CallbackPayload::Shortcut);
            }
        }
        Some("view_submission") => {
            if str_at(body, &["view", "callback_id"]) == Some(SEND_MESSAGE_MODAL) {
                return submission_from_body(body).map(CallbackPayload::ViewSubmission);
            }
        }
        _ => {}
    }

    if let Some(event) = body.get("event") {
        let event_type = str_at(event, &["type"]).unwrap_or("unknown").to_owned();
        return Ok(CallbackPayload::Event(EventCallback { event_type }));
    }

    Ok(CallbackPayload::Unrecognized { body: body.clone() })
}

fn shortcut_from_body(body: &Value) -> Result<ShortcutInvocation, PayloadParseError> {
    let user_id =
        str_at(body, &["user", "id"]).ok_or(PayloadParseError::MissingField("user.id"))?;
    let trigger_id =
        str_at(body, &["trigger_id"]).ok_or(PayloadParseError::MissingField("trigger_id"))?;

    Ok(ShortcutInvocation { user_id: user_id.to_owned(), trigger_id: trigger_id.to_owned() })
}

fn submission_from_body(body: &Value) -> Result<ModalSubmission, PayloadParseError> {
    let sender_id =
        str_at(body, &["user", "id"]).ok_or(PayloadParseError::MissingField("user.id"))?;
    let recipient_id = str_at(
        body,
        &["view", "state", "values", USER_SELECT_BLOCK, USER_SELECT_ACTION, "selected_user"],
    )
    .ok_or(PayloadParseError::MissingField("view.state.values.user_select.selected_user"))?;
    let message_text = str_at(
        body,
        &["view", "state", "values", MESSAGE_INPUT_BLOCK, MESSAGE_INPUT_ACTION, "value"],
    )
    .ok_or(PayloadParseError::MissingField("view.state.values.message_input.message"))?;

    Ok(ModalSubmission {
        sender_id: sender_id.to_owned(),
        recipient_id: recipient_id.to_owned(),
        message_text: message_text.to_owned(),
    })
}

fn str_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = root;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerOutcome {
    Delivery(DeliveryOutcome),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AckError {
    #[error("callback was already acknowledged")]
    AlreadyAcknowledged,
    #[error("acknowledgment channel closed before the callback was acknowledged")]
    ChannelClosed,
}

/// Releases the inbound HTTP response for a callback.
///
/// Handlers must acknowledge before starting any outbound call; the platform
/// retries callbacks that are not acknowledged within its window.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn acknowledge(&self) -> Result<(), AckError>;
}

/// Acknowledger for paths where the HTTP response itself is the ack.
#[derive(Default)]
pub struct NoopAcknowledger;

#[async_trait]
impl Acknowledger for NoopAcknowledger {
    async fn acknowledge(&self) -> Result<(), AckError> {
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("fallback processing failed: {0}")]
    Fallback(String),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

#[async_trait]
pub trait CallbackHandler: Send + Sync {
    fn kind(&self) -> CallbackKind;
    async fn handle(
        &self,
        payload: &CallbackPayload,
        ctx: &EventContext,
        ack: &dyn Acknowledger,
    ) -> Result<HandlerOutcome, HandlerError>;
}

/// Explicit dispatch table from callback kind to handler.
///
/// A payload whose kind has no registered handler is routed to the fallback
/// handler, which attempts best-effort generic processing.
pub struct CallbackDispatcher {
    handlers: HashMap<CallbackKind, Arc<dyn CallbackHandler>>,
    fallback: Arc<dyn CallbackHandler>,
}

impl CallbackDispatcher {
    pub fn new(fallback: Arc<dyn CallbackHandler>) -> Self {
        Self { handlers: HashMap::new(), fallback }
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: CallbackHandler + 'static,
    {
        self.handlers.insert(handler.kind(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        payload: &CallbackPayload,
        ctx: &EventContext,
        ack: &dyn Acknowledger,
    ) -> Result<HandlerOutcome, DispatchError> {
        let handler = self.handlers.get(&payload.kind()).unwrap_or(&self.fallback);
        handler.handle(payload, ctx, ack).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Handles Events API callbacks. Courier subscribes to no events for its own
/// logic; deliveries are logged and acknowledged so the platform does not
/// retry them.
pub struct GenericEventHandler;

#[async_trait]
impl CallbackHandler for GenericEventHandler {
    fn kind(&self) -> CallbackKind {
        CallbackKind::Event
    }

    async fn handle(
        &self,
        payload: &CallbackPayload,
        ctx: &EventContext,
        ack: &dyn Acknowledger,
    ) -> Result<HandlerOutcome, HandlerError> {
        let CallbackPayload::Event(event) = payload else {
            return Ok(HandlerOutcome::Ignored);
        };

        if let Err(error) = ack.acknowledge().await {
            tracing::warn!(
                correlation_id = %ctx.correlation_id,
                error = %error,
                "failed to acknowledge event callback"
            );
        }

        tracing::info!(
            event_name = "ingress.slack.event_received",
            correlation_id = %ctx.correlation_id,
            event_type = %event.event_type,
            "received slack event"
        );
        Ok(HandlerOutcome::Processed)
    }
}

/// Best-effort handler for payloads no other handler claims.
///
/// Logs the payload's top-level keys and succeeds; it only fails when the
/// body was not a JSON object at all, which is the one shape we cannot even
/// describe in a log line.
pub struct FallbackHandler;

#[async_trait]
impl CallbackHandler for FallbackHandler {
    fn kind(&self) -> CallbackKind {
        CallbackKind::Unrecognized
    }

    async fn handle(
        &self,
        payload: &CallbackPayload,
        ctx: &EventContext,
        ack: &dyn Acknowledger,
    ) -> Result<HandlerOutcome, HandlerError> {
        if let Err(error) = ack.acknowledge().await {
            tracing::warn!(
                correlation_id = %ctx.correlation_id,
                error = %error,
                "failed to acknowledge fallback callback"
            );
        }

        let CallbackPayload::Unrecognized { body } = payload else {
            tracing::warn!(
                correlation_id = %ctx.correlation_id,
                kind = ?payload.kind(),
                "no handler registered for callback kind; ignoring"
            );
            return Ok(HandlerOutcome::Processed);
        };

        let Some(object) = body.as_object() else {
            return Err(HandlerError::Fallback("callback body is not a JSON object".to_owned()));
        };

        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        tracing::warn!(
            event_name = "ingress.slack.unrecognized_payload",
            correlation_id = %ctx.correlation_id,
            top_level_keys = ?keys,
            "unrecognized callback payload processed by fallback"
        );
        Ok(HandlerOutcome::Processed)
    }
}

/// The production dispatch table: shortcut, view submission, generic event,
/// with the best-effort fallback behind everything else.
pub fn default_dispatcher(client: Arc<dyn ChatClient>) -> CallbackDispatcher {
    let mut dispatcher = CallbackDispatcher::new(Arc::new(FallbackHandler));
    dispatcher.register(ShortcutHandler::new(client.clone()));
    dispatcher.register(SubmissionHandler::new(client));
    dispatcher.register(GenericEventHandler);
    dispatcher
}
