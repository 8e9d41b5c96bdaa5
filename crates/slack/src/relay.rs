//! Handlers behind the "send a message" shortcut.
//!
//! The shortcut opens a modal; the submission delivers the composed message
//! to the recipient and then confirms to the sender. Both handlers
//! acknowledge the callback before touching the network.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    blocks::send_message_modal,
    client::ChatClient,
    events::{
        Acknowledger, CallbackHandler, CallbackKind, CallbackPayload, EventContext, HandlerError,
        HandlerOutcome,
    },
};

/// Notice posted to the sender when delivery to the recipient failed.
pub const FAILURE_NOTICE: &str =
    "There was an error sending your message. Please try again later.";

/// How far the submission got before something failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Recipient message and sender confirmation both delivered.
    Delivered,
    /// Recipient got the message but the confirmation to the sender failed.
    PartialFailure,
    /// The message never reached the recipient.
    Failed,
}

/// Opens the compose modal when the global shortcut fires.
pub struct ShortcutHandler {
    client: Arc<dyn ChatClient>,
}

impl ShortcutHandler {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CallbackHandler for ShortcutHandler {
    fn kind(&self) -> CallbackKind {
        CallbackKind::Shortcut
    }

    async fn handle(
        &self,
        payload: &CallbackPayload,
        ctx: &EventContext,
        ack: &dyn Acknowledger,
    ) -> Result<HandlerOutcome, HandlerError> {
        let CallbackPayload::Shortcut(invocation) = payload else {
            return Ok(HandlerOutcome::Ignored);
        };

        if let Err(error) = ack.acknowledge().await {
            tracing::warn!(
                correlation_id = %ctx.correlation_id,
                error = %error,
                "failed to acknowledge shortcut callback"
            );
        }

        let view = send_message_modal();
        if let Err(error) = self.client.open_view(&invocation.trigger_id, &view).await {
            // The trigger id expires in seconds; nothing to retry or tell
            // the user once views.open has failed.
            tracing::warn!(
                event_name = "relay.modal_open_failed",
                correlation_id = %ctx.correlation_id,
                user_id = %invocation.user_id,
                error = %error,
                "failed to open compose modal"
            );
            return Ok(HandlerOutcome::Processed);
        }

        tracing::info!(
            event_name = "relay.modal_opened",
            correlation_id = %ctx.correlation_id,
            user_id = %invocation.user_id,
            "compose modal opened"
        );
        Ok(HandlerOutcome::Processed)
    }
}

/// Delivers a submitted message: recipient first, then the sender
/// confirmation.
pub struct SubmissionHandler {
    client: Arc<dyn ChatClient>,
}

impl SubmissionHandler {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    async fn notify_failure(&self, ctx: &EventContext, sender_id: &str) {
        if let Err(error) = self.client.post_message(sender_id, FAILURE_NOTICE).await {
            tracing::warn!(
                correlation_id = %ctx.correlation_id,
                sender_id = %sender_id,
                error = %error,
                "failed to deliver failure notice to sender"
            );
        }
    }
}

#[async_trait]
impl CallbackHandler for SubmissionHandler {
    fn kind(&self) -> CallbackKind {
        CallbackKind::ViewSubmission
    }

    async fn handle(
        &self,
        payload: &CallbackPayload,
        ctx: &EventContext,
        ack: &dyn Acknowledger,
    ) -> Result<HandlerOutcome, HandlerError> {
        let CallbackPayload::ViewSubmission(submission) = payload else {
            return Ok(HandlerOutcome::Ignored);
        };

        if let Err(error) = ack.acknowledge().await {
            tracing::warn!(
                correlation_id = %ctx.correlation_id,
                error = %error,
                "failed to acknowledge view submission"
            );
        }

        if let Err(error) =
            self.client.post_message(&submission.recipient_id, &submission.message_text).await
        {
            tracing::warn!(
                event_name = "relay.delivery_failed",
                correlation_id = %ctx.correlation_id,
                sender_id = %submission.sender_id,
                recipient_id = %submission.recipient_id,
                error = %error,
                "failed to deliver message to recipient"
            );
            self.notify_failure(ctx, &submission.sender_id).await;
            return Ok(HandlerOutcome::Delivery(DeliveryOutcome::Failed));
        }

        let confirmation =
            format!("Your message has been sent to <@{}>.", submission.recipient_id);
        if let Err(error) =
            self.client.post_message(&submission.sender_id, &confirmation).await
        {
            tracing::warn!(
                event_name = "relay.confirmation_failed",
                correlation_id = %ctx.correlation_id,
                sender_id = %submission.sender_id,
                recipient_id = %submission.recipient_id,
                error = %error,
                "message delivered but confirmation to sender failed"
            );
            self.notify_failure(ctx, &submission.sender_id).await;
            return Ok(HandlerOutcome::Delivery(DeliveryOutcome::PartialFailure));
        }

        tracing::info!(
            event_name = "relay.message_delivered",
            correlation_id = %ctx.correlation_id,
            sender_id = %submission.sender_id,
            recipient_id = %submission.recipient_id,
            "message delivered and sender confirmed"
        );
        Ok(HandlerOutcome::Delivery(DeliveryOutcome::Delivered))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::{
        DeliveryOutcome, ShortcutHandler, SubmissionHandler, FAILURE_NOTICE,
    };
    use crate::{
        blocks::ModalView,
        client::{ChatClient, ClientError},
        events::{
            AckError, Acknowledger, CallbackHandler, CallbackPayload, EventContext,
            HandlerOutcome, ModalSubmission, ShortcutInvocation,
        },
    };

    /// Shared operation log so tests can assert ordering across the
    /// acknowledger and the chat client.
    type OpLog = Arc<Mutex<Vec<String>>>;

    struct RecordingAck {
        ops: OpLog,
    }

    #[async_trait]
    impl Acknowledger for RecordingAck {
        async fn acknowledge(&self) -> Result<(), AckError> {
            self.ops.lock().unwrap().push("ack".to_owned());
            Ok(())
        }
    }

    struct ScriptedClient {
        ops: OpLog,
        /// Channels for which post_message should fail.
        failing_channels: Vec<String>,
        fail_open_view: bool,
    }

    impl ScriptedClient {
        fn new(ops: OpLog) -> Self {
            Self { ops, failing_channels: Vec::new(), fail_open_view: false }
        }

        fn error() -> ClientError {
            ClientError::Api { method: "chat.postMessage".to_owned(), code: "fatal_error".to_owned() }
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn open_view(&self, trigger_id: &str, _view: &ModalView) -> Result<(), ClientError> {
            self.ops.lock().unwrap().push(format!("open_view:{trigger_id}"));
            if self.fail_open_view {
                return Err(Self::error());
            }
            Ok(())
        }

        async fn post_message(&self, channel: &str, text: &str) -> Result<(), ClientError> {
            self.ops.lock().unwrap().push(format!("post:{channel}:{text}"));
            if self.failing_channels.iter().any(|c| c == channel) {
                return Err(Self::error());
            }
            Ok(())
        }
    }

    fn shortcut_payload() -> CallbackPayload {
        CallbackPayload::Shortcut(ShortcutInvocation {
            user_id: "U1".to_owned(),
            trigger_id: "T123".to_owned(),
        })
    }

    fn submission_payload() -> CallbackPayload {
        CallbackPayload::ViewSubmission(ModalSubmission {
            sender_id: "U1".to_owned(),
            recipient_id: "U2".to_owned(),
            message_text: "hi".to_owned(),
        })
    }

    #[tokio::test]
    async fn shortcut_acknowledges_before_opening_modal() {
        let ops: OpLog = Arc::new(Mutex::new(Vec::new()));
        let client = Arc::new(ScriptedClient::new(ops.clone()));
        let handler = ShortcutHandler::new(client);

        let outcome = handler
            .handle(&shortcut_payload(), &EventContext::default(), &RecordingAck { ops: ops.clone() })
            .await
            .expect("handle");

        assert_eq!(outcome, HandlerOutcome::Processed);
        assert_eq!(*ops.lock().unwrap(), vec!["ack".to_owned(), "open_view:T123".to_owned()]);
    }

    #[tokio::test]
    async fn shortcut_swallows_modal_open_failure() {
        let ops: OpLog = Arc::new(Mutex::new(Vec::new()));
        let mut client = ScriptedClient::new(ops.clone());
        client.fail_open_view = true;
        let handler = ShortcutHandler::new(Arc::new(client));

        let outcome = handler
            .handle(&shortcut_payload(), &EventContext::default(), &RecordingAck { ops })
            .await
            .expect("handle");

        assert_eq!(outcome, HandlerOutcome::Processed);
    }

    #[tokio::test]
    async fn submission_delivers_then_confirms() {
        let ops: OpLog = Arc::new(Mutex::new(Vec::new()));
        let client = Arc::new(ScriptedClient::new(ops.clone()));
        let handler = SubmissionHandler::new(client);

        let outcome = handler
            .handle(&submission_payload(), &EventContext::default(), &RecordingAck { ops: ops.clone() })
            .await
            .expect("handle");

        assert_eq!(outcome, HandlerOutcome::Delivery(DeliveryOutcome::Delivered));
        assert_eq!(
            *ops.lock().unwrap(),
            vec![
                "ack".to_owned(),
                "post:U2:hi".to_owned(),
                "post:U1:Your message has been sent to <@U2>.".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn recipient_failure_notifies_sender_once() {
        let ops: OpLog = Arc::new(Mutex::new(Vec::new()));
        let mut client = ScriptedClient::new(ops.clone());
        client.failing_channels.push("U2".to_owned());
        let handler = SubmissionHandler::new(Arc::new(client));

        let outcome = handler
            .handle(&submission_payload(), &EventContext::default(), &RecordingAck { ops: ops.clone() })
            .await
            .expect("handle");

        assert_eq!(outcome, HandlerOutcome::Delivery(DeliveryOutcome::Failed));
        assert_eq!(
            *ops.lock().unwrap(),
            vec![
                "ack".to_owned(),
                "post:U2:hi".to_owned(),
                format!("post:U1:{FAILURE_NOTICE}"),
            ]
        );
    }

    #[tokio::test]
    async fn confirmation_failure_is_partial_and_notifies_sender() {
        let ops: OpLog = Arc::new(Mutex::new(Vec::new()));
        let mut client = ScriptedClient::new(ops.clone());
        // The sender channel fails, so both the confirmation and the failure
        // notice to U1 error out; the handler must not escalate either.
        client.failing_channels.push("U1".to_owned());
        let handler = SubmissionHandler::new(Arc::new(client));

        let outcome = handler
            .handle(&submission_payload(), &EventContext::default(), &RecordingAck { ops: ops.clone() })
            .await
            .expect("handle");

        assert_eq!(outcome, HandlerOutcome::Delivery(DeliveryOutcome::PartialFailure));
        assert_eq!(
            *ops.lock().unwrap(),
            vec![
                "ack".to_owned(),
                "post:U2:hi".to_owned(),
                "post:U1:Your message has been sent to <@U2>.".to_owned(),
                format!("post:U1:{FAILURE_NOTICE}"),
            ]
        );
    }

    #[tokio::test]
    async fn handlers_ignore_foreign_payloads() {
        let ops: OpLog = Arc::new(Mutex::new(Vec::new()));
        let client = Arc::new(ScriptedClient::new(ops.clone()));
        let handler = SubmissionHandler::new(client);

        let outcome = handler
            .handle(&shortcut_payload(), &EventContext::default(), &RecordingAck { ops: ops.clone() })
            .await
            .expect("handle");

        assert_eq!(outcome, HandlerOutcome::Ignored);
        assert!(ops.lock().unwrap().is_empty(), "ignored payloads must not be acknowledged here");
    }
}
