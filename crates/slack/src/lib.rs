//! Slack Integration - shortcut-to-DM message relay
//!
//! This crate provides the Slack interface for courier:
//! - **Events** (`events`) - Callback classification and the dispatch table
//! - **Relay** (`relay`) - Shortcut and modal-submission handlers
//! - **Block Kit** (`blocks`) - The compose modal view
//! - **Client** (`client`) - `views.open` / `chat.postMessage` Web API calls
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Add a global shortcut with callback id `send_message_shortcut`
//! 3. Point Interactivity and Event Subscriptions at `/slack/events`
//! 4. Set env vars: `COURIER_SLACK_BOT_TOKEN`, `COURIER_SLACK_SIGNING_SECRET`
//!
//! # Architecture
//!
//! ```text
//! Slack Callbacks → CallbackDispatcher → Handlers → Web API
//!                         ↓
//!                   Block Kit modal
//! ```
//!
//! # Key Types
//!
//! - `CallbackDispatcher` - Routes classified callbacks to handlers
//! - `ShortcutHandler` / `SubmissionHandler` - The relay itself
//! - `ChatClient` - Trait over the outbound Slack surface

pub mod blocks;
pub mod client;
pub mod events;
pub mod relay;

pub use blocks::{send_message_modal, ModalView};
pub use client::{ChatClient, ClientError, SlackApiClient};
pub use events::{
    classify_callback, default_dispatcher, AckError, Acknowledger, CallbackDispatcher,
    CallbackHandler, CallbackKind, CallbackPayload, DispatchError, EventContext, HandlerOutcome,
    NoopAcknowledger, PayloadParseError,
};
pub use relay::{DeliveryOutcome, FAILURE_NOTICE};
