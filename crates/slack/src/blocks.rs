//! Block Kit view construction.
//!
//! Only the pieces the compose modal needs are modeled; everything
//! serializes straight to the Slack wire shape.

use serde::Serialize;

use crate::events::{
    MESSAGE_INPUT_ACTION, MESSAGE_INPUT_BLOCK, SEND_MESSAGE_MODAL, USER_SELECT_ACTION,
    USER_SELECT_BLOCK,
};

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    PlainText { text: String },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputElement {
    UsersSelect {
        action_id: String,
    },
    PlainTextInput {
        action_id: String,
        multiline: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
    },
}

impl InputElement {
    pub fn users_select(action_id: impl Into<String>) -> Self {
        Self::UsersSelect { action_id: action_id.into() }
    }

    pub fn plain_text_input(action_id: impl Into<String>, multiline: bool) -> Self {
        Self::PlainTextInput { action_id: action_id.into(), multiline, placeholder: None }
    }

    pub fn placeholder(self, text: impl Into<String>) -> Self {
        match self {
            Self::PlainTextInput { action_id, multiline, .. } => Self::PlainTextInput {
                action_id,
                multiline,
                placeholder: Some(TextObject::plain(text)),
            },
            other => other,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Input { block_id: String, label: TextObject, element: InputElement },
}

/// A modal view as `views.open` expects it.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ModalView {
    #[serde(rename = "type")]
    pub view_type: &'static str,
    pub callback_id: String,
    pub title: TextObject,
    pub submit: TextObject,
    pub close: TextObject,
    pub blocks: Vec<Block>,
}

pub struct ViewBuilder {
    callback_id: String,
    title: TextObject,
    submit: TextObject,
    close: TextObject,
    blocks: Vec<Block>,
}

impl ViewBuilder {
    pub fn modal(callback_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            callback_id: callback_id.into(),
            title: TextObject::plain(title),
            submit: TextObject::plain("Submit"),
            close: TextObject::plain("Cancel"),
            blocks: Vec::new(),
        }
    }

    pub fn input(
        mut self,
        block_id: impl Into<String>,
        label: impl Into<String>,
        element: InputElement,
    ) -> Self {
        self.blocks.push(Block::Input {
            block_id: block_id.into(),
            label: TextObject::plain(label),
            element,
        });
        self
    }

    pub fn build(self) -> ModalView {
        ModalView {
            view_type: "modal",
            callback_id: self.callback_id,
            title: self.title,
            submit: self.submit,
            close: self.close,
            blocks: self.blocks,
        }
    }
}

/// The two-field compose modal the shortcut opens: a recipient picker and a
/// multiline message body.
pub fn send_message_modal() -> ModalView {
    ViewBuilder::modal(SEND_MESSAGE_MODAL, "Send a Message")
        .input(
            USER_SELECT_BLOCK,
            "Select a user",
            InputElement::users_select(USER_SELECT_ACTION),
        )
        .input(
            MESSAGE_INPUT_BLOCK,
            "Message",
            InputElement::plain_text_input(MESSAGE_INPUT_ACTION, true)
                .placeholder("Write something... (Markdown supported)"),
        )
        .build()
}
