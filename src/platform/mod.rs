pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::types::ChatId;

/// A clickable button attached to a reply, bound to a callback action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub action: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: action.into(),
        }
    }
}

/// A command shown in the platform's command menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    pub command: &'static str,
    pub description: &'static str,
}

/// Outbound calls to the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a text reply; `buttons` are laid out in a single row.
    async fn send_text(&self, chat: ChatId, text: &str, buttons: &[InlineButton]) -> Result<()>;

    async fn send_contact(&self, chat: ChatId, phone: &str, name: &str) -> Result<()>;

    async fn send_sticker(&self, chat: ChatId, file_id: &str) -> Result<()>;

    async fn register_commands(&self, commands: &[CommandInfo]) -> Result<()>;

    async fn set_webhook(&self, url: &str) -> Result<()>;
}
