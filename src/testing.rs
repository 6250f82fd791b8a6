//! Recording stand-ins for the completion API and the chat platform.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use teloxide::types::ChatId;

use crate::config::Config;
use crate::llm::Completion;
use crate::platform::{ChatTransport, CommandInfo, InlineButton};
use crate::server::ServiceFactory;

/// One outbound call recorded by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        chat: ChatId,
        text: String,
        buttons: Vec<InlineButton>,
    },
    Contact {
        chat: ChatId,
        phone: String,
        name: String,
    },
    Sticker {
        chat: ChatId,
        file_id: String,
    },
}

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    commands: Mutex<Vec<CommandInfo>>,
    webhooks: Mutex<Vec<String>>,
    /// Fail every `send_text` whose text equals this value.
    fail_text: Option<String>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(text: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_text: Some(text.to_string()),
            ..Self::default()
        })
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<CommandInfo> {
        self.commands.lock().unwrap().clone()
    }

    pub fn webhooks(&self) -> Vec<String> {
        self.webhooks.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat: ChatId, text: &str, buttons: &[InlineButton]) -> Result<()> {
        if self.fail_text.as_deref() == Some(text) {
            anyhow::bail!("send rejected");
        }
        self.sent.lock().unwrap().push(Sent::Text {
            chat,
            text: text.to_string(),
            buttons: buttons.to_vec(),
        });
        Ok(())
    }

    async fn send_contact(&self, chat: ChatId, phone: &str, name: &str) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Contact {
            chat,
            phone: phone.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }

    async fn send_sticker(&self, chat: ChatId, file_id: &str) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Sticker {
            chat,
            file_id: file_id.to_string(),
        });
        Ok(())
    }

    async fn register_commands(&self, commands: &[CommandInfo]) -> Result<()> {
        self.commands.lock().unwrap().extend_from_slice(commands);
        Ok(())
    }

    async fn set_webhook(&self, url: &str) -> Result<()> {
        self.webhooks.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Completion stub: answers with a fixed value, or fails when `reply` is `Err`.
pub struct StubCompletion {
    reply: Result<Option<String>, String>,
    prompts: Mutex<Vec<String>>,
}

impl StubCompletion {
    pub fn answering(text: &str) -> Arc<Self> {
        Self::with(Ok(Some(text.to_string())))
    }

    pub fn empty() -> Arc<Self> {
        Self::with(Ok(None))
    }

    pub fn failing() -> Arc<Self> {
        Self::with(Err("provider unavailable".to_string()))
    }

    fn with(reply: Result<Option<String>, String>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completion for StubCompletion {
    async fn complete(&self, prompt: &str) -> Result<Option<String>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(anyhow::Error::msg)
    }
}

/// Hands out the same recording doubles for every request.
pub struct StubServices {
    pub completion: Arc<StubCompletion>,
    pub transport: Arc<RecordingTransport>,
}

impl ServiceFactory for StubServices {
    fn completion(&self, _config: &Config) -> Arc<dyn Completion> {
        self.completion.clone()
    }

    fn transport(&self, _config: &Config) -> Arc<dyn ChatTransport> {
        self.transport.clone()
    }
}
