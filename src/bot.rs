use std::sync::{Arc, Mutex};

use anyhow::Result;
use lazy_static::lazy_static;
use rand::rngs::StdRng;
use regex::Regex;
use teloxide::types::{CallbackQuery, ChatId, Message, Update, UpdateKind};
use tracing::{debug, error, info};

use crate::config::TelegramConfig;
use crate::llm::Completion;
use crate::platform::{ChatTransport, CommandInfo, InlineButton};
use crate::prompts;

pub const RECIPE_FALLBACK: &str = "Сегодня рецептов нет 😔";
pub const ADVICE_EMPTY: &str = "Не могу помочь";
pub const ADVICE_FALLBACK: &str = "Не могу помочь или произошла ошибка";
pub const SIGNUP_TEXT: &str = "Запись на разбор осуществляется посредством личных сообщений";
pub const CONTACT_PHONE: &str = "+79115291121";
pub const CONTACT_NAME: &str = "Дарья Двойнишникова";

const SIGNUP_ACTION: &str = "signup";
const RECIPE_ACTION: &str = "recipe";

/// Commands advertised in the Telegram menu.
pub const COMMANDS: [CommandInfo; 2] = [
    CommandInfo {
        command: "start",
        description: "Запуск бота 🤖",
    },
    CommandInfo {
        command: "recipe",
        description: "Полезный рецепт 🥙",
    },
];

lazy_static! {
    static ref GREETING: Regex = Regex::new(r"(?i)прив|здравст").unwrap();
}

fn greeting_text(first_name: &str) -> String {
    format!(
        "Привет {first_name}! \n\
         Я бот-помощник по питанию! 🫐\n\
         Опиши подробно свой запрос и что ты хочешь получить в результате работы с нутрициологом, \
         и я постараюсь помочь тебе! 🍏"
    )
}

fn signup_button() -> InlineButton {
    InlineButton::new("Запись на разбор", SIGNUP_ACTION)
}

fn recipe_button() -> InlineButton {
    InlineButton::new("Полезный рецепт", RECIPE_ACTION)
}

/// Name of the bot command `text` starts with, e.g. `recipe` for `/recipe@nutribot now`.
///
/// A command addressed to another bot (`/recipe@otherbot`) is not ours. Without a
/// configured username every addressed command is treated that way.
fn command_name<'a>(text: &'a str, bot_username: Option<&str>) -> Option<&'a str> {
    let token = text.split_whitespace().next()?.strip_prefix('/')?;
    let name = match token.split_once('@') {
        Some((name, addressee)) => {
            let ours = bot_username
                .map(|u| u.trim_start_matches('@'))
                .is_some_and(|u| u.eq_ignore_ascii_case(addressee));
            if !ours {
                return None;
            }
            name
        }
        None => token,
    };
    (!name.is_empty()).then_some(name)
}

/// What the bot reacts to in an incoming update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start { chat: ChatId, first_name: String },
    Greeting { chat: ChatId },
    Recipe { chat: ChatId },
    Signup { chat: ChatId },
    FreeText { chat: ChatId, text: String },
}

impl Event {
    /// `bot_username` decides which `/command@name` forms are addressed to us.
    pub fn from_update(update: &Update, bot_username: Option<&str>) -> Option<Event> {
        match &update.kind {
            UpdateKind::Message(msg) => Self::from_message(msg, bot_username),
            UpdateKind::CallbackQuery(query) => Self::from_callback(query),
            _ => None,
        }
    }

    fn from_message(msg: &Message, bot_username: Option<&str>) -> Option<Event> {
        let text = msg.text()?;
        let chat = msg.chat.id;
        let command = command_name(text, bot_username);

        if command == Some("start") {
            let first_name = msg
                .from
                .as_ref()
                .map(|user| user.first_name.clone())
                .unwrap_or_default();
            return Some(Event::Start { chat, first_name });
        }
        if GREETING.is_match(text) {
            return Some(Event::Greeting { chat });
        }
        if command == Some(RECIPE_ACTION) {
            return Some(Event::Recipe { chat });
        }
        Some(Event::FreeText {
            chat,
            text: text.trim().to_string(),
        })
    }

    fn from_callback(query: &CallbackQuery) -> Option<Event> {
        let chat = query
            .message
            .as_ref()
            .map(|msg| msg.chat().id)
            .unwrap_or(ChatId(query.from.id.0 as i64));

        match query.data.as_deref()? {
            SIGNUP_ACTION => Some(Event::Signup { chat }),
            RECIPE_ACTION => Some(Event::Recipe { chat }),
            _ => None,
        }
    }
}

/// Reacts to one update. Built fresh for every webhook request.
pub struct BotHandler {
    completion: Arc<dyn Completion>,
    transport: Arc<dyn ChatTransport>,
    sticker_file_id: String,
    bot_username: Option<String>,
    /// Picks the recipe cuisine.
    rng: Mutex<StdRng>,
}

impl BotHandler {
    pub fn new(
        completion: Arc<dyn Completion>,
        transport: Arc<dyn ChatTransport>,
        telegram: &TelegramConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            completion,
            transport,
            sticker_file_id: telegram.sticker_file_id.clone(),
            bot_username: telegram.bot_username.clone(),
            rng: Mutex::new(rng),
        }
    }

    fn recipe_prompt(&self) -> String {
        // StdRng state stays valid even if a holder panicked.
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        prompts::recipe_prompt(&mut *rng)
    }

    /// Completion failures become fallback replies; only a failed delivery of a
    /// static or fallback reply is returned as an error.
    pub async fn handle(&self, update: &Update) -> Result<()> {
        match Event::from_update(update, self.bot_username.as_deref()) {
            Some(event) => self.handle_event(event).await,
            None => {
                debug!("Ignoring update {}", update.id.0);
                Ok(())
            }
        }
    }

    pub async fn handle_event(&self, event: Event) -> Result<()> {
        match event {
            Event::Start { chat, first_name } => {
                info!("Start from {} in chat {}", first_name, chat.0);
                self.transport
                    .send_text(chat, &greeting_text(&first_name), &[])
                    .await
            }
            Event::Greeting { chat } => {
                self.transport
                    .send_sticker(chat, &self.sticker_file_id)
                    .await
            }
            Event::Recipe { chat } => {
                info!("Recipe requested in chat {}", chat.0);
                let prompt = self.recipe_prompt();
                let buttons = [signup_button()];
                if let Err(e) = self
                    .reply_with_completion(chat, &prompt, RECIPE_FALLBACK, &buttons)
                    .await
                {
                    error!("Recipe reply failed: {:#}", e);
                    self.transport.send_text(chat, RECIPE_FALLBACK, &[]).await?;
                }
                Ok(())
            }
            Event::Signup { chat } => {
                info!("Signup requested in chat {}", chat.0);
                self.transport.send_text(chat, SIGNUP_TEXT, &[]).await?;
                self.transport
                    .send_contact(chat, CONTACT_PHONE, CONTACT_NAME)
                    .await
            }
            Event::FreeText { chat, text } => {
                info!("Question in chat {}: {}", chat.0, text);
                let prompt = prompts::recommendation_prompt(&text);
                let buttons = [signup_button(), recipe_button()];
                if let Err(e) = self
                    .reply_with_completion(chat, &prompt, ADVICE_EMPTY, &buttons)
                    .await
                {
                    error!("Advice reply failed: {:#}", e);
                    self.transport.send_text(chat, ADVICE_FALLBACK, &[]).await?;
                }
                Ok(())
            }
        }
    }

    async fn reply_with_completion(
        &self,
        chat: ChatId,
        prompt: &str,
        empty_reply: &str,
        buttons: &[InlineButton],
    ) -> Result<()> {
        let text = self
            .completion
            .complete(prompt)
            .await?
            .unwrap_or_else(|| empty_reply.to_string());
        self.transport.send_text(chat, &text, buttons).await
    }
}
