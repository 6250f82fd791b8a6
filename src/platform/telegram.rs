use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile};
use tracing::debug;

use super::{ChatTransport, CommandInfo, InlineButton};

/// Telegram counts its 4096 limit in characters; leave some headroom.
const MESSAGE_LIMIT: usize = 4000;

/// Split `text` into chunks of at most `max_chars` characters, preferring to
/// break after a newline, then after a space.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    loop {
        let end = match rest.char_indices().nth(max_chars) {
            Some((idx, _)) => idx,
            None => {
                chunks.push(rest.to_string());
                return chunks;
            }
        };
        let cut = rest[..end]
            .rfind('\n')
            .or_else(|| rest[..end].rfind(' '))
            .map(|pos| pos + 1)
            .unwrap_or(end);

        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
        if rest.is_empty() {
            return chunks;
        }
    }
}

/// Chunks to send, each with the markup it carries. Buttons go under the last chunk.
fn plan_chunks(text: &str, buttons: &[InlineButton]) -> Vec<(String, Option<InlineKeyboardMarkup>)> {
    let mut planned: Vec<_> = split_message(text, MESSAGE_LIMIT)
        .into_iter()
        .map(|chunk| (chunk, None))
        .collect();
    if !buttons.is_empty() {
        if let Some(last) = planned.last_mut() {
            last.1 = Some(keyboard(buttons));
        }
    }
    planned
}

fn keyboard(buttons: &[InlineButton]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![buttons
        .iter()
        .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.action.clone()))
        .collect::<Vec<_>>()])
}

/// [`ChatTransport`] backed by the Telegram Bot API.
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(token: &str) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat: ChatId, text: &str, buttons: &[InlineButton]) -> Result<()> {
        for (chunk, markup) in plan_chunks(text, buttons) {
            debug!(
                "Sending message to chat {} ({} chars)",
                chat.0,
                chunk.chars().count()
            );
            let request = self.bot.send_message(chat, chunk);
            let sent = match markup {
                Some(markup) => request.reply_markup(markup).await,
                None => request.await,
            };
            sent.with_context(|| format!("Failed to send message to chat {}", chat.0))?;
        }
        Ok(())
    }

    async fn send_contact(&self, chat: ChatId, phone: &str, name: &str) -> Result<()> {
        debug!("Sending contact {} to chat {}", name, chat.0);
        self.bot
            .send_contact(chat, phone, name)
            .await
            .with_context(|| format!("Failed to send contact to chat {}", chat.0))?;
        Ok(())
    }

    async fn send_sticker(&self, chat: ChatId, file_id: &str) -> Result<()> {
        debug!("Sending sticker to chat {}", chat.0);
        self.bot
            .send_sticker(chat, InputFile::file_id(FileId(file_id.to_string())))
            .await
            .with_context(|| format!("Failed to send sticker to chat {}", chat.0))?;
        Ok(())
    }

    async fn register_commands(&self, commands: &[CommandInfo]) -> Result<()> {
        let commands = commands
            .iter()
            .map(|c| BotCommand::new(c.command, c.description));
        self.bot
            .set_my_commands(commands)
            .await
            .context("Failed to register bot commands")?;
        Ok(())
    }

    async fn set_webhook(&self, url: &str) -> Result<()> {
        let url = reqwest::Url::parse(url)
            .with_context(|| format!("Invalid webhook URL: {}", url))?;
        self.bot
            .set_webhook(url)
            .await
            .context("Failed to register webhook")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_is_one_chunk() {
        assert_eq!(split_message("hello", 4000), vec!["hello".to_string()]);
    }

    #[test]
    fn test_split_prefers_newlines() {
        let text = format!("{}\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = split_message(&text, 40);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], format!("{}\n", "a".repeat(30)));
        assert_eq!(chunks[1], "b".repeat(30));
    }

    #[test]
    fn test_split_counts_characters_not_bytes() {
        // Cyrillic letters are two bytes each.
        let text = "ж".repeat(25);
        let chunks = split_message(&text, 11);
        let sizes: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(sizes, vec![11, 11, 3]);
        assert_eq!(chunks.concat(), text);

        let long_reply = "ж".repeat(MESSAGE_LIMIT);
        assert_eq!(split_message(&long_reply, MESSAGE_LIMIT).len(), 1);
    }

    #[test]
    fn test_buttons_only_on_last_chunk() {
        let text = "слово ".repeat(MESSAGE_LIMIT / 2);
        let buttons = [
            InlineButton::new("Запись на разбор", "signup"),
            InlineButton::new("Полезный рецепт", "recipe"),
        ];

        let planned = plan_chunks(&text, &buttons);
        assert!(planned.len() > 2);
        let (last, rest) = planned.split_last().unwrap();
        assert!(rest.iter().all(|(_, markup)| markup.is_none()));
        let markup = last.1.as_ref().unwrap();
        assert_eq!(markup.inline_keyboard[0].len(), 2);
        assert!(planned
            .iter()
            .all(|(chunk, _)| chunk.chars().count() <= MESSAGE_LIMIT));
        assert_eq!(
            planned.iter().map(|(c, _)| c.as_str()).collect::<String>(),
            text
        );
    }

    #[test]
    fn test_no_markup_without_buttons() {
        let text = "a".repeat(MESSAGE_LIMIT * 2 + 1);
        let planned = plan_chunks(&text, &[]);
        assert_eq!(planned.len(), 3);
        assert!(planned.iter().all(|(_, markup)| markup.is_none()));

        let short = plan_chunks("Салат", &[InlineButton::new("Запись на разбор", "signup")]);
        assert_eq!(short.len(), 1);
        assert!(short[0].1.is_some());
    }

    #[test]
    fn test_keyboard_is_a_single_row() {
        let markup = keyboard(&[
            InlineButton::new("Запись на разбор", "signup"),
            InlineButton::new("Полезный рецепт", "recipe"),
        ]);
        assert_eq!(markup.inline_keyboard.len(), 1);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
        assert_eq!(markup.inline_keyboard[0][1].text, "Полезный рецепт");
    }
}
