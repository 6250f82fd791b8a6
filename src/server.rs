use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use teloxide::types::Update;
use tracing::{debug, error};

use crate::bot::BotHandler;
use crate::config::Config;
use crate::llm::{Completion, LlmClient};
use crate::platform::telegram::TelegramTransport;
use crate::platform::ChatTransport;

/// Builds the outbound clients used while handling one request.
pub trait ServiceFactory: Send + Sync {
    fn completion(&self, config: &Config) -> Arc<dyn Completion>;
    fn transport(&self, config: &Config) -> Arc<dyn ChatTransport>;
}

/// Production clients: the chat-completion API and the Telegram Bot API.
pub struct TelegramServices;

impl ServiceFactory for TelegramServices {
    fn completion(&self, config: &Config) -> Arc<dyn Completion> {
        Arc::new(LlmClient::new(config.llm.clone()))
    }

    fn transport(&self, config: &Config) -> Arc<dyn ChatTransport> {
        Arc::new(TelegramTransport::new(&config.telegram.bot_token))
    }
}

pub struct AppState {
    pub config: Config,
    pub services: Arc<dyn ServiceFactory>,
}

impl AppState {
    pub fn new(config: Config, services: Arc<dyn ServiceFactory>) -> Self {
        Self { config, services }
    }
}

/// Failure while handling a webhook request; logged and answered with a 500.
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Webhook request failed: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handle_update).fallback(not_found))
        .fallback(not_found)
        .with_state(state)
}

async fn handle_update(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let update: Update =
        serde_json::from_slice(&body).context("Failed to parse Telegram update")?;
    debug!("Received update {}", update.id.0);

    let handler = BotHandler::new(
        state.services.completion(&state.config),
        state.services.transport(&state.config),
        &state.config.telegram,
        StdRng::from_entropy(),
    );
    handler.handle(&update).await?;

    Ok(Json(json!({ "data": "Success" })))
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}
