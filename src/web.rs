use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{Path, Request, State},
    http::StatusCode,
    routing::{get, post},
};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::conversation::WeatherBot;
use crate::telegram::{TelegramClient, Update};
use crate::Result;

/// Shared state behind every route
pub struct AppState {
    pub bot: WeatherBot,
    pub telegram: TelegramClient,
    /// URL handed to Telegram by `/setwebhook`
    pub webhook_target: String,
    /// Held while an update is dispatched and its replies delivered, so
    /// updates are processed one at a time
    update_lock: Mutex<()>,
}

impl AppState {
    pub fn new(bot: WeatherBot, telegram: TelegramClient, webhook_target: String) -> Self {
        Self {
            bot,
            telegram,
            webhook_target,
            update_lock: Mutex::new(()),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    // The default span records the URI, which contains the bot token
    let trace = TraceLayer::new_for_http()
        .make_span_with(|request: &Request| tracing::info_span!("http", method = %request.method()));

    Router::new()
        .route("/setwebhook", get(set_webhook).post(set_webhook))
        .route("/{token}", post(receive_update))
        .layer(trace)
        .with_state(state)
}

pub async fn run(state: Arc<AppState>, port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Webhook listener running on port {}", port);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn receive_update(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    // Nothing about the body is revealed on a path that is not ours
    if !state.telegram.token_matches(&token) {
        tracing::warn!("Update posted to an unknown path");
        return (StatusCode::NOT_FOUND, "");
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!("Rejected undecodable update: {}", e);
            return (StatusCode::BAD_REQUEST, "");
        }
    };

    let Some(message) = update.message else {
        tracing::debug!(update_id = update.update_id, "Update without message ignored");
        return (StatusCode::OK, "!");
    };

    let _guard = state.update_lock.lock().await;
    let chat_id = message.chat.id;
    let replies = state
        .bot
        .handle_message(chat_id, message.text.as_deref())
        .await;

    for reply in &replies {
        if let Err(e) = state.telegram.send_message(chat_id, reply).await {
            tracing::warn!(chat_id, "Failed to deliver reply: {}", e);
        }
    }

    (StatusCode::OK, "!")
}

async fn set_webhook(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.telegram.set_webhook(&state.webhook_target).await {
        Ok(true) => {
            tracing::info!("Webhook registered");
            (StatusCode::OK, "Webhook set successfully!")
        }
        Ok(false) => (StatusCode::BAD_REQUEST, "Failed to set webhook!"),
        Err(e) => {
            tracing::error!("Webhook registration failed: {}", e);
            (StatusCode::BAD_REQUEST, "Failed to set webhook!")
        }
    }
}
