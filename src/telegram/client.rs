use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{ChatId, ParseMode, Reply};
use crate::config::BotConfig;
use crate::{BotError, Result};

/// Minimal Telegram Bot API client
pub struct TelegramClient {
    client: Client,
    api_base_url: String,
    token: String,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: ChatId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<ParseMode>,
}

#[derive(Debug, Serialize)]
struct SetWebhookRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramClient {
    pub fn new(config: &BotConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| BotError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base_url: config.telegram.api_base_url.clone(),
            token: config.telegram.token.clone(),
        })
    }

    /// Constant-time comparison against the configured token
    #[must_use]
    pub fn token_matches(&self, candidate: &str) -> bool {
        let expected = self.token.as_bytes();
        let candidate = candidate.as_bytes();
        expected.len() == candidate.len()
            && expected
                .iter()
                .zip(candidate)
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }

    #[instrument(skip(self, reply), fields(len = reply.text.len()))]
    pub async fn send_message(&self, chat_id: ChatId, reply: &Reply) -> Result<()> {
        let body = SendMessageRequest {
            chat_id,
            text: &reply.text,
            parse_mode: reply.parse_mode,
        };
        self.call("sendMessage", &body).await?;
        debug!("Message delivered");
        Ok(())
    }

    /// Point Telegram at `url`. `Ok(false)` means the API refused it.
    #[instrument(skip(self))]
    pub async fn set_webhook(&self, url: &str) -> Result<bool> {
        match self.call("setWebhook", &SetWebhookRequest { url }).await {
            Ok(()) => Ok(true),
            Err(BotError::Telegram { message }) => {
                warn!("setWebhook refused: {}", message);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn call<B: Serialize>(&self, method: &str, body: &B) -> Result<()> {
        // The token is part of the path, so it must never reach logs or errors
        let url = format!("{}/bot{}/{}", self.api_base_url, self.token, method);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| BotError::from(e.without_url()))?;

        let status = response.status();
        let api: ApiResponse = response
            .json()
            .await
            .map_err(|e| BotError::from(e.without_url()))?;

        if api.ok {
            Ok(())
        } else {
            Err(BotError::telegram(format!(
                "{method} failed with {status}: {}",
                api.description.unwrap_or_default()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::State, routing::post};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    fn config(api_base_url: String) -> BotConfig {
        let vars = [
            ("BOT_TOKEN", "123:abc".to_string()),
            ("WEATHER_TOKEN", "key".to_string()),
            ("WEBHOOK_URL", "https://bot.example.com/".to_string()),
            ("TELEGRAM_API_BASE_URL", api_base_url),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        BotConfig::from_map(vars).unwrap()
    }

    async fn spawn_api(accept_webhook: bool) -> (String, Arc<Mutex<Vec<Value>>>) {
        let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
        let router = Router::new()
            .route(
                "/bot123:abc/sendMessage",
                post(
                    |State(seen): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                        seen.lock().unwrap().push(body);
                        Json(json!({ "ok": true, "result": {} }))
                    },
                ),
            )
            .route(
                "/bot123:abc/setWebhook",
                post(move || async move {
                    if accept_webhook {
                        Json(json!({ "ok": true, "result": true }))
                    } else {
                        Json(json!({ "ok": false, "description": "bad webhook" }))
                    }
                }),
            )
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{addr}"), seen)
    }

    #[tokio::test]
    async fn test_send_message_body() {
        let (base, seen) = spawn_api(true).await;
        let client = TelegramClient::new(&config(base)).unwrap();

        client
            .send_message(99, &Reply::markdown("*hi*"))
            .await
            .unwrap();
        client.send_message(99, &Reply::plain("plain")).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen[0],
            json!({ "chat_id": 99, "text": "*hi*", "parse_mode": "Markdown" })
        );
        assert_eq!(seen[1], json!({ "chat_id": 99, "text": "plain" }));
    }

    #[tokio::test]
    async fn test_set_webhook_outcomes() {
        let (base, _) = spawn_api(true).await;
        let client = TelegramClient::new(&config(base)).unwrap();
        assert!(client.set_webhook("https://bot.example.com/123:abc").await.unwrap());

        let (base, _) = spawn_api(false).await;
        let client = TelegramClient::new(&config(base)).unwrap();
        assert!(!client.set_webhook("https://bot.example.com/123:abc").await.unwrap());
    }

    #[test]
    fn test_token_matches() {
        let client = TelegramClient::new(&config("http://127.0.0.1:1".into())).unwrap();
        assert!(client.token_matches("123:abc"));
        assert!(!client.token_matches("123:abd"));
        assert!(!client.token_matches("123"));
    }
}
