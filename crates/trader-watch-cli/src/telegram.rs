//! Telegram Bot API notifier.
//!
//! Delivery is best-effort: errors are logged and swallowed so a chat outage
//! never interrupts a scan.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use trader_watch::Notifier;

/// Default Bot API endpoint.
pub const TELEGRAM_API: &str = "https://api.telegram.org";

/// Telegram rejects text messages longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Telegram rejects captions longer than this many characters.
pub const MAX_CAPTION_CHARS: usize = 1024;

pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: &str) -> Self {
        Self::with_base_url(TELEGRAM_API, token, chat_id)
    }

    /// Point the notifier at a different Bot API host.
    pub fn with_base_url(base_url: &str, token: &str, chat_id: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token)
    }

    async fn send_form(&self, method: &str, form: Form) {
        let result = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await;
        log_delivery(method, result);
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, message: &str) {
        for chunk in split_message(message, MAX_MESSAGE_CHARS) {
            let result = self
                .client
                .get(self.method_url("sendMessage"))
                .query(&[("chat_id", self.chat_id.as_str()), ("text", chunk.as_str())])
                .send()
                .await;
            log_delivery("sendMessage", result);
        }
    }

    async fn send_document(&self, bytes: Vec<u8>, filename: &str, caption: &str) {
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", truncate_chars(caption, MAX_CAPTION_CHARS))
            .part("document", Part::bytes(bytes).file_name(filename.to_string()));
        self.send_form("sendDocument", form).await;
    }

    async fn send_image(&self, bytes: Vec<u8>, caption: &str) {
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", truncate_chars(caption, MAX_CAPTION_CHARS))
            .part("photo", Part::bytes(bytes).file_name("screenshot.png"));
        self.send_form("sendPhoto", form).await;
    }
}

fn log_delivery(method: &str, result: reqwest::Result<reqwest::Response>) {
    match result {
        Ok(resp) if resp.status().is_success() => {
            tracing::debug!("telegram {method} delivered");
        }
        Ok(resp) => tracing::error!("telegram {method} rejected: HTTP {}", resp.status()),
        Err(e) => tracing::error!("telegram {method} failed: {e}"),
    }
}

/// Split text into chunks of at most `max_chars` characters, preferring
/// line boundaries.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > max_chars {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
