//! Chat webhook notifier.
//!
//! Alerts are plain text wrapped in a fixed code block and POSTed as
//! `{"content": ...}` JSON. One POST per alert, no retries, no rate
//! limiting; a failed delivery is simply reported to the caller.

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook returned HTTP {status}")]
    Http { status: u16 },

    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct WebhookBody<'a> {
    content: &'a str,
}

/// Wrap a message in the code-block delimiters the chat service renders.
fn code_block(message: &str) -> String {
    format!("```\n{}\n```", message)
}

/// Truncate an error message at its first line break. Multi-line errors
/// (stack traces, wrapped causes) alert with only their head line.
pub fn first_line(message: &str) -> &str {
    match message.split_once('\n') {
        Some((head, _)) => head,
        None => message,
    }
}

pub struct Notifier {
    client: Client,
    webhook_url: String,
}

impl Notifier {
    pub fn new(client: Client, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }

    pub async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let content = code_block(message);
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&WebhookBody { content: &content })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Http {
                status: status.as_u16(),
            });
        }
        debug!(url = %self.webhook_url, "notification delivered");
        Ok(())
    }
}
