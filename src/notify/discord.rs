use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::{Notification, NotificationSink};
use crate::db::models::GameSnapshot;

/// Discord rejects message bodies longer than this.
const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Posts messages to a Discord channel through an incoming webhook.
#[derive(Clone)]
pub struct DiscordWebhook {
    http: Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(DiscordWebhook {
            http,
            url: url.to_string(),
        })
    }

    /// Post `content`, split over several messages if it is too long.
    pub async fn post_message(&self, content: &str) -> Result<()> {
        for chunk in split_content(content, MAX_CONTENT_CHARS) {
            let resp = self
                .http
                .post(&self.url)
                .json(&WebhookPayload { content: &chunk })
                .send()
                .await
                .context("Discord webhook request failed")?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!("Discord webhook error {}: {}", status, body);
            }
            debug!("Discord message posted ({} chars)", chunk.chars().count());
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for DiscordWebhook {
    async fn send(&self, notification: &Notification, context: &GameSnapshot) -> Result<()> {
        self.post_message(&notification.message(context)).await
    }
}

/// Split on line boundaries so each chunk stays under `limit` characters.
/// A single overlong line is hard-wrapped.
fn split_content(content: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in content.lines() {
        let mut line: Vec<char> = line.chars().collect();
        while line.len() > limit {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let rest = line.split_off(limit);
            chunks.push(line.into_iter().collect());
            line = rest;
        }
        let line: String = line.into_iter().collect();
        let needed =
            current.chars().count() + line.chars().count() + usize::from(!current.is_empty());
        if needed > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(&line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
