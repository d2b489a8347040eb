//! Discord webhook notifications (cargo feature `notify`).

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde_json::{Value as JsonValue, json};
use tracing::{info, warn};

use crate::error::NotifyError;
use crate::pipeline::{BatchReport, FileOutcome};

/// Embed color used by every message (Discord blue).
pub const EMBED_COLOR: u32 = 3_447_003;

const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscordMessage {
    pub content: String,
    /// When set, the message also carries an embed with this title.
    pub title: Option<String>,
    /// File produced alongside the message, named in the embed footer.
    pub attachment_name: Option<String>,
}

impl DiscordMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_attachment_name(mut self, name: impl Into<String>) -> Self {
        self.attachment_name = Some(name.into());
        self
    }

    /// Webhook JSON body, stamped with `at`.
    pub fn payload(&self, at: DateTime<Local>) -> JsonValue {
        let mut embeds = Vec::new();
        if let Some(title) = &self.title {
            let mut embed = json!({
                "title": title,
                "description": self.content,
                "color": EMBED_COLOR,
                "timestamp": at.to_rfc3339(),
            });
            if let Some(name) = &self.attachment_name {
                embed["footer"] = json!({ "text": format!("Generated file: {name}") });
            }
            embeds.push(embed);
        }
        json!({ "content": self.content, "embeds": embeds })
    }
}

#[derive(Debug, Clone)]
pub struct DiscordWebhook {
    url: String,
    client: reqwest::blocking::Client,
}

impl DiscordWebhook {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Post `message`. Any 2xx answer is a success.
    pub fn send(&self, message: &DiscordMessage) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&message.payload(Local::now()))
            .send()?;
        let status = response.status();
        if status.is_success() {
            info!(status = status.as_u16(), "discord message sent");
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        warn!(status = status.as_u16(), %body, "discord webhook rejected message");
        Err(NotifyError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// End-of-run message: counts plus one line per file.
pub fn summary_message(report: &BatchReport, report_path: Option<&Path>) -> DiscordMessage {
    let mut content = format!(
        "Data run {}: {} file(s), {} ingested, {} failed, {} rows.",
        report.run_date,
        report.files.len(),
        report.ingested_count(),
        report.failed_count(),
        report.total_rows(),
    );
    for file in &report.files {
        let line = match &file.outcome {
            FileOutcome::Ingested { result, .. } => format!(
                "\n- {}: {} rows, {} columns",
                file.name, result.row_count, result.column_count
            ),
            FileOutcome::Failed { error, .. } => format!("\n- {}: failed ({error})", file.name),
        };
        content.push_str(&line);
    }

    let mut message = DiscordMessage::new(content).with_title(format!("Data report {}", report.run_date));
    if let Some(name) = report_path.and_then(|p| p.file_name()) {
        message = message.with_attachment_name(name.to_string_lossy());
    }
    message
}
