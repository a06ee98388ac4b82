//! Fire-and-report email sending.

use crate::{models::Email, provider::EmailProvider};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{error, info};

static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n+").unwrap());

/// Derive a plain-text alternative from an HTML body.
pub fn html_to_text(html: &str) -> String {
    let text = TAGS.replace_all(html, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&#x3D;", "=");
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    BLANK_RUNS.replace_all(lines.join("\n").trim(), "\n\n").into_owned()
}

/// Sends account emails through an [`EmailProvider`].
///
/// Delivery failures never propagate: callers get `false` and the failure is logged.
#[derive(Clone)]
pub struct Mailer {
    provider: Arc<dyn EmailProvider>,
}

impl Mailer {
    pub fn new(provider: Arc<dyn EmailProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn health_check(&self) -> eyre::Result<()> {
        self.provider.health_check().await
    }

    /// Send `html` to `to`, with a plain-text part derived from it.
    pub async fn send(&self, to: &str, subject: &str, html: &str) -> bool {
        let email = Email::new(to, subject)
            .with_text(html_to_text(html))
            .with_html(html);

        match self.provider.send(&email).await {
            Ok(result) => {
                info!(
                    email_id = %email.id,
                    message_id = %result.message_id,
                    provider = self.provider.name(),
                    %to,
                    %subject,
                    "Email sent"
                );
                true
            }
            Err(e) => {
                error!(
                    email_id = %email.id,
                    provider = self.provider.name(),
                    %to,
                    %subject,
                    error = %e,
                    "Email delivery failed"
                );
                false
            }
        }
    }
}
