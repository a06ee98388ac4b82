//! SMTP email provider using lettre

use super::{EmailProvider, SendResult};
use crate::models::Email;
use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_or_default, env_required};
use eyre::{Result, WrapErr};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::str::FromStr;

/// How the SMTP connection is secured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmtpTls {
    /// TLS from the first byte (port 465)
    Implicit,
    /// Plain connection upgraded with STARTTLS
    StartTls,
    /// No TLS, for local catchers such as Mailpit
    None,
}

impl SmtpTls {
    fn for_port(port: u16) -> Self {
        if port == 465 { Self::Implicit } else { Self::StartTls }
    }
}

impl FromStr for SmtpTls {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "implicit" | "tls" => Ok(Self::Implicit),
            "starttls" => Ok(Self::StartTls),
            "none" | "off" => Ok(Self::None),
            other => Err(format!("unknown TLS mode '{}'", other)),
        }
    }
}

/// SMTP provider configuration
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Bare address or a full `Name <address>` mailbox
    pub from: String,
    /// Display name used when `from` is a bare address
    pub from_name: String,
    pub tls: SmtpTls,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .field("tls", &self.tls)
            .finish()
    }
}

/// Environment variables:
/// - `EMAIL_HOST`, `EMAIL_PORT`, `EMAIL_USER`, `EMAIL_PASS`, `EMAIL_FROM` (required)
/// - `EMAIL_FROM_NAME` (default: `EMP`)
/// - `EMAIL_TLS`: `implicit`, `starttls` or `none` (default: implicit on 465, STARTTLS otherwise)
impl FromEnv for SmtpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let port_raw = env_required("EMAIL_PORT")?;
        let port: u16 = port_raw.parse().map_err(|e| ConfigError::ParseError {
            key: "EMAIL_PORT".to_string(),
            details: format!("{}", e),
        })?;

        let tls = match std::env::var("EMAIL_TLS") {
            Ok(raw) => raw.parse().map_err(|details| ConfigError::ParseError {
                key: "EMAIL_TLS".to_string(),
                details,
            })?,
            Err(_) => SmtpTls::for_port(port),
        };

        Ok(Self {
            host: env_required("EMAIL_HOST")?,
            port,
            username: env_required("EMAIL_USER")?,
            password: env_required("EMAIL_PASS")?,
            from: env_required("EMAIL_FROM")?,
            from_name: env_or_default("EMAIL_FROM_NAME", "EMP"),
            tls,
        })
    }
}

impl SmtpConfig {
    fn sender(&self) -> Result<Mailbox> {
        let mut mailbox: Mailbox = self.from.parse().wrap_err("Invalid from address")?;
        if mailbox.name.is_none() && !self.from_name.is_empty() {
            mailbox.name = Some(self.from_name.clone());
        }
        Ok(mailbox)
    }
}

/// SMTP email provider
pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpProvider {
    pub fn new(config: SmtpConfig) -> Result<Self> {
        let builder = match config.tls {
            SmtpTls::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .wrap_err("Failed to create SMTP relay")?,
            SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .wrap_err("Failed to create STARTTLS relay")?,
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
        };

        let builder = if config.username.is_empty() {
            builder
        } else {
            builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
        };

        tracing::info!(host = %config.host, port = config.port, tls = ?config.tls, "SMTP provider configured");

        Ok(Self {
            transport: builder.port(config.port).build(),
            sender: config.sender()?,
        })
    }

    fn build_message(&self, email: &Email) -> Result<Message> {
        let to: Mailbox = email.to.parse().wrap_err("Invalid to address")?;
        let builder = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(&email.subject);

        let message = match (&email.body_text, &email.body_html) {
            (Some(text), Some(html)) => builder
                .multipart(MultiPart::alternative_plain_html(text.clone(), html.clone()))
                .wrap_err("Failed to build multipart message")?,
            (Some(text), None) => builder
                .singlepart(SinglePart::plain(text.clone()))
                .wrap_err("Failed to build text message")?,
            (None, Some(html)) => builder
                .header(ContentType::TEXT_HTML)
                .body(html.clone())
                .wrap_err("Failed to build HTML message")?,
            (None, None) => {
                return Err(eyre::eyre!("Email must have either text or HTML body"));
            }
        };

        Ok(message)
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &Email) -> Result<SendResult> {
        let message = self.build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .wrap_err("Failed to send email via SMTP")?;

        let message_id = response
            .message()
            .next()
            .map(|s| s.to_string())
            .unwrap_or_else(|| email.id.clone());

        Ok(SendResult { message_id })
    }

    async fn health_check(&self) -> Result<()> {
        let reachable = self
            .transport
            .test_connection()
            .await
            .wrap_err("SMTP health check failed")?;
        if !reachable {
            return Err(eyre::eyre!("SMTP server did not accept the connection"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [(&str, Option<&str>); 6] = [
        ("EMAIL_HOST", Some("smtp.example.com")),
        ("EMAIL_PORT", Some("465")),
        ("EMAIL_USER", Some("mailer")),
        ("EMAIL_PASS", Some("hunter2")),
        ("EMAIL_FROM", Some("noreply@example.com")),
        ("EMAIL_TLS", None),
    ];

    fn local_config() -> SmtpConfig {
        SmtpConfig {
            host: "localhost".to_string(),
            port: 1025,
            username: String::new(),
            password: String::new(),
            from: "noreply@example.com".to_string(),
            from_name: "EMP".to_string(),
            tls: SmtpTls::None,
        }
    }

    #[test]
    fn test_from_env_port_465_uses_implicit_tls() {
        temp_env::with_vars(VARS, || {
            let config = SmtpConfig::from_env().unwrap();
            assert_eq!(config.tls, SmtpTls::Implicit);
            assert_eq!(config.from_name, "EMP");
        });
    }

    #[test]
    fn test_from_env_other_port_uses_starttls() {
        temp_env::with_vars(VARS, || {
            temp_env::with_var("EMAIL_PORT", Some("587"), || {
                assert_eq!(SmtpConfig::from_env().unwrap().tls, SmtpTls::StartTls);
            });
        });
    }

    #[test]
    fn test_from_env_missing_credentials() {
        temp_env::with_vars(VARS, || {
            temp_env::with_var_unset("EMAIL_PASS", || {
                let err = SmtpConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("EMAIL_PASS"));
            });
        });
    }

    #[test]
    fn test_debug_redacts_password() {
        temp_env::with_vars(VARS, || {
            let rendered = format!("{:?}", SmtpConfig::from_env().unwrap());
            assert!(!rendered.contains("hunter2"));
        });
    }

    #[test]
    fn test_sender_keeps_explicit_display_name() {
        let mut config = local_config();
        config.from = "Shop Team <team@example.com>".to_string();
        assert_eq!(config.sender().unwrap().name.as_deref(), Some("Shop Team"));

        config.from = "team@example.com".to_string();
        assert_eq!(config.sender().unwrap().name.as_deref(), Some("EMP"));
    }

    #[tokio::test]
    async fn test_build_message_requires_a_body() {
        let provider = SmtpProvider::new(local_config()).unwrap();
        let email = Email::new("alice@example.com", "Empty");
        assert!(provider.build_message(&email).is_err());

        let email = email.with_text("hi").with_html("<p>hi</p>");
        assert!(provider.build_message(&email).is_ok());
    }
}
