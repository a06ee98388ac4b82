//! Transactional email delivery.
//!
//! - **Models**: [`Email`]
//! - **Providers**: [`SmtpProvider`] (lettre) and [`MockSmtpProvider`] behind [`EmailProvider`]
//! - **Mailer**: [`Mailer`] sends an HTML message with a derived plain-text part and
//!   reports success as a `bool`, logging failures instead of returning them
//! - **Templates**: Handlebars-based [`TemplateEngine`]
//!
//! ```ignore
//! use email::{Mailer, SmtpConfig, SmtpProvider};
//! use core_config::FromEnv;
//!
//! let provider = SmtpProvider::new(SmtpConfig::from_env()?)?;
//! let mailer = Mailer::new(std::sync::Arc::new(provider));
//! let delivered = mailer.send("alice@example.com", "Hello", "<p>Hi Alice</p>").await;
//! ```

pub mod error;
pub mod mailer;
pub mod models;
pub mod provider;
pub mod templates;

pub use error::{NotificationError, NotificationResult};
pub use mailer::{Mailer, html_to_text};
pub use models::Email;
pub use provider::{EmailProvider, MockSmtpProvider, SendResult, SmtpConfig, SmtpProvider, SmtpTls};
pub use templates::{EmailTemplate, RenderedTemplate, TemplateEngine};
