//! Account emails: verification, seller pending/approved and password reset.

use email::{EmailTemplate, Mailer, TemplateEngine};
use serde_json::json;

use crate::config::AccountsConfig;
use crate::error::{UserError, UserResult};

pub const VERIFY_EMAIL: EmailTemplate = EmailTemplate {
    name: "verify_email",
    subject: "Verify Your Email",
    html: r#"<p>Hi {{name}},</p>
<p>Thanks for signing up. Please confirm your email address:</p>
<p><a href="{{link}}">Verify my email</a></p>
<p>If the button does not work, paste this link into your browser: {{link}}</p>"#,
};

pub const SELLER_PENDING: EmailTemplate = EmailTemplate {
    name: "seller_pending",
    subject: "Seller Registration",
    html: r#"<p>Hi {{name}},</p>
<p>Your seller account for <strong>{{business_name}}</strong> is pending admin approval.</p>
<p>We will email you once it has been reviewed.</p>"#,
};

pub const SELLER_APPROVED: EmailTemplate = EmailTemplate {
    name: "seller_approved",
    subject: "Account Approved",
    html: r#"<p>Hi {{name}},</p>
<p>Your seller account has been approved. Please verify your account within {{valid_days}} days:</p>
<p><a href="{{link}}">Verify my account</a></p>"#,
};

pub const PASSWORD_RESET: EmailTemplate = EmailTemplate {
    name: "password_reset",
    subject: "Reset Your Password",
    html: r#"<p>Hi {{name}},</p>
<p>We received a request to reset your password. The link expires in one hour:</p>
<p><a href="{{link}}">Reset my password</a></p>
<p>If you did not ask for this, you can ignore this email.</p>"#,
};

/// Renders account templates and delivers them through a [`Mailer`].
///
/// Every `send_*` reports delivery as a `bool`; callers decide whether a
/// failed send matters.
pub struct AccountMailer {
    mailer: Mailer,
    templates: TemplateEngine,
    frontend_url: String,
    base_url: String,
}

impl AccountMailer {
    pub fn new(mailer: Mailer, config: &AccountsConfig) -> UserResult<Self> {
        let templates = TemplateEngine::with_templates(&[
            VERIFY_EMAIL,
            SELLER_PENDING,
            SELLER_APPROVED,
            PASSWORD_RESET,
        ])
        .map_err(|e| UserError::Internal(e.to_string()))?;

        Ok(Self {
            mailer,
            templates,
            frontend_url: config.frontend_url.clone(),
            base_url: config.base_url.clone(),
        })
    }

    pub fn verification_link(&self, token: &str, email: &str) -> String {
        format!(
            "{}/verify-email?token={}&email={}",
            self.frontend_url,
            urlencoding::encode(token),
            urlencoding::encode(email)
        )
    }

    pub fn approval_link(&self, token: &str) -> String {
        format!(
            "{}/api/auth/verify-email?token={}",
            self.base_url,
            urlencoding::encode(token)
        )
    }

    pub fn reset_link(&self, token: &str) -> String {
        format!(
            "{}/reset-password?token={}",
            self.frontend_url,
            urlencoding::encode(token)
        )
    }

    pub async fn send_verification(&self, name: &str, email: &str, token: &str) -> bool {
        let link = self.verification_link(token, email);
        self.deliver(&VERIFY_EMAIL, email, json!({ "name": name, "link": link }))
            .await
    }

    pub async fn send_seller_pending(&self, name: &str, email: &str, business_name: &str) -> bool {
        self.deliver(
            &SELLER_PENDING,
            email,
            json!({ "name": name, "business_name": business_name }),
        )
        .await
    }

    pub async fn send_seller_approved(
        &self,
        name: &str,
        email: &str,
        token: &str,
        valid_days: i64,
    ) -> bool {
        let link = self.approval_link(token);
        self.deliver(
            &SELLER_APPROVED,
            email,
            json!({ "name": name, "link": link, "valid_days": valid_days }),
        )
        .await
    }

    pub async fn send_password_reset(&self, name: &str, email: &str, token: &str) -> bool {
        let link = self.reset_link(token);
        self.deliver(&PASSWORD_RESET, email, json!({ "name": name, "link": link }))
            .await
    }

    async fn deliver(&self, template: &EmailTemplate, to: &str, data: serde_json::Value) -> bool {
        match self.templates.render(template.name, &data) {
            Ok(rendered) => self.mailer.send(to, &rendered.subject, &rendered.html).await,
            Err(e) => {
                tracing::error!(template = template.name, error = %e, "Failed to render email");
                false
            }
        }
    }
}
