//! Handlebars email templates.
//!
//! Templates are registered in strict mode, so rendering with a missing
//! variable fails instead of producing an empty link.

use crate::error::NotificationResult;
use handlebars::Handlebars;
use serde::Serialize;

/// Template source: subject line plus HTML body
#[derive(Clone, Debug)]
pub struct EmailTemplate {
    pub name: &'static str,
    pub subject: &'static str,
    pub html: &'static str,
}

/// Rendered template result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    pub subject: String,
    pub html: String,
}

const LAYOUT_OPEN: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">"#;

const LAYOUT_CLOSE: &str = "</body>\n</html>";

/// Handlebars registry with subject and body registered per template
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    /// An engine with only `templates` registered
    pub fn with_templates(templates: &[EmailTemplate]) -> NotificationResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);

        let mut engine = Self { handlebars };
        for template in templates {
            engine.register(template)?;
        }
        Ok(engine)
    }

    pub fn register(&mut self, template: &EmailTemplate) -> NotificationResult<()> {
        self.handlebars
            .register_template_string(&format!("{}_subject", template.name), template.subject)?;
        self.handlebars.register_template_string(
            &format!("{}_html", template.name),
            format!("{}\n{}\n{}", LAYOUT_OPEN, template.html, LAYOUT_CLOSE),
        )?;
        Ok(())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.handlebars.has_template(&format!("{}_subject", name))
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> NotificationResult<RenderedTemplate> {
        Ok(RenderedTemplate {
            subject: self.handlebars.render(&format!("{}_subject", name), data)?,
            html: self.handlebars.render(&format!("{}_html", name), data)?,
        })
    }
}
