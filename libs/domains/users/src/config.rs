use core_config::{ConfigError, FromEnv, env_or_default, env_required};

pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";

/// Account-flow settings: the admin registration secret and the public URLs
/// used to build links in account emails.
#[derive(Clone)]
pub struct AccountsConfig {
    pub admin_secret: String,
    /// Web client origin, used for verification and reset links
    pub frontend_url: String,
    /// Public origin of this API, used for seller approval links
    pub base_url: String,
}

impl AccountsConfig {
    pub fn new(
        admin_secret: impl Into<String>,
        frontend_url: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let admin_secret = admin_secret.into();
        if admin_secret.is_empty() {
            return Err(ConfigError::Invalid {
                key: "ADMIN_SECRET".to_string(),
                details: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            admin_secret,
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl std::fmt::Debug for AccountsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountsConfig")
            .field("admin_secret", &"[REDACTED]")
            .field("frontend_url", &self.frontend_url)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl FromEnv for AccountsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Self::new(
            env_required("ADMIN_SECRET")?,
            env_or_default("FRONTEND_URL", DEFAULT_FRONTEND_URL),
            env_or_default("BASE_URL", DEFAULT_BASE_URL),
        )
    }
}
