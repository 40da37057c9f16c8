//! Redirect and provider configuration.

use secrecy::SecretString;
use url::Url;

use crate::error::AuthSdkError;

/// Base URL used when neither a site URL nor an origin is known.
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";

/// Landing path for signup confirmation and OAuth callbacks.
pub const CALLBACK_PATH: &str = "/auth/callback";

/// Landing path for password reset links.
pub const RESET_PASSWORD_PATH: &str = "/auth/reset-password";

const BARE_LOCALHOST: &str = "http://localhost";

/// Inputs for the gateway's redirect base URL.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Explicit public site URL (e.g., "https://omniconscientes.com")
    pub site_url: Option<String>,

    /// Origin the client is currently served from, when known
    pub origin: Option<String>,
}

impl AuthConfig {
    /// Read the site URL from `SITE_URL`, falling back to `SUPABASE_SITE_URL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let site_url = ["SITE_URL", "SUPABASE_SITE_URL"]
            .into_iter()
            .filter_map(|key| lookup(key))
            .find(|v| !v.is_empty());

        Self {
            site_url,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// Redirect targets handed to the provider, computed once per gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectUrls {
    base_url: String,
}

impl RedirectUrls {
    /// Resolve the base URL: explicit site URL, then current origin, then
    /// [`DEFAULT_SITE_URL`]. A bare `http://localhost` origin gets the
    /// development port.
    pub fn resolve(config: &AuthConfig) -> Self {
        let site_url = config.site_url.as_deref().filter(|s| !s.is_empty());
        let origin = config.origin.as_deref().filter(|s| !s.is_empty());

        let base_url = match (site_url, origin) {
            (Some(site), _) => strip_trailing_slash(site),
            (None, Some(BARE_LOCALHOST)) => DEFAULT_SITE_URL.to_string(),
            (None, Some(origin)) => strip_trailing_slash(origin),
            (None, None) => DEFAULT_SITE_URL.to_string(),
        };

        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn callback(&self) -> String {
        format!("{}{}", self.base_url, CALLBACK_PATH)
    }

    pub fn reset_password(&self) -> String {
        format!("{}{}", self.base_url, RESET_PASSWORD_PATH)
    }
}

fn strip_trailing_slash(url: &str) -> String {
    url.strip_suffix('/').unwrap_or(url).to_string()
}

/// Connection settings for the hosted GoTrue endpoint.
#[derive(Debug, Clone)]
pub struct GoTrueConfig {
    /// Project URL (e.g., "https://xyzcompany.supabase.co")
    pub project_url: Url,

    /// Public anon key sent as the `apikey` header
    pub anon_key: SecretString,
}

impl GoTrueConfig {
    pub fn new(project_url: &str, anon_key: impl Into<String>) -> Result<Self, AuthSdkError> {
        let anon_key: String = anon_key.into();
        if anon_key.is_empty() {
            return Err(AuthSdkError::Config("anon key is required".into()));
        }

        Ok(Self {
            project_url: Url::parse(project_url)?,
            anon_key: SecretString::from(anon_key),
        })
    }

    /// Read `SUPABASE_URL` and `SUPABASE_ANON_KEY`.
    pub fn from_env() -> Result<Self, AuthSdkError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthSdkError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project_url = lookup("SUPABASE_URL")
            .ok_or_else(|| AuthSdkError::Config("SUPABASE_URL is required".into()))?;
        let anon_key = lookup("SUPABASE_ANON_KEY")
            .ok_or_else(|| AuthSdkError::Config("SUPABASE_ANON_KEY is required".into()))?;

        Self::new(&project_url, anon_key)
    }

    /// Root of the auth REST API, always with a trailing slash.
    pub fn auth_url(&self) -> Result<Url, AuthSdkError> {
        Ok(self.project_url.join("auth/v1/")?)
    }
}
