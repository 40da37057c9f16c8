use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Session change notifications pushed by the provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

impl AuthChangeEvent {
    /// Returns true if the event leaves a live session behind.
    pub fn carries_session(&self) -> bool {
        !matches!(self, Self::SignedOut)
    }
}

/// Third-party identity providers offered on the login form.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Github,
    Facebook,
    Twitter,
}
