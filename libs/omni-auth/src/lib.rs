//! Client-side authentication for omniconscientes.
//!
//! # Features
//!
//! - **Auth gateway** - one call per auth operation, every answer normalised
//!   into a `{ data..., error }` envelope
//! - **Session synchronizer** - mirrors provider session changes into a
//!   reactive `{ user, session, loading, is_authenticated }` snapshot
//! - **Form boundary** - local validation and one submission in flight per form
//! - **GoTrue provider** - hosted REST backend (only with `gotrue` feature)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use omni_auth::{AuthConfig, AuthGateway, Credentials, GoTrueConfig, GoTrueProvider, SessionSynchronizer};
//!
//! let provider = Arc::new(GoTrueProvider::new(&GoTrueConfig::from_env()?)?);
//! let gateway = AuthGateway::new(provider, &AuthConfig::from_env());
//!
//! let sync = SessionSynchronizer::start(&gateway)?;
//! let mut session = sync.handle();
//!
//! let result = gateway.login(Credentials::new("user@example.com", "password123")).await;
//! if let Some(err) = result.error {
//!     println!("{}", err.message);
//! }
//! assert!(session.loaded().await.is_authenticated());
//! ```

mod config;
mod error;
mod form;
mod gateway;
mod listeners;
mod provider;
mod synchronizer;

#[cfg(feature = "gotrue")]
mod gotrue;

#[cfg(test)]
mod test_utils;

pub use config::{
    AuthConfig, CALLBACK_PATH, DEFAULT_SITE_URL, GoTrueConfig, RESET_PASSWORD_PATH, RedirectUrls,
};
pub use error::AuthSdkError;
pub use form::{
    AuthFormController, Field, FieldErrors, FormInput, FormMode, GENERIC_ERROR_MESSAGE,
    MIN_PASSWORD_LEN, SubmitGuard, SubmitOutcome, SubmitPermit, is_valid_email, validate,
};
pub use gateway::AuthGateway;
pub use listeners::{AuthCallback, ListenerRegistry, Subscription};
pub use provider::{AuthProvider, Credentials, ResendType, SignUpRequest, UserAttributes};
pub use synchronizer::{AuthSnapshot, AuthState, SessionHandle, SessionSynchronizer};

#[cfg(feature = "gotrue")]
pub use gotrue::{
    AUTH_API_ERROR, AUTH_RETRYABLE_FETCH_ERROR, AUTH_SESSION_MISSING_ERROR, AUTH_UNKNOWN_ERROR,
    GoTrueProvider,
};

// Re-export shared types for convenience
pub use omni_auth_types::{
    ActionResult, AuthChangeEvent, AuthData, AuthResult, ErrorInfo, Metadata, OAuthProvider,
    OAuthRedirect, Session, SessionResult, User, UserResult,
};
pub use secrecy::SecretString;
