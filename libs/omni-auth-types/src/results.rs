//! Uniform result envelopes returned by the auth gateway.
//!
//! Every envelope is built from a provider `Result`, so an error is never
//! paired with identity data.

use serde::{Deserialize, Serialize};

use crate::{ErrorInfo, Session, User};

/// Identity data returned by sign-up and sign-in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthData {
    pub user: Option<User>,
    pub session: Option<Session>,
}

/// Result of register and login.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthResult {
    pub user: Option<User>,
    pub session: Option<Session>,
    pub error: Option<ErrorInfo>,
}

impl AuthResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Registration succeeded but the provider is waiting for email confirmation.
    pub fn needs_confirmation(&self) -> bool {
        self.error.is_none() && self.user.is_some() && self.session.is_none()
    }
}

impl From<Result<AuthData, ErrorInfo>> for AuthResult {
    fn from(result: Result<AuthData, ErrorInfo>) -> Self {
        match result {
            Ok(data) => Self {
                user: data.user,
                session: data.session,
                error: None,
            },
            Err(error) => Self {
                user: None,
                session: None,
                error: Some(error),
            },
        }
    }
}

/// Result of operations that only report success or failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub error: Option<ErrorInfo>,
}

impl ActionResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl From<Result<(), ErrorInfo>> for ActionResult {
    fn from(result: Result<(), ErrorInfo>) -> Self {
        Self { error: result.err() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub session: Option<Session>,
    pub error: Option<ErrorInfo>,
}

impl From<Result<Option<Session>, ErrorInfo>> for SessionResult {
    fn from(result: Result<Option<Session>, ErrorInfo>) -> Self {
        match result {
            Ok(session) => Self {
                session,
                error: None,
            },
            Err(error) => Self {
                session: None,
                error: Some(error),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserResult {
    pub user: Option<User>,
    pub error: Option<ErrorInfo>,
}

impl From<Result<User, ErrorInfo>> for UserResult {
    fn from(result: Result<User, ErrorInfo>) -> Self {
        match result {
            Ok(user) => Self {
                user: Some(user),
                error: None,
            },
            Err(error) => Self {
                user: None,
                error: Some(error),
            },
        }
    }
}

/// Result of starting an OAuth flow. The caller navigates to `redirect_url`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OAuthRedirect {
    pub redirect_url: Option<String>,
    pub error: Option<ErrorInfo>,
}

impl From<Result<String, ErrorInfo>> for OAuthRedirect {
    fn from(result: Result<String, ErrorInfo>) -> Self {
        match result {
            Ok(url) => Self {
                redirect_url: Some(url),
                error: None,
            },
            Err(error) => Self {
                redirect_url: None,
                error: Some(error),
            },
        }
    }
}
