//! Contract of the hosted identity provider.

use async_trait::async_trait;
use omni_auth_types::{AuthData, ErrorInfo, Metadata, OAuthProvider, Session, User};
use secrecy::SecretString;

use crate::listeners::{AuthCallback, Subscription};

/// Email and password pair. Never stored; forwarded and dropped.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub credentials: Credentials,
    pub metadata: Option<Metadata>,
    pub email_redirect_to: String,
}

/// Fields to change on the signed-in user. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserAttributes {
    pub email: Option<String>,
    pub password: Option<SecretString>,
    pub data: Option<Metadata>,
}

/// Which confirmation email to send again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendType {
    Signup,
    EmailChange,
}

impl ResendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResendType::Signup => "signup",
            ResendType::EmailChange => "email_change",
        }
    }
}

/// Hosted provider client.
///
/// Every failure, including transport failures, is reported as an
/// `ErrorInfo` in the `Err` arm.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, request: SignUpRequest) -> Result<AuthData, ErrorInfo>;

    async fn sign_in_with_password(&self, credentials: Credentials)
    -> Result<AuthData, ErrorInfo>;

    async fn sign_out(&self) -> Result<(), ErrorInfo>;

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), ErrorInfo>;

    async fn update_user(&self, attributes: UserAttributes) -> Result<User, ErrorInfo>;

    async fn get_session(&self) -> Result<Option<Session>, ErrorInfo>;

    async fn get_user(&self) -> Result<User, ErrorInfo>;

    async fn resend(&self, kind: ResendType, email: &str) -> Result<(), ErrorInfo>;

    /// Build the provider's authorization URL. Must not navigate.
    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<String, ErrorInfo>;

    fn on_auth_state_change(&self, callback: AuthCallback) -> Subscription;
}
