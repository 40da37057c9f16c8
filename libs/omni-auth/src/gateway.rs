//! One-call-per-operation façade over the hosted provider.

use std::sync::Arc;

use omni_auth_types::{
    ActionResult, AuthChangeEvent, AuthResult, ErrorInfo, Metadata, OAuthProvider, OAuthRedirect,
    Session, SessionResult, UserResult,
};
use secrecy::SecretString;
use tracing::{debug, instrument, warn};

use crate::config::{AuthConfig, RedirectUrls};
use crate::listeners::Subscription;
use crate::provider::{AuthProvider, Credentials, ResendType, SignUpRequest, UserAttributes};

/// Auth gateway.
///
/// Stateless apart from the redirect URLs resolved at construction. No
/// retries, no caching and no input validation: the provider's answer is
/// returned as-is inside the result envelope.
#[derive(Clone)]
pub struct AuthGateway {
    provider: Arc<dyn AuthProvider>,
    redirects: RedirectUrls,
}

impl AuthGateway {
    pub fn new(provider: Arc<dyn AuthProvider>, config: &AuthConfig) -> Self {
        let redirects = RedirectUrls::resolve(config);
        debug!(base_url = redirects.base_url(), "Auth gateway configured");
        Self {
            provider,
            redirects,
        }
    }

    pub fn redirects(&self) -> &RedirectUrls {
        &self.redirects
    }

    /// Create an account. The session stays empty until the email is
    /// confirmed when the provider requires confirmation.
    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn register(
        &self,
        credentials: Credentials,
        metadata: Option<Metadata>,
    ) -> AuthResult {
        let request = SignUpRequest {
            credentials,
            metadata,
            email_redirect_to: self.redirects.callback(),
        };
        let result = AuthResult::from(self.provider.sign_up(request).await);
        log_error("register", result.error.as_ref());
        result
    }

    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn login(&self, credentials: Credentials) -> AuthResult {
        let result = AuthResult::from(self.provider.sign_in_with_password(credentials).await);
        log_error("login", result.error.as_ref());
        result
    }

    #[instrument(skip_all)]
    pub async fn logout(&self) -> ActionResult {
        let result = ActionResult::from(self.provider.sign_out().await);
        log_error("logout", result.error.as_ref());
        result
    }

    /// Send a reset link that lands on the reset-password page.
    #[instrument(skip(self))]
    pub async fn request_password_reset(&self, email: &str) -> ActionResult {
        let redirect_to = self.redirects.reset_password();
        let result = ActionResult::from(
            self.provider
                .reset_password_for_email(email, &redirect_to)
                .await,
        );
        log_error("request_password_reset", result.error.as_ref());
        result
    }

    /// Requires an active session.
    #[instrument(skip_all)]
    pub async fn update_password(&self, new_password: SecretString) -> ActionResult {
        self.update_user(
            "update_password",
            UserAttributes {
                password: Some(new_password),
                ..Default::default()
            },
        )
        .await
    }

    /// Requires an active session. The provider may ask for re-confirmation.
    #[instrument(skip(self))]
    pub async fn update_email(&self, new_email: &str) -> ActionResult {
        self.update_user(
            "update_email",
            UserAttributes {
                email: Some(new_email.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// Merge `metadata` into the user record.
    #[instrument(skip_all, fields(keys = metadata.len()))]
    pub async fn update_metadata(&self, metadata: Metadata) -> ActionResult {
        self.update_user(
            "update_metadata",
            UserAttributes {
                data: Some(metadata),
                ..Default::default()
            },
        )
        .await
    }

    #[instrument(skip_all)]
    pub async fn get_session(&self) -> SessionResult {
        let result = SessionResult::from(self.provider.get_session().await);
        log_error("get_session", result.error.as_ref());
        result
    }

    #[instrument(skip_all)]
    pub async fn get_user(&self) -> UserResult {
        let result = UserResult::from(self.provider.get_user().await);
        log_error("get_user", result.error.as_ref());
        result
    }

    #[instrument(skip(self))]
    pub async fn resend_confirmation(&self, email: &str) -> ActionResult {
        let result = ActionResult::from(self.provider.resend(ResendType::Signup, email).await);
        log_error("resend_confirmation", result.error.as_ref());
        result
    }

    /// Return the URL the caller must send the user to. Never navigates.
    #[instrument(skip(self))]
    pub async fn start_oauth(&self, provider: OAuthProvider) -> OAuthRedirect {
        let redirect_to = self.redirects.callback();
        let result = OAuthRedirect::from(
            self.provider
                .sign_in_with_oauth(provider, &redirect_to)
                .await,
        );
        log_error("start_oauth", result.error.as_ref());
        result
    }

    /// Register a session change listener. The returned handle must be
    /// released exactly once; dropping it counts.
    pub fn subscribe_to_auth_changes<F>(&self, callback: F) -> Subscription
    where
        F: Fn(AuthChangeEvent, Option<Session>) + Send + Sync + 'static,
    {
        self.provider.on_auth_state_change(Arc::new(callback))
    }

    async fn update_user(&self, operation: &'static str, attributes: UserAttributes) -> ActionResult {
        let result = ActionResult::from(self.provider.update_user(attributes).await.map(|_| ()));
        log_error(operation, result.error.as_ref());
        result
    }
}

fn log_error(operation: &'static str, error: Option<&ErrorInfo>) {
    if let Some(err) = error {
        warn!(operation, error.name = %err.name, error.message = %err.message, "Provider rejected auth operation");
    }
}
