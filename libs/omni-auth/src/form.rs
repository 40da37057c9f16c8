//! Submission boundary for the login, register, forgot-password and
//! reset-password form.
//!
//! Validates input locally, allows a single submission in flight per form,
//! shows provider messages verbatim and turns anything unexpected into a
//! generic message.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use omni_auth_types::{AuthResult, ErrorInfo};
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, instrument};
use validator::ValidateEmail;

use crate::gateway::AuthGateway;
use crate::provider::Credentials;

pub const MIN_PASSWORD_LEN: usize = 6;

pub const GENERIC_ERROR_MESSAGE: &str = "Ocurrió un error inesperado. Intentá nuevamente.";

const INVALID_EMAIL: &str = "Email inválido";
const PASSWORD_TOO_SHORT: &str = "Mínimo 6 caracteres";
const PASSWORDS_DIFFER: &str = "Las contraseñas no coinciden";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Login,
    Register,
    ForgotPassword,
    /// New password after following the reset link. Needs the session the
    /// link established.
    ResetPassword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Email,
    Password,
    ConfirmPassword,
}

pub type FieldErrors = BTreeMap<Field, &'static str>;

#[derive(Debug, Clone)]
pub struct FormInput {
    pub mode: FormMode,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl FormInput {
    pub fn login(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            mode: FormMode::Login,
            email: email.into(),
            password: SecretString::from(password.into()),
            confirm_password: SecretString::from(String::new()),
        }
    }

    pub fn register(
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            mode: FormMode::Register,
            email: email.into(),
            password: SecretString::from(password.into()),
            confirm_password: SecretString::from(confirm_password.into()),
        }
    }

    pub fn reset_password(
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            mode: FormMode::ResetPassword,
            ..Self::register(email, password, confirm_password)
        }
    }

    pub fn forgot_password(email: impl Into<String>) -> Self {
        Self {
            mode: FormMode::ForgotPassword,
            email: email.into(),
            password: SecretString::from(String::new()),
            confirm_password: SecretString::from(String::new()),
        }
    }
}

/// Syntactically valid and the domain has at least one dot.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email() && has_dotted_domain(email)
}

fn has_dotted_domain(email: &str) -> bool {
    email
        .rsplit_once('@')
        .and_then(|(_, domain)| domain.split_once('.'))
        .is_some_and(|(host, rest)| !host.is_empty() && !rest.is_empty())
}

/// Check the form before anything is sent to the provider.
pub fn validate(input: &FormInput) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if !is_valid_email(&input.email) {
        errors.insert(Field::Email, INVALID_EMAIL);
    }

    if input.mode != FormMode::ForgotPassword {
        let password = input.password.expose_secret();
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.insert(Field::Password, PASSWORD_TOO_SHORT);
        }
        if matches!(input.mode, FormMode::Register | FormMode::ResetPassword)
            && password != input.confirm_password.expose_secret()
        {
            errors.insert(Field::ConfirmPassword, PASSWORDS_DIFFER);
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Local validation failed; nothing was sent.
    Invalid(FieldErrors),
    /// A submission from this form is still in flight.
    Busy,
    SignedIn,
    /// Account created and signed in right away.
    Registered,
    /// Account created; the user must confirm the email first.
    ConfirmationPending { email: String },
    ConfirmationResent,
    ResetEmailSent,
    PasswordUpdated,
    /// The provider refused the operation.
    Rejected(ErrorInfo),
    /// The submission failed outside the provider's error channel.
    Unexpected,
}

impl SubmitOutcome {
    /// Text for the form's message area.
    pub fn message(&self) -> Option<String> {
        let msg = match self {
            Self::Invalid(_) | Self::Busy => return None,
            Self::SignedIn => "¡Bienvenido!",
            Self::Registered => "¡Cuenta creada!",
            Self::ConfirmationPending { .. } => {
                "¡Cuenta creada! Revisá tu email para confirmarla."
            }
            Self::ConfirmationResent => "Te reenviamos el email de confirmación.",
            Self::ResetEmailSent => "Te enviamos un email para restablecer tu contraseña.",
            Self::PasswordUpdated => "Contraseña actualizada",
            Self::Rejected(err) => return Some(err.message.clone()),
            Self::Unexpected => GENERIC_ERROR_MESSAGE,
        };
        Some(msg.to_string())
    }

    pub fn can_resend_confirmation(&self) -> bool {
        matches!(self, Self::ConfirmationPending { .. })
    }
}

/// Allows one submission at a time. The submit control is disabled while
/// [`SubmitGuard::is_pending`] is true.
#[derive(Debug, Clone, Default)]
pub struct SubmitGuard {
    pending: Arc<AtomicBool>,
}

impl SubmitGuard {
    pub fn try_begin(&self) -> Option<SubmitPermit> {
        self.pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitPermit {
                pending: self.pending.clone(),
            })
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

/// Held for the duration of a submission.
#[derive(Debug)]
pub struct SubmitPermit {
    pending: Arc<AtomicBool>,
}

impl Drop for SubmitPermit {
    fn drop(&mut self) {
        self.pending.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct AuthFormController {
    gateway: AuthGateway,
    guard: SubmitGuard,
}

impl AuthFormController {
    pub fn new(gateway: AuthGateway) -> Self {
        Self {
            gateway,
            guard: SubmitGuard::default(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.guard.is_pending()
    }

    #[instrument(skip_all, fields(mode = ?input.mode))]
    pub async fn submit(&self, input: FormInput) -> SubmitOutcome {
        let Some(_permit) = self.guard.try_begin() else {
            return SubmitOutcome::Busy;
        };

        if let Err(errors) = validate(&input) {
            return SubmitOutcome::Invalid(errors);
        }

        let gateway = self.gateway.clone();
        self.run(async move { dispatch(&gateway, input).await }).await
    }

    #[instrument(skip(self))]
    pub async fn resend_confirmation(&self, email: &str) -> SubmitOutcome {
        let Some(_permit) = self.guard.try_begin() else {
            return SubmitOutcome::Busy;
        };

        let gateway = self.gateway.clone();
        let email = email.to_string();
        self.run(async move {
            match gateway.resend_confirmation(&email).await.error {
                Some(err) => SubmitOutcome::Rejected(err),
                None => SubmitOutcome::ConfirmationResent,
            }
        })
        .await
    }

    /// Run the call on its own task so a failure there is contained here.
    async fn run<F>(&self, call: F) -> SubmitOutcome
    where
        F: std::future::Future<Output = SubmitOutcome> + Send + 'static,
    {
        match tokio::spawn(call).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Auth form submission failed unexpectedly");
                SubmitOutcome::Unexpected
            }
        }
    }
}

async fn dispatch(gateway: &AuthGateway, input: FormInput) -> SubmitOutcome {
    let email = input.email.trim().to_string();
    match input.mode {
        FormMode::Login => {
            let credentials = Credentials {
                email,
                password: input.password,
            };
            identity_outcome(gateway.login(credentials).await, None)
        }
        FormMode::Register => {
            let credentials = Credentials {
                email: email.clone(),
                password: input.password,
            };
            identity_outcome(gateway.register(credentials, None).await, Some(email))
        }
        FormMode::ForgotPassword => match gateway.request_password_reset(&email).await.error {
            Some(err) => SubmitOutcome::Rejected(err),
            None => SubmitOutcome::ResetEmailSent,
        },
        FormMode::ResetPassword => match gateway.update_password(input.password).await.error {
            Some(err) => SubmitOutcome::Rejected(err),
            None => SubmitOutcome::PasswordUpdated,
        },
    }
}

fn identity_outcome(result: AuthResult, registered_email: Option<String>) -> SubmitOutcome {
    if let Some(err) = result.error {
        return SubmitOutcome::Rejected(err);
    }
    match (registered_email, result.session) {
        (None, _) => SubmitOutcome::SignedIn,
        (Some(_), Some(_)) => SubmitOutcome::Registered,
        (Some(email), None) => SubmitOutcome::ConfirmationPending { email },
    }
}

#[cfg(test)]
mod tests {
    use omni_auth_types::AuthData;
    use tokio::sync::Notify;

    use super::*;
    use crate::config::AuthConfig;
    use crate::provider::ResendType;
    use crate::test_utils::{ProviderCall, ScriptedProvider, test_session, test_user};

    fn controller(provider: &Arc<ScriptedProvider>) -> AuthFormController {
        AuthFormController::new(AuthGateway::new(provider.clone(), &AuthConfig::default()))
    }

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email(" user+tag@example.org "));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("notanemail"));
        assert!(!is_valid_email("@nodomain.com"));
        assert!(!is_valid_email("a@localhost"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@b."));
    }

    #[test]
    fn test_validate_login() {
        assert!(validate(&FormInput::login("test@example.com", "123456")).is_ok());

        let errors = validate(&FormInput::login("bad", "123")).unwrap_err();
        assert_eq!(errors.get(&Field::Email), Some(&"Email inválido"));
        assert_eq!(errors.get(&Field::Password), Some(&"Mínimo 6 caracteres"));
        assert!(!errors.contains_key(&Field::ConfirmPassword));
    }

    #[test]
    fn test_validate_register_requires_matching_confirmation() {
        let errors =
            validate(&FormInput::register("a@example.com", "secret1", "secret2")).unwrap_err();
        assert_eq!(
            errors.into_iter().collect::<Vec<_>>(),
            vec![(Field::ConfirmPassword, "Las contraseñas no coinciden")]
        );
        assert!(validate(&FormInput::register("a@example.com", "secret1", "secret1")).is_ok());
    }

    #[test]
    fn test_validate_reset_password() {
        let errors = validate(&FormInput::reset_password("a@example.com", "12345", "12345"))
            .unwrap_err();
        assert_eq!(errors.get(&Field::Password), Some(&"Mínimo 6 caracteres"));

        let errors = validate(&FormInput::reset_password(
            "a@example.com",
            "newpassword123",
            "newpassword456",
        ))
        .unwrap_err();
        assert_eq!(
            errors.get(&Field::ConfirmPassword),
            Some(&"Las contraseñas no coinciden")
        );
    }

    #[test]
    fn test_validate_forgot_password_skips_password() {
        assert!(validate(&FormInput::forgot_password("a@example.com")).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_provider() {
        let provider = Arc::new(ScriptedProvider::new());
        let form = controller(&provider);

        let outcome = form.submit(FormInput::login("nope", "123")).await;

        assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
        assert!(outcome.message().is_none());
        assert!(provider.calls().is_empty());
        assert!(!form.is_pending());
    }

    #[tokio::test]
    async fn test_login_success() {
        let provider = Arc::new(ScriptedProvider::new());
        let form = controller(&provider);

        let outcome = form
            .submit(FormInput::login("test@example.com", "password123"))
            .await;

        assert_eq!(outcome, SubmitOutcome::SignedIn);
        assert_eq!(outcome.message().as_deref(), Some("¡Bienvenido!"));
    }

    #[tokio::test]
    async fn test_provider_message_shown_verbatim() {
        let provider = Arc::new(ScriptedProvider::new().with_sign_in(Err(ErrorInfo::new(
            "AuthApiError",
            "Invalid login credentials",
        ))));
        let form = controller(&provider);

        let outcome = form
            .submit(FormInput::login("test@example.com", "wrongpass"))
            .await;

        assert_eq!(outcome.message().as_deref(), Some("Invalid login credentials"));
    }

    #[tokio::test]
    async fn test_register_pending_offers_resend() {
        let provider = Arc::new(ScriptedProvider::new());
        let form = controller(&provider);

        let outcome = form
            .submit(FormInput::register(
                "newuser@example.com",
                "securepassword123",
                "securepassword123",
            ))
            .await;

        assert_eq!(
            outcome,
            SubmitOutcome::ConfirmationPending {
                email: "newuser@example.com".into()
            }
        );
        assert!(outcome.can_resend_confirmation());
        assert!(outcome.message().unwrap().starts_with("¡Cuenta creada!"));

        let resent = form.resend_confirmation("newuser@example.com").await;
        assert_eq!(resent, SubmitOutcome::ConfirmationResent);
        assert_eq!(
            provider.calls().last(),
            Some(&ProviderCall::Resend {
                kind: ResendType::Signup,
                email: "newuser@example.com".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_register_with_immediate_session() {
        let user = test_user("u1", "newuser@example.com");
        let provider = Arc::new(ScriptedProvider::new().with_sign_up(Ok(AuthData {
            user: Some(user.clone()),
            session: Some(test_session("tok", user)),
        })));
        let form = controller(&provider);

        let outcome = form
            .submit(FormInput::register("newuser@example.com", "secret12", "secret12"))
            .await;

        assert_eq!(outcome, SubmitOutcome::Registered);
    }

    #[tokio::test]
    async fn test_forgot_password() {
        let provider = Arc::new(ScriptedProvider::new());
        let form = controller(&provider);

        let outcome = form
            .submit(FormInput::forgot_password("user@example.com"))
            .await;

        assert_eq!(outcome, SubmitOutcome::ResetEmailSent);
        assert!(outcome.message().unwrap().starts_with("Te enviamos un email"));
        assert!(matches!(
            &provider.calls()[0],
            ProviderCall::ResetPassword { redirect_to, .. }
                if redirect_to == "http://localhost:3000/auth/reset-password"
        ));
    }

    #[tokio::test]
    async fn test_reset_password_updates_password() {
        let session = test_session("tok", test_user("u1", "test@example.com"));
        let provider = Arc::new(ScriptedProvider::new().with_session(session));
        let form = controller(&provider);

        let outcome = form
            .submit(FormInput::reset_password(
                "test@example.com",
                "newpassword123",
                "newpassword123",
            ))
            .await;

        assert_eq!(outcome, SubmitOutcome::PasswordUpdated);
        assert_eq!(outcome.message().as_deref(), Some("Contraseña actualizada"));
        assert_eq!(
            provider.calls(),
            vec![ProviderCall::UpdateUser {
                email: None,
                password_changed: true,
                data: None,
            }]
        );
    }

    #[tokio::test]
    async fn test_reset_password_without_session_shows_provider_error() {
        let provider = Arc::new(ScriptedProvider::new());
        let form = controller(&provider);

        let outcome = form
            .submit(FormInput::reset_password(
                "test@example.com",
                "newpassword123",
                "newpassword123",
            ))
            .await;

        assert_eq!(outcome.message().as_deref(), Some("Auth session missing!"));
    }

    #[tokio::test]
    async fn test_second_submit_while_pending_is_rejected() {
        let gate = Arc::new(Notify::new());
        let provider = Arc::new(ScriptedProvider::new().with_sign_in_gate(gate.clone()));
        let form = controller(&provider);

        let first = tokio::spawn({
            let form = form.clone();
            async move {
                form.submit(FormInput::login("test@example.com", "password123"))
                    .await
            }
        });
        while !form.is_pending() {
            tokio::task::yield_now().await;
        }

        let second = form
            .submit(FormInput::login("test@example.com", "password123"))
            .await;
        assert_eq!(second, SubmitOutcome::Busy);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), SubmitOutcome::SignedIn);
        assert!(!form.is_pending());

        let sign_ins = provider
            .calls()
            .into_iter()
            .filter(|c| matches!(c, ProviderCall::SignIn { .. }))
            .count();
        assert_eq!(sign_ins, 1);
    }

    #[tokio::test]
    async fn test_unexpected_failure_becomes_generic_message() {
        let provider = Arc::new(ScriptedProvider::new().panicking_on_sign_in());
        let form = controller(&provider);

        let outcome = form
            .submit(FormInput::login("test@example.com", "password123"))
            .await;

        assert_eq!(outcome, SubmitOutcome::Unexpected);
        assert_eq!(outcome.message().as_deref(), Some(GENERIC_ERROR_MESSAGE));
        assert!(!form.is_pending());
    }
}
