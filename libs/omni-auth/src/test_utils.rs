//! In-memory provider for gateway, synchronizer and form tests.
//!
//! `ScriptedProvider` behaves like the hosted provider for the happy path
//! (sign-in stores a session and emits `SIGNED_IN`, sign-out clears it and
//! emits `SIGNED_OUT`) and lets each test override individual responses.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use omni_auth_types::{
    AuthChangeEvent, AuthData, ErrorInfo, Metadata, OAuthProvider, Session, User,
};
use secrecy::ExposeSecret;
use tokio::sync::Notify;

use crate::listeners::{AuthCallback, ListenerRegistry, Subscription};
use crate::provider::{AuthProvider, Credentials, ResendType, SignUpRequest, UserAttributes};

pub fn test_user(id: &str, email: &str) -> User {
    User {
        id: id.to_string(),
        email: Some(email.to_string()),
        metadata: Metadata::new(),
    }
}

pub fn test_session(token: &str, user: User) -> Session {
    Session::new(token, user)
}

pub fn session_missing() -> ErrorInfo {
    ErrorInfo::new("AuthSessionMissingError", "Auth session missing!")
}

/// Call as seen by the provider. Passwords are reduced to a flag.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    SignUp {
        email: String,
        metadata: Option<Metadata>,
        email_redirect_to: String,
    },
    SignIn {
        email: String,
    },
    SignOut,
    ResetPassword {
        email: String,
        redirect_to: String,
    },
    UpdateUser {
        email: Option<String>,
        password_changed: bool,
        data: Option<Metadata>,
    },
    GetSession,
    GetUser,
    Resend {
        kind: ResendType,
        email: String,
    },
    OAuth {
        provider: OAuthProvider,
        redirect_to: String,
    },
}

#[derive(Default)]
pub struct ScriptedProvider {
    calls: Mutex<Vec<ProviderCall>>,
    session: Mutex<Option<Session>>,
    sign_up: Mutex<Option<Result<AuthData, ErrorInfo>>>,
    sign_in: Mutex<Option<Result<AuthData, ErrorInfo>>>,
    oauth: Mutex<Option<Result<String, ErrorInfo>>>,
    get_session_error: Mutex<Option<ErrorInfo>>,
    get_session_gate: Option<Arc<Notify>>,
    sign_in_gate: Option<Arc<Notify>>,
    panic_on_sign_in: bool,
    listeners: ListenerRegistry,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(self, session: Session) -> Self {
        *self.session.lock().unwrap() = Some(session);
        self
    }

    pub fn with_sign_up(self, result: Result<AuthData, ErrorInfo>) -> Self {
        *self.sign_up.lock().unwrap() = Some(result);
        self
    }

    pub fn with_sign_in(self, result: Result<AuthData, ErrorInfo>) -> Self {
        *self.sign_in.lock().unwrap() = Some(result);
        self
    }

    pub fn with_oauth(self, result: Result<String, ErrorInfo>) -> Self {
        *self.oauth.lock().unwrap() = Some(result);
        self
    }

    pub fn with_get_session_error(self, error: ErrorInfo) -> Self {
        *self.get_session_error.lock().unwrap() = Some(error);
        self
    }

    /// `get_session` waits until the gate is notified.
    pub fn with_get_session_gate(mut self, gate: Arc<Notify>) -> Self {
        self.get_session_gate = Some(gate);
        self
    }

    /// `sign_in_with_password` waits until the gate is notified.
    pub fn with_sign_in_gate(mut self, gate: Arc<Notify>) -> Self {
        self.sign_in_gate = Some(gate);
        self
    }

    pub fn panicking_on_sign_in(mut self) -> Self {
        self.panic_on_sign_in = true;
        self
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Push an event as the provider would.
    pub fn emit(&self, event: AuthChangeEvent, session: Option<&Session>) {
        self.listeners.emit(event, session);
    }

    fn record(&self, call: ProviderCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn current_session(&self) -> Option<Session> {
        self.session.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthProvider for ScriptedProvider {
    async fn sign_up(&self, request: SignUpRequest) -> Result<AuthData, ErrorInfo> {
        let email = request.credentials.email.clone();
        self.record(ProviderCall::SignUp {
            email: email.clone(),
            metadata: request.metadata,
            email_redirect_to: request.email_redirect_to,
        });

        let scripted = self.sign_up.lock().unwrap().clone();
        scripted.unwrap_or_else(|| {
            Ok(AuthData {
                user: Some(test_user("user-123", &email)),
                session: None,
            })
        })
    }

    async fn sign_in_with_password(
        &self,
        credentials: Credentials,
    ) -> Result<AuthData, ErrorInfo> {
        self.record(ProviderCall::SignIn {
            email: credentials.email.clone(),
        });
        if let Some(gate) = &self.sign_in_gate {
            gate.notified().await;
        }
        if self.panic_on_sign_in {
            panic!("connection reset by peer");
        }
        assert!(!credentials.password.expose_secret().is_empty());

        let scripted = self.sign_in.lock().unwrap().clone();
        let data = scripted.unwrap_or_else(|| {
            let user = test_user("user-123", &credentials.email);
            Ok(AuthData {
                user: Some(user.clone()),
                session: Some(test_session("token-123", user)),
            })
        })?;

        if let Some(session) = &data.session {
            *self.session.lock().unwrap() = Some(session.clone());
            self.listeners.emit(AuthChangeEvent::SignedIn, Some(session));
        }
        Ok(data)
    }

    async fn sign_out(&self) -> Result<(), ErrorInfo> {
        self.record(ProviderCall::SignOut);
        *self.session.lock().unwrap() = None;
        self.listeners.emit(AuthChangeEvent::SignedOut, None);
        Ok(())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), ErrorInfo> {
        self.record(ProviderCall::ResetPassword {
            email: email.to_string(),
            redirect_to: redirect_to.to_string(),
        });
        Ok(())
    }

    async fn update_user(&self, attributes: UserAttributes) -> Result<User, ErrorInfo> {
        self.record(ProviderCall::UpdateUser {
            email: attributes.email.clone(),
            password_changed: attributes.password.is_some(),
            data: attributes.data.clone(),
        });

        let mut guard = self.session.lock().unwrap();
        let session = guard.as_mut().ok_or_else(session_missing)?;
        if let Some(email) = attributes.email {
            session.user.email = Some(email);
        }
        if let Some(data) = attributes.data {
            session.user.metadata.extend(data);
        }
        Ok(session.user.clone())
    }

    async fn get_session(&self) -> Result<Option<Session>, ErrorInfo> {
        self.record(ProviderCall::GetSession);
        if let Some(gate) = &self.get_session_gate {
            gate.notified().await;
        }
        if let Some(err) = self.get_session_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.current_session())
    }

    async fn get_user(&self) -> Result<User, ErrorInfo> {
        self.record(ProviderCall::GetUser);
        self.current_session()
            .map(|s| s.user)
            .ok_or_else(session_missing)
    }

    async fn resend(&self, kind: ResendType, email: &str) -> Result<(), ErrorInfo> {
        self.record(ProviderCall::Resend {
            kind,
            email: email.to_string(),
        });
        Ok(())
    }

    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<String, ErrorInfo> {
        self.record(ProviderCall::OAuth {
            provider,
            redirect_to: redirect_to.to_string(),
        });
        let scripted = self.oauth.lock().unwrap().clone();
        scripted.unwrap_or_else(|| {
            Ok(format!(
                "https://auth.example.com/authorize?provider={}",
                provider.as_ref()
            ))
        })
    }

    fn on_auth_state_change(&self, callback: AuthCallback) -> Subscription {
        self.listeners.subscribe(callback)
    }
}
