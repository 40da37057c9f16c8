//! GoTrue REST provider.
//!
//! Talks to the hosted auth API under `{project_url}/auth/v1/`, keeps the
//! current session in memory and pushes session changes to subscribers.

use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use omni_auth_types::{
    AuthChangeEvent, AuthData, ErrorInfo, Metadata, OAuthProvider, Session, User,
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::GoTrueConfig;
use crate::error::AuthSdkError;
use crate::listeners::{AuthCallback, ListenerRegistry, Subscription};
use crate::provider::{AuthProvider, Credentials, ResendType, SignUpRequest, UserAttributes};

pub const AUTH_API_ERROR: &str = "AuthApiError";
pub const AUTH_RETRYABLE_FETCH_ERROR: &str = "AuthRetryableFetchError";
pub const AUTH_SESSION_MISSING_ERROR: &str = "AuthSessionMissingError";
pub const AUTH_UNKNOWN_ERROR: &str = "AuthUnknownError";

/// Refresh this many seconds before the access token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 10;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on one auth round trip. The form stays disabled at most this
/// long before the call reports a fetch error.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct PasswordBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Metadata>,
}

#[derive(Serialize)]
struct EmailBody<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct ResendBody<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct UpdateUserBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Metadata>,
}

/// Error payloads vary between GoTrue versions and endpoints.
#[derive(Deserialize, Default)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

fn api_error(status: StatusCode, body: &str) -> ErrorInfo {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| format!("Request failed with status {status}"));
    ErrorInfo::new(AUTH_API_ERROR, message)
}

fn fetch_error(e: reqwest::Error) -> ErrorInfo {
    ErrorInfo::new(AUTH_RETRYABLE_FETCH_ERROR, e.to_string())
}

fn decode_error(e: impl std::fmt::Display) -> ErrorInfo {
    ErrorInfo::new(AUTH_UNKNOWN_ERROR, format!("Unexpected response: {e}"))
}

fn session_missing() -> ErrorInfo {
    ErrorInfo::new(AUTH_SESSION_MISSING_ERROR, "Auth session missing!")
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

pub struct GoTrueProvider {
    http: Client,
    auth_url: Url,
    anon_key: SecretString,
    session: RwLock<Option<Session>>,
    listeners: ListenerRegistry,
}

impl GoTrueProvider {
    pub fn new(config: &GoTrueConfig) -> Result<Self, AuthSdkError> {
        Ok(Self {
            http: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT)
                .build()?,
            auth_url: config.auth_url()?,
            anon_key: config.anon_key.clone(),
            session: RwLock::new(None),
            listeners: ListenerRegistry::new(),
        })
    }

    /// Adopt a session obtained elsewhere (e.g. tokens from the callback URL).
    pub fn set_session(&self, session: Session) {
        self.store(Some(session.clone()));
        self.listeners
            .emit(AuthChangeEvent::SignedIn, Some(&session));
    }

    /// Exchange the refresh token for a new session.
    ///
    /// A refresh token the provider rejects ends the session: it is cleared
    /// and `SIGNED_OUT` is emitted. Transport failures keep it for a later
    /// attempt.
    #[instrument(skip_all)]
    pub async fn refresh_session(&self) -> Result<Session, ErrorInfo> {
        let refresh_token = self
            .current()
            .and_then(|s| s.refresh_token)
            .ok_or_else(session_missing)?;

        let request = self
            .request(Method::POST, "token")?
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshBody {
                refresh_token: &refresh_token,
            });
        let session: Session = match self.send_json(request).await {
            Ok(session) => session,
            Err(err) => {
                if err.name == AUTH_API_ERROR {
                    self.discard_session(&refresh_token, &err);
                }
                return Err(err);
            }
        };

        self.store(Some(session.clone()));
        self.listeners
            .emit(AuthChangeEvent::TokenRefreshed, Some(&session));
        debug!("Session refreshed");
        Ok(session)
    }

    /// Drop the stored session if it still holds `refresh_token`. A session
    /// adopted while the refresh was in flight is left alone.
    fn discard_session(&self, refresh_token: &str, err: &ErrorInfo) {
        {
            let mut session = self.session.write().unwrap_or_else(|p| p.into_inner());
            let stale = session
                .as_ref()
                .is_some_and(|s| s.refresh_token.as_deref() == Some(refresh_token));
            if !stale {
                return;
            }
            *session = None;
        }
        warn!(error = %err, "Refresh token rejected, signing out");
        self.listeners.emit(AuthChangeEvent::SignedOut, None);
    }

    fn current(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn store(&self, session: Option<Session>) {
        *self.session.write().unwrap_or_else(|p| p.into_inner()) = session;
    }

    fn access_token(&self) -> Result<String, ErrorInfo> {
        self.current()
            .map(|s| s.access_token)
            .ok_or_else(session_missing)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ErrorInfo> {
        self.auth_url.join(path).map_err(decode_error)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ErrorInfo> {
        Ok(self
            .http
            .request(method, self.endpoint(path)?)
            .header("apikey", self.anon_key.expose_secret()))
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ErrorInfo> {
        let token = self.access_token()?;
        Ok(self.request(method, path)?.bearer_auth(token))
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ErrorInfo> {
        let response = request.send().await.map_err(fetch_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(api_error(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ErrorInfo> {
        self.execute(request)
            .await?
            .json::<T>()
            .await
            .map_err(decode_error)
    }
}

#[async_trait]
impl AuthProvider for GoTrueProvider {
    #[instrument(skip_all, fields(email = %request.credentials.email))]
    async fn sign_up(&self, request: SignUpRequest) -> Result<AuthData, ErrorInfo> {
        let body = SignUpBody {
            email: &request.credentials.email,
            password: request.credentials.password.expose_secret(),
            data: request.metadata.as_ref(),
        };
        let builder = self
            .request(Method::POST, "signup")?
            .query(&[("redirect_to", request.email_redirect_to.as_str())])
            .json(&body);

        // Auto-confirmed projects answer with a session, others with the bare user.
        let value: serde_json::Value = self.send_json(builder).await?;
        if value.get("access_token").is_some() {
            let session: Session = serde_json::from_value(value).map_err(decode_error)?;
            self.store(Some(session.clone()));
            self.listeners
                .emit(AuthChangeEvent::SignedIn, Some(&session));
            return Ok(AuthData {
                user: Some(session.user.clone()),
                session: Some(session),
            });
        }

        let user: User = serde_json::from_value(value).map_err(decode_error)?;
        debug!(user_id = %user.id, "Sign up awaiting email confirmation");
        Ok(AuthData {
            user: Some(user),
            session: None,
        })
    }

    #[instrument(skip_all, fields(email = %credentials.email))]
    async fn sign_in_with_password(
        &self,
        credentials: Credentials,
    ) -> Result<AuthData, ErrorInfo> {
        let builder = self
            .request(Method::POST, "token")?
            .query(&[("grant_type", "password")])
            .json(&PasswordBody {
                email: &credentials.email,
                password: credentials.password.expose_secret(),
            });
        let session: Session = self.send_json(builder).await?;

        self.store(Some(session.clone()));
        self.listeners
            .emit(AuthChangeEvent::SignedIn, Some(&session));
        Ok(AuthData {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    #[instrument(skip_all)]
    async fn sign_out(&self) -> Result<(), ErrorInfo> {
        let outcome = match self.authed(Method::POST, "logout") {
            Ok(builder) => match builder.send().await {
                Ok(response) => match response.status() {
                    status if status.is_success() => Ok(()),
                    // Token already revoked or unknown: signed out either way.
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                        Ok(())
                    }
                    status => {
                        let body = response.text().await.unwrap_or_default();
                        Err(api_error(status, &body))
                    }
                },
                Err(e) => Err(fetch_error(e)),
            },
            Err(_) => Ok(()),
        };

        if let Err(err) = &outcome {
            warn!(error = %err, "Remote sign out failed, clearing local session");
        }
        self.store(None);
        self.listeners.emit(AuthChangeEvent::SignedOut, None);
        outcome
    }

    #[instrument(skip(self))]
    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), ErrorInfo> {
        let builder = self
            .request(Method::POST, "recover")?
            .query(&[("redirect_to", redirect_to)])
            .json(&EmailBody { email });
        self.execute(builder).await.map(|_| ())
    }

    #[instrument(skip_all)]
    async fn update_user(&self, attributes: UserAttributes) -> Result<User, ErrorInfo> {
        let body = UpdateUserBody {
            email: attributes.email.as_deref(),
            password: attributes.password.as_ref().map(|p| p.expose_secret()),
            data: attributes.data.as_ref(),
        };
        let builder = self.authed(Method::PUT, "user")?.json(&body);
        let user: User = self.send_json(builder).await?;

        if let Some(mut session) = self.current() {
            session.user = user.clone();
            self.store(Some(session.clone()));
            self.listeners
                .emit(AuthChangeEvent::UserUpdated, Some(&session));
        }
        Ok(user)
    }

    async fn get_session(&self) -> Result<Option<Session>, ErrorInfo> {
        match self.current() {
            Some(session) if session.expires_within(unix_now(), EXPIRY_MARGIN_SECS) => {
                debug!("Stored session expired, refreshing");
                self.refresh_session().await.map(Some)
            }
            session => Ok(session),
        }
    }

    #[instrument(skip_all)]
    async fn get_user(&self) -> Result<User, ErrorInfo> {
        let builder = self.authed(Method::GET, "user")?;
        self.send_json(builder).await
    }

    #[instrument(skip(self))]
    async fn resend(&self, kind: ResendType, email: &str) -> Result<(), ErrorInfo> {
        let builder = self.request(Method::POST, "resend")?.json(&ResendBody {
            kind: kind.as_str(),
            email,
        });
        self.execute(builder).await.map(|_| ())
    }

    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<String, ErrorInfo> {
        let mut url = self.endpoint("authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", provider.as_ref())
            .append_pair("redirect_to", redirect_to);
        Ok(url.into())
    }

    fn on_auth_state_change(&self, callback: AuthCallback) -> Subscription {
        self.listeners.subscribe(callback)
    }
}
