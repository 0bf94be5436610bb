//! Sign-in against the external authentication service.
//!
//! [`LoginFlow`] performs one request per submission. It never retries, and
//! it only touches the session store after the service reports success. A
//! session write that fails halfway is rolled back to what was stored before.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::session::SessionStore;

pub const DASHBOARD_ROUTE: &str = "/dashboard";
pub const LOGIN_FAILED: &str = "Login failed";
pub const GENERIC_FAILURE: &str = "Something went wrong.";

const EMAIL_REQUIRED: &str = "Email is required.";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("network request failed: {0}")]
    Network(String),
    #[error("authentication service rejected the request with status {status}")]
    Rejected { status: u16, message: Option<String> },
    #[error("invalid authentication response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    /// Server message first, then the error's own description, then a
    /// generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Rejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            AuthError::Rejected { .. } => self.to_string(),
            AuthError::Network(detail) | AuthError::InvalidResponse(detail)
                if !detail.trim().is_empty() =>
            {
                self.to_string()
            }
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

/// Login form input.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Credentials {
    #[serde(default)]
    #[validate(email(message = "Invalid email format."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
    #[serde(default, rename = "isRemember")]
    pub remember: bool,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            remember: false,
        }
    }

    pub fn remember(mut self, remember: bool) -> Self {
        self.remember = remember;
        self
    }

    /// Trims the email and checks the fields in form order, reporting the
    /// first problem found.
    pub fn check(&self) -> Result<LoginRequest, String> {
        let normalized = Credentials {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            remember: self.remember,
        };
        if normalized.email.is_empty() {
            return Err(EMAIL_REQUIRED.to_string());
        }
        if let Err(errors) = normalized.validate() {
            let field_errors = errors.field_errors();
            for field in ["email", "password"] {
                if let Some(err) = field_errors.get(field).and_then(|list| list.first()) {
                    return Err(err
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid")));
                }
            }
        }
        Ok(LoginRequest {
            email: normalized.email,
            password: normalized.password,
            is_remember: normalized.remember,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(rename = "isRemember")]
    pub is_remember: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoginReply {
    #[serde(default)]
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, rename = "userData", skip_serializing_if = "Option::is_none")]
    pub user_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LoginReply {
    pub fn success(token: impl Into<String>, user_data: Option<Value>) -> Self {
        Self {
            status: true,
            token: Some(token.into()),
            user_data,
            message: None,
        }
    }

    pub fn failure(message: Option<String>) -> Self {
        Self {
            status: false,
            token: None,
            user_data: None,
            message,
        }
    }
}

/// The service may answer with the reply itself or wrapped in `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplyEnvelope {
    Wrapped { data: LoginReply },
    Bare(LoginReply),
}

impl ReplyEnvelope {
    fn into_reply(self) -> LoginReply {
        match self {
            ReplyEnvelope::Wrapped { data } => data,
            ReplyEnvelope::Bare(reply) => reply,
        }
    }
}

pub fn parse_reply(body: &[u8]) -> Result<LoginReply, AuthError> {
    serde_json::from_slice::<ReplyEnvelope>(body)
        .map(ReplyEnvelope::into_reply)
        .map_err(|err| AuthError::InvalidResponse(err.to_string()))
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginReply, AuthError>;
}

pub struct HttpAuthService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AuthError::Network(err.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn login_url(&self) -> String {
        format!("{}/auth/login", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl AuthService for HttpAuthService {
    async fn login(&self, request: &LoginRequest) -> Result<LoginReply, AuthError> {
        let url = self.login_url();
        debug!(%url, "sending login request");
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|err| AuthError::Network(err.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| AuthError::Network(err.to_string()))?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|body| body.message.or(body.error));
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        parse_reply(&body)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Authenticated {
        redirect: &'static str,
        user: Option<Value>,
    },
    Failed {
        message: String,
    },
}

impl LoginOutcome {
    fn failed(message: impl Into<String>) -> Self {
        LoginOutcome::Failed {
            message: message.into(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, LoginOutcome::Authenticated { .. })
    }
}

#[derive(Clone)]
pub struct LoginFlow {
    service: Arc<dyn AuthService>,
    session: SessionStore,
}

impl LoginFlow {
    pub fn new(service: Arc<dyn AuthService>, session: SessionStore) -> Self {
        Self { service, session }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> LoginOutcome {
        let request = match credentials.check() {
            Ok(request) => request,
            Err(message) => {
                debug!(%message, "login form rejected");
                return LoginOutcome::failed(message);
            }
        };

        let reply = match self.service.login(&request).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "login request failed");
                return LoginOutcome::failed(err.user_message());
            }
        };

        let token = match (reply.status, reply.token.as_deref()) {
            (true, Some(token)) if !token.is_empty() => token,
            _ => {
                let message = reply
                    .message
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| LOGIN_FAILED.to_string());
                info!(%message, "login refused");
                return LoginOutcome::failed(message);
            }
        };

        let previous = match self.snapshot() {
            Ok(previous) => previous,
            Err(err) => {
                warn!(error = %err, "failed to read current session");
                return LoginOutcome::failed(GENERIC_FAILURE);
            }
        };
        if let Err(err) = self.persist(token, reply.user_data.clone()) {
            warn!(error = %err, "failed to persist session");
            if let Err(err) = self.restore(previous) {
                warn!(error = %err, "failed to roll back partial session");
            }
            return LoginOutcome::failed(GENERIC_FAILURE);
        }
        info!(remember = request.is_remember, "login succeeded");
        LoginOutcome::Authenticated {
            redirect: DASHBOARD_ROUTE,
            user: reply.user_data,
        }
    }

    fn snapshot(&self) -> crate::errors::Result<(Option<String>, Option<Value>)> {
        Ok((self.session.token()?, self.session.user()?))
    }

    fn restore(
        &self,
        (token, user): (Option<String>, Option<Value>),
    ) -> crate::errors::Result<()> {
        self.session.clear()?;
        if let Some(user) = user {
            self.session.save_user(user)?;
        }
        if let Some(token) = token {
            self.session.save_token(&token)?;
        }
        Ok(())
    }

    /// The token goes in last so a half-written session never looks signed in.
    fn persist(&self, token: &str, user: Option<Value>) -> crate::errors::Result<()> {
        if let Some(user) = user {
            self.session.save_user(user)?;
        }
        self.session.save_token(token)
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::errors::RegistryError;
    use crate::session::{KeyValueStore, MemoryStore, USER_KEY};

    /// Accepts every key except `user`, as if the disk filled up mid-write.
    #[derive(Default)]
    struct UserWriteFails {
        inner: MemoryStore,
    }

    impl KeyValueStore for UserWriteFails {
        fn get(&self, key: &str) -> crate::errors::Result<Option<Value>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: Value) -> crate::errors::Result<()> {
            if key == USER_KEY {
                return Err(RegistryError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> crate::errors::Result<()> {
            self.inner.remove(key)
        }
    }

    struct ScriptedService {
        reply: Mutex<Option<Result<LoginReply, AuthError>>>,
        calls: Mutex<Vec<LoginRequest>>,
    }

    impl ScriptedService {
        fn answering(reply: Result<LoginReply, AuthError>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AuthService for ScriptedService {
        async fn login(&self, request: &LoginRequest) -> Result<LoginReply, AuthError> {
            self.calls.lock().push(request.clone());
            self.reply
                .lock()
                .take()
                .unwrap_or_else(|| Err(AuthError::Network("no scripted reply".to_string())))
        }
    }

    fn flow(service: Arc<ScriptedService>) -> LoginFlow {
        LoginFlow::new(service, SessionStore::new(Arc::new(MemoryStore::new())))
    }

    fn valid() -> Credentials {
        Credentials::new(" ops@example.com ", "hunter22").remember(true)
    }

    #[test]
    fn check_reports_fields_in_form_order() {
        assert_eq!(
            Credentials::new("   ", "").check().unwrap_err(),
            "Email is required."
        );
        assert_eq!(
            Credentials::new("not-an-email", "").check().unwrap_err(),
            "Invalid email format."
        );
        assert_eq!(
            Credentials::new("ops@example.com", "").check().unwrap_err(),
            "Password is required."
        );
        let request = valid().check().unwrap();
        assert_eq!(request.email, "ops@example.com");
        assert!(request.is_remember);
    }

    #[test]
    fn parse_reply_accepts_wrapped_and_bare_bodies() {
        let wrapped = parse_reply(br#"{"data":{"status":true,"token":"t"}}"#).unwrap();
        assert_eq!(wrapped.token.as_deref(), Some("t"));
        let bare = parse_reply(br#"{"status":false,"message":"nope"}"#).unwrap();
        assert!(!bare.status);
        assert_eq!(bare.message.as_deref(), Some("nope"));
        assert!(matches!(
            parse_reply(b"<html>"),
            Err(AuthError::InvalidResponse(_))
        ));
    }

    #[test]
    fn user_message_falls_back_in_order() {
        let server = AuthError::Rejected {
            status: 401,
            message: Some("Invalid credentials".to_string()),
        };
        assert_eq!(server.user_message(), "Invalid credentials");
        let network = AuthError::Network("connection refused".to_string());
        assert_eq!(
            network.user_message(),
            "network request failed: connection refused"
        );
        let silent = AuthError::Rejected {
            status: 500,
            message: None,
        };
        assert_eq!(
            silent.user_message(),
            "authentication service rejected the request with status 500"
        );
        assert_eq!(
            AuthError::Network(String::new()).user_message(),
            GENERIC_FAILURE
        );
    }

    #[tokio::test]
    async fn success_persists_token_and_user() {
        let service = ScriptedService::answering(Ok(LoginReply::success(
            "tok-1",
            Some(json!({ "name": "Ops" })),
        )));
        let flow = flow(service.clone());
        let outcome = flow.sign_in(&valid()).await;
        assert_eq!(
            outcome,
            LoginOutcome::Authenticated {
                redirect: DASHBOARD_ROUTE,
                user: Some(json!({ "name": "Ops" })),
            }
        );
        assert_eq!(flow.session().token().unwrap().as_deref(), Some("tok-1"));
        assert_eq!(flow.session().user().unwrap(), Some(json!({ "name": "Ops" })));
        assert_eq!(service.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn success_without_user_keeps_user_slot_empty() {
        let flow = flow(ScriptedService::answering(Ok(LoginReply::success("tok-2", None))));
        assert!(flow.sign_in(&valid()).await.is_authenticated());
        assert_eq!(flow.session().user().unwrap(), None);
    }

    #[tokio::test]
    async fn refusal_uses_server_message_or_default() {
        let flow_with_message = flow(ScriptedService::answering(Ok(LoginReply::failure(Some(
            "Account locked".to_string(),
        )))));
        assert_eq!(
            flow_with_message.sign_in(&valid()).await,
            LoginOutcome::Failed {
                message: "Account locked".to_string()
            }
        );

        let flow_silent = flow(ScriptedService::answering(Ok(LoginReply::failure(None))));
        assert_eq!(
            flow_silent.sign_in(&valid()).await,
            LoginOutcome::Failed {
                message: LOGIN_FAILED.to_string()
            }
        );
        assert_eq!(flow_silent.session().token().unwrap(), None);
    }

    #[tokio::test]
    async fn status_true_without_token_is_a_failure() {
        let reply = LoginReply {
            status: true,
            ..LoginReply::default()
        };
        let flow = flow(ScriptedService::answering(Ok(reply)));
        assert!(!flow.sign_in(&valid()).await.is_authenticated());
        assert_eq!(flow.session().token().unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_service() {
        let service = ScriptedService::answering(Ok(LoginReply::success("tok", None)));
        let flow = flow(service.clone());
        let outcome = flow.sign_in(&Credentials::new("bad", "pw")).await;
        assert_eq!(
            outcome,
            LoginOutcome::Failed {
                message: "Invalid email format.".to_string()
            }
        );
        assert!(service.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn service_errors_are_reported_once_without_retry() {
        let service = ScriptedService::answering(Err(AuthError::Rejected {
            status: 401,
            message: Some("Wrong password".to_string()),
        }));
        let flow = flow(service.clone());
        assert_eq!(
            flow.sign_in(&valid()).await,
            LoginOutcome::Failed {
                message: "Wrong password".to_string()
            }
        );
        assert_eq!(service.calls.lock().len(), 1);
        assert_eq!(flow.session().token().unwrap(), None);
    }

    #[tokio::test]
    async fn failed_user_write_keeps_previous_session() {
        let backing = Arc::new(UserWriteFails::default());
        backing.set("token", json!("stale")).unwrap();
        let service = ScriptedService::answering(Ok(LoginReply::success(
            "tok",
            Some(json!({ "name": "Ops" })),
        )));
        let flow = LoginFlow::new(service, SessionStore::new(backing.clone()));

        let outcome = flow.sign_in(&valid()).await;
        assert_eq!(
            outcome,
            LoginOutcome::Failed {
                message: GENERIC_FAILURE.to_string()
            }
        );
        assert_eq!(flow.session().token().unwrap().as_deref(), Some("stale"));
        assert_eq!(flow.session().user().unwrap(), None);
    }

    #[test]
    fn credentials_with_missing_fields_still_reach_check() {
        let no_password: Credentials =
            serde_json::from_value(json!({ "email": "ops@example.com" })).unwrap();
        assert_eq!(no_password.check().unwrap_err(), "Password is required.");
        let empty: Credentials = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.check().unwrap_err(), "Email is required.");
    }
}
