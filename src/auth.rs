//! Auth context: the one owner of the logged-in session.
//!
//! State lives in a `watch` channel so any number of views can observe it.
//! A view stops listening by dropping its receiver.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{ClientError, ClientResult};
use crate::session::{Session, SessionStore, User};
use crate::validation::{validate_registration, Registration};

pub const LOGIN_FAILED: &str = "Login failed";
pub const REGISTRATION_FAILED: &str = "Registration failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Storage has not been read yet.
    Loading,
    Ready(Option<Session>),
}

impl AuthState {
    pub fn is_loading(&self) -> bool {
        matches!(self, AuthState::Loading)
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Ready(session) => session.as_ref(),
            AuthState::Loading => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some_and(|s| !s.token.is_empty())
    }
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> ClientResult<Session>;

    async fn register(&self, name: &str, email: &str, password: &str) -> ClientResult<()>;
}

pub struct AuthContext {
    api: Arc<dyn AuthApi>,
    store: Arc<dyn SessionStore>,
    state: watch::Sender<AuthState>,
    last_error: Mutex<Option<String>>,
}

impl AuthContext {
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn SessionStore>) -> Self {
        let (state, _) = watch::channel(AuthState::Loading);
        Self {
            api,
            store,
            state,
            last_error: Mutex::new(None),
        }
    }

    /// Reads the persisted session once. Later calls are no-ops.
    pub fn hydrate(&self) -> AuthState {
        if !self.state.borrow().is_loading() {
            return self.current();
        }
        let session = match self.store.load_session() {
            Ok(session) => session,
            Err(e) => {
                warn!("Could not read stored session, starting logged out: {}", e);
                None
            }
        };
        match &session {
            Some(s) => info!(user_id = %s.user.id, "Restored session"),
            None => info!("No stored session"),
        }
        self.state.send_if_modified(|state| {
            if state.is_loading() {
                *state = AuthState::Ready(session);
                true
            } else {
                false
            }
        });
        self.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<User> {
        let result = self.try_login(email, password).await;
        self.record(&result, LOGIN_FAILED);
        result
    }

    async fn try_login(&self, email: &str, password: &str) -> ClientResult<User> {
        let session = self.api.login(email.trim(), password).await?;
        if session.token.trim().is_empty() {
            return Err(ClientError::Rejected(LOGIN_FAILED.to_string()));
        }
        self.store.save_session(&session)?;
        info!(user_id = %session.user.id, "Logged in");
        let user = session.user.clone();
        self.state.send_replace(AuthState::Ready(Some(session)));
        Ok(user)
    }

    /// Creates the account, then logs in with the same credentials.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> ClientResult<User> {
        if let Err(e) = self.api.register(name.trim(), email.trim(), password).await {
            let result = Err(e);
            self.record(&result, REGISTRATION_FAILED);
            return result;
        }
        info!("Registered {}", email.trim());
        self.login(email, password).await
    }

    /// Validates the signup form before anything goes over the wire.
    pub async fn submit_registration(&self, form: &Registration<'_>) -> ClientResult<User> {
        validate_registration(form).into_result()?;
        self.register(form.name, form.email, form.password).await
    }

    /// Local only. Storage failures are logged; the in-memory session is cleared regardless.
    pub fn logout(&self) {
        if let Err(e) = self.store.clear_session() {
            warn!("Failed to clear stored session: {}", e);
        }
        self.clear_error();
        self.state.send_replace(AuthState::Ready(None));
        info!("Logged out");
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    pub fn user(&self) -> Option<User> {
        self.session().map(|s| s.user)
    }

    pub fn token(&self) -> Option<String> {
        self.session().map(|s| s.token)
    }

    pub fn require_session(&self) -> ClientResult<Session> {
        self.session().ok_or(ClientError::Unauthenticated)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn clear_error(&self) {
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn record<T>(&self, result: &ClientResult<T>, fallback: &str) {
        let message = match result {
            Ok(_) => None,
            Err(e) => {
                let msg = match e {
                    ClientError::Network(_) | ClientError::Decode(_) => fallback.to_string(),
                    other => other.to_string(),
                };
                warn!("{}: {}", fallback, e);
                Some(msg)
            }
        };
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = message;
    }
}
