//! Session store: who is signed in.
//!
//! # Operations
//!
//! - [`SessionStore::login`] checks credentials, then persists the user and
//!   token (both or neither).
//! - [`SessionStore::logout`] always clears the local session, even when the
//!   remote sign-out fails.
//! - [`SessionStore::restore_session`] rebuilds the session from storage,
//!   discarding any incomplete or invalid record.
//!
//! # Sequencing
//!
//! Login owns the `login` flag; restore and logout share the
//! `session_check` flag. All three race for `user`. Each operation takes a
//! ticket for its flag and one for `user` when it begins:
//!
//! - if its `user` ticket is still the latest, the full outcome is applied;
//! - otherwise, if its flag ticket is still the latest, only the flag settles;
//! - otherwise the outcome is dropped.
//!
//! Dropped or partial completions return [`StoreError::Superseded`].
//! Storage access is serialized, and a login whose `user` ticket is stale
//! by the time it would persist writes nothing.

use std::sync::Arc;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tracing::{error, info, instrument, warn};

use itemdeck_core::{FetchStatus, SessionToken, User};

use super::sequence::RequestSequence;
use crate::api::{AuthApi, LoginGrant};
use crate::error::{
    Result, StoreError, add_breadcrumb, clear_sentry_user, messages, set_sentry_user,
};
use crate::storage::{KeyValueStore, StorageError, keys};

/// Snapshot of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// The signed-in user.
    pub user: Option<User>,
    /// Restore/logout status.
    pub session_check: FetchStatus,
    /// Login form status.
    pub login: FetchStatus,
    /// Last user-facing error.
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            // Front ends show a splash until the first restore settles.
            session_check: FetchStatus::Loading,
            login: FetchStatus::Idle,
            error: None,
        }
    }
}

impl SessionState {
    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Whether a restore or logout is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.session_check.is_loading()
    }

    /// Whether a login is in flight.
    #[must_use]
    pub const fn is_login_loading(&self) -> bool {
        self.login.is_loading()
    }
}

/// Transitions of [`SessionState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoginStarted,
    LoginSucceeded(User),
    LoginFailed(String),
    /// Settle the login flag without touching the user.
    LoginSettled(FetchStatus),
    LogoutStarted,
    LoggedOut,
    /// Local session was reset but storage could not be cleared.
    LogoutFailed(String),
    RestoreStarted,
    Restored(Option<User>),
    RestoreFailed(String),
    /// Settle the session-check flag without touching the user.
    SessionCheckSettled(FetchStatus),
    ErrorCleared,
    LoadingSet(bool),
}

/// Apply `event` to `state`.
pub fn reduce(state: &mut SessionState, event: SessionEvent) {
    match event {
        SessionEvent::LoginStarted => {
            state.login = FetchStatus::Loading;
            state.error = None;
        }
        SessionEvent::LoginSucceeded(user) => {
            state.user = Some(user);
            state.login = FetchStatus::Succeeded;
            state.error = None;
        }
        SessionEvent::LoginFailed(message) => {
            state.user = None;
            state.login = FetchStatus::Failed;
            state.error = Some(message);
        }
        SessionEvent::LoginSettled(status) => state.login = status,
        SessionEvent::LogoutStarted => state.session_check = FetchStatus::Loading,
        SessionEvent::LoggedOut => {
            state.user = None;
            state.session_check = FetchStatus::Succeeded;
            state.error = None;
        }
        SessionEvent::LogoutFailed(message) => {
            state.user = None;
            state.session_check = FetchStatus::Failed;
            state.error = Some(message);
        }
        SessionEvent::RestoreStarted => {
            state.session_check = FetchStatus::Loading;
            state.error = None;
        }
        SessionEvent::Restored(user) => {
            state.user = user;
            state.session_check = FetchStatus::Succeeded;
            state.error = None;
        }
        SessionEvent::RestoreFailed(message) => {
            state.user = None;
            state.session_check = FetchStatus::Failed;
            state.error = Some(message);
        }
        SessionEvent::SessionCheckSettled(status) => state.session_check = status,
        SessionEvent::ErrorCleared => state.error = None,
        SessionEvent::LoadingSet(loading) => {
            state.session_check = if loading {
                FetchStatus::Loading
            } else {
                FetchStatus::Idle
            };
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Ticket {
    flag: u64,
    user: u64,
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    Login,
    SessionCheck,
}

/// Session store over a storage backend `S` and auth service `A`.
pub struct SessionStore<S, A> {
    inner: Arc<SessionStoreInner<S, A>>,
}

struct SessionStoreInner<S, A> {
    storage: S,
    auth: A,
    state: watch::Sender<SessionState>,
    login_seq: RequestSequence,
    check_seq: RequestSequence,
    user_seq: RequestSequence,
    storage_lock: Mutex<()>,
}

impl<S, A> Clone for SessionStore<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: KeyValueStore, A: AuthApi> SessionStore<S, A> {
    /// Create a store in its initial state (`session_check` loading).
    #[must_use]
    pub fn new(storage: S, auth: A) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                storage,
                auth,
                state: watch::Sender::new(SessionState::default()),
                login_seq: RequestSequence::default(),
                check_seq: RequestSequence::default(),
                user_seq: RequestSequence::default(),
                storage_lock: Mutex::new(()),
            }),
        }
    }

    /// The storage backend.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.inner.storage
    }

    // =========================================================================
    // State access
    // =========================================================================

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receive every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// The signed-in user.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    /// Whether a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Whether a restore or logout is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading()
    }

    /// Whether a login is in flight.
    #[must_use]
    pub fn is_login_loading(&self) -> bool {
        self.inner.state.borrow().is_login_loading()
    }

    /// Last user-facing error.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    // =========================================================================
    // Plain reducers
    // =========================================================================

    /// Clear the last error.
    pub fn clear_error(&self) {
        self.apply(SessionEvent::ErrorCleared);
    }

    /// Force the session-check flag.
    pub fn set_loading(&self, loading: bool) {
        self.apply(SessionEvent::LoadingSet(loading));
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Rejected` with the recorded error message, or
    /// `StoreError::Superseded` if a newer session operation began first.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User> {
        let ticket = self.begin(Flag::Login, SessionEvent::LoginStarted);

        match self.authenticate(email, password, ticket).await {
            Ok(user) => {
                let applied = self.complete(
                    Flag::Login,
                    ticket,
                    SessionEvent::LoginSucceeded(user.clone()),
                    SessionEvent::LoginSettled(FetchStatus::Succeeded),
                );
                if !applied {
                    return Err(StoreError::Superseded);
                }
                set_sentry_user(&user);
                info!(user_id = %user.id, "User logged in");
                Ok(user)
            }
            Err(StoreError::Rejected(message)) => {
                add_breadcrumb("session", "Login failed", Some(&[("reason", message.as_str())]));
                let applied = self.complete(
                    Flag::Login,
                    ticket,
                    SessionEvent::LoginFailed(message.clone()),
                    SessionEvent::LoginSettled(FetchStatus::Failed),
                );
                if applied {
                    Err(StoreError::Rejected(message))
                } else {
                    Err(StoreError::Superseded)
                }
            }
            Err(StoreError::Superseded) => {
                self.complete(
                    Flag::Login,
                    ticket,
                    SessionEvent::LoginSettled(FetchStatus::Idle),
                    SessionEvent::LoginSettled(FetchStatus::Idle),
                );
                Err(StoreError::Superseded)
            }
        }
    }

    /// Sign out.
    ///
    /// The local session and both persisted keys are cleared whatever the
    /// remote service answers.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Rejected` if the persisted keys could not be
    /// removed (the in-memory session is reset anyway), or
    /// `StoreError::Superseded` if a newer session operation began first.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let ticket = self.begin(Flag::SessionCheck, SessionEvent::LogoutStarted);

        if let Err(e) = self.inner.auth.logout().await {
            warn!(error = %e, "Remote logout failed, clearing local session anyway");
            add_breadcrumb("session", "Remote logout failed", None);
        }

        let cleared = {
            let _guard = self.inner.storage_lock.lock().await;
            if !self.inner.user_seq.is_current(ticket.user) {
                warn!("Logout superseded before clearing persisted session");
                self.complete(
                    Flag::SessionCheck,
                    ticket,
                    SessionEvent::LoggedOut,
                    SessionEvent::SessionCheckSettled(FetchStatus::Succeeded),
                );
                return Err(StoreError::Superseded);
            }
            self.clear_persisted().await
        };
        clear_sentry_user();

        match cleared {
            Ok(()) => {
                if self.complete(
                    Flag::SessionCheck,
                    ticket,
                    SessionEvent::LoggedOut,
                    SessionEvent::SessionCheckSettled(FetchStatus::Succeeded),
                ) {
                    info!("User logged out");
                    Ok(())
                } else {
                    Err(StoreError::Superseded)
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to clear persisted session");
                add_breadcrumb("session", "Logout failed", None);
                let message = messages::LOGOUT_FAILED.to_string();
                if self.complete(
                    Flag::SessionCheck,
                    ticket,
                    SessionEvent::LogoutFailed(message.clone()),
                    SessionEvent::SessionCheckSettled(FetchStatus::Failed),
                ) {
                    Err(StoreError::Rejected(message))
                } else {
                    Err(StoreError::Superseded)
                }
            }
        }
    }

    /// Rebuild the session from storage.
    ///
    /// Returns the restored user, or `None` when there is no valid
    /// persisted session (any partial or invalid record is removed).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Rejected` if storage could not be read, or
    /// `StoreError::Superseded` if a newer session operation began first.
    #[instrument(skip(self))]
    pub async fn restore_session(&self) -> Result<Option<User>> {
        let ticket = self.begin(Flag::SessionCheck, SessionEvent::RestoreStarted);

        let loaded = {
            let _guard = self.inner.storage_lock.lock().await;
            self.load_persisted().await
        };

        match loaded {
            Ok(user) => {
                if !self.complete(
                    Flag::SessionCheck,
                    ticket,
                    SessionEvent::Restored(user.clone()),
                    SessionEvent::SessionCheckSettled(FetchStatus::Succeeded),
                ) {
                    return Err(StoreError::Superseded);
                }
                match &user {
                    Some(user) => {
                        set_sentry_user(user);
                        info!(user_id = %user.id, "Session restored");
                    }
                    None => info!("No persisted session"),
                }
                Ok(user)
            }
            Err(e) => {
                error!(error = %e, "Failed to read persisted session");
                add_breadcrumb("session", "Session restore failed", None);
                let message = messages::CHECK_AUTH_FAILED.to_string();
                if self.complete(
                    Flag::SessionCheck,
                    ticket,
                    SessionEvent::RestoreFailed(message.clone()),
                    SessionEvent::SessionCheckSettled(FetchStatus::Failed),
                ) {
                    Err(StoreError::Rejected(message))
                } else {
                    Err(StoreError::Superseded)
                }
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn apply(&self, event: SessionEvent) {
        self.inner.state.send_modify(|state| reduce(state, event));
    }

    fn sequence(&self, flag: Flag) -> &RequestSequence {
        match flag {
            Flag::Login => &self.inner.login_seq,
            Flag::SessionCheck => &self.inner.check_seq,
        }
    }

    fn begin(&self, flag: Flag, event: SessionEvent) -> Ticket {
        let mut ticket = Ticket { flag: 0, user: 0 };
        self.inner.state.send_modify(|state| {
            ticket = Ticket {
                flag: self.sequence(flag).issue(),
                user: self.inner.user_seq.issue(),
            };
            reduce(state, event);
        });
        ticket
    }

    /// Apply a completion. Returns whether the full `event` was applied.
    fn complete(
        &self,
        flag: Flag,
        ticket: Ticket,
        event: SessionEvent,
        settle: SessionEvent,
    ) -> bool {
        let mut applied = false;
        self.inner.state.send_if_modified(|state| {
            if self.inner.user_seq.is_current(ticket.user) {
                reduce(state, event);
                applied = true;
                true
            } else if self.sequence(flag).is_current(ticket.flag) {
                reduce(state, settle);
                true
            } else {
                false
            }
        });
        applied
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
        ticket: Ticket,
    ) -> Result<User> {
        let grant = self.inner.auth.login(email, password).await.map_err(|e| {
            warn!(error = %e, "Login rejected");
            StoreError::Rejected(e.user_message().to_string())
        })?;

        let _guard = self.inner.storage_lock.lock().await;
        if !self.inner.user_seq.is_current(ticket.user) {
            warn!("Login superseded before persisting session");
            return Err(StoreError::Superseded);
        }

        self.persist(&grant).await.map_err(|e| {
            error!(error = %e, "Failed to persist session");
            StoreError::Rejected(messages::LOGIN_FAILED.to_string())
        })?;

        Ok(grant.user)
    }

    /// Write user then token; if the token write fails, remove the user.
    async fn persist(&self, grant: &LoginGrant) -> std::result::Result<(), StorageError> {
        let storage = &self.inner.storage;
        let user_json =
            serde_json::to_string(&grant.user).map_err(|e| StorageError::Corrupt(e.to_string()))?;

        storage.set(keys::USER, &user_json).await?;
        if let Err(e) = storage.set(keys::AUTH_TOKEN, grant.token.as_str()).await {
            if let Err(rollback) = storage.remove(keys::USER).await {
                error!(error = %rollback, "Failed to roll back persisted user");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Remove both keys, attempting the second even if the first fails.
    async fn clear_persisted(&self) -> std::result::Result<(), StorageError> {
        let storage = &self.inner.storage;
        let user = storage.remove(keys::USER).await;
        let token = storage.remove(keys::AUTH_TOKEN).await;
        user.and(token)
    }

    async fn load_persisted(&self) -> std::result::Result<Option<User>, StorageError> {
        let storage = &self.inner.storage;
        let user = storage.get(keys::USER).await?;
        let token = storage.get(keys::AUTH_TOKEN).await?;

        let (user_json, token) = match (user, token) {
            (None, None) => return Ok(None),
            (Some(user_json), Some(token)) => (user_json, token),
            (user, token) => {
                warn!(
                    has_user = user.is_some(),
                    has_token = token.is_some(),
                    "Discarding incomplete persisted session"
                );
                self.clear_persisted().await?;
                return Ok(None);
            }
        };

        if !SessionToken::is_valid_str(&token) {
            warn!("Discarding persisted session with invalid token");
            self.clear_persisted().await?;
            return Ok(None);
        }

        match serde_json::from_str::<User>(&user_json) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted user");
                self.clear_persisted().await?;
                Ok(None)
            }
        }
    }
}
