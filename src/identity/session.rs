use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::provider::{AuthProvider, AuthResponse, LoginCredentials, RegisterCredentials, RegisterResponse};
use super::user::User;
use crate::error::{AppError, AppResult};
use crate::storage::SessionStore;

/// Authenticated pairing of a user record and its bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Process started, stored session not read yet.
    Initializing,
    Authenticated(Session),
    Unauthenticated,
}

/// What subscribers observe on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: AuthState,
    pub login_in_flight: bool,
}

impl SessionSnapshot {
    /// Screens must not render while this is true.
    pub fn is_loading(&self) -> bool {
        self.login_in_flight || matches!(self.state, AuthState::Initializing)
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            AuthState::Authenticated(s) => Some(s),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&User> { self.session().map(|s| &s.user) }

    pub fn token(&self) -> Option<&str> { self.session().map(|s| s.token.as_str()) }

    pub fn is_authenticated(&self) -> bool { self.session().is_some() }
}

#[derive(Debug, Default)]
struct WriteState {
    /// Bumped by logout; a login that started under an older epoch is discarded.
    epoch: u64,
    logins_in_flight: usize,
}

struct Inner {
    store: SessionStore,
    auth: Arc<dyn AuthProvider>,
    tx: watch::Sender<SessionSnapshot>,
    writes: Mutex<WriteState>,
    logout_on_unauthorized: bool,
}

impl Inner {
    fn publish(&self, w: &WriteState, state: Option<AuthState>) {
        self.tx.send_modify(|snap| {
            if let Some(s) = state {
                snap.state = s;
            }
            snap.login_in_flight = w.logins_in_flight > 0;
        });
    }

    /// Redo a storage clear that failed earlier. Callers hold the write lock.
    fn retry_purge(&self) {
        if !self.store.purge_pending() {
            return;
        }
        match self.store.clear() {
            Ok(()) => info!(target: "session", "session.purge recovered after earlier failure"),
            Err(e) => warn!(target: "session", "session.purge still failing: {}", e),
        }
    }
}

/// Keeps `login_in_flight` accurate even if the login future is dropped mid-request.
struct LoginInFlight<'a> {
    inner: &'a Inner,
}

impl Drop for LoginInFlight<'_> {
    fn drop(&mut self) {
        let mut w = self.inner.writes.lock();
        w.logins_in_flight = w.logins_in_flight.saturating_sub(1);
        self.inner.publish(&w, None);
    }
}

/// Process-wide owner of the session. Cheap to clone; all clones share one state.
///
/// The session lives in a `watch` channel so guards and the navigation root can
/// subscribe; only this type ever writes to it or to the session store.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

impl SessionContext {
    /// New context in `Initializing`; call [`SessionContext::initialize`] to read storage.
    pub fn new(store: SessionStore, auth: Arc<dyn AuthProvider>, logout_on_unauthorized: bool) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot { state: AuthState::Initializing, login_in_flight: false });
        Self {
            inner: Arc::new(Inner { store, auth, tx, writes: Mutex::new(WriteState::default()), logout_on_unauthorized }),
        }
    }

    /// `new` followed by `initialize`.
    pub fn start(store: SessionStore, auth: Arc<dyn AuthProvider>, logout_on_unauthorized: bool) -> Self {
        let ctx = Self::new(store, auth, logout_on_unauthorized);
        ctx.initialize();
        ctx
    }

    /// Leaves `Initializing` using whatever the store holds. A missing, corrupt or
    /// unreadable stored session settles into `Unauthenticated`. No-op once initialized.
    pub fn initialize(&self) -> SessionSnapshot {
        let w = self.inner.writes.lock();
        if !matches!(self.inner.tx.borrow().state, AuthState::Initializing) {
            return self.snapshot();
        }
        self.inner.retry_purge();
        let next = match self.inner.store.load() {
            Some(session) => {
                info!(target: "session", "session.restore user_id={} role={}", session.user.id, session.user.role);
                AuthState::Authenticated(session)
            }
            None => {
                debug!(target: "session", "session.restore none");
                AuthState::Unauthenticated
            }
        };
        self.inner.publish(&w, Some(next));
        drop(w);
        self.snapshot()
    }

    pub fn snapshot(&self) -> SessionSnapshot { self.inner.tx.borrow().clone() }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> { self.inner.tx.subscribe() }

    pub fn user(&self) -> Option<User> { self.inner.tx.borrow().user().cloned() }

    pub fn token(&self) -> Option<String> { self.inner.tx.borrow().token().map(str::to_string) }

    pub fn is_loading(&self) -> bool { self.inner.tx.borrow().is_loading() }

    pub fn is_authenticated(&self) -> bool { self.inner.tx.borrow().is_authenticated() }

    pub fn session_store(&self) -> &SessionStore { &self.inner.store }

    /// True only when the server returned both a user and a token. Every failure,
    /// network and API errors included, yields false and leaves the state untouched.
    pub async fn login(&self, credentials: &LoginCredentials) -> bool {
        self.login_with_error(credentials).await.is_ok()
    }

    /// Same transition as [`SessionContext::login`], keeping the failure for display.
    pub async fn login_with_error(&self, credentials: &LoginCredentials) -> AppResult<Session> {
        let epoch = {
            let mut w = self.inner.writes.lock();
            w.logins_in_flight += 1;
            self.inner.publish(&w, None);
            w.epoch
        };
        let _in_flight = LoginInFlight { inner: &*self.inner };

        let outcome = self.inner.auth.login(credentials).await.and_then(AuthResponse::into_session);
        let session = match outcome {
            Ok(s) => s,
            Err(e) => {
                warn!(target: "session", "session.login failed email={} code={}", credentials.email, e.code_str());
                return Err(e);
            }
        };

        let w = self.inner.writes.lock();
        if w.epoch != epoch {
            info!(target: "session", "session.login discarded; logout happened while the request was in flight");
            return Err(AppError::auth("superseded", "La sesión se cerró durante el inicio de sesión."));
        }
        self.inner.retry_purge();
        if let Err(e) = self.inner.store.save(&session) {
            // the session stays live in memory; it just will not survive a restart
            error!(target: "session", "session.save failed: {}", e);
        }
        info!(target: "session", "session.login user_id={} role={}", session.user.id, session.user.role);
        self.inner.publish(&w, Some(AuthState::Authenticated(session.clone())));
        Ok(session)
    }

    /// Always ends `Unauthenticated` with storage cleared; idempotent and infallible.
    ///
    /// Storage is cleared before memory. When the clear fails the store withholds the
    /// token and the stored session until a clear succeeds, and the context retries it
    /// ahead of the next initialize, login or logout.
    pub fn logout(&self) {
        let mut w = self.inner.writes.lock();
        self.logout_locked(&mut w);
    }

    fn logout_locked(&self, w: &mut WriteState) {
        w.epoch += 1;
        if let Err(e) = self.inner.store.clear() {
            error!(target: "session", "session.logout storage clear failed; will retry: {}", e);
        }
        info!(target: "session", "session.logout");
        self.inner.publish(w, Some(AuthState::Unauthenticated));
    }

    pub async fn register(&self, credentials: &RegisterCredentials) -> AppResult<RegisterResponse> {
        let res = self.inner.auth.register(credentials).await;
        match &res {
            Ok(r) => info!(target: "session", "register email={} success={}", credentials.email, r.success),
            Err(e) => warn!(target: "session", "register failed email={} code={}", credentials.email, e.code_str()),
        }
        res
    }

    /// Fetch the profile for the current token and, when it is the same user, replace
    /// the live record so role changes reach every subscriber.
    pub async fn refresh_profile(&self) -> AppResult<User> {
        let user = self.inner.auth.fetch_profile().await?;
        let w = self.inner.writes.lock();
        let current = self.inner.tx.borrow().session().cloned();
        if let Some(mut session) = current {
            if session.user.id == user.id && session.user != user {
                session.user = user.clone();
                if let Err(e) = self.inner.store.save(&session) {
                    error!(target: "session", "session.save failed after profile refresh: {}", e);
                }
                info!(target: "session", "session.profile user_id={} role={}", user.id, user.role);
                self.inner.publish(&w, Some(AuthState::Authenticated(session)));
            }
        }
        Ok(user)
    }

    /// Pass-through for API results. `sent_token` is the token the request carried,
    /// read from the session store just before sending. A 401 ends the session when
    /// the policy says so and that token still belongs to the live session; a 401 for a
    /// session that has since been replaced is ignored.
    pub fn observe<T>(&self, sent_token: Option<&str>, res: AppResult<T>) -> AppResult<T> {
        if !matches!(&res, Err(e) if e.is_unauthorized()) {
            return res;
        }
        if !self.inner.logout_on_unauthorized {
            warn!(target: "session", "401 from API; session kept");
            return res;
        }
        let mut w = self.inner.writes.lock();
        let current = self.inner.tx.borrow().token().map(str::to_string);
        match (current.as_deref(), sent_token) {
            (Some(live), Some(sent)) if live == sent => {
                warn!(target: "session", "401 from API; ending session");
                self.logout_locked(&mut w);
            }
            (Some(_), _) => warn!(target: "session", "401 for a replaced session; ignored"),
            (None, _) => debug!(target: "session", "401 with no session"),
        }
        res
    }
}
