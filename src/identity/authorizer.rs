use tokio::sync::watch;
use tracing::{debug, info};

use super::session::SessionSnapshot;
use super::user::{RoleSet, User};
use crate::navigation::{Navigator, Route};

/// Access is granted iff a user is present and holds a known role contained in `required`.
/// An unrecognised role never matches.
pub fn check_access(user: Option<&User>, required: &RoleSet) -> bool {
    match user.and_then(|u| u.role.known()) {
        Some(role) => required.contains(role),
        None => false,
    }
}

/// Denial message of the screens reserved to maestro and supervisor users.
pub const STAFF_ONLY_MESSAGE: &str = "Esta sección solo está disponible para administradores y supervisores.";

/// Content of the denial notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSpec {
    pub title: String,
    pub message: String,
    pub button_text: String,
}

impl Default for AlertSpec {
    fn default() -> Self {
        Self {
            title: "Acceso Restringido".to_string(),
            message: "Esta sección es exclusiva para usuarios con un rol específico. Si crees que deberías tener acceso, por favor, contacta al soporte técnico.".to_string(),
            button_text: "Entendido".to_string(),
        }
    }
}

/// Per-screen access declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    pub required_roles: RoleSet,
    /// Destination after the alert is acknowledged. `None` means go back when possible.
    pub redirect: Option<Route>,
    pub alert: AlertSpec,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            required_roles: RoleSet::of(&[super::user::Role::Maestro]),
            redirect: Some(Route::DEFAULT_FALLBACK),
            alert: AlertSpec::default(),
        }
    }
}

impl AccessPolicy {
    /// Policy for a route's own role requirement; unrestricted routes admit every known role.
    /// Restricted routes use the staff-only denial message.
    pub fn for_route(route: Route) -> Self {
        let required = route.required_roles();
        if required.is_empty() {
            return Self { required_roles: RoleSet::all(), ..Self::default() };
        }
        Self { required_roles: required, ..Self::default() }.with_message(STAFF_ONLY_MESSAGE)
    }

    pub fn with_redirect(mut self, redirect: Option<Route>) -> Self {
        self.redirect = redirect;
        self
    }

    pub fn with_message<S: Into<String>>(mut self, message: S) -> Self {
        self.alert.message = message.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// `alert_raised` is true only on the evaluation that scheduled the notification.
    Denied { alert_raised: bool },
}

impl Access {
    pub fn is_granted(&self) -> bool { matches!(self, Access::Granted) }
}

/// Navigation performed when the user acknowledges the denial alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Reset(Route),
    Back,
}

/// Reactive access check for one screen instance.
///
/// `has_access` is derived from the live session on every call; `evaluate` and
/// `changed` additionally drive the one-shot alert. One alert per denial episode:
/// it is re-armed only after access has been granted again.
pub struct PermissionGuard {
    policy: AccessPolicy,
    session: watch::Receiver<SessionSnapshot>,
    alert_visible: bool,
    alert_raised: bool,
}

impl PermissionGuard {
    pub fn new(policy: AccessPolicy, session: watch::Receiver<SessionSnapshot>) -> Self {
        let mut guard = Self { policy, session, alert_visible: false, alert_raised: false };
        guard.evaluate();
        guard
    }

    pub fn for_route(route: Route, session: watch::Receiver<SessionSnapshot>) -> Self {
        Self::new(AccessPolicy::for_route(route), session)
    }

    pub fn policy(&self) -> &AccessPolicy { &self.policy }

    pub fn has_access(&self) -> bool {
        check_access(self.session.borrow().user(), &self.policy.required_roles)
    }

    /// Recompute access from the current session, raising the alert if this starts a denial.
    /// While the session is still loading access is denied but no alert is raised yet.
    pub fn evaluate(&mut self) -> Access {
        let (granted, loading) = {
            let snap = self.session.borrow_and_update();
            (check_access(snap.user(), &self.policy.required_roles), snap.is_loading())
        };
        if granted {
            self.alert_raised = false;
            self.alert_visible = false;
            return Access::Granted;
        }
        if self.alert_raised || loading {
            return Access::Denied { alert_raised: false };
        }
        self.alert_raised = true;
        self.alert_visible = true;
        info!(target: "session", "access denied; required={:?}", self.policy.required_roles.iter().map(|r| r.as_str()).collect::<Vec<_>>());
        Access::Denied { alert_raised: true }
    }

    /// Wait for the next session change and re-evaluate.
    pub async fn changed(&mut self) -> Result<Access, watch::error::RecvError> {
        self.session.changed().await?;
        Ok(self.evaluate())
    }

    /// Alert to show, if one is pending acknowledgment.
    pub fn pending_alert(&self) -> Option<&AlertSpec> {
        if self.alert_visible { Some(&self.policy.alert) } else { None }
    }

    /// Dismiss the alert and leave the screen: configured redirect, else back, else the
    /// default fallback route. Returns `None` when no alert was pending.
    pub fn acknowledge(&mut self, nav: &mut dyn Navigator) -> Option<Redirect> {
        if !self.alert_visible {
            return None;
        }
        self.alert_visible = false;
        let action = match self.policy.redirect {
            Some(route) => Redirect::Reset(route),
            None if nav.can_go_back() => Redirect::Back,
            None => Redirect::Reset(Route::DEFAULT_FALLBACK),
        };
        match action {
            Redirect::Reset(route) => nav.reset_to(route),
            Redirect::Back => nav.go_back(),
        }
        debug!(target: "session", "access alert acknowledged; {:?}", action);
        Some(action)
    }
}
