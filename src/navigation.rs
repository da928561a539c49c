//! Route catalogue and the root decision of which screen graph to mount.

use std::fmt;

use crate::identity::{Role, RoleSet, SessionSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Contacts,
    Resources,
    ContactForm,
    ResourceForm,
    Register,
}

impl Route {
    /// Where denied users land when a screen does not configure its own redirect.
    pub const DEFAULT_FALLBACK: Route = Route::Contacts;

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::Contacts => "Contacts",
            Route::Resources => "Resources",
            Route::ContactForm => "ContactForm",
            Route::ResourceForm => "ResourceForm",
            Route::Register => "Register",
        }
    }

    /// Roles a user needs to open the route; empty means any authenticated user.
    pub fn required_roles(&self) -> RoleSet {
        match self {
            Route::ContactForm | Route::ResourceForm | Route::Register => RoleSet::of(&[Role::Maestro, Role::Supervisor]),
            Route::Login | Route::Contacts | Route::Resources => RoleSet::empty(),
        }
    }

    pub fn is_restricted(&self) -> bool { !self.required_roles().is_empty() }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Screen graph the root mounts for a given session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootGraph {
    /// Splash; nothing else renders while the session is loading.
    Loading,
    /// Login stack.
    Auth,
    /// Drawer with the main screens, starting at `Route::Contacts`.
    Main,
}

impl RootGraph {
    pub fn for_snapshot(snap: &SessionSnapshot) -> RootGraph {
        if snap.is_loading() {
            RootGraph::Loading
        } else if snap.is_authenticated() {
            RootGraph::Main
        } else {
            RootGraph::Auth
        }
    }

    pub fn initial_route(&self) -> Option<Route> {
        match self {
            RootGraph::Loading => None,
            RootGraph::Auth => Some(Route::Login),
            RootGraph::Main => Some(Route::Contacts),
        }
    }
}

/// Navigation actions the permission guard needs from the host.
pub trait Navigator {
    /// Replace the whole stack with `route`.
    fn reset_to(&mut self, route: Route);
    fn can_go_back(&self) -> bool;
    fn go_back(&mut self);
}

/// Plain stack navigator; the CLI and tests drive it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackNavigator {
    stack: Vec<Route>,
}

impl StackNavigator {
    pub fn new(root: Route) -> Self { Self { stack: vec![root] } }

    pub fn push(&mut self, route: Route) { self.stack.push(route); }

    pub fn current(&self) -> Option<Route> { self.stack.last().copied() }

    pub fn depth(&self) -> usize { self.stack.len() }
}

impl Navigator for StackNavigator {
    fn reset_to(&mut self, route: Route) {
        self.stack.clear();
        self.stack.push(route);
    }

    fn can_go_back(&self) -> bool { self.stack.len() > 1 }

    fn go_back(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }
}
