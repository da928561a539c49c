//! Session lifecycle and role-gated access for the ConectaTech client.
//! Keep the public surface thin and split implementation across sub-modules.

mod user;
mod session;
mod provider;
mod authorizer;

pub use user::{Role, RoleSet, User, UserRole};
pub use session::{AuthState, Session, SessionContext, SessionSnapshot};
pub use provider::{
    AuthProvider, AuthResponse, HttpAuthProvider, LoginCredentials, RegisterCredentials, RegisterResponse,
    LOGIN_PATH, PROFILE_PATH, REGISTER_PATH,
};
pub use authorizer::{check_access, Access, AccessPolicy, AlertSpec, PermissionGuard, Redirect, STAFF_ONLY_MESSAGE};
