use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Maestro,
    Supervisor,
    Normal,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Maestro, Role::Supervisor, Role::Normal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Maestro => "maestro",
            Role::Supervisor => "supervisor",
            Role::Normal => "normal",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.as_str() == s.trim())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Role as received from the server. Anything outside the three known values is kept
/// so the user record still loads; access checks treat it as no role at all.
/// Strings are kept verbatim, other JSON values as their JSON text, null or a missing
/// field as the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UserRole {
    Known(Role),
    Unrecognised(String),
}

impl Default for UserRole {
    fn default() -> Self { UserRole::Unrecognised(String::new()) }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => match Role::ALL.into_iter().find(|r| r.as_str() == s) {
                Some(r) => UserRole::Known(r),
                None => UserRole::Unrecognised(s),
            },
            Value::Null => UserRole::default(),
            other => UserRole::Unrecognised(other.to_string()),
        })
    }
}

impl UserRole {
    pub fn known(&self) -> Option<Role> {
        match self {
            UserRole::Known(r) => Some(*r),
            UserRole::Unrecognised(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            UserRole::Known(r) => r.as_str(),
            UserRole::Unrecognised(s) => s.as_str(),
        }
    }
}

impl From<Role> for UserRole {
    fn from(r: Role) -> Self { UserRole::Known(r) }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apellido: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        match (self.nombre.as_deref(), self.apellido.as_deref()) {
            (Some(n), Some(a)) => format!("{} {}", n, a),
            (Some(n), None) => n.to_string(),
            (None, Some(a)) => a.to_string(),
            (None, None) => self.email.clone(),
        }
    }
}

/// Set of roles a route or operation requires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn empty() -> Self { Self(BTreeSet::new()) }

    pub fn of(roles: &[Role]) -> Self { Self(roles.iter().copied().collect()) }

    pub fn all() -> Self { Self::of(&Role::ALL) }

    pub fn contains(&self, role: Role) -> bool { self.0.contains(&role) }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ { self.0.iter().copied() }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self { Self(iter.into_iter().collect()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_roles_deserialize() {
        let u: User = serde_json::from_str(r#"{"id":1,"email":"a@b.com","role":"supervisor"}"#).unwrap();
        assert_eq!(u.role.known(), Some(Role::Supervisor));
        assert_eq!(u.nombre, None);

        let u: User = serde_json::from_str(r#"{"id":2,"email":"x@y.com","role":"admin"}"#).unwrap();
        assert_eq!(u.role, UserRole::Unrecognised("admin".into()));
        assert_eq!(u.role.known(), None);
        // unknown role survives a round trip through storage
        let back: User = serde_json::from_str(&serde_json::to_string(&u).unwrap()).unwrap();
        assert_eq!(back, u);
    }

    #[test]
    fn non_string_or_missing_role_still_loads() {
        for (raw, kept) in [(r#""role":null,"#, ""), (r#""role":5,"#, "5"), (r#""role":{"n":1},"#, r#"{"n":1}"#), ("", "")] {
            let u: User = serde_json::from_str(&format!(r#"{{"id":3,{}"email":"z@y.com"}}"#, raw)).unwrap();
            assert_eq!(u.role, UserRole::Unrecognised(kept.to_string()), "{}", raw);
            assert_eq!(u.role.known(), None);
        }
        // exact match only
        let u: User = serde_json::from_str(r#"{"id":3,"email":"z@y.com","role":"Maestro"}"#).unwrap();
        assert_eq!(u.role.known(), None);
    }

    #[test]
    fn role_parse_and_display() {
        assert_eq!(Role::parse("maestro"), Some(Role::Maestro));
        assert_eq!(Role::parse(" normal "), Some(Role::Normal));
        assert_eq!(Role::parse("Maestro"), None);
        assert_eq!(Role::Supervisor.to_string(), "supervisor");
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let mut u = User { id: 1, email: "a@b.com".into(), role: Role::Normal.into(), nombre: None, apellido: None };
        assert_eq!(u.display_name(), "a@b.com");
        u.nombre = Some("Ana".into());
        u.apellido = Some("Pérez".into());
        assert_eq!(u.display_name(), "Ana Pérez");
    }
}
