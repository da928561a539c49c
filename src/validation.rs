//! Client-side form validation.
//!
//! Each form validates into the payload it submits or into a field -> message map.
//! Nothing here touches the network; messages are the ones shown under each field.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::api::contacts::ContactPayload;
use crate::api::resources::{ResourcePayload, ResourceType};
use crate::error::AppError;
use crate::identity::{LoginCredentials, RegisterCredentials, Role};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email regex"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9\s\-()]+$").expect("phone regex"));
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://\S+$").expect("url regex"));

pub const MIN_PASSWORD_LEN: usize = 6;

/// Resource types the creation form offers.
pub const CREATABLE_RESOURCE_TYPES: [ResourceType; 2] = [ResourceType::Documento, ResourceType::Video];

/// Field-level validation failures, first message per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", summary(.fields))]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn new() -> Self { Self::default() }

    /// Record `message` for `field` unless the field already has one.
    pub fn add(&mut self, field: &'static str, message: &str) {
        self.fields.entry(field).or_insert_with(|| message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> { self.fields.get(field).map(String::as_str) }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    pub fn len(&self) -> usize { self.fields.len() }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

fn summary(fields: &BTreeMap<&'static str, String>) -> String {
    fields.iter().map(|(k, v)| format!("{}: {}", k, v)).collect::<Vec<_>>().join("; ")
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::Validation { code: "invalid_fields".into(), message: err.to_string() }
    }
}

fn blank(s: &str) -> bool { s.trim().is_empty() }

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if blank(email) {
        errors.add("email", "El correo electrónico es requerido.");
    } else if !EMAIL_RE.is_match(email) {
        errors.add("email", "Ingresa un correo electrónico válido.");
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<LoginCredentials, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, &self.email);
        if blank(&self.password) {
            errors.add("password", "La contraseña es requerida.");
        }
        errors.finish(LoginCredentials { email: self.email.trim().to_string(), password: self.password.clone() })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<RegisterCredentials, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if blank(&self.nombre) {
            errors.add("nombre", "El nombre es requerido.");
        }
        if blank(&self.apellido) {
            errors.add("apellido", "El apellido es requerido.");
        }
        check_email(&mut errors, &self.email);
        if blank(&self.password) {
            errors.add("password", "La contraseña es requerida.");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add("password", "La contraseña debe tener al menos 6 caracteres.");
        }
        let Some(role) = self.role else {
            errors.add("role", "Debes seleccionar un rol.");
            return Err(errors);
        };
        errors.finish(RegisterCredentials {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            nombre: Some(self.nombre.trim().to_string()),
            apellido: Some(self.apellido.trim().to_string()),
            role,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContactForm {
    pub full_name: String,
    pub boss_name: String,
    pub position: String,
    pub contact_numbers: Vec<String>,
    pub vehicle_plate: String,
    pub vehicle_type: String,
}

impl ContactForm {
    pub fn validate(&self) -> Result<ContactPayload, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if blank(&self.full_name) {
            errors.add("full_name", "El nombre completo es requerido.");
        }
        if blank(&self.boss_name) {
            errors.add("boss_name", "El nombre del jefe es requerido.");
        }
        if blank(&self.position) {
            errors.add("position", "El cargo es requerido.");
        }
        let numbers: Vec<String> = self
            .contact_numbers
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();
        if numbers.is_empty() {
            errors.add("contact_numbers", "Debes añadir al menos un número de contacto.");
        } else if numbers.iter().any(|n| !PHONE_RE.is_match(n)) {
            errors.add("contact_numbers", "Formato de número inválido. Usa solo dígitos, +, -, ().");
        }
        if blank(&self.vehicle_plate) {
            errors.add("vehicle_plate", "La placa es requerida.");
        }
        if blank(&self.vehicle_type) {
            errors.add("vehicle_type", "El tipo es requerido.");
        }
        errors.finish(ContactPayload {
            full_name: self.full_name.trim().to_string(),
            boss_name: self.boss_name.trim().to_string(),
            position: self.position.trim().to_string(),
            vehicle_plate: Some(self.vehicle_plate.trim().to_string()),
            vehicle_type: Some(self.vehicle_type.trim().to_string()),
            contact_numbers: Some(numbers),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceForm {
    pub title: String,
    pub detail: String,
    pub type_resource: Option<ResourceType>,
    pub url_resource: String,
}

impl ResourceForm {
    pub fn validate(&self) -> Result<ResourcePayload, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if blank(&self.title) {
            errors.add("title", "El título es requerido.");
        }
        if blank(&self.detail) {
            errors.add("detail", "La descripción es requerida.");
        }
        let type_resource = self.type_resource.filter(|t| CREATABLE_RESOURCE_TYPES.contains(t));
        if type_resource.is_none() {
            errors.add("type_resource", "Selecciona un tipo de recurso válido.");
        }
        let url = self.url_resource.trim();
        if url.is_empty() {
            errors.add("url_resource", "La URL del recurso es requerida.");
        } else if !URL_RE.is_match(url) {
            errors.add("url_resource", "Ingresa una URL válida (ej. https://ejemplo.com/recurso).");
        }
        let Some(type_resource) = type_resource else { return Err(errors) };
        errors.finish(ResourcePayload {
            title: self.title.trim().to_string(),
            detail: Some(self.detail.trim().to_string()),
            type_resource,
            url_resource: Some(url.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_requires_valid_email_and_password() {
        let errs = LoginForm::default().validate().unwrap_err();
        assert_eq!(errs.get("email"), Some("El correo electrónico es requerido."));
        assert_eq!(errs.get("password"), Some("La contraseña es requerida."));

        let errs = LoginForm { email: "not-an-email".into(), password: "x".into() }.validate().unwrap_err();
        assert_eq!(errs.get("email"), Some("Ingresa un correo electrónico válido."));
        assert_eq!(errs.len(), 1);

        let c = LoginForm { email: " a@b.com ".into(), password: "secret".into() }.validate().unwrap();
        assert_eq!(c.email, "a@b.com");
    }

    #[test]
    fn register_checks_password_length_and_role() {
        let form = RegisterForm {
            nombre: "Ana".into(),
            apellido: "Pérez".into(),
            email: "ana@b.com".into(),
            password: "12345".into(),
            role: None,
        };
        let errs = form.validate().unwrap_err();
        assert_eq!(errs.get("password"), Some("La contraseña debe tener al menos 6 caracteres."));
        assert_eq!(errs.get("role"), Some("Debes seleccionar un rol."));

        let ok = RegisterForm { password: "123456".into(), role: Some(Role::Supervisor), ..form }.validate().unwrap();
        assert_eq!(ok.role, Role::Supervisor);
        assert_eq!(ok.nombre.as_deref(), Some("Ana"));
    }

    #[test]
    fn contact_numbers_rules() {
        let mut form = ContactForm {
            full_name: "Juan Soto".into(),
            boss_name: "María".into(),
            position: "Técnico".into(),
            contact_numbers: vec!["  ".into()],
            vehicle_plate: "ABC-123".into(),
            vehicle_type: "Camioneta".into(),
        };
        assert_eq!(form.validate().unwrap_err().get("contact_numbers"), Some("Debes añadir al menos un número de contacto."));

        form.contact_numbers = vec!["+56 9 1234-5678".into(), "abc".into()];
        assert_eq!(
            form.validate().unwrap_err().get("contact_numbers"),
            Some("Formato de número inválido. Usa solo dígitos, +, -, ().")
        );

        form.contact_numbers = vec![" (02) 555-0101 ".into(), "".into(), "+56912345678".into()];
        let payload = form.validate().unwrap();
        assert_eq!(payload.contact_numbers, Some(vec!["(02) 555-0101".to_string(), "+56912345678".to_string()]));
    }

    #[test]
    fn contact_required_fields() {
        let errs = ContactForm::default().validate().unwrap_err();
        for f in ["full_name", "boss_name", "position", "contact_numbers", "vehicle_plate", "vehicle_type"] {
            assert!(errs.get(f).is_some(), "missing error for {}", f);
        }
    }

    #[test]
    fn resource_type_and_url() {
        let mut form = ResourceForm {
            title: " Manual ".into(),
            detail: "Guía de instalación".into(),
            type_resource: Some(ResourceType::Audio),
            url_resource: "ftp://x".into(),
        };
        let errs = form.validate().unwrap_err();
        assert_eq!(errs.get("type_resource"), Some("Selecciona un tipo de recurso válido."));
        assert_eq!(errs.get("url_resource"), Some("Ingresa una URL válida (ej. https://ejemplo.com/recurso)."));

        form.type_resource = Some(ResourceType::Documento);
        form.url_resource = " https://ejemplo.com/doc.pdf ".into();
        let p = form.validate().unwrap();
        assert_eq!(p.title, "Manual");
        assert_eq!(p.url_resource.as_deref(), Some("https://ejemplo.com/doc.pdf"));
    }

    #[test]
    fn converts_to_app_error() {
        let errs = LoginForm::default().validate().unwrap_err();
        let e: AppError = errs.into();
        assert_eq!(e.code_str(), "invalid_fields");
        assert!(e.message().contains("email"));
    }
}
