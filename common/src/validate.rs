//! Account form validation
//!
//! Runs before any request is sent. Errors are keyed by field name and
//! already localized.

use crate::i18n::Translator;
use crate::types::{Address, Role};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub const MIN_PASSWORD_LEN: usize = 6;

/// field name → message
pub type FieldErrors = BTreeMap<String, String>;

/// Registration form as entered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub role: Option<Role>,
    pub street: String,
    pub city: String,
    pub state: String,
}

/// Body of `POST /user/signup`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub role: Role,
    pub address: Option<Address>,
}

/// Body of `POST /user/signin`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static::lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Validate and build the sign-up body
pub fn validate_registration(
    form: &RegistrationForm,
    t: &Translator,
) -> Result<SignUpRequest, FieldErrors> {
    let mut errors = FieldErrors::new();

    if form.name.trim().is_empty() {
        errors.insert("name".into(), t.t("registration:errors.name"));
    }
    if form.email.trim().is_empty() {
        errors.insert("email".into(), t.t("registration:errors.email.required"));
    } else if !is_valid_email(form.email.trim()) {
        errors.insert("email".into(), t.t("registration:errors.email.format"));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        errors.insert("password".into(), t.t("registration:errors.password"));
    }
    let role = match form.role {
        Some(role) => role,
        None => {
            errors.insert("role".into(), t.t("registration:errors.role"));
            return Err(errors);
        }
    };
    if !errors.is_empty() {
        return Err(errors);
    }

    let phone = Some(form.phone.trim().to_string()).filter(|p| !p.is_empty());
    let has_address = [&form.street, &form.city, &form.state]
        .iter()
        .any(|part| !part.trim().is_empty());
    let address = has_address.then(|| Address {
        street: Some(form.street.trim().to_string()),
        city: Some(form.city.trim().to_string()),
        state: Some(form.state.trim().to_string()),
    });

    Ok(SignUpRequest {
        name: form.name.trim().to_string(),
        email: form.email.trim().to_string(),
        phone,
        password: form.password.clone(),
        role,
        address,
    })
}

/// Validate and build the sign-in body
pub fn validate_login(email: &str, password: &str, t: &Translator) -> Result<SignInRequest, FieldErrors> {
    let mut errors = FieldErrors::new();
    if email.trim().is_empty() {
        errors.insert("email".into(), t.t("login:errors.emailRequired"));
    }
    if password.is_empty() {
        errors.insert("password".into(), t.t("login:errors.passwordRequired"));
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(SignInRequest {
        email: email.trim().to_string(),
        password: password.to_string(),
    })
}

/// Field a 409 sign-up response refers to
///
/// Uses the body's `field` when present, else guesses from the message.
pub fn conflict_field(body: &Value, message: &str) -> Option<String> {
    if let Some(field) = body.get("field").and_then(Value::as_str) {
        return Some(field.to_string());
    }
    let lower = message.to_lowercase();
    if lower.contains("email") {
        Some("email".into())
    } else if lower.contains("phone") {
        Some("phone".into())
    } else {
        None
    }
}
