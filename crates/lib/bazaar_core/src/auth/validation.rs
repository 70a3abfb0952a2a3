//! Input validation for registration and login.
//!
//! Every violated rule is collected; callers get the full list in
//! [`AuthError::Validation`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::AuthError;
use crate::models::auth::{LoginInput, RegistrationInput, Role};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|e| panic!("email regex: {e}"))
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{10,15}$").unwrap_or_else(|e| panic!("phone regex: {e}"))
});

const NAME_LEN: (usize, usize) = (2, 50);
const SHOP_NAME_LEN: (usize, usize) = (2, 100);
const MIN_PASSWORD_LEN: usize = 8;

/// Lower-case and trim an email address.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone.trim())
}

/// Trimmed value, or `None` when absent or blank.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn check_length(errors: &mut Vec<String>, label: &str, value: &str, (min, max): (usize, usize)) {
    let len = value.chars().count();
    if len < min {
        errors.push(format!("{label} must be at least {min} characters long"));
    } else if len > max {
        errors.push(format!("{label} cannot exceed {max} characters"));
    }
}

fn check_phone(errors: &mut Vec<String>, phone: Option<&str>, role: Role) {
    match phone {
        None => errors.push(format!(
            "Phone number is required for {}",
            role.collection()
        )),
        Some(p) if !is_valid_phone(p) => {
            errors.push("Please provide a valid phone number (10-15 digits)".to_string())
        }
        Some(_) => {}
    }
}

/// A registration that passed validation. Strings are trimmed, the email is
/// normalised.
#[derive(Clone)]
pub struct NewRegistration {
    pub role: Role,
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone_no: String,
    pub address: String,
    pub shop_name: String,
    pub vehicle_no: String,
    pub vehicle_type: String,
}

impl fmt::Debug for NewRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewRegistration")
            .field("role", &self.role)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

pub fn validate_registration(input: &RegistrationInput) -> Result<NewRegistration, AuthError> {
    let mut errors = Vec::new();

    let role = match present(&input.role) {
        None => {
            errors.push("Role is required. Must be one of: customer, seller, deliverer".to_string());
            None
        }
        Some(raw) => match raw.parse::<Role>() {
            Ok(role) if role.strategy().self_registration => Some(role),
            _ => {
                errors.push(
                    "Invalid role. Must be one of: customer, seller, deliverer. \
                     Admin registration is not allowed."
                        .to_string(),
                );
                None
            }
        },
    };

    let name = present(&input.name);
    match name {
        None => errors.push("Name is required".to_string()),
        Some(n) => check_length(&mut errors, "Name", n, NAME_LEN),
    }

    let email = present(&input.email);
    match email {
        None => errors.push("Email is required".to_string()),
        Some(e) if !is_valid_email(e) => {
            errors.push("Please provide a valid email address".to_string())
        }
        Some(_) => {}
    }

    // Passwords are taken verbatim, surrounding whitespace included.
    let password = input.password.as_deref().filter(|p| !p.is_empty());
    match password {
        None => errors.push("Password is required".to_string()),
        Some(p) if p.chars().count() < MIN_PASSWORD_LEN => errors.push(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )),
        Some(_) => {}
    }

    let phone = present(&input.phone_no);
    let address = present(&input.address);
    let shop_name = present(&input.shop_name);
    match role {
        Some(r @ (Role::Customer | Role::Deliverer)) => check_phone(&mut errors, phone, r),
        Some(Role::Seller) => {
            match shop_name {
                None => errors.push("Shop name is required for sellers".to_string()),
                Some(s) => check_length(&mut errors, "Shop name", s, SHOP_NAME_LEN),
            }
            check_phone(&mut errors, phone, Role::Seller);
            if address.is_none() {
                errors.push("Address is required for sellers".to_string());
            }
        }
        Some(Role::Admin) | None => {}
    }

    match (role, name, email, password) {
        (Some(role), Some(name), Some(email), Some(password)) if errors.is_empty() => {
            Ok(NewRegistration {
                role,
                name: name.to_string(),
                email: normalize_email(email),
                password: password.to_string(),
                phone_no: phone.unwrap_or_default().to_string(),
                address: address.unwrap_or_default().to_string(),
                shop_name: shop_name.unwrap_or_default().to_string(),
                vehicle_no: present(&input.vehicle_no).unwrap_or_default().to_string(),
                vehicle_type: present(&input.vehicle_type).unwrap_or_default().to_string(),
            })
        }
        _ => Err(AuthError::Validation(errors)),
    }
}

/// A login request that passed validation.
#[derive(Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

pub fn validate_login(input: &LoginInput) -> Result<LoginRequest, AuthError> {
    let mut errors = Vec::new();

    let email = present(&input.email);
    match email {
        None => errors.push("Email is required".to_string()),
        Some(e) if !is_valid_email(e) => {
            errors.push("Please provide a valid email address".to_string())
        }
        Some(_) => {}
    }

    let password = input.password.as_deref().filter(|p| !p.is_empty());
    if password.is_none() {
        errors.push("Password is required".to_string());
    }

    let role = match present(&input.role) {
        None => None,
        Some(raw) => match raw.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                errors.push(
                    "Invalid role. Must be one of: admin, customer, seller, deliverer".to_string(),
                );
                None
            }
        },
    };

    match (email, password) {
        (Some(email), Some(password)) if errors.is_empty() => Ok(LoginRequest {
            email: normalize_email(email),
            password: password.to_string(),
            role,
        }),
        _ => Err(AuthError::Validation(errors)),
    }
}
