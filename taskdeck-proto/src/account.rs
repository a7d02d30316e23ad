//! Account payloads and their validation.

use serde::{Deserialize, Serialize};

use crate::input::{FieldError, ValidationError};
use crate::task::UserId;

/// Minimum password length in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account id; tasks reference it as their owner.
    pub id: UserId,
    /// Lower-cased email address.
    pub email: String,
    /// Display name.
    pub name: String,
}

/// `POST /auth/register` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Display name, 2..=50 characters after trimming.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Plain-text password, only ever sent over the wire to be hashed.
    pub password: String,
}

impl RegisterRequest {
    /// Validates the registration fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] listing every rejected field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        let name_len = self.name.trim().chars().count();
        if name_len < 2 {
            errors.push(FieldError::new("name", "Name must be at least 2 characters"));
        } else if name_len > 50 {
            errors.push(FieldError::new(
                "name",
                "Name must be less than 50 characters",
            ));
        }

        if !is_valid_email(&self.email) {
            errors.push(FieldError::new(
                "email",
                "Please enter a valid email address",
            ));
        }

        if let Some(problem) = password_problem(&self.password) {
            errors.push(FieldError::new("password", problem));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { errors })
        }
    }
}

/// `POST /auth/login` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Email address (case-insensitive).
    pub email: String,
    /// Plain-text password.
    pub password: String,
}

/// Successful register/login response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Human-readable outcome.
    #[serde(default)]
    pub message: String,
    /// Bearer token for subsequent requests.
    pub token: String,
    /// The authenticated account.
    pub user: User,
}

/// `GET /auth/me` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEnvelope {
    /// The authenticated account.
    pub user: User,
}

/// Normalizes an email address for storage and lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A deliberately loose `local@domain.tld` check.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.contains(char::is_whitespace)
        && !domain.contains('@')
        && domain
            .rsplit_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

fn password_problem(password: &str) -> Option<&'static str> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        Some("Password must be at least 8 characters")
    } else if !password.chars().any(|c| c.is_ascii_lowercase()) {
        Some("Password must contain at least one lowercase letter")
    } else if !password.chars().any(|c| c.is_ascii_uppercase()) {
        Some("Password must contain at least one uppercase letter")
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("Password must contain at least one number")
    } else {
        None
    }
}
