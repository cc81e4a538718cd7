use std::collections::BTreeMap;

use regex::Regex;

use shared_models::error::{AppError, ErrorMessage};

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$";

pub const BLANK: &str = "can't be blank";
pub const INVALID: &str = "is invalid";
pub const TAKEN: &str = "has already been taken";

/// Per-field error collector that renders as an `ErrorMessage`.
#[derive(Debug, Default)]
pub struct Errors {
    fields: BTreeMap<String, Vec<String>>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn require(&mut self, field: &str, value: Option<&str>) {
        if value.map_or(true, |v| v.trim().is_empty()) {
            self.add(field, BLANK);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(ErrorMessage::from_validation(self.fields)))
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    Regex::new(EMAIL_PATTERN)
        .map(|re| re.is_match(email) && email.len() <= 254)
        .unwrap_or(false)
}

/// Checks login, email and password on an account about to be saved.
/// Uniqueness is checked separately against the store.
pub fn check_account(login: &str, email: &str, has_password: bool) -> Errors {
    let mut errors = Errors::new();

    errors.require("login", Some(login));

    if email.trim().is_empty() {
        errors.add("email", BLANK);
    } else if !is_valid_email(email) {
        errors.add("email", INVALID);
    }

    if !has_password {
        errors.add("password", BLANK);
    }

    errors
}
