use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactValidationResult {
    pub passed: bool,
    pub errors: Vec<FieldError>,
}

impl ContactValidationResult {
    /// "field: message; field: message" for error responses.
    pub fn describe(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

const PHONE_SEPARATORS: &[char] = &[' ', '-', '+', '(', ')'];

/// Validates the contact form before it reaches the session.
///
/// - name: required
/// - email: required, `local@domain.tld` with no whitespace or extra `@`
/// - phone: required, digits and `space - + ( )` only, at least one digit
pub fn validate_contact(name: &str, email: &str, phone: &str) -> ContactValidationResult {
    let mut errors = Vec::new();
    let mut fail = |field: &str, message: &str| {
        errors.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        })
    };

    if name.trim().is_empty() {
        fail("name", "Name is required");
    }

    if email.trim().is_empty() {
        fail("email", "Email is required");
    } else if !is_valid_email(email.trim()) {
        fail("email", "Please enter a valid email address");
    }

    if phone.trim().is_empty() {
        fail("phone", "Phone number is required");
    } else if !is_valid_phone(phone.trim()) {
        fail("phone", "Please enter a valid phone number");
    }

    ContactValidationResult {
        passed: errors.is_empty(),
        errors,
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let clean = |part: &str| !part.is_empty() && !part.contains(|c: char| c == '@' || c.is_whitespace());
    if !clean(local) || !clean(domain) {
        return false;
    }
    // Some '.' must have at least one character on each side.
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone
        .chars()
        .all(|c| c.is_ascii_digit() || PHONE_SEPARATORS.contains(&c))
        && phone.chars().any(|c| c.is_ascii_digit())
}
