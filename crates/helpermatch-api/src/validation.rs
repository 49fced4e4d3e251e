//! Input validation for request bodies.

use regex::Regex;
use std::sync::OnceLock;

use helpermatch_types::api::{HelperInput, JobInput};

pub const MAX_MESSAGE_LEN: usize = 5_000;

pub fn validate_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if len < 2 {
        return Err("Name must be at least 2 characters long".to_string());
    }
    if len > 100 {
        return Err("Name must be at most 100 characters long".to_string());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }
    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }
    Ok(())
}

pub fn validate_message(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("Message content is required".to_string());
    }
    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err(format!("Message must be at most {} characters long", MAX_MESSAGE_LEN));
    }
    Ok(())
}

pub fn validate_helper(input: &HelperInput) -> Result<(), String> {
    validate_name(&input.name)?;
    if !(18..=70).contains(&input.age) {
        return Err("Age must be between 18 and 70".to_string());
    }
    required("Nationality", &input.nationality)?;
    required("Experience", &input.experience)?;
    required("Availability", &input.availability)?;
    required("Description", &input.description)?;
    Ok(())
}

pub fn validate_job(input: &JobInput) -> Result<(), String> {
    required("Title", &input.title)?;
    required("Location", &input.location)?;
    required("Salary", &input.salary)?;
    required("Description", &input.description)?;
    Ok(())
}

/// Checkout session ids are opaque but never contain path separators.
pub fn validate_session_id(id: &str) -> Result<(), String> {
    static SESSION_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = SESSION_REGEX
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_]{1,255}$").expect("Failed to compile session id regex"));

    if !regex.is_match(id) {
        return Err("Invalid session id".to_string());
    }
    Ok(())
}

fn required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }
    Ok(())
}
