//! Credential checks, run as two separate passes.
//!
//! The shape pass (`validate_shape` on the request DTOs) only looks at field
//! presence and length bounds and answers with a field-naming message. The
//! business pass (the free functions below) runs inside the auth service and
//! applies the real rules: name charset, MSISDN format, password policy.

use lazy_static::lazy_static;
use regex::Regex;

use super::dto::{LoginRequest, RegisterRequest};
use super::services::AuthError;

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 100;
pub const PASSWORD_MIN_LEN: usize = 6;

lazy_static! {
    static ref LOCAL_MSISDN_RE: Regex = Regex::new(r"^01[3-9][0-9]{8}$").unwrap();
    static ref NAME_RE: Regex = Regex::new(r"^[a-zA-Z\s.'-]+$").unwrap();
}

/// Present and non-empty. Whitespace-only values get through; the business
/// pass trims and rejects them with the field's own error.
fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, String> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(format!("{field} is required")),
    }
}

fn required_password(value: &Option<String>) -> Result<&str, String> {
    // Whitespace is significant in passwords, so no trimming here.
    let pw = match value.as_deref() {
        Some(v) if !v.is_empty() => v,
        _ => return Err("Password is required".to_string()),
    };
    if pw.chars().count() < PASSWORD_MIN_LEN {
        return Err(format!(
            "Password failed on the 'min' rule: must be at least {PASSWORD_MIN_LEN} characters"
        ));
    }
    Ok(pw)
}

impl RegisterRequest {
    pub fn validate_shape(&self) -> Result<(), String> {
        let name = required(&self.name, "Name")?;
        let len = name.chars().count();
        if len < NAME_MIN_LEN {
            return Err(format!(
                "Name failed on the 'min' rule: must be at least {NAME_MIN_LEN} characters"
            ));
        }
        if len > NAME_MAX_LEN {
            return Err(format!(
                "Name failed on the 'max' rule: must be at most {NAME_MAX_LEN} characters"
            ));
        }
        required(&self.msisdn, "MSISDN")?;
        required_password(&self.password)?;
        Ok(())
    }
}

impl LoginRequest {
    pub fn validate_shape(&self) -> Result<(), String> {
        required(&self.msisdn, "MSISDN")?;
        required_password(&self.password)?;
        Ok(())
    }
}

pub fn validate_name(name: &str) -> Result<(), AuthError> {
    let name = name.trim();
    let len = name.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) || !NAME_RE.is_match(name) {
        return Err(AuthError::InvalidName);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

/// Brings a Bangladeshi mobile number to the canonical `+8801XXXXXXXXX` form.
///
/// Spaces and dashes are ignored. Accepts the local `01XXXXXXXXX` form and the
/// `8801...` / `+8801...` international forms; the operator digit after `01`
/// must be 3-9.
pub fn normalize_msisdn(raw: &str) -> Result<String, AuthError> {
    let cleaned: String = raw.chars().filter(|c| *c != ' ' && *c != '-').collect();

    let local = cleaned
        .strip_prefix("+88")
        .or_else(|| cleaned.strip_prefix("88"))
        .unwrap_or(&cleaned);

    if !LOCAL_MSISDN_RE.is_match(local) {
        return Err(AuthError::InvalidMsisdn);
    }
    Ok(format!("+88{local}"))
}
