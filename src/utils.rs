use once_cell::sync::Lazy;
use regex::Regex;

static MINUTES_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*minutes?\b").expect("valid minutes pattern"));

const PASSWORD_SPECIALS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Extracts the `<N> minutes` hint the server embeds in
/// "code still valid" errors.
pub fn parse_minutes_hint(text: &str) -> Option<u32> {
    MINUTES_HINT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Mirrors the server's registration password rules so obviously bad
/// passwords are rejected before a round trip.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }
    if !password.chars().any(|c| c.is_alphabetic()) {
        return Err("Password must contain at least one letter".to_string());
    }
    if !password.chars().any(|c| c.is_numeric()) {
        return Err("Password must contain at least one number".to_string());
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err(format!(
            "Password must contain at least one special character ({})",
            PASSWORD_SPECIALS
        ));
    }
    Ok(())
}

pub fn validate_verification_code(code: &str) -> Result<String, String> {
    let code = code.trim();
    if code.is_empty() {
        return Err("Verification code is required".to_string());
    }
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err("Verification code must be 6 digits".to_string());
    }
    Ok(code.to_string())
}
