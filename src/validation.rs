//! Boundary validation and normalization for raw form input.
//!
//! Everything here runs before any network call: a submission that fails
//! these checks is rejected without touching the record store.

use regex::Regex;

/// Basic `local@domain.tld` shape check, mirroring what the form runs
/// client-side. Deliverability is not verified.
pub fn is_valid_email(email: &str) -> bool {
    let email_regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    email_regex.is_match(email)
}

/// Strips characters that are not digits, `+`, parentheses, `-`, `.`, or
/// whitespace, then trims. An empty result is acceptable: phone is optional.
pub fn sanitize_phone(phone: &str) -> String {
    let disallowed = Regex::new(r"[^\d+()\-.\s]").unwrap();
    disallowed.replace_all(phone, "").trim().to_string()
}
