use std::collections::HashSet;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single named predicate a plaintext password has to satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PasswordRule {
    PasswordTooShort,
    PasswordRequiresLower,
    PasswordRequiresUpper,
    PasswordRequiresDigit,
    PasswordRequiresNonAlphanumeric,
    PasswordRequiresUniqueChars,
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PasswordRule::PasswordTooShort => "PasswordTooShort",
            PasswordRule::PasswordRequiresLower => "PasswordRequiresLower",
            PasswordRule::PasswordRequiresUpper => "PasswordRequiresUpper",
            PasswordRule::PasswordRequiresDigit => "PasswordRequiresDigit",
            PasswordRule::PasswordRequiresNonAlphanumeric => "PasswordRequiresNonAlphanumeric",
            PasswordRule::PasswordRequiresUniqueChars => "PasswordRequiresUniqueChars",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PasswordPolicy {
    pub required_length: usize,
    pub required_unique_chars: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            required_length: 4,
            required_unique_chars: 1,
            require_digit: false,
            require_lowercase: true,
            require_uppercase: false,
            require_non_alphanumeric: false,
        }
    }
}

impl PasswordPolicy {
    /// Returns every rule the password breaks, in a stable order. Empty means accepted.
    pub fn check(&self, password: &str) -> Vec<PasswordRule> {
        let mut failed = Vec::new();

        if password.chars().count() < self.required_length {
            failed.push(PasswordRule::PasswordTooShort);
        }
        if self.require_non_alphanumeric && password.chars().all(|c| c.is_ascii_alphanumeric()) {
            failed.push(PasswordRule::PasswordRequiresNonAlphanumeric);
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            failed.push(PasswordRule::PasswordRequiresDigit);
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            failed.push(PasswordRule::PasswordRequiresLower);
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            failed.push(PasswordRule::PasswordRequiresUpper);
        }
        if self.required_unique_chars >= 1 {
            let unique: HashSet<char> = password.chars().collect();
            if unique.len() < self.required_unique_chars {
                failed.push(PasswordRule::PasswordRequiresUniqueChars);
            }
        }

        failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserPolicy {
    pub allowed_username_chars: String,
}

impl Default for UserPolicy {
    fn default() -> Self {
        Self {
            allowed_username_chars: "abcdefghijklmnopqrstuvwxyz".into(),
        }
    }
}

impl UserPolicy {
    pub fn is_valid_username(&self, username: &str) -> bool {
        !username.is_empty()
            && username
                .chars()
                .all(|c| self.allowed_username_chars.contains(c))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}
