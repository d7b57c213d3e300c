//! Credential handling and SQL identifier escaping.

use crate::error::{GuardError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secure string that automatically clears its contents when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecureString(String);

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString(***)")
    }
}

impl SecureString {
    /// Create a new secure string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string value. Use carefully and avoid storing the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Convert to a regular string. The SecureString will be zeroized.
    pub fn into_string(mut self) -> String {
        let value = std::mem::take(&mut self.0);
        self.0.zeroize();
        value
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// SQL identifier validation and escaping for the projection queries sources issue.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates a table or column name and wraps it in double quotes.
    ///
    /// ```rust
    /// use dq_guard::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::escape_identifier("open_time").unwrap(), "\"open_time\"");
    /// assert!(SqlSecurity::escape_identifier("id; DROP TABLE users--").is_err());
    /// ```
    pub fn escape_identifier(identifier: &str) -> Result<String> {
        Self::validate_identifier(identifier)?;
        Ok(format!("\"{identifier}\""))
    }

    /// Escapes a possibly schema-qualified name part by part.
    pub fn escape_qualified(name: &str) -> Result<String> {
        Self::validate_identifier(name)?;
        Ok(name
            .split('.')
            .map(|part| format!("\"{part}\""))
            .collect::<Vec<_>>()
            .join("."))
    }

    /// Validates a SQL identifier without escaping it.
    ///
    /// Identifiers must start with a letter or underscore and contain only ASCII
    /// letters, digits, underscores and (for qualified names) dots.
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(GuardError::SecurityError(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.len() > 128 {
            return Err(GuardError::SecurityError(
                "SQL identifier too long (max 128 characters)".to_string(),
            ));
        }

        static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
            #[allow(clippy::expect_used)]
            Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*$")
                .expect("Hard-coded regex pattern should be valid")
        });

        if !IDENTIFIER_REGEX.is_match(identifier) {
            return Err(GuardError::SecurityError(format!(
                "Invalid SQL identifier format: '{identifier}'. Identifiers must start with a letter or underscore and contain only letters, numbers, underscores, and dots"
            )));
        }

        Ok(())
    }
}

/// Input validation for names that end up in file paths.
pub struct InputValidator;

impl InputValidator {
    /// Validates that `value` can be used as a single file or directory name.
    ///
    /// Only ASCII letters, digits, `_`, `-` and `.` are accepted, and `.` / `..`
    /// are rejected.
    pub fn validate_file_name(value: &str, name: &str) -> Result<()> {
        if value.is_empty() || value.len() > 128 {
            return Err(GuardError::SecurityError(format!(
                "{name} must be between 1 and 128 characters"
            )));
        }
        if value == "." || value == ".." {
            return Err(GuardError::SecurityError(format!(
                "{name} cannot be '{value}'"
            )));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(GuardError::SecurityError(format!(
                "Invalid {name} '{value}': only letters, digits, '_', '-' and '.' are allowed"
            )));
        }
        Ok(())
    }
}
