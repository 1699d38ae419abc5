//! Secure string implementation with automatic memory zeroing
//!
//! This module provides a SecureString type that automatically zeros its memory
//! when dropped and provides constant-time comparison.

use std::fmt;
use zeroize::Zeroize;

/// A string that zeros its memory when dropped
///
/// Holds the AniDB password between the settings provider and the AUTH
/// command. Debug and Display never show the contents.
#[derive(Clone, Default, Zeroize)]
pub struct SecureString {
    inner: Vec<u8>,
}

impl SecureString {
    /// Create a new SecureString from a regular string
    pub fn new(s: impl Into<String>) -> Self {
        Self {
            inner: s.into().into_bytes(),
        }
    }

    /// Check if the secret is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Get the string as a byte slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Convert to a regular String (use with caution)
    ///
    /// This creates a copy that is NOT automatically zeroed.
    /// Only use this when absolutely necessary.
    pub fn expose_secret(&self) -> String {
        String::from_utf8_lossy(&self.inner).into_owned()
    }

    /// Constant-time comparison
    pub fn constant_time_eq(&self, other: &Self) -> bool {
        if self.inner.len() != other.inner.len() {
            return false;
        }

        let mut result = 0u8;
        for (a, b) in self.inner.iter().zip(other.inner.iter()) {
            result |= a ^ b;
        }
        result == 0
    }
}

impl Drop for SecureString {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

// Implement Debug to prevent accidental credential logging
impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureString(***)")
    }
}

// Implement Display to prevent accidental credential logging
impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl PartialEq for SecureString {
    fn eq(&self, other: &Self) -> bool {
        self.constant_time_eq(other)
    }
}

impl Eq for SecureString {}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
