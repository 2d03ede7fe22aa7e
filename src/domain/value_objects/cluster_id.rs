use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Value Object: ClusterId
///
/// Opaque string identifying the top-level tenancy scope (one cloud
/// region). Defined by value, immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ClusterId(String);

impl ClusterId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub(crate) fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(value: &str) -> Result<()> {
        if value.is_empty() {
            return Err(Error::ConfigInvalid("cluster id cannot be empty".into()));
        }
        if value.len() > 64 {
            return Err(Error::ConfigInvalid(format!(
                "cluster id cannot exceed 64 characters, got {}",
                value.len()
            )));
        }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(Error::ConfigInvalid(format!(
                "cluster id '{value}' contains invalid characters"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_invalid_chars() {
        assert!(ClusterId::new("").is_err());
        assert!(ClusterId::new("eu/west").is_err());
        assert!(ClusterId::new("eu-west-1").is_ok());
    }
}
