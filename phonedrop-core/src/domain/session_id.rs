use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Longest session identifier the relay accepts
pub const MAX_SESSION_ID_LEN: usize = 64;

/// Opaque, unguessable identifier that pairs two devices.
///
/// Only URL-safe tokens (`[0-9A-Za-z_-]`, 1 to 64 characters) are valid,
/// which covers UUIDs as well as short test identifiers. Every constructor
/// goes through [`SessionId::parse`], so holding a `SessionId` means the
/// value already passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random identifier (UUID v4 shaped)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validate and wrap an externally supplied identifier
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() || s.len() > MAX_SESSION_ID_LEN {
            return Err(CoreError::InvalidSessionId(format!(
                "length {} outside 1..={}",
                s.len(),
                MAX_SESSION_ID_LEN
            )));
        }

        if let Some(c) = s.chars().find(|c| !is_allowed(*c)) {
            return Err(CoreError::InvalidSessionId(format!(
                "character {:?} not allowed",
                c
            )));
        }

        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines; never log the full identifier
    pub fn short(&self) -> &str {
        let end = self.0.len().min(8);
        &self.0[..end]
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl std::str::FromStr for SessionId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
