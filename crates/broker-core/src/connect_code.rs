//! Connect codes.
//!
//! A connect code is the durable name of one game session. Capture
//! clients offer it right after connecting; every connection that
//! offers the same code ends up in the same room.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Exact length of a valid connect code, in bytes.
pub const CONNECT_CODE_LEN: usize = 8;

/// A validated connect code.
///
/// The only way to build one is [`ConnectCode::parse`], so holding a
/// `ConnectCode` means the length check already passed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConnectCode(String);

impl ConnectCode {
    /// Validate `raw` and wrap it.
    ///
    /// Length is measured in bytes, so multi-byte characters count
    /// for more than one.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        if raw.len() != CONNECT_CODE_LEN {
            return Err(CoreError::InvalidConnectCode {
                expected: CONNECT_CODE_LEN,
                actual: raw.len(),
            });
        }
        Ok(ConnectCode(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConnectCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ConnectCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ConnectCode::parse(&raw).map_err(serde::de::Error::custom)
    }
}
