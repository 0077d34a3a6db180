//! Aggregate identifiers.
//!
//! # Responsibility
//! - Distinguish client-minted temporary ids from server-issued durable ids.
//! - Mint temporary ids from a process-wide monotonic counter.
//!
//! # Invariants
//! - Temporary ids render as `temp-<token>` and parse back to `Temporary`.
//! - Any other non-blank string is an opaque `Durable` id.
//! - A temporary id is replaced by a durable one, never the reverse.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

const TEMPORARY_PREFIX: &str = "temp-";

static TEMPORARY_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^temp-([0-9]+)$").expect("valid temporary id regex"));
static NEXT_TEMPORARY_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identifier of one aggregate or child entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AggregateId {
    /// Client-minted placeholder; the aggregate does not exist remotely yet.
    Temporary(u64),
    /// Opaque value issued by the remote authority.
    Durable(String),
}

/// Rejected identifier input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    Blank,
}

impl Display for IdentifierError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank => write!(f, "identifier must not be blank"),
        }
    }
}

impl Error for IdentifierError {}

impl AggregateId {
    /// Mints a fresh temporary id. Tokens never repeat within a process.
    pub fn mint_temporary() -> Self {
        Self::Temporary(NEXT_TEMPORARY_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a server-issued value.
    pub fn durable(value: impl Into<String>) -> Self {
        Self::Durable(value.into())
    }

    /// Parses stored or wire text into an identifier.
    ///
    /// Text matching the temporary format is classified as temporary; the
    /// minting counter is advanced past it so restored ids are never reissued.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Blank);
        }
        if let Some(token) = TEMPORARY_ID_RE
            .captures(trimmed)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
        {
            NEXT_TEMPORARY_TOKEN.fetch_max(token.saturating_add(1), Ordering::Relaxed);
            return Ok(Self::Temporary(token));
        }
        Ok(Self::Durable(trimmed.to_string()))
    }

    /// Returns whether this aggregate still has to be created remotely.
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    pub fn is_durable(&self) -> bool {
        matches!(self, Self::Durable(_))
    }

    /// Returns the durable value, if any.
    pub fn as_durable(&self) -> Option<&str> {
        match self {
            Self::Durable(value) => Some(value.as_str()),
            Self::Temporary(_) => None,
        }
    }
}

impl Display for AggregateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Temporary(token) => write!(f, "{TEMPORARY_PREFIX}{token}"),
            Self::Durable(value) => write!(f, "{value}"),
        }
    }
}

impl Serialize for AggregateId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AggregateId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Remote authorities commonly issue numeric ids.
        let raw = serde_json::Value::deserialize(deserializer)?;
        let text = match raw {
            serde_json::Value::String(text) => text,
            serde_json::Value::Number(number) => number.to_string(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "identifier must be a string or number, got `{other}`"
                )))
            }
        };
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
