//! Level identifiers
//!
//! The wire format is a string: `"<n>_local"` for guest levels indexing the
//! bundled catalog, `"<n>"` for provider-backed levels, and the literal
//! `"0"` for the rotating daily challenge. Parsing happens once at the
//! boundary; everything downstream works with the tagged variant.

use std::fmt;
use std::str::FromStr;
use tunequiz_common::{Error, db::DAILY_LEVEL_ID};

/// A parsed level identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelRef {
    /// Guest-eligible level indexing the immutable local catalog
    Local(i64),
    /// Provider-backed level; requires authentication
    Provider(i64),
    /// The reserved daily-challenge level (provider-backed, id 0)
    Daily,
}

impl LevelRef {
    /// True when the level cannot be served to a guest
    pub fn requires_auth(&self) -> bool {
        !matches!(self, LevelRef::Local(_))
    }

    /// Storage index within the provider catalog; `None` for local levels
    pub fn provider_index(&self) -> Option<i64> {
        match self {
            LevelRef::Local(_) => None,
            LevelRef::Provider(n) => Some(*n),
            LevelRef::Daily => Some(DAILY_LEVEL_ID),
        }
    }
}

impl FromStr for LevelRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "0" {
            return Ok(LevelRef::Daily);
        }
        if let Some(prefix) = s.strip_suffix("_local") {
            let index: i64 = prefix
                .parse()
                .map_err(|_| Error::BadRequest(format!("Invalid level id: {}", s)))?;
            return Ok(LevelRef::Local(index));
        }
        let index: i64 = s
            .parse()
            .map_err(|_| Error::BadRequest(format!("Invalid level id: {}", s)))?;
        Ok(LevelRef::Provider(index))
    }
}

impl fmt::Display for LevelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelRef::Local(n) => write!(f, "{}_local", n),
            LevelRef::Provider(n) => write!(f, "{}", n),
            LevelRef::Daily => write!(f, "0"),
        }
    }
}
