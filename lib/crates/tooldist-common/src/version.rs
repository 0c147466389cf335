//! Version numbers and binary versions of published tools.
//!
//! A [`Number`] is `major.minor.patch[.build]` or `major.minor-tagpatch[.build]`.
//! A [`Binary`] adds the series and architecture a tarball was built for and
//! is the identity key of a published artifact.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[allow(clippy::expect_used)] // Patterns are compile-time constants
static NUMBER_PAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,9})\.(\d{1,9})(?:\.|-([a-z]+))(\d{1,9})(?:\.(\d{1,9}))?$")
        .expect("valid version pattern")
});

#[allow(clippy::expect_used)]
static BINARY_PAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)-([^-]+)-([^-]+)$").expect("valid binary pattern"));

/// Errors produced while parsing version strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("invalid version {0:?}")]
    InvalidNumber(String),

    #[error("invalid binary version {0:?}")]
    InvalidBinary(String),

    #[error("unknown series {0:?}")]
    UnknownSeries(String),
}

/// A tools version number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Number {
    pub major: u32,
    pub minor: u32,
    /// Pre-release tag such as `beta`. Empty for regular versions.
    pub tag: String,
    pub patch: u32,
    pub build: u32,
}

impl Number {
    /// The zero version, used as the "no specific version" marker.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Construct an untagged version.
    #[must_use]
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            ..Self::default()
        }
    }

    /// Whether this is the zero version.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Development builds carry a tag, a non-zero build number, or an odd
    /// minor number.
    #[must_use]
    pub fn is_dev(&self) -> bool {
        !self.tag.is_empty() || self.build > 0 || self.minor % 2 == 1
    }
}

impl FromStr for Number {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = NUMBER_PAT
            .captures(s)
            .ok_or_else(|| VersionError::InvalidNumber(s.to_string()))?;
        let num = |i: usize| -> Result<u32, VersionError> {
            caps.get(i).map_or(Ok(0), |m| {
                m.as_str()
                    .parse()
                    .map_err(|_| VersionError::InvalidNumber(s.to_string()))
            })
        };
        Ok(Self {
            major: num(1)?,
            minor: num(2)?,
            tag: caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
            patch: num(4)?,
            build: num(5)?,
        })
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tag.is_empty() {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        } else {
            write!(f, "{}.{}-{}{}", self.major, self.minor, self.tag, self.patch)?;
        }
        if self.build > 0 {
            write!(f, ".{}", self.build)?;
        }
        Ok(())
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then_with(|| match (self.tag.is_empty(), other.tag.is_empty()) {
                (true, true) => Ordering::Equal,
                // An untagged release sorts after any tagged pre-release.
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.tag.cmp(&other.tag),
            })
            .then(self.patch.cmp(&other.patch))
            .then(self.build.cmp(&other.build))
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A version number together with the series and architecture it targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Binary {
    pub number: Number,
    pub series: String,
    pub arch: String,
}

impl Binary {
    #[must_use]
    pub fn new(number: Number, series: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            number,
            series: series.into(),
            arch: arch.into(),
        }
    }
}

impl FromStr for Binary {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = BINARY_PAT
            .captures(s)
            .ok_or_else(|| VersionError::InvalidBinary(s.to_string()))?;
        let number = caps[1]
            .parse()
            .map_err(|_| VersionError::InvalidBinary(s.to_string()))?;
        Ok(Self {
            number,
            series: caps[2].to_string(),
            arch: caps[3].to_string(),
        })
    }
}

impl fmt::Display for Binary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.number, self.series, self.arch)
    }
}

impl Serialize for Binary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Binary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
