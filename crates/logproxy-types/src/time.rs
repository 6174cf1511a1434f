//! Game-server timestamps.
//!
//! Game servers stamp every chunk with a local wall-clock time in the form
//! `MM/DD/YYYY - HH:MM:SS.mmm` (for example `01/30/2025 - 16:33:56.470`).
//! [`LogTimestamp`] parses that form, orders chronologically, and
//! serializes back to the same form on disk and on the wire.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypesError;

/// Output format, always with millisecond precision.
const WIRE_FORMAT: &str = "%m/%d/%Y - %H:%M:%S%.3f";

/// Input format. `%.f` also accepts a missing fractional part.
const PARSE_FORMAT: &str = "%m/%d/%Y - %H:%M:%S%.f";

/// Encoding used inside session ids and file names.
const FILE_SAFE_FORMAT: &str = "%Y%m%d-%H%M%S-%3f";

/// A game-server wall-clock timestamp (no time zone).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogTimestamp(NaiveDateTime);

impl LogTimestamp {
    /// Wrap an already-parsed date-time.
    pub const fn from_naive(value: NaiveDateTime) -> Self {
        Self(value)
    }

    /// Return the inner date-time.
    pub const fn as_naive(&self) -> NaiveDateTime {
        self.0
    }

    /// Signed time elapsed from `earlier` to `self`.
    ///
    /// Negative when `earlier` is actually later than `self`.
    pub fn elapsed_since(&self, earlier: &Self) -> TimeDelta {
        self.0.signed_duration_since(earlier.0)
    }

    /// Encoding of this timestamp that is safe inside a file name.
    pub fn file_safe(&self) -> String {
        self.0.format(FILE_SAFE_FORMAT).to_string()
    }

    /// Return this timestamp shifted forward by `delta`, saturating at the
    /// representable maximum.
    #[must_use]
    pub fn plus(&self, delta: TimeDelta) -> Self {
        Self(self.0.checked_add_signed(delta).unwrap_or(NaiveDateTime::MAX))
    }
}

impl FromStr for LogTimestamp {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDateTime::parse_from_str(s.trim(), PARSE_FORMAT)
            .map(Self)
            .map_err(|source| TypesError::InvalidTimestamp {
                value: s.to_owned(),
                source,
            })
    }
}

impl fmt::Display for LogTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(WIRE_FORMAT))
    }
}

impl Serialize for LogTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LogTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_game_server_format() {
        let ts: LogTimestamp = "01/30/2025 - 16:33:56.470".parse().unwrap();
        assert_eq!(ts.to_string(), "01/30/2025 - 16:33:56.470");
    }

    #[test]
    fn fractional_seconds_are_optional() {
        let ts: LogTimestamp = "01/30/2025 - 16:33:56".parse().unwrap();
        assert_eq!(ts.to_string(), "01/30/2025 - 16:33:56.000");
    }

    #[test]
    fn rejects_other_formats() {
        assert!("2025-01-30T16:33:56Z".parse::<LogTimestamp>().is_err());
        assert!("".parse::<LogTimestamp>().is_err());
    }

    #[test]
    fn elapsed_is_signed() {
        let a: LogTimestamp = "01/30/2025 - 16:00:00.000".parse().unwrap();
        let b: LogTimestamp = "01/30/2025 - 18:30:00.000".parse().unwrap();
        assert_eq!(b.elapsed_since(&a), TimeDelta::minutes(150));
        assert_eq!(a.elapsed_since(&b), TimeDelta::minutes(-150));
    }

    #[test]
    fn orders_across_year_boundary() {
        let late_2024: LogTimestamp = "12/31/2024 - 23:59:59.999".parse().unwrap();
        let early_2025: LogTimestamp = "01/01/2025 - 00:00:00.000".parse().unwrap();
        assert!(late_2024 < early_2025);
    }

    #[test]
    fn serde_uses_wire_format() {
        let ts: LogTimestamp = "02/01/2025 - 08:05:09.001".parse().unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"02/01/2025 - 08:05:09.001\"");
        let back: LogTimestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
