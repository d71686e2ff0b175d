use std::cmp;
use std::fmt;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

/// A run time, in seconds.
///
/// Stored times use `0` to mean "not recorded", so this type can hold values that are not valid
/// run times. Use [`Seconds::is_valid()`] before treating one as a real measurement.
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd, From, Into, sqlx::Type)]
#[sqlx(transparent)]
pub struct Seconds(f64);

impl Seconds {
    pub const fn new(secs: f64) -> Self {
        Self(secs)
    }

    pub const fn as_f64(self) -> f64 {
        self.0
    }

    /// Whether this is a usable time (finite and strictly positive).
    pub fn is_valid(self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }

    /// Total ordering over all values, including NaN.
    pub fn total_cmp(&self, other: &Self) -> cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialEq<f64> for Seconds {
    fn eq(&self, other: &f64) -> bool {
        self.0 == *other
    }
}

impl PartialOrd<f64> for Seconds {
    fn partial_cmp(&self, other: &f64) -> Option<cmp::Ordering> {
        self.0.partial_cmp(other)
    }
}

/// Formats the time the way it is shown on the site, e.g. `1h 02m 03s 450ms` or `1m 40s`.
impl fmt::Display for Seconds {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return fmt.write_str("-");
        }

        let total_ms = (self.0 * 1000.0).round() as u64;
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms / 60_000) % 60;
        let seconds = (total_ms / 1000) % 60;
        let millis = total_ms % 1000;

        if hours > 0 {
            write!(fmt, "{hours}h {minutes:02}m ")?;
        } else if minutes > 0 {
            write!(fmt, "{minutes}m ")?;
        }

        if hours > 0 || minutes > 0 {
            write!(fmt, "{seconds:02}s")?;
        } else {
            write!(fmt, "{seconds}s")?;
        }

        if millis > 0 {
            write!(fmt, " {millis:03}ms")?;
        }

        Ok(())
    }
}

impl Serialize for Seconds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Seconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        f64::deserialize(deserializer).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity() {
        assert!(Seconds::new(0.001).is_valid());
        assert!(!Seconds::new(0.0).is_valid());
        assert!(!Seconds::new(-1.0).is_valid());
        assert!(!Seconds::new(f64::NAN).is_valid());
        assert!(!Seconds::new(f64::INFINITY).is_valid());
    }

    #[test]
    fn serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&Seconds::new(80.5)).unwrap(), "80.5");

        let parsed: Seconds = serde_json::from_str("95").unwrap();

        assert_eq!(parsed, Seconds::new(95.0));
    }

    #[test]
    fn display() {
        assert_eq!(Seconds::new(100.0).to_string(), "1m 40s");
        assert_eq!(Seconds::new(80.5).to_string(), "1m 20s 500ms");
        assert_eq!(Seconds::new(9.25).to_string(), "9s 250ms");
        assert_eq!(Seconds::new(3723.45).to_string(), "1h 02m 03s 450ms");
        assert_eq!(Seconds::new(0.0).to_string(), "-");
    }
}
