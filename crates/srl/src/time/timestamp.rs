use std::{fmt, ops};

use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, UtcOffset};

#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    From,
    Into,
    serde::Serialize,
    serde::Deserialize,
    sqlx::Type
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Timestamp(#[serde(with = "time::serde::rfc3339")] OffsetDateTime);

impl Timestamp {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// The UTC calendar date of this timestamp.
    pub fn date(self) -> Date {
        self.0.to_offset(UtcOffset::UTC).date()
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, fmt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self.0.format(&Rfc3339).map_err(|_| fmt::Error)?;
        fmt.write_str(&formatted)
    }
}

impl ops::Add<time::Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, duration: time::Duration) -> Self::Output {
        Timestamp(self.0 + duration)
    }
}

impl ops::Sub<time::Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, duration: time::Duration) -> Self::Output {
        Timestamp(self.0 - duration)
    }
}
