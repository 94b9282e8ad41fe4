use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, UtcOffset, Weekday};

use crate::ValidationError;

const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const COMPACT_DATE: &[FormatItem<'static>] = format_description!("[year][month][day]");

/// Calendar date of a trading session.
///
/// Serializes as `YYYY-MM-DD`; the short-volume file names use the compact
/// `YYYYMMDD` form returned by [`TradingDate::compact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TradingDate(Date);

impl TradingDate {
    pub const fn from_date(date: Date) -> Self {
        Self(date)
    }

    pub fn today_utc() -> Self {
        Self(OffsetDateTime::now_utc().date())
    }

    /// Accepts both `2024-03-08` and `20240308`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let format = if trimmed.contains('-') {
            ISO_DATE
        } else {
            COMPACT_DATE
        };

        Date::parse(trimmed, format)
            .map(Self)
            .map_err(|_| ValidationError::InvalidDate {
                value: input.to_owned(),
            })
    }

    /// Calendar date of a unix timestamp as seen from the exchange's UTC offset.
    pub fn from_unix_timestamp(
        timestamp: i64,
        offset_seconds: i32,
    ) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDate {
            value: timestamp.to_string(),
        };
        let offset = UtcOffset::from_whole_seconds(offset_seconds).map_err(|_| invalid())?;
        let instant = OffsetDateTime::from_unix_timestamp(timestamp).map_err(|_| invalid())?;
        Ok(Self(instant.to_offset(offset).date()))
    }

    pub const fn into_inner(self) -> Date {
        self.0
    }

    pub fn weekday(self) -> Weekday {
        self.0.weekday()
    }

    pub fn is_weekend(self) -> bool {
        matches!(self.weekday(), Weekday::Saturday | Weekday::Sunday)
    }

    pub fn previous_day(self) -> Self {
        Self(self.0 - Duration::days(1))
    }

    pub fn minus_days(self, days: u32) -> Self {
        Self(self.0 - Duration::days(i64::from(days)))
    }

    /// Midnight UTC as a unix timestamp, used for quote-provider range queries.
    pub fn unix_timestamp(self) -> i64 {
        self.0.midnight().assume_utc().unix_timestamp()
    }

    pub fn compact(self) -> String {
        self.0
            .format(COMPACT_DATE)
            .unwrap_or_else(|_| String::from("00000000"))
    }

    pub fn iso(self) -> String {
        self.0
            .format(ISO_DATE)
            .unwrap_or_else(|_| String::from("0000-00-00"))
    }
}

impl Display for TradingDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.iso())
    }
}

impl Serialize for TradingDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.iso())
    }
}

impl<'de> Deserialize<'de> for TradingDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}
