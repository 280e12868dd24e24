use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Time of day at minute granularity, written `HH:mm` (24-hour).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    minutes: u16,
}

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then(|| Self {
            minutes: (hour * 60 + minute) as u16,
        })
    }

    /// Truncate a wall-clock time to the minute.
    pub fn from_time(time: NaiveTime) -> Self {
        Self {
            minutes: (time.hour() * 60 + time.minute()) as u16,
        }
    }

    /// Strict `HH:mm` parse: two-digit hour 00-23, colon, two-digit minute 00-59.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidTime(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(invalid());
        }
        let digits = [bytes[0], bytes[1], bytes[3], bytes[4]];
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(invalid());
        }
        let hour = u32::from(digits[0] - b'0') * 10 + u32::from(digits[1] - b'0');
        let minute = u32::from(digits[2] - b'0') * 10 + u32::from(digits[3] - b'0');
        Self::new(hour, minute).ok_or_else(invalid)
    }

    pub fn hour(self) -> u32 {
        u32::from(self.minutes / 60)
    }

    pub fn minute(self) -> u32 {
        u32::from(self.minutes % 60)
    }

    /// Minutes since midnight.
    pub fn minutes_since_midnight(self) -> u32 {
        u32::from(self.minutes)
    }

    /// Shift back by `minutes`, wrapping across midnight.
    pub fn minus_minutes(self, minutes: u32) -> Self {
        let shifted = (i32::from(self.minutes) - (minutes as i32 % MINUTES_PER_DAY))
            .rem_euclid(MINUTES_PER_DAY);
        Self {
            minutes: shifted as u16,
        }
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_well_formed_times() {
        let t = ClockTime::parse("07:05").unwrap();
        assert_eq!((t.hour(), t.minute()), (7, 5));
        assert_eq!(ClockTime::parse("23:59").unwrap().to_string(), "23:59");
        assert_eq!(ClockTime::parse("00:00").unwrap().minutes_since_midnight(), 0);
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in ["invalid", "7:00", "24:00", "12:60", "12-30", "", " 07:00", "07:00 ", "ab:cd"] {
            assert!(ClockTime::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn pre_alert_offset() {
        let start = ClockTime::parse("07:00").unwrap();
        assert_eq!(start.minus_minutes(5).to_string(), "06:55");
    }

    #[test]
    fn minus_wraps_past_midnight() {
        let start = ClockTime::parse("00:03").unwrap();
        assert_eq!(start.minus_minutes(5).to_string(), "23:58");
    }

    #[test]
    fn truncates_seconds() {
        let t = NaiveTime::from_hms_opt(6, 55, 59).unwrap();
        assert_eq!(ClockTime::from_time(t).to_string(), "06:55");
    }

    proptest! {
        #[test]
        fn display_parse_roundtrip(h in 0u32..24, m in 0u32..60) {
            let t = ClockTime::new(h, m).unwrap();
            prop_assert_eq!(ClockTime::parse(&t.to_string()).unwrap(), t);
        }

        #[test]
        fn minus_is_inverse_of_forward_shift(total in 0u32..1440, delta in 0u32..1440) {
            let t = ClockTime::new(total / 60, total % 60).unwrap();
            let back = t.minus_minutes(delta);
            let forward = (back.minutes_since_midnight() + delta) % 1440;
            prop_assert_eq!(forward, total);
        }
    }
}
