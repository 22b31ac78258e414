/// Scalar payload types carried by configuration values.
///
/// These are deliberately small, hand-rolled types: the engine only needs
/// construction, ordering, and display. Parsing configuration text into them
/// is the parser's job and out of scope here.
use std::fmt;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Date
// ---------------------------------------------------------------------------

/// A calendar date in the proleptic Gregorian calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    year: i32,
    month: u8,
    day: u8,
}

/// Returns `true` for leap years in the proleptic Gregorian calendar.
fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Returns the number of days in the given month.
fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

impl Date {
    /// Constructs a date, validating month and day ranges.
    pub fn new(year: i32, month: u8, day: u8) -> Result<Self> {
        if month == 0 || month > 12 {
            return Err(Error::validation(format!("Invalid month: {month}")));
        }
        if day == 0 || day > days_in_month(year, month) {
            return Err(Error::validation(format!("Invalid day: {day}")));
        }
        Ok(Self { year, month, day })
    }

    /// Returns the year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Returns the month (1–12).
    pub fn month(&self) -> u8 {
        self.month
    }

    /// Returns the day of the month (1–31).
    pub fn day(&self) -> u8 {
        self.day
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A time of day with nanosecond resolution, without a UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Time {
    hour: u8,
    minute: u8,
    second: u8,
    nanosecond: u32,
}

impl Time {
    /// Constructs a time of day, validating all component ranges.
    pub fn new(hour: u8, minute: u8, second: u8, nanosecond: u32) -> Result<Self> {
        if hour > 23 {
            return Err(Error::validation(format!("Invalid hour: {hour}")));
        }
        if minute > 59 {
            return Err(Error::validation(format!("Invalid minute: {minute}")));
        }
        if second > 59 {
            return Err(Error::validation(format!("Invalid second: {second}")));
        }
        if nanosecond > 999_999_999 {
            return Err(Error::validation(format!("Invalid nanosecond: {nanosecond}")));
        }
        Ok(Self {
            hour,
            minute,
            second,
            nanosecond,
        })
    }

    /// Returns midnight (00:00:00).
    pub fn midnight() -> Self {
        Self::default()
    }

    /// Returns the hour (0–23).
    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// Returns the minute (0–59).
    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Returns the second (0–59).
    pub fn second(&self) -> u8 {
        self.second
    }

    /// Returns the sub-second fraction in nanoseconds.
    pub fn nanosecond(&self) -> u32 {
        self.nanosecond
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)?;
        if self.nanosecond > 0 {
            let fraction = format!("{:09}", self.nanosecond);
            write!(f, ".{}", fraction.trim_end_matches('0'))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DateTime
// ---------------------------------------------------------------------------

/// A combined date and time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
    date: Date,
    time: Time,
}

impl DateTime {
    /// Combines a date and a time of day.
    pub fn new(date: Date, time: Time) -> Self {
        Self { date, time }
    }

    /// Returns the date component.
    pub fn date(&self) -> Date {
        self.date
    }

    /// Returns the time component.
    pub fn time(&self) -> Time {
        self.time
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time)
    }
}

// ---------------------------------------------------------------------------
// TimeDelta
// ---------------------------------------------------------------------------

/// A duration with nanosecond resolution. May be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeDelta {
    seconds: i64,
    nanoseconds: u32,
}

impl TimeDelta {
    /// Constructs a time delta from whole seconds.
    pub fn from_seconds(seconds: i64) -> Self {
        Self {
            seconds,
            nanoseconds: 0,
        }
    }

    /// Constructs a time delta from seconds and a nanosecond fraction.
    pub fn new(seconds: i64, nanoseconds: u32) -> Result<Self> {
        if nanoseconds > 999_999_999 {
            return Err(Error::validation(format!(
                "Invalid nanosecond fraction: {nanoseconds}"
            )));
        }
        Ok(Self {
            seconds,
            nanoseconds,
        })
    }

    /// Returns the whole seconds of this delta.
    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Returns the nanosecond fraction of this delta.
    pub fn nanoseconds(&self) -> u32 {
        self.nanoseconds
    }
}

impl fmt::Display for TimeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanoseconds == 0 {
            write!(f, "{}s", self.seconds)
        } else {
            let fraction = format!("{:09}", self.nanoseconds);
            write!(f, "{}.{}s", self.seconds, fraction.trim_end_matches('0'))
        }
    }
}

// ---------------------------------------------------------------------------
// Bytes
// ---------------------------------------------------------------------------

/// An immutable byte sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(Vec<u8>);

impl Bytes {
    /// Wraps a byte vector.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the number of bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the bytes as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Encodes the bytes as a lowercase hexadecimal string.
    pub fn to_hex(&self) -> String {
        const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";
        let mut out = String::with_capacity(self.0.len() * 2);
        for &b in &self.0 {
            out.push(HEX_CHARS[(b >> 4) as usize] as char);
            out.push(HEX_CHARS[(b & 0x0f) as usize] as char);
        }
        out
    }
}

impl From<&[u8]> for Bytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// RegexSource
// ---------------------------------------------------------------------------

/// An uncompiled regular expression value from a configuration document.
///
/// The `matches` constraint compiles this into a matcher at rule-definition
/// time; the engine itself treats the pattern as opaque text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegexSource {
    pattern: String,
    multi_line: bool,
}

impl RegexSource {
    /// Creates a regular expression value.
    pub fn new(pattern: impl Into<String>, multi_line: bool) -> Self {
        Self {
            pattern: pattern.into(),
            multi_line,
        }
    }

    /// Returns the pattern text.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns `true` if the pattern was written in multi-line form.
    pub fn is_multi_line(&self) -> bool {
        self.multi_line
    }
}

impl fmt::Display for RegexSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}
