//! Time model
//!
//! All instants are integer microseconds since the Unix epoch (UTC), so grid
//! membership and equality tests in cursors and the merge loop are exact.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::MergeError;

/// Ticks (microseconds) per second
pub const TICKS_PER_SECOND: i64 = 1_000_000;

/// Output grid frequency used when none is configured
pub const DEFAULT_TARGET_FREQUENCY: Frequency = Frequency::known(4);

/// Render layout for timestamps written to output tables
const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Absolute point in time with microsecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create from microseconds since epoch
    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Create from milliseconds since epoch
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis * 1_000)
    }

    /// Create from whole seconds since epoch
    #[inline]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs * TICKS_PER_SECOND)
    }

    /// Microseconds since epoch
    #[inline]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// Snap to the nearest grid boundary of `frequency` at or before `self`.
    ///
    /// Equivalent to `floor(t * F) / F`; floors toward negative infinity so
    /// pre-epoch instants stay at or before their input.
    #[inline]
    pub fn quantize(self, frequency: Frequency) -> Self {
        let period = frequency.period_micros();
        Self(self.0.saturating_sub(self.0.rem_euclid(period)))
    }

    /// Whether this instant already lies on the grid of `frequency`
    #[inline]
    pub fn is_aligned(self, frequency: Frequency) -> bool {
        self.quantize(frequency) == self
    }

    /// Signed distance `self - earlier` in microseconds, clamped to the `i64` range
    #[inline]
    pub fn micros_since(self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Offset by a signed number of microseconds, clamped to the `i64` range
    #[inline]
    pub fn offset_micros(self, micros: i64) -> Self {
        Self(self.0.saturating_add(micros))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.div_euclid(TICKS_PER_SECOND);
        let nanos = (self.0.rem_euclid(TICKS_PER_SECOND) * 1_000) as u32;
        match DateTime::<Utc>::from_timestamp(secs, nanos) {
            Some(dt) => write!(f, "{}", dt.format(OUTPUT_FORMAT)),
            None => write!(f, "{}us", self.0),
        }
    }
}

/// Sampling frequency in whole Hz whose period is an exact number of microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frequency(u32);

impl Frequency {
    /// Create a frequency, rejecting zero and values whose period is not a
    /// whole number of microseconds.
    pub fn new(hz: u32) -> Result<Self, MergeError> {
        if hz == 0 {
            return Err(MergeError::config_validation(
                "frequency_hz",
                "frequency must be > 0",
            ));
        }
        if TICKS_PER_SECOND % i64::from(hz) != 0 {
            return Err(MergeError::config_validation(
                "frequency_hz",
                format!("{hz} Hz has no exact microsecond period (must divide 1000000)"),
            ));
        }
        Ok(Self(hz))
    }

    /// Construct from a value already known to be valid
    pub(crate) const fn known(hz: u32) -> Self {
        Self(hz)
    }

    /// Frequency in Hz
    #[inline]
    pub const fn hz(self) -> u32 {
        self.0
    }

    /// Period (1/F) in microseconds
    #[inline]
    pub const fn period_micros(self) -> i64 {
        TICKS_PER_SECOND / self.0 as i64
    }

    /// Whether one period is an integer multiple of the other
    pub fn commensurate_with(self, other: Frequency) -> bool {
        let a = self.period_micros();
        let b = other.period_micros();
        a % b == 0 || b % a == 0
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

/// Parse a raw timestamp field.
///
/// Accepts ISO-8601 date-times (space or `T` separator, optional fraction,
/// optional offset; naive values are UTC), RFC 3339, and decimal epoch seconds.
/// Epoch values outside the calendar range chrono can represent are rejected.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(ts) = parse_epoch_seconds(s) {
        return Some(ts);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(Timestamp(dt.timestamp_micros()));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(Timestamp(dt.timestamp_micros()));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Timestamp(naive.and_utc().timestamp_micros()));
        }
    }

    None
}

/// Exact decimal parse of `[-]SSSS[.ffffff]`; digits past microseconds are truncated.
fn parse_epoch_seconds(s: &str) -> Option<Timestamp> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (whole, frac) = body.split_once('.').unwrap_or((body, ""));

    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let secs: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut micros = 0i64;
    let mut scale = TICKS_PER_SECOND / 10;
    for digit in frac.bytes().take(6) {
        micros += i64::from(digit - b'0') * scale;
        scale /= 10;
    }

    let total = secs.checked_mul(TICKS_PER_SECOND)?.checked_add(micros)?;
    let micros = if negative { -total } else { total };
    DateTime::<Utc>::from_timestamp_micros(micros)?;
    Some(Timestamp(micros))
}

/// Render a signed microsecond span as decimal seconds (`0.25`, `1`, `-0.25`)
pub fn format_seconds(micros: i64) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let abs = micros.unsigned_abs();
    let ticks = TICKS_PER_SECOND as u64;
    let whole = abs / ticks;
    let frac = abs % ticks;

    if frac == 0 {
        format!("{sign}{whole}")
    } else {
        let digits = format!("{frac:06}");
        format!("{sign}{whole}.{}", digits.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hz(value: u32) -> Frequency {
        Frequency::new(value).unwrap()
    }

    #[test]
    fn test_quantize_never_exceeds_input() {
        for f in [1, 4, 32, 64] {
            for micros in [-1_234_567i64, -1, 0, 1, 249_999, 250_000, 1_015_625, 987_654_321] {
                let t = Timestamp::from_micros(micros);
                let q = t.quantize(hz(f));
                assert!(q <= t, "quantize({micros}, {f}) = {q:?}");
                assert_eq!(q.as_micros() % hz(f).period_micros(), 0);
                assert_eq!(q.quantize(hz(f)), q, "idempotent");
            }
        }
    }

    #[test]
    fn test_quantize_examples() {
        let four = hz(4);
        assert_eq!(
            Timestamp::from_millis(1_260).quantize(four),
            Timestamp::from_millis(1_250)
        );
        assert_eq!(
            Timestamp::from_millis(-10).quantize(four),
            Timestamp::from_millis(-250)
        );
        assert!(Timestamp::from_millis(750).is_aligned(four));
        assert!(!Timestamp::from_millis(760).is_aligned(four));
    }

    #[test]
    fn test_frequency_validation() {
        assert!(Frequency::new(0).is_err());
        assert!(Frequency::new(3).is_err());
        assert_eq!(hz(64).period_micros(), 15_625);
        assert!(hz(64).commensurate_with(hz(4)));
        assert!(hz(1).commensurate_with(hz(4)));
        assert!(!hz(5).commensurate_with(hz(4)));
    }

    #[test]
    fn test_parse_iso_variants() {
        let expected = Timestamp::from_micros(1_600_000_000_250_000);
        assert_eq!(parse_timestamp("2020-09-13 12:26:40.250000"), Some(expected));
        assert_eq!(parse_timestamp("2020-09-13T12:26:40.25"), Some(expected));
        assert_eq!(parse_timestamp("2020-09-13 12:26:40.25+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2020-09-13T14:26:40.25+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2020-09-13T12:26:40.25Z"), Some(expected));
        assert_eq!(
            parse_timestamp("2020-09-13 12:26:40"),
            Some(Timestamp::from_secs(1_600_000_000))
        );
    }

    #[test]
    fn test_parse_epoch_seconds_is_exact() {
        assert_eq!(
            parse_timestamp("1600000000.015625"),
            Some(Timestamp::from_micros(1_600_000_000_015_625))
        );
        assert_eq!(parse_timestamp("12"), Some(Timestamp::from_secs(12)));
        assert_eq!(parse_timestamp("-0.5"), Some(Timestamp::from_millis(-500)));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("."), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_epoch_seconds_outside_calendar_rejected() {
        assert_eq!(parse_timestamp("9000000000000"), None);
        assert_eq!(parse_timestamp("-9000000000000"), None);
        assert!(parse_timestamp("8000000000000").is_some());
    }

    #[test]
    fn test_distant_instants_do_not_overflow() {
        let early = Timestamp::from_micros(-8_330_088_643_200_000_000);
        let late = parse_timestamp("8000000000000").unwrap();
        assert_eq!(late.micros_since(early), i64::MAX);
        assert_eq!(early.micros_since(late), i64::MIN);
        assert_eq!(late.offset_micros(i64::MAX).as_micros(), i64::MAX);
        let floor = Timestamp::from_micros(i64::MIN + 1).quantize(hz(4));
        assert_eq!(floor.as_micros(), i64::MIN);
    }

    #[test]
    fn test_display_round_trips() {
        let t = Timestamp::from_micros(1_600_000_000_250_000);
        let rendered = t.to_string();
        assert_eq!(rendered, "2020-09-13 12:26:40.250000");
        assert_eq!(parse_timestamp(&rendered), Some(t));
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0), "0");
        assert_eq!(format_seconds(250_000), "0.25");
        assert_eq!(format_seconds(1_000_000), "1");
        assert_eq!(format_seconds(-250_000), "-0.25");
        assert_eq!(format_seconds(3_015_625), "3.015625");
    }
}
