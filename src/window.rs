//! Coverage window: is a published date recent enough to include?
//!
//! Dates arrive as free-form strings (RFC 2822 from RSS, RFC 3339 from Atom,
//! bare `YYYY-MM-DD` and assorted variants elsewhere). They are parsed
//! leniently; a date without an offset is taken to be UTC.
//!
//! [`within_days`] is strict: an empty or unparseable date is rejected. The
//! feed reader only consults it when an entry actually carries a date, so
//! undated entries bypass the window one level up. Keep that guard at the
//! call site rather than teaching this module about missing dates.

use crate::errors::ParseError;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use std::borrow::Cow;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f %z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%a, %d %b %Y %H:%M:%S",
    "%a, %d %b %Y %H:%M",
    "%d %b %Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %b %Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// Zone names written in place of a numeric UTC offset.
const UTC_ZONE_NAMES: &[&str] = &["UTC", "UT", "GMT", "Z"];

/// `"... 08:00:00 UTC"` becomes `"... 08:00:00 +0000"`.
fn numeric_utc_zone(s: &str) -> Cow<'_, str> {
    match s.rsplit_once(char::is_whitespace) {
        Some((head, zone)) if UTC_ZONE_NAMES.iter().any(|z| zone.eq_ignore_ascii_case(z)) => {
            Cow::Owned(format!("{} +0000", head.trim_end()))
        }
        _ => Cow::Borrowed(s),
    }
}

/// Parse a published/updated date string, keeping the offset it was written in.
pub fn parse_published(raw: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Date(raw.to_string()));
    }
    let normalized = numeric_utc_zone(trimmed);
    let s = normalized.as_ref();

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(naive.and_utc().fixed_offset());
            }
        }
    }

    Err(ParseError::Date(raw.to_string()))
}

/// `YYYY-MM-DD` as written by the publisher (in the publisher's own offset).
///
/// For ISO strings this is the part before the `T`.
pub fn display_date(raw: &str) -> String {
    match parse_published(raw) {
        Ok(dt) => dt.date_naive().format("%Y-%m-%d").to_string(),
        Err(_) => match raw.split_once('T') {
            Some((day, _)) => day.to_string(),
            None => raw.to_string(),
        },
    }
}

/// Trailing window of `days` whole days ending at `now`.
#[derive(Debug, Clone, Copy)]
pub struct CoverageWindow {
    days: i64,
    timezone: Tz,
    now: DateTime<Utc>,
}

impl CoverageWindow {
    /// Anchor the window at the current instant, observed in `timezone`.
    pub fn new(days: i64, timezone: Tz) -> Self {
        let now = Utc::now().with_timezone(&timezone).with_timezone(&Utc);
        Self::anchored(days, timezone, now)
    }

    /// Anchor the window at a fixed instant.
    pub fn anchored(days: i64, timezone: Tz, now: DateTime<Utc>) -> Self {
        Self {
            days,
            timezone,
            now,
        }
    }

    pub fn days(&self) -> i64 {
        self.days
    }

    /// Strict check of a date string; see the module docs for the empty-date policy.
    pub fn contains(&self, date: &str) -> bool {
        match parse_published(date) {
            Ok(published) => self.contains_instant(published.with_timezone(&Utc)),
            Err(e) => {
                tracing::debug!(error = %e, "Rejecting item with unparseable date");
                false
            }
        }
    }

    /// Keep when `0 <= whole days elapsed <= days`. Future instants are rejected.
    pub fn contains_instant(&self, published: DateTime<Utc>) -> bool {
        let delta = self.now.signed_duration_since(published);
        if delta < TimeDelta::zero() {
            return false;
        }
        delta.num_days() <= self.days
    }

    /// First and last calendar day of the window in the configured timezone.
    pub fn bounds(&self) -> (String, String) {
        let local_now = self.now.with_timezone(&self.timezone);
        let start = local_now - Duration::days(self.days);
        (
            start.format("%Y-%m-%d").to_string(),
            local_now.format("%Y-%m-%d").to_string(),
        )
    }
}

/// Whether `date` falls inside the trailing `days`-day window ending now.
pub fn within_days(date: &str, days: i64, timezone: Tz) -> bool {
    CoverageWindow::new(days, timezone).contains(date)
}
