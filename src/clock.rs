use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
#[error("Unknown timezone: {0}")]
pub struct UnknownTimezone(pub String);

/// Wall clock of the operation site. Every "today" and "now" the service
/// derives goes through here so the zone is a single named setting.
#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    tz: Tz,
}

impl LocalClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn from_name(name: &str) -> Result<Self, UnknownTimezone> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| UnknownTimezone(name.to_string()))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }

    pub fn now_time(&self) -> NaiveTime {
        Utc::now().with_timezone(&self.tz).time()
    }

    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// Render a stored instant as `YYYY-MM-DD HH:MM:SS` local time.
    pub fn format_timestamp(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.tz).format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn format_opt(&self, instant: Option<DateTime<Utc>>) -> Option<String> {
        instant.map(|i| self.format_timestamp(i))
    }
}

impl Default for LocalClock {
    fn default() -> Self {
        Self::new(chrono_tz::America::Sao_Paulo)
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// Accepts `HH:MM:SS` and `HH:MM`.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn renders_timestamps_in_sao_paulo() {
        let clock = LocalClock::default();
        let instant = Utc.with_ymd_and_hms(2025, 1, 1, 2, 30, 0).unwrap();
        assert_eq!(clock.format_timestamp(instant), "2024-12-31 23:30:00");
        assert_eq!(clock.date_of(instant), NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn resolves_named_zones() {
        let clock = LocalClock::from_name("UTC").unwrap();
        let instant = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(clock.format_timestamp(instant), "2025-06-01 12:00:00");
        assert!(LocalClock::from_name("Mars/Olympus").is_err());
    }

    #[test]
    fn parses_dates_and_times() {
        assert_eq!(parse_date(" 2025-01-01 "), NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(parse_date("01/01/2025"), None);
        assert_eq!(parse_time("08:15"), NaiveTime::from_hms_opt(8, 15, 0));
        assert_eq!(parse_time("08:15:42"), NaiveTime::from_hms_opt(8, 15, 42));
        assert_eq!(parse_time("8h15"), None);
    }
}
