// Calendar-day bucketing in a fixed UTC offset. Timestamps are unix millis throughout.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeDelta, Utc};

pub const MS_PER_HOUR: i64 = 3_600_000;
pub const MS_PER_DAY: i64 = 86_400_000;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Maps timestamps to calendar days for one configured offset.
#[derive(Debug, Clone, Copy)]
pub struct DayClock {
    offset: FixedOffset,
}

impl Default for DayClock {
    fn default() -> Self {
        Self { offset: Utc.fix() }
    }
}

impl DayClock {
    pub fn from_offset_minutes(minutes: i32) -> anyhow::Result<Self> {
        let offset = FixedOffset::east_opt(minutes * 60)
            .ok_or_else(|| anyhow::anyhow!("invalid utc offset: {} minutes", minutes))?;
        Ok(Self { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Calendar day containing `ts_ms`.
    pub fn day_of(&self, ts_ms: i64) -> NaiveDate {
        DateTime::from_timestamp_millis(ts_ms)
            .unwrap_or_default()
            .with_timezone(&self.offset)
            .date_naive()
    }

    /// Local hour label (`HH:00`) for `ts_ms`.
    pub fn hour_label(&self, ts_ms: i64) -> String {
        DateTime::from_timestamp_millis(ts_ms)
            .unwrap_or_default()
            .with_timezone(&self.offset)
            .format("%H:00")
            .to_string()
    }

    /// Unix millis of local midnight starting `date`.
    pub fn day_start_ms(&self, date: NaiveDate) -> i64 {
        let local_midnight = date.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
        local_midnight - (self.offset.local_minus_utc() as i64) * 1000
    }

    /// Half-open `[start, end)` millis covering `date`.
    pub fn day_bounds(&self, date: NaiveDate) -> (i64, i64) {
        let start = self.day_start_ms(date);
        (start, start + MS_PER_DAY)
    }
}

/// `date` minus `days` calendar days, or `None` when that falls outside chrono's range.
pub fn checked_days_before(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    TimeDelta::try_days(days).and_then(|delta| date.checked_sub_signed(delta))
}

/// `date` minus `days` calendar days, saturating at `NaiveDate::MIN`.
pub fn days_before(date: NaiveDate, days: i64) -> NaiveDate {
    checked_days_before(date, days).unwrap_or(NaiveDate::MIN)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
}

/// Current wall-clock time in unix millis.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn utc_day_bounds_are_midnight_to_midnight() {
        let clock = DayClock::default();
        let (start, end) = clock.day_bounds(date(2024, 3, 1));
        assert_eq!(start, 1_709_251_200_000);
        assert_eq!(end - start, MS_PER_DAY);
        assert_eq!(clock.day_of(start), date(2024, 3, 1));
        assert_eq!(clock.day_of(end - 1), date(2024, 3, 1));
        assert_eq!(clock.day_of(end), date(2024, 3, 2));
    }

    #[test]
    fn positive_offset_shifts_day_boundary_earlier() {
        let clock = DayClock::from_offset_minutes(8 * 60).unwrap();
        // 2024-03-01T16:00Z is 2024-03-02T00:00+08:00
        let ts = 1_709_251_200_000 + 16 * MS_PER_HOUR;
        assert_eq!(clock.day_of(ts), date(2024, 3, 2));
        assert_eq!(clock.day_start_ms(date(2024, 3, 2)), ts);
        assert_eq!(clock.hour_label(ts), "00:00");
    }

    #[test]
    fn rejects_out_of_range_offset() {
        assert!(DayClock::from_offset_minutes(24 * 60).is_err());
    }

    #[test]
    fn date_roundtrip_and_arithmetic() {
        let d = parse_date("2024-03-01").unwrap();
        assert_eq!(format_date(days_before(d, 1)), "2024-02-29");
        assert!(parse_date("03/01/2024").is_err());
    }

    #[test]
    fn day_arithmetic_near_min_date_does_not_panic() {
        assert_eq!(checked_days_before(NaiveDate::MIN, 1), None);
        assert_eq!(checked_days_before(date(2024, 3, 1), i64::MAX), None);
        assert_eq!(days_before(NaiveDate::MIN, 13), NaiveDate::MIN);
    }
}
