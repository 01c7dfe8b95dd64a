use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::contract::model::CalendarDate;

/// Maps caller dates onto the canonical meeting date: midnight of the
/// calendar day in the reference timezone, expressed in UTC.
#[derive(Debug, Clone, Copy)]
pub struct DateNormalizer {
    tz: Tz,
}

impl DateNormalizer {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Instants are first moved into the reference timezone, so the day is the
    /// one a local observer would name.
    pub fn normalize(&self, date: &CalendarDate) -> DateTime<Utc> {
        let day = match date {
            CalendarDate::Day(day) => *day,
            CalendarDate::Instant(at) => at.with_timezone(&self.tz).date_naive(),
        };
        self.start_of_day(day)
    }

    /// The calendar day a stored meeting date denotes.
    pub fn local_day(&self, normalized: DateTime<Utc>) -> NaiveDate {
        normalized.with_timezone(&self.tz).date_naive()
    }

    fn start_of_day(&self, day: NaiveDate) -> DateTime<Utc> {
        let midnight = day.and_time(NaiveTime::MIN);
        // Ambiguous midnight takes the earlier instant.
        if let Some(t) = self.tz.from_local_datetime(&midnight).earliest() {
            return t.with_timezone(&Utc);
        }
        // Midnight skipped by a DST jump: the day starts at the first valid minute.
        (1..=180)
            .map(|m| midnight + TimeDelta::minutes(m))
            .find_map(|t| self.tz.from_local_datetime(&t).earliest())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset};

    fn day(y: i32, m: u32, d: u32) -> CalendarDate {
        CalendarDate::Day(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn instant(s: &str) -> CalendarDate {
        CalendarDate::Instant(DateTime::<FixedOffset>::parse_from_rfc3339(s).unwrap())
    }

    #[test]
    fn utc_midnight_for_utc_reference() {
        let n = DateNormalizer::new(chrono_tz::UTC);
        assert_eq!(
            n.normalize(&day(2025, 10, 26)).to_rfc3339(),
            "2025-10-26T00:00:00+00:00"
        );
    }

    #[test]
    fn same_local_day_collides_regardless_of_time_and_offset() {
        let n = DateNormalizer::new(chrono_tz::America::Sao_Paulo);
        let a = n.normalize(&instant("2025-10-26T00:05:00-03:00"));
        let b = n.normalize(&instant("2025-10-26T23:59:00-03:00"));
        // 02:30 UTC on the 27th is still the 26th in Sao Paulo.
        let c = n.normalize(&instant("2025-10-27T02:30:00Z"));
        let d = n.normalize(&day(2025, 10, 26));
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, d);
        assert_eq!(a.to_rfc3339(), "2025-10-26T03:00:00+00:00");

        let next = n.normalize(&instant("2025-10-27T03:00:00Z"));
        assert_ne!(a, next);
    }

    #[test]
    fn dst_transitions_still_yield_one_instant_per_day() {
        // Clocks go back at 01:00 UTC on 2025-10-26 in Lisbon; midnight is unambiguous.
        let lisbon = DateNormalizer::new(chrono_tz::Europe::Lisbon);
        assert_eq!(
            lisbon.normalize(&day(2025, 10, 26)).to_rfc3339(),
            "2025-10-25T23:00:00+00:00"
        );

        // Havana springs forward at midnight: 00:00 does not exist on 2025-03-09.
        let havana = DateNormalizer::new(chrono_tz::America::Havana);
        let start = havana.normalize(&day(2025, 3, 9));
        assert_eq!(havana.local_day(start), NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
    }

    #[test]
    fn local_day_inverts_normalize() {
        let n = DateNormalizer::new(chrono_tz::Asia::Tokyo);
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(n.local_day(n.normalize(&CalendarDate::Day(d))), d);
    }
}
