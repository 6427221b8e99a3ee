use chrono::{Days, NaiveDate};

/// This is the standard way of converting a date to a string in webtally. Record keys depend on
/// it, so the format must not change.
pub fn date_to_record_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn record_name_to_date(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name, "%Y-%m-%d").ok()
}

/// Returns the date `days` before `date`, saturating at the earliest representable date.
pub fn days_before(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_sub_days(Days::new(days.into()))
        .unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{date_to_record_name, days_before, record_name_to_date};

    #[test]
    fn test_record_name_round_trip() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        assert_eq!(date_to_record_name(date), "2026-01-09");
        assert_eq!(record_name_to_date("2026-01-09"), Some(date));
        assert_eq!(record_name_to_date("2026-1-9x"), None);
    }

    #[test]
    fn test_days_before_crosses_months() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(
            days_before(date, 2),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
    }
}
