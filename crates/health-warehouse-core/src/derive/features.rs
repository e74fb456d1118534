//! Pure feature functions.

use chrono::{Datelike, NaiveDate, Weekday};

use super::{DerivationError, DerivationResult};
use crate::config::PatientStatusThresholds;

/// Whole days from `start` to `end`; negative when `end` is earlier.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Days from admission to discharge. `None` while the stay is open.
pub fn length_of_stay(admission: NaiveDate, discharge: Option<NaiveDate>) -> Option<i64> {
    discharge.map(|d| days_between(admission, d))
}

/// True when the patient was readmitted 0 to `window_days` days after a
/// recorded discharge. Without a discharge date the flag is always false.
pub fn readmission_flag(
    discharge: Option<NaiveDate>,
    readmission: Option<NaiveDate>,
    window_days: i64,
) -> bool {
    match (discharge, readmission) {
        (Some(discharge), Some(readmission)) => {
            let gap = days_between(discharge, readmission);
            gap >= 0 && gap <= window_days
        }
        _ => false,
    }
}

/// Cost spread over the stay, counting the admission day.
pub fn claim_cost_per_day(cost: f64, length_of_stay: i64) -> DerivationResult<f64> {
    per_day(cost, length_of_stay + 1, "cost_per_day", "length_of_stay + 1")
}

/// `days_supplied / days_prescribed`, clamped to [0, 1].
pub fn adherence_rate(days_supplied: i64, days_prescribed: i64) -> DerivationResult<f64> {
    if days_prescribed == 0 {
        return Err(DerivationError::ZeroDivisor {
            field: "adherence_rate",
            divisor: "days_prescribed",
        });
    }
    Ok((days_supplied as f64 / days_prescribed as f64).clamp(0.0, 1.0))
}

/// `cost / days`, failing on a zero divisor.
pub fn per_day(
    cost: f64,
    days: i64,
    field: &'static str,
    divisor: &'static str,
) -> DerivationResult<f64> {
    if days == 0 {
        return Err(DerivationError::ZeroDivisor { field, divisor });
    }
    Ok(cost / days as f64)
}

/// Calendar quarter, 1-4.
pub fn quarter(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Engagement status from days since the last visit.
pub fn patient_status(days_since_last_visit: i64, thresholds: &PatientStatusThresholds) -> &'static str {
    if days_since_last_visit <= thresholds.active_within_days {
        "Active"
    } else if days_since_last_visit <= thresholds.inactive_within_days {
        "Inactive"
    } else {
        "Dormant"
    }
}

/// "City, ST".
pub fn full_address(city: &str, state: &str) -> String {
    format!("{}, {}", city, state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_length_of_stay() {
        assert_eq!(length_of_stay(date(2024, 1, 1), Some(date(2024, 1, 5))), Some(4));
        assert_eq!(length_of_stay(date(2024, 1, 1), Some(date(2024, 1, 1))), Some(0));
        assert_eq!(length_of_stay(date(2024, 1, 1), None), None);
    }

    #[test]
    fn test_readmission_window_edges() {
        let discharge = Some(date(2024, 1, 5));
        assert!(readmission_flag(discharge, Some(date(2024, 1, 20)), 30));
        assert!(readmission_flag(discharge, Some(date(2024, 2, 4)), 30));
        assert!(!readmission_flag(discharge, Some(date(2024, 2, 5)), 30));
        assert!(readmission_flag(discharge, Some(date(2024, 1, 5)), 30));
        assert!(!readmission_flag(discharge, Some(date(2024, 1, 4)), 30));
        assert!(!readmission_flag(None, Some(date(2024, 1, 20)), 30));
        assert!(!readmission_flag(discharge, None, 30));
    }

    #[test]
    fn test_adherence_rate_clamped() {
        let rate = adherence_rate(20, 30).unwrap();
        assert!((rate - 0.6667).abs() < 1e-3);
        assert_eq!(adherence_rate(45, 30).unwrap(), 1.0);
        assert_eq!(
            adherence_rate(10, 0).unwrap_err(),
            DerivationError::ZeroDivisor {
                field: "adherence_rate",
                divisor: "days_prescribed"
            }
        );
    }

    #[test]
    fn test_claim_cost_per_day_counts_admission_day() {
        assert_eq!(claim_cost_per_day(12000.0, 4).unwrap(), 2400.0);
        assert_eq!(claim_cost_per_day(500.0, 0).unwrap(), 500.0);
    }

    #[test]
    fn test_calendar_parts() {
        assert_eq!(quarter(date(2024, 1, 31)), 1);
        assert_eq!(quarter(date(2024, 4, 1)), 2);
        assert_eq!(quarter(date(2024, 9, 30)), 3);
        assert_eq!(quarter(date(2024, 12, 1)), 4);
        assert_eq!(weekday_name(date(2024, 1, 1)), "Monday");
        assert_eq!(weekday_name(date(2024, 3, 3)), "Sunday");
    }

    #[test]
    fn test_patient_status_thresholds() {
        let t = PatientStatusThresholds::default();
        assert_eq!(patient_status(0, &t), "Active");
        assert_eq!(patient_status(90, &t), "Active");
        assert_eq!(patient_status(91, &t), "Inactive");
        assert_eq!(patient_status(365, &t), "Inactive");
        assert_eq!(patient_status(366, &t), "Dormant");
    }
}
