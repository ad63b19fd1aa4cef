//! Derived age
//!
//! Age is the difference of the calendar years only. Month and day are
//! ignored, so the result is one too high before the birthday in the
//! current year.

use chrono::{Datelike, NaiveDate};

/// Age at which `esMayorEdad` becomes true
pub const ADULT_AGE: i32 = 18;

/// `today.year() - birth.year()`
pub fn derive_age(birth: NaiveDate, today: NaiveDate) -> i32 {
    today.year() - birth.year()
}

pub fn is_adult(age: i32) -> bool {
    age >= ADULT_AGE
}

/// Source of the current date
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Always reports the same date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_year_difference() {
        let age = derive_age(date(2000, 1, 1), date(2024, 6, 1));
        assert_eq!(age, 24);
        assert!(is_adult(age));
    }

    #[test]
    fn test_ignores_month_and_day() {
        // Birthday not reached yet in 2024, still counted
        assert_eq!(derive_age(date(2006, 12, 31), date(2024, 1, 1)), 18);
    }

    #[test]
    fn test_minor() {
        let age = derive_age(date(2010, 5, 20), date(2024, 6, 1));
        assert_eq!(age, 14);
        assert!(!is_adult(age));
        assert!(!is_adult(17));
        assert!(is_adult(18));
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock(date(2024, 6, 1));
        assert_eq!(clock.today(), date(2024, 6, 1));
    }
}
