use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate};

/// Days in the calendar year of `date` under the Gregorian leap rule.
pub fn days_in_year(date: NaiveDate) -> u32 {
    if date.leap_year() {
        366
    } else {
        365
    }
}

/// Sine/cosine encoding of the day of year.
///
/// Dec 31 and Jan 1 land next to each other on the unit circle, avoiding
/// the year-boundary discontinuity of a raw day number.
pub fn cyclic_day_of_year(date: NaiveDate) -> (f64, f64) {
    let angle = 2.0 * PI * f64::from(date.ordinal()) / f64::from(days_in_year(date));
    (angle.sin(), angle.cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn leap_rule_is_gregorian() {
        assert_eq!(days_in_year(ymd(2024, 1, 1)), 366);
        assert_eq!(days_in_year(ymd(2023, 1, 1)), 365);
        assert_eq!(days_in_year(ymd(2000, 1, 1)), 366);
        assert_eq!(days_in_year(ymd(1900, 1, 1)), 365);
    }

    #[test]
    fn encoding_stays_on_the_unit_circle() {
        for date in [ymd(2020, 1, 1), ymd(2020, 7, 15), ymd(2021, 12, 31), ymd(2024, 2, 29)] {
            let (s, c) = cyclic_day_of_year(date);
            assert!((s * s + c * c - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn encoding_is_continuous_across_the_year_boundary() {
        let (s1, c1) = cyclic_day_of_year(ymd(2021, 12, 31));
        let (s2, c2) = cyclic_day_of_year(ymd(2021, 1, 1));
        let dist = ((s1 - s2).powi(2) + (c1 - c2).powi(2)).sqrt();
        // one day of arc, about 2π/365
        assert!(dist < 0.02, "distance {dist}");
    }
}
