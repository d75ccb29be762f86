use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

pub const PEAK_MULTIPLIER: f64 = 1.5;
pub const OVERNIGHT_MULTIPLIER: f64 = 0.5;
pub const WEEKEND_MULTIPLIER: f64 = 1.3;

/// Demand boost for the local hour and weekday.
///
/// Late morning to early afternoon (10-14) and evenings (18-22) are peak hours,
/// midnight through 6am is quiet, and weekends scale whatever the hour gives.
pub fn time_multiplier(local: NaiveDateTime) -> f64 {
    let hour = local.hour();
    let mut multiplier = if (10..=14).contains(&hour) || (18..=22).contains(&hour) {
        PEAK_MULTIPLIER
    } else if hour <= 6 {
        OVERNIGHT_MULTIPLIER
    } else {
        1.0
    };

    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        multiplier *= WEEKEND_MULTIPLIER;
    }
    multiplier
}
