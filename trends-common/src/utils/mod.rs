/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

// private sub-module defined in other files
mod intervals;
mod logger;

// exports identifiers from private sub-modules in the current module namespace
pub use self::intervals::{
    is_interval_name, parse_number_list, split_interval, times_changed, years_from_intervals,
};
pub use self::logger::{TrendsLogger, TRENDS_LOG_FILE};

use std::time::Instant;

/// Returns a formatted string of elapsed time, e.g.
/// `1min 34.852s`
pub fn get_formatted_elapsed_time(instant: Instant) -> String {
    let dur = instant.elapsed();
    let minutes = dur.as_secs() / 60;
    let sub_sec = dur.as_secs() % 60;
    let sub_milli = dur.subsec_millis();
    if minutes > 0 {
        return format!("{}min {}.{}s", minutes, sub_sec, sub_milli);
    }
    format!("{}.{}s", sub_sec, sub_milli)
}
