/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

use crate::error::{TrendsError, TrendsResult};

/// Checks the `YYYYtoYYYY` naming convention used for change-interval
/// directories and table keys.
pub fn is_interval_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() == 10
        && bytes[..4].iter().all(|b| b.is_ascii_digit())
        && &name[4..6] == "to"
        && bytes[6..].iter().all(|b| b.is_ascii_digit())
}

/// Splits an interval name into its start and end years.
pub fn split_interval(interval: &str) -> TrendsResult<(i32, i32)> {
    if !is_interval_name(interval) {
        return Err(TrendsError::Parse(format!(
            "invalid change interval name: {}",
            interval
        )));
    }
    let start = interval[..4].parse::<i32>().map_err(|e| TrendsError::Parse(e.to_string()))?;
    let end = interval[6..].parse::<i32>().map_err(|e| TrendsError::Parse(e.to_string()))?;
    Ok((start, end))
}

/// The sorted, de-duplicated list of years appearing in a list of
/// interval names.
pub fn years_from_intervals(intervals: &[String]) -> Vec<String> {
    let mut years: Vec<String> = vec![];
    for interval in intervals {
        if let Ok((start, end)) = split_interval(interval) {
            years.push(start.to_string());
            years.push(end.to_string());
        }
    }
    years.sort();
    years.dedup();
    years
}

/// Counts how many change intervals fall inside a multichange interval.
pub fn times_changed(multi_interval: &str, change_intervals: &[String]) -> TrendsResult<usize> {
    let (m_start, m_end) = split_interval(multi_interval)?;
    let mut changes = 0;
    for interval in change_intervals {
        let (c_start, c_end) = split_interval(interval)?;
        if c_start >= m_start && c_end <= m_end {
            changes += 1;
        }
    }
    Ok(changes)
}

/// Parses a string of numerical entries such as `1,2,4-6` into the
/// individual numbers. An empty list is returned for empty input; an
/// unparsable entry is an error.
pub fn parse_number_list(invalues: &str) -> TrendsResult<Vec<usize>> {
    let mut numlist = vec![];
    for each in invalues.split(',') {
        let entry = each.trim();
        if entry.is_empty() {
            continue;
        }
        if let Ok(num) = entry.parse::<usize>() {
            numlist.push(num);
        } else {
            let values: Vec<&str> = entry.split('-').collect();
            if values.len() != 2 {
                return Err(TrendsError::Parse(format!(
                    "unable to parse number list entry: {}",
                    entry
                )));
            }
            let start = values[0]
                .trim()
                .parse::<usize>()
                .map_err(|_| TrendsError::Parse(format!("unable to parse number list entry: {}", entry)))?;
            let end = values[1]
                .trim()
                .parse::<usize>()
                .map_err(|_| TrendsError::Parse(format!("unable to parse number list entry: {}", entry)))?;
            for x in start..=end {
                numlist.push(x);
            }
        }
    }
    Ok(numlist)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_interval_names() {
        assert!(is_interval_name("1973to2000"));
        assert!(!is_interval_name("1973-2000"));
        assert!(!is_interval_name("73to2000"));
        assert!(!is_interval_name("1973to200"));
        assert_eq!(split_interval("1980to1986").unwrap(), (1980, 1986));
        assert!(split_interval("nonsense").is_err());
    }

    #[test]
    fn test_years_from_intervals() {
        let intervals = vec![
            "1973to1980".to_string(),
            "1980to1986".to_string(),
            "1986to1992".to_string(),
            "1992to2000".to_string(),
        ];
        assert_eq!(
            years_from_intervals(&intervals),
            vec!["1973", "1980", "1986", "1992", "2000"]
        );
    }

    #[test]
    fn test_times_changed() {
        let intervals = vec![
            "1973to1980".to_string(),
            "1980to1986".to_string(),
            "1986to1992".to_string(),
            "1992to2000".to_string(),
        ];
        assert_eq!(times_changed("1973to2000", &intervals).unwrap(), 4);
        assert_eq!(times_changed("1980to1992", &intervals).unwrap(), 2);
    }

    #[test]
    fn test_parse_number_list() {
        assert_eq!(parse_number_list("1,2,4-6").unwrap(), vec![1, 2, 4, 5, 6]);
        assert_eq!(parse_number_list("17").unwrap(), vec![17]);
        assert!(parse_number_list("").unwrap().is_empty());
        assert!(parse_number_list("1,two").is_err());
    }
}
