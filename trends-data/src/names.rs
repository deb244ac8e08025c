/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

//! Fixed taxonomy shared by every Trends table: the land-cover classes,
//! the dense conversion numbering, and the standard interval mappings.

use trends_common::error::{TrendsError, TrendsResult};
use trends_common::utils::times_changed;

/// Number of Level 3 ecoregions in the standard study design.
pub const NUM_ECOREGIONS: usize = 84;

/// Number of land-cover conversion types, the row dimension of every
/// conversion array. The conversions are the dense cross product of the
/// land-cover classes, diagonal (no change) included.
pub const NUM_CONVERSIONS: usize = 121;

/// Number of land-cover classes.
pub const NUM_LC_TYPES: usize = 11;

/// Number of rows in a multichange array (0 through 29 change events).
pub const NUM_MULTI: usize = 30;

/// Analysis number reserved for the standard full-stratified run.
pub const TRENDS_ANALYSIS_NUM: usize = 1;
pub const TRENDS_ANALYSIS_NAME: &str = "TRENDS";

pub const LC_TYPES: [&str; NUM_LC_TYPES] = [
    "Water",
    "Developed",
    "Mechanically disturbed",
    "Mining",
    "Barren",
    "Forest",
    "Grassland/Shrubland",
    "Agriculture",
    "Wetland",
    "Nonmechanically disturbed",
    "Snow/Ice",
];

/// Abbreviated class names used in fixed-width table headers.
pub const LC_SHORT: [&str; NUM_LC_TYPES] = [
    "Water", "Developed", "Mech.Dist.", "Mining", "Barren", "Forest", "Grs/Shrub", "Agricult",
    "Wetland", "N.M.Dist.", "Snow/Ice",
];

pub const MIN_RESOLUTION: &str = "30m";
pub const MAX_RESOLUTION: &str = "60m";

/// Area of one pixel in square kilometres at the given resolution.
pub fn sqkm_factor(resolution: &str) -> f64 {
    if resolution == MAX_RESOLUTION {
        0.0036
    } else {
        0.0009
    }
}

/// The standard intervals used when building the fixed-width extract
/// tables.
pub const TRENDS_INTERVALS: [&str; 5] = [
    "1973to2000",
    "1973to1980",
    "1980to1986",
    "1986to1992",
    "1992to2000",
];

/// The standard composition years for the fixed-width extract tables.
pub const TRENDS_YEARS: [&str; 5] = ["1973", "1980", "1986", "1992", "2000"];

/// The standard multichange interval.
pub const TRENDS_MULTI_INTERVALS: [&str; 1] = ["1973to2000"];

/// The from and to land-cover classes of a conversion, both 1-based.
/// `transition id = (from - 1) * 11 + to`.
pub fn transition_classes(id: usize) -> (usize, usize) {
    let from = (id - 1) / NUM_LC_TYPES + 1;
    let to = (id - 1) % NUM_LC_TYPES + 1;
    (from, to)
}

pub fn transition_id(from: usize, to: usize) -> usize {
    (from - 1) * NUM_LC_TYPES + to
}

/// Which side of a conversion a land-cover class is matched against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionRole {
    To,
    From,
}

/// The conversion ids involving the given class as source or
/// destination. The no-change (diagonal) conversion is included only
/// when requested: composition sums want it, gain/loss sums do not.
pub fn transitions_for_class(
    lc: usize,
    role: TransitionRole,
    include_no_change: bool,
) -> Vec<usize> {
    let mut conv_list = vec![];
    for id in 1..=NUM_CONVERSIONS {
        let (from, to) = transition_classes(id);
        let matched = match role {
            TransitionRole::To => to == lc,
            TransitionRole::From => from == lc,
        };
        if matched && (from != to || include_no_change) {
            conv_list.push(id);
        }
    }
    conv_list
}

/// The conversion ids that represent actual change (off-diagonal).
pub fn change_transitions() -> Vec<usize> {
    (1..=NUM_CONVERSIONS)
        .filter(|&id| {
            let (from, to) = transition_classes(id);
            from != to
        })
        .collect()
}

/// Number of rows used by a multichange interval, including the extra
/// row for no change. The standard intervals carry fixed counts; any
/// other interval is derived from the change intervals it spans.
pub fn multi_changes(interval: &str, change_intervals: &[String]) -> TrendsResult<usize> {
    match interval {
        "1973to2000" => Ok(5),
        "1973to2010" | "2000to2010" => Ok(7),
        _ => {
            let spanned = times_changed(interval, change_intervals)?;
            if spanned == 0 {
                return Err(TrendsError::Domain(format!(
                    "no change intervals fall within multichange interval {}",
                    interval
                )));
            }
            Ok(spanned + 1)
        }
    }
}

/// Count of base intervals forming each standard cumulative interval,
/// used to derive average annual values in the workbook reports.
pub fn cumulative_interval_span(interval: &str) -> Option<usize> {
    match interval {
        "1973to2000" => Some(4),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_transition_numbering() {
        assert_eq!(transition_classes(1), (1, 1));
        assert_eq!(transition_classes(12), (2, 1));
        assert_eq!(transition_classes(121), (11, 11));
        assert_eq!(transition_id(2, 1), 12);
        for id in 1..=NUM_CONVERSIONS {
            let (from, to) = transition_classes(id);
            assert_eq!(transition_id(from, to), id);
        }
    }

    #[test]
    fn test_transitions_for_class() {
        // Gains into class 6 exclude the 6 -> 6 diagonal.
        let gains = transitions_for_class(6, TransitionRole::To, false);
        assert_eq!(gains.len(), NUM_LC_TYPES - 1);
        assert!(!gains.contains(&transition_id(6, 6)));
        assert!(gains.contains(&transition_id(1, 6)));

        // Composition sums keep the diagonal.
        let comp = transitions_for_class(6, TransitionRole::From, true);
        assert_eq!(comp.len(), NUM_LC_TYPES);
        assert!(comp.contains(&transition_id(6, 6)));
    }

    #[test]
    fn test_change_transitions() {
        let changes = change_transitions();
        assert_eq!(changes.len(), NUM_CONVERSIONS - NUM_LC_TYPES);
        assert!(!changes.contains(&transition_id(4, 4)));
    }

    #[test]
    fn test_multi_changes() {
        let intervals: Vec<String> = ["1973to1980", "1980to1986", "1986to1992", "1992to2000"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(multi_changes("1973to2000", &intervals).unwrap(), 5);
        assert_eq!(multi_changes("1980to1992", &intervals).unwrap(), 3);
        assert!(multi_changes("1880to1890", &intervals).is_err());
    }
}
