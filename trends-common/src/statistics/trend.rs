/*
This code is part of the Trends land-cover change analysis tools.
License: MIT
*/

use crate::structures::Grid;
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use std::cmp::Ordering::Equal;

/// Written in place of a p-value that cannot be computed (too few
/// slopes, or no nonzero slopes for the signed-rank test).
pub const NO_P_VALUE: f64 = -9999.9;

/// Slopes below this magnitude are treated as zero when selecting the
/// signed-rank test input.
const SLOPE_EPSILON: f64 = 1e-4;

/// Result of the linear-trend significance tests over a
/// composition-by-year table.
#[derive(Clone, Copy, Debug)]
pub struct TrendTest {
    pub slope_mean: f64,
    pub nonzero_slopes: usize,
    pub p_student: f64,
    pub p_wilcoxon: f64,
}

/// Tests whether the per-block linear trend of counts against years
/// differs from zero.
///
/// The data grid holds one row per year and one column per sample
/// block. An ordinary least-squares slope is fitted to each column,
/// giving one slope per block. The slope vector is tested with a
/// two-tailed one-sample Student's t-test (requires more than two
/// slopes), and the nonzero slopes with a Wilcoxon signed-rank test.
pub fn student_wilcoxon(data: &Grid<i64>, years: &[i32]) -> TrendTest {
    let x: Vec<f64> = years.iter().map(|&y| y as f64).collect();
    let mut slopes = Vec::with_capacity(data.columns);
    for col in 0..data.columns {
        let y: Vec<f64> = (0..data.rows).map(|row| data.get_value(row, col) as f64).collect();
        slopes.push(regression_slope(&x, &y));
    }

    let slope_mean = slopes.iter().sum::<f64>() / slopes.len() as f64;

    let p_student = if slopes.len() > 2 {
        one_sample_t_test(&slopes)
    } else {
        NO_P_VALUE
    };

    let nonzero: Vec<f64> = slopes
        .iter()
        .copied()
        .filter(|s| s.abs() > SLOPE_EPSILON)
        .collect();
    let p_wilcoxon = if !nonzero.is_empty() {
        wilcoxon_signed_rank(&nonzero)
    } else {
        NO_P_VALUE
    };

    TrendTest {
        slope_mean,
        nonzero_slopes: nonzero.len(),
        p_student,
        p_wilcoxon,
    }
}

/// Closed-form slope of the two-variable least-squares fit of y on x.
fn regression_slope(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mut sum_x = 0f64;
    let mut sum_y = 0f64;
    let mut sum_xy = 0f64;
    let mut sum_xx = 0f64;
    for i in 0..x.len() {
        sum_x += x[i];
        sum_y += y[i];
        sum_xy += x[i] * y[i];
        sum_xx += x[i] * x[i];
    }
    (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x)
}

/// Two-tailed p-value of the one-sample t-test against a zero mean.
fn one_sample_t_test(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let s_squared = values
        .iter()
        .map(|&v| {
            let dev = v - mean;
            dev * dev
        })
        .sum::<f64>()
        / (n - 1.0);
    let std_err = (s_squared / n).sqrt();
    if std_err == 0.0 {
        return NO_P_VALUE;
    }
    let t_stat = mean / std_err;
    let distribution = StudentsT::new(0.0, 1.0, n - 1.0).unwrap();
    2f64 * (1f64 - distribution.cdf(t_stat.abs()))
}

/// Two-tailed p-value of the Wilcoxon signed-rank test of `diffs`
/// against a zero median, using tie-averaged ranks and the normal
/// approximation for the signed-rank sum.
pub fn wilcoxon_signed_rank(diffs: &[f64]) -> f64 {
    let mut diffs = diffs.to_vec();
    // sort the absolute differences
    diffs.sort_by(|a, b| a.abs().partial_cmp(&b.abs()).unwrap_or(Equal));

    // create the ranks, ignoring zero differences and accounting for ties
    let mut ranks = vec![-1f64; diffs.len()];
    let mut nr = 0u64; // number of non-zero ranks
    let mut r = 0f64;
    for i in 0..diffs.len() {
        if diffs[i] != 0f64 {
            nr += 1;
            if ranks[i] == -1f64 {
                r += 1f64;
                if i < diffs.len() - 1 {
                    // are there any ties above this one?
                    let mut upper_range = i;
                    for j in i + 1..diffs.len() {
                        if diffs[j].abs() == diffs[i].abs() {
                            upper_range = j
                        } else {
                            break;
                        }
                    }
                    if upper_range != i {
                        let r2 = r + (upper_range - i) as f64;
                        r = (r + r2) / 2f64; // average rank
                        for k in i..=upper_range {
                            ranks[k] = r * diffs[k].signum();
                        }
                        r = r2;
                    } else {
                        ranks[i] = r * diffs[i].signum();
                    }
                } else {
                    ranks[i] = r * diffs[i].signum();
                }
            }
        // else do nothing, it was sorted in a previous iteration
        } else {
            ranks[i] = 0f64;
        }
    }
    if nr == 0 {
        return NO_P_VALUE;
    }
    let w: f64 = ranks.iter().sum();
    let sigma_w = ((nr * (nr + 1) * (2 * nr + 1) / 6) as f64).sqrt();
    let z_value = w / sigma_w;
    let distribution = Normal::new(0.0, 1.0).unwrap();
    2f64 * (1f64 - distribution.cdf(z_value.abs()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::structures::Grid;

    #[test]
    fn test_regression_slope() {
        let x = [1973f64, 1980f64, 1986f64, 1992f64, 2000f64];
        // y = 3x - 5000 exactly
        let y: Vec<f64> = x.iter().map(|&v| 3.0 * v - 5000.0).collect();
        let slope = regression_slope(&x, &y);
        assert!((slope - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_one_sample_t_test_symmetry() {
        // A centred sample has t = 0 and p = 1.
        let p = one_sample_t_test(&[-2.0, -1.0, 0.0, 1.0, 2.0]);
        assert!((p - 1.0).abs() < 1e-9);
        // A strongly one-sided sample is clearly significant.
        let p = one_sample_t_test(&[5.0, 5.1, 4.9, 5.2, 5.0, 4.8]);
        assert!(p < 0.001);
    }

    #[test]
    fn test_wilcoxon_balanced_sample() {
        // Perfectly antisymmetric ranks give W = 0 and p = 1.
        let p = wilcoxon_signed_rank(&[-3.0, -2.0, -1.0, 1.0, 2.0, 3.0]);
        assert!((p - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_wilcoxon_with_ties() {
        // Ties share an averaged rank; all-positive input is one-sided.
        let p = wilcoxon_signed_rank(&[1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0]);
        assert!(p < 0.05);
    }

    #[test]
    fn test_student_wilcoxon_flat_data() {
        // Constant counts: every slope is zero, so there is nothing for
        // the signed-rank test and the t-test cannot reject.
        let data: Grid<i64> = Grid::new(5, 4, 7);
        let result = student_wilcoxon(&data, &[1973, 1980, 1986, 1992, 2000]);
        assert_eq!(result.nonzero_slopes, 0);
        assert_eq!(result.p_wilcoxon, NO_P_VALUE);
        assert!((result.slope_mean - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_student_wilcoxon_rising_trend() {
        // Counts rising by two per year in every block.
        let years = [1970, 1971, 1972, 1973, 1974];
        let mut data: Grid<i64> = Grid::new(5, 6, 0);
        for row in 0..5 {
            for col in 0..6 {
                data.set_value(row, col, (10 + 2 * row) as i64);
            }
        }
        let result = student_wilcoxon(&data, &years);
        assert_eq!(result.nonzero_slopes, 6);
        assert!((result.slope_mean - 2.0).abs() < 1e-9);
        assert!(result.p_wilcoxon < 0.05);
    }
}
