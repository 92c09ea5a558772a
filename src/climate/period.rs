//! Result periods: months, meteorological seasons, and the annual mean.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
    /// December, January, February
    Djf,
    /// March, April, May
    Mam,
    /// June, July, August
    Jja,
    /// September, October, November
    Son,
    /// All twelve months
    Ann,
}

/// Number of periods in a result row for one variable
pub const PERIOD_COUNT: usize = 17;

impl Period {
    /// All periods in column order
    pub fn all() -> &'static [Period; PERIOD_COUNT] {
        &[
            Period::Jan,
            Period::Feb,
            Period::Mar,
            Period::Apr,
            Period::May,
            Period::Jun,
            Period::Jul,
            Period::Aug,
            Period::Sep,
            Period::Oct,
            Period::Nov,
            Period::Dec,
            Period::Djf,
            Period::Mam,
            Period::Jja,
            Period::Son,
            Period::Ann,
        ]
    }

    /// Column position within a variable's block
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Zero-based months averaged for this period
    pub fn months(&self) -> &'static [usize] {
        match self {
            Period::Jan => &[0],
            Period::Feb => &[1],
            Period::Mar => &[2],
            Period::Apr => &[3],
            Period::May => &[4],
            Period::Jun => &[5],
            Period::Jul => &[6],
            Period::Aug => &[7],
            Period::Sep => &[8],
            Period::Oct => &[9],
            Period::Nov => &[10],
            Period::Dec => &[11],
            Period::Djf => &[11, 0, 1],
            Period::Mam => &[2, 3, 4],
            Period::Jja => &[5, 6, 7],
            Period::Son => &[8, 9, 10],
            Period::Ann => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        }
    }

    pub fn is_month(&self) -> bool {
        self.index() < 12
    }

    pub fn name(&self) -> &'static str {
        match self {
            Period::Jan => "jan",
            Period::Feb => "feb",
            Period::Mar => "mar",
            Period::Apr => "apr",
            Period::May => "may",
            Period::Jun => "jun",
            Period::Jul => "jul",
            Period::Aug => "aug",
            Period::Sep => "sep",
            Period::Oct => "oct",
            Period::Nov => "nov",
            Period::Dec => "dec",
            Period::Djf => "djf",
            Period::Mam => "mam",
            Period::Jja => "jja",
            Period::Son => "son",
            Period::Ann => "ann",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Expand twelve monthly values into all periods.
///
/// Seasons and the annual value are plain arithmetic means of their months.
/// NaN months are skipped; a period with no finite month is NaN.
pub fn aggregate(monthly: &[f64; 12]) -> [f64; PERIOD_COUNT] {
    let mut out = [f64::NAN; PERIOD_COUNT];
    for period in Period::all() {
        out[period.index()] = mean(period.months().iter().map(|&m| monthly[m]));
    }
    out
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_period_order() {
        for (i, p) in Period::all().iter().enumerate() {
            assert_eq!(p.index(), i);
        }
        assert!(Period::Dec.is_month());
        assert!(!Period::Djf.is_month());
    }

    #[test]
    fn test_seasonal_means() {
        let monthly: [f64; 12] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        let out = aggregate(&monthly);

        for m in 0..12 {
            assert_eq!(out[m], monthly[m]);
        }
        assert_close(out[Period::Djf.index()], (12.0 + 1.0 + 2.0) / 3.0);
        assert_close(out[Period::Mam.index()], 4.0);
        assert_close(out[Period::Jja.index()], 7.0);
        assert_close(out[Period::Son.index()], 10.0);
        assert_close(out[Period::Ann.index()], 6.5);
    }

    #[test]
    fn test_nan_months_are_skipped() {
        let mut monthly = [2.0; 12];
        monthly[0] = f64::NAN;
        let out = aggregate(&monthly);
        assert!(out[Period::Jan.index()].is_nan());
        assert_close(out[Period::Djf.index()], 2.0);
        assert_close(out[Period::Ann.index()], 2.0);

        let out = aggregate(&[f64::NAN; 12]);
        assert!(out[Period::Ann.index()].is_nan());
    }
}
