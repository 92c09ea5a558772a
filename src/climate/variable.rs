//! WorldClim v2.0 variables and resolutions.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Monthly climate variable in the WorldClim v2.0 dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Variable {
    /// Minimum temperature
    Tmin,
    /// Maximum temperature
    Tmax,
    /// Average temperature
    Tavg,
    /// Precipitation
    Prec,
    /// Solar radiation
    Srad,
    /// Wind speed
    Wind,
    /// Water vapor pressure
    Vapr,
}

impl Variable {
    /// Variables returned when the caller does not ask for specific ones
    pub const DEFAULT: &'static [Variable] = &[Variable::Tavg, Variable::Prec];

    pub fn all() -> &'static [Variable] {
        &[
            Variable::Tmin,
            Variable::Tmax,
            Variable::Tavg,
            Variable::Prec,
            Variable::Srad,
            Variable::Wind,
            Variable::Vapr,
        ]
    }

    /// Short name used in file names and result columns
    pub fn name(&self) -> &'static str {
        match self {
            Variable::Tmin => "tmin",
            Variable::Tmax => "tmax",
            Variable::Tavg => "tavg",
            Variable::Prec => "prec",
            Variable::Srad => "srad",
            Variable::Wind => "wind",
            Variable::Vapr => "vapr",
        }
    }

    pub fn long_name(&self) -> &'static str {
        match self {
            Variable::Tmin => "minimum temperature",
            Variable::Tmax => "maximum temperature",
            Variable::Tavg => "average temperature",
            Variable::Prec => "precipitation",
            Variable::Srad => "solar radiation",
            Variable::Wind => "wind speed",
            Variable::Vapr => "water vapor pressure",
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            Variable::Tmin | Variable::Tmax | Variable::Tavg => "degC",
            Variable::Prec => "mm",
            Variable::Srad => "kJ m-2 day-1",
            Variable::Wind => "m s-1",
            Variable::Vapr => "kPa",
        }
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variable {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Variable::all()
            .iter()
            .find(|v| v.name() == s)
            .copied()
            .ok_or_else(|| Error::UnknownVariable(s.to_string()))
    }
}

/// Parse variable names, failing on the first unsupported one.
pub fn parse_variables<S: AsRef<str>>(names: &[S]) -> Result<Vec<Variable>> {
    names.iter().map(|n| n.as_ref().parse()).collect()
}

/// Grid spacing of the WorldClim data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    /// 10 arc-minutes
    #[default]
    #[serde(rename = "10m")]
    TenMinutes,
    /// 5 arc-minutes
    #[serde(rename = "5m")]
    FiveMinutes,
    /// 2.5 arc-minutes
    #[serde(rename = "2.5m")]
    TwoAndHalfMinutes,
    /// 30 arc-seconds
    #[serde(rename = "30s")]
    ThirtySeconds,
}

impl Resolution {
    pub fn all() -> &'static [Resolution] {
        &[
            Resolution::TenMinutes,
            Resolution::FiveMinutes,
            Resolution::TwoAndHalfMinutes,
            Resolution::ThirtySeconds,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::TenMinutes => "10m",
            Resolution::FiveMinutes => "5m",
            Resolution::TwoAndHalfMinutes => "2.5m",
            Resolution::ThirtySeconds => "30s",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Resolution::all()
            .iter()
            .find(|r| r.as_str() == s)
            .copied()
            .ok_or_else(|| Error::UnknownResolution(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variables() {
        let vars = parse_variables(&["tavg", "prec"]).unwrap();
        assert_eq!(vars, vec![Variable::Tavg, Variable::Prec]);

        let err = parse_variables(&["tavg", "snow"]).unwrap_err();
        assert!(matches!(err, Error::UnknownVariable(ref v) if v == "snow"));
    }

    #[test]
    fn test_resolution_names() {
        for res in Resolution::all() {
            assert_eq!(res.as_str().parse::<Resolution>().unwrap(), *res);
        }
        assert!("1m".parse::<Resolution>().is_err());
        assert_eq!(Resolution::default(), Resolution::TenMinutes);
    }

    #[test]
    fn test_units() {
        assert_eq!(Variable::Prec.units(), "mm");
        assert_eq!(Variable::Tavg.long_name(), "average temperature");
    }
}
