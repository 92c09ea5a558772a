//! Tabular climate results.

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::io::Write;

use super::period::{aggregate, Period, PERIOD_COUNT};
use super::Variable;
use crate::error::Result;

/// Period values for one variable at one coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodValues([f64; PERIOD_COUNT]);

impl PeriodValues {
    /// Build from twelve monthly values, deriving seasons and the annual mean
    pub fn from_monthly(monthly: &[f64; 12]) -> Self {
        Self(aggregate(monthly))
    }

    fn missing() -> Self {
        Self([f64::NAN; PERIOD_COUNT])
    }

    pub fn get(&self, period: Period) -> f64 {
        self.0[period.index()]
    }
}

impl Serialize for PeriodValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(PERIOD_COUNT))?;
        for period in Period::all() {
            map.serialize_entry(period.name(), &self.get(*period))?;
        }
        map.end()
    }
}

/// Climate statistics for a batch of coordinates.
///
/// Rows follow the query order, duplicates included. Columns are grouped by
/// variable, then by period in [`Period::all`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateTable {
    coordinates: Vec<(f64, f64)>,
    variables: Vec<Variable>,
    /// Row-major blocks: `row * variables.len() + variable_position`
    blocks: Vec<PeriodValues>,
}

impl ClimateTable {
    /// Empty table with every value missing
    pub(crate) fn new(coordinates: Vec<(f64, f64)>, variables: Vec<Variable>) -> Self {
        let blocks = vec![PeriodValues::missing(); coordinates.len() * variables.len()];
        Self {
            coordinates,
            variables,
            blocks,
        }
    }

    pub(crate) fn set(&mut self, row: usize, variable_pos: usize, values: PeriodValues) {
        let width = self.variables.len();
        self.blocks[row * width + variable_pos] = values;
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Row labels as `(lat, lon)`
    pub fn coordinates(&self) -> &[(f64, f64)] {
        &self.coordinates
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Column labels in order
    pub fn columns(&self) -> impl Iterator<Item = (Variable, Period)> + '_ {
        self.variables
            .iter()
            .flat_map(|v| Period::all().iter().map(move |p| (*v, *p)))
    }

    /// Value at a row and column, `None` if either is absent
    pub fn get(&self, row: usize, variable: Variable, period: Period) -> Option<f64> {
        if row >= self.len() {
            return None;
        }
        let pos = self.variables.iter().position(|v| *v == variable)?;
        Some(self.blocks[row * self.variables.len() + pos].get(period))
    }

    /// One row as a labelled series
    pub fn row(&self, row: usize) -> Option<ClimateSeries> {
        let (lat, lon) = *self.coordinates.get(row)?;
        let width = self.variables.len();
        Some(ClimateSeries {
            lat,
            lon,
            variables: self.variables.clone(),
            blocks: self.blocks[row * width..(row + 1) * width].to_vec(),
        })
    }

    /// Collapse to the first row, for queries made with a scalar coordinate
    pub fn into_series(self) -> Option<ClimateSeries> {
        self.row(0)
    }

    /// All rows as labelled series
    pub fn rows(&self) -> impl Iterator<Item = ClimateSeries> + '_ {
        (0..self.len()).filter_map(|i| self.row(i))
    }

    /// Write as CSV with `lat,lon,<variable>_<period>...` columns
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);

        let mut header = vec!["lat".to_string(), "lon".to_string()];
        header.extend(self.columns().map(|(v, p)| format!("{}_{}", v, p)));
        csv.write_record(&header).map_err(std::io::Error::from)?;

        for series in self.rows() {
            let mut record = vec![series.lat.to_string(), series.lon.to_string()];
            record.extend(series.values().map(|(_, _, v)| v.to_string()));
            csv.write_record(&record).map_err(std::io::Error::from)?;
        }

        csv.flush()?;
        Ok(())
    }
}

impl Serialize for ClimateTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows())
    }
}

/// Climate statistics for a single coordinate
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateSeries {
    pub lat: f64,
    pub lon: f64,
    variables: Vec<Variable>,
    blocks: Vec<PeriodValues>,
}

impl ClimateSeries {
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn get(&self, variable: Variable, period: Period) -> Option<f64> {
        let pos = self.variables.iter().position(|v| *v == variable)?;
        Some(self.blocks[pos].get(period))
    }

    /// Period values of one variable
    pub fn variable(&self, variable: Variable) -> Option<&PeriodValues> {
        let pos = self.variables.iter().position(|v| *v == variable)?;
        self.blocks.get(pos)
    }

    /// Labelled values in column order
    pub fn values(&self) -> impl Iterator<Item = (Variable, Period, f64)> + '_ {
        self.variables
            .iter()
            .zip(&self.blocks)
            .flat_map(|(v, block)| Period::all().iter().map(move |p| (*v, *p, block.get(*p))))
    }

    pub fn len(&self) -> usize {
        self.blocks.len() * PERIOD_COUNT
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl Serialize for ClimateSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        struct Blocks<'a>(&'a ClimateSeries);

        impl Serialize for Blocks<'_> {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.blocks.len()))?;
                for (v, block) in self.0.variables.iter().zip(&self.0.blocks) {
                    map.serialize_entry(v.name(), block)?;
                }
                map.end()
            }
        }

        let mut state = serializer.serialize_struct("ClimateSeries", 3)?;
        state.serialize_field("lat", &self.lat)?;
        state.serialize_field("lon", &self.lon)?;
        state.serialize_field("climate", &Blocks(self))?;
        state.end()
    }
}
