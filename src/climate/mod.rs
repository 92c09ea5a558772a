//! WorldClim climate lookups.
//!
//! Each query point takes the nearest grid cell of every requested variable
//! and reports its twelve monthly values, four seasonal means and the annual
//! mean.

mod aggregate;
mod period;
mod table;
mod variable;

pub use aggregate::{get_climate, get_climate_at};
pub use period::{Period, PERIOD_COUNT};
pub use table::{ClimateSeries, ClimateTable, PeriodValues};
pub use variable::{parse_variables, Resolution, Variable};
