use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Storage direction of an axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisOrder {
    Ascending,
    Descending,
}

/// Find the nearest index in an ascending `axis` for each of `values`.
///
/// Uses left-sided search-sorted semantics: `idx` is the first position with
/// `axis[idx] >= value`, clamped to the last cell. The left neighbour only wins
/// when it is strictly closer, so exact midpoints resolve to the higher index.
/// Values outside the axis range clamp to the edge cells.
pub fn nearest_index(axis: &[f64], values: &[f64]) -> Vec<usize> {
    values.iter().map(|&v| nearest_sorted(axis, v)).collect()
}

fn nearest_sorted(axis: &[f64], value: f64) -> usize {
    let len = axis.len();
    let mut idx = axis.partition_point(|&a| a < value);
    if idx == len {
        idx = len.saturating_sub(1);
    }
    if idx > 0 && idx < len && value - axis[idx - 1] < axis[idx] - value {
        idx -= 1;
    }
    idx
}

/// A strictly monotonic coordinate axis (all latitudes or all longitudes of a grid).
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    /// Values in ascending order regardless of storage direction
    sorted: Vec<f64>,
    order: AxisOrder,
}

impl Axis {
    /// Build an axis from values in storage order.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::InvalidRaster("axis has no values".to_string()));
        }
        if values.iter().any(|v| v.is_nan()) {
            return Err(Error::InvalidRaster("axis contains NaN".to_string()));
        }

        let ascending = values.windows(2).all(|w| w[0] < w[1]);
        let descending = values.windows(2).all(|w| w[0] > w[1]);

        let mut sorted = values;
        let order = if ascending {
            AxisOrder::Ascending
        } else if descending {
            sorted.reverse();
            AxisOrder::Descending
        } else {
            return Err(Error::InvalidRaster(
                "axis values are not strictly monotonic".to_string(),
            ));
        };

        Ok(Self { sorted, order })
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn order(&self) -> AxisOrder {
        self.order
    }

    /// Value at a storage index
    pub fn value(&self, index: usize) -> Option<f64> {
        match self.order {
            AxisOrder::Ascending => self.sorted.get(index).copied(),
            AxisOrder::Descending => index
                .checked_add(1)
                .and_then(|i| self.sorted.len().checked_sub(i))
                .and_then(|i| self.sorted.get(i).copied()),
        }
    }

    /// Values in storage order
    pub fn to_vec(&self) -> Vec<f64> {
        match self.order {
            AxisOrder::Ascending => self.sorted.clone(),
            AxisOrder::Descending => self.sorted.iter().rev().copied().collect(),
        }
    }

    /// Storage index of the cell nearest to `value`.
    ///
    /// Descending axes are searched through their ascending reverse and the
    /// result mapped back with `len - 1 - idx`.
    pub fn nearest(&self, value: f64) -> usize {
        let idx = nearest_sorted(&self.sorted, value);
        match self.order {
            AxisOrder::Ascending => idx,
            AxisOrder::Descending => self.sorted.len() - 1 - idx,
        }
    }
}
