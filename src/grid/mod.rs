//! Nearest-cell resolution on sorted 1-D coordinate axes.

mod axis;

pub use axis::{nearest_index, Axis, AxisOrder};
