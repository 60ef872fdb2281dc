use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::raster::GridInfo;
use crate::error::{Error, Result};

/// Relative tolerance for comparing pixel sizes.
pub const RESOLUTION_TOLERANCE: f64 = 1e-9;

/// Grid comparison of a re-gridded "before" raster against its "after" raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentReport {
    pub width_matches: bool,
    pub height_matches: bool,
    pub x_resolution_matches: bool,
    pub y_resolution_matches: bool,
    pub before_size: (usize, usize),
    pub after_size: (usize, usize),
    pub before_resolution: (f64, f64),
    pub after_resolution: (f64, f64),
}

impl AlignmentReport {
    pub fn is_aligned(&self) -> bool {
        self.width_matches && self.height_matches && self.x_resolution_matches && self.y_resolution_matches
    }

    /// `Ok(())` when aligned, `Error::Misaligned` otherwise.
    pub fn ensure(&self) -> Result<()> {
        if self.is_aligned() {
            Ok(())
        } else {
            Err(Error::Misaligned(self.to_string()))
        }
    }
}

impl fmt::Display for AlignmentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "before {}x{} @ ({}, {}), after {}x{} @ ({}, {})",
            self.before_size.0,
            self.before_size.1,
            self.before_resolution.0,
            self.before_resolution.1,
            self.after_size.0,
            self.after_size.1,
            self.after_resolution.0,
            self.after_resolution.1
        )
    }
}

fn close(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    let scale = a.abs().max(b.abs());
    (a - b).abs() <= RESOLUTION_TOLERANCE * scale
}

/// Compare width, height and x/y pixel size of two grids.
pub fn validate_alignment(before: &GridInfo, after: &GridInfo) -> AlignmentReport {
    let (bx, by) = before.resolution();
    let (ax, ay) = after.resolution();
    AlignmentReport {
        width_matches: before.width == after.width,
        height_matches: before.height == after.height,
        x_resolution_matches: close(bx, ax),
        y_resolution_matches: close(by, ay),
        before_size: (before.width, before.height),
        after_size: (after.width, after.height),
        before_resolution: (bx, by),
        after_resolution: (ax, ay),
    }
}

/// Grid of `before` re-gridded onto the size of `after`, same extent as `before`.
pub fn target_grid(before: &GridInfo, after: &GridInfo) -> GridInfo {
    before.regridded(after.width, after.height)
}
