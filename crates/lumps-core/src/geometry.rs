#![forbid(unsafe_code)]

//! Inclusive integer rectangles on the simulation grid.

use std::fmt;

/// Errors constructing bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsError {
    /// `min > max` on some axis.
    Inverted {
        axis: &'static str,
        min: i64,
        max: i64,
    },
    /// A domain extent of zero cells.
    ZeroExtent { axis: &'static str },
}

impl fmt::Display for BoundsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inverted { axis, min, max } => {
                write!(f, "inverted {axis} range: min {min} > max {max}")
            }
            Self::ZeroExtent { axis } => write!(f, "{axis} extent must be at least 1"),
        }
    }
}

impl std::error::Error for BoundsError {}

/// Rectangle `[x_min, x_max] × [y_min, y_max]` with inclusive edges.
///
/// Construction guarantees `x_min <= x_max` and `y_min <= y_max`, so every
/// value covers at least one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Bounds {
    x_min: i64,
    x_max: i64,
    y_min: i64,
    y_max: i64,
}

impl Bounds {
    /// Create bounds, rejecting inverted ranges.
    pub fn new(x_min: i64, x_max: i64, y_min: i64, y_max: i64) -> Result<Self, BoundsError> {
        if x_min > x_max {
            return Err(BoundsError::Inverted {
                axis: "x",
                min: x_min,
                max: x_max,
            });
        }
        if y_min > y_max {
            return Err(BoundsError::Inverted {
                axis: "y",
                min: y_min,
                max: y_max,
            });
        }
        Ok(Self {
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }

    /// Domain `[0, x_extent - 1] × [0, y_extent - 1]`.
    pub fn from_extent(x_extent: u32, y_extent: u32) -> Result<Self, BoundsError> {
        if x_extent == 0 {
            return Err(BoundsError::ZeroExtent { axis: "x" });
        }
        if y_extent == 0 {
            return Err(BoundsError::ZeroExtent { axis: "y" });
        }
        Self::new(0, i64::from(x_extent) - 1, 0, i64::from(y_extent) - 1)
    }

    /// A single cell.
    #[must_use]
    pub const fn cell(x: i64, y: i64) -> Self {
        Self {
            x_min: x,
            x_max: x,
            y_min: y,
            y_max: y,
        }
    }

    #[inline]
    #[must_use]
    pub const fn x_min(&self) -> i64 {
        self.x_min
    }

    #[inline]
    #[must_use]
    pub const fn x_max(&self) -> i64 {
        self.x_max
    }

    #[inline]
    #[must_use]
    pub const fn y_min(&self) -> i64 {
        self.y_min
    }

    #[inline]
    #[must_use]
    pub const fn y_max(&self) -> i64 {
        self.y_max
    }

    /// Cells along x (`x_max - x_min + 1`), saturating at `u64::MAX`.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u64 {
        span(self.x_min, self.x_max)
    }

    /// Cells along y (`y_max - y_min + 1`), saturating at `u64::MAX`.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u64 {
        span(self.y_min, self.y_max)
    }

    /// Cell count.
    #[inline]
    #[must_use]
    pub const fn area(&self) -> u128 {
        self.width() as u128 * self.height() as u128
    }

    /// Whether `other` lies entirely inside `self`.
    #[must_use]
    pub const fn contains_bounds(&self, other: &Bounds) -> bool {
        other.x_min >= self.x_min
            && other.x_max <= self.x_max
            && other.y_min >= self.y_min
            && other.y_max <= self.y_max
    }

    /// Whether the two rectangles share at least one cell.
    #[must_use]
    pub const fn overlaps(&self, other: &Bounds) -> bool {
        ranges_overlap(self.x_min, self.x_max, other.x_min, other.x_max)
            && ranges_overlap(self.y_min, self.y_max, other.y_min, other.y_max)
    }

    /// Whether the two rectangles share an edge segment.
    ///
    /// Horizontal neighbors abut on x and overlap on y; vertical neighbors
    /// abut on y and overlap on x. Edge lengths may differ and corner-only
    /// contact does not count.
    #[must_use]
    pub fn is_neighbor(&self, other: &Bounds) -> bool {
        let horizontal = abuts(self.x_max, other.x_min) || abuts(other.x_max, self.x_min);
        if horizontal && ranges_overlap(self.y_min, self.y_max, other.y_min, other.y_max) {
            return true;
        }
        let vertical = abuts(self.y_max, other.y_min) || abuts(other.y_max, self.y_min);
        vertical && ranges_overlap(self.x_min, self.x_max, other.x_min, other.x_max)
    }

    /// Midpoints `(floor((x_min + x_max) / 2), floor((y_min + y_max) / 2))`.
    #[must_use]
    pub fn midpoint(&self) -> (i64, i64) {
        (floor_mid(self.x_min, self.x_max), floor_mid(self.y_min, self.y_max))
    }

    /// The four midpoint quadrants, bottom-left, bottom-right, top-left, top-right.
    ///
    /// A quadrant whose range would be empty (width or height of 1 on that
    /// side) is `None`.
    #[must_use]
    pub fn quadrants(&self) -> [Option<Bounds>; 4] {
        let (mid_x, mid_y) = self.midpoint();
        let (right, top) = (mid_x.checked_add(1), mid_y.checked_add(1));
        let part = |x0: Option<i64>, x1: i64, y0: Option<i64>, y1: i64| {
            Bounds::new(x0?, x1, y0?, y1).ok()
        };
        [
            part(Some(self.x_min), mid_x, Some(self.y_min), mid_y),
            part(right, self.x_max, Some(self.y_min), mid_y),
            part(Some(self.x_min), mid_x, top, self.y_max),
            part(right, self.x_max, top, self.y_max),
        ]
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[({},{})-({},{})]",
            self.x_min, self.y_min, self.x_max, self.y_max
        )
    }
}

const fn span(min: i64, max: i64) -> u64 {
    let cells = max as i128 - min as i128 + 1;
    if cells > u64::MAX as i128 {
        u64::MAX
    } else {
        cells as u64
    }
}

const fn ranges_overlap(a_min: i64, a_max: i64, b_min: i64, b_max: i64) -> bool {
    !(a_max < b_min || b_max < a_min)
}

fn abuts(max: i64, next_min: i64) -> bool {
    max.checked_add(1) == Some(next_min)
}

fn floor_mid(min: i64, max: i64) -> i64 {
    // Sum in i128 so extreme coordinates cannot overflow; div_euclid floors.
    ((i128::from(min) + i128::from(max)).div_euclid(2)) as i64
}
