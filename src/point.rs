use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer grid coordinate. Doubles as a relative offset inside a window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Translate a pixel position into the cell that contains it.
    /// Negative pixels land in negative cells (floor division), so the grid
    /// rejects them as out of bounds instead of snapping them onto column 0.
    pub fn from_pixel(px: i32, py: i32, cell_size: u32) -> Self {
        let c = i32::try_from(cell_size.max(1)).unwrap_or(i32::MAX);
        Self {
            x: px.div_euclid(c),
            y: py.div_euclid(c),
        }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
