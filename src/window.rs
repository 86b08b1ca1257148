use crate::entity::EntityId;
use crate::error::StepError;
use crate::grid::Grid;
use crate::point::Point;

/// Read-only k×k snapshot of the grid around a centre cell.
/// Cells beyond the grid edge read as empty.
#[derive(Clone, Debug)]
pub struct Window {
    size: usize,
    center: Point,
    cells: Vec<Option<EntityId>>,
}

/// Build the window of side `size` around `center`.
pub fn make_window(grid: &Grid, center: Point, size: usize) -> Result<Window, StepError> {
    if size % 2 == 0 {
        return Err(StepError::InvalidKernelSize(size));
    }
    let reach = (size / 2) as i32;
    let mut cells = Vec::with_capacity(size * size);
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            cells.push(grid.cell_or_empty(center.x + dx, center.y + dy));
        }
    }
    Ok(Window {
        size,
        center,
        cells,
    })
}

impl Window {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn reach(&self) -> usize {
        self.size / 2
    }

    /// Grid coordinate of the centre cell.
    pub fn grid_coords(&self) -> Point {
        self.center
    }

    pub fn center(&self) -> Option<EntityId> {
        let r = self.reach();
        self.cells[r * self.size + r]
    }

    /// Cell at matrix index `offset`, both components in `[0, size)`.
    ///
    /// # Panics
    /// If `offset` lies outside the matrix.
    pub fn get(&self, offset: Point) -> Option<EntityId> {
        assert!(
            offset.x >= 0 && offset.y >= 0 && (offset.x as usize) < self.size && (offset.y as usize) < self.size,
            "window offset {} outside {}x{}",
            offset,
            self.size,
            self.size
        );
        self.cells[offset.y as usize * self.size + offset.x as usize]
    }

    /// Cell at `(dx, dy)` relative to the centre, each in `[-reach, reach]`.
    pub fn rel(&self, dx: i32, dy: i32) -> Option<EntityId> {
        let r = self.reach() as i32;
        self.get(Point::new(dx + r, dy + r))
    }

    pub fn is_live(&self, offset: Point) -> bool {
        self.get(offset).is_some()
    }

    pub fn count_live_neighbors(&self) -> usize {
        let c = self.center().is_some() as usize;
        self.cells.iter().filter(|v| v.is_some()).count() - c
    }

    pub fn count_empty_neighbors(&self) -> usize {
        self.size * self.size - 1 - self.count_live_neighbors()
    }
}
