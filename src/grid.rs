use crate::entity::{Entities, Entity, EntityId, GridId, next_tag};
use crate::error::GridError;
use crate::point::Point;
use crate::rng::Rng;

/// Row-major flat grid of entity handles. Bounded, no wrapping.
/// Owns the arena every placed entity lives in and keeps an O(1) live count.
pub struct Grid {
    id: GridId,
    w: usize,
    h: usize,
    pub(crate) cells: Vec<Option<EntityId>>,
    pub(crate) entities: Entities,
    pub(crate) live: usize,
}

impl Grid {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            id: GridId(next_tag()),
            w,
            h,
            cells: vec![None; w * h],
            entities: Entities::new(),
            live: 0,
        }
    }

    pub fn id(&self) -> GridId {
        self.id
    }

    /// (width, height)
    pub fn bounds(&self) -> (usize, usize) {
        (self.w, self.h)
    }

    #[inline]
    pub fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.w && (p.y as usize) < self.h
    }

    #[inline]
    fn idx(&self, p: Point) -> Result<usize, GridError> {
        if !self.in_bounds(p) {
            return Err(GridError::OutOfBounds {
                point: p,
                width: self.w,
                height: self.h,
            });
        }
        Ok(p.y as usize * self.w + p.x as usize)
    }

    /// Occupant lookup that reads out-of-bounds as empty. Used for window padding.
    #[inline]
    pub(crate) fn cell_or_empty(&self, x: i32, y: i32) -> Option<EntityId> {
        if x < 0 || y < 0 || x as usize >= self.w || y as usize >= self.h {
            return None;
        }
        self.cells[y as usize * self.w + x as usize]
    }

    pub fn get(&self, p: Point) -> Result<Option<EntityId>, GridError> {
        Ok(self.cells[self.idx(p)?])
    }

    pub fn is_occupied(&self, p: Point) -> bool {
        matches!(self.get(p), Ok(Some(_)))
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut Entities {
        &mut self.entities
    }

    /// Place `entity` at `p`, evicting any current occupant first.
    pub fn set(&mut self, p: Point, mut entity: Entity) -> Result<EntityId, GridError> {
        let i = self.idx(p)?;
        if self.cells[i].is_some() {
            self.remove(p)?;
        }
        entity.set_position(p);
        entity.set_owner(Some(self.id));
        let id = self.entities.insert(entity);
        self.cells[i] = Some(id);
        self.live += 1;
        Ok(id)
    }

    /// Place a fresh default dot at `p`.
    pub fn spawn(&mut self, p: Point) -> Result<EntityId, GridError> {
        self.set(p, Entity::new())
    }

    /// Clear the cell at `p`. Returns the evicted handle, which stays valid
    /// only while some linked index still threads the entity.
    pub fn remove(&mut self, p: Point) -> Result<Option<EntityId>, GridError> {
        let i = self.idx(p)?;
        let Some(id) = self.cells[i].take() else {
            return Ok(None);
        };
        self.live -= 1;
        if let Some(e) = self.entities.get_mut(id) {
            e.set_owner(None);
        }
        self.entities.release(id);
        Ok(Some(id))
    }

    /// Move the occupant of `from` onto the empty cell `to`. All checks run
    /// before any cell is touched, so a failed move changes nothing.
    pub fn move_entity(&mut self, from: Point, to: Point) -> Result<EntityId, GridError> {
        let fi = self.idx(from)?;
        let ti = self.idx(to)?;
        let id = self.cells[fi].ok_or(GridError::SourceEmpty(from))?;
        if fi == ti {
            return Ok(id);
        }
        if self.cells[ti].is_some() {
            return Err(GridError::TargetOccupied(to));
        }

        self.cells[fi] = None;
        self.cells[ti] = Some(id);
        if let Some(e) = self.entities.get_mut(id) {
            e.set_position(to);
        }
        Ok(id)
    }

    pub fn open_cells(&self) -> Vec<Point> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| Point::new((i % self.w) as i32, (i / self.w) as i32))
            .collect()
    }

    /// Uniform pick among all empty cells, enumerated up front.
    pub fn random_open_cell(&self, rng: &mut Rng) -> Result<Point, GridError> {
        let open = self.open_cells();
        if open.is_empty() {
            return Err(GridError::GridFull);
        }
        Ok(open[rng.range_usize(open.len())])
    }

    /// Live entities with their positions, in row-major order.
    pub fn live_snapshot(&self) -> Vec<(EntityId, Point)> {
        let mut out = Vec::with_capacity(self.live);
        for (i, c) in self.cells.iter().enumerate() {
            if let Some(id) = c {
                out.push((*id, Point::new((i % self.w) as i32, (i / self.w) as i32)));
            }
        }
        out
    }

    /// Visit every entity that was live when the call began, exactly once.
    /// The callback gets the grid back, so it may remove or insert freely.
    pub fn for_each_live(&mut self, mut f: impl FnMut(&mut Grid, EntityId, Point)) {
        for (id, p) in self.live_snapshot() {
            f(self, id, p);
        }
    }

    #[inline]
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Recount occupied cells by scanning. Should always equal `live_count`.
    pub fn audit_live_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Back to all-empty. Every outstanding handle becomes stale, so any
    /// linked index over this grid must be reset alongside.
    pub fn clear(&mut self) {
        self.cells.fill(None);
        self.entities.clear();
        self.live = 0;
    }
}
