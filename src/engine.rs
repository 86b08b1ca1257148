use std::collections::HashSet;

use rayon::prelude::*;
use tracing::debug;

use crate::entity::{Entity, EntityId};
use crate::error::StepError;
use crate::grid::Grid;
use crate::point::Point;
use crate::rules::{Outcome, Rule};
use crate::window::make_window;

/// What one generation changed.
#[derive(Debug, Default, Clone)]
pub struct Generation {
    /// Entities created this generation.
    pub born: Vec<EntityId>,
    /// Entities that left the grid. Handles stay valid only while a linked
    /// index still threads them.
    pub retired: Vec<EntityId>,
    pub live: usize,
}

/// Advance `grid` by one generation under `rule`.
///
/// Every window is cut from the grid as it stood when the call began; results
/// go to a scratch buffer that replaces the cells only once all of them are
/// known. An invalid kernel fails before anything is touched.
pub fn step(grid: &mut Grid, rule: &dyn Rule) -> Result<Generation, StepError> {
    let k = rule.kernel_size();
    if k % 2 == 0 {
        return Err(StepError::InvalidKernelSize(k));
    }
    let (w, h) = grid.bounds();
    let n = w * h;

    // Phase 1: apply the rule to every cell against the current generation (parallel, read-only).
    let current: &Grid = grid;
    let outcomes: Vec<Option<Outcome>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let p = Point::new((i % w) as i32, (i / w) as i32);
            let window = make_window(current, p, k)?;
            Ok(rule.apply(&window))
        })
        .collect::<Result<_, StepError>>()?;

    // Phase 2: build the scratch generation. Newborns are not owned by the grid yet.
    let owner = Some(grid.id());
    let mut scratch: Vec<Option<EntityId>> = vec![None; n];
    let mut kept: HashSet<EntityId> = HashSet::new();
    let mut born = Vec::new();
    let mut live = 0usize;
    for (i, outcome) in outcomes.into_iter().enumerate() {
        let Some(outcome) = outcome else { continue };
        let p = Point::new((i % w) as i32, (i / w) as i32);
        let reuse = match outcome {
            // only entities on this grid can be carried over, each to one cell
            Outcome::Keep(id)
                if grid.entities.get(id).and_then(Entity::owner) == owner && kept.insert(id) =>
            {
                Some(id)
            }
            _ => None,
        };
        let id = match reuse {
            Some(id) => {
                if let Some(e) = grid.entities.get_mut(id) {
                    e.set_position(p);
                }
                id
            }
            None => {
                let id = grid.entities.insert(Entity::at(p));
                born.push(id);
                id
            }
        };
        scratch[i] = Some(id);
        live += 1;
    }

    // Phase 3: swap, retire the dead, adopt the newborns.
    let previous = std::mem::replace(&mut grid.cells, scratch);
    let mut retired = Vec::new();
    for id in previous.into_iter().flatten() {
        if kept.contains(&id) {
            continue;
        }
        if let Some(e) = grid.entities.get_mut(id) {
            e.set_owner(None);
        }
        grid.entities.release(id);
        retired.push(id);
    }
    for &id in &born {
        if let Some(e) = grid.entities.get_mut(id) {
            e.set_owner(owner);
        }
    }
    grid.live = grid.audit_live_count();
    debug_assert_eq!(grid.live, live, "incremental live count drifted from scan");

    debug!(
        rule = %rule.name(),
        live = grid.live,
        born = born.len(),
        retired = retired.len(),
        "generation"
    );
    Ok(Generation {
        born,
        retired,
        live: grid.live,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::rules::{Conway, LifeLike};
    use crate::window::Window;

    fn live_set(grid: &Grid) -> Vec<Point> {
        let mut v: Vec<Point> = grid.live_snapshot().into_iter().map(|(_, p)| p).collect();
        v.sort();
        v
    }

    fn seeded(w: usize, h: usize, cells: &[(i32, i32)]) -> Grid {
        let mut g = Grid::new(w, h);
        for &(x, y) in cells {
            g.spawn(Point::new(x, y)).unwrap();
        }
        g
    }

    fn pts(cells: &[(i32, i32)]) -> Vec<Point> {
        let mut v: Vec<Point> = cells.iter().map(|&c| c.into()).collect();
        v.sort();
        v
    }

    #[test]
    fn blinker_flips_to_vertical() {
        let mut g = seeded(5, 5, &[(1, 1), (2, 1), (3, 1)]);
        let report = step(&mut g, &Conway).unwrap();
        assert_eq!(live_set(&g), pts(&[(2, 0), (2, 1), (2, 2)]));
        assert_eq!(report.live, 3);
        assert_eq!(report.born.len(), 2);
        assert_eq!(report.retired.len(), 2);
        assert_eq!(g.live_count(), g.audit_live_count());
    }

    #[test]
    fn blinker_returns_after_two_steps() {
        let mut g = seeded(5, 5, &[(1, 2), (2, 2), (3, 2)]);
        step(&mut g, &Conway).unwrap();
        step(&mut g, &Conway).unwrap();
        assert_eq!(live_set(&g), pts(&[(1, 2), (2, 2), (3, 2)]));
    }

    #[test]
    fn block_is_still_and_keeps_identity() {
        let mut g = seeded(4, 4, &[(1, 1), (2, 1), (1, 2), (2, 2)]);
        let before = g.live_snapshot();
        let report = step(&mut g, &Conway).unwrap();
        assert_eq!(g.live_snapshot(), before);
        assert!(report.born.is_empty() && report.retired.is_empty());
    }

    #[test]
    fn newborns_are_owned_and_positioned() {
        let mut g = seeded(5, 5, &[(1, 1), (2, 1), (3, 1)]);
        let report = step(&mut g, &Conway).unwrap();
        for id in report.born {
            let e = g.entity(id).unwrap();
            assert_eq!(e.owner(), Some(g.id()));
            assert_eq!(g.get(e.position()), Ok(Some(id)));
        }
        for id in report.retired {
            assert!(g.entity(id).is_none());
        }
    }

    #[test]
    fn edges_are_not_wrapped() {
        // a blinker on the top edge loses its upper arm instead of wrapping
        let mut g = seeded(5, 5, &[(1, 0), (2, 0), (3, 0)]);
        step(&mut g, &Conway).unwrap();
        assert_eq!(live_set(&g), pts(&[(2, 0), (2, 1)]));
    }

    struct EvenKernel;

    impl Rule for EvenKernel {
        fn name(&self) -> String {
            "even".into()
        }
        fn kernel_size(&self) -> usize {
            2
        }
        fn apply(&self, _: &Window) -> Option<Outcome> {
            Some(Outcome::Spawn)
        }
    }

    #[test]
    fn invalid_kernel_leaves_generation_intact() {
        let mut g = seeded(3, 3, &[(0, 0), (1, 1)]);
        let before = g.live_snapshot();
        assert_eq!(
            step(&mut g, &EvenKernel).unwrap_err(),
            StepError::InvalidKernelSize(2)
        );
        assert_eq!(g.live_snapshot(), before);
        assert_eq!(g.live_count(), 2);
    }

    /// Records the live-neighbour count every window saw, keyed by centre.
    struct Recorder {
        seen: Mutex<Vec<(Point, usize)>>,
    }

    impl Rule for Recorder {
        fn name(&self) -> String {
            "recorder".into()
        }
        fn kernel_size(&self) -> usize {
            3
        }
        fn apply(&self, window: &Window) -> Option<Outcome> {
            self.seen
                .lock()
                .unwrap()
                .push((window.grid_coords(), window.count_live_neighbors()));
            // flip every cell so any leaked write would change later counts
            match window.center() {
                Some(_) => None,
                None => Some(Outcome::Spawn),
            }
        }
    }

    #[test]
    fn windows_only_see_previous_generation() {
        let cells = [(0, 0), (2, 0), (1, 1), (3, 2), (0, 3), (2, 3)];
        let mut g = seeded(4, 4, &cells);

        let mut expected = Vec::new();
        for y in 0..4 {
            for x in 0..4 {
                let p = Point::new(x, y);
                expected.push((p, make_window(&g, p, 3).unwrap().count_live_neighbors()));
            }
        }

        let rec = Recorder {
            seen: Mutex::new(Vec::new()),
        };
        step(&mut g, &rec).unwrap();
        let mut seen = rec.seen.into_inner().unwrap();
        seen.sort();
        expected.sort();
        assert_eq!(seen, expected);
        assert_eq!(g.live_count(), 16 - cells.len());
    }

    #[test]
    fn radius_two_rule_steps() {
        // B1/S/R2: every empty cell within reach of the lone dot is born, the dot dies
        let rule: LifeLike = "B1/S/R2".parse().unwrap();
        let mut g = seeded(7, 7, &[(3, 3)]);
        step(&mut g, &rule).unwrap();
        assert_eq!(g.live_count(), 24);
        assert!(!g.is_occupied(Point::new(3, 3)));
        assert!(g.is_occupied(Point::new(1, 5)));
        assert!(!g.is_occupied(Point::new(0, 3)));
    }
}
