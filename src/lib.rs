pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod grid;
pub mod index;
pub mod point;
pub mod render;
pub mod rng;
pub mod rules;
pub mod window;

use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, info, warn};

use config::Params;
use entity::EntityId;
use error::{GridError, SimError, StepError};
use grid::Grid;
use index::LinkedIndex;
use point::Point;
use rng::Rng;
use rules::Rule;

pub use engine::{Generation, step};
pub use window::{Window, make_window};

const BG: [u8; 4] = [0x30, 0x30, 0x40, 255];
const BG_PAUSED: [u8; 4] = [0x3F, 0x3F, 0x4A, 255];

pub struct Timing {
    pub name: &'static str,
    pub ms: f64,
}

/// One frame of host input, already translated into grid space.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Input {
    pub place: Option<Point>,
    pub erase: Option<Point>,
    pub toggle_pause: bool,
    pub restart: bool,
}

pub struct TickReport {
    pub generation: u64,
    pub live: usize,
    pub born: usize,
    pub retired: usize,
    pub timings: Vec<Timing>,
}

/// Simulation context: the grid, the index threading its live dots, the
/// active rule and the pause/pacing state the host drives.
pub struct Sim {
    params: Params,
    grid: Grid,
    dots: LinkedIndex,
    rule: Box<dyn Rule>,
    rng: Rng,
    paused: bool,
    generation: u64,
    frame: u32,
}

impl Sim {
    pub fn new(params: Params) -> Result<Self, SimError> {
        params.validate()?;
        let mut sim = Self {
            grid: Grid::new(params.width, params.height),
            dots: LinkedIndex::new(),
            rule: params.rule.build(),
            rng: Rng::new(params.seed),
            paused: false,
            generation: 0,
            frame: 0,
            params,
        };
        if sim.params.initial_dots > 0 {
            sim.seed_random(sim.params.initial_dots).ok();
        }
        info!(
            width = sim.params.width,
            height = sim.params.height,
            rule = %sim.rule.name(),
            live = sim.grid.live_count(),
            "simulation ready"
        );
        Ok(sim)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn dots(&self) -> &LinkedIndex {
        &self.dots
    }

    pub fn rule_name(&self) -> String {
        self.rule.name()
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Swap the rule. A rule with an even kernel is refused here, not at step time.
    pub fn set_rule(&mut self, rule: Box<dyn Rule>) -> Result<(), StepError> {
        let k = rule.kernel_size();
        if k % 2 == 0 {
            return Err(StepError::InvalidKernelSize(k));
        }
        info!(from = %self.rule.name(), to = %rule.name(), "rule changed");
        self.rule = rule;
        Ok(())
    }

    /// Put a dot at `p`. Placing onto a live cell leaves it as is.
    pub fn place(&mut self, p: Point) -> Result<EntityId, GridError> {
        if let Some(id) = self.grid.get(p)? {
            return Ok(id);
        }
        let id = self.grid.spawn(p)?;
        self.dots.add(self.grid.entities_mut(), id);
        Ok(id)
    }

    /// Remove the dot at `p`. Returns false if the cell was already empty.
    pub fn erase(&mut self, p: Point) -> Result<bool, GridError> {
        let Some(id) = self.grid.remove(p)? else {
            return Ok(false);
        };
        self.dots.remove(self.grid.entities_mut(), id);
        Ok(true)
    }

    pub fn move_dot(&mut self, from: Point, to: Point) -> Result<EntityId, GridError> {
        self.grid.move_entity(from, to)
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        debug!(paused = self.paused, "pause toggled");
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Empty the grid and start counting generations from zero.
    pub fn restart(&mut self) {
        self.dots.reset(self.grid.entities_mut());
        self.grid.clear();
        self.generation = 0;
        self.frame = 0;
        info!("restart");
    }

    /// Apply one frame of input, then run a generation if this frame is a
    /// game tick and the sim is not paused. Rejected clicks are logged and skipped.
    pub fn update(&mut self, input: &Input) -> Result<Option<TickReport>, StepError> {
        if input.restart {
            self.restart();
        }
        if input.toggle_pause {
            self.toggle_pause();
        }
        if let Some(p) = input.place {
            if let Err(err) = self.place(p) {
                debug!(%err, "place rejected");
            }
        }
        if let Some(p) = input.erase {
            if let Err(err) = self.erase(p) {
                debug!(%err, "erase rejected");
            }
        }

        self.frame = (self.frame + 1) % self.params.tick_frames;
        if self.frame != 0 || self.paused {
            return Ok(None);
        }
        self.tick().map(Some)
    }

    /// Run one generation now, ignoring frame pacing and pause.
    pub fn tick(&mut self) -> Result<TickReport, StepError> {
        let mut timings = Vec::new();
        let total_start = Instant::now();

        let t = Instant::now();
        let generation = engine::step(&mut self.grid, self.rule.as_ref())?;
        timings.push(Timing {
            name: "step",
            ms: t.elapsed().as_secs_f64() * 1000.0,
        });

        let t = Instant::now();
        let entities = self.grid.entities_mut();
        for &id in &generation.retired {
            self.dots.remove(entities, id);
        }
        for &id in &generation.born {
            self.dots.add(entities, id);
        }
        timings.push(Timing {
            name: "index_sync",
            ms: t.elapsed().as_secs_f64() * 1000.0,
        });

        timings.push(Timing {
            name: "TOTAL",
            ms: total_start.elapsed().as_secs_f64() * 1000.0,
        });

        self.generation += 1;
        debug_assert_eq!(self.dots.len(), self.grid.live_count());
        Ok(TickReport {
            generation: self.generation,
            live: generation.live,
            born: generation.born.len(),
            retired: generation.retired.len(),
            timings,
        })
    }

    /// Place up to `n` dots on random open cells. Stops with `GridFull`
    /// once no cell is left; dots placed before that stay.
    pub fn seed_random(&mut self, n: usize) -> Result<(), GridError> {
        for placed in 0..n {
            let p = match self.grid.random_open_cell(&mut self.rng) {
                Ok(p) => p,
                Err(err) => {
                    warn!(placed, requested = n, "grid full while seeding");
                    return Err(err);
                }
            };
            self.place(p)?;
        }
        Ok(())
    }

    /// Move every live dot to a random open cell. Returns how many moved.
    pub fn scatter(&mut self) -> usize {
        let rng = &mut self.rng;
        let mut moved = 0;
        self.grid.for_each_live(|grid, _, from| {
            let Ok(to) = grid.random_open_cell(rng) else {
                return;
            };
            if grid.move_entity(from, to).is_ok() {
                moved += 1;
            }
        });
        moved
    }

    /// Live dot positions in index order (oldest first), for drawing.
    pub fn live_positions(&self) -> Vec<(Point, [u8; 4])> {
        let mut out = Vec::with_capacity(self.dots.len());
        self.dots
            .for_each(self.grid.entities(), |_, e| out.push((e.position(), e.color)), false);
        out
    }

    pub fn background(&self) -> [u8; 4] {
        if self.paused { BG_PAUSED } else { BG }
    }

    /// Full-scan audit: live count, index length and occupied cells must agree.
    pub fn is_consistent(&self) -> bool {
        let scanned = self.grid.audit_live_count();
        scanned == self.grid.live_count() && scanned == self.dots.len()
    }
}
