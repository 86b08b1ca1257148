//! Error types for dotlife.

use thiserror::Error;

use crate::point::Point;

/// Recoverable failures of grid operations. Nothing is mutated when one is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("{point} is outside the {width}x{height} grid")]
    OutOfBounds {
        point: Point,
        width: usize,
        height: usize,
    },

    #[error("cannot move onto {0}: cell is occupied")]
    TargetOccupied(Point),

    #[error("nothing to move at {0}")]
    SourceEmpty(Point),

    #[error("there are no more open cells")]
    GridFull,
}

/// Failures that abort a generation before anything is swapped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StepError {
    /// The rule declares a kernel that has no centre cell.
    #[error("kernel size must be odd and at least 1, got {0}")]
    InvalidKernelSize(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("grid dimensions must be non-zero, got {width}x{height}")]
    EmptyGrid { width: usize, height: usize },

    #[error("grid of {cells} cells exceeds the limit of {max}")]
    GridTooLarge { cells: usize, max: usize },

    #[error("tick_frames must be at least 1")]
    InvalidTickFrames,

    #[error("cell_size must be between 1 and 4096 pixels")]
    InvalidCellSize,

    #[error("unknown rule '{0}'")]
    UnknownRule(String),

    #[error("bad rulestring '{0}': expected B<counts>/S<counts>[/R<radius>]")]
    BadRulestring(String),

    #[error("failed to read config: {0}")]
    Io(String),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Anything a simulation call can report back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Step(#[from] StepError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
