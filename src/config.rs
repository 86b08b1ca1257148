use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::rules::RuleKind;

/// All tunable parameters. Missing JSON fields fall back to the defaults.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Params {
    // Grid
    pub width: usize,
    pub height: usize,

    // Presentation
    pub cell_size: u32,

    // Pacing: input is polled every frame, the rule runs every `tick_frames` frames
    pub tick_frames: u32,

    // Rules and seeding
    pub rule: RuleKind,
    pub seed: u64,
    pub initial_dots: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            width: 30,
            height: 30,
            cell_size: 20,
            tick_frames: 15,
            rule: RuleKind::Conway,
            seed: 42,
            initial_dots: 0,
        }
    }
}

impl Params {
    /// Cell cap; far above anything the sandbox steps interactively.
    pub const MAX_CELLS: usize = 4_000_000;
    pub const MAX_CELL_SIZE: u32 = 4096;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        let cells = self.width.saturating_mul(self.height);
        if cells > Self::MAX_CELLS {
            return Err(ConfigError::GridTooLarge {
                cells,
                max: Self::MAX_CELLS,
            });
        }
        if self.tick_frames == 0 {
            return Err(ConfigError::InvalidTickFrames);
        }
        if self.cell_size == 0 || self.cell_size > Self::MAX_CELL_SIZE {
            return Err(ConfigError::InvalidCellSize);
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let params: Params =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_json(&text)
    }
}
