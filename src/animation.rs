use crate::core::SheetGeometry;
use crate::error::{SpriteMixError, SpriteMixResult};

/// Frames in the default walk cycle.
pub const DEFAULT_FRAME_COUNT: u32 = 8;
/// Host ticks per animation frame (10 fps at a 60 Hz host loop).
pub const DEFAULT_SPEED: u32 = 6;

/// One directional animation: a sheet row and how many frames it holds.
///
/// Directions are parameterization, not separate state machines — a sheet may
/// give one direction 16 frames and the others 8.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WalkCycle {
    /// Sheet row the cycle's frames live in.
    pub row: u32,
    /// Frames in the cycle.
    pub frame_count: u32,
}

impl WalkCycle {
    pub fn new(row: u32, frame_count: u32) -> SpriteMixResult<Self> {
        if frame_count == 0 {
            return Err(SpriteMixError::validation("walk cycle needs >= 1 frame"));
        }
        Ok(Self { row, frame_count })
    }
}

impl Default for WalkCycle {
    /// The first sheet row: the walk-right/idle-facing cycle.
    fn default() -> Self {
        Self {
            row: 0,
            frame_count: DEFAULT_FRAME_COUNT,
        }
    }
}

/// Source rectangle of one animation frame within a sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Monotonically advancing logical frame counter.
///
/// `tick` accumulates host ticks; every `speed` ticks the frame index
/// advances and wraps. The counter never blocks on, and knows nothing about,
/// image loads or rebuilds.
#[derive(Clone, Copy, Debug)]
pub struct AnimationClock {
    cycle: WalkCycle,
    speed: u32,
    ticks: u32,
    current_frame: u32,
}

impl AnimationClock {
    pub fn new(cycle: WalkCycle, speed: u32) -> SpriteMixResult<Self> {
        if speed == 0 {
            return Err(SpriteMixError::validation("clock speed must be >= 1"));
        }
        Ok(Self {
            cycle,
            speed,
            ticks: 0,
            current_frame: 0,
        })
    }

    pub fn cycle(&self) -> WalkCycle {
        self.cycle
    }

    /// Switch direction. The frame index is folded into the new cycle's range
    /// so it stays valid.
    pub fn set_cycle(&mut self, cycle: WalkCycle) {
        self.cycle = cycle;
        self.current_frame %= cycle.frame_count.max(1);
    }

    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    /// Advance one host tick.
    pub fn tick(&mut self) {
        self.ticks += 1;
        if self.ticks >= self.speed {
            self.ticks = 0;
            self.current_frame = (self.current_frame + 1) % self.cycle.frame_count;
        }
    }

    /// Where the current frame lives in the sheet.
    pub fn source_rect(&self, geometry: SheetGeometry) -> SourceRect {
        SourceRect {
            x: self.current_frame * geometry.frame_width,
            y: self.cycle.row * geometry.frame_height,
            width: geometry.frame_width,
            height: geometry.frame_height,
        }
    }
}
