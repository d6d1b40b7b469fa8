use bevy::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::clip::{frame_exists, Clip};

// ===== Walker =====
pub const WALKER_SIZE: i32 = 200;
const WALK_SPEED: i32 = 5; // px per tick

// ===== Scenes =====
// First clip holds on this frame until the visitor first presses.
pub const INTRO_HOLD_FRAME: u32 = 310;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Walker {
    pub pos: IVec2, // top-left px, y grows downward
    pub moving_right: bool,
    pub flipped: bool,
}

/// What a tick changed, for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Idle,
    Walked,
    /// Walker left through the right edge and re-entered on the left.
    Wrapped { scene: usize, advanced: bool },
    IntroHeld,
}

#[derive(Debug)]
pub enum StageError {
    MissingAsset(PathBuf),
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::MissingAsset(path) => write!(f, "missing asset: {}", path.display()),
        }
    }
}

impl std::error::Error for StageError {}

#[derive(Resource, Debug)]
pub struct Stage {
    screen: IVec2,
    walker: Walker,
    clips: Vec<Clip>,
    current: usize,
    started: bool,
}

impl Stage {
    /// With no clips the walker still walks; `current_clip` needs at least one.
    pub fn new<P: AsRef<Path>>(screen: IVec2, clip_dirs: &[P]) -> Self {
        Self {
            screen,
            walker: Walker {
                pos: IVec2::new(0, screen.y - WALKER_SIZE),
                moving_right: false,
                flipped: false,
            },
            clips: clip_dirs.iter().map(|d| Clip::new(d.as_ref())).collect(),
            current: 0,
            started: false,
        }
    }

    pub fn screen(&self) -> IVec2 {
        self.screen
    }

    pub fn walker(&self) -> &Walker {
        &self.walker
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn current_scene(&self) -> usize {
        self.current
    }

    pub fn current_clip(&self) -> &Clip {
        &self.clips[self.current]
    }

    pub fn current_clip_mut(&mut self) -> &mut Clip {
        &mut self.clips[self.current]
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    /// Keep the walker on the floor of the new screen.
    pub fn resize(&mut self, screen: IVec2) {
        self.screen = screen;
        self.walker.pos.y = screen.y - WALKER_SIZE;
    }

    pub fn press(&mut self) {
        if !self.started {
            self.started = true;
            if let Some(clip) = self.clips.get_mut(self.current) {
                clip.set_paused(false);
            }
        }
        self.walker.moving_right = true;
    }

    pub fn release(&mut self) {
        self.walker.moving_right = false;
    }

    /// One tick of state, run before drawing.
    pub fn step(&mut self) -> StepOutcome {
        let half_w = WALKER_SIZE / 2;
        self.walker.flipped = self.walker.pos.x + half_w > self.screen.x / 2;

        let intro_hold = self.current == 0
            && !self.started
            && self
                .clips
                .first()
                .is_some_and(|c| c.frame_index() == INTRO_HOLD_FRAME);
        if intro_hold {
            let was_paused = self.clips[0].is_paused();
            self.clips[0].set_paused(true);
            return if was_paused {
                StepOutcome::Idle
            } else {
                StepOutcome::IntroHeld
            };
        }

        if !self.walker.moving_right {
            return StepOutcome::Idle;
        }

        self.walker.pos.x += WALK_SPEED;
        if self.walker.pos.x > self.screen.x + WALKER_SIZE / 4 {
            self.walker.pos.x = 0;
            let last = self.clips.len().saturating_sub(1);
            let advanced = self.current < last;
            if advanced {
                self.current += 1;
            }
            return StepOutcome::Wrapped {
                scene: self.current,
                advanced,
            };
        }
        StepOutcome::Walked
    }

    pub fn walker_rect(&self) -> Rect {
        let min = self.walker.pos.as_vec2();
        Rect::from_corners(min, min + Vec2::splat(WALKER_SIZE as f32))
    }

    /// 16:9 at full screen height, centred horizontally.
    pub fn clip_rect(&self) -> Rect {
        let h = self.screen.y as f32;
        let w = h * 16.0 / 9.0;
        let x = (self.screen.x as f32 - w) / 2.0;
        Rect::new(x, 0.0, x + w, h)
    }
}

/// The walker image and frame 0 of every clip must exist before we start.
pub fn check_assets(root: &Path, walker_image: &Path, clips: &[Clip]) -> Result<(), StageError> {
    if !root.join(walker_image).is_file() {
        return Err(StageError::MissingAsset(walker_image.to_path_buf()));
    }
    for clip in clips {
        if !frame_exists(root, clip.dir(), 0) {
            return Err(StageError::MissingAsset(clip.frame_path(0)));
        }
    }
    Ok(())
}
