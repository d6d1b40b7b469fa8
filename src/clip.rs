use std::path::{Path, PathBuf};

/// A background clip: a directory of `0.png`, `1.png`, ... played back one
/// frame per tick.
#[derive(Clone, Debug)]
pub struct Clip {
    dir: PathBuf,
    frame_index: u32, // frames shown so far
    paused: bool,
}

impl Clip {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            frame_index: 0,
            paused: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Index of the frame to fetch next, or `None` while paused.
    pub fn wants_frame(&self) -> Option<u32> {
        if self.paused {
            None
        } else {
            Some(self.frame_index)
        }
    }

    /// Path of frame `index`, relative to the asset root.
    pub fn frame_path(&self, index: u32) -> PathBuf {
        frame_path(&self.dir, index)
    }

    /// The requested frame made it on screen.
    pub fn frame_shown(&mut self) {
        if !self.paused {
            self.frame_index += 1;
        }
    }
}

pub fn frame_path(dir: &Path, index: u32) -> PathBuf {
    dir.join(format!("{index}.png"))
}

/// A missing numbered file is the only end-of-clip signal.
pub fn frame_exists(root: &Path, dir: &Path, index: u32) -> bool {
    root.join(frame_path(dir, index)).is_file()
}

/// Where the frame being fetched in the background has got to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingLoad {
    Loading,
    Loaded,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextFrame {
    /// Leave the pending fetch alone.
    Wait,
    Request(u32),
    /// No such file (yet); keep showing the last frame.
    Ended(u32),
    /// The pending frame failed to load.
    Failed(u32),
    /// Frame failed earlier; never fetched again.
    Hold,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FramePlan {
    pub show_pending: bool,
    pub next: NextFrame,
}

/// One tick of clip playback. At most one new frame goes on screen per tick,
/// and only once its load has finished.
pub fn plan_frame(
    wants: Option<u32>,
    pending: Option<(u32, PendingLoad)>,
    failed_at: Option<u32>,
    exists: impl Fn(u32) -> bool,
) -> FramePlan {
    let wait = FramePlan {
        show_pending: false,
        next: NextFrame::Wait,
    };
    let Some(index) = wants else {
        return wait;
    };

    let mut show_pending = false;
    let mut next = index;
    if let Some((pending_index, load)) = pending {
        if pending_index == index {
            match load {
                PendingLoad::Loading => return wait,
                PendingLoad::Failed => {
                    return FramePlan {
                        show_pending: false,
                        next: NextFrame::Failed(index),
                    }
                }
                PendingLoad::Loaded => {
                    show_pending = true;
                    next = index + 1;
                }
            }
        }
    }

    let next = if failed_at == Some(next) {
        NextFrame::Hold
    } else if !exists(next) {
        NextFrame::Ended(next)
    } else {
        NextFrame::Request(next)
    };
    FramePlan { show_pending, next }
}
