//! Gaze pattern detection between image and disc regions
//!
//! - Immediate pattern: a single disc fixation whose previous and next
//!   fixations are both on the image.
//! - Extended pattern: the run of fixations strictly between two image
//!   fixations, classified by which discs occur in it.

use crate::region::{Region, Side};
use serde::Serialize;

/// Classification of an extended pattern run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtendedClass {
    Left,
    Right,
    Both,
}

impl ExtendedClass {
    /// Class of a run from the discs seen in it, `None` if neither occurred
    pub fn from_sides(saw_left: bool, saw_right: bool) -> Option<Self> {
        match (saw_left, saw_right) {
            (true, false) => Some(ExtendedClass::Left),
            (false, true) => Some(ExtendedClass::Right),
            (true, true) => Some(ExtendedClass::Both),
            (false, false) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImmediatePattern {
    pub time: i64,
    pub side: Side,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExtendedPattern {
    pub start_time: i64,
    pub class: ExtendedClass,
}

/// Run of fixations since the last image fixation
#[derive(Debug, Clone, Copy, Default)]
struct OpenRun {
    start_time: Option<i64>,
    saw_left: bool,
    saw_right: bool,
}

/// Tracks extended pattern runs over a region sequence
///
/// Nothing is reported before the first image fixation; each later image
/// fixation closes the run opened by the one before it.
#[derive(Debug, Clone, Default)]
pub struct ExtendedRunTracker {
    run: Option<OpenRun>,
}

impl ExtendedRunTracker {
    /// Feed the next fixation, returning the pattern it closes
    pub fn observe(&mut self, time: i64, region: Region) -> Option<ExtendedPattern> {
        match region {
            Region::Image => {
                let closed = self.run.take().and_then(|run| {
                    let class = ExtendedClass::from_sides(run.saw_left, run.saw_right)?;
                    Some(ExtendedPattern {
                        start_time: run.start_time?,
                        class,
                    })
                });
                self.run = Some(OpenRun::default());
                closed
            }
            _ => {
                if let Some(run) = self.run.as_mut() {
                    run.start_time.get_or_insert(time);
                    match region {
                        Region::Left => run.saw_left = true,
                        Region::Right => run.saw_right = true,
                        Region::Image | Region::Background => {}
                    }
                }
                None
            }
        }
    }
}

/// Immediate and extended pattern detector for one session
#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    immediate: Vec<ImmediatePattern>,
    extended: Vec<ExtendedPattern>,
    runs: ExtendedRunTracker,
}

impl PatternDetector {
    /// Feed the next fixation
    ///
    /// # Arguments
    /// * `time` - Corrected start time of the fixation
    /// * `region` - Region of the fixation
    /// * `previous` - Region of the previous fixation as reported by the tracker
    /// * `next` - Region of the next fixation as reported by the tracker
    ///
    /// # Returns
    /// The class of the extended pattern closed by this fixation, if any
    pub fn push(&mut self, time: i64, region: Region, previous: Region, next: Region) -> Option<ExtendedClass> {
        if previous == Region::Image && next == Region::Image {
            if let Some(side) = region.side() {
                self.immediate.push(ImmediatePattern { time, side });
            }
        }

        let closed = self.runs.observe(time, region)?;
        self.extended.push(closed);
        Some(closed.class)
    }

    pub fn immediate(&self) -> &[ImmediatePattern] {
        &self.immediate
    }

    pub fn extended(&self) -> &[ExtendedPattern] {
        &self.extended
    }

    pub fn into_parts(self) -> (Vec<ImmediatePattern>, Vec<ExtendedPattern>) {
        (self.immediate, self.extended)
    }
}
