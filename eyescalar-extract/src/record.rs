//! Finished per-session records
//!
//! A [`SessionRecord`] is produced once per session by the reducer and is only
//! extended afterwards by the ancillary trigger and saccade summaries. Values
//! that cannot be computed are `None` and serialize as `null` (JSON) or `.`
//! (tables).

use crate::density::DiscModes;
use crate::region::{Region, Side};
use crate::session::fixations::FixationSample;
use crate::session::gaze::GazeEvent;
use crate::session::patterns::{ExtendedPattern, ImmediatePattern};
use crate::timeline::CutoffTable;
use eyescalar_common::SessionParams;
use serde::Serialize;

/// Event count with its mean rate over the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rate {
    pub count: usize,

    /// Events per minute (per second for triggers and saccades); `None` for a
    /// session without duration
    pub rate: Option<f64>,
}

/// Count, rate and mean duration of fixations or gaze events in one region
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Tally {
    pub count: usize,

    /// Per minute
    pub rate: Option<f64>,

    /// Milliseconds, 0.0 when there is nothing to average
    pub mean_duration: f64,
}

/// Tallies per region plus the functioning/nonfunctioning projection
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RegionTallies {
    pub all: Tally,
    pub image: Tally,
    pub left: Tally,
    pub right: Tally,
    pub background: Tally,
    pub functioning: Tally,
    pub nonfunctioning: Tally,
}

/// Disc-side rates plus the functioning/nonfunctioning projection
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SideRates {
    pub left: Rate,
    pub right: Rate,
    pub functioning: Rate,
    pub nonfunctioning: Rate,
}

/// Extended pattern rates by class
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ExtendedRates {
    pub left: Rate,
    pub right: Rate,
    pub both: Rate,
    pub total: Rate,
    pub functioning: Rate,
    pub nonfunctioning: Rate,
}

/// Full gaze pattern counts (image → disc → image gaze events)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FullPatternSummary {
    pub left: usize,
    pub right: usize,
    pub functioning: usize,
    pub nonfunctioning: usize,
}

/// Density-based estimates of disc fixations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimatedSummary {
    /// `None` when no fixation was attributed to the functioning disc
    pub failure_rate: Option<f64>,
    pub true_positives: usize,
    pub true_negatives: usize,
    pub modes: DiscModes,
    pub left: Rate,
    pub right: Rate,
    pub background: Rate,
    pub functioning: Rate,
    pub nonfunctioning: Rate,
    pub extended: ExtendedRates,
}

/// Counts of one region sequence inside an epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EpochRegionCounts {
    pub all: usize,
    pub image: usize,
    pub left: usize,
    pub right: usize,
    pub background: usize,
    pub functioning: usize,
    pub nonfunctioning: usize,
}

/// Extended pattern counts inside an epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EpochExtendedCounts {
    pub left: usize,
    pub right: usize,
    pub both: usize,
    pub total: usize,
    pub functioning: usize,
    pub nonfunctioning: usize,
}

/// Summary of one sealed epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EpochCounts {
    pub fixations: EpochRegionCounts,
    pub extended: EpochExtendedCounts,
    pub gaze_events: EpochRegionCounts,
}

/// Time series kept for later analysis (JSON export only)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSeries {
    pub fixations: Vec<FixationSample>,
    pub gaze_events: Vec<GazeEvent>,
    pub immediate_patterns: Vec<ImmediatePattern>,
    pub extended_patterns: Vec<ExtendedPattern>,
    pub estimated_trajectory: Option<Vec<Region>>,
    pub estimated_extended_patterns: Option<Vec<ExtendedPattern>>,
}

/// Image triggers found in the message report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TriggerSummary {
    /// Rate per second
    pub triggers: Rate,
    pub times: Vec<i64>,
    pub raw_times: Vec<i64>,
    pub intervals: Vec<i64>,
}

/// One saccade of the saccade report
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SaccadeSample {
    pub time: i64,
    pub duration: i64,
    pub amplitude: f64,
    pub angle: f64,
    pub velocity_avg: f64,
    pub velocity_peak: f64,
    pub blink: bool,
}

/// Saccade tallies of the saccade report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SaccadeSummary {
    /// Rate per second
    pub saccades: Rate,
    pub blinks: usize,

    /// Blinks per saccade, 0.0 without saccades
    pub blink_ratio: f64,
    pub samples: Vec<SaccadeSample>,
}

/// Reduced statistics of one session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub params: SessionParams,
    pub functioning_side: Side,
    pub dt_cutoff_ms: i64,

    /// Disc fixated first, `None` if no disc was fixated
    pub first_side: Option<Side>,

    /// Corrected time between first and last fixation start (ms)
    pub total_time: i64,

    pub fixations: RegionTallies,
    pub gaze_events: RegionTallies,
    pub immediate_patterns: SideRates,
    pub extended_patterns: ExtendedRates,
    pub full_patterns: FullPatternSummary,

    /// `None` unless the density classifier ran successfully
    pub estimated: Option<EstimatedSummary>,

    /// Number of complete epochs observed
    pub sealed_epochs: usize,

    /// Fixed number of epoch summaries, `None` past the observed epochs
    pub epochs: Vec<Option<EpochCounts>>,

    pub series: SessionSeries,
    pub cutoff: CutoffTable,

    pub triggers: Option<TriggerSummary>,
    pub saccades: Option<SaccadeSummary>,
}
