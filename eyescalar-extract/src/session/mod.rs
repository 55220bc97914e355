//! Single-pass session accumulation
//!
//! **Purpose:** Walk the fixation stream of one session once, correcting
//! times, classifying regions and feeding every aggregator from the same
//! corrected fixation.
//!
//! A fresh [`SessionAccumulator`] is created at every session boundary and
//! consumed by [`SessionAccumulator::finish`], so no state is shared between
//! sessions.

pub mod epochs;
pub mod fixations;
pub mod gaze;
pub mod patterns;

use crate::region::{RegionClassifier, RegionMap};
use crate::report::FixationRecord;
use crate::timeline::{CutoffCorrector, CutoffTable};
use eyescalar_common::config::ExtractionConfig;

use epochs::{EpochPartitioner, EpochSlice};
use fixations::{FixationAggregator, FixationSample, TimeSeries};
use gaze::{FullPatternCounts, GazeEvent, GazeEventMerger};
use patterns::{ExtendedPattern, ImmediatePattern, PatternDetector};

/// Per-session state of the streaming processor
#[derive(Debug, Clone)]
pub struct SessionAccumulator {
    session_id: String,
    corrector: CutoffCorrector,
    fixations: FixationAggregator,
    gaze: GazeEventMerger,
    patterns: PatternDetector,
    epochs: EpochPartitioner,
}

impl SessionAccumulator {
    pub fn new(session_id: impl Into<String>, config: &ExtractionConfig) -> Self {
        Self {
            session_id: session_id.into(),
            corrector: CutoffCorrector::new(config.dt_cutoff_ms, config.residual_gap_ms, config.origin_ms),
            fixations: FixationAggregator::default(),
            gaze: GazeEventMerger::default(),
            patterns: PatternDetector::default(),
            epochs: EpochPartitioner::new(config.epoch_ms),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Number of fixations seen so far
    pub fn len(&self) -> usize {
        self.fixations.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixations.all().is_empty()
    }

    /// Feed the next raw fixation of the session
    pub fn push(&mut self, record: &FixationRecord, classifier: &RegionClassifier) {
        let time = self.corrector.correct(record.raw_time, record.duration);
        let region = classifier.classify(&record.current_tag);

        self.epochs.advance(time);
        self.epochs.record_fixation(region);

        self.fixations.push(FixationSample {
            time,
            duration: record.duration,
            region,
            x: record.x,
            y: record.y,
        });

        let previous = classifier.classify(&record.previous_tag);
        let next = classifier.classify(&record.next_tag);
        if let Some(class) = self.patterns.push(time, region, previous, next) {
            self.epochs.record_extended(class);
        }

        if let Some(opened) = self.gaze.push(time, record.duration, region) {
            self.epochs.record_gaze_event(opened);
        }
    }

    /// Close the session: seal the open gaze event and collect all results
    pub fn finish(self) -> FinishedSession {
        let total_time = self.fixations.total_time();
        let gaze_events = self.gaze.finish();
        let full_patterns = gaze::count_full_patterns(&gaze_events);
        let (gaze_all, gaze_by_region) = gaze::event_series(&gaze_events);
        let (samples, fixations_all, fixations_by_region) = self.fixations.into_parts();
        let (immediate_patterns, extended_patterns) = self.patterns.into_parts();

        FinishedSession {
            session_id: self.session_id,
            total_time,
            samples,
            fixations_all,
            fixations_by_region,
            gaze_events,
            gaze_all,
            gaze_by_region,
            immediate_patterns,
            extended_patterns,
            full_patterns,
            epochs: self.epochs.finish(),
            cutoff: self.corrector.into_table(),
        }
    }
}

/// Everything the stream produced for one session, ready for reduction
#[derive(Debug, Clone)]
pub struct FinishedSession {
    pub session_id: String,

    /// Corrected time between first and last fixation start
    pub total_time: i64,

    pub samples: Vec<FixationSample>,
    pub fixations_all: TimeSeries,
    pub fixations_by_region: RegionMap<TimeSeries>,

    pub gaze_events: Vec<GazeEvent>,
    pub gaze_all: TimeSeries,
    pub gaze_by_region: RegionMap<TimeSeries>,

    pub immediate_patterns: Vec<ImmediatePattern>,
    pub extended_patterns: Vec<ExtendedPattern>,
    pub full_patterns: FullPatternCounts,

    /// Sealed epochs in time order
    pub epochs: Vec<EpochSlice>,

    pub cutoff: CutoffTable,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(raw_time: i64, current: &str, previous: &str, next: &str, duration: i64) -> FixationRecord {
        FixationRecord {
            session_label: "vp35.1".to_string(),
            raw_time,
            current_tag: current.to_string(),
            previous_tag: previous.to_string(),
            next_tag: next.to_string(),
            duration,
            x: 500.0,
            y: 380.0,
        }
    }

    fn run(records: &[FixationRecord]) -> FinishedSession {
        let config = ExtractionConfig::default();
        let classifier = RegionClassifier::new(&config.markers);
        let mut accumulator = SessionAccumulator::new("35.1", &config);
        for r in records {
            accumulator.push(r, &classifier);
        }
        accumulator.finish()
    }

    #[test]
    fn test_image_disc_image_sequence() {
        let finished = run(&[
            record(0, "image", ".", "R", 100),
            record(150, "R", "image", "image", 50),
            record(250, "image", "R", ".", 100),
        ]);

        assert_eq!(finished.total_time, 250);
        assert_eq!(finished.immediate_patterns.len(), 1);
        assert_eq!(finished.immediate_patterns[0].time, 150);
        assert_eq!(finished.extended_patterns.len(), 1);
        assert_eq!(finished.extended_patterns[0].start_time, 150);
        assert_eq!(finished.full_patterns.right, 1);
        assert_eq!(finished.full_patterns.left, 0);
        assert_eq!(finished.gaze_events.len(), 3);
        assert!(finished.cutoff.segments.is_empty());
    }

    #[test]
    fn test_gap_correction_applies_to_all_aggregates() {
        let finished = run(&[
            record(800, "image", ".", "image", 200),
            record(1500, "image", "image", ".", 100),
        ]);
        // Gap of 500 ms collapses to 10 ms
        assert_eq!(finished.fixations_all.times, vec![800, 1010]);
        // Consecutive image fixations merge across the corrected gap
        assert_eq!(finished.gaze_events.len(), 1);
        assert_eq!(finished.gaze_events[0].duration, 1110 - 800);
        assert_eq!(finished.cutoff.total_correction(), 490);
    }

    #[test]
    fn test_epochs_collect_fixations_patterns_and_events() {
        let mut records = Vec::new();
        let mut time = 0;
        // Three minutes of image/left alternation, no overlong gaps
        while time < 180_000 {
            records.push(record(time, "image", "L", "L", 100));
            records.push(record(time + 150, "L", "image", "image", 100));
            time += 300;
        }
        let finished = run(&records);

        assert_eq!(finished.epochs.len(), 2);
        let first = &finished.epochs[0];
        assert_eq!(first.fixations.len(), 400);
        assert_eq!(first.gaze_events.len(), 400);
        // The first image only opens a run
        assert_eq!(first.extended.len(), 199);

        let sealed: usize = finished.epochs.iter().map(|e| e.fixations.len()).sum();
        assert!(sealed <= finished.samples.len());
        assert!(finished.gaze_events.len() <= finished.samples.len());
    }
}
