//! Gaze event merging and full gaze pattern detection
//!
//! A gaze event is a maximal run of consecutive fixations in the same region.
//! Its duration spans from the start of the first fixation to the end of the
//! last fixation of the run.

use crate::region::{Region, RegionMap};
use crate::session::fixations::TimeSeries;
use serde::Serialize;

/// One merged gaze event (corrected times, milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GazeEvent {
    pub region: Region,
    pub start_time: i64,
    pub duration: i64,
}

#[derive(Debug, Clone, Copy)]
struct OpenEvent {
    region: Region,
    start_time: i64,
}

/// Merges the fixation stream into gaze events
#[derive(Debug, Clone, Default)]
pub struct GazeEventMerger {
    events: Vec<GazeEvent>,
    open: Option<OpenEvent>,

    /// Corrected end of the most recent fixation
    last_end: i64,
}

impl GazeEventMerger {
    /// Feed the next fixation
    ///
    /// # Returns
    /// The region of the newly opened event, or `None` if the fixation
    /// extended the open event
    pub fn push(&mut self, time: i64, duration: i64, region: Region) -> Option<Region> {
        let opened = match self.open {
            Some(open) if open.region == region => None,
            _ => {
                self.seal();
                self.open = Some(OpenEvent {
                    region,
                    start_time: time,
                });
                Some(region)
            }
        };
        self.last_end = time + duration;
        opened
    }

    fn seal(&mut self) {
        if let Some(open) = self.open.take() {
            self.events.push(GazeEvent {
                region: open.region,
                start_time: open.start_time,
                duration: self.last_end - open.start_time,
            });
        }
    }

    /// Seal the open event at the end of the last fixation
    pub fn finish(mut self) -> Vec<GazeEvent> {
        self.seal();
        self.events
    }
}

/// Start times and durations of gaze events, overall and per region
pub fn event_series(events: &[GazeEvent]) -> (TimeSeries, RegionMap<TimeSeries>) {
    let mut all = TimeSeries::default();
    let mut by_region: RegionMap<TimeSeries> = RegionMap::default();
    for event in events {
        all.push(event.start_time, event.duration);
        by_region
            .get_mut(event.region)
            .push(event.start_time, event.duration);
    }
    (all, by_region)
}

/// Full gaze pattern counts: image → disc → image at event granularity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FullPatternCounts {
    pub left: usize,
    pub right: usize,
}

/// Count image → left/right → image triples with a sliding window
///
/// Every window position counts, overlapping windows included.
pub fn count_full_patterns(events: &[GazeEvent]) -> FullPatternCounts {
    let mut counts = FullPatternCounts::default();
    for window in events.windows(3) {
        if window[0].region != Region::Image || window[2].region != Region::Image {
            continue;
        }
        match window[1].region {
            Region::Left => counts.left += 1,
            Region::Right => counts.right += 1,
            Region::Image | Region::Background => {}
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge(fixations: &[(i64, i64, Region)]) -> Vec<GazeEvent> {
        let mut merger = GazeEventMerger::default();
        for &(time, duration, region) in fixations {
            merger.push(time, duration, region);
        }
        merger.finish()
    }

    #[test]
    fn test_runs_merge_into_single_event() {
        let events = merge(&[
            (0, 100, Region::Image),
            (120, 80, Region::Image),
            (220, 50, Region::Right),
            (300, 100, Region::Image),
        ]);
        assert_eq!(
            events,
            vec![
                GazeEvent { region: Region::Image, start_time: 0, duration: 200 },
                GazeEvent { region: Region::Right, start_time: 220, duration: 50 },
                GazeEvent { region: Region::Image, start_time: 300, duration: 100 },
            ]
        );
    }

    #[test]
    fn test_push_reports_opened_events() {
        let mut merger = GazeEventMerger::default();
        assert_eq!(merger.push(0, 10, Region::Left), Some(Region::Left));
        assert_eq!(merger.push(20, 10, Region::Left), None);
        assert_eq!(merger.push(40, 10, Region::Background), Some(Region::Background));
    }

    #[test]
    fn test_empty_stream_has_no_events() {
        assert!(GazeEventMerger::default().finish().is_empty());
    }

    #[test]
    fn test_event_count_never_exceeds_fixation_count() {
        let fixations = [
            (0, 10, Region::Left),
            (20, 10, Region::Left),
            (40, 10, Region::Image),
            (60, 10, Region::Left),
            (80, 10, Region::Background),
            (100, 10, Region::Background),
        ];
        let events = merge(&fixations);
        let (all, by_region) = event_series(&events);
        assert_eq!(all.len(), 4);
        for region in [Region::Left, Region::Right, Region::Image, Region::Background] {
            let fixation_count = fixations.iter().filter(|f| f.2 == region).count();
            assert!(by_region.get(region).len() <= fixation_count);
        }
    }

    #[test]
    fn test_full_patterns_overlapping_windows() {
        let events = merge(&[
            (0, 100, Region::Image),
            (150, 50, Region::Right),
            (250, 100, Region::Image),
            (400, 50, Region::Left),
            (500, 100, Region::Image),
            (650, 50, Region::Background),
            (750, 100, Region::Image),
        ]);
        let counts = count_full_patterns(&events);
        assert_eq!(counts, FullPatternCounts { left: 1, right: 1 });
    }

    #[test]
    fn test_full_patterns_need_three_events() {
        let events = merge(&[(0, 100, Region::Image), (150, 50, Region::Right)]);
        assert_eq!(count_full_patterns(&events), FullPatternCounts::default());
    }
}
