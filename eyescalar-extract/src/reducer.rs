//! Session statistics reduction
//!
//! Turns the raw aggregates of a finished session into its [`SessionRecord`]:
//! counts, rates per minute, mean durations, the functioning/nonfunctioning
//! projection of disc tallies and the fixed set of epoch summaries.

use crate::density::{self, DiscClassification};
use crate::error::{Error, Result};
use crate::record::{
    EpochCounts, EpochExtendedCounts, EpochRegionCounts, EstimatedSummary, ExtendedRates, FullPatternSummary, Rate,
    RegionTallies, SessionRecord, SessionSeries, SideRates, Tally,
};
use crate::region::{Region, RegionMap, Side};
use crate::session::epochs::EpochSlice;
use crate::session::fixations::TimeSeries;
use crate::session::patterns::{ExtendedClass, ImmediatePattern};
use crate::session::FinishedSession;
use eyescalar_common::config::ExtractionConfig;
use eyescalar_common::{FunctioningSide, SessionParams};
use tracing::{debug, warn};

const MS_PER_MINUTE: f64 = 60_000.0;

/// Events per minute over the session, `None` without session duration
pub fn per_minute(count: usize, total_time: i64) -> Option<f64> {
    if total_time > 0 {
        Some(MS_PER_MINUTE * count as f64 / total_time as f64)
    } else {
        None
    }
}

/// Map the functioning side onto a disc side
pub fn functioning_disc(session_id: &str, side: &FunctioningSide) -> Result<Side> {
    match side {
        FunctioningSide::Right => Ok(Side::Right),
        FunctioningSide::Left => Ok(Side::Left),
        FunctioningSide::NotRecognized(value) => Err(Error::UnrecognizedFunctioningSide {
            session: session_id.to_string(),
            value: value.clone(),
        }),
    }
}

/// Split a left/right pair into (functioning, nonfunctioning)
fn project<T: Copy>(functioning: Side, left: T, right: T) -> (T, T) {
    match functioning {
        Side::Right => (right, left),
        Side::Left => (left, right),
    }
}

fn tally(series: &TimeSeries, total_time: i64) -> Tally {
    Tally {
        count: series.len(),
        rate: per_minute(series.len(), total_time),
        mean_duration: series.mean_duration(),
    }
}

fn region_tallies(
    all: &TimeSeries,
    by_region: &RegionMap<TimeSeries>,
    functioning: Side,
    total_time: i64,
) -> RegionTallies {
    let left = tally(&by_region.left, total_time);
    let right = tally(&by_region.right, total_time);
    let (functioning, nonfunctioning) = project(functioning, left, right);
    RegionTallies {
        all: tally(all, total_time),
        image: tally(&by_region.image, total_time),
        left,
        right,
        background: tally(&by_region.background, total_time),
        functioning,
        nonfunctioning,
    }
}

fn rate(count: usize, total_time: i64) -> Rate {
    Rate {
        count,
        rate: per_minute(count, total_time),
    }
}

fn immediate_rates(patterns: &[ImmediatePattern], functioning: Side, total_time: i64) -> SideRates {
    let count = |side: Side| patterns.iter().filter(|p| p.side == side).count();
    let left = rate(count(Side::Left), total_time);
    let right = rate(count(Side::Right), total_time);
    let (functioning, nonfunctioning) = project(functioning, left, right);
    SideRates {
        left,
        right,
        functioning,
        nonfunctioning,
    }
}

fn extended_rates<I>(classes: I, functioning: Side, total_time: i64) -> ExtendedRates
where
    I: IntoIterator<Item = ExtendedClass>,
{
    let counts = count_extended(classes, functioning);
    ExtendedRates {
        left: rate(counts.left, total_time),
        right: rate(counts.right, total_time),
        both: rate(counts.both, total_time),
        total: rate(counts.total, total_time),
        functioning: rate(counts.functioning, total_time),
        nonfunctioning: rate(counts.nonfunctioning, total_time),
    }
}

fn count_extended<I>(classes: I, functioning: Side) -> EpochExtendedCounts
where
    I: IntoIterator<Item = ExtendedClass>,
{
    let mut counts = EpochExtendedCounts::default();
    for class in classes {
        match class {
            ExtendedClass::Left => counts.left += 1,
            ExtendedClass::Right => counts.right += 1,
            ExtendedClass::Both => counts.both += 1,
        }
    }
    counts.total = counts.left + counts.right + counts.both;
    let (f, n) = project(functioning, counts.left, counts.right);
    counts.functioning = f;
    counts.nonfunctioning = n;
    counts
}

fn count_regions(regions: &[Region], functioning: Side) -> EpochRegionCounts {
    let count = |region: Region| regions.iter().filter(|r| **r == region).count();
    let left = count(Region::Left);
    let right = count(Region::Right);
    let (f, n) = project(functioning, left, right);
    EpochRegionCounts {
        all: regions.len(),
        image: count(Region::Image),
        left,
        right,
        background: count(Region::Background),
        functioning: f,
        nonfunctioning: n,
    }
}

fn epoch_counts(slice: &EpochSlice, functioning: Side) -> EpochCounts {
    EpochCounts {
        fixations: count_regions(&slice.fixations, functioning),
        extended: count_extended(slice.extended.iter().copied(), functioning),
        gaze_events: count_regions(&slice.gaze_events, functioning),
    }
}

/// Disc fixated first, by first fixation time
fn first_side(by_region: &RegionMap<TimeSeries>) -> Option<Side> {
    match (by_region.left.times.first(), by_region.right.times.first()) {
        (None, None) => None,
        (Some(_), None) => Some(Side::Left),
        (None, Some(_)) => Some(Side::Right),
        (Some(left), Some(right)) if right < left => Some(Side::Right),
        (Some(_), Some(_)) => Some(Side::Left),
    }
}

fn estimated_summary(
    classification: &DiscClassification,
    functioning: Side,
    total_time: i64,
) -> EstimatedSummary {
    let left = rate(classification.count(Region::Left), total_time);
    let right = rate(classification.count(Region::Right), total_time);
    let (functioning_rate, nonfunctioning_rate) = project(functioning, left, right);
    EstimatedSummary {
        failure_rate: classification.failure_rate(),
        true_positives: classification.true_positives,
        true_negatives: classification.true_negatives,
        modes: classification.modes,
        left,
        right,
        background: rate(classification.count(Region::Background), total_time),
        functioning: functioning_rate,
        nonfunctioning: nonfunctioning_rate,
        extended: extended_rates(
            classification.extended_patterns.iter().map(|p| p.class),
            functioning,
            total_time,
        ),
    }
}

/// Reduce a finished session into its record
///
/// # Arguments
/// * `session` - Aggregates of the fixation stream
/// * `params` - Experiment parameters from the subject overview
/// * `config` - Extraction parameters (cutoff, epochs, density classifier)
///
/// # Errors
/// [`Error::UnrecognizedFunctioningSide`] if the functioning side cannot be
/// mapped onto a disc
pub fn reduce(session: FinishedSession, params: SessionParams, config: &ExtractionConfig) -> Result<SessionRecord> {
    let id = session.session_id.clone();
    let functioning = functioning_disc(&id, &params.functioning_side)?;
    let total_time = session.total_time;

    if total_time <= 0 {
        warn!(session = %id, "Session has no corrected duration, rates are not available");
    }

    let empty: Vec<&str> = [
        ("left", &session.fixations_by_region.left),
        ("right", &session.fixations_by_region.right),
        ("image", &session.fixations_by_region.image),
        ("background", &session.fixations_by_region.background),
    ]
    .iter()
    .filter(|(_, series)| series.is_empty())
    .map(|(name, _)| *name)
    .collect();
    if !empty.is_empty() {
        warn!(session = %id, "No fixations on {}, mean durations set to 0.0", empty.join(", "));
    }

    if session.epochs.len() > config.epoch_count {
        warn!(
            session = %id,
            "{} complete epochs observed, only the first {} are summarized",
            session.epochs.len(),
            config.epoch_count
        );
    }
    let epochs: Vec<Option<EpochCounts>> = (0..config.epoch_count)
        .map(|i| session.epochs.get(i).map(|slice| epoch_counts(slice, functioning)))
        .collect();

    let classification = if config.failure_rate {
        let result = density::classify_session(&session.samples, functioning);
        match &result {
            Some(c) if c.failure_rate().is_none() => {
                warn!(session = %id, "No functioning disc fixations, failure rate not available");
            }
            Some(c) => debug!(session = %id, modes = ?c.modes, "Estimated disc centers"),
            None => warn!(session = %id, "Fixation density cannot be estimated, estimates not available"),
        }
        result
    } else {
        None
    };
    let estimated = classification
        .as_ref()
        .map(|c| estimated_summary(c, functioning, total_time));

    let full = session.full_patterns;
    let (full_functioning, full_nonfunctioning) = project(functioning, full.left, full.right);

    Ok(SessionRecord {
        fixations: region_tallies(
            &session.fixations_all,
            &session.fixations_by_region,
            functioning,
            total_time,
        ),
        gaze_events: region_tallies(&session.gaze_all, &session.gaze_by_region, functioning, total_time),
        immediate_patterns: immediate_rates(&session.immediate_patterns, functioning, total_time),
        extended_patterns: extended_rates(
            session.extended_patterns.iter().map(|p| p.class),
            functioning,
            total_time,
        ),
        full_patterns: FullPatternSummary {
            left: full.left,
            right: full.right,
            functioning: full_functioning,
            nonfunctioning: full_nonfunctioning,
        },
        first_side: first_side(&session.fixations_by_region),
        estimated,
        sealed_epochs: session.epochs.len(),
        epochs,
        series: SessionSeries {
            fixations: session.samples,
            gaze_events: session.gaze_events,
            immediate_patterns: session.immediate_patterns,
            extended_patterns: session.extended_patterns,
            estimated_trajectory: classification.as_ref().map(|c| c.trajectory.clone()),
            estimated_extended_patterns: classification.map(|c| c.extended_patterns),
        },
        cutoff: session.cutoff,
        session_id: id,
        params,
        functioning_side: functioning,
        dt_cutoff_ms: config.dt_cutoff_ms,
        total_time,
        triggers: None,
        saccades: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RegionClassifier;
    use crate::report::FixationRecord;
    use crate::session::SessionAccumulator;
    use eyescalar_common::metadata::{Gender, Group, LabSetup, Latency, SessionType};

    fn params(side: FunctioningSide) -> SessionParams {
        SessionParams {
            subject_name: "35".to_string(),
            session_number: "1".to_string(),
            age: "8".to_string(),
            group: Group::AA,
            session_type: SessionType::Active,
            gender: Gender::Male,
            latency: Latency::Short,
            functioning_side: side,
            lab_setup: LabSetup::Old,
        }
    }

    fn finished(fixations: &[(i64, &str, i64)]) -> FinishedSession {
        let config = ExtractionConfig::default();
        let classifier = RegionClassifier::new(&config.markers);
        let mut accumulator = SessionAccumulator::new("35.1", &config);
        for (i, &(time, tag, duration)) in fixations.iter().enumerate() {
            let previous = if i > 0 { fixations[i - 1].1 } else { "." };
            let next = fixations.get(i + 1).map_or(".", |f| f.1);
            accumulator.push(
                &FixationRecord {
                    session_label: "vp35.1".to_string(),
                    raw_time: time,
                    current_tag: tag.to_string(),
                    previous_tag: previous.to_string(),
                    next_tag: next.to_string(),
                    duration,
                    x: 512.0,
                    y: 384.0,
                },
                &classifier,
            );
        }
        accumulator.finish()
    }

    #[test]
    fn test_rates_and_projection_right_functioning() {
        let session = finished(&[
            (0, "image", 100),
            (150, "R", 50),
            (250, "image", 100),
            (400, "L", 50),
            (600, "image", 100),
        ]);
        let record = reduce(session, params(FunctioningSide::Right), &ExtractionConfig::default()).unwrap();

        assert_eq!(record.total_time, 600);
        assert_eq!(record.fixations.all.count, 5);
        assert_eq!(record.fixations.all.rate, Some(500.0));
        assert_eq!(record.fixations.right.count, 1);
        assert_eq!(record.fixations.functioning, record.fixations.right);
        assert_eq!(record.fixations.nonfunctioning, record.fixations.left);
        assert_eq!(record.immediate_patterns.functioning.count, 1);
        assert_eq!(record.extended_patterns.total.count, 2);
        assert_eq!(record.full_patterns.functioning, 1);
        assert_eq!(record.full_patterns.nonfunctioning, 1);
        assert_eq!(record.first_side, Some(Side::Right));
        assert_eq!(record.fixations.image.mean_duration, 100.0);
    }

    #[test]
    fn test_left_functioning_swaps_projection() {
        let session = finished(&[(0, "image", 100), (150, "L", 50), (250, "image", 100)]);
        let record = reduce(session, params(FunctioningSide::Left), &ExtractionConfig::default()).unwrap();
        assert_eq!(record.fixations.functioning.count, 1);
        assert_eq!(record.fixations.nonfunctioning.count, 0);
        assert_eq!(record.extended_patterns.functioning.count, 1);
    }

    #[test]
    fn test_unrecognized_functioning_side_is_fatal() {
        let session = finished(&[(0, "image", 100)]);
        let result = reduce(
            session,
            params(FunctioningSide::NotRecognized("X".to_string())),
            &ExtractionConfig::default(),
        );
        assert!(matches!(result, Err(Error::UnrecognizedFunctioningSide { .. })));
    }

    #[test]
    fn test_empty_region_mean_duration_is_zero() {
        let session = finished(&[(0, "image", 100), (300, "image", 120)]);
        let record = reduce(session, params(FunctioningSide::Right), &ExtractionConfig::default()).unwrap();
        assert_eq!(record.fixations.left.count, 0);
        assert_eq!(record.fixations.left.mean_duration, 0.0);
        assert_eq!(record.gaze_events.right.mean_duration, 0.0);
        assert_eq!(record.first_side, None);
    }

    #[test]
    fn test_zero_duration_session_has_no_rates() {
        let session = finished(&[(0, "R", 100)]);
        let record = reduce(session, params(FunctioningSide::Right), &ExtractionConfig::default()).unwrap();
        assert_eq!(record.total_time, 0);
        assert_eq!(record.fixations.all.rate, None);
        assert_eq!(record.fixations.all.count, 1);
    }

    #[test]
    fn test_epochs_fixed_width() {
        // Image fixations every 150 ms, just past the first minute
        let fixations: Vec<(i64, &str, i64)> = (0..=61_000).step_by(150).map(|t| (t, "image", 100)).collect();
        let session = finished(&fixations);
        let record = reduce(session, params(FunctioningSide::Right), &ExtractionConfig::default()).unwrap();
        assert_eq!(record.epochs.len(), 5);
        assert_eq!(record.sealed_epochs, 1);
        let first = record.epochs[0].unwrap();
        assert_eq!(first.fixations.all, 400);
        assert_eq!(first.fixations.image, 400);
        assert_eq!(first.gaze_events.all, 1);
        assert!(record.epochs[1..].iter().all(Option::is_none));
    }

    #[test]
    fn test_estimates_absent_without_density_classifier() {
        let session = finished(&[(0, "image", 100), (150, "R", 50), (250, "image", 100)]);
        let record = reduce(session, params(FunctioningSide::Right), &ExtractionConfig::default()).unwrap();
        assert!(record.estimated.is_none());
        assert!(record.series.estimated_trajectory.is_none());
    }

    #[test]
    fn test_per_minute() {
        assert_eq!(per_minute(3, 60_000), Some(3.0));
        assert_eq!(per_minute(3, 0), None);
    }
}
