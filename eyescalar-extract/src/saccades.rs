//! Saccade tallies from saccade reports

use crate::record::{Rate, SaccadeSample, SaccadeSummary};
use crate::report::SaccadeRecord;
use crate::timeline::CutoffTable;
use crate::triggers::per_second;

/// Tally the saccades of one session
///
/// Saccade times are corrected with the session's cutoff table, like
/// trigger times.
pub fn summarize(saccades: &[SaccadeRecord], cutoff: &CutoffTable, total_time: i64) -> SaccadeSummary {
    let mut cursor = cutoff.cursor();
    let samples: Vec<SaccadeSample> = saccades
        .iter()
        .map(|s| SaccadeSample {
            time: cursor.correct(s.raw_time),
            duration: s.duration,
            amplitude: s.amplitude,
            angle: s.angle,
            velocity_avg: s.velocity_avg,
            velocity_peak: s.velocity_peak,
            blink: s.contains_blink,
        })
        .collect();

    let blinks = samples.iter().filter(|s| s.blink).count();
    let blink_ratio = if samples.is_empty() {
        0.0
    } else {
        blinks as f64 / samples.len() as f64
    };

    SaccadeSummary {
        saccades: Rate {
            count: samples.len(),
            rate: per_second(samples.len(), total_time),
        },
        blinks,
        blink_ratio,
        samples,
    }
}
