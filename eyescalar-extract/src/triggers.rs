//! Image trigger extraction from message reports
//!
//! Every message announcing sound playback marks the presentation of a new
//! image. Trigger times are mapped onto the corrected session timeline with
//! the cutoff table built while processing the fixation report.

use crate::record::{Rate, TriggerSummary};
use crate::report::MessageRecord;
use crate::timeline::CutoffTable;

/// Message text identifying an image trigger
pub const TRIGGER_MARKER: &str = "PLAY_SOUND_b";

/// Events per second over the session, `None` without session duration
pub fn per_second(count: usize, total_time: i64) -> Option<f64> {
    if total_time > 0 {
        Some(1000.0 * count as f64 / total_time as f64)
    } else {
        None
    }
}

pub fn is_trigger(message: &str) -> bool {
    message.contains(TRIGGER_MARKER)
}

/// Collect the image triggers of one session's messages
///
/// # Arguments
/// * `messages` - Messages of one session, in report order
/// * `cutoff` - Cutoff table of the same session
/// * `total_time` - Corrected session duration (ms)
pub fn summarize(messages: &[MessageRecord], cutoff: &CutoffTable, total_time: i64) -> TriggerSummary {
    let mut cursor = cutoff.cursor();
    let mut summary = TriggerSummary::default();

    for message in messages {
        // Every message advances the cursor, triggers or not
        let time = cursor.correct(message.raw_time);
        if !is_trigger(&message.message) {
            continue;
        }
        if let Some(previous) = summary.times.last() {
            summary.intervals.push(time - previous);
        }
        summary.times.push(time);
        summary.raw_times.push(message.raw_time);
    }

    summary.triggers = Rate {
        count: summary.times.len(),
        rate: per_second(summary.times.len(), total_time),
    };
    summary
}
