//! Saccade cutoff filtering
//!
//! Overlong gaps between consecutive fixations (blinks, looking away, tracker
//! loss) are collapsed to a short residual gap. Every collapse increases a
//! cumulative correction which is subtracted from all later raw times, so the
//! corrected session time only advances while the subject is actually looking.
//!
//! Two views of the same correction exist:
//! - [`CutoffCorrector`] builds the segment table while walking the fixation
//!   stream.
//! - [`CutoffCursor`] replays a finished [`CutoffTable`] against the raw times
//!   of another report (messages, saccades) of the same session.

use serde::{Deserialize, Serialize};

/// Recorded interval where an overlong inter-fixation gap was truncated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutoffSegment {
    /// Raw end of the fixation before the gap (milliseconds)
    pub gap_start: i64,

    /// Raw start of the fixation after the gap (milliseconds)
    pub gap_end: i64,

    /// Total correction in effect from `gap_end` on (milliseconds)
    pub cumulative_correction: i64,
}

/// Builds the cutoff table while fixations arrive in order
///
/// **Algorithm:**
/// 1. `gap = raw_start - previous_end` (raw times)
/// 2. If `gap > cutoff`, correction grows by `gap - residual` and a segment
///    `[previous_end, raw_start, correction]` is recorded
/// 3. `previous_end = raw_start + duration`
/// 4. Corrected start is `raw_start - correction`
///
/// A gap of exactly `cutoff` is kept as is.
#[derive(Debug, Clone)]
pub struct CutoffCorrector {
    cutoff_ms: i64,
    residual_ms: i64,
    previous_end: i64,
    correction: i64,
    segments: Vec<CutoffSegment>,
}

impl CutoffCorrector {
    /// Create a corrector for one session
    ///
    /// # Arguments
    /// * `cutoff_ms` - Gaps strictly longer than this are truncated
    /// * `residual_ms` - Length a truncated gap is shortened to
    /// * `origin_ms` - "Previous end" the first fixation is compared against
    pub fn new(cutoff_ms: i64, residual_ms: i64, origin_ms: i64) -> Self {
        Self {
            cutoff_ms,
            residual_ms,
            previous_end: origin_ms,
            correction: 0,
            segments: Vec::new(),
        }
    }

    /// Correct the start time of the next fixation
    ///
    /// # Examples
    /// ```
    /// use eyescalar_extract::timeline::CutoffCorrector;
    ///
    /// let mut corrector = CutoffCorrector::new(200, 10, 0);
    /// assert_eq!(corrector.correct(0, 1000), 0);
    /// // 500 ms gap after the fixation ending at 1000
    /// assert_eq!(corrector.correct(1500, 100), 1010);
    /// assert_eq!(corrector.correction(), 490);
    /// ```
    pub fn correct(&mut self, raw_start: i64, duration: i64) -> i64 {
        let gap = raw_start - self.previous_end;
        if gap > self.cutoff_ms {
            self.correction += gap - self.residual_ms;
            self.segments.push(CutoffSegment {
                gap_start: self.previous_end,
                gap_end: raw_start,
                cumulative_correction: self.correction,
            });
        }
        self.previous_end = raw_start + duration;
        raw_start - self.correction
    }

    /// Correction currently in effect
    pub fn correction(&self) -> i64 {
        self.correction
    }

    pub fn segments(&self) -> &[CutoffSegment] {
        &self.segments
    }

    /// Finish the session and keep the table for ancillary reports
    pub fn into_table(self) -> CutoffTable {
        CutoffTable {
            residual_ms: self.residual_ms,
            segments: self.segments,
        }
    }
}

/// Finished cutoff table of one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutoffTable {
    /// Residual gap length used when the table was built
    pub residual_ms: i64,

    /// Segments in time order
    pub segments: Vec<CutoffSegment>,
}

impl CutoffTable {
    /// Cursor for correcting raw times that arrive in non-decreasing order
    pub fn cursor(&self) -> CutoffCursor<'_> {
        CutoffCursor {
            table: self,
            next_index: 0,
            correction: 0,
        }
    }

    /// Total correction of the session
    pub fn total_correction(&self) -> i64 {
        self.segments.last().map_or(0, |s| s.cumulative_correction)
    }
}

/// Replays a cutoff table against another time-ordered event stream
///
/// **Design:**
/// - Index of the next not-yet-crossed segment is cached
/// - Segments are only ever passed forwards, never revisited
/// - Raw times falling inside a truncated gap are clamped to the residual
///   window after the gap start
#[derive(Debug, Clone)]
pub struct CutoffCursor<'a> {
    table: &'a CutoffTable,

    /// Segment whose gap has not been passed yet
    next_index: usize,

    /// Correction of the last passed segment
    correction: i64,
}

impl CutoffCursor<'_> {
    /// Corrected time for a raw event time
    ///
    /// # Examples
    /// ```
    /// use eyescalar_extract::timeline::CutoffCorrector;
    ///
    /// let mut corrector = CutoffCorrector::new(200, 10, 0);
    /// corrector.correct(0, 1000);
    /// corrector.correct(1500, 100);
    /// let table = corrector.into_table();
    ///
    /// let mut cursor = table.cursor();
    /// assert_eq!(cursor.correct(900), 900);
    /// // Inside the truncated gap: clamped to gap start + residual
    /// assert_eq!(cursor.correct(1200), 1010);
    /// assert_eq!(cursor.correct(1600), 1110);
    /// ```
    pub fn correct(&mut self, raw_time: i64) -> i64 {
        let segments = &self.table.segments;

        // Fast-forward through every gap the event lies beyond
        while let Some(segment) = segments.get(self.next_index) {
            if raw_time < segment.gap_end {
                break;
            }
            self.correction = segment.cumulative_correction;
            self.next_index += 1;
        }

        match segments.get(self.next_index) {
            Some(segment) if raw_time > segment.gap_start => {
                raw_time.min(segment.gap_start + self.table.residual_ms) - self.correction
            }
            _ => raw_time - self.correction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gap_equal_to_cutoff_not_corrected() {
        let mut corrector = CutoffCorrector::new(200, 10, 0);
        corrector.correct(0, 100);
        // previous end 100, gap exactly 200
        assert_eq!(corrector.correct(300, 100), 300);
        assert!(corrector.segments().is_empty());
    }

    #[test]
    fn test_gap_one_above_cutoff_corrected() {
        let mut corrector = CutoffCorrector::new(200, 10, 0);
        corrector.correct(0, 100);
        // previous end 100, gap 201
        assert_eq!(corrector.correct(301, 100), 301 - 191);
        assert_eq!(
            corrector.segments(),
            &[CutoffSegment {
                gap_start: 100,
                gap_end: 301,
                cumulative_correction: 191,
            }]
        );
    }

    #[test]
    fn test_first_fixation_compared_to_origin() {
        let mut corrector = CutoffCorrector::new(200, 10, 10_000);
        // Before the origin: negative gap, nothing to truncate
        assert_eq!(corrector.correct(0, 100), 0);

        let mut late = CutoffCorrector::new(200, 10, 10_000);
        assert_eq!(late.correct(12_000, 100), 10_010);
        assert_eq!(late.correction(), 1_990);
    }

    #[test]
    fn test_correction_non_decreasing_and_bounded_by_raw() {
        let mut corrector = CutoffCorrector::new(200, 10, 0);
        let fixations = [(0, 100), (150, 50), (900, 100), (1010, 20), (5000, 300), (5400, 100)];
        let mut last_correction = 0;
        let mut last_corrected = i64::MIN;
        for (raw, duration) in fixations {
            let corrected = corrector.correct(raw, duration);
            assert!(corrector.correction() >= last_correction);
            assert!(corrected <= raw);
            assert!(corrected > last_corrected);
            last_correction = corrector.correction();
            last_corrected = corrected;
        }

        let table = corrector.into_table();
        let corrections: Vec<i64> = table.segments.iter().map(|s| s.cumulative_correction).collect();
        assert!(corrections.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(table.total_correction(), last_correction);
    }

    #[test]
    fn test_cursor_matches_corrector_at_fixation_starts() {
        let fixations = [(0, 100), (700, 100), (2000, 50), (2100, 100), (9000, 100)];
        let mut corrector = CutoffCorrector::new(200, 10, 0);
        let corrected: Vec<i64> = fixations
            .iter()
            .map(|&(raw, duration)| corrector.correct(raw, duration))
            .collect();

        let table = corrector.into_table();
        let mut cursor = table.cursor();
        for (&(raw, _), &expected) in fixations.iter().zip(&corrected) {
            assert_eq!(cursor.correct(raw), expected);
        }
        assert_eq!(cursor.next_index, table.segments.len());
    }

    #[test]
    fn test_cursor_fast_forwards_over_several_segments() {
        let mut corrector = CutoffCorrector::new(200, 10, 0);
        corrector.correct(0, 100);
        corrector.correct(1000, 100); // correction 890
        corrector.correct(3000, 100); // correction 890 + 1890
        let table = corrector.into_table();

        let mut cursor = table.cursor();
        assert_eq!(cursor.correct(5000), 5000 - 2780);
        assert_eq!(cursor.next_index, 2);
        // Never moves backwards
        assert_eq!(cursor.correct(50), 50 - 2780);
    }

    #[test]
    fn test_cursor_empty_table_is_identity() {
        let table = CutoffTable::default();
        let mut cursor = table.cursor();
        assert_eq!(cursor.correct(123), 123);
        assert_eq!(table.total_correction(), 0);
    }
}
