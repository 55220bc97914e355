//! Epoch partitioning of the corrected session timeline

use crate::region::Region;
use crate::session::patterns::ExtendedClass;
use serde::Serialize;

/// Activity of one epoch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EpochSlice {
    /// Regions of the fixations starting in this epoch
    pub fixations: Vec<Region>,

    /// Extended patterns closed in this epoch
    pub extended: Vec<ExtendedClass>,

    /// Regions of the gaze events opened in this epoch
    pub gaze_events: Vec<Region>,
}

/// Splits the session into fixed-length epochs of corrected time
///
/// The slice in progress is sealed whenever a fixation falls into a different
/// epoch index than the current one. The final slice is never sealed, so only
/// complete epochs are reported.
#[derive(Debug, Clone)]
pub struct EpochPartitioner {
    epoch_ms: i64,
    current_index: i64,
    current: EpochSlice,
    sealed: Vec<EpochSlice>,
}

impl EpochPartitioner {
    pub fn new(epoch_ms: i64) -> Self {
        Self {
            epoch_ms,
            current_index: 0,
            current: EpochSlice::default(),
            sealed: Vec::new(),
        }
    }

    /// Move to the epoch of `time`, sealing the current slice on a change
    pub fn advance(&mut self, time: i64) {
        let index = time.div_euclid(self.epoch_ms);
        if index != self.current_index {
            self.sealed.push(std::mem::take(&mut self.current));
            self.current_index = index;
        }
    }

    pub fn record_fixation(&mut self, region: Region) {
        self.current.fixations.push(region);
    }

    pub fn record_extended(&mut self, class: ExtendedClass) {
        self.current.extended.push(class);
    }

    pub fn record_gaze_event(&mut self, region: Region) {
        self.current.gaze_events.push(region);
    }

    pub fn sealed(&self) -> &[EpochSlice] {
        &self.sealed
    }

    /// Sealed epochs; the slice in progress is dropped
    pub fn finish(self) -> Vec<EpochSlice> {
        self.sealed
    }
}
