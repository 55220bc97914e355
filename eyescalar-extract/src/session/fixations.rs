//! Fixation stream aggregation
//!
//! Keeps the session-wide fixation trajectory and the corrected start times
//! and durations of all fixations, overall and per region.

use crate::region::{Region, RegionMap};
use serde::Serialize;

/// Corrected start times and durations of a set of fixations or events
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    pub times: Vec<i64>,
    pub durations: Vec<i64>,
}

impl TimeSeries {
    pub fn push(&mut self, time: i64, duration: i64) {
        self.times.push(time);
        self.durations.push(duration);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Mean duration, 0.0 for an empty series
    pub fn mean_duration(&self) -> f64 {
        if self.durations.is_empty() {
            return 0.0;
        }
        self.durations.iter().sum::<i64>() as f64 / self.durations.len() as f64
    }
}

/// One corrected, classified fixation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FixationSample {
    pub time: i64,
    pub duration: i64,
    pub region: Region,
    pub x: f64,
    pub y: f64,
}

/// Session-wide fixation lists
#[derive(Debug, Clone, Default)]
pub struct FixationAggregator {
    samples: Vec<FixationSample>,
    all: TimeSeries,
    by_region: RegionMap<TimeSeries>,
}

impl FixationAggregator {
    pub fn push(&mut self, sample: FixationSample) {
        self.all.push(sample.time, sample.duration);
        self.by_region
            .get_mut(sample.region)
            .push(sample.time, sample.duration);
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[FixationSample] {
        &self.samples
    }

    pub fn all(&self) -> &TimeSeries {
        &self.all
    }

    pub fn by_region(&self) -> &RegionMap<TimeSeries> {
        &self.by_region
    }

    /// Corrected time between the first and the last fixation start
    pub fn total_time(&self) -> i64 {
        match (self.all.times.first(), self.all.times.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0,
        }
    }

    pub fn into_parts(self) -> (Vec<FixationSample>, TimeSeries, RegionMap<TimeSeries>) {
        (self.samples, self.all, self.by_region)
    }
}
