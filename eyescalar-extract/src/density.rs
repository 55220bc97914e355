//! Disc fixation density classifier
//!
//! **Purpose:** Estimate where the subject actually looked when aiming at a
//! disc, independent of the tracker's interest-area tags, and derive the
//! empirical trigger failure rate from it.
//!
//! **Algorithm:**
//! 1. Gaussian kernel density estimate of all fixation coordinates, bandwidth
//!    factor 0.1 (kernel covariance = sample covariance × 0.1²)
//! 2. Evaluate on the 1024×768 screen grid, left zone (x index < 256) and
//!    right zone (x index ≥ 768) only
//! 3. The density mode of each zone is the estimated disc center
//! 4. Reclassify every fixation by distance to the estimated centers, then by
//!    the fixed image rectangle
//! 5. Fixations on the functioning disc are true positives when they also lie
//!    within the disc radius of the disc's fixed screen position, true
//!    negatives otherwise
//!
//! **Tolerance:** Step 2 sums each kernel only within a squared Mahalanobis
//! distance of 40 of its fixation. A skipped contribution is below
//! `exp(-20)` (about 2e-9) of that kernel's peak, so the evaluated density
//! differs from the full sum by less than `n × 2e-9` peak heights for `n`
//! fixations. A zone mode can only move when two grid cells of that zone are
//! closer than this. A zone left without any mass by the truncation is
//! evaluated again with every kernel.

use crate::region::{Region, Side};
use crate::session::fixations::FixationSample;
use crate::session::patterns::{ExtendedPattern, ExtendedRunTracker};
use serde::Serialize;

pub const GRID_WIDTH: usize = 1024;
pub const GRID_HEIGHT: usize = 768;

const LEFT_ZONE_END: usize = 256;
const RIGHT_ZONE_START: usize = 768;

const BANDWIDTH_FACTOR: f64 = 0.1;

/// Kernel contributions beyond this squared Mahalanobis distance are skipped
const KERNEL_CUTOFF: f64 = 40.0;

const DISC_RADIUS: f64 = 90.0;
const LEFT_DISC_CENTER: (f64, f64) = (100.0, 384.0);
const RIGHT_DISC_CENTER: (f64, f64) = (924.0, 384.0);

/// Image rectangle, bounds exclusive
const IMAGE_X: (f64, f64) = (312.0, 712.0);
const IMAGE_Y: (f64, f64) = (250.0, 518.0);

/// Fitted Gaussian kernel (inverse covariance)
#[derive(Debug, Clone, Copy)]
struct Kernel {
    inv_xx: f64,
    inv_xy: f64,
    inv_yy: f64,
    half_width_x: f64,
    half_width_y: f64,
}

impl Kernel {
    /// Fit the kernel to the coordinates; `None` for fewer than two points or
    /// a singular covariance
    fn fit(points: &[(f64, f64)]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

        let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
        for &(x, y) in points {
            let dx = x - mean_x;
            let dy = y - mean_y;
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
        }
        let scale = BANDWIDTH_FACTOR * BANDWIDTH_FACTOR / (n - 1.0);
        let (cxx, cxy, cyy) = (sxx * scale, sxy * scale, syy * scale);

        let det = cxx * cyy - cxy * cxy;
        if !det.is_finite() || det <= 1e-12 * cxx * cyy || det <= 0.0 {
            return None;
        }

        Some(Self {
            inv_xx: cyy / det,
            inv_xy: -cxy / det,
            inv_yy: cxx / det,
            half_width_x: (KERNEL_CUTOFF * cxx).sqrt(),
            half_width_y: (KERNEL_CUTOFF * cyy).sqrt(),
        })
    }

    fn mahalanobis_sq(&self, dx: f64, dy: f64) -> f64 {
        self.inv_xx * dx * dx + 2.0 * self.inv_xy * dx * dy + self.inv_yy * dy * dy
    }
}

/// Unnormalized density over a vertical band of the screen grid
struct ZoneDensity {
    x_start: usize,
    x_end: usize,
    values: Vec<f64>,
}

impl ZoneDensity {
    fn evaluate(points: &[(f64, f64)], kernel: &Kernel, x_start: usize, x_end: usize, truncate: bool) -> Self {
        let mut values = vec![0.0; (x_end - x_start) * GRID_HEIGHT];
        let step_x = GRID_WIDTH as f64 / (GRID_WIDTH - 1) as f64;
        let step_y = GRID_HEIGHT as f64 / (GRID_HEIGHT - 1) as f64;

        for &(px, py) in points {
            let (i_range, j_range) = if truncate {
                let i_lo = ((px - kernel.half_width_x) / step_x).ceil().max(x_start as f64) as usize;
                let i_hi = ((px + kernel.half_width_x) / step_x).floor().min((x_end - 1) as f64);
                let j_lo = ((py - kernel.half_width_y) / step_y).ceil().max(0.0) as usize;
                let j_hi = ((py + kernel.half_width_y) / step_y).floor().min((GRID_HEIGHT - 1) as f64);
                if i_hi < i_lo as f64 || j_hi < j_lo as f64 {
                    continue;
                }
                (i_lo..=i_hi as usize, j_lo..=j_hi as usize)
            } else {
                (x_start..=x_end - 1, 0..=GRID_HEIGHT - 1)
            };

            for i in i_range {
                let dx = i as f64 * step_x - px;
                let row = (i - x_start) * GRID_HEIGHT;
                for j in j_range.clone() {
                    let dy = j as f64 * step_y - py;
                    let q = kernel.mahalanobis_sq(dx, dy);
                    if !truncate || q <= KERNEL_CUTOFF {
                        values[row + j] += (-0.5 * q).exp();
                    }
                }
            }
        }

        Self { x_start, x_end, values }
    }

    /// Grid index of the first strict maximum, scanning x then y
    fn mode(&self) -> (usize, usize) {
        let mut best = (self.x_start, 0);
        let mut best_value = f64::NEG_INFINITY;
        for i in self.x_start..self.x_end {
            let row = (i - self.x_start) * GRID_HEIGHT;
            for j in 0..GRID_HEIGHT {
                let value = self.values[row + j];
                if value > best_value {
                    best_value = value;
                    best = (i, j);
                }
            }
        }
        best
    }

    fn has_mass(&self) -> bool {
        self.values.iter().any(|v| *v > 0.0)
    }
}

fn zone_mode(points: &[(f64, f64)], kernel: &Kernel, x_start: usize, x_end: usize) -> (f64, f64) {
    let mut zone = ZoneDensity::evaluate(points, kernel, x_start, x_end, true);
    if !zone.has_mass() {
        // All data far from the zone: only the exact tails can place the mode
        zone = ZoneDensity::evaluate(points, kernel, x_start, x_end, false);
    }
    let (i, j) = zone.mode();
    (i as f64, j as f64)
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Estimated disc centers of a session, in grid index units
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiscModes {
    pub left: (f64, f64),
    pub right: (f64, f64),
}

impl DiscModes {
    /// Estimate both disc centers from the fixation coordinates
    pub fn estimate(points: &[(f64, f64)]) -> Option<Self> {
        let kernel = Kernel::fit(points)?;
        Some(Self {
            left: zone_mode(points, &kernel, 0, LEFT_ZONE_END),
            right: zone_mode(points, &kernel, RIGHT_ZONE_START, GRID_WIDTH),
        })
    }

    /// Region of a coordinate under the estimated disc centers
    pub fn classify(&self, point: (f64, f64)) -> Region {
        if distance(point, self.left) < DISC_RADIUS {
            Region::Left
        } else if distance(point, self.right) < DISC_RADIUS {
            Region::Right
        } else if point.0 > IMAGE_X.0 && point.0 < IMAGE_X.1 && point.1 > IMAGE_Y.0 && point.1 < IMAGE_Y.1 {
            Region::Image
        } else {
            Region::Background
        }
    }
}

/// Result of reclassifying a session's fixations by density
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscClassification {
    pub modes: DiscModes,
    pub trajectory: Vec<Region>,
    pub extended_patterns: Vec<ExtendedPattern>,
    pub true_positives: usize,
    pub true_negatives: usize,
}

impl DiscClassification {
    /// Share of functioning-disc fixations outside the physical disc
    ///
    /// `None` when no fixation was attributed to the functioning disc.
    pub fn failure_rate(&self) -> Option<f64> {
        let attempts = self.true_positives + self.true_negatives;
        if attempts == 0 {
            None
        } else {
            Some(self.true_negatives as f64 / attempts as f64)
        }
    }

    /// Number of fixations estimated in a region
    pub fn count(&self, region: Region) -> usize {
        self.trajectory.iter().filter(|r| **r == region).count()
    }
}

/// Reclassify a session's fixations by gaze density
///
/// # Returns
/// `None` if the density cannot be estimated (fewer than two fixations or
/// degenerate coordinates)
pub fn classify_session(samples: &[FixationSample], functioning: Side) -> Option<DiscClassification> {
    let points: Vec<(f64, f64)> = samples.iter().map(|s| (s.x, s.y)).collect();
    let modes = DiscModes::estimate(&points)?;

    let (functioning_region, functioning_center) = match functioning {
        Side::Left => (Region::Left, LEFT_DISC_CENTER),
        Side::Right => (Region::Right, RIGHT_DISC_CENTER),
    };

    let mut trajectory = Vec::with_capacity(samples.len());
    let mut runs = ExtendedRunTracker::default();
    let mut extended_patterns = Vec::new();
    let mut true_positives = 0;
    let mut true_negatives = 0;

    for sample in samples {
        let point = (sample.x, sample.y);
        let region = modes.classify(point);

        if region == functioning_region {
            if distance(point, functioning_center) < DISC_RADIUS {
                true_positives += 1;
            } else {
                true_negatives += 1;
            }
        }

        if let Some(pattern) = runs.observe(sample.time, region) {
            extended_patterns.push(pattern);
        }
        trajectory.push(region);
    }

    Some(DiscClassification {
        modes,
        trajectory,
        extended_patterns,
        true_positives,
        true_negatives,
    })
}
