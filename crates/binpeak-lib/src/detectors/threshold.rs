//! Threshold-crossing peak detection.
//!
//! A sample is "above" when it exceeds `mean + 1.5 * std` of the whole
//! sequence. Edges come from the first difference of that boolean mask and
//! every completed above-threshold interval contributes one peak at its
//! integer midpoint.

use serde::{Deserialize, Serialize};

/// Standard deviations above the mean at which a sample counts as "above".
pub const THRESHOLD_STD_MULTIPLIER: f64 = 1.5;

/// Matched crossing indices; all three vectors have the same length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakEdges {
    /// Diff-array index of each false→true transition. This is the last
    /// sample at or below the threshold, one before the first sample above it.
    pub rising: Vec<usize>,
    /// First sample back at or below the threshold after each interval.
    pub falling: Vec<usize>,
    /// `(rising[k] + falling[k]) / 2`.
    pub peaks: Vec<usize>,
}

impl PeakEdges {
    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// `(rising, peak, falling)` per interval.
    pub fn intervals(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.rising
            .iter()
            .zip(&self.peaks)
            .zip(&self.falling)
            .map(|((&r, &p), &f)| (r, p, f))
    }
}

/// Detector output. `edges == None` means no complete interval was found;
/// the threshold is reported either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakDetection {
    pub threshold: f64,
    pub edges: Option<PeakEdges>,
}

impl PeakDetection {
    pub fn is_empty(&self) -> bool {
        self.edges.is_none()
    }

    pub fn peak_count(&self) -> usize {
        self.edges.as_ref().map_or(0, PeakEdges::len)
    }
}

fn as_f64<T: Into<f64>>(x: T) -> f64 {
    x.into()
}

/// Mean and population standard deviation, `None` for an empty slice.
pub fn mean_and_std<T: Copy + Into<f64>>(samples: &[T]) -> Option<(f64, f64)> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&x| as_f64(x)).sum::<f64>() / n;
    let var = samples
        .iter()
        .map(|&x| (as_f64(x) - mean).powi(2))
        .sum::<f64>()
        / n;
    Some((mean, var.sqrt()))
}

/// Locate above-threshold intervals in `samples`.
///
/// Rising and falling edges are paired positionally after truncating both
/// lists to the shorter one, so a trailing rising edge with no matching fall
/// is dropped. Pairing stays in phase as long as the sequence does not start
/// above the threshold.
///
/// An empty slice yields a `NaN` threshold and no edges.
pub fn detect_peaks<T: Copy + Into<f64>>(samples: &[T]) -> PeakDetection {
    let Some((mean, std)) = mean_and_std(samples) else {
        return PeakDetection {
            threshold: f64::NAN,
            edges: None,
        };
    };
    let threshold = mean + THRESHOLD_STD_MULTIPLIER * std;

    let above: Vec<i8> = samples
        .iter()
        .map(|&x| i8::from(as_f64(x) > threshold))
        .collect();

    let mut rising = Vec::new();
    let mut falling = Vec::new();
    for (i, w) in above.windows(2).enumerate() {
        match w[1] - w[0] {
            1 => rising.push(i),
            -1 => falling.push(i + 1),
            _ => {}
        }
    }

    let num_peaks = rising.len().min(falling.len());
    if num_peaks == 0 {
        return PeakDetection {
            threshold,
            edges: None,
        };
    }
    rising.truncate(num_peaks);
    falling.truncate(num_peaks);
    let peaks = rising
        .iter()
        .zip(&falling)
        .map(|(&r, &f)| (r + f) / 2)
        .collect();

    PeakDetection {
        threshold,
        edges: Some(PeakEdges {
            rising,
            falling,
            peaks,
        }),
    }
}
