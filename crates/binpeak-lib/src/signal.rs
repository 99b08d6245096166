use serde::{Deserialize, Serialize};
use std::fmt;

use crate::detectors::threshold::{detect_peaks, PeakDetection};

/// Storage width of one decoded sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleWidth {
    U16,
    U32,
}

impl SampleWidth {
    pub fn bytes(self) -> usize {
        match self {
            SampleWidth::U16 => 2,
            SampleWidth::U32 => 4,
        }
    }
}

impl fmt::Display for SampleWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleWidth::U16 => f.write_str("u16"),
            SampleWidth::U32 => f.write_str("u32"),
        }
    }
}

/// Decoded sample sequence, kept in its native width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "width", content = "data", rename_all = "lowercase")]
pub enum Samples {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Samples {
    pub fn width(&self) -> SampleWidth {
        match self {
            Samples::U16(_) => SampleWidth::U16,
            Samples::U32(_) => SampleWidth::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Samples::U16(v) => v.len(),
            Samples::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            Samples::U16(v) => v.get(index).map(|&x| f64::from(x)),
            Samples::U32(v) => v.get(index).map(|&x| f64::from(x)),
        }
    }

    pub fn iter_f64(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match self {
            Samples::U16(v) => Box::new(v.iter().map(|&x| f64::from(x))),
            Samples::U32(v) => Box::new(v.iter().map(|&x| f64::from(x))),
        }
    }

    pub fn to_f64(&self) -> Vec<f64> {
        self.iter_f64().collect()
    }

    pub fn min(&self) -> Option<f64> {
        match self {
            Samples::U16(v) => v.iter().min().map(|&x| f64::from(x)),
            Samples::U32(v) => v.iter().min().map(|&x| f64::from(x)),
        }
    }

    pub fn max(&self) -> Option<f64> {
        match self {
            Samples::U16(v) => v.iter().max().map(|&x| f64::from(x)),
            Samples::U32(v) => v.iter().max().map(|&x| f64::from(x)),
        }
    }

    pub fn detect_peaks(&self) -> PeakDetection {
        match self {
            Samples::U16(v) => detect_peaks(v),
            Samples::U32(v) => detect_peaks(v),
        }
    }
}

/// One decoded source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub samples: Samples,
}

impl Channel {
    pub fn new(name: impl Into<String>, samples: Samples) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `[index, value]` pairs, the x axis being the sample index.
    pub fn points(&self) -> Vec<[f64; 2]> {
        self.samples
            .iter_f64()
            .enumerate()
            .map(|(i, value)| [i as f64, value])
            .collect()
    }
}

/// Inclusive min/max over one or more sequences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn merge(self, other: ValueRange) -> ValueRange {
        ValueRange {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}
