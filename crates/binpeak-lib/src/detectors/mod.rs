pub mod threshold;

pub use threshold::{detect_peaks, PeakDetection, PeakEdges};
