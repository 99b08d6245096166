use binpeak_lib::{
    channels::ChannelSet,
    config::ChannelConfig,
    detectors::threshold::PeakDetection,
    io::binary::{ingest_uploads, IngestNotice},
    plot::{channel_figure, overlay_figure, Figure, Series},
};
use log::info;
use std::collections::BTreeMap;

const MAX_OVERLAY_POINTS: usize = 4096;
const MAX_SINGLE_POINTS: usize = 8192;

#[derive(Default)]
struct DirtyFlags {
    overlay: bool,
    single: bool,
}

impl DirtyFlags {
    fn mark_all(&mut self) {
        self.overlay = true;
        self.single = true;
    }
}

#[derive(Default)]
struct Snapshot {
    channels: ChannelSet,
    notices: Vec<IngestNotice>,
    detection: Option<PeakDetection>,
    overlay_figure: Option<Figure>,
    single_figure: Option<Figure>,
}

/// Decoded uploads plus everything derived from them. Figures are rebuilt
/// lazily after uploads, visibility or selection change.
pub struct Store {
    cfg: ChannelConfig,
    snapshot: Snapshot,
    dirty: DirtyFlags,
    visibility: BTreeMap<String, bool>,
    selected: Option<String>,
}

impl Store {
    pub fn new(cfg: ChannelConfig) -> Self {
        Self {
            cfg,
            snapshot: Snapshot::default(),
            dirty: DirtyFlags::default(),
            visibility: BTreeMap::new(),
            selected: None,
        }
    }

    pub fn reference(&self) -> &str {
        &self.cfg.reference
    }

    /// Replace the current uploads. Only the reference channel starts visible
    /// and the first channel in display order is selected.
    pub fn load_uploads(&mut self, uploads: Vec<(String, Vec<u8>)>) {
        let report = ingest_uploads(uploads, &self.cfg);
        let reference = self.cfg.reference.clone();
        self.visibility = report
            .channels
            .names()
            .into_iter()
            .map(|name| (name.to_string(), name == reference))
            .collect();
        self.selected = report.channels.names().first().map(|n| n.to_string());
        self.snapshot = Snapshot {
            detection: report
                .channels
                .get(&reference)
                .map(|c| c.samples.detect_peaks()),
            channels: report.channels,
            notices: report.notices,
            overlay_figure: None,
            single_figure: None,
        };
        if let Some(det) = &self.snapshot.detection {
            info!(
                "{}: threshold {:.3}, {} peak(s)",
                reference,
                det.threshold,
                det.peak_count()
            );
        }
        self.dirty.mark_all();
    }

    pub fn push_notice(&mut self, notice: IngestNotice) {
        self.snapshot.notices.push(notice);
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.snapshot.channels
    }

    pub fn notices(&self) -> &[IngestNotice] {
        &self.snapshot.notices
    }

    pub fn has_reference(&self) -> bool {
        self.snapshot.channels.contains(&self.cfg.reference)
    }

    pub fn detection(&self) -> Option<&PeakDetection> {
        self.snapshot.detection.as_ref()
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.visibility.get(name).copied().unwrap_or(false)
    }

    pub fn set_visible(&mut self, name: &str, visible: bool) {
        if let Some(slot) = self.visibility.get_mut(name) {
            if *slot != visible {
                *slot = visible;
                self.dirty.overlay = true;
            }
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn select(&mut self, name: &str) {
        if self.selected.as_deref() != Some(name) && self.snapshot.channels.contains(name) {
            self.selected = Some(name.to_string());
            self.dirty.single = true;
        }
    }

    /// Overlay chart; `None` until the reference channel is uploaded.
    pub fn overlay_figure(&mut self) -> Option<&Figure> {
        if !self.has_reference() {
            return None;
        }
        if self.dirty.overlay || self.snapshot.overlay_figure.is_none() {
            let mut fig = overlay_figure(
                &self.snapshot.channels,
                &self.cfg.reference,
                self.snapshot.detection.as_ref(),
                MAX_OVERLAY_POINTS,
            );
            for series in &mut fig.series {
                if let Series::Line(line) = series {
                    if let Some(&visible) = self.visibility.get(&line.name) {
                        line.visible = visible;
                    }
                }
            }
            self.snapshot.overlay_figure = Some(fig);
            self.dirty.overlay = false;
        }
        self.snapshot.overlay_figure.as_ref()
    }

    pub fn single_figure(&mut self) -> Option<&Figure> {
        if self.dirty.single || self.snapshot.single_figure.is_none() {
            self.snapshot.single_figure = self
                .selected
                .as_deref()
                .and_then(|name| self.snapshot.channels.get(name))
                .map(|channel| channel_figure(channel, MAX_SINGLE_POINTS));
            self.dirty.single = false;
        }
        self.snapshot.single_figure.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_bytes(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn loaded() -> Store {
        let mut store = Store::new(ChannelConfig::default());
        store.load_uploads(vec![
            (
                "bay_1_left_VL.bin".to_string(),
                u16_bytes(&[0, 0, 0, 0, 0, 100, 100, 0, 0, 0]),
            ),
            ("Aux.bin".to_string(), u16_bytes(&[1, 2, 3])),
            ("readme.md".to_string(), b"hi".to_vec()),
        ]);
        store
    }

    #[test]
    fn upload_runs_detection_on_reference() {
        let store = loaded();
        assert!(store.has_reference());
        assert_eq!(store.channels().len(), 2);
        assert_eq!(store.notices().len(), 3);
        let det = store.detection().expect("detection");
        assert_eq!(det.edges.as_ref().map(|e| e.peaks.clone()), Some(vec![5]));
    }

    #[test]
    fn only_reference_starts_visible() {
        let mut store = loaded();
        assert!(store.is_visible("bay_1_left_VL.bin"));
        assert!(!store.is_visible("Aux.bin"));
        let fig = store.overlay_figure().expect("overlay");
        let visible: Vec<&str> = fig
            .series
            .iter()
            .filter(|s| s.is_visible())
            .map(Series::name)
            .collect();
        assert_eq!(
            visible,
            vec![
                "bay_1_left_VL.bin",
                "Rising edges",
                "Falling edges",
                "Peaks",
                "Threshold"
            ]
        );
    }

    #[test]
    fn toggling_visibility_rebuilds_overlay() {
        let mut store = loaded();
        store.set_visible("Aux.bin", true);
        let fig = store.overlay_figure().expect("overlay");
        assert!(fig.series_named("Aux.bin").map(Series::is_visible).unwrap_or(false));
        store.set_visible("unknown.bin", true);
        assert!(!store.is_visible("unknown.bin"));
    }

    #[test]
    fn selection_drives_single_figure() {
        let mut store = loaded();
        assert_eq!(store.selected(), Some("Aux.bin"));
        let title = store.single_figure().and_then(|f| f.title.clone());
        assert_eq!(title.as_deref(), Some("Aux.bin"));

        store.select("bay_1_left_VL.bin");
        let title = store.single_figure().and_then(|f| f.title.clone());
        assert_eq!(title.as_deref(), Some("bay_1_left_VL.bin"));

        store.select("missing.bin");
        assert_eq!(store.selected(), Some("bay_1_left_VL.bin"));
    }

    #[test]
    fn missing_reference_has_no_overlay() {
        let mut store = Store::new(ChannelConfig::default());
        store.load_uploads(vec![("other.bin".to_string(), u16_bytes(&[1, 2]))]);
        assert!(!store.has_reference());
        assert!(store.detection().is_none());
        assert!(store.overlay_figure().is_none());
        assert!(store.single_figure().is_some());
    }
}
