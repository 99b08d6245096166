use serde::{Deserialize, Serialize};

use crate::channels::ChannelSet;
use crate::detectors::threshold::PeakDetection;
use crate::signal::Channel;

pub const OVERLAY_TITLE: &str = "Overlayed Graph of All Files";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const GREEN: Color = Color(0x008000);
    pub const RED: Color = Color(0xFF0000);
    pub const BLACK: Color = Color(0x000000);
    pub const ORANGE: Color = Color(0xFFA500);

    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

/// Line colours cycled across channels.
pub const PALETTE: [Color; 10] = [
    Color(0x636EFA),
    Color(0xEF553B),
    Color(0x00CC96),
    Color(0xAB63FA),
    Color(0xFFA15A),
    Color(0x19D3F3),
    Color(0xFF6692),
    Color(0xB6E880),
    Color(0xFF97FF),
    Color(0xFECB52),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
    /// Hidden lines stay in the legend and can be toggled on.
    pub visible: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerShape {
    TriangleUp,
    TriangleDown,
    Circle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub shape: MarkerShape,
    pub size: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Markers(MarkerSeries),
}

impl Series {
    pub fn name(&self) -> &str {
        match self {
            Series::Line(line) => &line.name,
            Series::Markers(markers) => &markers.name,
        }
    }

    pub fn points(&self) -> &[[f64; 2]] {
        match self {
            Series::Line(line) => &line.points,
            Series::Markers(markers) => &markers.points,
        }
    }

    pub fn is_visible(&self) -> bool {
        match self {
            Series::Line(line) => line.visible,
            Series::Markers(_) => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis {
                label: Some("Index".into()),
            },
            y: Axis {
                label: Some("Value".into()),
            },
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    pub fn series_named(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.name() == name)
    }

    pub fn line_mut(&mut self, name: &str) -> Option<&mut LineSeries> {
        self.series.iter_mut().find_map(|s| match s {
            Series::Line(line) if line.name == name => Some(line),
            _ => None,
        })
    }

    /// `[x_min, x_max, y_min, y_max]` over series that are drawn.
    pub fn visible_bounds(&self) -> Option<[f64; 4]> {
        let mut points = self
            .series
            .iter()
            .filter(|s| s.is_visible())
            .flat_map(|s| s.points().iter());
        let first = points.next()?;
        let init = [first[0], first[0], first[1], first[1]];
        Some(points.fold(init, |b, p| {
            [b[0].min(p[0]), b[1].max(p[0]), b[2].min(p[1]), b[3].max(p[1])]
        }))
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

/// Reduce `points` to at most `max_points` by keeping the lowest and highest
/// sample of each bucket, in index order, so short spikes stay visible.
pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let buckets = (max_points / 2).max(1);
    let bucket_size = points.len() as f64 / buckets as f64;
    let mut result = Vec::with_capacity(buckets * 2);
    for i in 0..buckets {
        let start = (i as f64 * bucket_size).floor() as usize;
        let end = if i + 1 == buckets {
            points.len()
        } else {
            (((i + 1) as f64 * bucket_size).floor() as usize).min(points.len())
        };
        let Some(bucket) = points.get(start..end).filter(|b| !b.is_empty()) else {
            continue;
        };
        let (mut lo, mut hi) = (0, 0);
        for (j, p) in bucket.iter().enumerate() {
            if p[1] < bucket[lo][1] {
                lo = j;
            }
            if p[1] > bucket[hi][1] {
                hi = j;
            }
        }
        let (first, second) = (lo.min(hi), lo.max(hi));
        result.push(bucket[first]);
        if second != first {
            result.push(bucket[second]);
        }
    }
    result
}

fn channel_line(channel: &Channel, color: Color, visible: bool, max_points: usize) -> LineSeries {
    LineSeries {
        name: channel.name.clone(),
        points: decimate_points(&channel.points(), max_points),
        style: Style {
            width: 1.4,
            dash: None,
            color,
        },
        visible,
    }
}

fn marker_points(reference: &Channel, indices: &[usize]) -> Vec<[f64; 2]> {
    indices
        .iter()
        .filter_map(|&i| reference.samples.get(i).map(|v| [i as f64, v]))
        .collect()
}

/// Every channel as a line (only `reference` visible), plus edge/peak
/// markers and the threshold line when `detection` found intervals.
pub fn overlay_figure(
    set: &ChannelSet,
    reference: &str,
    detection: Option<&PeakDetection>,
    max_points: usize,
) -> Figure {
    let mut fig = Figure::new(Some(OVERLAY_TITLE.to_string()));
    for (i, channel) in set.sorted().into_iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let visible = channel.name == reference;
        fig.add_series(Series::Line(channel_line(
            channel, color, visible, max_points,
        )));
    }

    let (Some(reference), Some(detection)) = (set.get(reference), detection) else {
        return fig;
    };
    let Some(edges) = &detection.edges else {
        return fig;
    };

    fig.add_series(Series::Markers(MarkerSeries {
        name: "Rising edges".into(),
        points: marker_points(reference, &edges.rising),
        shape: MarkerShape::TriangleUp,
        size: 8.0,
        color: Color::GREEN,
    }));
    fig.add_series(Series::Markers(MarkerSeries {
        name: "Falling edges".into(),
        points: marker_points(reference, &edges.falling),
        shape: MarkerShape::TriangleDown,
        size: 8.0,
        color: Color::RED,
    }));
    fig.add_series(Series::Markers(MarkerSeries {
        name: "Peaks".into(),
        points: marker_points(reference, &edges.peaks),
        shape: MarkerShape::Circle,
        size: 4.0,
        color: Color::BLACK,
    }));

    let last = reference.len().saturating_sub(1) as f64;
    fig.add_series(Series::Line(LineSeries {
        name: "Threshold".into(),
        points: vec![[0.0, detection.threshold], [last, detection.threshold]],
        style: Style {
            width: 2.0,
            dash: Some([6.0, 4.0]),
            color: Color::ORANGE,
        },
        visible: true,
    }));
    fig
}

pub fn channel_figure(channel: &Channel, max_points: usize) -> Figure {
    let mut fig = Figure::new(Some(channel.name.clone()));
    fig.add_series(Series::Line(channel_line(
        channel, PALETTE[0], true, max_points,
    )));
    fig
}
