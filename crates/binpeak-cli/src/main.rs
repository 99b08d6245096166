use anyhow::{anyhow, Context, Result};
use binpeak_lib::{
    channels::ChannelSet,
    config::ChannelConfig,
    detectors::threshold::{detect_peaks, PeakDetection},
    io::{
        binary::{self as bin_io, IngestNotice, IngestReport},
        text as text_io,
    },
    plot::{channel_figure, overlay_figure, Figure, MarkerShape, PlotBackend, Series},
    signal::{SampleWidth, ValueRange},
};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{info, warn};
use plotters::prelude::*;
use serde::Serialize;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

/// PNG output keeps every sample; decimation is for interactive views.
const PNG_MAX_POINTS: usize = usize::MAX;

#[derive(Parser)]
#[command(
    name = "binpeak",
    version,
    about = "Decode binary sensor captures and mark threshold peaks"
)]
struct Cli {
    /// Logging verbosity (e.g., debug, info, warn); RUST_LOG takes precedence
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// TOML file mapping channel names to sample widths
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Width {
    U16,
    U32,
}

impl From<Width> for SampleWidth {
    fn from(w: Width) -> Self {
        match w {
            Width::U16 => SampleWidth::U16,
            Width::U32 => SampleWidth::U32,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect peaks in one sequence (a .bin file, a text file, or text on stdin)
    Detect {
        /// Binary capture; width comes from --width or the channel config
        #[arg(long, conflicts_with = "text")]
        input: Option<PathBuf>,
        /// Whitespace/comma separated samples
        #[arg(long)]
        text: Option<PathBuf>,
        #[arg(long)]
        width: Option<Width>,
        #[arg(long, default_value = "json")]
        format: OutputFormat,
    },
    /// Decode .bin files and summarize each channel
    Decode {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Decode files and run detection on the reference channel
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Overrides the configured reference channel
        #[arg(long)]
        reference: Option<String>,
    },
    /// Render the overlay chart (reference, markers, threshold) to a PNG
    Plot {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        reference: Option<String>,
        /// Draw legend-only channels too
        #[arg(long)]
        all_visible: bool,
    },
    /// Render a single channel to a PNG
    PlotChannel {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        channel: String,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(cli.log_level.as_str())).init();
    let cfg = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Detect {
            input,
            text,
            width,
            format,
        } => cmd_detect(&cfg, input.as_deref(), text.as_deref(), width, format)?,
        Commands::Decode { files } => cmd_decode(&cfg, &files)?,
        Commands::Analyze { files, reference } => cmd_analyze(&cfg, &files, reference)?,
        Commands::Plot {
            files,
            out,
            reference,
            all_visible,
        } => cmd_plot(&cfg, &files, &out, reference, all_visible)?,
        Commands::PlotChannel {
            files,
            channel,
            out,
        } => cmd_plot_channel(&cfg, &files, &channel, &out)?,
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ChannelConfig> {
    match path {
        Some(path) => {
            let cfg = ChannelConfig::load(path)?;
            info!("loaded channel config from {}", path.display());
            Ok(cfg)
        }
        None => Ok(ChannelConfig::default()),
    }
}

fn read_text_samples(path: Option<&Path>) -> Result<Vec<f64>> {
    match path {
        Some(path) => text_io::read_f64_series(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_f64_series(&buf)
        }
    }
}

fn cmd_detect(
    cfg: &ChannelConfig,
    input: Option<&Path>,
    text: Option<&Path>,
    width: Option<Width>,
    format: OutputFormat,
) -> Result<()> {
    let detection = match input {
        Some(path) => {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            let width = width.map(SampleWidth::from).unwrap_or_else(|| cfg.width_for(name));
            let bytes =
                std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
            let samples = bin_io::decode_samples(&bytes, width)
                .with_context(|| format!("Error reading {}", path.display()))?;
            samples.detect_peaks()
        }
        None => detect_peaks(&read_text_samples(text)?),
    };
    info!(
        "threshold {:.4}, {} peak(s)",
        detection.threshold,
        detection.peak_count()
    );
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&DetectOutput::from(&detection))?),
        OutputFormat::Csv => {
            eprintln!("threshold: {}", detection.threshold);
            write_intervals_csv(&detection, io::stdout().lock())?
        }
    }
    Ok(())
}

/// Flat report; the three index lists are `null` when no interval completed.
#[derive(Serialize)]
struct DetectOutput<'a> {
    threshold: f64,
    rising: Option<&'a [usize]>,
    falling: Option<&'a [usize]>,
    peaks: Option<&'a [usize]>,
}

impl<'a> From<&'a PeakDetection> for DetectOutput<'a> {
    fn from(det: &'a PeakDetection) -> Self {
        let edges = det.edges.as_ref();
        Self {
            threshold: det.threshold,
            rising: edges.map(|e| e.rising.as_slice()),
            falling: edges.map(|e| e.falling.as_slice()),
            peaks: edges.map(|e| e.peaks.as_slice()),
        }
    }
}

fn write_intervals_csv<W: io::Write>(detection: &PeakDetection, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["rising", "peak", "falling"])?;
    if let Some(edges) = &detection.edges {
        for (rising, peak, falling) in edges.intervals() {
            writer.serialize((rising, peak, falling))?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct ChannelSummary<'a> {
    name: &'a str,
    width: SampleWidth,
    len: usize,
    min: Option<f64>,
    max: Option<f64>,
}

fn summarize(set: &ChannelSet) -> Vec<ChannelSummary<'_>> {
    set.sorted()
        .into_iter()
        .map(|c| ChannelSummary {
            name: &c.name,
            width: c.samples.width(),
            len: c.len(),
            min: c.samples.min(),
            max: c.samples.max(),
        })
        .collect()
}

fn ingest(cfg: &ChannelConfig, files: &[PathBuf]) -> Result<IngestReport> {
    let report = bin_io::read_bin_files(files, cfg)?;
    info!("{} file(s) uploaded", report.uploaded());
    for notice in report.problems() {
        warn!("{}", notice.message());
    }
    Ok(report)
}

#[derive(Serialize)]
struct DecodeOutput<'a> {
    channels: Vec<ChannelSummary<'a>>,
    notices: &'a [IngestNotice],
}

fn cmd_decode(cfg: &ChannelConfig, files: &[PathBuf]) -> Result<()> {
    let report = ingest(cfg, files)?;
    let out = DecodeOutput {
        channels: summarize(&report.channels),
        notices: &report.notices,
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    reference: &'a str,
    detection: DetectOutput<'a>,
    range: Option<ValueRange>,
    channels: Vec<ChannelSummary<'a>>,
    notices: &'a [IngestNotice],
}

fn reference_detection(report: &IngestReport, reference: &str) -> Result<PeakDetection> {
    let channel = report
        .channels
        .get(reference)
        .ok_or_else(|| anyhow!("No {} found", reference))?;
    let detection = channel.samples.detect_peaks();
    info!(
        "{}: threshold {:.4}, {} peak(s)",
        reference,
        detection.threshold,
        detection.peak_count()
    );
    Ok(detection)
}

fn cmd_analyze(cfg: &ChannelConfig, files: &[PathBuf], reference: Option<String>) -> Result<()> {
    let reference = reference.unwrap_or_else(|| cfg.reference.clone());
    let report = ingest(cfg, files)?;
    let detection = reference_detection(&report, &reference)?;
    let out = AnalyzeOutput {
        reference: &reference,
        detection: DetectOutput::from(&detection),
        range: report.channels.value_range(),
        channels: summarize(&report.channels),
        notices: &report.notices,
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn cmd_plot(
    cfg: &ChannelConfig,
    files: &[PathBuf],
    out: &Path,
    reference: Option<String>,
    all_visible: bool,
) -> Result<()> {
    let reference = reference.unwrap_or_else(|| cfg.reference.clone());
    let report = ingest(cfg, files)?;
    let detection = reference_detection(&report, &reference)?;
    let mut fig = overlay_figure(&report.channels, &reference, Some(&detection), PNG_MAX_POINTS);
    if all_visible {
        for series in &mut fig.series {
            if let Series::Line(line) = series {
                line.visible = true;
            }
        }
    }
    PngBackend::new(out).draw(&fig)
}

fn cmd_plot_channel(
    cfg: &ChannelConfig,
    files: &[PathBuf],
    channel: &str,
    out: &Path,
) -> Result<()> {
    let report = ingest(cfg, files)?;
    let channel = report
        .channels
        .get(channel)
        .ok_or_else(|| anyhow!("No {} found", channel))?;
    PngBackend::new(out).draw(&channel_figure(channel, PNG_MAX_POINTS))
}

struct PngBackend<'a> {
    path: &'a Path,
    size: (u32, u32),
}

impl<'a> PngBackend<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            size: (1000, 500),
        }
    }
}

impl PlotBackend for PngBackend<'_> {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        draw_plotters_figure(self.path, self.size, fig)
    }
}

fn to_rgb(color: binpeak_lib::plot::Color) -> RGBColor {
    let (r, g, b) = color.rgb();
    RGBColor(r, g, b)
}

fn draw_plotters_figure(path: &Path, size: (u32, u32), fig: &Figure) -> Result<()> {
    let backend = BitMapBackend::new(path, size);
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;
    let [x_min, mut x_max, y_min, mut y_max] = fig.visible_bounds().unwrap_or([0.0, 1.0, 0.0, 1.0]);
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }
    if y_max <= y_min {
        y_max = y_min + 1.0;
    }
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    chart
        .configure_mesh()
        .x_desc(fig.x.label.clone().unwrap_or_default())
        .y_desc(fig.y.label.clone().unwrap_or_default())
        .draw()?;
    for series in fig.series.iter().filter(|s| s.is_visible()) {
        match series {
            Series::Line(line) => {
                let color = to_rgb(line.style.color);
                let style = color.stroke_width(line.style.width.round().max(1.0) as u32);
                let points = line.points.iter().map(|p| (p[0], p[1]));
                match line.style.dash {
                    Some([dash, gap]) => {
                        chart
                            .draw_series(DashedLineSeries::new(
                                points,
                                dash.round() as u32,
                                gap.round() as u32,
                                style,
                            ))?
                            .label(line.name.clone())
                            .legend(move |(x, y)| {
                                PathElement::new(vec![(x, y), (x + 20, y)], color)
                            });
                    }
                    None => {
                        chart
                            .draw_series(LineSeries::new(points, style))?
                            .label(line.name.clone())
                            .legend(move |(x, y)| {
                                PathElement::new(vec![(x, y), (x + 20, y)], color)
                            });
                    }
                }
            }
            Series::Markers(markers) => {
                let color = to_rgb(markers.color);
                let size = markers.size.round() as i32;
                let points = markers.points.iter().map(|p| (p[0], p[1]));
                let anno = match markers.shape {
                    MarkerShape::TriangleUp => chart.draw_series(
                        points.map(|p| TriangleMarker::new(p, size, color.filled())),
                    )?,
                    MarkerShape::TriangleDown => chart.draw_series(points.map(|p| {
                        EmptyElement::at(p)
                            + Polygon::new(
                                vec![(-size, -size), (size, -size), (0, size)],
                                color.filled(),
                            )
                    }))?,
                    MarkerShape::Circle => chart
                        .draw_series(points.map(|p| Circle::new(p, size, color.filled())))?,
                };
                anno.label(markers.name.clone())
                    .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
            }
        }
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}
