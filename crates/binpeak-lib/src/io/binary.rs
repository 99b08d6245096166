use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::Path;

use crate::channels::ChannelSet;
use crate::config::ChannelConfig;
use crate::error::DecodeError;
use crate::signal::{Channel, SampleWidth, Samples};

/// Decode a raw little-endian buffer of unsigned integers.
pub fn decode_samples(bytes: &[u8], width: SampleWidth) -> Result<Samples, DecodeError> {
    if bytes.len() % width.bytes() != 0 {
        return Err(DecodeError::Misaligned {
            len: bytes.len(),
            width,
        });
    }
    let samples = match width {
        SampleWidth::U16 => Samples::U16(
            bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect(),
        ),
        SampleWidth::U32 => Samples::U32(
            bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
    };
    Ok(samples)
}

/// Lowercased text after the last `.`; the whole name when there is none.
pub fn file_extension(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_ascii_lowercase()
}

/// What happened to one uploaded file.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestNotice {
    Decoded {
        file: String,
        width: SampleWidth,
        samples: usize,
    },
    Unsupported {
        file: String,
        extension: String,
    },
    Failed {
        file: String,
        error: String,
    },
}

impl IngestNotice {
    pub fn file(&self) -> &str {
        match self {
            IngestNotice::Decoded { file, .. }
            | IngestNotice::Unsupported { file, .. }
            | IngestNotice::Failed { file, .. } => file,
        }
    }

    pub fn is_problem(&self) -> bool {
        !matches!(self, IngestNotice::Decoded { .. })
    }

    /// Status line shown for every upload before its outcome.
    pub fn processing(&self) -> String {
        format!("Processing: {}", self.file())
    }

    pub fn message(&self) -> String {
        match self {
            IngestNotice::Decoded { width, samples, .. } => {
                format!("Decoded {} x {}", samples, width)
            }
            IngestNotice::Unsupported { extension, .. } => {
                format!("Unsupported file type: {}", extension)
            }
            IngestNotice::Failed { file, error } => format!("Error reading {}: {}", file, error),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub channels: ChannelSet,
    pub notices: Vec<IngestNotice>,
}

impl IngestReport {
    pub fn uploaded(&self) -> usize {
        self.notices.len()
    }

    pub fn problems(&self) -> impl Iterator<Item = &IngestNotice> {
        self.notices.iter().filter(|n| n.is_problem())
    }
}

/// Decode a batch of named buffers. Files that are not `.bin` or fail to
/// decode are reported and skipped; the rest land in the channel set.
pub fn ingest_uploads<I, N, B>(uploads: I, cfg: &ChannelConfig) -> IngestReport
where
    I: IntoIterator<Item = (N, B)>,
    N: Into<String>,
    B: AsRef<[u8]>,
{
    let mut report = IngestReport::default();
    for (name, bytes) in uploads {
        let name = name.into();
        debug!("Processing: {}", name);
        let extension = file_extension(&name);
        if extension != "bin" {
            warn!("skipping {}: unsupported file type {}", name, extension);
            report.notices.push(IngestNotice::Unsupported {
                file: name,
                extension,
            });
            continue;
        }
        let width = cfg.width_for(&name);
        match decode_samples(bytes.as_ref(), width) {
            Ok(samples) => {
                debug!("decoded {} as {} ({} samples)", name, width, samples.len());
                report.notices.push(IngestNotice::Decoded {
                    file: name.clone(),
                    width,
                    samples: samples.len(),
                });
                report.channels.insert(Channel::new(name, samples));
            }
            Err(err) => {
                warn!("skipping {}: {}", name, err);
                report.notices.push(IngestNotice::Failed {
                    file: name,
                    error: err.to_string(),
                });
            }
        }
    }
    report
}

/// Read files from disk and ingest them under their file names.
pub fn read_bin_files<P: AsRef<Path>>(paths: &[P], cfg: &ChannelConfig) -> Result<IngestReport> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("no file name in {}", path.display()))?
            .to_string();
        let bytes =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        uploads.push((name, bytes));
    }
    Ok(ingest_uploads(uploads, cfg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_bytes(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn u32_bytes(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn decodes_little_endian_words() {
        let s = decode_samples(&[0x01, 0x02, 0xff, 0xff], SampleWidth::U16).expect("decode");
        assert_eq!(s, Samples::U16(vec![0x0201, 0xffff]));
        let s = decode_samples(&[0x01, 0x00, 0x00, 0x80], SampleWidth::U32).expect("decode");
        assert_eq!(s, Samples::U32(vec![0x8000_0001]));
    }

    #[test]
    fn empty_buffer_is_an_empty_sequence() {
        let s = decode_samples(&[], SampleWidth::U32).expect("decode");
        assert!(s.is_empty());
        assert_eq!(s.width(), SampleWidth::U32);
    }

    #[test]
    fn misaligned_buffer_is_rejected() {
        let err = decode_samples(&[1, 2, 3], SampleWidth::U16).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Misaligned {
                len: 3,
                width: SampleWidth::U16
            }
        );
        assert_eq!(
            err.to_string(),
            "buffer size 3 is not a multiple of element size 2 (u16)"
        );
        assert!(decode_samples(&[0; 6], SampleWidth::U32).is_err());
    }

    #[test]
    fn extension_is_case_insensitive() {
        assert_eq!(file_extension("a.BIN"), "bin");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("noext"), "noext");
    }

    #[test]
    fn ingest_dispatches_width_by_name() {
        let cfg = ChannelConfig::default();
        let report = ingest_uploads(
            vec![
                ("samples.bin", u32_bytes(&[70_000, 1])),
                ("bay_1_left_VL.bin", u16_bytes(&[1, 2, 3])),
            ],
            &cfg,
        );
        assert_eq!(report.channels.len(), 2);
        let samples = report.channels.get("samples.bin").expect("samples");
        assert_eq!(samples.samples, Samples::U32(vec![70_000, 1]));
        let bay = report.channels.get("bay_1_left_VL.bin").expect("bay");
        assert_eq!(bay.samples, Samples::U16(vec![1, 2, 3]));
        assert_eq!(report.problems().count(), 0);
    }

    #[test]
    fn ingest_reports_and_skips_bad_files() {
        let cfg = ChannelConfig::default();
        let report = ingest_uploads(
            vec![
                ("notes.txt", vec![0u8; 4]),
                ("odd.bin", vec![0u8; 3]),
                ("ok.Bin", u16_bytes(&[9])),
            ],
            &cfg,
        );
        assert_eq!(report.uploaded(), 3);
        assert_eq!(report.channels.names(), vec!["ok.Bin"]);
        let problems: Vec<_> = report.problems().collect();
        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0].message(), "Unsupported file type: txt");
        assert!(problems[1].message().starts_with("Error reading odd.bin:"));

        let lines: Vec<String> = report.notices.iter().map(IngestNotice::processing).collect();
        assert_eq!(
            lines,
            vec![
                "Processing: notes.txt",
                "Processing: odd.bin",
                "Processing: ok.Bin"
            ]
        );
        assert_eq!(report.notices[2].message(), "Decoded 1 x u16");
    }

    #[test]
    fn duplicate_names_keep_the_last_upload() {
        let report = ingest_uploads(
            vec![("a.bin", u16_bytes(&[1])), ("a.bin", u16_bytes(&[2, 3]))],
            &ChannelConfig::default(),
        );
        assert_eq!(report.channels.len(), 1);
        assert_eq!(
            report.channels.get("a.bin").map(|c| c.len()),
            Some(2)
        );
    }

    #[test]
    fn reads_files_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("samples.bin");
        std::fs::write(&path, u32_bytes(&[5, 6, 7])).expect("write");
        let report = read_bin_files(&[&path], &ChannelConfig::default()).expect("read");
        let ch = report.channels.get("samples.bin").expect("channel");
        assert_eq!(ch.samples, Samples::U32(vec![5, 6, 7]));

        let missing = dir.path().join("missing.bin");
        assert!(read_bin_files(&[missing], &ChannelConfig::default()).is_err());
    }
}
