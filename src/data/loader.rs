use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use super::model::Frame;

/// Diagnostics attached to a skipped frame are cut to this many characters.
pub const MAX_DIAGNOSTIC_CHARS: usize = 100;

pub const SCAN_EXTENSION: &str = "bin";
pub const LABEL_EXTENSION: &str = "label";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a single record file could not be decoded.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("reading '{file}': {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{file}' has {bytes} bytes, not a multiple of the {record}-byte record size")]
    Malformed {
        file: String,
        bytes: usize,
        record: usize,
    },
}

/// A sequence whose data cannot be found. The sequence is skipped, the run goes on.
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("missing {kind} directory '{path}'")]
    MissingDirectory { kind: &'static str, path: String },

    #[error("listing '{path}': {source}")]
    Listing {
        path: String,
        #[source]
        source: walkdir::Error,
    },
}

// ---------------------------------------------------------------------------
// Per-frame outcome
// ---------------------------------------------------------------------------

/// Why a frame contributed nothing to the analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Point and label counts differ; the frame is never partially analyzed.
    LengthMismatch { points: usize, labels: usize },
    /// The file could not be read.
    Io { file: String, message: String },
    /// The file size does not match the record layout.
    Malformed { file: String, message: String },
}

impl SkipReason {
    /// Length mismatches are expected while labels are incomplete and are
    /// not reported as failures.
    pub fn is_failure(&self) -> bool {
        !matches!(self, SkipReason::LengthMismatch { .. })
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::LengthMismatch { points, labels } => {
                write!(f, "{points} points but {labels} labels")
            }
            SkipReason::Io { message, .. } | SkipReason::Malformed { message, .. } => {
                write!(f, "{message}")
            }
        }
    }
}

impl From<FrameError> for SkipReason {
    fn from(err: FrameError) -> Self {
        let message = truncate(&err.to_string(), MAX_DIAGNOSTIC_CHARS);
        match err {
            FrameError::Io { file, .. } => SkipReason::Io { file, message },
            FrameError::Malformed { file, .. } => SkipReason::Malformed { file, message },
        }
    }
}

/// Result of loading one scan/label file pair.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameLoad {
    Loaded(Frame),
    Skipped(SkipReason),
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

// ---------------------------------------------------------------------------
// Binary record readers
// ---------------------------------------------------------------------------

fn read_records(path: &Path, record: usize) -> Result<Vec<u8>, FrameError> {
    let bytes = std::fs::read(path).map_err(|source| FrameError::Io {
        file: path.display().to_string(),
        source,
    })?;
    if bytes.len() % record != 0 {
        return Err(FrameError::Malformed {
            file: path.display().to_string(),
            bytes: bytes.len(),
            record,
        });
    }
    Ok(bytes)
}

/// Read a `.bin` scan: little-endian `f32` quadruples `x, y, z, intensity`.
pub fn read_points(path: &Path) -> Result<Vec<[f32; 4]>, FrameError> {
    let bytes = read_records(path, 16)?;
    Ok(bytes
        .chunks_exact(16)
        .map(|rec| {
            let f = |i: usize| f32::from_le_bytes([rec[i], rec[i + 1], rec[i + 2], rec[i + 3]]);
            [f(0), f(4), f(8), f(12)]
        })
        .collect())
}

/// Read a `.label` file: little-endian `u32`, semantic class in the low 16 bits.
pub fn read_labels(path: &Path) -> Result<Vec<u32>, FrameError> {
    let bytes = read_records(path, 4)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|rec| u32::from_le_bytes([rec[0], rec[1], rec[2], rec[3]]) & 0xFFFF)
        .collect())
}

/// Load one frame. Never fails: problems come back as [`FrameLoad::Skipped`].
pub fn load_frame(scan_path: &Path, label_path: &Path) -> FrameLoad {
    let points = match read_points(scan_path) {
        Ok(p) => p,
        Err(e) => return FrameLoad::Skipped(e.into()),
    };
    let labels = match read_labels(label_path) {
        Ok(l) => l,
        Err(e) => return FrameLoad::Skipped(e.into()),
    };
    match Frame::new(points, labels) {
        Ok(frame) => FrameLoad::Loaded(frame),
        Err((points, labels)) => FrameLoad::Skipped(SkipReason::LengthMismatch { points, labels }),
    }
}

// ---------------------------------------------------------------------------
// Sequence discovery
// ---------------------------------------------------------------------------

/// Regular files directly inside `dir` with extension `ext`, sorted by path.
pub fn list_files(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, SequenceError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| SequenceError::Listing {
            path: dir.display().to_string(),
            source,
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some(ext)
        {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Scan and label directories of one sequence:
/// `<dataset>/sequences/<seq>/velodyne` and `<dataset>/sequences/<seq>/labels`.
#[derive(Debug, Clone)]
pub struct SequencePaths {
    pub sequence: String,
    pub scan_dir: PathBuf,
    pub label_dir: PathBuf,
}

impl SequencePaths {
    pub fn locate(dataset_root: &Path, sequence: &str) -> Result<Self, SequenceError> {
        let seq_dir = dataset_root.join("sequences").join(sequence);
        let scan_dir = seq_dir.join("velodyne");
        let label_dir = seq_dir.join("labels");
        for (kind, dir) in [("scan", &scan_dir), ("label", &label_dir)] {
            if !dir.is_dir() {
                return Err(SequenceError::MissingDirectory {
                    kind,
                    path: dir.display().to_string(),
                });
            }
        }
        Ok(SequencePaths {
            sequence: sequence.to_string(),
            scan_dir,
            label_dir,
        })
    }

    /// Scan/label file pairs matched by sorted order (not by file stem).
    /// Extra files on the longer side are ignored.
    pub fn frame_files(&self) -> Result<Vec<(PathBuf, PathBuf)>, SequenceError> {
        let scans = list_files(&self.scan_dir, SCAN_EXTENSION)?;
        let labels = list_files(&self.label_dir, LABEL_EXTENSION)?;
        if scans.len() != labels.len() {
            log::warn!(
                "Sequence {}: {} scans but {} label files, pairing the first {}",
                self.sequence,
                scans.len(),
                labels.len(),
                scans.len().min(labels.len())
            );
        }
        Ok(scans.into_iter().zip(labels).collect())
    }

    /// Lazily load every frame, yielding the scan file name as the frame id.
    pub fn frames(&self) -> Result<impl Iterator<Item = (String, FrameLoad)>, SequenceError> {
        let files = self.frame_files()?;
        Ok(files.into_iter().map(|(scan, label)| {
            let id = scan
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| scan.display().to_string());
            let load = load_frame(&scan, &label);
            (id, load)
        }))
    }
}
