//! Command-line interface for the headless `kitti-audit` binary.
//!
//! Provides commands for inter-class anomaly detection, per-sequence class
//! counts and per-class intensity curves.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::analysis::sequence::SequenceAnalyzer;
use crate::analysis::stats::{ClassCounts, IntensityCurves, INTENSITY_CURVE_BINS};
use crate::color::ClassColors;
use crate::config::{AnalysisConfig, DatasetConfig, Split};
use crate::data::classes::{class_pairs, valid_classes};
use crate::data::loader::{list_files, read_labels, FrameLoad, SequencePaths, LABEL_EXTENSION};
use crate::export::report::SequenceReport;
use crate::export::{overview, render, score_table};

#[derive(Parser, Debug)]
#[command(name = "kitti-audit")]
#[command(about = "Find semantic class pairs that look alike in labelled LiDAR sequences")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score every valid class pair per frame and collect anomaly evidence
    #[command(alias = "anomaly")]
    Anomalies(AnomaliesArgs),

    /// Count points per class for every sequence into one CSV table
    Counts(CountsArgs),

    /// Plot per-class remission histograms for every sequence
    Intensity(IntensityArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DatasetArgs {
    /// Dataset root containing `sequences/NN/{velodyne,labels}`
    #[arg(short, long)]
    pub dataset: PathBuf,

    /// Dataset config file (class names, colours, splits)
    #[arg(short, long, default_value = "config/semantic-kitti.yaml")]
    pub config: PathBuf,

    /// Which split's sequences to process
    #[arg(long, value_enum, default_value_t = Split::Train)]
    pub split: Split,
}

#[derive(Args, Debug)]
pub struct AnomaliesArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// YAML file overriding analysis parameters (threshold, bands, weights, ...)
    #[arg(short, long)]
    pub params: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "anomaly_results")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct CountsArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Output CSV file
    #[arg(short, long, default_value = "scenes_overview.csv")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct IntensityArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Output directory, one PNG per sequence
    #[arg(short, long, default_value = "intensity_curves")]
    pub output: PathBuf,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

pub fn run_with_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Anomalies(args) => run_anomalies(&args),
        Commands::Counts(args) => run_counts(&args),
        Commands::Intensity(args) => run_intensity(&args),
    }
}

fn load_dataset_config(path: &Path) -> Result<DatasetConfig> {
    log::info!("Opening config file {}", path.display());
    let cfg = DatasetConfig::load(path)?;
    Ok(cfg)
}

/// Locate a sequence, logging and returning `None` when its data is missing.
fn locate(dataset: &Path, sequence: &str) -> Option<SequencePaths> {
    match SequencePaths::locate(dataset, sequence) {
        Ok(paths) => Some(paths),
        Err(e) => {
            log::warn!("Skipping sequence {sequence} - {e}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// anomalies
// ---------------------------------------------------------------------------

pub fn run_anomalies(args: &AnomaliesArgs) -> Result<()> {
    let dataset_cfg = load_dataset_config(&args.dataset.config)?;
    let params = match &args.params {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };

    let valid = valid_classes(&dataset_cfg.labels, &params.excluded_classes);
    let pairs = class_pairs(&valid);
    let colors = ClassColors::new(&dataset_cfg.labels, &dataset_cfg.color_map);
    log::info!(
        "{} valid classes, {} class pairs, threshold {}",
        valid.len(),
        pairs.len(),
        params.anomaly_threshold
    );

    let analyzer = SequenceAnalyzer::new(params, pairs)?;
    let sequences = dataset_cfg.sequences(args.dataset.split);

    for seq in &sequences {
        log::info!("Analyzing sequence {seq}");
        let Some(paths) = locate(&args.dataset.dataset, seq) else {
            continue;
        };
        let results = match analyzer.analyze_sequence(&paths) {
            Ok(results) => results,
            Err(e) => {
                log::warn!("Skipping sequence {seq} - {e}");
                continue;
            }
        };

        let report = SequenceReport::build(
            seq,
            results,
            &dataset_cfg.labels,
            colors.to_map(),
            analyzer.config(),
        );
        write_sequence_outputs(&args.output, &report)?;

        log::info!(
            "Finished sequence {seq}: {}/{} frames analyzed, {} pairs flagged",
            report.frames_analyzed,
            report.frames_seen,
            report.flagged_pairs().count()
        );
    }
    Ok(())
}

/// Everything written for one analyzed sequence, under `<output>/sequence_NN/`.
pub fn write_sequence_outputs(output: &Path, report: &SequenceReport) -> Result<PathBuf> {
    let dir = output.join(format!("sequence_{}", report.sequence));
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    report.save(&dir.join("report.json"))?;
    overview::write_pair_summary(&dir.join("pair_summary.csv"), report)?;
    score_table::write_scores(&dir.join("scores.parquet"), report)?;
    let plots = render::write_pair_plots(&dir, report)?;
    log::debug!("Wrote {} plots to {}", plots.len(), dir.display());
    Ok(dir)
}

// ---------------------------------------------------------------------------
// counts
// ---------------------------------------------------------------------------

pub fn run_counts(args: &CountsArgs) -> Result<()> {
    let dataset_cfg = load_dataset_config(&args.dataset.config)?;
    let sequences = dataset_cfg.sequences(args.dataset.split);
    log::info!("Analyzing sequences {sequences:?}");

    let mut rows = Vec::new();
    for seq in &sequences {
        log::info!("Parsing sequence {seq}");
        let Some(paths) = locate(&args.dataset.dataset, seq) else {
            continue;
        };
        let label_files = match list_files(&paths.label_dir, LABEL_EXTENSION) {
            Ok(files) => files,
            Err(e) => {
                log::warn!("Skipping sequence {seq} - {e}");
                continue;
            }
        };

        let mut counts = ClassCounts::new(dataset_cfg.labels.keys());
        for file in &label_files {
            match read_labels(file) {
                Ok(labels) => counts.add_labels(&labels),
                Err(e) => log::warn!("Error processing frame {}: {e}", file.display()),
            }
        }
        for (label, n) in &counts.unknown {
            log::warn!("Sequence {seq}: unknown label {label}, nr: {n}");
        }
        log::info!("Sequence {seq} total {}", counts.total);
        rows.push((seq.clone(), counts));
    }

    overview::write_scenes_overview(&args.output, &dataset_cfg.labels, &rows)?;
    log::info!("Saved {}", args.output.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// intensity
// ---------------------------------------------------------------------------

pub fn run_intensity(args: &IntensityArgs) -> Result<()> {
    let dataset_cfg = load_dataset_config(&args.dataset.config)?;
    let colors = ClassColors::new(&dataset_cfg.labels, &dataset_cfg.color_map);
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    for seq in &dataset_cfg.sequences(args.dataset.split) {
        log::info!("Processing sequence {seq}");
        let Some(paths) = locate(&args.dataset.dataset, seq) else {
            continue;
        };
        let frames = match paths.frames() {
            Ok(frames) => frames,
            Err(e) => {
                log::warn!("Skipping sequence {seq} - {e}");
                continue;
            }
        };

        let mut curves = IntensityCurves::new(dataset_cfg.labels.keys(), INTENSITY_CURVE_BINS);
        for (id, load) in frames {
            match load {
                FrameLoad::Loaded(frame) => curves.add_frame(&frame),
                FrameLoad::Skipped(reason) => log::warn!("Error processing frame {id}: {reason}"),
            }
        }

        let path = args.output.join(format!("{seq}.png"));
        render::write_intensity_curves(&path, &curves, &dataset_cfg.labels, &colors)?;
        log::info!("Saved plot: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_anomalies_defaults() {
        let cli = Cli::try_parse_from(["kitti-audit", "anomalies", "--dataset", "/data/kitti"]).unwrap();
        assert_eq!(cli.log_level, "info");
        match cli.command {
            Commands::Anomalies(args) => {
                assert_eq!(args.dataset.dataset, PathBuf::from("/data/kitti"));
                assert_eq!(args.dataset.config, PathBuf::from("config/semantic-kitti.yaml"));
                assert_eq!(args.dataset.split, Split::Train);
                assert_eq!(args.output, PathBuf::from("anomaly_results"));
                assert!(args.params.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_counts_with_split() {
        let cli = Cli::try_parse_from([
            "kitti-audit",
            "--log-level",
            "debug",
            "counts",
            "-d",
            "d",
            "--split",
            "valid",
            "-o",
            "out.csv",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Commands::Counts(ref a) if a.dataset.split == Split::Valid));
    }

    #[test]
    fn test_dataset_is_required() {
        assert!(Cli::try_parse_from(["kitti-audit", "intensity"]).is_err());
    }
}
