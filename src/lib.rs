//! Inter-class label anomaly detection for SemanticKITTI-style LiDAR sequences.
//!
//! Architecture:
//! ```text
//!  sequences/NN/velodyne/*.bin   sequences/NN/labels/*.label
//!        │                              │
//!        └──────────────┬───────────────┘
//!                       ▼
//!                ┌──────────────┐
//!                │ data::loader │  sorted file pairs → FrameLoad
//!                └──────────────┘
//!                       │
//!                       ▼
//!            ┌─────────────────────┐
//!            │ analysis::sequence  │  per pair: similarity score,
//!            │  (SequenceAnalyzer) │  bounded anomaly evidence
//!            └─────────────────────┘
//!                       │
//!                       ▼
//!                ┌──────────────┐
//!                │    export    │  report.json, csv, parquet, png
//!                └──────────────┘
//! ```

pub mod analysis;
pub mod cli;
pub mod color;
pub mod config;
pub mod data;
pub mod export;

pub use analysis::sequence::{SequenceAnalyzer, SequenceResults};
pub use analysis::similarity::SimilarityScorer;
pub use config::{AnalysisConfig, ConfigError, DatasetConfig};
pub use data::model::{ClassPair, Frame, SampleFrame};
