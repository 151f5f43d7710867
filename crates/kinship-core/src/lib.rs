//! Kinship Core Library
//!
//! Note similarity and correlation engine: pairwise scoring over text,
//! images and tags, near-duplicate grouping, a weighted relationship graph,
//! topic clusters and related-note ranking.

pub mod cancel;
pub mod config;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod graph;
pub mod logging;
pub mod note;
pub mod similarity;
pub mod store;
pub mod text;

pub use cancel::CancellationToken;
pub use config::EngineConfig;
pub use duplicates::DuplicateGroup;
pub use engine::{Analysis, AnalysisStats, CorrelationEngine, Thresholds};
pub use error::{KinshipError, Result};
pub use graph::{RelatedNote, RelationshipGraph, TopicCluster};
pub use note::NoteRecord;
pub use similarity::{PerceptualFingerprint, ScoreBreakdown, SimilarityScore};
