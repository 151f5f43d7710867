//! Configuration type definitions

use serde::{Deserialize, Serialize};

/// Current configuration format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Engine configuration
///
/// Every recognised option is enumerated here with its default. Values are
/// checked by [`EngineConfig::validate`] before any computation starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Configuration format version for compatibility checking
    #[serde(default = "default_version")]
    pub version: u32,

    /// Minimum score for an edge in the relationship graph, in [0, 1]
    #[serde(default = "default_edge_threshold")]
    pub edge_threshold: f64,

    /// Minimum score for two notes to be grouped as near-duplicates, in [0, 1]
    #[serde(default = "default_dup_threshold")]
    pub dup_threshold: f64,

    /// Default number of related notes returned per query
    #[serde(default = "default_related_k")]
    pub related_k: usize,

    /// Number of representative tags attached to each topic cluster
    #[serde(default = "default_labels_per_cluster")]
    pub labels_per_cluster: usize,

    /// Number of text keywords attached to each topic cluster
    #[serde(default = "default_keywords_per_cluster")]
    pub keywords_per_cluster: usize,

    /// Per-signal weights for the pairwise evaluator
    #[serde(default)]
    pub weights: SignalWeights,

    /// Text scorer options
    #[serde(default)]
    pub text: TextConfig,

    /// Image fingerprinting options
    #[serde(default)]
    pub image: ImageConfig,

    /// Candidate pre-filter options
    #[serde(default)]
    pub prefilter: PrefilterConfig,

    /// Worker pool options
    #[serde(default)]
    pub parallelism: ParallelismConfig,
}

/// Weights of the three signals combined by the pairwise evaluator.
///
/// They do not need to sum to 1; the evaluator renormalises over the
/// signals that are available for a given pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    #[serde(default = "default_text_weight")]
    pub text: f64,

    #[serde(default = "default_image_weight")]
    pub image: f64,

    #[serde(default = "default_tag_weight")]
    pub tag: f64,
}

/// Options for the text similarity scorer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextConfig {
    /// Weight of normalised edit-distance similarity
    #[serde(default = "default_edit_weight")]
    pub edit_weight: f64,

    /// Weight of term-frequency cosine similarity
    #[serde(default = "default_cosine_weight")]
    pub cosine_weight: f64,

    /// Apply Porter stemming before building term vectors
    #[serde(default)]
    pub stemming: bool,
}

/// Options for perceptual image hashing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Per-image decode timeout in milliseconds
    #[serde(default = "default_image_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of images decoded at the same time
    #[serde(default = "default_max_concurrent_decodes")]
    pub max_concurrent_decodes: usize,

    /// Images larger than this are rejected without decoding
    #[serde(default = "default_max_image_bytes")]
    pub max_bytes: u64,
}

/// When the candidate pre-filter runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefilterMode {
    /// Only for corpora of at least `auto_min_notes` notes
    #[default]
    Auto,
    /// Always restrict evaluation to candidate pairs
    Always,
    /// Always evaluate every unordered pair
    Never,
}

impl std::fmt::Display for PrefilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrefilterMode::Auto => write!(f, "auto"),
            PrefilterMode::Always => write!(f, "always"),
            PrefilterMode::Never => write!(f, "never"),
        }
    }
}

/// Options for the bucketing pre-filter applied before pairwise evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrefilterConfig {
    #[serde(default)]
    pub mode: PrefilterMode,

    /// Corpus size at which `auto` mode switches the pre-filter on
    #[serde(default = "default_auto_min_notes")]
    pub auto_min_notes: usize,

    /// Tokens present in more than this fraction of notes do not form buckets
    #[serde(default = "default_max_token_df")]
    pub max_token_df: f64,

    /// Minimum shorter/longer text length ratio for token-bucket candidates
    #[serde(default = "default_length_ratio")]
    pub length_ratio: f64,
}

/// Worker pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ParallelismConfig {
    /// Worker threads for pairwise evaluation (0 = one per core)
    #[serde(default)]
    pub threads: usize,
}

fn default_version() -> u32 {
    CONFIG_FORMAT_VERSION
}

fn default_edge_threshold() -> f64 {
    0.3
}

fn default_dup_threshold() -> f64 {
    0.85
}

fn default_related_k() -> usize {
    5
}

fn default_labels_per_cluster() -> usize {
    3
}

fn default_keywords_per_cluster() -> usize {
    5
}

fn default_text_weight() -> f64 {
    0.5
}

fn default_image_weight() -> f64 {
    0.3
}

fn default_tag_weight() -> f64 {
    0.2
}

fn default_edit_weight() -> f64 {
    0.4
}

fn default_cosine_weight() -> f64 {
    0.6
}

fn default_image_timeout_ms() -> u64 {
    2000
}

fn default_max_concurrent_decodes() -> usize {
    4
}

fn default_max_image_bytes() -> u64 {
    20 * 1024 * 1024
}

fn default_auto_min_notes() -> usize {
    2000
}

fn default_max_token_df() -> f64 {
    0.1
}

fn default_length_ratio() -> f64 {
    0.3
}

impl Default for SignalWeights {
    fn default() -> Self {
        SignalWeights {
            text: default_text_weight(),
            image: default_image_weight(),
            tag: default_tag_weight(),
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        TextConfig {
            edit_weight: default_edit_weight(),
            cosine_weight: default_cosine_weight(),
            stemming: false,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        ImageConfig {
            timeout_ms: default_image_timeout_ms(),
            max_concurrent_decodes: default_max_concurrent_decodes(),
            max_bytes: default_max_image_bytes(),
        }
    }
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        PrefilterConfig {
            mode: PrefilterMode::default(),
            auto_min_notes: default_auto_min_notes(),
            max_token_df: default_max_token_df(),
            length_ratio: default_length_ratio(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            version: CONFIG_FORMAT_VERSION,
            edge_threshold: default_edge_threshold(),
            dup_threshold: default_dup_threshold(),
            related_k: default_related_k(),
            labels_per_cluster: default_labels_per_cluster(),
            keywords_per_cluster: default_keywords_per_cluster(),
            weights: SignalWeights::default(),
            text: TextConfig::default(),
            image: ImageConfig::default(),
            prefilter: PrefilterConfig::default(),
            parallelism: ParallelismConfig::default(),
        }
    }
}
