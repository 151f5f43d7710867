//! The correlation engine facade
//!
//! [`CorrelationEngine`] owns the configuration, the worker pools and the
//! score and fingerprint caches for one engine instance. Every batch
//! operation takes an immutable note snapshot and a [`CancellationToken`];
//! a cancelled batch returns [`KinshipError::Cancelled`] and nothing else.

use std::sync::Arc;
use std::time::Instant;

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;

use crate::cancel::CancellationToken;
use crate::config::{check_unit_interval, EngineConfig};
use crate::duplicates::{group_duplicates, DuplicateGroup};
use crate::error::{KinshipError, Result};
use crate::graph::{self, ClusterLabels, RelatedNote, RelationshipGraph, TopicCluster};
use crate::logging::ResourceMetrics;
use crate::note::NoteRecord;
use crate::similarity::{
    candidate_pairs, evaluate_pairs, fingerprint_note, prepare, ImageHasher, PairContext,
    PairPlan, PairwiseEvaluator, PreparedNote, ScoreCache, SimilarityScore,
};
use crate::store::{validate_unique_ids, ImageResolver};
use crate::{bail_if_cancelled, log_resource_metrics, trace_time};

/// Per-call threshold overrides; `None` falls back to the engine config
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Thresholds {
    pub edge: Option<f64>,
    pub dup: Option<f64>,
}

/// Counters describing one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisStats {
    pub notes: usize,
    pub prefiltered: bool,
    /// Pairs considered for evaluation (all pairs, or pre-filter candidates)
    pub candidate_pairs: usize,
    /// Pairs at or above the lower of the two thresholds
    pub scored_pairs: usize,
    pub edges: usize,
    pub duplicate_groups: usize,
    pub clusters: usize,
    pub score_cache_hits: u64,
    pub images_fingerprinted: usize,
    pub images_failed: u64,
}

/// Graph, duplicates and clusters derived from one shared pairwise pass
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub graph: RelationshipGraph,
    pub duplicates: Vec<DuplicateGroup>,
    pub clusters: Vec<TopicCluster>,
    pub stats: AnalysisStats,
}

struct PassOutput {
    scores: Vec<SimilarityScore>,
    prefiltered: bool,
    candidate_pairs: usize,
    images_fingerprinted: usize,
}

#[derive(Debug)]
pub struct CorrelationEngine {
    config: EngineConfig,
    evaluator: PairwiseEvaluator,
    hasher: ImageHasher,
    scores: ScoreCache,
    metrics: ResourceMetrics,
    eval_pool: ThreadPool,
    decode_pool: ThreadPool,
}

impl CorrelationEngine {
    /// Validate `config` and set up worker pools and caches
    pub fn new(config: EngineConfig, resolver: Arc<dyn ImageResolver>) -> Result<Self> {
        config.validate()?;

        let eval_pool = ThreadPoolBuilder::new()
            .num_threads(config.parallelism.threads)
            .thread_name(|i| format!("kinship-eval-{}", i))
            .build()
            .map_err(|e| KinshipError::Other(format!("failed to build worker pool: {}", e)))?;
        let decode_pool = ThreadPoolBuilder::new()
            .num_threads(config.image.max_concurrent_decodes)
            .thread_name(|i| format!("kinship-image-{}", i))
            .build()
            .map_err(|e| KinshipError::Other(format!("failed to build image pool: {}", e)))?;

        tracing::debug!(
            threads = eval_pool.current_num_threads(),
            decoders = decode_pool.current_num_threads(),
            prefilter = %config.prefilter.mode,
            "correlation engine ready"
        );

        Ok(CorrelationEngine {
            evaluator: PairwiseEvaluator::new(&config),
            hasher: ImageHasher::new(&config.image, resolver),
            scores: ScoreCache::new(),
            metrics: ResourceMetrics::new(),
            eval_pool,
            decode_pool,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &ResourceMetrics {
        &self.metrics
    }

    /// Drop cached scores and fingerprints and zero the metrics
    pub fn clear_caches(&self) {
        self.scores.clear();
        self.hasher.cache().clear();
        self.metrics.reset();
    }

    /// Score a single pair of notes
    pub fn evaluate(&self, a: &NoteRecord, b: &NoteRecord) -> Result<SimilarityScore> {
        if a.id == b.id {
            return Err(KinshipError::invalid_argument(
                "note pair",
                format!("both sides are {}", a.id),
            ));
        }
        let pa = PreparedNote::new(a, fingerprint_note(a, &self.hasher, &self.metrics));
        let pb = PreparedNote::new(b, fingerprint_note(b, &self.hasher, &self.metrics));
        let (score, hit) = self.evaluator.evaluate_cached(&pa, &pb, &self.scores);
        if hit {
            self.metrics.record_score_hit();
        } else {
            self.metrics.record_score_miss();
        }
        Ok(score)
    }

    /// Group near-duplicate notes at `dup_threshold` (config default if `None`)
    #[tracing::instrument(skip(self, notes, cancel), fields(notes = notes.len()))]
    pub fn find_duplicates(
        &self,
        notes: &[NoteRecord],
        dup_threshold: Option<f64>,
        cancel: &CancellationToken,
    ) -> Result<Vec<DuplicateGroup>> {
        let threshold =
            self.resolve_threshold("dup_threshold", dup_threshold, self.config.dup_threshold)?;
        let pass = self.score_pairs(notes, threshold, cancel, "duplicate scan")?;
        let groups = group_duplicates(notes, &pass.scores, threshold);
        log_resource_metrics!(self.metrics, "find_duplicates");
        Ok(groups)
    }

    /// Build the relationship graph at `edge_threshold` (config default if `None`)
    #[tracing::instrument(skip(self, notes, cancel), fields(notes = notes.len()))]
    pub fn build_graph(
        &self,
        notes: &[NoteRecord],
        edge_threshold: Option<f64>,
        cancel: &CancellationToken,
    ) -> Result<RelationshipGraph> {
        let threshold =
            self.resolve_threshold("edge_threshold", edge_threshold, self.config.edge_threshold)?;
        let pass = self.score_pairs(notes, threshold, cancel, "graph build")?;
        let graph = graph::build_from_scores(notes, &pass.scores, threshold)?;
        log_resource_metrics!(self.metrics, "build_graph");
        Ok(graph)
    }

    /// Partition `graph` into labelled topic clusters
    pub fn extract_clusters(&self, graph: &RelationshipGraph) -> Vec<TopicCluster> {
        graph::extract_clusters(graph, self.cluster_labels())
    }

    /// Top-`k` neighbours of `note_id` (config default `k` if `None`)
    pub fn find_related(
        &self,
        graph: &RelationshipGraph,
        note_id: &str,
        k: Option<usize>,
    ) -> Result<Vec<RelatedNote>> {
        graph::find_related(graph, note_id, k.unwrap_or(self.config.related_k))
    }

    /// Build the graph, duplicate groups and clusters from one pairwise pass
    #[tracing::instrument(skip(self, notes, thresholds, cancel), fields(notes = notes.len()))]
    pub fn analyze(
        &self,
        notes: &[NoteRecord],
        thresholds: Thresholds,
        cancel: &CancellationToken,
    ) -> Result<Analysis> {
        let edge =
            self.resolve_threshold("edge_threshold", thresholds.edge, self.config.edge_threshold)?;
        let dup =
            self.resolve_threshold("dup_threshold", thresholds.dup, self.config.dup_threshold)?;

        let hits_before = self.metrics.score_hits();
        let failures_before = self.metrics.image_failures();

        let pass = self.score_pairs(notes, edge.min(dup), cancel, "analysis")?;
        let graph = graph::build_from_scores(notes, &pass.scores, edge)?;
        let duplicates = group_duplicates(notes, &pass.scores, dup);
        let clusters = self.extract_clusters(&graph);

        let stats = AnalysisStats {
            notes: notes.len(),
            prefiltered: pass.prefiltered,
            candidate_pairs: pass.candidate_pairs,
            scored_pairs: pass.scores.len(),
            edges: graph.edge_count(),
            duplicate_groups: duplicates.len(),
            clusters: clusters.len(),
            score_cache_hits: self.metrics.score_hits().saturating_sub(hits_before),
            images_fingerprinted: pass.images_fingerprinted,
            images_failed: self.metrics.image_failures().saturating_sub(failures_before),
        };
        tracing::info!(
            notes = stats.notes,
            edges = stats.edges,
            duplicate_groups = stats.duplicate_groups,
            clusters = stats.clusters,
            "analysis complete"
        );
        log_resource_metrics!(self.metrics, "analyze");

        Ok(Analysis {
            graph,
            duplicates,
            clusters,
            stats,
        })
    }

    fn cluster_labels(&self) -> ClusterLabels {
        ClusterLabels {
            tags: self.config.labels_per_cluster,
            keywords: self.config.keywords_per_cluster,
        }
    }

    fn resolve_threshold(&self, context: &str, value: Option<f64>, default: f64) -> Result<f64> {
        let threshold = value.unwrap_or(default);
        check_unit_interval(context, threshold)?;
        Ok(threshold)
    }

    /// The single pairwise pass shared by every batch operation
    fn score_pairs(
        &self,
        notes: &[NoteRecord],
        min_score: f64,
        cancel: &CancellationToken,
        operation: &str,
    ) -> Result<PassOutput> {
        bail_if_cancelled!(cancel, operation);
        validate_unique_ids(notes)?;

        let start = Instant::now();
        let prepared = prepare(notes, &self.hasher, &self.decode_pool, &self.metrics, cancel)
            .map_err(|e| relabel_cancel(e, operation))?;
        let images_fingerprinted = prepared.iter().filter(|p| p.fingerprint.is_some()).count();

        let prefiltered = self.config.prefilter.applies_to(notes.len());
        let candidates = if prefiltered {
            candidate_pairs(&prepared, &self.config.prefilter, self.config.text.stemming)
        } else {
            Vec::new()
        };
        let plan = if prefiltered {
            PairPlan::Candidates(&candidates)
        } else {
            PairPlan::All
        };
        let candidate_pairs = plan.pair_count(notes.len());

        let ctx = PairContext {
            evaluator: &self.evaluator,
            cache: &self.scores,
            metrics: &self.metrics,
            cancel,
        };
        let scores = evaluate_pairs(&prepared, plan, min_score, &ctx, &self.eval_pool)
            .map_err(|e| relabel_cancel(e, operation))?;

        trace_time!(
            start,
            "score_pairs",
            candidates = candidate_pairs,
            kept = scores.len()
        );
        Ok(PassOutput {
            scores,
            prefiltered,
            candidate_pairs,
            images_fingerprinted,
        })
    }
}

/// Report cancellation under the caller-facing operation name
fn relabel_cancel(err: KinshipError, operation: &str) -> KinshipError {
    if err.is_cancelled() {
        tracing::info!(operation, "cancelled");
        KinshipError::cancelled(operation)
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrefilterMode;
    use crate::store::NoImages;

    fn engine() -> CorrelationEngine {
        CorrelationEngine::new(EngineConfig::default(), Arc::new(NoImages)).unwrap()
    }

    fn scenario_notes() -> Vec<NoteRecord> {
        vec![
            NoteRecord::new("A", "hello world"),
            NoteRecord::new("B", "hello world!"),
            NoteRecord::new("C", "goodbye"),
        ]
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = EngineConfig {
            edge_threshold: -0.1,
            ..Default::default()
        };
        let err = CorrelationEngine::new(config, Arc::new(NoImages)).unwrap_err();
        assert!(matches!(err, KinshipError::InvalidArgument { .. }));
    }

    #[test]
    fn test_per_call_threshold_validated() {
        let engine = engine();
        let err = engine
            .find_duplicates(&scenario_notes(), Some(1.2), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, KinshipError::InvalidArgument { .. }));
    }

    #[test]
    fn test_evaluate_rejects_same_note() {
        let engine = engine();
        let note = NoteRecord::new("A", "x");
        assert!(engine.evaluate(&note, &note).is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let engine = engine();
        let notes = vec![NoteRecord::new("A", "x"), NoteRecord::new("A", "y")];
        let err = engine
            .build_graph(&notes, None, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, KinshipError::InvalidSnapshot { .. }));
    }

    #[test]
    fn test_cancelled_token_yields_no_graph() {
        let engine = engine();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = engine
            .build_graph(&scenario_notes(), None, &cancel)
            .unwrap_err();
        assert!(matches!(
            err,
            KinshipError::Cancelled { ref operation } if operation == "graph build"
        ));
    }

    #[test]
    fn test_analyze_matches_separate_calls() {
        let engine = engine();
        let notes = scenario_notes();
        let cancel = CancellationToken::new();
        let thresholds = Thresholds {
            edge: Some(0.3),
            dup: Some(0.8),
        };

        let analysis = engine.analyze(&notes, thresholds, &cancel).unwrap();
        let graph = engine.build_graph(&notes, Some(0.3), &cancel).unwrap();
        let duplicates = engine.find_duplicates(&notes, Some(0.8), &cancel).unwrap();

        assert_eq!(analysis.graph.edges, graph.edges);
        assert_eq!(analysis.duplicates, duplicates);
        assert_eq!(analysis.stats.notes, 3);
        assert_eq!(analysis.stats.candidate_pairs, 3);
        assert!(!analysis.stats.prefiltered);
        assert_eq!(analysis.stats.duplicate_groups, 1);
    }

    #[test]
    fn test_second_pass_hits_score_cache() {
        let engine = engine();
        let notes = scenario_notes();
        let cancel = CancellationToken::new();

        engine.build_graph(&notes, None, &cancel).unwrap();
        assert_eq!(engine.metrics().score_misses(), 3);
        engine.build_graph(&notes, None, &cancel).unwrap();
        assert_eq!(engine.metrics().score_hits(), 3);

        engine.clear_caches();
        assert_eq!(engine.metrics().score_hits(), 0);
    }

    #[test]
    fn test_prefilter_always_keeps_near_duplicates() {
        let mut config = EngineConfig::default();
        config.prefilter.mode = PrefilterMode::Always;
        config.prefilter.max_token_df = 1.0;
        let engine = CorrelationEngine::new(config, Arc::new(NoImages)).unwrap();

        let groups = engine
            .find_duplicates(&scenario_notes(), Some(0.8), &CancellationToken::new())
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].note_ids, vec!["A", "B"]);
    }

    #[test]
    fn test_auto_prefilter_groups_large_copy_set() {
        let mut notes: Vec<NoteRecord> = (0..1800)
            .map(|i| {
                NoteRecord::new(
                    format!("unique-{i:04}"),
                    format!("entry {i} covers subject{i}"),
                )
            })
            .collect();
        notes.extend((0..250).map(|i| {
            NoteRecord::new(format!("copy-{i:03}"), "weekly meeting notes agenda")
        }));
        let engine = engine();
        assert_eq!(engine.config().prefilter.mode, PrefilterMode::Auto);

        let cancel = CancellationToken::new();
        let groups = engine.find_duplicates(&notes, None, &cancel).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].note_ids.len(), 250);
        assert!(groups[0].note_ids.iter().all(|id| id.starts_with("copy-")));

        let analysis = engine.analyze(&notes, Thresholds::default(), &cancel).unwrap();
        assert!(analysis.stats.prefiltered);
        assert_eq!(analysis.stats.duplicate_groups, 1);
        assert!(analysis.stats.candidate_pairs < 10_000);
    }

    #[test]
    fn test_find_related_uses_default_k() {
        let engine = engine();
        let graph = engine
            .build_graph(&scenario_notes(), Some(0.0), &CancellationToken::new())
            .unwrap();
        let related = engine.find_related(&graph, "A", None).unwrap();
        assert_eq!(related.len(), 2);
        assert_eq!(related[0].id, "B");
    }
}
