// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Synchronization run
//!
//! One run goes through three phases:
//!
//! 1. **Analysis**: build the reference geometry index, then aggregate,
//!    match, classify and compare every host element. Produces exactly one
//!    [`VerdictRecord`] per host element, in host order.
//! 2. **Planning**: ask every registered recipe for the writes each verdict
//!    implies and validate them. Nothing is written yet.
//! 3. **Writing**: submit the validated writes through a parameter strategy
//!    inside one transaction group. Any failure rolls the whole group back,
//!    so the host document is either fully updated or untouched.
//!
//! Verdicts are final before the first write is submitted.

use crate::classify::{AttributeClassifier, ShapeDescriptor};
use crate::compare::DimensionComparator;
use crate::config::{InvalidValuePolicy, SyncConfig};
use crate::context::{CancellationToken, RunContext, RunStats};
use crate::error::{Error, Result};
use crate::recipe::{RecipeContext, WriteRecipe};
use crate::strategy::{recommend_for, ParameterOp, ParameterStrategy};
use crate::validate::{ParameterValidator, ValidationOptions};
use crate::verdict::{VerdictRecord, VerdictSummary};
use bimsync_core::{Document, ElementId, ElementRef, ElementSource, TransactionGroup};
use bimsync_geometry::{
    AggregateStats, GeometryIndex, GeometrySource, MatchEngine, MatchStats, SolidAggregator,
    SolidKernel,
};

/// The writable side of a run.
pub struct HostModel<'a, S> {
    pub document: &'a mut dyn Document,
    pub geometry: &'a dyn GeometrySource<S>,
    /// Host elements in processing order
    pub elements: &'a [ElementRef],
}

/// The read-only side of a run, usually a linked model.
pub struct ReferenceModel<'a, S> {
    pub document: &'a dyn ElementSource,
    pub geometry: &'a dyn GeometrySource<S>,
    /// Reference elements in index (tie-break) order
    pub elements: &'a [ElementRef],
}

/// How the write phase ended.
#[derive(Debug, Clone, PartialEq)]
pub enum WritePhase {
    /// All writes committed; `applied` counts writes that changed a value.
    Committed { applied: usize },
    /// Nothing was written; the host document is unchanged.
    RolledBack { error: Error },
    /// Cancelled before commit; the host document is unchanged.
    Cancelled,
    /// No recipe planned any write.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    /// One verdict per analysed host element, in host order
    pub verdicts: Vec<VerdictRecord>,
    pub write_phase: WritePhase,
    pub warnings: Vec<String>,
    pub stats: RunStats,
}

impl SyncReport {
    pub fn summary(&self) -> VerdictSummary {
        VerdictSummary::from_verdicts(&self.verdicts)
    }

    pub fn is_committed(&self) -> bool {
        matches!(self.write_phase, WritePhase::Committed { .. })
    }

    pub fn applied_writes(&self) -> usize {
        match self.write_phase {
            WritePhase::Committed { applied } => applied,
            _ => 0,
        }
    }

    pub fn verdict(&self, host_id: ElementId) -> Option<&VerdictRecord> {
        self.verdicts.iter().find(|v| v.host_id == host_id)
    }
}

/// Drives match, compare and write for one host/reference pair of models.
pub struct SyncOrchestrator<'k, K: SolidKernel + ?Sized> {
    kernel: &'k K,
    config: SyncConfig,
    classifier: AttributeClassifier,
    comparator: DimensionComparator,
    validator: ParameterValidator,
    recipes: Vec<Box<dyn WriteRecipe + 'k>>,
    strategy: Option<Box<dyn ParameterStrategy + 'k>>,
    token: CancellationToken,
    broad_phase: bool,
}

impl<'k, K: SolidKernel + ?Sized> SyncOrchestrator<'k, K> {
    pub fn new(kernel: &'k K, config: SyncConfig) -> Result<Self> {
        config.validate()?;
        let options = ValidationOptions::default()
            .with_units(config.host_length_unit, config.angle_unit)
            .with_max_text_length(config.max_text_length);
        Ok(Self {
            kernel,
            classifier: AttributeClassifier::new(config.classifier.clone()),
            comparator: DimensionComparator::new(config.canonical_unit, config.tolerance),
            validator: ParameterValidator::new(options),
            recipes: Vec::new(),
            strategy: None,
            token: CancellationToken::new(),
            broad_phase: true,
            config,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn with_recipe(mut self, recipe: impl WriteRecipe + 'k) -> Self {
        self.recipes.push(Box::new(recipe));
        self
    }

    /// Use this strategy instance instead of one chosen from the config.
    pub fn with_strategy(mut self, strategy: Box<dyn ParameterStrategy + 'k>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_classifier(mut self, classifier: AttributeClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replace the validation options, e.g. to add a text pattern. Units
    /// and text limit are taken from the options as given.
    pub fn with_validation(mut self, options: ValidationOptions) -> Self {
        self.validator = ParameterValidator::new(options);
        self
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn without_broad_phase(mut self) -> Self {
        self.broad_phase = false;
        self
    }

    /// Token that cancels runs of this orchestrator.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn run(
        &mut self,
        host: HostModel<'_, K::Shape>,
        reference: ReferenceModel<'_, K::Shape>,
    ) -> SyncReport {
        let mut ctx = RunContext::new(self.token.clone());
        ctx.stats.host_elements = host.elements.len();

        let index = GeometryIndex::build(self.kernel, reference.geometry, reference.elements);
        ctx.stats.absorb_index(index.statistics());
        tracing::info!(
            references = reference.elements.len(),
            indexed = index.len(),
            hosts = host.elements.len(),
            "Reference geometry indexed"
        );

        let verdicts = self.analyze(&host, &reference, &index, &mut ctx);
        let write_phase = if verdicts.len() < host.elements.len() {
            ctx.warn(format!(
                "Run cancelled after {} of {} host elements",
                verdicts.len(),
                host.elements.len()
            ));
            WritePhase::Cancelled
        } else {
            self.write(host, &reference, &verdicts, &mut ctx)
        };

        let (stats, warnings) = ctx.finish();
        let report = SyncReport {
            verdicts,
            write_phase,
            warnings,
            stats,
        };
        let summary = report.summary();
        tracing::info!(
            approved = summary.approved,
            shape_mismatch = summary.shape_mismatch,
            dimension_mismatch = summary.dimension_mismatch,
            unmatched = summary.unmatched,
            applied = report.applied_writes(),
            elapsed_ms = report.stats.elapsed_ms,
            "Synchronization finished"
        );
        report
    }

    /// Verdicts in host order. Stops early (fewer verdicts than hosts) when
    /// cancelled.
    fn analyze(
        &self,
        host: &HostModel<'_, K::Shape>,
        reference: &ReferenceModel<'_, K::Shape>,
        index: &GeometryIndex<K::Shape>,
        ctx: &mut RunContext,
    ) -> Vec<VerdictRecord> {
        let aggregator = SolidAggregator::new(self.kernel);
        let mut engine = MatchEngine::new(self.kernel);
        if !self.broad_phase {
            engine = engine.without_broad_phase();
        }
        let host_unit = self.config.host_length_unit;
        let reference_unit = self.config.reference_unit();
        let host_source: &dyn ElementSource = host.document.as_source();

        let mut match_stats = MatchStats::default();
        let mut verdicts = Vec::with_capacity(host.elements.len());
        for element in host.elements {
            if ctx.is_cancelled() {
                break;
            }

            let host_shape = self.classifier.classify(host_source, element.id, host_unit);
            let mut aggregate_stats = AggregateStats::default();
            let raw = host.geometry.raw_geometry(element.id);
            let solid = aggregator.aggregate_with_stats(raw, &mut aggregate_stats);
            ctx.stats.union_failures += aggregate_stats.union_failures;

            let Some(solid) = solid else {
                ctx.stats.hosts_without_geometry += 1;
                tracing::debug!(element = %element.id, "No usable host geometry");
                verdicts.push(VerdictRecord::unmatched(
                    element.id,
                    &host_shape.in_unit(self.comparator.canonical_unit()),
                    "no usable geometry",
                ));
                continue;
            };

            let matched = engine.best_match_with_stats(element.id, &solid, index, &mut match_stats);
            let reference_shape = match matched.reference_id {
                Some(id) => self.classifier.classify(reference.document, id, reference_unit),
                None => ShapeDescriptor::unknown(reference_unit),
            };
            let verdict =
                VerdictRecord::judge(&matched, &host_shape, &reference_shape, &self.comparator);
            tracing::debug!(
                host = %element.id,
                reference = ?matched.reference_id,
                volume = matched.intersection_volume,
                status = %verdict.status,
                "Element analysed"
            );
            verdicts.push(verdict);
        }

        ctx.stats.absorb_matching(&match_stats);
        verdicts
    }

    /// Plan, validate and submit the writes implied by `verdicts`.
    fn write(
        &mut self,
        host: HostModel<'_, K::Shape>,
        reference: &ReferenceModel<'_, K::Shape>,
        verdicts: &[VerdictRecord],
        ctx: &mut RunContext,
    ) -> WritePhase {
        let ops = match self.plan(&host, reference, verdicts, ctx) {
            Ok(ops) => ops,
            Err(error) => {
                ctx.warn(format!("Write phase aborted before writing: {}", error));
                return WritePhase::RolledBack { error };
            }
        };
        if ops.is_empty() {
            tracing::info!("No writes planned");
            return WritePhase::Skipped;
        }

        let mut built;
        let strategy: &mut dyn ParameterStrategy = match self.strategy.as_mut() {
            Some(strategy) => strategy.as_mut(),
            None => {
                let kind = self.config.strategy.unwrap_or_else(|| recommend_for(&ops));
                built = kind.build(&self.config);
                built.as_mut()
            }
        };
        strategy.reset();
        ctx.stats.strategy = Some(strategy.kind().to_string());
        tracing::info!(writes = ops.len(), strategy = %strategy.kind(), "Writing parameters");

        let phase = submit_all(strategy, host.document, &self.config.transaction_name, ops, ctx);
        if let WritePhase::Committed { applied } = phase {
            ctx.stats.applied_writes = applied;
        }
        phase
    }

    fn plan(
        &self,
        host: &HostModel<'_, K::Shape>,
        reference: &ReferenceModel<'_, K::Shape>,
        verdicts: &[VerdictRecord],
        ctx: &mut RunContext,
    ) -> Result<Vec<ParameterOp>> {
        let recipe_ctx = RecipeContext {
            host: host.document.as_source(),
            reference: reference.document,
            host_unit: self.config.host_length_unit,
            reference_unit: self.config.reference_unit(),
        };

        let mut ops = Vec::new();
        for (element, verdict) in host.elements.iter().zip(verdicts) {
            for planned in self.recipes.iter().flat_map(|r| r.plan(verdict, &recipe_ctx)) {
                ctx.stats.planned_writes += 1;
                let outcome = self.validator.validate(
                    &planned.attribute_name,
                    &planned.value,
                    planned.declared_type,
                );
                let value = match (outcome.is_valid, outcome.normalized_value) {
                    (true, Some(value)) => value,
                    _ => {
                        ctx.stats.invalid_writes += 1;
                        let reason = outcome.warnings.last().cloned().unwrap_or_default();
                        match self.config.on_invalid_value {
                            InvalidValuePolicy::Skip => {
                                ctx.warn(format!("{}: skipped write, {}", element.id, reason));
                                continue;
                            }
                            InvalidValuePolicy::Abort => {
                                return Err(Error::ValidationFailed {
                                    element: element.id,
                                    attribute: planned.attribute_name,
                                    reason,
                                });
                            }
                        }
                    }
                };
                for warning in outcome.warnings {
                    ctx.warnings.push(format!("{}: {}", element.id, warning));
                }
                ops.push(
                    ParameterOp::new(element.clone(), planned.attribute_name, value)
                        .with_declared_type(planned.declared_type),
                );
            }
        }
        Ok(ops)
    }
}

/// Submit `ops` inside one transaction group. Cancellation is checked
/// before the writes of each element.
fn submit_all(
    strategy: &mut dyn ParameterStrategy,
    doc: &mut dyn Document,
    group_name: &str,
    ops: Vec<ParameterOp>,
    ctx: &mut RunContext,
) -> WritePhase {
    let mut group = match TransactionGroup::start(doc, group_name) {
        Ok(group) => group,
        Err(err) => return rolled_back(ctx, err.into()),
    };

    let mut applied = 0;
    let mut current: Option<ElementId> = None;
    for op in ops {
        if current != Some(op.target.id) {
            if ctx.is_cancelled() {
                strategy.discard();
                group.rollback();
                ctx.warn("Write phase cancelled, all writes rolled back");
                return WritePhase::Cancelled;
            }
            current = Some(op.target.id);
        }

        ctx.stats.submitted_writes += 1;
        match strategy.submit(group.document(), op) {
            Ok(true) => applied += 1,
            Ok(false) => {}
            Err(err) => {
                strategy.discard();
                group.rollback();
                return rolled_back(ctx, err.into());
            }
        }
    }

    match strategy.finish(group.document()) {
        Ok(flushed) => applied += flushed,
        Err(err) => {
            strategy.discard();
            group.rollback();
            return rolled_back(ctx, err.into());
        }
    }

    match group.assimilate() {
        Ok(()) => {
            tracing::info!(applied, "Write phase committed");
            WritePhase::Committed { applied }
        }
        Err(err) => rolled_back(ctx, err.into()),
    }
}

fn rolled_back(ctx: &mut RunContext, error: Error) -> WritePhase {
    ctx.warn(format!("Write phase rolled back: {}", error));
    WritePhase::RolledBack { error }
}
