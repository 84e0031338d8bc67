//! ReconciliationRun: drives one run end to end

use super::expand::FetchExpander;
use super::state::RunState;
use super::RunError;
use crate::adapter::{CancellationToken, MetadataSource, TargetGateway, TargetSnapshotProvider};
use crate::config::RunConfig;
use crate::graph::{FieldMap, IdentifierMap, RecordId, RelationGraph, ResourceId};
use crate::reconcile::{FieldReconciler, FieldUpdate, ResourceReport, RunSummary};
use crate::resolve::{ClosureBuilder, SortOrderResolver, SortOutcome};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Per-run options chosen by the caller
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Seed the run from this resource's record only
    pub only_resource: Option<ResourceId>,
    /// Plan updates without submitting them
    pub dry_run: bool,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only_resource(mut self, resource: impl Into<ResourceId>) -> Self {
        self.only_resource = Some(resource.into());
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Updates planned for one resource
struct ResourcePlan {
    resource: ResourceId,
    record: RecordId,
    updates: Vec<FieldUpdate>,
}

/// Drives a reconciliation run.
///
/// Phases run strictly in order: snapshot load, fetch expansion to its fixed
/// point, mutual closure, sort-order resolution, then per-resource diff and
/// update. Only fetches and per-resource updates run concurrently.
pub struct ReconciliationRun {
    source: Arc<dyn MetadataSource>,
    snapshot: Arc<dyn TargetSnapshotProvider>,
    gateway: Arc<dyn TargetGateway>,
    config: RunConfig,
    cancel: CancellationToken,
}

impl ReconciliationRun {
    pub fn new(
        source: Arc<dyn MetadataSource>,
        snapshot: Arc<dyn TargetSnapshotProvider>,
        gateway: Arc<dyn TargetGateway>,
        config: RunConfig,
    ) -> Self {
        Self {
            source,
            snapshot,
            gateway,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels this run when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub async fn execute(&self, options: &RunOptions) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary::begin(options.dry_run);
        info!(run_id = %summary.run_id, dry_run = options.dry_run, "starting reconciliation run");

        let current = self.snapshot.current_fields().await?;
        let identifiers = self.snapshot.identifier_map().await?;
        info!(
            resources = current.len(),
            mapped = identifiers.len(),
            "loaded target snapshot"
        );

        let mut state = RunState::new();
        let expander = FetchExpander::new(
            Arc::clone(&self.source),
            self.config.expansion.clone(),
            self.config.dates.clone(),
        )
        .with_abort_on_malformed(self.config.abort_on_malformed)
        .with_cancellation(self.cancel.clone());
        summary.expansion = expander
            .expand(self.seeds(&identifiers, options), &mut state)
            .await?;
        summary.records_processed = state.graph.len();
        info!(
            records = state.graph.len(),
            rounds = summary.expansion.passes,
            failed = state.fetch_failures.len() + state.malformed.len(),
            "fetch expansion complete"
        );

        let closure = ClosureBuilder::new().close(&mut state.graph);
        summary.closure = closure.fixed_point;
        summary.edges_inferred = closure.inferred;
        info!(
            inferred = closure.inferred,
            passes = closure.fixed_point.passes,
            "relation closure complete"
        );

        let sorted = SortOrderResolver::resolve_graph(&mut state.graph);
        info!(unstable = sorted.unstable.len(), "sort orders resolved");

        let plans = self.plan(&state.graph, &sorted, &identifiers, &current, &mut summary);
        summary.fetch_errors = state.fetch_failures;
        summary.malformed = state.malformed;
        summary.unexpanded = state.unexpanded;

        let (mut reports, cancelled) = self.submit(plans, options.dry_run).await;
        reports.sort_by(|a, b| a.resource.cmp(&b.resource));
        summary.resources = reports;
        summary.cancelled = cancelled;
        summary.finish();

        info!(
            resources = summary.resources.len(),
            planned = summary.fields_planned(),
            updated = summary.fields_updated,
            failed = summary.fields_failed,
            cancelled = summary.cancelled,
            "reconciliation complete"
        );
        Ok(summary)
    }

    /// Records the expansion starts from
    fn seeds(&self, identifiers: &IdentifierMap, options: &RunOptions) -> BTreeSet<RecordId> {
        match &options.only_resource {
            None => identifiers.iter().map(|(record, _)| record.clone()).collect(),
            Some(resource) => match identifiers.record_for(resource) {
                Some(record) => BTreeSet::from([record.clone()]),
                None => {
                    warn!(%resource, "resource is not mapped to a record; nothing to reconcile");
                    BTreeSet::new()
                }
            },
        }
    }

    /// Diff every fetched record against its resource's stored fields
    fn plan(
        &self,
        graph: &RelationGraph,
        sorted: &SortOutcome,
        identifiers: &IdentifierMap,
        current: &BTreeMap<ResourceId, FieldMap>,
        summary: &mut RunSummary,
    ) -> Vec<ResourcePlan> {
        let reconciler = FieldReconciler::new(self.config.keywords_field.clone());
        let mut plans = Vec::new();

        for record in graph.records() {
            let Some(resource) = identifiers.resource_for(&record.id) else {
                debug!(record = %record.id, "no target counterpart; skipping updates");
                summary.skipped_unmapped.push(record.id.clone());
                continue;
            };
            let Some(stored) = current.get(resource) else {
                warn!(record = %record.id, %resource, "resource missing from target snapshot");
                summary.skipped_no_snapshot.push(record.id.clone());
                continue;
            };

            let mut fields = record.fields.clone();
            if let Some(ordered) = sorted.orders.get(&record.id) {
                fields.insert(
                    self.config.related_records_field.clone(),
                    SortOrderResolver::materialize(ordered, identifiers, &self.config.related_separator),
                );
            }

            plans.push(ResourcePlan {
                resource: resource.clone(),
                record: record.id.clone(),
                updates: reconciler.diff(&fields, stored),
            });
        }

        plans
    }

    /// Submit plans, one task per resource with pending updates.
    ///
    /// Returns the reports and whether cancellation cut submission short.
    async fn submit(&self, plans: Vec<ResourcePlan>, dry_run: bool) -> (Vec<ResourceReport>, bool) {
        let mut reports = Vec::with_capacity(plans.len());
        if dry_run {
            for plan in plans {
                reports.push(ResourceReport::new(plan.resource, plan.record, plan.updates));
            }
            return (reports, false);
        }

        let reconciler = FieldReconciler::new(self.config.keywords_field.clone())
            .with_timeout(self.config.updates.timeout());
        let semaphore = Arc::new(Semaphore::new(self.config.updates.concurrency.max(1)));
        let mut handles = Vec::new();

        for plan in plans {
            if plan.updates.is_empty() {
                reports.push(ResourceReport::new(plan.resource, plan.record, plan.updates));
                continue;
            }
            let resource = plan.resource.clone();
            let reconciler = reconciler.clone();
            let gateway = Arc::clone(&self.gateway);
            let semaphore = Arc::clone(&semaphore);
            let cancel = self.cancel.clone();
            let handle = tokio::spawn(async move {
                let permit = semaphore.acquire_owned().await;
                if permit.is_err() || cancel.is_cancelled() {
                    return (ResourceReport::new(plan.resource, plan.record, plan.updates), false);
                }
                let report = reconciler
                    .apply(&plan.resource, &plan.record, plan.updates, gateway.as_ref())
                    .await;
                (report, true)
            });
            handles.push((resource, handle));
        }

        let mut cancelled = false;
        for (resource, handle) in handles {
            match handle.await {
                Ok((report, submitted)) => {
                    if !submitted {
                        debug!(%resource, "updates not submitted; run cancelled");
                        cancelled = true;
                    }
                    reports.push(report);
                }
                Err(e) => warn!(%resource, error = %e, "update task failed"),
            }
        }

        (reports, cancelled)
    }
}
