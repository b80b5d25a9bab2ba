use crate::filter::ClassFilter;
use crate::ingress::IngressResource;
use crate::instrumentation::{record_object_written, record_reconcile_pass};
use crate::kubernetes::objects::ObjectRef;
use crate::reporter::{ErrorReporter, ReportedError};
use crate::store::{RoutingKind, RoutingStore, StoreError, WriteAction};
use crate::translator::{DesiredState, translate};
use getset::{CopyGetters, Getters};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Unable to list {kind} objects owned by {owner}: {source}")]
    List {
        owner: ObjectRef,
        kind: RoutingKind,
        source: StoreError,
    },
    #[error("Unable to {action} {kind} {name} owned by {owner}: {source}")]
    Write {
        owner: ObjectRef,
        action: WriteAction,
        kind: RoutingKind,
        name: String,
        source: StoreError,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct SyncSummary {
    created: usize,
    updated: usize,
    deleted: usize,
    unchanged: usize,
    failed: usize,
}

impl SyncSummary {
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    fn count(&mut self, action: WriteAction) {
        match action {
            WriteAction::Create => self.created += 1,
            WriteAction::Update => self.updated += 1,
            WriteAction::Delete => self.deleted += 1,
        }
    }
}

/// Differences between the stored and the desired objects of one kind, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct SyncPlan<T> {
    #[getset(get = "pub")]
    create: BTreeMap<String, T>,
    #[getset(get = "pub")]
    update: BTreeMap<String, T>,
    #[getset(get = "pub")]
    delete: BTreeSet<String>,
    #[getset(get = "pub")]
    unchanged: BTreeSet<String>,
}

impl<T: PartialEq> SyncPlan<T> {
    pub fn between(mut existing: BTreeMap<String, T>, desired: BTreeMap<String, T>) -> Self {
        let mut plan = Self {
            create: BTreeMap::new(),
            update: BTreeMap::new(),
            delete: BTreeSet::new(),
            unchanged: BTreeSet::new(),
        };

        for (name, spec) in desired {
            match existing.remove(&name) {
                None => {
                    plan.create.insert(name, spec);
                }
                Some(current) if current == spec => {
                    plan.unchanged.insert(name);
                }
                Some(_) => {
                    plan.update.insert(name, spec);
                }
            }
        }
        plan.delete.extend(existing.into_keys());

        plan
    }

    pub fn is_converged(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Brings the stored routing objects of one ingress in line with its current state.
pub struct Reconciler<S> {
    store: Arc<S>,
    filter: ClassFilter,
    reporter: ErrorReporter,
}

impl<S: RoutingStore> Reconciler<S> {
    pub fn new(store: Arc<S>, filter: ClassFilter, reporter: ErrorReporter) -> Self {
        Self {
            store,
            filter,
            reporter,
        }
    }

    pub fn filter(&self) -> &ClassFilter {
        &self.filter
    }

    /// Runs one pass for `ingress`. A rejected ingress has everything it previously produced
    /// removed. A failed write does not stop the rest of the pass; the last failure is
    /// returned once every write was attempted.
    #[instrument(skip_all, fields(object.ref = %ingress.object_ref()))]
    pub async fn reconcile(&self, ingress: &IngressResource) -> Result<SyncSummary, ReportedError> {
        let desired = match self.filter.check(ingress) {
            Ok(()) => {
                record_reconcile_pass("accepted");
                translate(ingress)
            }
            Err(rejection) => {
                let reason: &'static str = rejection.into();
                debug!("Ingress not handled ({reason}), removing owned objects");
                record_reconcile_pass(reason);
                DesiredState::default()
            }
        };

        self.sync(ingress.object_ref(), desired).await
    }

    /// Removes everything `owner` previously produced.
    #[instrument(skip_all, fields(object.ref = %owner))]
    pub async fn cleanup(&self, owner: &ObjectRef) -> Result<SyncSummary, ReportedError> {
        record_reconcile_pass("deleted");
        self.sync(owner, DesiredState::default()).await
    }

    async fn sync(
        &self,
        owner: &ObjectRef,
        desired: DesiredState,
    ) -> Result<SyncSummary, ReportedError> {
        let (desired_upstreams, desired_routes) = desired.into_parts();

        let existing_upstreams = self
            .store
            .list_upstreams(owner)
            .await
            .map_err(|source| self.list_failed(owner, RoutingKind::Upstream, source))?;
        let existing_routes = self
            .store
            .list_routes(owner)
            .await
            .map_err(|source| self.list_failed(owner, RoutingKind::Route, source))?;

        let upstreams = SyncPlan::between(existing_upstreams, desired_upstreams);
        let routes = SyncPlan::between(existing_routes, desired_routes);

        let mut pass = Pass {
            owner,
            reporter: &self.reporter,
            summary: SyncSummary {
                unchanged: upstreams.unchanged().len() + routes.unchanged().len(),
                ..SyncSummary::default()
            },
            last_error: None,
        };

        if upstreams.is_converged() && routes.is_converged() {
            debug!("Routing objects already converged: object.ref={owner}");
            return Ok(pass.summary);
        }

        // Upstreams go in before the routes pointing at them, and come out after.
        for (name, spec) in upstreams.create() {
            let result = self.store.create_upstream(owner, name, spec).await;
            pass.record(WriteAction::Create, RoutingKind::Upstream, name, result);
        }
        for (name, spec) in upstreams.update() {
            let result = self.store.update_upstream(owner, name, spec).await;
            pass.record(WriteAction::Update, RoutingKind::Upstream, name, result);
        }
        for (name, spec) in routes.create() {
            let result = self.store.create_route(owner, name, spec).await;
            pass.record(WriteAction::Create, RoutingKind::Route, name, result);
        }
        for (name, spec) in routes.update() {
            let result = self.store.update_route(owner, name, spec).await;
            pass.record(WriteAction::Update, RoutingKind::Route, name, result);
        }
        for name in routes.delete() {
            let result = self.store.delete_route(owner, name).await;
            pass.record(WriteAction::Delete, RoutingKind::Route, name, result);
        }
        for name in upstreams.delete() {
            let result = self.store.delete_upstream(owner, name).await;
            pass.record(WriteAction::Delete, RoutingKind::Upstream, name, result);
        }

        pass.finish()
    }

    fn list_failed(&self, owner: &ObjectRef, kind: RoutingKind, source: StoreError) -> ReportedError {
        let error = Arc::new(ReconcileError::List {
            owner: owner.clone(),
            kind,
            source,
        });
        warn!("{error}");
        self.reporter.report(error.clone());
        error
    }
}

struct Pass<'a> {
    owner: &'a ObjectRef,
    reporter: &'a ErrorReporter,
    summary: SyncSummary,
    last_error: Option<ReportedError>,
}

impl Pass<'_> {
    fn record(
        &mut self,
        action: WriteAction,
        kind: RoutingKind,
        name: &str,
        result: Result<(), StoreError>,
    ) {
        match result {
            Ok(()) => {
                info!("Applied {action} of {kind} {name}: object.ref={}", self.owner);
                record_object_written(action, kind);
                self.summary.count(action);
            }
            Err(source) => {
                let error = Arc::new(ReconcileError::Write {
                    owner: self.owner.clone(),
                    action,
                    kind,
                    name: name.to_string(),
                    source,
                });
                warn!("{error}");
                self.reporter.report(error.clone());
                self.summary.failed += 1;
                self.last_error = Some(error);
            }
        }
    }

    fn finish(self) -> Result<SyncSummary, ReportedError> {
        let summary = self.summary;
        debug!(
            "Pass finished: object.ref={} created={} updated={} deleted={} unchanged={} failed={}",
            self.owner,
            summary.created,
            summary.updated,
            summary.deleted,
            summary.unchanged,
            summary.failed
        );

        match self.last_error {
            Some(error) => Err(error),
            None => Ok(summary),
        }
    }
}
