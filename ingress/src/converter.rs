use crate::filter::ClassFilter;
use crate::ingress::IngressResource;
use crate::kubernetes::objects::ObjectRef;
use crate::kubernetes::{ConnectionConfig, SetupError};
use crate::options::Options;
use crate::reconciler::Reconciler;
use crate::reporter::{ErrorReceiver, error_reporter};
use crate::store::{KubeRoutingStore, RoutingStore};
use crate::watch::{IngressEvent, watch_ingresses};
use dashmap::{DashMap, DashSet};
use futures::{Stream, StreamExt};
use std::collections::HashSet;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const MIN_RESYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Keeps the gateway routing objects in line with the ingresses of a cluster until the stop
/// token is cancelled.
pub struct IngressConverter {
    errors: ErrorReceiver,
    task: JoinHandle<()>,
}

impl IngressConverter {
    pub async fn start(
        connection: &ConnectionConfig,
        options: Options,
        stop: CancellationToken,
    ) -> Result<Self, SetupError> {
        let client = connection.connect().await?;
        let events = watch_ingresses(client.clone(), options.watch_scope());
        let store = Arc::new(KubeRoutingStore::new(client));

        Ok(Self::spawn(store, events, options, stop))
    }

    pub fn spawn<S, E>(store: Arc<S>, events: E, options: Options, stop: CancellationToken) -> Self
    where
        S: RoutingStore + 'static,
        E: Stream<Item = IngressEvent> + Send + 'static,
    {
        let (reporter, errors) = error_reporter(stop.clone());
        let reconciler = Reconciler::new(
            store,
            ClassFilter::new(options.ingress_class().clone()),
            reporter,
        );
        let state = Arc::new(ConverterState::new(reconciler));

        info!(
            "Starting ingress converter: ingress.class={} resync.interval={:?}",
            options.ingress_class(),
            options.resync_interval()
        );
        let task = tokio::spawn(run(state, events, options.resync_interval(), stop));

        Self { errors, task }
    }

    pub fn errors(&mut self) -> &mut ErrorReceiver {
        &mut self.errors
    }

    /// Waits until the converter loop and every in-flight pass have finished.
    pub async fn stopped(self) {
        if let Err(err) = self.task.await {
            error!("Ingress converter task failed: {err}");
        }
    }
}

async fn run<S, E>(
    state: Arc<ConverterState<S>>,
    events: E,
    resync_interval: Duration,
    stop: CancellationToken,
) where
    S: RoutingStore + 'static,
    E: Stream<Item = IngressEvent> + Send + 'static,
{
    let mut events = pin!(events);
    let resync_interval = if resync_interval < MIN_RESYNC_INTERVAL {
        warn!("Resync interval {resync_interval:?} is too short, using {MIN_RESYNC_INTERVAL:?}");
        MIN_RESYNC_INTERVAL
    } else {
        resync_interval
    };
    let mut resync = interval_at(Instant::now() + resync_interval, resync_interval);
    resync.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut passes = JoinSet::new();

    loop {
        select! {
            biased;

            () = stop.cancelled() => {
                info!("Stop requested, shutting down ingress converter");
                break;
            }
            event = events.next() => {
                let Some(event) = event else {
                    warn!("Ingress watch ended, shutting down ingress converter");
                    break;
                };
                for object_ref in state.apply_event(event) {
                    passes.spawn(state.clone().pass(object_ref));
                }
            }
            _ = resync.tick() => {
                let targets = state.resync_targets();
                debug!("Resyncing {} ingresses", targets.len());
                for object_ref in targets {
                    passes.spawn(state.clone().pass(object_ref));
                }
            }
            Some(result) = passes.join_next(), if !passes.is_empty() => {
                log_join(result);
            }
        }
    }

    if !passes.is_empty() {
        info!("Waiting for {} in-flight passes", passes.len());
    }
    while let Some(result) = passes.join_next().await {
        log_join(result);
    }
    info!("Ingress converter stopped");
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(err) = result {
        error!("Reconciliation pass panicked or was cancelled: {err}");
    }
}

struct ConverterState<S> {
    reconciler: Reconciler<S>,
    known: DashMap<ObjectRef, Arc<IngressResource>>,
    failed: DashSet<ObjectRef>,
    locks: DashMap<ObjectRef, Arc<Mutex<()>>>,
}

impl<S: RoutingStore + 'static> ConverterState<S> {
    fn new(reconciler: Reconciler<S>) -> Self {
        Self {
            reconciler,
            known: DashMap::new(),
            failed: DashSet::new(),
            locks: DashMap::new(),
        }
    }

    /// Records the event and returns the ingresses needing a pass.
    fn apply_event(&self, event: IngressEvent) -> Vec<ObjectRef> {
        match event {
            IngressEvent::Applied(ingress) => {
                let object_ref = ingress.object_ref().clone();
                self.known.insert(object_ref.clone(), Arc::new(ingress));
                vec![object_ref]
            }
            IngressEvent::Deleted(object_ref) => {
                self.known.remove(&object_ref);
                vec![object_ref]
            }
            IngressEvent::Relisted(ingresses) => {
                let listed: HashSet<ObjectRef> = ingresses
                    .iter()
                    .map(|ingress| ingress.object_ref().clone())
                    .collect();
                let vanished: Vec<ObjectRef> = self
                    .known
                    .iter()
                    .map(|entry| entry.key().clone())
                    .filter(|object_ref| !listed.contains(object_ref))
                    .collect();

                for object_ref in &vanished {
                    info!("Ingress vanished while not watching: object.ref={object_ref}");
                    self.known.remove(object_ref);
                }
                for ingress in ingresses {
                    self.known
                        .insert(ingress.object_ref().clone(), Arc::new(ingress));
                }

                listed.into_iter().chain(vanished).collect()
            }
        }
    }

    fn resync_targets(&self) -> Vec<ObjectRef> {
        let mut targets: HashSet<ObjectRef> = self
            .known
            .iter()
            .filter(|entry| self.reconciler.filter().accepts(entry.value()))
            .map(|entry| entry.key().clone())
            .collect();
        targets.extend(self.failed.iter().map(|entry| entry.key().clone()));
        targets.into_iter().collect()
    }

    /// Passes for the same ingress run one at a time, each against the latest known state.
    async fn pass(self: Arc<Self>, object_ref: ObjectRef) {
        let lock = self.locks.entry(object_ref.clone()).or_default().clone();
        let guard = lock.lock().await;

        let current = self
            .known
            .get(&object_ref)
            .map(|entry| Arc::clone(entry.value()));
        let result = match current {
            Some(ingress) => self.reconciler.reconcile(&ingress).await,
            None => self.reconciler.cleanup(&object_ref).await,
        };

        match result {
            Ok(summary) => {
                self.failed.remove(&object_ref);
                debug!(
                    "Reconciled ingress: object.ref={object_ref} writes={}",
                    summary.writes()
                );
            }
            Err(err) => {
                self.failed.insert(object_ref.clone());
                warn!("Reconciliation pass failed, retrying on next event or resync: object.ref={object_ref} error={err}");
            }
        }

        drop(guard);
        drop(lock);
        if !self.known.contains_key(&object_ref) && !self.failed.contains(&object_ref) {
            self.locks
                .remove_if(&object_ref, |_, lock| Arc::strong_count(lock) == 1);
        }
    }
}
