use super::{RoutingKind, RoutingStore, StoreError, WriteAction};
use crate::kubernetes::objects::ObjectRef;
use crate::naming::owner_label_value;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use getset::{CopyGetters, Getters};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::trace;
use vg_api::v1alpha1::{RouteSpec, UpstreamSpec};

/// One write accepted by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct StoreWrite {
    #[getset(get_copy = "pub")]
    action: WriteAction,
    #[getset(get_copy = "pub")]
    kind: RoutingKind,
    #[getset(get = "pub")]
    namespace: String,
    #[getset(get = "pub")]
    name: String,
}

type Key = (String, String);

#[derive(Debug, Clone)]
struct Stored<T> {
    owner: String,
    spec: T,
}

/// Routing store kept in process memory.
///
/// Writes to names registered with [`MemoryStore::fail_writes_to`] and, while enabled,
/// every list call fail with [`StoreError::Rejected`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    upstreams: DashMap<Key, Stored<UpstreamSpec>>,
    routes: DashMap<Key, Stored<RouteSpec>>,
    writes: Mutex<Vec<StoreWrite>>,
    failing_names: DashSet<String>,
    failing_lists: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes_to<S: Into<String>>(&self, name: S) {
        self.failing_names.insert(name.into());
    }

    pub fn fail_lists(&self, fail: bool) {
        self.failing_lists.store(fail, Ordering::SeqCst);
    }

    pub fn clear_failures(&self) {
        self.failing_names.clear();
        self.fail_lists(false);
    }

    pub fn upstreams_in(&self, namespace: &str) -> BTreeMap<String, UpstreamSpec> {
        in_namespace(&self.upstreams, namespace)
    }

    pub fn routes_in(&self, namespace: &str) -> BTreeMap<String, RouteSpec> {
        in_namespace(&self.routes, namespace)
    }

    /// Writes accepted so far, oldest first. Rejected writes are not recorded.
    pub fn writes(&self) -> Vec<StoreWrite> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_writes(&self) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn check_list(&self, kind: RoutingKind) -> Result<(), StoreError> {
        if self.failing_lists.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected(format!("listing {kind} objects")));
        }
        Ok(())
    }

    fn check_write(&self, action: WriteAction, kind: RoutingKind, name: &str) -> Result<(), StoreError> {
        if self.failing_names.contains(name) {
            return Err(StoreError::Rejected(format!("{action} {kind} {name}")));
        }
        Ok(())
    }

    fn record(&self, action: WriteAction, kind: RoutingKind, owner: &ObjectRef, name: &str) {
        trace!("Recorded {action} of {kind} {name}: owner.ref={owner}");
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(StoreWrite {
                action,
                kind,
                namespace: owner.namespace().clone(),
                name: name.to_string(),
            });
    }

    fn list<T: Clone>(
        &self,
        objects: &DashMap<Key, Stored<T>>,
        kind: RoutingKind,
        owner: &ObjectRef,
    ) -> Result<BTreeMap<String, T>, StoreError> {
        self.check_list(kind)?;
        let owner_label = owner_label_value(owner.name());

        Ok(objects
            .iter()
            .filter(|entry| entry.key().0 == *owner.namespace() && entry.value().owner == owner_label)
            .map(|entry| (entry.key().1.clone(), entry.value().spec.clone()))
            .collect())
    }

    fn create<T: Clone>(
        &self,
        objects: &DashMap<Key, Stored<T>>,
        kind: RoutingKind,
        owner: &ObjectRef,
        name: &str,
        spec: &T,
    ) -> Result<(), StoreError> {
        self.check_write(WriteAction::Create, kind, name)?;
        let key = (owner.namespace().clone(), name.to_string());
        if objects.contains_key(&key) {
            trace!("Adopting existing {kind} {name}: owner.ref={owner}");
        }

        objects.insert(
            key,
            Stored {
                owner: owner_label_value(owner.name()),
                spec: spec.clone(),
            },
        );
        self.record(WriteAction::Create, kind, owner, name);
        Ok(())
    }

    fn update<T: Clone>(
        &self,
        objects: &DashMap<Key, Stored<T>>,
        kind: RoutingKind,
        owner: &ObjectRef,
        name: &str,
        spec: &T,
    ) -> Result<(), StoreError> {
        self.check_write(WriteAction::Update, kind, name)?;
        let key = (owner.namespace().clone(), name.to_string());
        match objects.get_mut(&key) {
            Some(mut stored) => stored.spec = spec.clone(),
            None => {
                return Err(StoreError::NotFound {
                    kind,
                    name: name.to_string(),
                });
            }
        }

        self.record(WriteAction::Update, kind, owner, name);
        Ok(())
    }

    fn delete<T>(
        &self,
        objects: &DashMap<Key, Stored<T>>,
        kind: RoutingKind,
        owner: &ObjectRef,
        name: &str,
    ) -> Result<(), StoreError> {
        self.check_write(WriteAction::Delete, kind, name)?;
        let key = (owner.namespace().clone(), name.to_string());
        if objects.remove(&key).is_some() {
            self.record(WriteAction::Delete, kind, owner, name);
        }
        Ok(())
    }
}

fn in_namespace<T: Clone>(objects: &DashMap<Key, Stored<T>>, namespace: &str) -> BTreeMap<String, T> {
    objects
        .iter()
        .filter(|entry| entry.key().0 == namespace)
        .map(|entry| (entry.key().1.clone(), entry.value().spec.clone()))
        .collect()
}

#[async_trait]
impl RoutingStore for MemoryStore {
    async fn list_upstreams(
        &self,
        owner: &ObjectRef,
    ) -> Result<BTreeMap<String, UpstreamSpec>, StoreError> {
        self.list(&self.upstreams, RoutingKind::Upstream, owner)
    }

    async fn create_upstream(
        &self,
        owner: &ObjectRef,
        name: &str,
        spec: &UpstreamSpec,
    ) -> Result<(), StoreError> {
        self.create(&self.upstreams, RoutingKind::Upstream, owner, name, spec)
    }

    async fn update_upstream(
        &self,
        owner: &ObjectRef,
        name: &str,
        spec: &UpstreamSpec,
    ) -> Result<(), StoreError> {
        self.update(&self.upstreams, RoutingKind::Upstream, owner, name, spec)
    }

    async fn delete_upstream(&self, owner: &ObjectRef, name: &str) -> Result<(), StoreError> {
        self.delete(&self.upstreams, RoutingKind::Upstream, owner, name)
    }

    async fn list_routes(
        &self,
        owner: &ObjectRef,
    ) -> Result<BTreeMap<String, RouteSpec>, StoreError> {
        self.list(&self.routes, RoutingKind::Route, owner)
    }

    async fn create_route(
        &self,
        owner: &ObjectRef,
        name: &str,
        spec: &RouteSpec,
    ) -> Result<(), StoreError> {
        self.create(&self.routes, RoutingKind::Route, owner, name, spec)
    }

    async fn update_route(
        &self,
        owner: &ObjectRef,
        name: &str,
        spec: &RouteSpec,
    ) -> Result<(), StoreError> {
        self.update(&self.routes, RoutingKind::Route, owner, name, spec)
    }

    async fn delete_route(&self, owner: &ObjectRef, name: &str) -> Result<(), StoreError> {
        self.delete(&self.routes, RoutingKind::Route, owner, name)
    }
}
