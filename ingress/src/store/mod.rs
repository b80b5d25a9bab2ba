//! Storage of the routing objects derived from ingresses.
//!
//! Every call is scoped to an owner: the ingress the objects were derived from. Objects live
//! in the owner's namespace and listing only returns objects the owner produced.

mod cluster;
mod memory;

pub use self::cluster::KubeRoutingStore;
pub use self::memory::{MemoryStore, StoreWrite};

use crate::kubernetes::objects::ObjectRef;
use async_trait::async_trait;
use std::collections::BTreeMap;
use strum::{Display, IntoStaticStr};
use thiserror::Error;
use vg_api::v1alpha1::{RouteSpec, UpstreamSpec};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Kubernetes API request failed: {0}")]
    Kube(#[from] kube::Error),
    #[error("{kind} {name} does not exist")]
    NotFound { kind: RoutingKind, name: String },
    #[error("Failed to encode routing object: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Store rejected the request: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RoutingKind {
    Upstream,
    Route,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum WriteAction {
    Create,
    Update,
    Delete,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoutingStore: Send + Sync {
    async fn list_upstreams(
        &self,
        owner: &ObjectRef,
    ) -> Result<BTreeMap<String, UpstreamSpec>, StoreError>;

    async fn create_upstream(
        &self,
        owner: &ObjectRef,
        name: &str,
        spec: &UpstreamSpec,
    ) -> Result<(), StoreError>;

    async fn update_upstream(
        &self,
        owner: &ObjectRef,
        name: &str,
        spec: &UpstreamSpec,
    ) -> Result<(), StoreError>;

    /// Deleting an object that is already gone succeeds.
    async fn delete_upstream(&self, owner: &ObjectRef, name: &str) -> Result<(), StoreError>;

    async fn list_routes(&self, owner: &ObjectRef)
    -> Result<BTreeMap<String, RouteSpec>, StoreError>;

    async fn create_route(
        &self,
        owner: &ObjectRef,
        name: &str,
        spec: &RouteSpec,
    ) -> Result<(), StoreError>;

    async fn update_route(
        &self,
        owner: &ObjectRef,
        name: &str,
        spec: &RouteSpec,
    ) -> Result<(), StoreError>;

    /// Deleting an object that is already gone succeeds.
    async fn delete_route(&self, owner: &ObjectRef, name: &str) -> Result<(), StoreError>;
}
