use super::{RoutingKind, RoutingStore, StoreError};
use crate::kubernetes::objects::ObjectRef;
use crate::naming::owner_label_value;
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{DeleteParams, ListParams, ObjectMeta, Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::{debug, trace};
use vg_api::constants::{
    INGRESS_OWNER_LABEL, MANAGED_BY_LABEL, MANAGED_BY_LABEL_QUERY, MANAGED_BY_VALUE,
};
use vg_api::v1alpha1::{Route, RouteSpec, Upstream, UpstreamSpec};

const NOT_FOUND: u16 = 404;
const CONFLICT: u16 = 409;

/// Routing objects stored as `Upstream` and `Route` custom resources.
#[derive(Clone)]
pub struct KubeRoutingStore {
    client: Client,
}

impl KubeRoutingStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: RoutingResource>(&self, owner: &ObjectRef) -> Api<K> {
        Api::namespaced(self.client.clone(), owner.namespace())
    }

    async fn list<K: RoutingResource>(
        &self,
        owner: &ObjectRef,
    ) -> Result<BTreeMap<String, K::Spec>, StoreError> {
        let params = ListParams::default().labels(&owner_selector(owner));
        let objects = self.api::<K>(owner).list(&params).await?;
        trace!(
            "Listed {} {} objects: owner.ref={owner}",
            objects.items.len(),
            K::ROUTING_KIND
        );

        Ok(objects
            .items
            .into_iter()
            .filter_map(|object| {
                let (metadata, spec) = object.into_parts();
                metadata.name.map(|name| (name, spec))
            })
            .collect())
    }

    async fn create<K: RoutingResource>(
        &self,
        owner: &ObjectRef,
        name: &str,
        spec: &K::Spec,
    ) -> Result<(), StoreError> {
        let object = K::from_parts(object_meta(owner, name), spec.clone());
        match self
            .api::<K>(owner)
            .create(&PostParams::default(), &object)
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(response)) if response.code == CONFLICT => {
                debug!(
                    "{} {name} exists without owner labels, adopting it: owner.ref={owner}",
                    K::ROUTING_KIND
                );
                self.update::<K>(owner, name, spec).await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update<K: RoutingResource>(
        &self,
        owner: &ObjectRef,
        name: &str,
        spec: &K::Spec,
    ) -> Result<(), StoreError> {
        let body = merge_patch_body::<K>(owner, name, spec)?;
        match self
            .api::<K>(owner)
            .patch(name, &PatchParams::default(), &Patch::Merge(&body))
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(response)) if response.code == NOT_FOUND => {
                Err(StoreError::NotFound {
                    kind: K::ROUTING_KIND,
                    name: name.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete<K: RoutingResource>(
        &self,
        owner: &ObjectRef,
        name: &str,
    ) -> Result<(), StoreError> {
        match self
            .api::<K>(owner)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(response)) if response.code == NOT_FOUND => {
                debug!(
                    "{} {name} was already deleted: owner.ref={owner}",
                    K::ROUTING_KIND
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl RoutingStore for KubeRoutingStore {
    async fn list_upstreams(
        &self,
        owner: &ObjectRef,
    ) -> Result<BTreeMap<String, UpstreamSpec>, StoreError> {
        self.list::<Upstream>(owner).await
    }

    async fn create_upstream(
        &self,
        owner: &ObjectRef,
        name: &str,
        spec: &UpstreamSpec,
    ) -> Result<(), StoreError> {
        self.create::<Upstream>(owner, name, spec).await
    }

    async fn update_upstream(
        &self,
        owner: &ObjectRef,
        name: &str,
        spec: &UpstreamSpec,
    ) -> Result<(), StoreError> {
        self.update::<Upstream>(owner, name, spec).await
    }

    async fn delete_upstream(&self, owner: &ObjectRef, name: &str) -> Result<(), StoreError> {
        self.delete::<Upstream>(owner, name).await
    }

    async fn list_routes(
        &self,
        owner: &ObjectRef,
    ) -> Result<BTreeMap<String, RouteSpec>, StoreError> {
        self.list::<Route>(owner).await
    }

    async fn create_route(
        &self,
        owner: &ObjectRef,
        name: &str,
        spec: &RouteSpec,
    ) -> Result<(), StoreError> {
        self.create::<Route>(owner, name, spec).await
    }

    async fn update_route(
        &self,
        owner: &ObjectRef,
        name: &str,
        spec: &RouteSpec,
    ) -> Result<(), StoreError> {
        self.update::<Route>(owner, name, spec).await
    }

    async fn delete_route(&self, owner: &ObjectRef, name: &str) -> Result<(), StoreError> {
        self.delete::<Route>(owner, name).await
    }
}

trait RoutingResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    type Spec: Clone + Send + Sync;

    const ROUTING_KIND: RoutingKind;

    fn from_parts(metadata: ObjectMeta, spec: Self::Spec) -> Self;

    fn into_parts(self) -> (ObjectMeta, Self::Spec);

    /// Writes an explicit `null` for every unset optional spec field of a merge patch body.
    fn clear_unset(_body: &mut Value) {}
}

impl RoutingResource for Upstream {
    type Spec = UpstreamSpec;

    const ROUTING_KIND: RoutingKind = RoutingKind::Upstream;

    fn from_parts(metadata: ObjectMeta, spec: Self::Spec) -> Self {
        Self { metadata, spec }
    }

    fn into_parts(self) -> (ObjectMeta, Self::Spec) {
        (self.metadata, self.spec)
    }
}

impl RoutingResource for Route {
    type Spec = RouteSpec;

    const ROUTING_KIND: RoutingKind = RoutingKind::Route;

    fn from_parts(metadata: ObjectMeta, spec: Self::Spec) -> Self {
        Self { metadata, spec }
    }

    fn into_parts(self) -> (ObjectMeta, Self::Spec) {
        (self.metadata, self.spec)
    }

    fn clear_unset(body: &mut Value) {
        if let Some(path) = body
            .pointer_mut("/spec/matcher/path")
            .and_then(Value::as_object_mut)
        {
            for field in ["prefix", "regex"] {
                path.entry(field).or_insert(Value::Null);
            }
        }
    }
}

fn merge_patch_body<K: RoutingResource>(
    owner: &ObjectRef,
    name: &str,
    spec: &K::Spec,
) -> Result<Value, StoreError> {
    let mut body = serde_json::to_value(K::from_parts(object_meta(owner, name), spec.clone()))?;
    K::clear_unset(&mut body);
    Ok(body)
}

fn owner_labels(owner: &ObjectRef) -> BTreeMap<String, String> {
    BTreeMap::from([
        (MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string()),
        (
            INGRESS_OWNER_LABEL.to_string(),
            owner_label_value(owner.name()),
        ),
    ])
}

fn owner_selector(owner: &ObjectRef) -> String {
    format!(
        "{MANAGED_BY_LABEL_QUERY},{INGRESS_OWNER_LABEL}={}",
        owner_label_value(owner.name())
    )
}

fn object_meta(owner: &ObjectRef, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(owner.namespace().clone()),
        labels: Some(owner_labels(owner)),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::networking::v1::Ingress;
    use serde_json::json;
    use vg_api::v1alpha1::{Destination, Matcher, PathMatcher};

    fn merge(target: &mut Value, patch: &Value) {
        match (target.as_object_mut(), patch.as_object()) {
            (Some(target), Some(patch)) => {
                for (key, value) in patch {
                    if value.is_null() {
                        target.remove(key);
                    } else {
                        merge(target.entry(key.clone()).or_insert(Value::Null), value);
                    }
                }
            }
            _ => *target = patch.clone(),
        }
    }

    fn route_spec(path: PathMatcher) -> RouteSpec {
        RouteSpec {
            matcher: Matcher {
                path,
                virtual_host: "shop.example.com".to_string(),
            },
            destination: Destination {
                upstream_name: "storefront-web-80-0011223344".to_string(),
            },
            weight: 2,
        }
    }

    fn owner(name: &str) -> ObjectRef {
        ObjectRef::of_kind::<Ingress>()
            .namespace("shop")
            .name(name)
            .build()
    }

    #[test]
    fn test_owner_selector() {
        assert_eq!(
            owner_selector(&owner("storefront")),
            "app.kubernetes.io/managed-by=vg-ingress,vale-gateway.whitefamily.in/ingress=storefront"
        );
    }

    #[test]
    fn test_object_meta() {
        let metadata = object_meta(&owner("storefront"), "storefront-web-80-0011223344");

        assert_eq!(metadata.name.as_deref(), Some("storefront-web-80-0011223344"));
        assert_eq!(metadata.namespace.as_deref(), Some("shop"));
        assert_eq!(
            metadata.labels,
            Some(BTreeMap::from([
                (
                    "app.kubernetes.io/managed-by".to_string(),
                    "vg-ingress".to_string()
                ),
                (
                    "vale-gateway.whitefamily.in/ingress".to_string(),
                    "storefront".to_string()
                ),
            ]))
        );
    }

    #[test]
    fn test_round_trip_parts() {
        let spec = UpstreamSpec::cluster_service("web", "shop", "80");
        let upstream = Upstream::from_parts(object_meta(&owner("storefront"), "web"), spec.clone());

        let (metadata, parts_spec) = upstream.into_parts();
        assert_eq!(metadata.name.as_deref(), Some("web"));
        assert_eq!(parts_spec, spec);
    }

    #[test]
    fn test_route_patch_clears_other_matcher() {
        let desired = route_spec(PathMatcher::regex("/a"));
        let body = merge_patch_body::<Route>(&owner("storefront"), "route", &desired)
            .expect("Body should serialize");

        assert_eq!(
            body.pointer("/spec/matcher/path"),
            Some(&json!({ "prefix": null, "regex": "/a" }))
        );
    }

    #[test]
    fn test_route_patch_repairs_tampered_route() {
        let tampered = Route::from_parts(
            ObjectMeta {
                name: Some("route".to_string()),
                namespace: Some("shop".to_string()),
                ..Default::default()
            },
            RouteSpec {
                matcher: Matcher {
                    path: PathMatcher {
                        prefix: Some("/x".to_string()),
                        regex: Some("/a".to_string()),
                    },
                    virtual_host: "elsewhere.example.com".to_string(),
                },
                ..route_spec(PathMatcher::regex("/a"))
            },
        );
        let desired = route_spec(PathMatcher::regex("/a"));

        let mut stored = serde_json::to_value(&tampered).expect("Route should serialize");
        let body = merge_patch_body::<Route>(&owner("storefront"), "route", &desired)
            .expect("Body should serialize");
        merge(&mut stored, &body);

        let repaired: Route = serde_json::from_value(stored).expect("Route should deserialize");
        assert_eq!(repaired.spec, desired);
        assert_eq!(repaired.metadata.labels, Some(owner_labels(&owner("storefront"))));
    }

    #[test]
    fn test_upstream_patch_is_plain_object() {
        let spec = UpstreamSpec::cluster_service("web", "shop", "80");
        let body = merge_patch_body::<Upstream>(&owner("storefront"), "web", &spec)
            .expect("Body should serialize");

        assert_eq!(
            body.get("spec"),
            Some(&json!({
                "type": "cluster-service",
                "spec": {
                    "serviceName": "web",
                    "serviceNamespace": "shop",
                    "servicePortName": "80",
                },
            }))
        );
    }
}
