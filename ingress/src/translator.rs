//! Pure translation of an ingress into the routing objects it should own.

use crate::ingress::{Backend, IngressResource};
use crate::naming::{route_name, upstream_name};
use getset::Getters;
use std::collections::BTreeMap;
use vg_api::v1alpha1::{Destination, Matcher, PathMatcher, RouteSpec, UpstreamSpec};

/// Weight of the catch-all route produced for a default backend. Rule-derived routes always
/// weigh at least 1.
pub const DEFAULT_ROUTE_WEIGHT: i32 = 0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Getters)]
pub struct DesiredState {
    #[getset(get = "pub")]
    upstreams: BTreeMap<String, UpstreamSpec>,

    #[getset(get = "pub")]
    routes: BTreeMap<String, RouteSpec>,
}

impl DesiredState {
    pub fn is_empty(&self) -> bool {
        self.upstreams.is_empty() && self.routes.is_empty()
    }

    pub fn into_parts(self) -> (BTreeMap<String, UpstreamSpec>, BTreeMap<String, RouteSpec>) {
        (self.upstreams, self.routes)
    }

    fn add_upstream(&mut self, ingress: &IngressResource, backend: &Backend) -> String {
        let object_ref = ingress.object_ref();
        let name = upstream_name(object_ref.name(), backend);
        self.upstreams.entry(name.clone()).or_insert_with(|| {
            UpstreamSpec::cluster_service(
                backend.service_name(),
                object_ref.namespace(),
                backend.service_port().port_name(),
            )
        });
        name
    }

    fn add_route(&mut self, route: RouteSpec) {
        self.routes.insert(route_name(&route), route);
    }
}

pub fn translate(ingress: &IngressResource) -> DesiredState {
    let mut desired = DesiredState::default();

    if ingress.rules().is_empty() {
        if let Some(backend) = ingress.default_backend() {
            let upstream_name = desired.add_upstream(ingress, backend);
            desired.add_route(route(
                PathMatcher::prefix("/"),
                String::new(),
                upstream_name,
                DEFAULT_ROUTE_WEIGHT,
            ));
        }
        return desired;
    }

    for rule in ingress.rules() {
        let virtual_host = rule.host().clone().unwrap_or_default();
        let path_count = rule.paths().len();

        for (index, path) in rule.paths().iter().enumerate() {
            let upstream_name = desired.add_upstream(ingress, path.backend());
            let matcher = match path.path().as_deref() {
                Some(path) if !path.is_empty() => PathMatcher::regex(path),
                _ => PathMatcher::prefix("/"),
            };
            let weight = i32::try_from(path_count - index).unwrap_or(i32::MAX);

            desired.add_route(route(matcher, virtual_host.clone(), upstream_name, weight));
        }
    }

    desired
}

fn route(path: PathMatcher, virtual_host: String, upstream_name: String, weight: i32) -> RouteSpec {
    RouteSpec {
        matcher: Matcher { path, virtual_host },
        destination: Destination { upstream_name },
        weight,
    }
}
