use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

#[derive(
    Default,
    Deserialize,
    Serialize,
    Copy,
    Clone,
    Debug,
    JsonSchema,
    PartialEq,
    Eq,
    Hash,
    IntoStaticStr,
)]
pub enum UpstreamType {
    #[default]
    #[serde(rename = "cluster-service")]
    #[strum(serialize = "cluster-service")]
    ClusterService,
}

#[derive(Default, Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ClusterServiceSpec {
    pub service_name: String,
    pub service_namespace: String,
    pub service_port_name: String,
}

/// A routable backend service as seen by the gateway.
#[derive(
    Default, CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq, Hash,
)]
#[kube(
    kind = "Upstream",
    group = "vale-gateway.whitefamily.in",
    version = "v1alpha1",
    namespaced,
    singular = "upstream",
    plural = "upstreams"
)]
#[kube(derive = "Default")]
#[kube(derive = "PartialEq")]
pub struct UpstreamSpec {
    #[serde(rename = "type")]
    pub type_: UpstreamType,
    pub spec: ClusterServiceSpec,
}

impl UpstreamSpec {
    pub fn cluster_service<N, S, P>(service_name: N, service_namespace: S, port_name: P) -> Self
    where
        N: Into<String>,
        S: Into<String>,
        P: Into<String>,
    {
        Self {
            type_: UpstreamType::ClusterService,
            spec: ClusterServiceSpec {
                service_name: service_name.into(),
                service_namespace: service_namespace.into(),
                service_port_name: port_name.into(),
            },
        }
    }
}

/// Exactly one of `prefix` or `regex` is set on objects written by the converter.
#[derive(Default, Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq, Hash)]
pub struct PathMatcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

impl PathMatcher {
    pub fn prefix<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: Some(prefix.into()),
            regex: None,
        }
    }

    pub fn regex<S: Into<String>>(regex: S) -> Self {
        Self {
            prefix: None,
            regex: Some(regex.into()),
        }
    }
}

#[derive(Default, Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Matcher {
    pub path: PathMatcher,

    #[serde(default)]
    pub virtual_host: String,
}

#[derive(Default, Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub upstream_name: String,
}

#[derive(
    Default, CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq, Hash,
)]
#[kube(
    kind = "Route",
    group = "vale-gateway.whitefamily.in",
    version = "v1alpha1",
    namespaced,
    singular = "route",
    plural = "routes"
)]
#[kube(derive = "Default")]
#[kube(derive = "PartialEq")]
pub struct RouteSpec {
    pub matcher: Matcher,
    pub destination: Destination,
    pub weight: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{GROUP, ROUTE_CRD_KIND, UPSTREAM_CRD_KIND};
    use kube::CustomResourceExt;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_upstream_spec_layout() {
        let spec = UpstreamSpec::cluster_service("service4", "default", "foo");

        let value = serde_json::to_value(&spec).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "cluster-service",
                "spec": {
                    "serviceName": "service4",
                    "serviceNamespace": "default",
                    "servicePortName": "foo"
                }
            })
        );
    }

    #[rstest]
    #[case(PathMatcher::prefix("/"), json!({ "prefix": "/" }))]
    #[case(PathMatcher::regex("/foo/bar"), json!({ "regex": "/foo/bar" }))]
    fn test_route_spec_layout(#[case] path: PathMatcher, #[case] expected_path: serde_json::Value) {
        let spec = RouteSpec {
            matcher: Matcher {
                path,
                virtual_host: "host1".to_string(),
            },
            destination: Destination {
                upstream_name: "ingress-service1-1234".to_string(),
            },
            weight: 2,
        };

        let value = serde_json::to_value(&spec).unwrap();

        assert_eq!(
            value,
            json!({
                "matcher": { "path": expected_path, "virtualHost": "host1" },
                "destination": { "upstreamName": "ingress-service1-1234" },
                "weight": 2
            })
        );
    }

    #[test]
    fn test_route_spec_missing_virtual_host_defaults_to_empty() {
        let spec: RouteSpec = serde_yaml::from_str(
            r#"
matcher:
  path:
    prefix: /
destination:
  upstreamName: some-upstream
weight: 0
"#,
        )
        .unwrap();

        assert_eq!(spec.matcher.virtual_host, "");
        assert_eq!(spec.matcher.path, PathMatcher::prefix("/"));
    }

    #[test]
    fn test_crd_names() {
        let upstream_crd = Upstream::crd();
        let route_crd = Route::crd();

        assert_eq!(
            upstream_crd.metadata.name.as_deref(),
            Some("upstreams.vale-gateway.whitefamily.in")
        );
        assert_eq!(upstream_crd.spec.group, GROUP);
        assert_eq!(upstream_crd.spec.names.kind, UPSTREAM_CRD_KIND);
        assert_eq!(upstream_crd.spec.scope, "Namespaced");

        assert_eq!(
            route_crd.metadata.name.as_deref(),
            Some("routes.vale-gateway.whitefamily.in")
        );
        assert_eq!(route_crd.spec.names.kind, ROUTE_CRD_KIND);
    }

    #[test]
    fn test_upstream_type_name() {
        let name: &'static str = UpstreamType::ClusterService.into();
        assert_eq!(name, "cluster-service");
    }
}
