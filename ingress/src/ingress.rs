//! Read-only view of the Ingress fields the converter cares about.

use crate::kubernetes::objects::{ObjectRef, ObjectRefError};
use getset::Getters;
use k8s_openapi::api::networking::v1::{
    Ingress, IngressBackend as KubeIngressBackend, IngressRule as KubeIngressRule,
    ServiceBackendPort,
};
use kube::ResourceExt;
use std::fmt::{Display, Formatter};
use tracing::warn;
use typed_builder::TypedBuilder;
use vg_api::constants::INGRESS_CLASS_ANNOTATION;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServicePort {
    Number(i32),
    Name(String),
}

impl ServicePort {
    /// The port as written into an upstream's `servicePortName`.
    pub fn port_name(&self) -> String {
        self.to_string()
    }
}

impl Display for ServicePort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ServicePort::Number(number) => write!(f, "{number}"),
            ServicePort::Name(name) => f.write_str(name),
        }
    }
}

impl From<i32> for ServicePort {
    fn from(number: i32) -> Self {
        ServicePort::Number(number)
    }
}

impl From<&str> for ServicePort {
    fn from(name: &str) -> Self {
        ServicePort::Name(name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, TypedBuilder, Getters)]
pub struct Backend {
    #[getset(get = "pub")]
    #[builder(setter(into))]
    service_name: String,

    #[getset(get = "pub")]
    #[builder(setter(into))]
    service_port: ServicePort,
}

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder, Getters)]
pub struct IngressPath {
    #[getset(get = "pub")]
    #[builder(default, setter(strip_option, into))]
    path: Option<String>,

    #[getset(get = "pub")]
    backend: Backend,
}

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder, Getters)]
pub struct IngressRule {
    #[getset(get = "pub")]
    #[builder(default, setter(strip_option, into))]
    host: Option<String>,

    #[getset(get = "pub")]
    #[builder(default)]
    paths: Vec<IngressPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder, Getters)]
pub struct IngressResource {
    #[getset(get = "pub")]
    object_ref: ObjectRef,

    /// From the `kubernetes.io/ingress.class` annotation, falling back to
    /// `spec.ingressClassName`.
    #[getset(get = "pub")]
    #[builder(default, setter(strip_option, into))]
    class: Option<String>,

    #[getset(get = "pub")]
    #[builder(default, setter(strip_option))]
    default_backend: Option<Backend>,

    #[getset(get = "pub")]
    #[builder(default)]
    rules: Vec<IngressRule>,
}

impl TryFrom<&Ingress> for IngressResource {
    type Error = ObjectRefError;

    fn try_from(ingress: &Ingress) -> Result<Self, Self::Error> {
        let object_ref = ObjectRef::for_object(ingress)?;
        let spec = ingress.spec.as_ref();

        let class = ingress
            .annotations()
            .get(INGRESS_CLASS_ANNOTATION)
            .cloned()
            .or_else(|| spec.and_then(|spec| spec.ingress_class_name.clone()));

        let default_backend = spec
            .and_then(|spec| spec.default_backend.as_ref())
            .and_then(|backend| convert_backend(&object_ref, backend));

        let rules = spec
            .and_then(|spec| spec.rules.as_ref())
            .map(|rules| {
                rules
                    .iter()
                    .map(|rule| convert_rule(&object_ref, rule))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            object_ref,
            class,
            default_backend,
            rules,
        })
    }
}

fn convert_rule(object_ref: &ObjectRef, rule: &KubeIngressRule) -> IngressRule {
    let paths = rule
        .http
        .as_ref()
        .map(|http| {
            http.paths
                .iter()
                .filter_map(|path| {
                    convert_backend(object_ref, &path.backend).map(|backend| IngressPath {
                        path: path.path.clone(),
                        backend,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    IngressRule {
        host: rule.host.clone(),
        paths,
    }
}

fn convert_backend(object_ref: &ObjectRef, backend: &KubeIngressBackend) -> Option<Backend> {
    let Some(service) = backend.service.as_ref() else {
        warn!("Skipping non-service backend: object.ref={object_ref}");
        return None;
    };

    let service_port = match service.port.as_ref() {
        Some(ServiceBackendPort {
            number: Some(number),
            ..
        }) => ServicePort::Number(*number),
        Some(ServiceBackendPort {
            name: Some(name), ..
        }) => ServicePort::Name(name.clone()),
        _ => {
            warn!(
                "Skipping backend without a port: object.ref={object_ref} service={}",
                service.name
            );
            return None;
        }
    };

    Some(Backend {
        service_name: service.name.clone(),
        service_port,
    })
}
