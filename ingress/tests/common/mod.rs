#![allow(dead_code)]

use k8s_openapi::api::networking::v1::Ingress;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use vg_ingress::ingress::{Backend, IngressPath, IngressResource, IngressRule, ServicePort};
use vg_ingress::kubernetes::objects::ObjectRef;
use vg_ingress::store::MemoryStore;
use vg_ingress::watch::IngressEvent;
use vg_ingress::{IngressConverter, Options};

pub const NAMESPACE: &str = "default";
pub const CLASS: &str = "vale-gateway";

/// Polls `$condition` every 10ms until it holds, failing after `$timeout` milliseconds of
/// tokio time.
#[macro_export]
macro_rules! assert_eventually {
    ($condition:expr, $timeout:expr) => {{
        use std::time::Duration;
        use tokio::time::Instant;
        let start = Instant::now();
        let timeout_duration = Duration::from_millis($timeout);

        loop {
            if $condition {
                break;
            }

            if start.elapsed() > timeout_duration {
                panic!(
                    "Condition `{}` was not met within {}ms",
                    stringify!($condition),
                    $timeout
                );
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }};
}

pub fn object_ref(name: &str) -> ObjectRef {
    ObjectRef::of_kind::<Ingress>()
        .namespace(NAMESPACE)
        .name(name)
        .build()
}

pub fn backend<P: Into<ServicePort>>(service: &str, port: P) -> Backend {
    Backend::builder()
        .service_name(service)
        .service_port(port)
        .build()
}

pub fn path(path: &str, backend: Backend) -> IngressPath {
    IngressPath::builder().path(path).backend(backend).build()
}

pub fn default_backend_ingress(name: &str) -> IngressResource {
    IngressResource::builder()
        .object_ref(object_ref(name))
        .class(CLASS)
        .default_backend(backend("somethingsomethingsomething", 8080))
        .build()
}

pub fn scenario_rules() -> Vec<IngressRule> {
    vec![
        IngressRule::builder()
            .host("host1")
            .paths(vec![
                path("/foo/bar", backend("service1", 1234)),
                path("/foo/baz", backend("service2", 3456)),
            ])
            .build(),
        IngressRule::builder()
            .host("host2")
            .paths(vec![
                path("/foo/bar", backend("service3", 1234)),
                path("/straw/berry", backend("service4", "foo")),
                path("/bat/girl", backend("service4", "foo")),
            ])
            .build(),
    ]
}

pub fn scenario_ingress(name: &str) -> IngressResource {
    IngressResource::builder()
        .object_ref(object_ref(name))
        .class(CLASS)
        .rules(scenario_rules())
        .build()
}

/// The scenario ingress with a different class marker, or none.
pub fn scenario_ingress_with_class(name: &str, class: Option<&str>) -> IngressResource {
    let builder = IngressResource::builder()
        .object_ref(object_ref(name))
        .rules(scenario_rules());
    match class {
        Some(class) => builder.class(class).build(),
        None => builder.build(),
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub converter: IngressConverter,
    pub stop: CancellationToken,
    events: UnboundedSender<IngressEvent>,
}

impl Harness {
    pub fn start(options: Options) -> Self {
        let store = Arc::new(MemoryStore::new());
        let (events, rx) = unbounded_channel();
        let stop = CancellationToken::new();
        let converter = IngressConverter::spawn(
            store.clone(),
            UnboundedReceiverStream::new(rx),
            options,
            stop.clone(),
        );

        Self {
            store,
            converter,
            stop,
            events,
        }
    }

    pub fn send(&self, event: IngressEvent) {
        self.events
            .send(event)
            .expect("Converter should be receiving events");
    }

    pub fn upstream_count(&self) -> usize {
        self.store.upstreams_in(NAMESPACE).len()
    }

    pub fn route_count(&self) -> usize {
        self.store.routes_in(NAMESPACE).len()
    }

    pub async fn shutdown(self) {
        self.stop.cancel();
        self.converter.stopped().await;
    }
}
