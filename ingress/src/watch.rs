//! Adapts the Kubernetes ingress watch into converter events.

use crate::ingress::IngressResource;
use crate::kubernetes::objects::ObjectRef;
use futures::{Stream, StreamExt};
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::WatchStreamExt;
use kube::runtime::watcher::{self, Event};
use kube::{Api, Client};
use std::future::ready;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngressEvent {
    Applied(IngressResource),
    Deleted(ObjectRef),
    /// Full listing after the watch (re)started. Ingresses known before and missing here
    /// were deleted in the meantime.
    Relisted(Vec<IngressResource>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WatchScope {
    #[default]
    All,
    Namespace(String),
}

pub fn watch_ingresses(
    client: Client,
    scope: &WatchScope,
) -> impl Stream<Item = IngressEvent> + Send + 'static {
    let api: Api<Ingress> = match scope {
        WatchScope::All => Api::all(client),
        WatchScope::Namespace(namespace) => Api::namespaced(client, namespace),
    };
    let mut relist = RelistBuffer::default();

    watcher::watcher(api, watcher::Config::default())
        .default_backoff()
        .filter_map(move |event| {
            let event = match event {
                Ok(event) => relist.handle(event),
                Err(err) => {
                    warn!("Ingress watch failed, retrying: {err}");
                    None
                }
            };
            ready(event)
        })
}

#[derive(Debug, Default)]
struct RelistBuffer {
    pending: Option<Vec<IngressResource>>,
}

impl RelistBuffer {
    fn handle(&mut self, event: Event<Ingress>) -> Option<IngressEvent> {
        match event {
            Event::Apply(ingress) => convert(&ingress).map(IngressEvent::Applied),
            Event::Delete(ingress) => match ObjectRef::for_object(&ingress) {
                Ok(object_ref) => Some(IngressEvent::Deleted(object_ref)),
                Err(err) => {
                    warn!("Ignoring deleted ingress: {err}");
                    None
                }
            },
            Event::Init => {
                debug!("Ingress relist started");
                self.pending = Some(Vec::new());
                None
            }
            Event::InitApply(ingress) => {
                if let Some(ingress) = convert(&ingress) {
                    self.pending.get_or_insert_with(Vec::new).push(ingress);
                }
                None
            }
            Event::InitDone => {
                let ingresses = self.pending.take().unwrap_or_default();
                debug!("Ingress relist done with {} ingresses", ingresses.len());
                Some(IngressEvent::Relisted(ingresses))
            }
        }
    }
}

fn convert(ingress: &Ingress) -> Option<IngressResource> {
    IngressResource::try_from(ingress)
        .inspect_err(|err| warn!("Ignoring ingress: {err}"))
        .ok()
}
