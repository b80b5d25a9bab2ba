use clap::{Args, Parser, Subcommand};
use getset::{CopyGetters, Getters};
use std::path::PathBuf;
use vg_api::constants::DEFAULT_INGRESS_CLASS;
use vg_core::instrumentation::LogFormat;
use vg_ingress::Options;
use vg_ingress::kubernetes::ConnectionConfig;
use vg_ingress::watch::WatchScope;

#[derive(Parser, Getters)]
#[command(
    name = "vg-ingress",
    about = "Converts Kubernetes Ingress objects into Vale Gateway routing objects",
    long_about = None
)]
pub struct Cli {
    #[getset(get = "pub")]
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Watch ingresses and keep the routing objects in sync
    Run(RunArgs),
    /// Print the Upstream and Route CustomResourceDefinitions
    Crds,
}

#[derive(Args, Getters, CopyGetters)]
pub struct RunArgs {
    #[getset(get = "pub")]
    #[arg(long = "kubeconfig")]
    kubeconfig: Option<PathBuf>,

    #[getset(get = "pub")]
    #[arg(env = "KUBE_CONTEXT", long = "context")]
    context: Option<String>,

    #[getset(get = "pub")]
    #[arg(env = "KUBE_CLUSTER_URL", long = "cluster-url")]
    cluster_url: Option<String>,

    #[getset(get = "pub")]
    #[arg(env = "WATCH_NAMESPACE", long = "namespace")]
    namespace: Option<String>,

    #[getset(get = "pub")]
    #[arg(default_value = DEFAULT_INGRESS_CLASS, env = "INGRESS_CLASS", long = "ingress-class")]
    ingress_class: String,

    #[getset(get_copy = "pub")]
    #[arg(default_value = "30s", env = "RESYNC_INTERVAL", long = "resync-interval")]
    resync_interval: humantime::Duration,

    #[getset(get_copy = "pub")]
    #[arg(default_value = "text", env = "LOG_FORMAT", long = "log-format")]
    log_format: LogFormat,
}

impl RunArgs {
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(
            self.kubeconfig.clone(),
            self.context.clone(),
            self.cluster_url.clone(),
        )
    }

    pub fn options(&self) -> Options {
        let watch_scope = self
            .namespace
            .clone()
            .map_or(WatchScope::All, WatchScope::Namespace);

        Options::builder()
            .resync_interval(self.resync_interval.into())
            .ingress_class(self.ingress_class.clone())
            .watch_scope(watch_scope)
            .build()
    }
}
