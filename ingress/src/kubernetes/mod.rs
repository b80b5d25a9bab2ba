pub mod objects;

use getset::Getters;
use http::uri::InvalidUri;
use kube::config::{InferConfigError, KubeConfigOptions, Kubeconfig, KubeconfigError};
use kube::{Client, Config};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};
use typed_builder::TypedBuilder;
use vg_core::crypto::init_crypto;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Unable to infer Kubernetes configuration: {0}")]
    InferConfig(#[from] InferConfigError),
    #[error("Unable to load kubeconfig: {0}")]
    Kubeconfig(#[from] KubeconfigError),
    #[error("Invalid cluster URL {url}: {source}")]
    ClusterUrl { url: String, source: InvalidUri },
    #[error("Unable to create Kubernetes client: {0}")]
    Client(#[from] kube::Error),
}

/// How to reach the cluster. With nothing set, the in-cluster environment or the
/// default kubeconfig is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, TypedBuilder, Getters)]
pub struct ConnectionConfig {
    #[getset(get = "pub")]
    #[builder(default, setter(strip_option, into))]
    kubeconfig: Option<PathBuf>,

    #[getset(get = "pub")]
    #[builder(default, setter(strip_option, into))]
    context: Option<String>,

    #[getset(get = "pub")]
    #[builder(default, setter(strip_option, into))]
    cluster_url: Option<String>,
}

impl ConnectionConfig {
    pub fn new(
        kubeconfig: Option<PathBuf>,
        context: Option<String>,
        cluster_url: Option<String>,
    ) -> Self {
        Self {
            kubeconfig,
            context,
            cluster_url,
        }
    }

    pub async fn load(&self) -> Result<Config, SetupError> {
        let options = KubeConfigOptions {
            context: self.context.clone(),
            ..Default::default()
        };

        let mut config = match (&self.kubeconfig, &self.context) {
            (Some(path), _) => {
                debug!("Loading kubeconfig from {}", path.display());
                let kubeconfig = Kubeconfig::read_from(path)?;
                Config::from_custom_kubeconfig(kubeconfig, &options).await?
            }
            (None, Some(_)) => Config::from_kubeconfig(&options).await?,
            (None, None) => Config::infer().await?,
        };

        if let Some(url) = &self.cluster_url {
            config.cluster_url = url.parse().map_err(|source| SetupError::ClusterUrl {
                url: url.clone(),
                source,
            })?;
        }

        Ok(config)
    }

    pub async fn connect(&self) -> Result<Client, SetupError> {
        init_crypto();
        let config = self.load().await?;
        info!("Connecting to Kubernetes API at {}", config.cluster_url);
        Ok(Client::try_from(config)?)
    }
}
