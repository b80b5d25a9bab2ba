#![warn(
    clippy::pedantic,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::needless_continue,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::struct_field_names
)]

mod cli;

use crate::cli::{Cli, Command, RunArgs};
use clap::Parser;
use thiserror::Error;
use tokio::signal::ctrl_c;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use vg_core::instrumentation::init_instrumentation;
use vg_ingress::IngressConverter;
use vg_ingress::crds::{CrdsError, write_crds};
use vg_ingress::kubernetes::SetupError;

#[derive(Debug, Error)]
pub enum MainError {
    #[error("Failed to start ingress converter: {0}")]
    Setup(#[from] SetupError),
    #[error("Failed to print CRDs: {0}")]
    Crds(#[from] CrdsError),
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), MainError> {
    let cli = Cli::parse();

    match cli.command() {
        Command::Crds => Ok(write_crds(&mut std::io::stdout().lock())?),
        Command::Run(args) => run(args).await,
    }
}

async fn run(args: &RunArgs) -> Result<(), MainError> {
    init_instrumentation(args.log_format());

    let stop = CancellationToken::new();
    tokio::spawn({
        let stop = stop.clone();
        async move {
            if let Err(err) = ctrl_c().await {
                error!("Unable to listen for Ctrl+C: {err}");
                return;
            }
            info!("Received Ctrl+C, stopping");
            stop.cancel();
        }
    });

    let mut converter = IngressConverter::start(&args.connection_config(), args.options(), stop)
        .await
        .inspect_err(|err| error!("Failed to start ingress converter: {err}"))?;

    while let Some(err) = converter.errors().recv().await {
        warn!("Reconciliation error: {err}");
    }
    converter.stopped().await;

    Ok(())
}
