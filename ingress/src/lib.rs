#![warn(
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented
)]
#![allow(
    clippy::needless_continue,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::struct_field_names
)]

pub mod converter;
pub mod crds;
pub mod filter;
pub mod ingress;
mod instrumentation;
pub mod kubernetes;
pub mod naming;
pub mod options;
pub mod reconciler;
pub mod reporter;
pub mod store;
pub mod translator;
pub mod watch;

pub use converter::IngressConverter;
pub use options::Options;
