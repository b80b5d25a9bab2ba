//! Content-addressed names for the routing objects written on behalf of an ingress.
//!
//! Every name is a readable prefix followed by a hex digest. The digest is the leading bytes
//! of a SHA-256 over the identifying fields joined with NUL:
//!
//! * upstreams hash `(ingress name, service name, port name)` into 10 hex characters,
//! * routes hash `(prefix, regex, virtual host, upstream name, weight)` into 16.
//!
//! The prefix is lowercased and reduced to `[a-z0-9-]`, then truncated so the whole name
//! stays within the 253 character object name limit. The digest alone carries uniqueness.

use crate::ingress::Backend;
use sha2::{Digest, Sha256};
use std::fmt::Write;
use vg_api::v1alpha1::RouteSpec;

const MAX_NAME_LENGTH: usize = 253;
const MAX_LABEL_VALUE_LENGTH: usize = 63;
const UPSTREAM_DIGEST_BYTES: usize = 5;
const ROUTE_DIGEST_BYTES: usize = 8;
const OWNER_DIGEST_BYTES: usize = 5;

pub fn upstream_name(ingress_name: &str, backend: &Backend) -> String {
    let port_name = backend.service_port().port_name();
    let digest = digest(
        &[ingress_name, backend.service_name(), &port_name],
        UPSTREAM_DIGEST_BYTES,
    );
    let readable = format!("{ingress_name}-{}-{port_name}", backend.service_name());

    compose(&readable, &digest, MAX_NAME_LENGTH)
}

pub fn route_name(route: &RouteSpec) -> String {
    let prefix = tagged(route.matcher.path.prefix.as_deref());
    let regex = tagged(route.matcher.path.regex.as_deref());
    let weight = route.weight.to_string();

    let digest = digest(
        &[
            &prefix,
            &regex,
            &route.matcher.virtual_host,
            &route.destination.upstream_name,
            &weight,
        ],
        ROUTE_DIGEST_BYTES,
    );

    compose(&route.destination.upstream_name, &digest, MAX_NAME_LENGTH)
}

/// Value of the owner label. Names that fit a label value are used as they are.
pub fn owner_label_value(ingress_name: &str) -> String {
    if ingress_name.len() <= MAX_LABEL_VALUE_LENGTH {
        return ingress_name.to_string();
    }

    let digest = digest(&[ingress_name], OWNER_DIGEST_BYTES);
    compose(ingress_name, &digest, MAX_LABEL_VALUE_LENGTH)
}

fn digest(parts: &[&str], bytes: usize) -> String {
    let mut hasher = Sha256::new();
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            hasher.update([0u8]);
        }
        hasher.update(part.as_bytes());
    }

    hasher
        .finalize()
        .iter()
        .take(bytes)
        .fold(String::with_capacity(bytes * 2), |mut hex, byte| {
            let _ = write!(hex, "{byte:02x}");
            hex
        })
}

// Keeps an unset matcher apart from one set to the empty string.
fn tagged(value: Option<&str>) -> String {
    value.map_or_else(|| "~".to_string(), |value| format!("={value}"))
}

fn compose(readable: &str, digest: &str, max_length: usize) -> String {
    let budget = max_length.saturating_sub(digest.len() + 1);
    let prefix: String = sanitize(readable).chars().take(budget).collect();
    let prefix = prefix.trim_end_matches('-');

    if prefix.is_empty() {
        digest.to_string()
    } else {
        format!("{prefix}-{digest}")
    }
}

fn sanitize(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| match c.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9') => c,
            _ => '-',
        })
        .collect();

    sanitized.trim_start_matches('-').to_string()
}
