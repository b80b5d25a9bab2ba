use crate::store::{RoutingKind, WriteAction};
use opentelemetry::KeyValue;
use opentelemetry::global::meter;
use opentelemetry::metrics::{Counter, Meter};
use std::sync::LazyLock;

pub(crate) static METER: LazyLock<Meter> = LazyLock::new(|| meter("vg-ingress"));

static RECONCILE_PASSES: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("ingress_reconcile_passes")
        .with_description("Number of reconciliation passes, by filter outcome")
        .build()
});

static OBJECTS_WRITTEN: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("ingress_objects_written")
        .with_description("Number of routing objects created, updated or deleted")
        .build()
});

static ERRORS_REPORTED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("ingress_errors_reported")
        .with_description("Number of reconciliation errors handed to the error reporter")
        .build()
});

static ERRORS_DROPPED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("ingress_errors_dropped")
        .with_description("Number of reconciliation errors dropped by a full error reporter")
        .build()
});

#[inline]
pub(crate) fn record_reconcile_pass(outcome: &'static str) {
    RECONCILE_PASSES.add(1, &[KeyValue::new("outcome", outcome)]);
}

#[inline]
pub(crate) fn record_object_written(action: WriteAction, kind: RoutingKind) {
    let action: &'static str = action.into();
    let kind: &'static str = kind.into();
    OBJECTS_WRITTEN.add(
        1,
        &[KeyValue::new("action", action), KeyValue::new("kind", kind)],
    );
}

#[inline]
pub(crate) fn record_error_reported() {
    ERRORS_REPORTED.add(1, &[]);
}

#[inline]
pub(crate) fn record_error_dropped() {
    ERRORS_DROPPED.add(1, &[]);
}
