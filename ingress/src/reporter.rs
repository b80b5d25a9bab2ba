//! Best-effort surfacing of reconciliation errors to whoever owns the converter.

use crate::instrumentation::{record_error_dropped, record_error_reported};
use crate::reconciler::ReconcileError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vg_core::sync::slot::{Offer, SlotReceiver, SlotSender, slot};

pub type ReportedError = Arc<ReconcileError>;

pub fn error_reporter(stop: CancellationToken) -> (ErrorReporter, ErrorReceiver) {
    let (tx, rx) = slot("ingress_errors", stop);
    (ErrorReporter { tx }, ErrorReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct ErrorReporter {
    tx: SlotSender<ReportedError>,
}

impl ErrorReporter {
    /// Never waits. While an earlier error is still unread the new one is dropped.
    pub fn report(&self, error: ReportedError) -> Offer {
        let offer = self.tx.offer(error);
        match offer {
            Offer::Delivered => record_error_reported(),
            Offer::Dropped | Offer::Closed => {
                debug!("Error reporter is full or closed, dropping error");
                record_error_dropped();
            }
        }
        offer
    }
}

#[derive(Debug)]
pub struct ErrorReceiver {
    rx: SlotReceiver<ReportedError>,
}

impl ErrorReceiver {
    /// Waits for the next error. Returns `None` once the converter is stopping and no error
    /// is pending.
    pub async fn recv(&mut self) -> Option<ReportedError> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ReportedError> {
        self.rx.try_recv()
    }
}
