//! A capacity-1 notification channel for diagnostics.
//!
//! Producers never wait: offering a value while the slot is still occupied drops the new
//! value. Consumers wait until a value arrives or the shared stop token is cancelled.

use strum::IntoStaticStr;
use tokio::select;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{Receiver as MpscReceiver, Sender as MpscSender, channel};
use tokio_util::sync::CancellationToken;
use tracing::trace;

pub fn slot<T>(name: &'static str, stop: CancellationToken) -> (SlotSender<T>, SlotReceiver<T>) {
    let (tx, rx) = channel(1);
    (SlotSender { name, tx }, SlotReceiver { name, rx, stop })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Offer {
    Delivered,
    Dropped,
    Closed,
}

#[derive(Debug)]
pub struct SlotSender<T> {
    name: &'static str,
    tx: MpscSender<T>,
}

impl<T> Clone for SlotSender<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
        }
    }
}

impl<T> SlotSender<T> {
    pub fn offer(&self, value: T) -> Offer {
        match self.tx.try_send(value) {
            Ok(()) => {
                trace!("Offered value to slot {}", self.name);
                Offer::Delivered
            }
            Err(TrySendError::Full(_)) => {
                trace!("Slot {} is occupied, dropping value", self.name);
                Offer::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                trace!("Slot {} has no receiver, dropping value", self.name);
                Offer::Closed
            }
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.tx.capacity() == 0
    }
}

#[derive(Debug)]
pub struct SlotReceiver<T> {
    name: &'static str,
    rx: MpscReceiver<T>,
    stop: CancellationToken,
}

impl<T> SlotReceiver<T> {
    /// Waits for the next value. Returns `None` once the stop token is cancelled and the slot
    /// is empty, or when every sender is gone.
    pub async fn recv(&mut self) -> Option<T> {
        select! {
            biased;
            value = self.rx.recv() => value,
            () = self.stop.cancelled() => {
                trace!("Stop requested while waiting on slot {}", self.name);
                self.rx.try_recv().ok()
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}
