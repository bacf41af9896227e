use std::collections::VecDeque;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use crate::foundation::core::{Region, RequestId};

/// One finished region, published as soon as it lands.
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewEvent {
    /// Request the region belongs to.
    pub request: RequestId,
    /// Width of the full image, for placing the region.
    pub image_width: u32,
    /// Where the pixels go.
    pub region: Region,
    /// Finished RGBA8 bytes of the region.
    pub pixels: Arc<Vec<u8>>,
}

/// Producer half of a preview channel. Attach it to a
/// [`RenderRequest`](crate::session::request::RenderRequest).
#[derive(Clone)]
pub struct PreviewSender {
    inner: SenderKind,
}

#[derive(Clone)]
enum SenderKind {
    Bounded(mpsc::SyncSender<PreviewEvent>),
    Unbounded(mpsc::Sender<PreviewEvent>),
}

pub(crate) enum TrySendError {
    Full(PreviewEvent),
    Disconnected,
}

impl std::fmt::Debug for PreviewSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewSender")
            .field("bounded", &self.is_bounded())
            .finish()
    }
}

impl PreviewSender {
    /// Return `true` when the channel has a fixed capacity.
    pub fn is_bounded(&self) -> bool {
        matches!(self.inner, SenderKind::Bounded(_))
    }

    pub(crate) fn try_send(&self, ev: PreviewEvent) -> Result<(), TrySendError> {
        match &self.inner {
            SenderKind::Bounded(tx) => tx.try_send(ev).map_err(|e| match e {
                mpsc::TrySendError::Full(ev) => TrySendError::Full(ev),
                mpsc::TrySendError::Disconnected(_) => TrySendError::Disconnected,
            }),
            SenderKind::Unbounded(tx) => tx.send(ev).map_err(|_| TrySendError::Disconnected),
        }
    }

    /// Blocking send; returns `false` once the receiver is gone.
    pub(crate) fn send(&self, ev: PreviewEvent) -> bool {
        match &self.inner {
            SenderKind::Bounded(tx) => tx.send(ev).is_ok(),
            SenderKind::Unbounded(tx) => tx.send(ev).is_ok(),
        }
    }
}

/// Consumer half of a preview channel.
#[derive(Debug)]
pub struct PreviewReceiver {
    rx: mpsc::Receiver<PreviewEvent>,
}

impl PreviewReceiver {
    /// Block for the next event; `None` once every sender is gone.
    pub fn recv(&self) -> Option<PreviewEvent> {
        self.rx.recv().ok()
    }

    /// Next event if one is already queued.
    pub fn try_recv(&self) -> Option<PreviewEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<PreviewEvent, mpsc::RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Every event queued right now, without blocking.
    pub fn drain(&self) -> Vec<PreviewEvent> {
        self.rx.try_iter().collect()
    }

    /// Blocking iterator that ends when every sender is gone.
    pub fn iter(&self) -> impl Iterator<Item = PreviewEvent> + '_ {
        self.rx.iter()
    }
}

/// Create a preview channel.
///
/// `Some(n)` bounds the channel to `n` queued events (at least 1); a bounded channel needs a
/// consumer running concurrently with the render, because the final flush blocks until every
/// event is accepted. `None` is unbounded.
pub fn preview_channel(capacity: Option<usize>) -> (PreviewSender, PreviewReceiver) {
    match capacity {
        Some(n) => {
            let (tx, rx) = mpsc::sync_channel(n.max(1));
            (
                PreviewSender {
                    inner: SenderKind::Bounded(tx),
                },
                PreviewReceiver { rx },
            )
        }
        None => {
            let (tx, rx) = mpsc::channel();
            (
                PreviewSender {
                    inner: SenderKind::Unbounded(tx),
                },
                PreviewReceiver { rx },
            )
        }
    }
}

/// Coordinator-side publisher: never blocks while units are in flight.
///
/// Events the channel cannot take yet wait in a backlog that is retried on every later
/// completion and flushed (blocking) by [`PreviewPublisher::finish`].
pub(crate) struct PreviewPublisher {
    sender: Option<PreviewSender>,
    backlog: VecDeque<PreviewEvent>,
    delivered: usize,
}

impl PreviewPublisher {
    pub(crate) fn new(sender: Option<PreviewSender>) -> Self {
        Self {
            sender,
            backlog: VecDeque::new(),
            delivered: 0,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.sender.is_some()
    }

    pub(crate) fn publish(&mut self, ev: PreviewEvent) {
        if self.sender.is_none() {
            return;
        }
        self.backlog.push_back(ev);
        self.pump();
    }

    /// Retry queued events without blocking.
    pub(crate) fn pump(&mut self) {
        let Some(sender) = &self.sender else {
            return;
        };
        while let Some(ev) = self.backlog.pop_front() {
            match sender.try_send(ev) {
                Ok(()) => self.delivered += 1,
                Err(TrySendError::Full(ev)) => {
                    self.backlog.push_front(ev);
                    return;
                }
                Err(TrySendError::Disconnected) => {
                    tracing::debug!("preview receiver dropped; disabling preview");
                    self.disconnect();
                    return;
                }
            }
        }
    }

    /// Deliver everything still queued, blocking as needed. Returns the number of events delivered
    /// over the publisher's lifetime.
    pub(crate) fn finish(&mut self) -> usize {
        if let Some(sender) = &self.sender {
            while let Some(ev) = self.backlog.pop_front() {
                if !sender.send(ev) {
                    tracing::debug!("preview receiver dropped during flush");
                    self.disconnect();
                    break;
                }
                self.delivered += 1;
            }
        }
        self.delivered
    }

    /// Drop undelivered events (the request failed).
    pub(crate) fn discard(&mut self) {
        self.backlog.clear();
    }

    pub(crate) fn delivered(&self) -> usize {
        self.delivered
    }

    pub(crate) fn pending(&self) -> usize {
        self.backlog.len()
    }

    fn disconnect(&mut self) {
        self.sender = None;
        self.backlog.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/preview/channel.rs"]
mod tests;
