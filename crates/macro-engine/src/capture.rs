use midi_input::TriggerIdentity;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

/// At most one pending "capture the next trigger" request.
#[derive(Default)]
pub(crate) struct Capture {
    /// Sender of the pending request.
    pending: Mutex<Option<oneshot::Sender<TriggerIdentity>>>,
}

impl Capture {
    /// Arm a capture, replacing (and thereby cancelling) any pending one.
    pub(crate) fn begin(&self) -> oneshot::Receiver<TriggerIdentity> {
        let (tx, rx) = oneshot::channel();
        if self.pending.lock().replace(tx).is_some() {
            debug!("capture_replaced");
        }
        rx
    }

    /// Offer `identity` to a pending capture. Returns true when it was
    /// consumed; an abandoned request does not consume the event.
    pub(crate) fn offer(&self, identity: TriggerIdentity) -> bool {
        match self.pending.lock().take() {
            Some(tx) => tx.send(identity).is_ok(),
            None => false,
        }
    }

    /// Drop any pending capture. Returns true when one was pending.
    pub(crate) fn cancel(&self) -> bool {
        self.pending.lock().take().is_some()
    }

    /// True when a live request is pending.
    pub(crate) fn is_pending(&self) -> bool {
        self.pending.lock().as_ref().is_some_and(|tx| !tx.is_closed())
    }
}
