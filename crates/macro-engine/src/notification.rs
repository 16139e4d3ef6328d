use macro_protocol::{ConnectionStatus, Mode, MsgToUI, NotifyKind, Outcome, ipc::UiTx};
use midi_input::TriggerIdentity;
use tracing::{info, trace};

use crate::{Error, Result};

/// Sends engine events and notifications to the UI layer.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: UiTx,
}

impl NotificationDispatcher {
    /// Create a new dispatcher from a UI message channel.
    pub fn new(tx: UiTx) -> Self {
        Self { tx }
    }

    /// Send a raw UI message.
    pub fn send(&self, msg: MsgToUI) -> Result<()> {
        self.tx.send(msg).map_err(|_| Error::ChannelClosed)
    }

    /// Send a message from a context that has nobody to report failure to.
    pub(crate) fn emit(&self, msg: MsgToUI) {
        if self.send(msg).is_err() {
            trace!("ui_channel_closed");
        }
    }

    /// Send a notification with the given kind, title, and text.
    pub fn send_notification(&self, kind: NotifyKind, title: String, text: String) -> Result<()> {
        // Always log notification displays at info level, regardless of urgency.
        info!(kind = ?kind, title = %title, text = %text, "notification_display");
        self.send(MsgToUI::Notify { kind, title, text })
    }

    /// Convenience helper to send an error notification.
    pub fn send_error(&self, title: &str, text: String) -> Result<()> {
        self.send_notification(NotifyKind::Error, title.to_string(), text)
    }

    /// Report a trigger reaching the dispatcher.
    pub(crate) fn trigger_fired(&self, identity: TriggerIdentity, bound: bool) {
        self.emit(MsgToUI::TriggerFired { identity, bound });
    }

    /// Report the outcome for a bound trigger.
    pub(crate) fn execution_result(&self, identity: TriggerIdentity, outcome: Outcome) {
        self.emit(MsgToUI::ExecutionResult { identity, outcome });
    }

    /// Report a connection status change.
    pub(crate) fn status(&self, status: ConnectionStatus) {
        self.emit(MsgToUI::ConnectionStatus(status));
    }

    /// Report a mode change.
    pub(crate) fn mode(&self, mode: Mode) {
        self.emit(MsgToUI::ModeChanged(mode));
    }
}
