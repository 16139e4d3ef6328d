//! midimacros engine
//!
//! Turns controller messages into host keyboard macros:
//! - owns the device connection and forwards its traffic ([`Engine::connect`])
//! - normalizes messages and debounces per trigger identity
//! - gates execution on the mode (test/live) and runs actions off the loop
//! - writes every registry mutation through to the [`MacroStore`]
//! - emits status, trigger and outcome messages to the UI layer
//!
//! The public surface is [`Engine`] plus the seams it is built from
//! ([`ActionExecutor`], [`ModeGate`], [`Dispatcher`]).
use std::{path::Path, result::Result as StdResult, sync::Arc, time::Duration};

mod audit;
mod capture;
mod config;
mod dispatch;
mod error;
mod executor;
mod listener;
mod mode;
mod notification;
pub mod test_support;

use macro_protocol::{ConnectionStatus, Mode, MsgToUI, NotifyKind, Outcome, ipc::UiTx};
use macro_registry::{Action, Macro, MacroStore, PersistenceError, Registry};
use midi_input::{
    MidiTransport, Normalizer, RawMessage, TransportError, TriggerEvent, TriggerIdentity,
};
use parking_lot::Mutex;
use tokio::{
    sync::{mpsc, oneshot},
    task::{self, JoinHandle},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

pub use audit::AuditTrail;
pub use config::{AUDIT_FILE, DEBUG_ENV, DEFAULT_DEBOUNCE, EngineConfig};
pub use dispatch::{Decision, Dispatcher};
pub use error::{Error, ExecutionError, Result};
pub use executor::{ActionExecutor, RelayExecutor};
pub use mode::ModeGate;
pub use notification::NotificationDispatcher;

use capture::Capture;
use listener::{Clock, Listener, ListenerEvent};

/// Engine coordinates the device listener, dispatch, execution and the registry.
///
/// Construct via [`Engine::new`], start the dispatch loop with
/// [`Engine::start`], then drive it from the control surface. All handles
/// are cheap clones of the same engine.
#[derive(Clone)]
pub struct Engine {
    /// Tunables.
    config: Arc<EngineConfig>,
    /// Macro registry shared with the control surface.
    registry: Arc<Registry>,
    /// Persistence adapter.
    store: Arc<dyn MacroStore>,
    /// Serializes snapshot saves so the last save holds the newest state.
    persist_lock: Arc<Mutex<()>>,
    /// Set when the stored snapshot must not be overwritten.
    save_disabled: Option<Arc<str>>,
    /// Mode and connection status.
    gate: Arc<ModeGate>,
    /// Debounce state; touched only by dispatch.
    dispatcher: Arc<Mutex<Dispatcher>>,
    /// Raw message filter.
    normalizer: Normalizer,
    /// Action executor.
    executor: Arc<dyn ActionExecutor>,
    /// Notification dispatcher
    notifier: NotificationDispatcher,
    /// Device lifecycle.
    listener: Arc<Listener>,
    /// Receiving end of the listener channel until the loop starts.
    events_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<ListenerEvent>>>>,
    /// Pending trigger capture.
    capture: Arc<Capture>,
    /// Audit trail, when enabled.
    audit: Option<Arc<AuditTrail>>,
}

impl Engine {
    /// Create a new engine.
    ///
    /// The registry is restored from `store`; a failed load starts empty and
    /// is reported as a warning notification.
    pub fn new(
        config: EngineConfig,
        transport: Arc<dyn MidiTransport>,
        store: Arc<dyn MacroStore>,
        executor: Arc<dyn ActionExecutor>,
        event_tx: UiTx,
    ) -> Self {
        let notifier = NotificationDispatcher::new(event_tx);
        let (registry, save_disabled) = Self::restore_registry(store.as_ref(), &notifier);
        let audit = if config.audit {
            Self::open_audit(&config.audit_path())
        } else {
            None
        };
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            normalizer: Normalizer::new(config.release_velocity),
            dispatcher: Arc::new(Mutex::new(Dispatcher::new(config.debounce))),
            config: Arc::new(config),
            registry: Arc::new(registry),
            store,
            persist_lock: Arc::new(Mutex::new(())),
            save_disabled,
            gate: Arc::new(ModeGate::default()),
            executor,
            notifier,
            listener: Arc::new(Listener::new(transport, tx, Clock::new())),
            events_rx: Arc::new(Mutex::new(Some(rx))),
            capture: Arc::new(Capture::default()),
            audit,
        }
    }

    /// Load the persisted registry, falling back to an empty one.
    ///
    /// Whenever stored records are dropped (unreadable file, bad records,
    /// duplicates) the stored snapshot is backed up first, since the next
    /// write-through replaces it. If the backup fails too, saving is disabled
    /// and the reason returned.
    fn restore_registry(
        store: &dyn MacroStore,
        notifier: &NotificationDispatcher,
    ) -> (Registry, Option<Arc<str>>) {
        let (registry, problem) = match store.load() {
            Ok(snapshot) => {
                let (registry, report) = Registry::from_snapshot(snapshot);
                info!(macros = report.restored, "registry_restored");
                let problem = report.has_anomalies().then(|| {
                    format!(
                        "Skipped {} duplicate and {} unreadable macro(s)",
                        report.duplicates.len(),
                        report.invalid.len()
                    )
                });
                (registry, problem)
            }
            Err(e) => {
                warn!(error = %e, "registry_load_failed");
                (Registry::new(), Some(format!("{e}; starting with no macros")))
            }
        };
        let Some(problem) = problem else {
            return (registry, None);
        };
        let (text, disabled) = match store.back_up() {
            Ok(Some(backup)) => (
                format!("{problem}. Original kept at {}", backup.display()),
                None,
            ),
            Ok(None) => (problem, None),
            Err(e) => {
                warn!(error = %e, "snapshot_backup_failed");
                let reason: Arc<str> = format!("stored macros could not be backed up: {e}").into();
                (format!("{problem}. Saving disabled: {reason}"), Some(reason))
            }
        };
        Self::notify(notifier, NotifyKind::Warn, "Macros not fully loaded", text);
        (registry, disabled)
    }

    /// Open the audit trail; a failure disables it for this run.
    fn open_audit(path: &Path) -> Option<Arc<AuditTrail>> {
        match AuditTrail::open(path) {
            Ok(trail) => {
                info!(path = %path.display(), "audit_trail_enabled");
                Some(Arc::new(trail))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "audit_trail_unavailable");
                None
            }
        }
    }

    /// Best-effort user notification.
    fn notify(notifier: &NotificationDispatcher, kind: NotifyKind, title: &str, text: String) {
        if notifier
            .send_notification(kind, title.to_string(), text)
            .is_err()
        {
            trace!("ui_channel_closed");
        }
    }

    /// Best-effort error notification.
    fn report_error(&self, title: &str, text: String) {
        if self.notifier.send_error(title, text).is_err() {
            trace!("ui_channel_closed");
        }
    }

    /// Spawn the dispatch loop. It drains listener traffic in receipt order
    /// until `cancel` fires. Can be started once per engine.
    pub fn start(&self, cancel: CancellationToken) -> Result<JoinHandle<()>> {
        let mut rx = self.events_rx.lock().take().ok_or(Error::AlreadyRunning)?;
        let eng = self.clone();
        let window = self.dispatcher.lock().window();
        let release_velocity = self.normalizer.release_velocity();
        Ok(tokio::spawn(async move {
            debug!(
                debounce_ms = window.as_millis() as u64,
                release_velocity,
                "dispatch_loop_started"
            );
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    ev = rx.recv() => match ev {
                        Some(ev) => eng.on_listener_event(ev),
                        None => break,
                    },
                }
            }
            debug!("dispatch_loop_stopped");
        }))
    }

    /// Route one listener event, dropping traffic from stale connections.
    fn on_listener_event(&self, ev: ListenerEvent) {
        match ev {
            ListenerEvent::Message {
                generation,
                raw,
                at,
            } => {
                if generation != self.listener.generation() {
                    trace!(generation, "stale_message_dropped");
                    return;
                }
                self.handle_message(&raw, at);
            }
            ListenerEvent::Failed { generation, reason } => {
                if generation != self.listener.generation() {
                    trace!(generation, "stale_failure_dropped");
                    return;
                }
                self.on_transport_failure(generation, reason);
            }
        }
    }

    /// Mark the device as failed and release its port.
    fn on_transport_failure(&self, generation: u64, reason: String) {
        warn!(reason = %reason, "midi_transport_failed");
        self.set_status(ConnectionStatus::Error { reason });
        self.cancel_capture();
        let listener = self.listener.clone();
        task::spawn_blocking(move || listener.release(generation));
    }

    /// Process one raw message received at `at` on the engine clock.
    ///
    /// Runs the same path as the dispatch loop: audit, normalize, capture,
    /// dispatch. Returns the dispatch decision, or `None` when the message
    /// was filtered or consumed by a capture. Must be called within a Tokio
    /// runtime.
    pub fn handle_message(&self, raw: &RawMessage, at: Duration) -> Option<Decision> {
        if let Some(audit) = &self.audit {
            let bound = TriggerIdentity::of(raw).is_some_and(|id| self.registry.contains(&id));
            audit.raw(raw, bound);
        }
        let event = self.normalizer.normalize(raw, at)?;
        if self.capture.offer(event.identity) {
            info!(identity = %event.identity, "trigger_captured");
            if let Some(audit) = &self.audit {
                audit.captured(event.identity);
            }
            self.notifier.emit(MsgToUI::TriggerCaptured {
                identity: event.identity,
            });
            return None;
        }
        Some(self.dispatch(&event))
    }

    /// Run the debounce decision for `event` and act on it.
    ///
    /// Every event produces a trigger-fired message; bound events also
    /// produce an execution result, delivered after the action finishes for
    /// live executions. Must be called within a Tokio runtime.
    pub fn dispatch(&self, event: &TriggerEvent) -> Decision {
        let identity = event.identity;
        let decision = self
            .dispatcher
            .lock()
            .decide(event, &self.registry, &self.gate);
        debug!(%identity, decision = decision.name(), "dispatch_decision");
        if let Some(audit) = &self.audit {
            audit.decision(identity, &decision);
        }
        self.notifier.trigger_fired(identity, decision.is_bound());
        match &decision {
            Decision::Execute(m) => self.spawn_execution(m.clone()),
            other => {
                if let Some(outcome) = other.immediate_outcome() {
                    self.notifier.execution_result(identity, outcome);
                }
            }
        }
        decision
    }

    /// Execute on a blocking worker so injection never delays the loop.
    fn spawn_execution(&self, m: Macro) {
        let executor = self.executor.clone();
        let action = m.action.clone();
        let handle = task::spawn_blocking(move || executor.execute(&action));
        let eng = self.clone();
        tokio::spawn(async move {
            let result = match handle.await {
                Ok(r) => r,
                Err(e) => Err(ExecutionError::Worker(e.to_string())),
            };
            eng.finish_execution(&m, result);
        });
    }

    /// Report the outcome of a finished execution.
    fn finish_execution(&self, m: &Macro, result: StdResult<(), ExecutionError>) {
        let outcome = match result {
            Ok(()) => {
                info!(identity = %m.identity, name = %m.name, "macro_executed");
                Outcome::Success
            }
            Err(e) => {
                warn!(identity = %m.identity, name = %m.name, error = %e, "macro_failed");
                self.report_error("Macro failed", format!("{}: {e}", m.name));
                Outcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        if let Some(audit) = &self.audit {
            audit.outcome(m.identity, &outcome);
        }
        self.notifier.execution_result(m.identity, outcome);
    }

    // ---- device lifecycle ----

    /// Available MIDI input ports.
    pub async fn ports(&self) -> Result<Vec<String>> {
        let listener = self.listener.clone();
        let ports = task::spawn_blocking(move || listener.ports())
            .await
            .map_err(|e| Error::Join(e.to_string()))??;
        Ok(ports)
    }

    /// Open `port`, replacing any open connection.
    ///
    /// Failure sets the status to `Error` and is also returned; retrying is
    /// up to the caller. A connect overtaken by a later connect or disconnect
    /// leaves the status to that call.
    pub async fn connect(&self, port: &str) -> Result<()> {
        let listener = self.listener.clone();
        let name = port.to_string();
        let res = task::spawn_blocking(move || listener.connect(&name))
            .await
            .map_err(|e| Error::Join(e.to_string()))?;
        match res {
            Ok(()) => {
                info!(port, "midi_connected");
                self.set_status(ConnectionStatus::Connected {
                    port: port.to_string(),
                });
                Ok(())
            }
            Err(e @ TransportError::Superseded(_)) => {
                debug!(port, "midi_connect_superseded");
                Err(e.into())
            }
            Err(e) => {
                warn!(port, error = %e, "midi_connect_failed");
                self.set_status(ConnectionStatus::Error {
                    reason: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Close the open connection and cancel any pending capture.
    pub async fn disconnect(&self) -> Result<()> {
        let listener = self.listener.clone();
        let closed = task::spawn_blocking(move || listener.disconnect())
            .await
            .map_err(|e| Error::Join(e.to_string()))?;
        if let Some(port) = closed {
            info!(port, "midi_disconnected");
        }
        self.set_status(ConnectionStatus::Disconnected);
        self.cancel_capture();
        Ok(())
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.gate.get_status()
    }

    /// Update the connection status, emitting only on change.
    fn set_status(&self, status: ConnectionStatus) {
        if self.gate.set_status(status.clone()) {
            self.notifier.status(status);
        }
    }

    // ---- mode ----

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.gate.get_mode()
    }

    /// Switch between test and live.
    pub fn set_mode(&self, mode: Mode) {
        if self.gate.set_mode(mode) {
            info!(mode = %mode, "mode_changed");
            if let Some(audit) = &self.audit {
                audit.record(&format!("MODE {mode}"));
            }
            self.notifier.mode(mode);
        }
    }

    // ---- capture ----

    /// Arm a capture of the next trigger. The trigger is consumed (not
    /// dispatched). Arming again, or disconnecting, cancels the pending one.
    pub fn begin_capture(&self) -> oneshot::Receiver<TriggerIdentity> {
        info!("capture_armed");
        self.capture.begin()
    }

    /// Arm a capture and wait for the trigger.
    pub async fn capture_trigger(&self) -> Result<TriggerIdentity> {
        self.begin_capture()
            .await
            .map_err(|_| Error::CaptureCancelled)
    }

    /// Drop a pending capture and tell the UI.
    fn cancel_capture(&self) {
        if self.capture.cancel() {
            info!("capture_cancelled");
            self.notifier.emit(MsgToUI::CaptureCancelled);
        }
    }

    /// True while a capture is waiting for a trigger.
    pub fn capture_pending(&self) -> bool {
        self.capture.is_pending()
    }

    // ---- registry ----

    /// Create or replace the macro for `identity`. Without a name the
    /// identity's label is used.
    pub fn bind(
        &self,
        identity: TriggerIdentity,
        name: Option<String>,
        action: Action,
    ) -> Result<()> {
        let name = name.unwrap_or_else(|| identity.label());
        self.registry.upsert(identity, name, action)?;
        info!(%identity, "macro_bound");
        self.committed()
    }

    /// Rename an existing macro.
    pub fn rename(&self, identity: &TriggerIdentity, name: impl Into<String>) -> Result<()> {
        self.registry.rename(identity, name)?;
        info!(%identity, "macro_renamed");
        self.committed()
    }

    /// Replace the action of an existing macro.
    pub fn set_action(&self, identity: &TriggerIdentity, action: Action) -> Result<()> {
        self.registry.set_action(identity, action)?;
        info!(%identity, "macro_action_changed");
        self.committed()
    }

    /// Delete a macro.
    pub fn remove(&self, identity: &TriggerIdentity) -> Result<Macro> {
        let m = self.registry.remove(identity)?;
        self.dispatcher.lock().forget(identity);
        info!(%identity, "macro_removed");
        self.committed()?;
        Ok(m)
    }

    /// The macro bound to `identity`.
    pub fn lookup(&self, identity: &TriggerIdentity) -> Option<Macro> {
        self.registry.lookup(identity)
    }

    /// All macros in display order.
    pub fn macros(&self) -> Vec<Macro> {
        self.registry.list()
    }

    /// Shared registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn committed(&self) -> Result<()> {
        self.notifier.emit(MsgToUI::RegistryChanged);
        self.persist()
    }

    /// Write the registry through to the store.
    ///
    /// A failure is reported as an error notification and returned; the
    /// in-memory state stays authoritative until the next successful save.
    pub fn persist(&self) -> Result<()> {
        let _guard = self.persist_lock.lock();
        let snapshot = self.registry.snapshot();
        let saved = match &self.save_disabled {
            Some(reason) => Err(PersistenceError::Disabled(reason.to_string())),
            None => self.store.save(&snapshot),
        };
        if let Err(e) = saved {
            warn!(error = %e, "snapshot_save_failed");
            self.report_error("Save failed", e.to_string());
            return Err(e.into());
        }
        trace!(macros = snapshot.macros.len(), "snapshot_persisted");
        Ok(())
    }

    // ---- introspection ----

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Last accepted fire of `identity` on the engine clock.
    pub fn last_fired(&self, identity: &TriggerIdentity) -> Option<Duration> {
        self.dispatcher.lock().last_fired(identity)
    }

    /// Number of identities with debounce state.
    pub fn tracked_identities(&self) -> usize {
        self.dispatcher.lock().tracked()
    }

    /// Audit trail location, when enabled.
    pub fn audit_path(&self) -> Option<&Path> {
        self.audit.as_deref().map(AuditTrail::path)
    }
}
