//! Test support utilities for macro-engine integration/unit tests.
//! These helpers are public to avoid dead_code warnings and are lightweight.
//! They are intended for use by the test suite only.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use macro_protocol::{MsgToUI, ipc::UiRx};
use macro_registry::Action;
use parking_lot::Mutex;

use crate::{ActionExecutor, ExecutionError};

/// Receive UI messages until `pred` matches or `timeout_ms` elapses.
pub async fn recv_until<F>(rx: &mut UiRx, timeout_ms: u64, mut pred: F) -> bool
where
    F: FnMut(&MsgToUI) -> bool,
{
    tokio::time::timeout(Duration::from_millis(timeout_ms), async {
        while let Some(msg) = rx.recv().await {
            if pred(&msg) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}

/// Collect every UI message that arrives within `window_ms`.
pub async fn drain_for(rx: &mut UiRx, window_ms: u64) -> Vec<MsgToUI> {
    let mut out = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_millis(window_ms);
    while let Ok(Some(msg)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        out.push(msg);
    }
    out
}

/// Executor that records actions instead of injecting them.
#[derive(Default)]
pub struct RecordingExecutor {
    /// Executed actions, in order.
    actions: Mutex<Vec<Action>>,
    /// Concatenated text of write-text actions.
    typed: Mutex<String>,
    /// Fail every execution when set.
    fail: AtomicBool,
    /// Artificial latency per execution.
    delay: Mutex<Duration>,
}

impl RecordingExecutor {
    /// New recorder that succeeds immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make executions fail (or succeed again).
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Block each execution for `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Number of executions attempted.
    pub fn executions(&self) -> usize {
        self.actions.lock().len()
    }

    /// Actions executed so far.
    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().clone()
    }

    /// Text "typed" so far.
    pub fn typed(&self) -> String {
        self.typed.lock().clone()
    }
}

impl ActionExecutor for RecordingExecutor {
    fn execute(&self, action: &Action) -> Result<(), ExecutionError> {
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        self.actions.lock().push(action.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExecutionError::Injection(relaykey::Error::Unavailable(
                "injection denied".into(),
            )));
        }
        if let Action::WriteText { text } = action {
            self.typed.lock().push_str(text);
        }
        Ok(())
    }
}
