use macro_registry::Action;
use relaykey::RelayKey;
use tracing::debug;

use crate::ExecutionError;

/// Performs a macro's action on the host.
///
/// Called from a blocking worker, never from the dispatch loop. Success only
/// means the host accepted the injected input.
pub trait ActionExecutor: Send + Sync {
    /// Execute `action` once.
    fn execute(&self, action: &Action) -> Result<(), ExecutionError>;
}

/// Executor backed by host keyboard injection.
#[derive(Clone, Default)]
pub struct RelayExecutor {
    relay: RelayKey,
}

impl RelayExecutor {
    /// Executor injecting through `relay`.
    pub fn new(relay: RelayKey) -> Self {
        Self { relay }
    }
}

impl ActionExecutor for RelayExecutor {
    fn execute(&self, action: &Action) -> Result<(), ExecutionError> {
        debug!(kind = action.kind(), "execute_action");
        match action {
            Action::SendKeys { keys } => self.relay.send_sequence(keys)?,
            Action::WriteText { text } => self.relay.type_text(text)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_executor_runs_both_kinds() {
        let ex = RelayExecutor::new(RelayKey::new_with_mock_poster());
        assert!(ex.execute(&Action::send_keys("ctrl+c, f5").unwrap()).is_ok());
        assert!(ex.execute(&Action::write_text("hi").unwrap()).is_ok());
    }

    #[test]
    fn empty_text_surfaces_as_injection_error() {
        let ex = RelayExecutor::new(RelayKey::new_with_mock_poster());
        let bad = Action::WriteText {
            text: String::new(),
        };
        assert_eq!(
            ex.execute(&bad),
            Err(ExecutionError::Injection(relaykey::Error::Empty("text")))
        );
    }
}
