use midi_input::TriggerIdentity;
use serde::{Deserialize, Serialize};

use crate::Action;

/// A persisted binding from a trigger to a display name and an action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macro {
    /// Trigger this macro is bound to.
    pub identity: TriggerIdentity,
    /// User-editable display name.
    pub name: String,
    /// What to do when the trigger fires.
    pub action: Action,
}

impl Macro {
    /// A macro named with the identity's generated label.
    pub fn new(identity: TriggerIdentity, action: Action) -> Self {
        Self {
            identity,
            name: identity.label(),
            action,
        }
    }

    /// A macro with an explicit display name.
    pub fn named(identity: TriggerIdentity, name: impl Into<String>, action: Action) -> Self {
        Self {
            identity,
            name: name.into(),
            action,
        }
    }
}
