// SPDX-License-Identifier: MIT

//! System control documents (C10, §3 SystemControl, §4.6).

use crate::enums::{ControlAction, ControlTarget};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemControl {
    pub action: ControlAction,
    pub target: ControlTarget,
    pub sender: String,
    pub reason: String,
    pub completed: bool,
}

impl SystemControl {
    pub fn new(
        action: ControlAction,
        target: ControlTarget,
        sender: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            action,
            target,
            sender: sender.into(),
            reason: reason.into(),
            completed: false,
        }
    }

    /// Honor the request if `apply_actions` allows it (§4.6: "if one exists
    /// and `apply_actions=true`, it marks the document `completed=true` and
    /// enters its paused state"). Returns whether the document transitioned.
    pub fn acknowledge(&mut self, apply_actions: bool) -> bool {
        if apply_actions && !self.completed {
            self.completed = true;
            true
        } else {
            false
        }
    }
}
