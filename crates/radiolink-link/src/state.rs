use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::host::HostSink;

/// Health of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    #[default]
    Stopped,
    Starting,
    Running,
    Error,
}

impl LinkState {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkState::Stopped => "stopped",
            LinkState::Starting => "starting",
            LinkState::Running => "running",
            LinkState::Error => "error",
        }
    }

    /// Whether the send scheduler may write in this state.
    pub fn allows_sends(self) -> bool {
        !matches!(self, LinkState::Stopped)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to [`LinkStateMachine::set_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Starting,
    Running,
    Error,
    ClearError,
    Stopped,
}

/// Owns the [`LinkState`] and reports every transition to the host.
pub struct LinkStateMachine {
    state: Mutex<LinkState>,
    sink: Arc<dyn HostSink>,
}

impl LinkStateMachine {
    pub fn new(sink: Arc<dyn HostSink>) -> Self {
        Self {
            state: Mutex::new(LinkState::Stopped),
            sink,
        }
    }

    /// Current state.
    pub fn state(&self) -> LinkState {
        *self.lock()
    }

    /// Apply `action` and return the resulting state.
    ///
    /// `Error` only applies from Running and `ClearError` only from Error;
    /// Error never moves straight to Starting. Ignored actions are not
    /// reported. Applied actions are reported while the lock is held so the
    /// host sees reports in transition order.
    pub fn set_state(&self, action: StateAction) -> LinkState {
        let mut state = self.lock();
        self.apply(&mut state, action)
    }

    /// Apply `action` only when the current state is `expected`.
    pub fn set_state_from(&self, expected: LinkState, action: StateAction) -> LinkState {
        let mut state = self.lock();
        if *state != expected {
            return *state;
        }
        self.apply(&mut state, action)
    }

    fn lock(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    fn apply(&self, state: &mut LinkState, action: StateAction) -> LinkState {
        let from = *state;

        let to = match (action, from) {
            (StateAction::Error, LinkState::Running) => LinkState::Error,
            (StateAction::Error, _) => return ignored(action, from),
            (StateAction::ClearError, LinkState::Error) => LinkState::Running,
            (StateAction::ClearError, _) => return ignored(action, from),
            (StateAction::Starting, LinkState::Error) => return ignored(action, from),
            (StateAction::Starting, _) => LinkState::Starting,
            (StateAction::Running, _) => LinkState::Running,
            (StateAction::Stopped, _) => LinkState::Stopped,
        };

        *state = to;
        info!(from = %from, to = %to, "link state changed");
        self.sink.on_state_changed(to);
        to
    }
}

fn ignored(action: StateAction, state: LinkState) -> LinkState {
    debug!(?action, state = %state, "state action ignored");
    state
}
