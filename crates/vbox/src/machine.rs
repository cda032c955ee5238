//! Machine snapshot types returned by the hypervisor.

use crate::error::VboxError;
use std::fmt;
use std::str::FromStr;

/// Opaque managed object reference handed out by vboxwebsrv.
///
/// References are only valid for the web session that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef(String);

impl ObjectRef {
    /// Wrap a raw reference string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Get the raw reference string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session state of a machine, as reported by `IMachine::sessionState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Null value, never reported for a registered machine
    Null,
    /// No session attached; the machine is not running
    Unlocked,
    /// A session holds the machine lock
    Locked,
    /// A VM process is being spawned
    Spawning,
    /// The lock is being released
    Unlocking,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Null => write!(f, "Null"),
            SessionState::Unlocked => write!(f, "Unlocked"),
            SessionState::Locked => write!(f, "Locked"),
            SessionState::Spawning => write!(f, "Spawning"),
            SessionState::Unlocking => write!(f, "Unlocking"),
        }
    }
}

impl FromStr for SessionState {
    type Err = VboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Null" => Ok(SessionState::Null),
            "Unlocked" => Ok(SessionState::Unlocked),
            "Locked" => Ok(SessionState::Locked),
            "Spawning" => Ok(SessionState::Spawning),
            "Unlocking" => Ok(SessionState::Unlocking),
            other => Err(VboxError::Protocol(format!(
                "unknown session state '{other}'"
            ))),
        }
    }
}

/// A virtual machine known to the hypervisor.
///
/// Attributes are read once when the machine is enumerated or looked up, so
/// a `Machine` is a snapshot and does not track later state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    handle: ObjectRef,
    name: String,
    session_state: SessionState,
    memory_size_mb: u32,
}

impl Machine {
    /// Create a machine snapshot.
    pub fn new(
        handle: ObjectRef,
        name: impl Into<String>,
        session_state: SessionState,
        memory_size_mb: u32,
    ) -> Self {
        Self {
            handle,
            name: name.into(),
            session_state,
            memory_size_mb,
        }
    }

    /// Reference used to address this machine in further calls.
    pub fn handle(&self) -> &ObjectRef {
        &self.handle
    }

    /// Machine name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Session state at the time of the snapshot.
    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    /// Configured guest memory in MB.
    pub fn memory_size_mb(&self) -> u32 {
        self.memory_size_mb
    }

    /// A machine counts as running whenever its session is not `Unlocked`.
    pub fn is_running(&self) -> bool {
        self.session_state != SessionState::Unlocked
    }
}
