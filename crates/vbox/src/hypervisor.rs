//! Hypervisor abstraction consumed by the CLI.
//!
//! The traits mirror the subset of the VirtualBox Main API used to enumerate
//! and start machines. [`crate::WebServiceConnector`] implements them over
//! SOAP; tests substitute in-memory fakes.

use crate::error::Result;
use crate::machine::Machine;
use async_trait::async_trait;
use std::fmt;

/// Credentials passed to the web service logon.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Empty username and password, as accepted by vboxwebsrv with the null
    /// authentication library.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Front-end used for a launched VM process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Frontend {
    /// VirtualBox Qt GUI window
    #[default]
    Gui,
    /// No display
    Headless,
    /// Minimal SDL window
    Sdl,
    /// Headless VM process with a detachable GUI
    Separate,
}

impl Frontend {
    /// Parse from string (case-insensitive). Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gui" => Some(Self::Gui),
            "headless" => Some(Self::Headless),
            "sdl" => Some(Self::Sdl),
            "separate" => Some(Self::Separate),
            _ => None,
        }
    }

    /// Launch type string understood by `IMachine::launchVMProcess`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gui => "gui",
            Self::Headless => "headless",
            Self::Sdl => "sdl",
            Self::Separate => "separate",
        }
    }
}

impl fmt::Display for Frontend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wait bound for [`Progress::wait_for_completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Wait until the operation completes, however long it takes
    Infinite,
    /// Give up after the given number of milliseconds
    Millis(u32),
}

impl Timeout {
    /// Wire value; VirtualBox uses `-1` for "no timeout".
    pub fn as_wire(&self) -> i64 {
        match self {
            Timeout::Infinite => -1,
            Timeout::Millis(ms) => i64::from(*ms),
        }
    }
}

/// Opens connections to a hypervisor management endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect and authenticate against `endpoint`.
    async fn connect(
        &self,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn Hypervisor>>;
}

/// An open connection to the hypervisor.
///
/// Callers own the connection exclusively and must call
/// [`Hypervisor::disconnect`] when done; there is no async drop.
#[async_trait]
pub trait Hypervisor: Send + Sync {
    /// All registered machines, in the hypervisor's enumeration order.
    async fn machines(&self) -> Result<Vec<Machine>>;

    /// Look up a machine by name. `Ok(None)` when no such machine exists.
    async fn find_machine(&self, name: &str) -> Result<Option<Machine>>;

    /// Acquire a fresh session lease for launching a machine.
    async fn open_session(&self) -> Result<Box<dyn Session>>;

    /// Release the connection and every object obtained through it.
    async fn disconnect(self: Box<Self>) -> Result<()>;
}

/// A session lease used to spawn a VM process.
#[async_trait]
pub trait Session: Send {
    /// Start the machine's VM process with the given front-end.
    ///
    /// `environment` holds extra `NAME=VALUE` lines for the process; empty
    /// for none.
    async fn launch_vm_process(
        &mut self,
        machine: &Machine,
        frontend: Frontend,
        environment: &str,
    ) -> Result<Box<dyn Progress>>;

    /// Release the lease.
    async fn unlock_machine(self: Box<Self>) -> Result<()>;
}

/// Handle to a running hypervisor operation.
#[async_trait]
pub trait Progress: Send {
    /// Block until the operation finishes or `timeout` elapses.
    async fn wait_for_completion(&self, timeout: Timeout) -> Result<()>;

    /// Result code of the finished operation; `0` means success.
    async fn result_code(&self) -> Result<i64>;
}
