//! Error types for vboxctl commands.

use thiserror::Error;
use vboxctl_vbox::VboxError;

/// Failures that turn a command into an `ERROR` reply.
#[derive(Debug, Error)]
pub enum CommandError {
    /// `run` without a machine name
    #[error("no machine name given")]
    MissingMachineName,

    /// No registered machine with this name
    #[error("machine not found: {0}")]
    MachineNotFound(String),

    /// Starting the machine would reach the memory limit
    #[error("memory budget exceeded: {required_mb} MB required, limit is {limit_mb} MB")]
    MemoryBudgetExceeded {
        /// Running machines plus the target machine
        required_mb: u64,
        /// Limit given on the command line
        limit_mb: i64,
    },

    /// Error from the hypervisor client
    #[error("VirtualBox error: {0}")]
    Vbox(#[from] VboxError),
}
