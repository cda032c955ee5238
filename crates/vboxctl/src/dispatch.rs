//! Command dispatcher: connect, run one command, disconnect.

use crate::command::{Command, Invocation, RunRequest};
use crate::error::CommandError;
use crate::reply::Reply;
use vboxctl_vbox::{Connector, Credentials, Frontend, Hypervisor, Machine, Session, Timeout};

/// Whether `required_mb` stays strictly below `limit_mb`.
///
/// A total equal to the limit does not fit. Negative limits never fit.
pub fn fits_memory_budget(required_mb: u64, limit_mb: i64) -> bool {
    u64::try_from(limit_mb).is_ok_and(|limit| required_mb < limit)
}

/// Executes parsed invocations against a hypervisor.
pub struct Dispatcher<C> {
    connector: C,
    frontend: Frontend,
}

impl<C: Connector> Dispatcher<C> {
    /// Create a dispatcher that launches machines with the GUI front-end.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            frontend: Frontend::Gui,
        }
    }

    /// Use a different front-end for launched machines.
    pub fn with_frontend(mut self, frontend: Frontend) -> Self {
        self.frontend = frontend;
        self
    }

    /// Run one invocation to completion.
    ///
    /// Never fails: every error is logged and reported as [`Reply::Error`].
    pub async fn dispatch(&self, invocation: Invocation) -> Reply {
        match invocation {
            Invocation::Ping => {
                tracing::debug!("Ping");
                Reply::Ok
            }
            Invocation::Remote { endpoint, command } => self.remote(&endpoint, command).await,
        }
    }

    async fn remote(&self, endpoint: &str, command: Command) -> Reply {
        let vbox = match self.connector.connect(endpoint, &Credentials::empty()).await {
            Ok(vbox) => vbox,
            Err(e) => {
                tracing::error!(endpoint, error = %e, "Failed to connect");
                return Reply::Error;
            }
        };

        let keyword = command.keyword().to_string();
        let reply = match self.execute(vbox.as_ref(), command).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(command = %keyword, error = %e, "Command failed");
                Reply::Error
            }
        };

        // Released on every path; a failed logoff does not change the reply.
        if let Err(e) = vbox.disconnect().await {
            tracing::warn!(endpoint, error = %e, "Failed to disconnect");
        }

        reply
    }

    async fn execute(&self, vbox: &dyn Hypervisor, command: Command) -> Result<Reply, CommandError> {
        match command {
            Command::List => {
                let machines = vbox.machines().await?;
                Ok(Reply::Names(names(machines.iter())))
            }
            Command::ListRunning => {
                let machines = vbox.machines().await?;
                Ok(Reply::Names(names(machines.iter().filter(|m| m.is_running()))))
            }
            Command::Run(request) => self.run(vbox, request).await,
            Command::Unsupported(keyword) => Ok(Reply::Unsupported(keyword)),
        }
    }

    async fn run(&self, vbox: &dyn Hypervisor, request: RunRequest) -> Result<Reply, CommandError> {
        let name = request.machine.ok_or(CommandError::MissingMachineName)?;

        let machine = vbox
            .find_machine(&name)
            .await?
            .ok_or_else(|| CommandError::MachineNotFound(name.clone()))?;

        if machine.is_running() {
            tracing::info!(
                machine = %name,
                state = %machine.session_state(),
                "Machine already running"
            );
            return Ok(Reply::Ok);
        }

        if let Some(limit_mb) = request.memory_limit_mb {
            // Not atomic with the launch below; concurrent invocations can both pass.
            let running_mb: u64 = vbox
                .machines()
                .await?
                .iter()
                .filter(|m| m.is_running())
                .map(|m| u64::from(m.memory_size_mb()))
                .sum();
            let required_mb = running_mb + u64::from(machine.memory_size_mb());

            tracing::debug!(machine = %name, running_mb, required_mb, limit_mb, "Memory budget check");
            if !fits_memory_budget(required_mb, limit_mb) {
                return Err(CommandError::MemoryBudgetExceeded {
                    required_mb,
                    limit_mb,
                });
            }
        }

        self.launch(vbox, &machine).await?;
        Ok(Reply::Ok)
    }

    /// Launch under a fresh session lease, which is unlocked whatever happens.
    async fn launch(&self, vbox: &dyn Hypervisor, machine: &Machine) -> Result<(), CommandError> {
        let mut session = vbox.open_session().await?;

        let launched = launch_and_wait(session.as_mut(), machine, self.frontend).await;
        let unlocked = session.unlock_machine().await;

        if let (Err(_), Err(e)) = (&launched, &unlocked) {
            tracing::debug!(error = %e, "Session unlock after failed launch also failed");
        }
        launched?;
        unlocked?;
        Ok(())
    }
}

async fn launch_and_wait(
    session: &mut dyn Session,
    machine: &Machine,
    frontend: Frontend,
) -> vboxctl_vbox::Result<()> {
    let progress = session.launch_vm_process(machine, frontend, "").await?;
    progress.wait_for_completion(Timeout::Infinite).await?;

    match progress.result_code().await {
        Ok(0) => tracing::info!(machine = machine.name(), "Machine launched"),
        Ok(code) => tracing::warn!(
            machine = machine.name(),
            result_code = code,
            "Launch completed with a failure result code"
        ),
        Err(e) => tracing::warn!(
            machine = machine.name(),
            error = %e,
            "Could not read launch result code"
        ),
    }
    Ok(())
}

fn names<'a>(machines: impl Iterator<Item = &'a Machine>) -> Vec<String> {
    machines.map(|m| m.name().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_is_exclusive_of_limit() {
        assert!(fits_memory_budget(4095, 4096));
        assert!(!fits_memory_budget(4096, 4096));
        assert!(!fits_memory_budget(4097, 4096));
    }

    #[test]
    fn test_budget_zero_and_negative_limits() {
        assert!(!fits_memory_budget(0, 0));
        assert!(!fits_memory_budget(0, -1));
        assert!(fits_memory_budget(0, 1));
    }

    #[test]
    fn test_budget_large_values() {
        assert!(fits_memory_budget(u64::from(u32::MAX) * 4, i64::MAX));
    }
}
