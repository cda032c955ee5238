//! [`Connector`] implementation backed by the VirtualBox SOAP web service.

use crate::error::{Result, VboxError};
use crate::hypervisor::{Connector, Credentials, Frontend, Hypervisor, Progress, Session, Timeout};
use crate::machine::{Machine, ObjectRef, SessionState};
use crate::soap::{single, SoapClient};
use async_trait::async_trait;
use std::time::Instant;

/// Connects to vboxwebsrv over HTTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebServiceConnector;

impl WebServiceConnector {
    pub fn new() -> Self {
        Self
    }
}

/// Call a method that returns exactly one value.
async fn call_single(soap: &SoapClient, method: &str, args: &[(&str, &str)]) -> Result<String> {
    let values = soap.call(method, args).await?;
    single(method, values)
}

/// Read an attribute getter such as `IMachine_getName`.
async fn get_attribute(soap: &SoapClient, method: &str, this: &ObjectRef) -> Result<String> {
    call_single(soap, method, &[("_this", this.as_str())]).await
}

#[async_trait]
impl Connector for WebServiceConnector {
    async fn connect(
        &self,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn Hypervisor>> {
        let start = Instant::now();
        let soap = SoapClient::new(endpoint)?;
        tracing::debug!(endpoint = %soap.endpoint(), "Logging on to web service");

        let vbox = call_single(
            &soap,
            "IWebsessionManager_logon",
            &[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ],
        )
        .await?;

        tracing::info!(
            endpoint = %soap.endpoint(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Connected to VirtualBox"
        );

        Ok(Box::new(WebServiceHypervisor {
            soap,
            vbox: ObjectRef::new(vbox),
        }))
    }
}

/// An authenticated web session; `vbox` is the `IVirtualBox` reference.
pub struct WebServiceHypervisor {
    soap: SoapClient,
    vbox: ObjectRef,
}

impl WebServiceHypervisor {
    /// Read the attributes of one machine reference.
    async fn machine(&self, handle: ObjectRef) -> Result<Machine> {
        let name = get_attribute(&self.soap, "IMachine_getName", &handle).await?;
        let session_state: SessionState =
            get_attribute(&self.soap, "IMachine_getSessionState", &handle)
                .await?
                .trim()
                .parse()?;
        let memory = get_attribute(&self.soap, "IMachine_getMemorySize", &handle).await?;
        let memory_size_mb = memory.trim().parse::<u32>().map_err(|e| {
            VboxError::Protocol(format!("invalid memory size '{memory}' for '{name}': {e}"))
        })?;

        Ok(Machine::new(handle, name, session_state, memory_size_mb))
    }
}

#[async_trait]
impl Hypervisor for WebServiceHypervisor {
    async fn machines(&self) -> Result<Vec<Machine>> {
        let handles = self
            .soap
            .call("IVirtualBox_getMachines", &[("_this", self.vbox.as_str())])
            .await?;

        let mut machines = Vec::with_capacity(handles.len());
        for handle in handles {
            machines.push(self.machine(ObjectRef::new(handle)).await?);
        }
        tracing::debug!(count = machines.len(), "Enumerated machines");
        Ok(machines)
    }

    async fn find_machine(&self, name: &str) -> Result<Option<Machine>> {
        let found = call_single(
            &self.soap,
            "IVirtualBox_findMachine",
            &[("_this", self.vbox.as_str()), ("nameOrId", name)],
        )
        .await;

        match found {
            Ok(handle) if handle.is_empty() => Ok(None),
            Ok(handle) => self.machine(ObjectRef::new(handle)).await.map(Some),
            Err(e) if e.is_object_not_found() => {
                tracing::debug!(machine = name, "Machine not registered");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn open_session(&self) -> Result<Box<dyn Session>> {
        let session = call_single(
            &self.soap,
            "IWebsessionManager_getSessionObject",
            &[("refIVirtualBox", self.vbox.as_str())],
        )
        .await?;

        Ok(Box::new(WebServiceSession {
            soap: self.soap.clone(),
            session: ObjectRef::new(session),
        }))
    }

    async fn disconnect(self: Box<Self>) -> Result<()> {
        self.soap
            .call(
                "IWebsessionManager_logoff",
                &[("refIVirtualBox", self.vbox.as_str())],
            )
            .await?;
        tracing::info!(endpoint = %self.soap.endpoint(), "Disconnected from VirtualBox");
        Ok(())
    }
}

/// An `ISession` object obtained from the web session manager.
pub struct WebServiceSession {
    soap: SoapClient,
    session: ObjectRef,
}

#[async_trait]
impl Session for WebServiceSession {
    async fn launch_vm_process(
        &mut self,
        machine: &Machine,
        frontend: Frontend,
        environment: &str,
    ) -> Result<Box<dyn Progress>> {
        tracing::info!(machine = machine.name(), %frontend, "Launching VM process");

        let progress = call_single(
            &self.soap,
            "IMachine_launchVMProcess",
            &[
                ("_this", machine.handle().as_str()),
                ("session", self.session.as_str()),
                ("type", frontend.as_str()),
                ("environment", environment),
            ],
        )
        .await?;

        Ok(Box::new(WebServiceProgress {
            soap: self.soap.clone(),
            progress: ObjectRef::new(progress),
        }))
    }

    async fn unlock_machine(self: Box<Self>) -> Result<()> {
        self.soap
            .call("ISession_unlockMachine", &[("_this", self.session.as_str())])
            .await?;
        Ok(())
    }
}

/// An `IProgress` object for a running launch.
pub struct WebServiceProgress {
    soap: SoapClient,
    progress: ObjectRef,
}

#[async_trait]
impl Progress for WebServiceProgress {
    async fn wait_for_completion(&self, timeout: Timeout) -> Result<()> {
        let start = Instant::now();
        let wire = timeout.as_wire().to_string();
        self.soap
            .call(
                "IProgress_waitForCompletion",
                &[("_this", self.progress.as_str()), ("timeout", wire.as_str())],
            )
            .await?;
        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Progress completed"
        );
        Ok(())
    }

    async fn result_code(&self) -> Result<i64> {
        let code = get_attribute(&self.soap, "IProgress_getResultCode", &self.progress).await?;
        code.trim()
            .parse()
            .map_err(|e| VboxError::Protocol(format!("invalid result code '{code}': {e}")))
    }
}
