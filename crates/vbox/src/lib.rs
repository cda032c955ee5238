//! # vboxctl-vbox
//!
//! Client layer for the VirtualBox web service (`vboxwebsrv`).
//! Provides a small async abstraction over the parts of the VirtualBox Main
//! API needed to enumerate machines and launch them.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vboxctl_vbox::{Connector, Credentials, WebServiceConnector};
//!
//! # async fn example() -> vboxctl_vbox::Result<()> {
//! let vbox = WebServiceConnector::new()
//!     .connect("http://localhost:18083", &Credentials::empty())
//!     .await?;
//!
//! for machine in vbox.machines().await? {
//!     println!("{} ({})", machine.name(), machine.session_state());
//! }
//!
//! vbox.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Enumeration**: List machines with name, session state and memory size
//! - **Lookup**: Find a machine by name
//! - **Launch**: Spawn a VM process through a session lease and wait on its progress
//! - **Pluggable**: `Connector`/`Hypervisor` traits so callers can swap in fakes

mod error;
mod hypervisor;
mod machine;
mod soap;
mod websrv;

pub use error::{Result, VboxError, VBOX_E_OBJECT_NOT_FOUND};
pub use hypervisor::{Connector, Credentials, Frontend, Hypervisor, Progress, Session, Timeout};
pub use machine::{Machine, ObjectRef, SessionState};
pub use soap::{envelope, parse_endpoint, parse_response, SoapClient};
pub use websrv::{WebServiceConnector, WebServiceHypervisor, WebServiceProgress, WebServiceSession};
