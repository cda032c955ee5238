//! # vboxctl
//!
//! Minimal command-line front-end for a VirtualBox web service.
//!
//! ```bash
//! vboxctl http://localhost:18083 list
//! vboxctl http://localhost:18083 list-running
//! vboxctl http://localhost:18083 run web 8192
//! vboxctl ping
//! ```
//!
//! Stdout carries exactly one of `OK`, `ERROR`, or machine names (one per
//! line). Diagnostics and logs go to stderr.
//!
//! | Command | Output |
//! |---------|--------|
//! | `list` | every machine name, in enumeration order |
//! | `list-running` | names of machines whose session is not `Unlocked` |
//! | `run <name> [limit]` | `OK` if started or already running, else `ERROR` |
//! | `ping` | `OK`, without connecting |

mod command;
mod config;
mod dispatch;
mod error;
mod reply;

pub use command::{Command, Invocation, RunRequest, UsageError, USAGE};
pub use config::{CliConfig, DEFAULT_LOG_DIRECTIVES};
pub use dispatch::{fits_memory_budget, Dispatcher};
pub use error::CommandError;
pub use reply::{Reply, ERROR, OK};
