//! Positional argument parsing.

use std::ffi::OsString;
use std::fmt;
use thiserror::Error;

/// Usage text printed on argument errors.
pub const USAGE: &str = "\
Usage:
  vboxctl <connection-string> list
  vboxctl <connection-string> list-running
  vboxctl <connection-string> run <machine> [memory-limit-mb]
  vboxctl ping";

/// Argument errors detected before any connection is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("Not enough arguments!")]
    NotEnoughArguments,

    #[error("Argument {position} is not valid UTF-8: {lossy}")]
    InvalidUtf8 { position: usize, lossy: String },
}

/// A fully parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Liveness check, answered without connecting
    Ping,
    /// A command executed against the hypervisor at `endpoint`
    Remote { endpoint: String, command: Command },
}

/// Command keyword plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    ListRunning,
    Run(RunRequest),
    /// Any keyword we do not know; reported after connecting
    Unsupported(String),
}

/// Parameters of `run`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunRequest {
    /// Machine to start; `None` when missing or empty
    pub machine: Option<String>,
    /// Aggregate memory limit in MB; `None` when missing or not an integer
    pub memory_limit_mb: Option<i64>,
}

impl Invocation {
    /// Parse raw OS arguments, as returned by [`std::env::args_os`].
    ///
    /// Any argument that is not valid UTF-8 is a usage error; `position`
    /// counts from 1 after the program name.
    pub fn parse_os<I>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = OsString>,
    {
        let args = args
            .into_iter()
            .enumerate()
            .map(|(index, arg)| {
                arg.into_string().map_err(|raw| UsageError::InvalidUtf8 {
                    position: index + 1,
                    lossy: raw.to_string_lossy().into_owned(),
                })
            })
            .collect::<Result<Vec<String>, _>>()?;
        Self::parse(args)
    }

    /// Parse the arguments that follow the program name.
    pub fn parse<I, S>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();

        match args.as_slice() {
            [only] if only == "ping" => Ok(Invocation::Ping),
            [endpoint, keyword, params @ ..] => Ok(Invocation::Remote {
                endpoint: endpoint.clone(),
                command: Command::parse(keyword, params),
            }),
            _ => Err(UsageError::NotEnoughArguments),
        }
    }
}

impl Command {
    /// Map a keyword and its trailing parameters to a command.
    ///
    /// Parameters past the ones a command uses are ignored.
    pub fn parse(keyword: &str, params: &[String]) -> Self {
        match keyword {
            "list" => Command::List,
            "list-running" => Command::ListRunning,
            "run" => Command::Run(RunRequest {
                machine: params.first().filter(|name| !name.is_empty()).cloned(),
                memory_limit_mb: params.get(1).and_then(|limit| limit.parse().ok()),
            }),
            other => Command::Unsupported(other.to_string()),
        }
    }

    /// Keyword as typed on the command line.
    pub fn keyword(&self) -> &str {
        match self {
            Command::List => "list",
            Command::ListRunning => "list-running",
            Command::Run(_) => "run",
            Command::Unsupported(keyword) => keyword,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
