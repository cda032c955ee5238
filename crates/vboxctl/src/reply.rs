//! Command outcomes and how they are printed.

use std::io::{self, Write};

/// Printed on success.
pub const OK: &str = "OK";

/// Printed on any logical or hypervisor failure.
pub const ERROR: &str = "ERROR";

/// Outcome of one invocation.
///
/// Stdout carries only `OK`, `ERROR` or machine names; scripts parse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Error,
    /// Machine names, one per line, in enumeration order
    Names(Vec<String>),
    /// Unknown command keyword; reported on stderr only
    Unsupported(String),
}

impl Reply {
    /// Write the reply to the given stdout/stderr pair.
    pub fn write_to<O: Write, E: Write>(&self, out: &mut O, err: &mut E) -> io::Result<()> {
        match self {
            Reply::Ok => writeln!(out, "{OK}")?,
            Reply::Error => writeln!(out, "{ERROR}")?,
            Reply::Names(names) => {
                for name in names {
                    writeln!(out, "{name}")?;
                }
            }
            Reply::Unsupported(keyword) => writeln!(err, "Unsupported command '{keyword}'")?,
        }
        out.flush()
    }

    /// Process exit status for this reply.
    pub fn exit_code(&self) -> u8 {
        match self {
            Reply::Ok | Reply::Names(_) => 0,
            Reply::Error => 1,
            Reply::Unsupported(_) => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(reply: &Reply) -> (String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        reply.write_to(&mut out, &mut err).unwrap();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_ok_and_error() {
        assert_eq!(render(&Reply::Ok), ("OK\n".into(), String::new()));
        assert_eq!(render(&Reply::Error), ("ERROR\n".into(), String::new()));
    }

    #[test]
    fn test_names_one_per_line() {
        let reply = Reply::Names(vec!["web".into(), "db".into()]);
        assert_eq!(render(&reply), ("web\ndb\n".into(), String::new()));
        assert_eq!(render(&Reply::Names(vec![])), (String::new(), String::new()));
    }

    #[test]
    fn test_unsupported_goes_to_stderr() {
        let (out, err) = render(&Reply::Unsupported("foo".into()));
        assert!(out.is_empty());
        assert_eq!(err, "Unsupported command 'foo'\n");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Reply::Ok.exit_code(), 0);
        assert_eq!(Reply::Names(vec![]).exit_code(), 0);
        assert_eq!(Reply::Error.exit_code(), 1);
        assert_eq!(Reply::Unsupported("x".into()).exit_code(), 2);
    }
}
