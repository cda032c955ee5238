//! Configuration for the CLI.
//!
//! Configuration is loaded from environment variables with sensible defaults.
//! Credentials are deliberately not configurable: vboxctl always logs on with
//! an empty username and password.

use vboxctl_vbox::Frontend;

/// Default `tracing` filter. Logs go to stderr and stay quiet unless asked.
pub const DEFAULT_LOG_DIRECTIVES: &str = "vboxctl=warn,vboxctl_vbox=warn";

/// Configuration for the vboxctl binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Front-end for launched machines (default: gui).
    pub frontend: Frontend,

    /// Extra `tracing` filter directive, applied on top of `RUST_LOG`.
    pub log_directive: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            frontend: Frontend::Gui,
            log_directive: None,
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `VBOXCTL_FRONTEND` | `gui` (gui, headless, sdl, separate) |
    /// | `VBOXCTL_LOG` | unset |
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unknown or empty values fall back to the defaults.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();

        Self {
            frontend: lookup("VBOXCTL_FRONTEND")
                .and_then(|v| Frontend::parse(v.trim()))
                .unwrap_or(default.frontend),
            log_directive: lookup("VBOXCTL_LOG")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .or(default.log_directive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> CliConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CliConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.frontend, Frontend::Gui);
        assert!(config.log_directive.is_none());
    }

    #[test]
    fn test_from_vars_uses_defaults() {
        assert_eq!(from_map(&[]), CliConfig::default());
    }

    #[test]
    fn test_frontend_override() {
        let config = from_map(&[("VBOXCTL_FRONTEND", "Headless")]);
        assert_eq!(config.frontend, Frontend::Headless);
    }

    #[test]
    fn test_unknown_frontend_falls_back() {
        let config = from_map(&[("VBOXCTL_FRONTEND", "vnc")]);
        assert_eq!(config.frontend, Frontend::Gui);
    }

    #[test]
    fn test_log_directive() {
        let config = from_map(&[("VBOXCTL_LOG", " vboxctl_vbox=trace ")]);
        assert_eq!(config.log_directive.as_deref(), Some("vboxctl_vbox=trace"));

        let empty = from_map(&[("VBOXCTL_LOG", "  ")]);
        assert!(empty.log_directive.is_none());
    }

    #[test]
    fn test_default_directives_parse() {
        for directive in DEFAULT_LOG_DIRECTIVES.split(',') {
            assert!(directive
                .parse::<tracing_subscriber::filter::Directive>()
                .is_ok());
        }
    }
}
