//! vboxctl entry point.
//!
//! Everything runs on a single-threaded runtime; the only long wait is the
//! launch progress of `run`, which has no timeout.

use std::process::ExitCode;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vboxctl::{CliConfig, Dispatcher, Invocation, DEFAULT_LOG_DIRECTIVES, USAGE};
use vboxctl_vbox::WebServiceConnector;

/// Exit status for argument errors.
const USAGE_EXIT_CODE: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let config = CliConfig::from_env();
    init_tracing(&config);

    let invocation = match Invocation::parse_os(std::env::args_os().skip(1)) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("{USAGE}");
            return Ok(ExitCode::from(USAGE_EXIT_CODE));
        }
    };
    tracing::debug!(?invocation, ?config, "Parsed invocation");

    let dispatcher = Dispatcher::new(WebServiceConnector::new()).with_frontend(config.frontend);
    let reply = dispatcher.dispatch(invocation).await;

    reply.write_to(&mut std::io::stdout().lock(), &mut std::io::stderr().lock())?;
    Ok(ExitCode::from(reply.exit_code()))
}

/// Logs go to stderr; stdout is reserved for the reply.
fn init_tracing(config: &CliConfig) {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES));

    let mut rejected = None;
    if let Some(directive) = &config.log_directive {
        match directive.parse::<Directive>() {
            Ok(parsed) => filter = filter.add_directive(parsed),
            Err(e) => rejected = Some((directive.clone(), e)),
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some((directive, error)) = rejected {
        tracing::warn!(%directive, %error, "Ignoring invalid VBOXCTL_LOG directive");
    }
}
