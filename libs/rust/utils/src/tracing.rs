use futures::{Future, FutureExt};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Crates whose logs drown out the service's own events.
const SILENCED_TARGETS: &[&str] = &[
    "hyper_util",
    "reqwest",
    "sqlx",
    "sea_orm",
    "tower_http",
];

/// Installs the global subscriber: `RUST_LOG` filter (default `info`) and JSON
/// lines on stdout.
pub fn setup_tracing() {
    let mut filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    for target in SILENCED_TARGETS {
        if let Ok(directive) = format!("{target}=off").parse() {
            filter_layer = filter_layer.add_directive(directive);
        }
    }

    let fmt_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

/// Sets up tracing, then drives `future` to completion. The outcome is
/// logged exactly once and turned into the process exit code.
pub async fn run_with_tracing<F, Fut>(future: F) -> ExitCode
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
{
    setup_tracing();

    if supervise(future()).await {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Awaits `future`, logging an error result or a panic instead of unwinding.
/// Returns whether the future finished cleanly.
pub async fn supervise<Fut>(future: Fut) -> bool
where
    Fut: Future<Output = Result<(), anyhow::Error>>,
{
    match std::panic::AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(error = %e, error_chain = ?e, "Service exited with error");
            false
        }
        Err(e) => {
            capture_panic_details(e);
            false
        }
    }
}

pub fn capture_panic_details(e: Box<dyn std::any::Any + Send>) {
    let backtrace = backtrace::Backtrace::new();
    if let Some(s) = e.downcast_ref::<&str>() {
        error!(panic_message = *s, backtrace = ?backtrace, "Panic occurred with message");
    } else if let Some(s) = e.downcast_ref::<String>() {
        error!(panic_message = s, backtrace = ?backtrace, "Panic occurred with message");
    } else {
        error!(backtrace = ?backtrace, "Panic occurred but the payload is not a string");
    }
}

/// Text of a caught panic payload, for attaching to a failure record.
pub fn panic_message(e: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = e.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = e.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
