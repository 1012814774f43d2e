use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, filter::EnvFilter, fmt};

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::PanicHookInfo;

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Logs a panic as a single `error` event with the panic site as a field, so it stays inside the
/// JSON stream. The backtrace is attached only when RUST_BACKTRACE asked for one.
fn log_panic(info: &PanicHookInfo<'_>) {
    let site = info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_default();
    let message = panic_message(info.payload());

    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        tracing::error!(%site, %backtrace, "panic: {message}");
    } else {
        tracing::error!(%site, "panic: {message}");
    }
}

/// RUST_LOG overrides the level. `SIEM_RELAY_DEBUG=true` switches to human readable output at
/// `debug`; otherwise events are flattened JSON at `info`.
pub fn register() {
    let debug_mode = std::env::var("SIEM_RELAY_DEBUG").is_ok_and(|v| v.eq_ignore_ascii_case("true"));
    let default_log_level = if debug_mode {
        // hyper and the AWS SDK are chatty at debug
        "debug,hyper_util=info,aws_smithy_runtime=info,aws_config=info"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level));

    let layer = if debug_mode {
        fmt::layer().boxed()
    } else {
        fmt::layer()
            .with_ansi(false)
            .json()
            .flatten_event(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .init();

    std::panic::set_hook(Box::new(log_panic));
}
