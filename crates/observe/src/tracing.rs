use {
    crate::{Config, Format},
    std::{backtrace::Backtrace, panic::PanicHookInfo, sync::Once},
    time::macros::format_description,
    tracing::Metadata,
    tracing_subscriber::{
        EnvFilter,
        Layer,
        fmt::{time::UtcTime, writer::MakeWriterExt as _},
        prelude::*,
        util::TryInitError,
    },
};

/// Installs the global subscriber and a panic hook logging panics as errors.
pub fn initialize(config: &Config) {
    if let Err(err) = set_subscriber(config) {
        eprintln!("tracing subscriber already initialized: {err}");
    }
    std::panic::set_hook(Box::new(log_panic));
}

/// [`initialize`] with text output for tests. Only the first call in a process
/// has an effect.
pub fn initialize_reentrant(filter: &str) {
    static INIT: Once = Once::new();
    INIT.call_once(|| initialize(&Config::new(filter)));
}

fn set_subscriber(config: &Config) -> Result<(), TryInitError> {
    let threshold = config.stderr_threshold;
    let writer = std::io::stderr
        .with_filter(move |meta: &Metadata<'_>| {
            threshold.is_some_and(|level| *meta.level() <= level)
        })
        .or_else(std::io::stdout);
    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ));
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_timer(timer);
    let filter = EnvFilter::new(&config.filter);
    let layer = match config.format {
        Format::Json => layer.json().with_filter(filter).boxed(),
        Format::Text => layer.with_ansi(false).with_filter(filter).boxed(),
    };
    tracing_subscriber::registry().with(layer).try_init()
}

fn log_panic(info: &PanicHookInfo) {
    let thread = std::thread::current();
    tracing::error!(
        thread = thread.name().unwrap_or("<unnamed>"),
        backtrace = %Backtrace::force_capture(),
        "{info}"
    );
}

#[cfg(test)]
mod tests {
    use {super::*, tracing::Level};

    #[test]
    fn reentrant_initialization() {
        initialize_reentrant("debug");
        initialize_reentrant("trace");
        tracing::debug!(level = %Level::DEBUG, "logged after initialization");
    }
}
