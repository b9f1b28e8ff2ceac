use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;

/// `log` backend writing `LEVEL target: message` lines to stderr.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(
                std::io::stderr().lock(),
                "\r{:<5} {}: {}\r",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the logger. The level comes from `CLI_LOG` (`info` when unset or invalid).
pub fn init() -> Result<(), SetLoggerError> {
    let level = std::env::var("CLI_LOG")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(LevelFilter::Info);
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}
