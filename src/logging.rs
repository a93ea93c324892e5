use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LogMessage {
    pub level: String,
    pub message: String,
    pub timestamp: String,
}

/// Receives every record the bridge logger accepts, e.g. to forward it to
/// the page's console.
pub trait LogSink: Send + Sync {
    fn emit(&self, message: LogMessage);
}

pub struct BridgeLogger {
    level: Level,
    sink: Option<Arc<dyn LogSink>>,
}

impl BridgeLogger {
    pub fn new(level: Level, sink: Option<Arc<dyn LogSink>>) -> Self {
        Self { level, sink }
    }

    pub fn init(level: Level, sink: Option<Arc<dyn LogSink>>) -> Result<(), SetLoggerError> {
        let logger = BridgeLogger::new(level, sink);
        log::set_boxed_logger(Box::new(logger))
            .map(|()| log::set_max_level(level.to_level_filter()))
    }

    fn emit_log(&self, record: &Record) {
        let Some(sink) = &self.sink else {
            return;
        };
        sink.emit(LogMessage {
            level: record.level().to_string(),
            message: record.args().to_string(),
            timestamp: Local::now().to_rfc3339(),
        });
    }
}

impl log::Log for BridgeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
            self.emit_log(record);
        }
    }

    fn flush(&self) {}
}

/// Installs a stderr-only bridge logger at `level`. If another logger is
/// already installed, falls back to env_logger, which is a no-op when
/// that fails too.
pub fn init(level: LevelFilter) {
    let Some(bridge_level) = level.to_level() else {
        log::set_max_level(LevelFilter::Off);
        return;
    };
    if BridgeLogger::init(bridge_level, None).is_err() {
        let _ = env_logger::builder().filter_level(level).try_init();
    }
}
