//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 内核日志
//!
//! 所有诊断信息都经过 `log` 门面输出。平台在启动时通过 [`init`] 安装一个
//! 控制台；没有安装时日志调用什么也不做。日志级别来自 Kernel.toml 的
//! `[debug] log_level`。

use core::fmt::{self, Write};

use log::{LevelFilter, Log, Metadata, Record};
use spin::Once;

use crate::config::LOG_LEVEL;

/// 日志输出设备（通常是串口）
pub trait Console: Sync {
    fn write_str(&self, s: &str);
}

struct ConsoleWriter(&'static dyn Console);

impl Write for ConsoleWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_str(s);
        Ok(())
    }
}

struct KernelLogger {
    console: Once<&'static dyn Console>,
}

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(&console) = self.console.get() {
            let _ = writeln!(ConsoleWriter(console), "[{:5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger { console: Once::new() };

/// 解析配置中的日志级别，无法识别时使用 info
pub fn parse_level(level: &str) -> LevelFilter {
    match level {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// 安装控制台并启用日志，重复调用只有第一次生效
pub fn init(console: &'static dyn Console) {
    LOGGER.console.call_once(|| console);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(parse_level(LOG_LEVEL));
    }
}
