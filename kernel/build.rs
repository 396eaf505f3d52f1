//! Rux 内核核心构建脚本
//!
//! 这个脚本在编译前运行，负责：
//! 1. 解析 Kernel.toml 配置文件
//! 2. 校验配置取值
//! 3. 生成 src/config.rs

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KernelConfig {
    general: General,
    scheduler: Scheduler,
    process: Process,
    pipe: Pipe,
    debug: Debug,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct General {
    name: String,
    version: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            name: "Rux".to_string(),
            version: "0.1.0".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Scheduler {
    tick_hz: u32,
    time_slice_ms: u32,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            tick_hz: 100,
            time_slice_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Process {
    max_tasks: usize,
    pid_max: u32,
    max_fds: usize,
}

impl Default for Process {
    fn default() -> Self {
        Self {
            max_tasks: 256,
            pid_max: 32768,
            max_fds: 64,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Pipe {
    capacity: usize,
}

impl Default for Pipe {
    fn default() -> Self {
        Self { capacity: 512 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Debug {
    log_level: String,
}

impl Default for Debug {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// 读取 Kernel.toml，缺失时回退到内置默认值
fn load_config(path: &PathBuf) -> KernelConfig {
    match fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)
            .unwrap_or_else(|e| panic!("Kernel.toml 解析失败: {}", e)),
        Err(_) => {
            println!("cargo:warning=Kernel.toml not found, using built-in defaults");
            KernelConfig::default()
        }
    }
}

fn validate(config: &KernelConfig) -> u32 {
    let slice_ticks = config.scheduler.time_slice_ms as u64 * config.scheduler.tick_hz as u64 / 1000;
    if slice_ticks == 0 {
        panic!(
            "[scheduler] time_slice_ms = {} 在 tick_hz = {} 下不足一个 tick",
            config.scheduler.time_slice_ms, config.scheduler.tick_hz
        );
    }
    if config.pipe.capacity == 0 {
        panic!("[pipe] capacity 必须大于 0");
    }
    if config.process.pid_max <= 1 || config.process.max_tasks < 2 {
        panic!("[process] pid_max 与 max_tasks 至少要容纳 idle 和 init");
    }
    match config.debug.log_level.as_str() {
        "off" | "error" | "warn" | "info" | "debug" | "trace" => {}
        other => println!("cargo:warning=unknown log_level '{}', falling back to info", other),
    }
    slice_ticks as u32
}

fn render(config: &KernelConfig, slice_ticks: u32) -> String {
    format!(
        r#"//! Rux 内核核心配置（自动生成）
//!
//! 此文件由 build.rs 根据 Kernel.toml 自动生成，请勿手动修改

// ============================================================
// 基本信息
// ============================================================

/// 内核名称
pub const KERNEL_NAME: &str = "{}";

/// 内核版本
pub const KERNEL_VERSION: &str = "{}";

// ============================================================
// 调度器配置
// ============================================================

/// 时钟中断频率 (Hz)
pub const TICK_HZ: u32 = {};

/// 默认时间片 (毫秒)
pub const DEFAULT_TIME_SLICE_MS: u32 = {};

/// 时间片滴答数
pub const TIME_SLICE_TICKS: u32 = {};

// ============================================================
// 任务配置
// ============================================================

/// 任务表容量（含 idle）
pub const MAX_TASKS: usize = {};

/// PID 上限
pub const PID_MAX: u32 = {};

/// 每个任务的文件描述符上限
pub const MAX_FDS: usize = {};

// ============================================================
// 管道配置
// ============================================================

/// 管道可用字节数
pub const PIPE_CAPACITY: usize = {};

// ============================================================
// 调试配置
// ============================================================

/// 日志级别
pub const LOG_LEVEL: &str = "{}";
"#,
        config.general.name,
        config.general.version,
        config.scheduler.tick_hz,
        config.scheduler.time_slice_ms,
        slice_ticks,
        config.process.max_tasks,
        config.process.pid_max,
        config.process.max_fds,
        config.pipe.capacity,
        config.debug.log_level,
    )
}

fn main() {
    println!("cargo:rerun-if-changed=../Kernel.toml");
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string()));
    let config = load_config(&manifest_dir.join("..").join("Kernel.toml"));
    let slice_ticks = validate(&config);

    println!("cargo:rustc-env=RUX_KERNEL_NAME={}", config.general.name);
    println!("cargo:rustc-env=RUX_KERNEL_VERSION={}", config.general.version);
    println!("cargo:rustc-env=RUX_LOG_LEVEL={}", config.debug.log_level);

    let rendered = render(&config, slice_ticks);
    let config_file = manifest_dir.join("src").join("config.rs");
    let existing_content = fs::read_to_string(&config_file).unwrap_or_default();

    // 只有内容变化时才写入，避免每次编译都更新文件时间戳
    if existing_content != rendered {
        fs::write(&config_file, &rendered).expect("写入配置文件失败");
    }
}
