//! Rux 内核核心配置（自动生成）
//!
//! 此文件由 build.rs 根据 Kernel.toml 自动生成，请勿手动修改

// ============================================================
// 基本信息
// ============================================================

/// 内核名称
pub const KERNEL_NAME: &str = "Rux";

/// 内核版本
pub const KERNEL_VERSION: &str = "0.1.0";

// ============================================================
// 调度器配置
// ============================================================

/// 时钟中断频率 (Hz)
pub const TICK_HZ: u32 = 100;

/// 默认时间片 (毫秒)
pub const DEFAULT_TIME_SLICE_MS: u32 = 100;

/// 时间片滴答数
pub const TIME_SLICE_TICKS: u32 = 10;

// ============================================================
// 任务配置
// ============================================================

/// 任务表容量（含 idle）
pub const MAX_TASKS: usize = 256;

/// PID 上限
pub const PID_MAX: u32 = 32768;

/// 每个任务的文件描述符上限
pub const MAX_FDS: usize = 64;

// ============================================================
// 管道配置
// ============================================================

/// 管道可用字节数
pub const PIPE_CAPACITY: usize = 512;

// ============================================================
// 调试配置
// ============================================================

/// 日志级别
pub const LOG_LEVEL: &str = "info";
