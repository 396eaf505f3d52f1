//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! Rux 内核核心
//!
//! 单 CPU 内核中与平台无关的部分：
//! - 轮转调度与时钟抢占 (`sched`)
//! - 任务的创建、退出、孤儿过继与僵尸回收 (`process`)
//! - 信号的发送、递送与 sigreturn (`signal`, `process::signal`)
//! - 自旋锁与条件变量 (`sync`)
//! - 管道与文件描述符表 (`fs`)
//!
//! 上下文切换、trap frame 布局和地址空间通过 [`arch::Arch`] 交给平台实现。

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod arch;
pub mod config;
pub mod errno;
pub mod fs;
pub mod kernel;
pub mod list;
pub mod logger;
pub mod process;
pub mod sched;
pub mod signal;
pub mod sync;

#[cfg(test)]
mod tests;

pub use arch::Arch;
pub use errno::{Errno, KResult};
pub use kernel::Kernel;
pub use process::{Pid, TaskId, TaskInfo, TaskState, WaitFilter, WaitStatus};
pub use sched::SchedContext;
pub use signal::{MaskHow, SigAction, SigSet, Signal};
