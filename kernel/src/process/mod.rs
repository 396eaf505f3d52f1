//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 进程管理模块
//!
//! 遵循 Linux 内核的进程模型：
//! - `task`: 进程控制块 (task_struct)
//! - `table`: 任务表与进程树链表
//! - `fork`: 任务创建 (kernel/fork.c)
//! - `exit`: 任务退出与孤儿过继 (kernel/exit.c)
//! - `wait`: 回收僵尸子进程 (do_wait)
//! - `signal`: 信号发送与递送 (kernel/signal.c)
//! - `group`: 进程身份与进程组 (kernel/sys.c)
//!
//! 本内核不区分线程与进程，每个任务都有自己的 PID。

pub mod table;
pub mod task;

mod exit;
mod fork;
mod group;
mod signal;
mod wait;

pub use signal::signal_exit_code;
pub use table::TaskTable;
pub use task::{Credentials, Pid, SchedEntity, Task, TaskId, TaskInfo, TaskState};
pub use wait::{WaitFilter, WaitStatus};
