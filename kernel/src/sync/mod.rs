//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 同步原语 (Synchronization Primitives)
//!
//! 遵循 Linux 内核的同步机制设计：
//! - `include/linux/spinlock.h` - 自旋锁
//! - `kernel/sched/wait.c` - 等待队列
//!
//! 核心概念：
//! - 自旋锁保护短小的、不会挂起的临界区
//! - 条件变量是阻塞操作唯一的挂起点，内部调用 schedule()

pub mod condvar;
pub mod spinlock;

pub use condvar::{CondGuard, ConditionVariable};
pub use spinlock::{SpinLock, SpinLockGuard};
