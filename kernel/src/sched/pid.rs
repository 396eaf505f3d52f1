//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! PID 管理
//!
//! - PID 0: idle 进程
//! - PID 1: init 进程
//! - PID 2+: 普通 PID
//!
//! PID 单调分配、不回收：一个被回收的僵尸进程的 PID 不会再出现。

use core::sync::atomic::{AtomicU32, Ordering};

use crate::process::Pid;

pub const PID_IDLE: Pid = 0; // idle 进程
pub const PID_INIT: Pid = 1; // init 进程

/// PID 分配器
pub struct PidAllocator {
    next: AtomicU32,
    limit: Pid,
}

impl PidAllocator {
    /// 从 PID_INIT 开始分配，`limit` 为上限（不含）
    pub const fn new(limit: Pid) -> Self {
        Self {
            next: AtomicU32::new(PID_INIT),
            limit,
        }
    }

    /// 分配一个新的 PID，耗尽时返回 None
    pub fn alloc(&self) -> Option<Pid> {
        let pid = self.next.fetch_add(1, Ordering::Relaxed);
        if pid >= self.limit {
            self.next.store(self.limit, Ordering::Relaxed);
            None
        } else {
            Some(pid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pids_are_monotonic() {
        let pids = PidAllocator::new(100);
        assert_eq!(pids.alloc(), Some(PID_INIT));
        assert_eq!(pids.alloc(), Some(2));
        assert_eq!(pids.alloc(), Some(3));
    }

    #[test]
    fn test_pid_exhaustion() {
        let pids = PidAllocator::new(3);
        assert_eq!(pids.alloc(), Some(1));
        assert_eq!(pids.alloc(), Some(2));
        assert_eq!(pids.alloc(), None);
        assert_eq!(pids.alloc(), None);
    }
}
