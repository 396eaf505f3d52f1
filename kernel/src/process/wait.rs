//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 等待子进程 (wait4 / waitpid)
//!
//! 参考 Linux kernel/exit.c -> do_wait() -> wait_consider_task()
//!
//! 在自己的 child_exit 锁内扫描子进程：找到僵尸就摘下并销毁（这是释放
//! 任务的唯一路径），没有僵尸但有活着的子进程就睡在 child_exit 上，
//! 醒来后重新扫描。子进程在同一把锁内变成僵尸，所以不会丢失唤醒。

use crate::arch::Arch;
use crate::errno::{Errno, KResult};
use crate::kernel::Kernel;
use crate::process::table::ChildScan;
use crate::process::{Pid, Task, TaskId};
use crate::sched::SchedContext;

/// 等待哪些子进程
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitFilter {
    /// 任意子进程 (pid == -1)
    Any,
    /// 指定 PID (pid > 0)
    Pid(Pid),
    /// 指定进程组 (pid < -1)
    Group(Pid),
    /// 与调用者同组 (pid == 0)
    OwnGroup,
}

impl WaitFilter {
    /// 按 waitpid 的 pid 参数构造
    pub fn from_raw(pid: i32) -> WaitFilter {
        match pid {
            -1 => WaitFilter::Any,
            0 => WaitFilter::OwnGroup,
            p if p > 0 => WaitFilter::Pid(p as Pid),
            p => WaitFilter::Group(p.unsigned_abs()),
        }
    }

    fn matches(self, pid: Pid, pgid: Pid, own_pgid: Pid) -> bool {
        match self {
            WaitFilter::Any => true,
            WaitFilter::Pid(want) => pid == want,
            WaitFilter::Group(group) => pgid == group,
            WaitFilter::OwnGroup => pgid == own_pgid,
        }
    }
}

/// 等待结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// 回收了一个已退出的子进程
    Exited { pid: Pid, code: i32 },
    /// WNOHANG 且没有已退出的子进程
    NotReady,
}

impl<A: Arch> Kernel<A> {
    /// 等待并回收子进程
    ///
    /// - 没有匹配的子进程: ECHILD
    /// - `no_hang` 且没有僵尸: `WaitStatus::NotReady`
    /// - 阻塞期间收到需要处理的信号: EINTR
    pub fn wait_for_child(&self, filter: WaitFilter, no_hang: bool) -> KResult<WaitStatus> {
        let me = self.current();
        let child_exit = self.tasks.lock().task(me).child_exit.clone();

        let mut guard = child_exit.lock();
        loop {
            let reaped = {
                let mut table = self.tasks.lock();
                let own_pgid = table.task(me).pgid;
                match table.scan_children(me, |t| filter.matches(t.pid(), t.pgid, own_pgid)) {
                    ChildScan::Zombie(id) => Some((id, table.unlink(id))),
                    ChildScan::Alive => None,
                    ChildScan::Empty => return Err(Errno::NoChild),
                }
            };

            if let Some((id, task)) = reaped {
                drop(guard);
                let (pid, code) = (task.pid(), task.exit_code);
                self.destroy_task(id, task);
                log::debug!("wait: reaped pid {} (code {})", pid, code);
                return Ok(WaitStatus::Exited { pid, code });
            }

            if no_hang {
                return Ok(WaitStatus::NotReady);
            }
            if self.signal_pending() {
                return Err(Errno::InterruptedSystemCall);
            }
            guard = child_exit.wait(guard, self);
        }
    }

    /// 销毁已经摘下的僵尸任务 (release_task)
    fn destroy_task(&self, id: TaskId, task: Task<A>) {
        self.arch.destroy_context(id);
        self.release_resources(task);
    }
}
