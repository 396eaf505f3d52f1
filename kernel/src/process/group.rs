//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 进程身份与进程组
//!
//! 参考 Linux kernel/sys.c: getpid / getppid / getpgid / setpgid

use crate::arch::Arch;
use crate::errno::{Errno, KResult};
use crate::kernel::Kernel;
use crate::process::{Credentials, Pid, TaskId, TaskTable};

impl<A: Arch> Kernel<A> {
    pub fn getpid(&self) -> Pid {
        self.current_pid()
    }

    /// 父进程 PID，idle 没有父进程，返回 0
    pub fn getppid(&self) -> Pid {
        let table = self.tasks.lock();
        table
            .parent_of(self.current())
            .map(|p| table.pid_of(p))
            .unwrap_or(0)
    }

    /// 当前任务的身份凭证
    pub fn credentials(&self) -> Credentials {
        self.tasks.lock().task(self.current()).credentials()
    }

    /// 查询进程组，`pid` 为 0 表示当前任务
    pub fn getpgid(&self, pid: Pid) -> KResult<Pid> {
        let table = self.tasks.lock();
        let id = self.resolve(&table, pid)?;
        Ok(table.task(id).pgid)
    }

    /// 设置进程组
    ///
    /// - `pid` 为 0 表示当前任务，否则必须是当前任务或它的子进程 (ESRCH)
    /// - `pgid` 为 0 表示使用目标的 PID
    /// - 加入别的进程组时该组必须已经存在 (EPERM)
    pub fn setpgid(&self, pid: Pid, pgid: Pid) -> KResult<()> {
        let me = self.current();
        let mut table = self.tasks.lock();
        let target = self.resolve(&table, pid)?;
        if target != me && table.parent_of(target) != Some(me) {
            return Err(Errno::NoSuchProcess);
        }

        let target_pid = table.pid_of(target);
        let pgid = if pgid == 0 { target_pid } else { pgid };
        if pgid != target_pid && !table.iter().any(|(_, t)| t.pgid == pgid) {
            return Err(Errno::OperationNotPermitted);
        }
        table.task_mut(target).pgid = pgid;
        log::debug!("group: pid {} moved to group {}", target_pid, pgid);
        Ok(())
    }

    fn resolve(&self, table: &TaskTable<A>, pid: Pid) -> KResult<TaskId> {
        if pid == 0 {
            return Ok(self.current());
        }
        table.find_by_pid(pid).ok_or(Errno::NoSuchProcess)
    }
}
