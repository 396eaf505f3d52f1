//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 进程创建 (fork/clone)
//!
//! 参考 Linux kernel/fork.c -> kernel_clone() -> copy_process()
//!
//! 流程:
//! 1. 分配 PID 和任务表槽位
//! 2. 复制地址空间 (copy_mm)
//! 3. 复制身份、凭证、信号处理表、文件描述符表和目录句柄 (copy_process)
//! 4. 准备 CPU 上下文 (copy_thread)
//! 5. 挂到全局链表和创建者的子进程链表上
//!
//! 第 2、4 步失败时，已经构造的任务在释放任务表锁之后整体销毁，
//! 任何链表上都不会留下它。

use crate::arch::Arch;
use crate::config::MAX_TASKS;
use crate::errno::{Errno, KResult};
use crate::kernel::Kernel;
use crate::process::{Pid, Task, TaskId};

impl<A: Arch> Kernel<A> {
    /// 以当前任务为模板创建子任务，返回子任务的 PID
    ///
    /// idle 不能创建普通任务 (EPERM)，init 由 [`Kernel::spawn_init`] 创建
    pub fn create(&self, entry: A::Entry) -> KResult<Pid> {
        let creator = self.current();
        if creator == self.idle_id() {
            return Err(Errno::OperationNotPermitted);
        }
        let (_, pid) = self.copy_process(creator, entry, None)?;
        Ok(pid)
    }

    /// 从 idle 创建 init 任务 (PID 1)，只能调用一次
    ///
    /// `mm` 是 init 的初始地址空间，内核线程传入 None
    pub fn spawn_init(&self, entry: A::Entry, mm: Option<A::AddressSpace>) -> KResult<Pid> {
        let creator = self.current();
        {
            let table = self.tasks.lock();
            if creator != table.idle() || table.init().is_some() {
                drop(table);
                self.discard_address_space(Some(mm));
                return Err(Errno::OperationNotPermitted);
            }
        }
        let (id, pid) = self.copy_process(creator, entry, Some(mm))?;
        {
            let mut table = self.tasks.lock();
            table.set_init(id);
            // init 自成一个进程组，之后创建的任务都继承它
            table.task_mut(id).pgid = pid;
        }
        log::info!("fork: init task started as pid {}", pid);
        Ok(pid)
    }

    /// 创建任务的公共部分
    ///
    /// `mm` 为 None 时复制创建者的地址空间，否则使用给定的地址空间
    fn copy_process(
        &self,
        creator: TaskId,
        entry: A::Entry,
        mm: Option<Option<A::AddressSpace>>,
    ) -> KResult<(TaskId, Pid)> {
        let pid = match self.pids.alloc() {
            Some(pid) => pid,
            None => {
                log::warn!("fork: pid space exhausted");
                self.discard_address_space(mm);
                return Err(Errno::TryAgain);
            }
        };

        let mut table = self.tasks.lock();
        if table.len() >= MAX_TASKS {
            drop(table);
            self.discard_address_space(mm);
            log::warn!("fork: task table full ({} tasks)", MAX_TASKS);
            return Err(Errno::TryAgain);
        }

        let mm = match mm {
            Some(given) => given,
            None => match table.task(creator).mm.as_ref() {
                Some(parent_mm) => match self.arch.dup_address_space(parent_mm) {
                    Ok(space) => Some(space),
                    Err(err) => {
                        log::warn!("fork: address space duplication failed: {}", err);
                        return Err(err);
                    }
                },
                None => None,
            },
        };

        let id = table.vacant();
        let task = Task::forked_from(table.task(creator), id, pid, mm);

        if let Err(err) = self.arch.init_context(id, entry) {
            table.release_vacant(id);
            drop(table);
            log::warn!("fork: context setup for pid {} failed: {}", pid, err);
            self.release_resources(task);
            return Err(err);
        }

        table.fill(id, task);
        table.link(creator, id);
        log::debug!(
            "fork: pid {} created by pid {} as task {}",
            pid,
            table.pid_of(creator),
            id
        );
        Ok((id, pid))
    }

    /// 创建失败时释放调用者交进来的地址空间
    fn discard_address_space(&self, mm: Option<Option<A::AddressSpace>>) {
        if let Some(Some(space)) = mm {
            self.arch.destroy_address_space(space);
        }
    }

    /// 销毁一个不在任何链表上的任务：释放地址空间，其余资源随所有权释放
    ///
    /// 调用者不能持有任务表的锁，文件的最后一个引用可能要唤醒其他任务
    pub(crate) fn release_resources(&self, mut task: Task<A>) {
        if let Some(space) = task.mm.take() {
            self.arch.destroy_address_space(space);
        }
        drop(task);
    }
}
