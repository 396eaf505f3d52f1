//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 进程退出
//!
//! 参考 Linux kernel/exit.c -> do_exit()：
//! 1. 取消本任务的定时器 (exit_itimers)
//! 2. 关闭所有文件、释放目录句柄 (exit_files / exit_fs)
//! 3. 把子进程过继给 init (forget_original_parent)
//! 4. 向父进程发送 SIGCHLD (do_notify_parent)
//! 5. 在父进程 child_exit 的锁内变成僵尸并唤醒父进程 (exit_notify)
//! 6. schedule()，永不返回 (do_task_dead)

use core::mem;

use crate::arch::Arch;
use crate::kernel::Kernel;
use crate::process::TaskState;
use crate::signal::Signal;

impl<A: Arch> Kernel<A> {
    /// 退出当前任务
    ///
    /// idle 和 init 不能退出，调用即视为内核状态损坏
    pub fn exit(&self, code: i32) -> ! {
        let me = self.current();

        // 1. 定时器
        let timers = self.timers.lock().cancel_owned(me);
        drop(timers);

        // 2. 资源：在锁外释放，管道端的收尾会唤醒对端
        let (pid, files, fs) = {
            let mut table = self.tasks.lock();
            if me == table.idle() || Some(me) == table.init() {
                let pid = table.pid_of(me);
                drop(table);
                log::error!("exit: pid {} is not allowed to exit (code {})", pid, code);
                panic!("exit: attempted to kill pid {}", pid);
            }
            let task = table.task_mut(me);
            (task.pid(), mem::take(&mut task.files), mem::take(&mut task.fs))
        };
        drop(files);
        drop(fs);

        // 3. 过继子进程
        let (parent, parent_cv, orphan_cv) = {
            let mut table = self.tasks.lock();
            let init = match table.init() {
                Some(init) => init,
                None => panic!("exit: no init task to adopt orphans"),
            };
            let moved = table.reparent_children(me, init);
            let orphan_cv = if moved.iter().any(|&c| table.task(c).is_zombie()) {
                Some(table.task(init).child_exit.clone())
            } else {
                None
            };
            if !moved.is_empty() {
                log::debug!("exit: pid {} handed {} child(ren) to init", pid, moved.len());
            }
            let parent = match table.parent_of(me) {
                Some(parent) => parent,
                None => panic!("exit: pid {} has no parent", pid),
            };
            (parent, table.task(parent).child_exit.clone(), orphan_cv)
        };
        // 过继来的僵尸需要 init 来回收
        if let Some(cv) = orphan_cv {
            cv.lock().broadcast();
        }

        // 4. 通知父进程
        self.raise_task(parent, Signal::SIGCHLD);

        // 5. 变成僵尸
        {
            let mut guard = parent_cv.lock();
            {
                let mut table = self.tasks.lock();
                let task = table.task_mut(me);
                task.exit_code = code;
                task.entity.set_state(TaskState::Zombie);
            }
            guard.signal();
        }
        log::info!("exit: pid {} exited with code {}", pid, code);

        // 6. 永不返回
        self.schedule();
        log::error!("exit: zombie pid {} was scheduled again", pid);
        panic!("exit: zombie task resumed");
    }
}
