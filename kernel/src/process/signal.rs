//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 信号发送与递送
//!
//! 参考 Linux kernel/signal.c：
//! - `raise` / `kill`: send_signal() + signal_wake_up()
//! - `deliver`: 返回用户态前的 do_signal() -> get_signal() -> handle_signal()
//! - `signal_return`: rt_sigreturn()
//!
//! 发送信号只做两件事：加入目标的待处理集合；目标未屏蔽该信号且正在睡眠时
//! 把它置回 Running。目标留在等待队列里的旧项由它自己在 wait() 返回时清理，
//! 发送方从不改动别人的等待队列。

use crate::arch::Arch;
use crate::errno::{Errno, KResult};
use crate::kernel::Kernel;
use crate::process::{Pid, TaskId, TaskTable};
use crate::signal::{DefaultAction, MaskHow, SigAction, SigHandler, SigSet, Signal};

/// 信号导致的退出码 (128 + 信号编号)
pub fn signal_exit_code(sig: Signal) -> i32 {
    128 + sig.number() as i32
}

/// 向任务表中的任务投递信号
fn post_signal<A: Arch>(table: &mut TaskTable<A>, id: TaskId, sig: Signal) {
    let task = table.task_mut(id);
    if task.is_zombie() {
        return;
    }
    task.signal.post(sig);
    if !task.signal.is_blocked(sig) && task.entity.wake_up() {
        log::trace!("signal: {} woke pid {}", sig, task.pid());
    }
}

impl<A: Arch> Kernel<A> {
    /// 向指定 PID 发送信号，找不到时返回 ESRCH
    pub fn raise(&self, pid: Pid, sig: Signal) -> KResult<()> {
        let mut table = self.tasks.lock();
        let id = table.find_by_pid(pid).ok_or(Errno::NoSuchProcess)?;
        post_signal(&mut table, id, sig);
        log::debug!("signal: {} sent to pid {}", sig, pid);
        Ok(())
    }

    /// 按句柄发送信号，任务已不存在时返回 false
    pub(crate) fn raise_task(&self, id: TaskId, sig: Signal) -> bool {
        let mut table = self.tasks.lock();
        if table.get(id).is_none() {
            return false;
        }
        post_signal(&mut table, id, sig);
        true
    }

    /// kill 系统调用
    ///
    /// - `pid > 0`: 指定进程
    /// - `pid == 0`: 调用者所在进程组
    /// - `pid == -1`: 除 idle、init 和调用者之外的所有进程
    /// - `pid < -1`: 进程组 `-pid`
    ///
    /// 僵尸不算目标，没有活着的目标时返回 ESRCH
    pub fn kill(&self, pid: i32, sig: Signal) -> KResult<()> {
        if pid > 0 {
            return self.raise(pid as Pid, sig);
        }

        let me = self.current();
        let mut table = self.tasks.lock();
        let idle = table.idle();
        let init = table.init();
        let targets: alloc::vec::Vec<TaskId> = match pid {
            -1 => table
                .iter()
                .filter(|&(id, t)| id != idle && Some(id) != init && id != me && !t.is_zombie())
                .map(|(id, _)| id)
                .collect(),
            _ => {
                let group = if pid == 0 {
                    table.task(me).pgid
                } else {
                    pid.unsigned_abs()
                };
                table
                    .iter()
                    .filter(|&(id, t)| id != idle && t.pgid == group && !t.is_zombie())
                    .map(|(id, _)| id)
                    .collect()
            }
        };
        if targets.is_empty() {
            return Err(Errno::NoSuchProcess);
        }
        for &id in &targets {
            post_signal(&mut table, id, sig);
        }
        log::debug!("signal: {} sent to {} task(s) (kill {})", sig, targets.len(), pid);
        Ok(())
    }

    /// 返回用户态前递送信号
    ///
    /// 每次最多递送一个编号最小的可递送信号。正在执行处理函数时不递送
    /// （嵌套递送被抑制，信号留在待处理集合里）。
    pub fn deliver(&self, frame: &mut A::TrapFrame) {
        let me = self.current();
        let (sig, action, is_init) = {
            let mut table = self.tasks.lock();
            if me == table.idle() {
                return;
            }
            let is_init = Some(me) == table.init();
            let task = table.task_mut(me);
            if task.signal.in_handler() {
                return;
            }
            let sig = match task.signal.take_deliverable() {
                Some(sig) => sig,
                None => return,
            };
            (sig, task.signal.action(sig), is_init)
        };

        let (handler, restorer) = match action.handler {
            SigHandler::Ignore => return,
            SigHandler::Default => {
                match sig.default_action() {
                    DefaultAction::Ignore => {}
                    DefaultAction::Stop => {
                        log::debug!("signal: stop-class {} accepted without effect", sig);
                    }
                    // init 不会被默认动作杀死 (SIGNAL_UNKILLABLE)
                    DefaultAction::Terminate if is_init => {
                        log::warn!("signal: {} ignored by init", sig);
                    }
                    DefaultAction::Terminate => {
                        log::info!("signal: {} terminates task {}", sig, me);
                        self.exit(signal_exit_code(sig));
                    }
                }
                return;
            }
            SigHandler::Handler(addr) => match action.restorer {
                Some(restorer) => (addr, restorer),
                None => {
                    log::debug!("signal: handler for {} has no restorer, dropped", sig);
                    return;
                }
            },
        };

        let snapshot = frame.clone();
        if let Err(err) = self.arch.setup_signal_frame(frame, sig, handler, restorer) {
            log::warn!("signal: cannot build frame for {}: {}", sig, err);
            *frame = snapshot;
            if is_init {
                return;
            }
            self.exit(signal_exit_code(Signal::SIGSEGV));
        }
        self.tasks
            .lock()
            .task_mut(me)
            .signal
            .enter_handler(snapshot, sig, &action);
        log::trace!("signal: entering handler {:#x} for {}", handler, sig);
    }

    /// 从信号处理函数返回 (rt_sigreturn)
    ///
    /// 原样恢复递送前的现场（包括系统调用返回值）和屏蔽字。
    /// 没有保存的现场时返回 EINVAL。
    pub fn signal_return(&self, frame: &mut A::TrapFrame) -> KResult<()> {
        let me = self.current();
        let saved = self
            .tasks
            .lock()
            .task_mut(me)
            .signal
            .leave_handler()
            .ok_or(Errno::InvalidArgument)?;
        *frame = saved;
        Ok(())
    }

    /// 修改当前任务的屏蔽字，返回旧值
    pub fn sigprocmask(&self, how: MaskHow, set: SigSet) -> SigSet {
        let me = self.current();
        self.tasks.lock().task_mut(me).signal.change_blocked(how, set)
    }

    /// 查询或设置信号处理动作，返回旧动作
    ///
    /// SIGKILL 和 SIGSTOP 的动作不能修改 (EINVAL)
    pub fn sigaction(&self, sig: Signal, action: Option<SigAction>) -> KResult<SigAction> {
        let me = self.current();
        let mut table = self.tasks.lock();
        let state = &mut table.task_mut(me).signal;
        match action {
            Some(action) => state.set_action(sig, action),
            None => Ok(state.action(sig)),
        }
    }

    /// 当前任务的待处理信号集合
    pub fn sigpending(&self) -> SigSet {
        let me = self.current();
        self.tasks.lock().task(me).signal.pending()
    }
}
