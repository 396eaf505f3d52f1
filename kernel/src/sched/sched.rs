//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 调度器核心
//!
//! 对应 Linux 的 kernel/sched/core.c：
//! - `schedule()`: __schedule() + context_switch()
//! - `timer_tick()`: scheduler_tick()，只动原子变量，可以在中断上下文调用
//! - `trap_return()`: 中断/系统调用返回用户态前的收尾
//!   (exit_to_user_mode_loop: need_resched -> schedule, 信号 -> do_signal)

use core::sync::atomic::Ordering;

use crate::arch::Arch;
use crate::config::TIME_SLICE_TICKS;
use crate::kernel::Kernel;
use crate::list::ListArena;
use crate::process::table::Chain;
use crate::process::{TaskId, TaskState, TaskTable};

/// 选择下一个任务
///
/// 从当前任务在全局链表中的后继开始向前扫描，当前任务本身最后一个被考虑，
/// 找不到可运行任务时选择 idle。idle 只作为兜底，不参与轮转。
fn pick_next_task<A: Arch>(table: &TaskTable<A>, prev: TaskId) -> TaskId {
    let idle = table.idle();
    let mut id = table.list_next(Chain::Tasks, prev);
    loop {
        if id != idle && table.task(id).state() == TaskState::Running {
            return id;
        }
        if id == prev {
            return idle;
        }
        id = table.list_next(Chain::Tasks, id);
    }
}

impl<A: Arch> Kernel<A> {
    /// 调度入口
    ///
    /// 对当前任务而言，这个调用要等它下一次被选中才返回。
    /// 返回时不持有任何锁。
    pub fn schedule(&self) {
        // 清除 need_resched 标志（对应 Linux 的 clear_tsk_need_resched）
        self.cpu.need_resched.store(false, Ordering::Release);
        let now = self.ticks();

        let (prev, next) = {
            let mut table = self.tasks.lock();
            let prev = self.current();
            let next = pick_next_task(&table, prev);

            let slice_left = self.cpu.slice_left.load(Ordering::Acquire);
            let outgoing = table.task_mut(prev);
            outgoing.account(now);
            outgoing.time_slice = slice_left;

            let incoming = table.task_mut(next);
            if incoming.is_zombie() {
                log::error!("sched: picked zombie task pid {}", incoming.pid());
                panic!("sched: zombie task selected to run");
            }
            incoming.last_run = now;
            incoming.time_slice = TIME_SLICE_TICKS;
            self.cpu.slice_left.store(TIME_SLICE_TICKS, Ordering::Release);
            self.cpu.current.store(next.to_bits(), Ordering::Release);

            if prev != next {
                log::trace!(
                    "sched: switch pid {} -> pid {} at tick {}",
                    table.pid_of(prev),
                    table.pid_of(next),
                    now
                );
                self.arch.activate_address_space(table.task(next).mm.as_ref());
            }
            (prev, next)
        };

        if prev != next {
            self.arch.switch_context(prev, next);
        }
    }

    /// 时钟中断
    ///
    /// 递增 tick 计数、递减当前任务的时间片，用完时设置 need_resched。
    /// 不拿任何锁，真正的切换推迟到中断返回路径。
    pub fn timer_tick(&self) {
        self.cpu.ticks.fetch_add(1, Ordering::AcqRel);
        let left = self.cpu.slice_left.load(Ordering::Acquire);
        if left <= 1 {
            self.cpu.slice_left.store(0, Ordering::Release);
            self.cpu.need_resched.store(true, Ordering::Release);
        } else {
            self.cpu.slice_left.store(left - 1, Ordering::Release);
        }
    }

    /// 请求在下一个中断返回点重新调度
    pub fn set_need_resched(&self) {
        self.cpu.need_resched.store(true, Ordering::Release);
    }

    #[inline]
    pub fn need_resched(&self) -> bool {
        self.cpu.need_resched.load(Ordering::Acquire)
    }

    /// 中断/系统调用返回路径
    ///
    /// 依次运行到期的定时器、按需调度、在返回用户态时递送信号。
    /// 返回内核态代码时不递送信号。
    pub fn trap_return(&self, frame: &mut A::TrapFrame, to_user: bool) {
        self.run_timers();
        if self.need_resched() {
            self.schedule();
        }
        if to_user {
            self.deliver(frame);
        }
    }

    /// 主动让出 CPU (sched_yield)
    pub fn yield_now(&self) {
        self.schedule();
    }

    /// idle 任务的一次循环：处理到期定时器后让出 CPU
    pub fn idle_step(&self) {
        self.run_timers();
        self.schedule();
    }

    /// idle 任务主循环
    pub fn idle_loop(&self) -> ! {
        loop {
            self.idle_step();
            self.arch.wait_for_interrupt();
        }
    }
}
