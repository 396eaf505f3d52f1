//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 内核上下文
//!
//! `Kernel` 持有单 CPU 内核的全部可变状态：任务表、per-CPU 状态
//! （当前任务、need_resched、剩余时间片、tick 计数）、定时器队列和 PID 分配器。
//! 所有依赖 "当前是谁在运行" 的操作都是它的方法，不存在全局的 current 指针。
//!
//! 锁的顺序：条件变量的锁 -> 任务表 -> 定时器队列，反过来拿锁是错误的。
//! 任何锁都不能跨越 schedule() 持有。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use crate::arch::Arch;
use crate::config::PID_MAX;
use crate::process::{Pid, SchedEntity, TaskId, TaskInfo, TaskTable};
use crate::sched::{PidAllocator, SchedContext, TimerQueue, PID_IDLE};
use crate::signal::Signal;
use crate::sync::{ConditionVariable, SpinLock};

/// per-CPU 状态
///
/// 对应 Linux 的 struct rq 中与单 CPU 轮转有关的部分。
/// 时钟中断只访问这里的原子变量。
pub(crate) struct CpuState {
    /// 当前任务 (TaskId 打包成 u64)
    pub(crate) current: AtomicU64,
    pub(crate) need_resched: AtomicBool,
    /// 当前任务剩余的时间片
    pub(crate) slice_left: AtomicU32,
    /// 单调递增的 tick 计数 (jiffies)
    pub(crate) ticks: AtomicU64,
}

impl CpuState {
    fn new(idle: TaskId) -> Self {
        Self {
            current: AtomicU64::new(idle.to_bits()),
            need_resched: AtomicBool::new(false),
            slice_left: AtomicU32::new(0),
            ticks: AtomicU64::new(0),
        }
    }
}

/// 内核上下文
pub struct Kernel<A: Arch> {
    pub(crate) arch: A,
    pub(crate) tasks: SpinLock<TaskTable<A>>,
    pub(crate) cpu: CpuState,
    pub(crate) timers: SpinLock<TimerQueue>,
    /// sleep/pause 的睡眠队列，只由定时器和信号唤醒
    pub(crate) sleepers: ConditionVariable<()>,
    pub(crate) pids: PidAllocator,
}

impl<A: Arch> Kernel<A> {
    /// 创建内核，idle 任务 (PID 0) 作为当前任务
    ///
    /// 对应 Linux 的 sched_init() + init_task
    pub fn new(arch: A) -> Self {
        let table = TaskTable::new(PID_IDLE);
        let idle = table.idle();
        log::info!("sched: kernel core up, idle task {}", idle);
        Self {
            arch,
            tasks: SpinLock::new(table),
            cpu: CpuState::new(idle),
            timers: SpinLock::new(TimerQueue::new()),
            sleepers: ConditionVariable::new(()),
            pids: PidAllocator::new(PID_MAX),
        }
    }

    #[inline]
    pub fn arch(&self) -> &A {
        &self.arch
    }

    /// 当前任务句柄
    #[inline]
    pub fn current(&self) -> TaskId {
        TaskId::from_bits(self.cpu.current.load(Ordering::Acquire))
    }

    pub fn current_pid(&self) -> Pid {
        self.tasks.lock().pid_of(self.current())
    }

    /// 当前 tick 计数
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.cpu.ticks.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn idle_id(&self) -> TaskId {
        self.tasks.lock().idle()
    }

    /// 按 PID 查询任务状态
    pub fn task_info(&self, pid: Pid) -> Option<TaskInfo> {
        let table = self.tasks.lock();
        table.find_by_pid(pid).map(|id| table.info(id))
    }

    /// 按 PID 查询子进程列表（按兄弟链表顺序）
    pub fn children_of(&self, pid: Pid) -> Option<Vec<Pid>> {
        let table = self.tasks.lock();
        let id = table.find_by_pid(pid)?;
        Some(table.children(id).into_iter().map(|c| table.pid_of(c)).collect())
    }

    /// 全局任务链表中的所有 PID（从 idle 开始）
    pub fn all_pids(&self) -> Vec<Pid> {
        self.tasks.lock().iter().map(|(_, t)| t.pid()).collect()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// 检查进程树的三条链表是否一致
    pub fn check_invariants(&self) -> Result<(), &'static str> {
        self.tasks.lock().verify()
    }
}

impl<A: Arch> SchedContext for Kernel<A> {
    fn current_task(&self) -> Arc<SchedEntity> {
        self.tasks.lock().task(self.current()).entity.clone()
    }

    fn schedule(&self) {
        Kernel::schedule(self);
    }

    fn signal_pending(&self) -> bool {
        self.tasks.lock().task(self.current()).signal.has_actionable()
    }

    fn raise_current(&self, sig: Signal) {
        self.raise_task(self.current(), sig);
    }
}
