//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 定时器
//!
//! 对应 Linux 的 kernel/time/timer.c 与 kernel/time/hrtimer.c 的最小子集：
//! - 定时器按 (到期 tick, 序号) 排序，同一 tick 到期的按加入顺序触发
//! - 时钟中断只推进 tick，到期定时器在中断返回路径和 idle 循环里运行
//! - `sleep()`: 睡眠指定 tick 数，被信号打断时返回剩余 tick (nanosleep)
//! - `alarm()`: 到期时发送 SIGALRM
//! - `pause()`: 睡眠直到有需要处理的信号

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::arch::Arch;
use crate::errno::{Errno, KResult};
use crate::kernel::Kernel;
use crate::process::{SchedEntity, TaskId};
use crate::sched::SchedContext;
use crate::signal::Signal;

/// 定时器到期时做什么
pub enum TimerAction {
    /// 唤醒睡眠中的任务
    Wake(Arc<SchedEntity>),
    /// 向所属任务发送 SIGALRM
    Alarm,
}

pub struct Timer {
    pub owner: TaskId,
    pub action: TimerAction,
}

/// 定时器句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimerHandle {
    deadline: u64,
    seq: u64,
}

impl TimerHandle {
    #[inline]
    pub fn deadline(&self) -> u64 {
        self.deadline
    }
}

/// 定时器队列
#[derive(Default)]
pub struct TimerQueue {
    timers: BTreeMap<TimerHandle, Timer>,
    next_seq: u64,
}

impl TimerQueue {
    pub const fn new() -> Self {
        Self {
            timers: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// 注册一个在 `deadline` 到期的定时器
    pub fn add(&mut self, deadline: u64, owner: TaskId, action: TimerAction) -> TimerHandle {
        let handle = TimerHandle {
            deadline,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.timers.insert(handle, Timer { owner, action });
        handle
    }

    pub fn contains(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle)
    }

    /// 取消定时器，已经触发过的返回 None
    pub fn cancel(&mut self, handle: TimerHandle) -> Option<Timer> {
        self.timers.remove(&handle)
    }

    /// 取消某个任务的全部定时器 (exit 时调用)
    pub fn cancel_owned(&mut self, owner: TaskId) -> Vec<Timer> {
        let handles: Vec<TimerHandle> = self
            .timers
            .iter()
            .filter(|(_, t)| t.owner == owner)
            .map(|(h, _)| *h)
            .collect();
        handles
            .into_iter()
            .filter_map(|h| self.timers.remove(&h))
            .collect()
    }

    /// 任务当前的闹钟
    pub fn alarm_of(&self, owner: TaskId) -> Option<TimerHandle> {
        self.timers
            .iter()
            .find(|(_, t)| t.owner == owner && matches!(t.action, TimerAction::Alarm))
            .map(|(h, _)| *h)
    }

    /// 取出所有在 `now` 之前（含）到期的定时器，按到期顺序排列
    pub fn expire(&mut self, now: u64) -> Vec<Timer> {
        let later = self.timers.split_off(&TimerHandle {
            deadline: now.saturating_add(1),
            seq: 0,
        });
        let expired = core::mem::replace(&mut self.timers, later);
        expired.into_values().collect()
    }
}

impl<A: Arch> Kernel<A> {
    /// 运行所有到期的定时器，返回触发的数量
    pub fn run_timers(&self) -> usize {
        let now = self.ticks();
        let expired = self.timers.lock().expire(now);
        let count = expired.len();
        for timer in expired {
            match timer.action {
                TimerAction::Wake(entity) => {
                    entity.wake_up();
                }
                TimerAction::Alarm => {
                    log::debug!("timer: alarm fired for task {} at tick {}", timer.owner, now);
                    self.raise_task(timer.owner, Signal::SIGALRM);
                }
            }
        }
        count
    }

    /// 尚未触发的定时器数量
    pub fn pending_timers(&self) -> usize {
        self.timers.lock().len()
    }

    /// 睡眠 `ticks` 个 tick
    ///
    /// 正常结束返回 0；被需要处理的信号打断时取消定时器并返回剩余的 tick 数
    pub fn sleep(&self, ticks: u64) -> u64 {
        if ticks == 0 {
            return 0;
        }
        let me = self.current();
        let deadline = self.ticks().saturating_add(ticks);
        let entity = self.current_task();
        let handle = self.timers.lock().add(deadline, me, TimerAction::Wake(entity));

        let mut guard = self.sleepers.lock();
        loop {
            if !self.timers.lock().contains(handle) {
                return 0;
            }
            if self.signal_pending() {
                self.timers.lock().cancel(handle);
                let remaining = deadline.saturating_sub(self.ticks());
                log::debug!("timer: sleep of task {} interrupted, {} tick(s) left", me, remaining);
                return remaining;
            }
            guard = self.sleepers.wait(guard, self);
        }
    }

    /// 设置闹钟，`ticks` 为 0 时只取消旧闹钟
    ///
    /// 返回旧闹钟剩余的 tick 数（没有则为 0）
    pub fn alarm(&self, ticks: u64) -> u64 {
        let me = self.current();
        let now = self.ticks();
        let mut timers = self.timers.lock();
        let previous = match timers.alarm_of(me) {
            Some(handle) => {
                timers.cancel(handle);
                handle.deadline().saturating_sub(now)
            }
            None => 0,
        };
        if ticks > 0 {
            timers.add(now.saturating_add(ticks), me, TimerAction::Alarm);
        }
        previous
    }

    /// 睡眠直到有需要处理的信号，总是返回 EINTR
    pub fn pause(&self) -> KResult<()> {
        let mut guard = self.sleepers.lock();
        loop {
            if self.signal_pending() {
                return Err(Errno::InterruptedSystemCall);
            }
            guard = self.sleepers.wait(guard, self);
        }
    }
}
