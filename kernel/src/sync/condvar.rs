//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 条件变量 (Condition Variable) 机制
//!
//! 参考：
//! - `kernel/sched/wait.c` - 等待操作
//! - `pthread_cond_t` - POSIX 条件变量
//!
//! 核心概念：
//! - 条件变量自带一把自旋锁，被保护的数据和等待队列都在锁里
//! - wait() 把当前任务挂入队列、释放锁、schedule()，醒来后重新拿锁
//! - signal() 按 FIFO 顺序唤醒一个等待者
//! - broadcast() 唤醒所有等待者
//!
//! 被信号或定时器提前唤醒的任务不会被别人从队列里摘下，
//! 它在 wait() 返回前自己清理留下的队列项。

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use core::ops::{Deref, DerefMut};

use super::spinlock::{SpinLock, SpinLockGuard};
use crate::process::SchedEntity;
use crate::sched::SchedContext;

/// 等待队列项
///
/// 对应 Linux 的 struct wait_queue_entry
struct Waiter {
    task: Arc<SchedEntity>,
    ticket: u64,
}

struct Inner<T> {
    waiters: VecDeque<Waiter>,
    data: T,
}

/// 条件变量
///
/// 典型使用场景：
/// - 生产者-消费者（管道）
/// - 事件完成通知（子进程退出）
///
/// # 使用示例
/// ```ignore
/// let mut guard = cond.lock();
/// while !guard.ready {
///     guard = cond.wait(guard, ctx);  // 释放锁并等待
/// }
///
/// // 在另一个任务中：
/// let mut guard = cond.lock();
/// guard.ready = true;
/// guard.signal();
/// ```
pub struct ConditionVariable<T> {
    inner: SpinLock<Inner<T>>,
}

/// 持有条件变量锁的守卫，解引用得到被保护的数据
pub struct CondGuard<'a, T> {
    guard: SpinLockGuard<'a, Inner<T>>,
}

impl<T> ConditionVariable<T> {
    pub const fn new(data: T) -> Self {
        Self {
            inner: SpinLock::new(Inner {
                waiters: VecDeque::new(),
                data,
            }),
        }
    }

    /// 获取条件变量的锁
    pub fn lock(&self) -> CondGuard<'_, T> {
        CondGuard {
            guard: self.inner.lock(),
        }
    }

    /// 等待条件满足
    ///
    /// 调用者必须持有锁（传入守卫），返回时重新持有锁。
    /// 唤醒不代表条件成立，调用者必须在循环中重新检查。
    pub fn wait<'a>(&'a self, mut guard: CondGuard<'a, T>, ctx: &dyn SchedContext) -> CondGuard<'a, T> {
        let me = ctx.current_task();
        let ticket = guard.park(&me);
        drop(guard);

        ctx.schedule();

        let mut guard = self.lock();
        guard.unpark(&me, ticket);
        guard
    }
}

impl<T: Default> Default for ConditionVariable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<'a, T> CondGuard<'a, T> {
    /// 把任务挂到队尾并置为 Sleeping，返回本次睡眠的 ticket
    pub(crate) fn park(&mut self, task: &Arc<SchedEntity>) -> u64 {
        let ticket = task.prepare_sleep();
        self.guard.waiters.push_back(Waiter {
            task: task.clone(),
            ticket,
        });
        ticket
    }

    /// 清理自己在队列中残留的项（被信号或定时器唤醒时会留下）
    fn unpark(&mut self, task: &Arc<SchedEntity>, ticket: u64) {
        self.guard
            .waiters
            .retain(|w| !(Arc::ptr_eq(&w.task, task) && w.ticket == ticket));
    }

    /// 唤醒队首的等待者
    ///
    /// 已经醒来的残留项被直接丢弃，唤醒不会落空。
    pub fn signal(&mut self) -> bool {
        while let Some(waiter) = self.guard.waiters.pop_front() {
            if waiter.task.wake(waiter.ticket) {
                return true;
            }
        }
        false
    }

    /// 唤醒所有等待者，返回实际唤醒的数量
    pub fn broadcast(&mut self) -> usize {
        let mut woken = 0;
        while let Some(waiter) = self.guard.waiters.pop_front() {
            if waiter.task.wake(waiter.ticket) {
                woken += 1;
            }
        }
        woken
    }

    /// 队列中的项数（含尚未清理的残留项）
    pub fn queued(&self) -> usize {
        self.guard.waiters.len()
    }
}

impl<T> Deref for CondGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard.data
    }
}

impl<T> DerefMut for CondGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard.data
    }
}
