//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 调度器模块
//!
//! 遵循 Linux 内核的调度器设计 (kernel/sched/)，单 CPU、单一调度类：
//! - 调度入口: schedule() -> 选择下一个任务 -> context_switch()
//! - 时钟中断: scheduler_tick() 只递减时间片并设置 need_resched
//! - 中断返回: 检查 need_resched 后调用 schedule()，再递送信号
//!
//! 调度策略：按全局任务链表顺序轮转 (round-robin)，没有优先级

pub mod pid;
pub mod sched;
pub mod timer;

use alloc::sync::Arc;

use crate::process::SchedEntity;
use crate::signal::Signal;

pub use pid::{PidAllocator, PID_IDLE, PID_INIT};
pub use timer::{TimerAction, TimerHandle, TimerQueue};

/// 阻塞原语看到的调度器接口
///
/// 条件变量、管道等只需要 "当前是谁"、"让出 CPU"、"有没有要处理的信号"
/// 这几件事，通过这个 trait 访问内核，而不是依赖全局的当前任务指针。
pub trait SchedContext {
    /// 当前任务的调度实体
    fn current_task(&self) -> Arc<SchedEntity>;

    /// 让出 CPU，直到当前任务再次被选中
    fn schedule(&self);

    /// 当前任务是否有递送后会产生效果的信号（阻塞调用据此返回 EINTR）
    fn signal_pending(&self) -> bool;

    /// 向当前任务发送信号
    fn raise_current(&self, sig: Signal);
}
