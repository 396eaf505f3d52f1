//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 架构抽象层
//!
//! 内核核心不直接接触寄存器上下文、trap frame 布局和页表，
//! 这些都通过 [`Arch`] trait 交给具体平台实现：
//! - 上下文：创建、销毁、切换 (arch/riscv64/context.rs 中的 context_switch)
//! - 地址空间：复制、销毁、切换 (对应 Linux 的 dup_mm / mmput / switch_mm)
//! - 信号栈帧：把返回用户态的现场改写为进入信号处理函数 (setup_rt_frame)

use crate::errno::KResult;
use crate::process::TaskId;
use crate::signal::Signal;

/// 平台接口
///
/// 上下文以 `TaskId` 为键由平台自行保管（通常与内核栈放在一起），
/// 地址空间句柄则由任务持有。所有方法对调度器而言都是不可分割的。
pub trait Arch: Send + Sync + Sized + 'static {
    /// 新任务第一次被调度时从哪里开始执行
    type Entry: Send;

    /// 进入内核时保存的用户态寄存器现场
    type TrapFrame: Clone + Send + 'static;

    /// 地址空间句柄
    type AddressSpace: Send + 'static;

    /// 为新任务准备 CPU 上下文，失败时任务创建整体失败
    fn init_context(&self, task: TaskId, entry: Self::Entry) -> KResult<()>;

    /// 释放任务的 CPU 上下文（只在回收僵尸任务时调用）
    fn destroy_context(&self, task: TaskId);

    /// 从 `prev` 切换到 `next`
    ///
    /// 对 `prev` 而言，这个调用在它下一次被选中时才返回
    fn switch_context(&self, prev: TaskId, next: TaskId);

    /// 复制地址空间 (fork)
    fn dup_address_space(&self, parent: &Self::AddressSpace) -> KResult<Self::AddressSpace>;

    /// 销毁地址空间
    fn destroy_address_space(&self, space: Self::AddressSpace);

    /// 切换到 `space`，内核线程传入 None
    fn activate_address_space(&self, space: Option<&Self::AddressSpace>);

    /// 改写 `frame`，使返回用户态时进入 `handler(sig)`，
    /// 处理函数返回后落入 `restorer` 发起 sigreturn
    fn setup_signal_frame(
        &self,
        frame: &mut Self::TrapFrame,
        sig: Signal,
        handler: usize,
        restorer: usize,
    ) -> KResult<()>;

    /// 没有可运行任务时等待中断
    fn wait_for_interrupt(&self) {
        core::hint::spin_loop();
    }
}
