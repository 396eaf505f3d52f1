//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 信号数据结构
//!
//! 遵循 Linux 内核的信号设计 (kernel/signal.c, include/linux/signal.h)
//!
//! 核心概念：
//! - `SigSet`: 待处理集合与屏蔽字 (sigset_t)
//! - `SigAction`: 信号处理动作 (struct k_sigaction)
//! - `SignalState`: 每个任务的信号状态 (pending + blocked + action 表)
//!
//! 发送 (raise/kill) 与递送 (deliver/sigreturn) 在 process/signal.rs 中实现。

use alloc::boxed::Box;
use core::fmt;

use bitflags::bitflags;

use crate::errno::{Errno, KResult};

/// 信号数量 (_NSIG)
pub const NSIG: usize = 64;

/// 第一个实时信号
pub const SIGRTMIN: u32 = 32;

/// 信号编号
///
/// 取值范围 1..=64，对应 Linux 的 signal 定义 (include/uapi/asm-generic/signal.h)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signal(u8);

impl Signal {
    /// SIGHUP - 挂起
    pub const SIGHUP: Signal = Signal(1);
    /// SIGINT - 中断 (Ctrl+C)
    pub const SIGINT: Signal = Signal(2);
    /// SIGQUIT - 退出
    pub const SIGQUIT: Signal = Signal(3);
    /// SIGILL - 非法指令
    pub const SIGILL: Signal = Signal(4);
    /// SIGTRAP - 断点陷阱
    pub const SIGTRAP: Signal = Signal(5);
    /// SIGABRT - 异常终止
    pub const SIGABRT: Signal = Signal(6);
    /// SIGBUS - 总线错误
    pub const SIGBUS: Signal = Signal(7);
    /// SIGFPE - 算术异常（如除零）
    pub const SIGFPE: Signal = Signal(8);
    /// SIGKILL - 强制杀死 (不可捕获/屏蔽)
    pub const SIGKILL: Signal = Signal(9);
    /// SIGUSR1 - 用户定义信号1
    pub const SIGUSR1: Signal = Signal(10);
    /// SIGSEGV - 段错误
    pub const SIGSEGV: Signal = Signal(11);
    /// SIGUSR2 - 用户定义信号2
    pub const SIGUSR2: Signal = Signal(12);
    /// SIGPIPE - 管道破裂
    pub const SIGPIPE: Signal = Signal(13);
    /// SIGALRM - 定时器
    pub const SIGALRM: Signal = Signal(14);
    /// SIGTERM - 终止
    pub const SIGTERM: Signal = Signal(15);
    /// SIGSTKFLT - 栈错误
    pub const SIGSTKFLT: Signal = Signal(16);
    /// SIGCHLD - 子进程状态改变
    pub const SIGCHLD: Signal = Signal(17);
    /// SIGCONT - 继续
    pub const SIGCONT: Signal = Signal(18);
    /// SIGSTOP - 停止 (不可捕获/屏蔽)
    pub const SIGSTOP: Signal = Signal(19);
    /// SIGTSTP - 终端停止 (Ctrl+Z)
    pub const SIGTSTP: Signal = Signal(20);
    /// SIGTTIN - 后台读
    pub const SIGTTIN: Signal = Signal(21);
    /// SIGTTOU - 后台写
    pub const SIGTTOU: Signal = Signal(22);
    /// SIGURG - 紧急数据
    pub const SIGURG: Signal = Signal(23);
    /// SIGXCPU - 超出 CPU 时间限制
    pub const SIGXCPU: Signal = Signal(24);
    /// SIGXFSZ - 超出文件大小限制
    pub const SIGXFSZ: Signal = Signal(25);
    /// SIGVTALRM - 虚拟定时器
    pub const SIGVTALRM: Signal = Signal(26);
    /// SIGPROF - profiling 定时器
    pub const SIGPROF: Signal = Signal(27);
    /// SIGWINCH - 窗口大小改变
    pub const SIGWINCH: Signal = Signal(28);
    /// SIGIO - 异步 I/O
    pub const SIGIO: Signal = Signal(29);
    /// SIGPWR - 电源故障
    pub const SIGPWR: Signal = Signal(30);
    /// SIGSYS - 错误的系统调用
    pub const SIGSYS: Signal = Signal(31);

    /// 从信号编号构造，超出 1..=64 返回 EINVAL
    pub fn new(signo: u32) -> KResult<Signal> {
        if signo == 0 || signo as usize > NSIG {
            return Err(Errno::InvalidArgument);
        }
        Ok(Signal(signo as u8))
    }

    #[inline]
    pub const fn number(self) -> u32 {
        self.0 as u32
    }

    #[inline]
    const fn index(self) -> usize {
        self.0 as usize - 1
    }

    #[inline]
    const fn bit(self) -> u64 {
        1u64 << (self.0 - 1)
    }

    /// SIGKILL 和 SIGSTOP 不能被捕获、忽略或屏蔽
    pub const fn is_unblockable(self) -> bool {
        self.0 == Signal::SIGKILL.0 || self.0 == Signal::SIGSTOP.0
    }

    pub const fn is_realtime(self) -> bool {
        self.0 as u32 >= SIGRTMIN
    }

    /// 默认动作
    ///
    /// 对应 Linux 的 sig_kernel_ignore / sig_kernel_stop 分类
    pub const fn default_action(self) -> DefaultAction {
        match self.0 {
            17 | 23 => DefaultAction::Ignore,
            18..=22 => DefaultAction::Stop,
            _ => DefaultAction::Terminate,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signal {}", self.0)
    }
}

/// 默认动作分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultAction {
    /// 终止进程
    Terminate,
    /// 忽略 (SIGCHLD, SIGURG)
    Ignore,
    /// 作业控制类 (SIGSTOP/TSTP/TTIN/TTOU/CONT)，接受但不产生效果
    Stop,
}

/// 信号集合 (sigset_t)
///
/// 第 n 号信号对应第 n-1 位
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SigSet(u64);

impl SigSet {
    /// 不可屏蔽的信号
    pub const UNBLOCKABLE: SigSet = SigSet(Signal::SIGKILL.bit() | Signal::SIGSTOP.bit());

    pub const fn empty() -> Self {
        SigSet(0)
    }

    pub const fn from_bits(bits: u64) -> Self {
        SigSet(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn add(&mut self, sig: Signal) {
        self.0 |= sig.bit();
    }

    pub fn remove(&mut self, sig: Signal) {
        self.0 &= !sig.bit();
    }

    pub const fn contains(self, sig: Signal) -> bool {
        self.0 & sig.bit() != 0
    }

    pub const fn union(self, other: SigSet) -> SigSet {
        SigSet(self.0 | other.0)
    }

    pub const fn difference(self, other: SigSet) -> SigSet {
        SigSet(self.0 & !other.0)
    }

    /// 编号最小的信号
    pub fn first(self) -> Option<Signal> {
        if self.0 == 0 {
            None
        } else {
            Some(Signal(self.0.trailing_zeros() as u8 + 1))
        }
    }

    /// 按编号从小到大遍历
    pub fn iter(self) -> SigSetIter {
        SigSetIter(self.0)
    }
}

impl From<Signal> for SigSet {
    fn from(sig: Signal) -> Self {
        SigSet(sig.bit())
    }
}

impl FromIterator<Signal> for SigSet {
    fn from_iter<I: IntoIterator<Item = Signal>>(iter: I) -> Self {
        let mut set = SigSet::empty();
        for sig in iter {
            set.add(sig);
        }
        set
    }
}

pub struct SigSetIter(u64);

impl Iterator for SigSetIter {
    type Item = Signal;

    fn next(&mut self) -> Option<Signal> {
        if self.0 == 0 {
            return None;
        }
        let n = self.0.trailing_zeros();
        self.0 &= self.0 - 1;
        Some(Signal(n as u8 + 1))
    }
}

bitflags! {
    /// sa_flags 中内核核心关心的部分 (include/uapi/asm-generic/signal-defs.h)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SigActionFlags: u32 {
        /// 处理期间不自动屏蔽当前信号
        const NODEFER = 0x4000_0000;
        /// 递送一次后恢复默认动作
        const RESETHAND = 0x8000_0000;
    }
}

impl Default for SigActionFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// 信号处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigHandler {
    /// SIG_DFL
    Default,
    /// SIG_IGN
    Ignore,
    /// 用户态处理函数地址
    Handler(usize),
}

/// 信号处理动作
///
/// 对应 Linux 的 struct sigaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigAction {
    pub handler: SigHandler,
    /// 处理函数返回后跳入的 trampoline（发起 sigreturn）
    pub restorer: Option<usize>,
    /// 处理期间额外屏蔽的信号
    pub mask: SigSet,
    pub flags: SigActionFlags,
}

impl SigAction {
    /// 默认动作 (SIG_DFL)
    pub const fn new() -> Self {
        Self {
            handler: SigHandler::Default,
            restorer: None,
            mask: SigSet::empty(),
            flags: SigActionFlags::empty(),
        }
    }

    /// 忽略 (SIG_IGN)
    pub const fn ignore() -> Self {
        Self {
            handler: SigHandler::Ignore,
            ..Self::new()
        }
    }

    /// 用户态处理函数
    pub const fn handler(addr: usize, restorer: usize) -> Self {
        Self {
            handler: SigHandler::Handler(addr),
            restorer: Some(restorer),
            ..Self::new()
        }
    }

    pub const fn with_mask(mut self, mask: SigSet) -> Self {
        self.mask = mask;
        self
    }

    pub const fn with_flags(mut self, flags: SigActionFlags) -> Self {
        self.flags = flags;
        self
    }

    /// 递送这个信号是否会产生效果（进入处理函数或终止进程）
    pub const fn is_actionable(&self, sig: Signal) -> bool {
        match self.handler {
            SigHandler::Ignore => false,
            SigHandler::Handler(_) => true,
            SigHandler::Default => matches!(sig.default_action(), DefaultAction::Terminate),
        }
    }
}

impl Default for SigAction {
    fn default() -> Self {
        Self::new()
    }
}

/// sigprocmask 的 how 参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskHow {
    /// SIG_BLOCK
    Block,
    /// SIG_UNBLOCK
    Unblock,
    /// SIG_SETMASK
    SetMask,
}

/// 进入信号处理函数前保存的现场
struct SavedContext<F> {
    frame: F,
    blocked: SigSet,
}

/// 每个任务的信号状态
///
/// `F` 是平台的 trap frame 类型。保存的现场非空时表示正在执行处理函数，
/// 这期间不会再递送新的信号（嵌套递送被抑制，而不是排队）。
pub struct SignalState<F> {
    pending: SigSet,
    blocked: SigSet,
    actions: [SigAction; NSIG],
    saved: Option<Box<SavedContext<F>>>,
}

impl<F> SignalState<F> {
    pub fn new() -> Self {
        Self {
            pending: SigSet::empty(),
            blocked: SigSet::empty(),
            actions: [SigAction::new(); NSIG],
            saved: None,
        }
    }

    /// fork 时的继承：处理表与屏蔽字复制，待处理集合清空
    pub fn inherit(&self) -> Self {
        Self {
            pending: SigSet::empty(),
            blocked: self.blocked,
            actions: self.actions,
            saved: None,
        }
    }

    #[inline]
    pub fn pending(&self) -> SigSet {
        self.pending
    }

    #[inline]
    pub fn blocked(&self) -> SigSet {
        self.blocked
    }

    /// 加入待处理集合（无条件）
    pub fn post(&mut self, sig: Signal) {
        self.pending.add(sig);
    }

    #[inline]
    pub fn is_blocked(&self, sig: Signal) -> bool {
        self.blocked.contains(sig)
    }

    /// 待处理且未被屏蔽的信号
    pub fn deliverable(&self) -> SigSet {
        self.pending.difference(self.blocked)
    }

    /// 取出编号最小的可递送信号
    pub fn take_deliverable(&mut self) -> Option<Signal> {
        let sig = self.deliverable().first()?;
        self.pending.remove(sig);
        Some(sig)
    }

    /// 是否有递送后会产生效果的信号，阻塞等待据此返回 EINTR
    pub fn has_actionable(&self) -> bool {
        self.deliverable()
            .iter()
            .any(|sig| self.actions[sig.index()].is_actionable(sig))
    }

    pub fn action(&self, sig: Signal) -> SigAction {
        self.actions[sig.index()]
    }

    /// 设置处理动作，返回旧动作
    ///
    /// 新动作不会产生效果（忽略）时丢弃已经挂起的同号信号，与 POSIX 一致
    pub fn set_action(&mut self, sig: Signal, action: SigAction) -> KResult<SigAction> {
        if sig.is_unblockable() {
            return Err(Errno::InvalidArgument);
        }
        let old = core::mem::replace(&mut self.actions[sig.index()], action);
        if !action.is_actionable(sig) {
            self.pending.remove(sig);
        }
        Ok(old)
    }

    /// 修改屏蔽字，返回旧值。SIGKILL/SIGSTOP 永远不会被屏蔽
    pub fn change_blocked(&mut self, how: MaskHow, set: SigSet) -> SigSet {
        let old = self.blocked;
        let new = match how {
            MaskHow::Block => old.union(set),
            MaskHow::Unblock => old.difference(set),
            MaskHow::SetMask => set,
        };
        self.blocked = new.difference(SigSet::UNBLOCKABLE);
        old
    }

    /// 是否正在执行信号处理函数
    #[inline]
    pub fn in_handler(&self) -> bool {
        self.saved.is_some()
    }

    /// 进入处理函数：保存现场与屏蔽字，按 sa_mask/NODEFER 追加屏蔽
    pub(crate) fn enter_handler(&mut self, frame: F, sig: Signal, action: &SigAction) {
        self.saved = Some(Box::new(SavedContext {
            frame,
            blocked: self.blocked,
        }));
        let mut blocked = self.blocked.union(action.mask);
        if !action.flags.contains(SigActionFlags::NODEFER) {
            blocked.add(sig);
        }
        self.blocked = blocked.difference(SigSet::UNBLOCKABLE);
        if action.flags.contains(SigActionFlags::RESETHAND) {
            self.actions[sig.index()] = SigAction::new();
        }
    }

    /// 离开处理函数：取回保存的现场并恢复屏蔽字
    pub(crate) fn leave_handler(&mut self) -> Option<F> {
        let saved = self.saved.take()?;
        self.blocked = saved.blocked;
        Some(saved.frame)
    }
}

impl<F> Default for SignalState<F> {
    fn default() -> Self {
        Self::new()
    }
}
