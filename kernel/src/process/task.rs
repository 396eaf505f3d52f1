//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 任务控制块 (Task Control Block)
//!
//! 遵循 Linux 内核的 `struct task_struct` 定义 (include/linux/sched.h)
//!
//! 关键设计要点：
//! 1. 任务存放在任务表 (arena) 中，用带代号的 `TaskId` 寻址，不使用裸指针
//! 2. 状态字放在可共享的 `SchedEntity` 里，等待队列只持有它的引用
//! 3. 全局链表、兄弟链表都是以 `TaskId` 链接的循环双向链表

use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::arch::Arch;
use crate::fs::{FdTable, FsContext};
use crate::list::Links;
use crate::signal::SignalState;
use crate::sync::ConditionVariable;

/// 进程 ID 类型
pub type Pid = u32;

/// 任务句柄
///
/// `slot` 是任务表中的下标，`generation` 在槽位被回收后递增，
/// 因此一个已被回收任务的旧句柄永远不会指向新任务。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    slot: u32,
    generation: u32,
}

impl TaskId {
    pub(crate) const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    #[inline]
    pub const fn slot(self) -> usize {
        self.slot as usize
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// 打包成 u64，用于原子地保存 "当前任务"
    pub(crate) const fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | self.slot as u64
    }

    pub(crate) const fn from_bits(bits: u64) -> Self {
        Self {
            slot: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.slot, self.generation)
    }
}

/// 进程状态
///
/// 对应 Linux 内核的 task_state (include/linux/sched.h)，只保留核心需要的三种
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TaskState {
    /// 可运行状态 (TASK_RUNNING)
    /// 进程在 CPU 上运行或等待被调度
    Running = 0,

    /// 睡眠状态 (TASK_INTERRUPTIBLE)
    /// 进程挂在某个条件变量的等待队列上，可被信号唤醒
    Sleeping = 1,

    /// 僵死状态 (EXIT_ZOMBIE)
    /// 进程已退出，但父进程尚未等待 (wait)
    Zombie = 2,
}

impl TaskState {
    const fn from_u32(value: u32) -> Self {
        match value {
            0 => TaskState::Running,
            1 => TaskState::Sleeping,
            _ => TaskState::Zombie,
        }
    }
}

/// 调度实体
///
/// 对应 Linux 的 `struct sched_entity` 加上 `task_struct::__state`。
/// 任务表和条件变量的等待队列共享同一个实体，唤醒只需要原子地改状态，
/// 不需要拿任务表的锁。
///
/// `wait_seq` 在每次被唤醒时递增。睡眠时记下的 ticket 只在下一次唤醒前有效，
/// 被信号或定时器提前唤醒后留在队列里的旧项会因为 ticket 不匹配而被跳过，
/// 这样 `signal()` 不会把唤醒浪费在一个已经醒着的任务上。
#[derive(Debug)]
pub struct SchedEntity {
    pid: Pid,
    state: AtomicU32,
    wait_seq: AtomicU64,
}

impl SchedEntity {
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            state: AtomicU32::new(TaskState::Running as u32),
            wait_seq: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn state(&self) -> TaskState {
        TaskState::from_u32(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set_state(&self, state: TaskState) {
        self.state.store(state as u32, Ordering::Release);
    }

    /// 进入睡眠，返回本次睡眠的 ticket
    pub(crate) fn prepare_sleep(&self) -> u64 {
        let ticket = self.wait_seq.load(Ordering::Acquire);
        self.set_state(TaskState::Sleeping);
        ticket
    }

    /// 条件变量唤醒：只有 ticket 仍然有效时才唤醒
    pub(crate) fn wake(&self, ticket: u64) -> bool {
        if self.wait_seq.load(Ordering::Acquire) != ticket {
            return false;
        }
        self.wake_up()
    }

    /// 无条件唤醒（信号、定时器）
    ///
    /// 对应 Linux 的 wake_up_process()，只作用于睡眠中的任务
    pub(crate) fn wake_up(&self) -> bool {
        let woken = self
            .state
            .compare_exchange(
                TaskState::Sleeping as u32,
                TaskState::Running as u32,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if woken {
            self.wait_seq.fetch_add(1, Ordering::AcqRel);
        }
        woken
    }
}

/// 身份凭证
///
/// 对应 Linux 的 `struct cred` 中最基本的几项，fork 时原样复制
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Credentials {
    pub uid: u32,
    pub gid: u32,
    pub euid: u32,
    pub egid: u32,
}

/// 任务控制块
///
/// 对应 Linux 的 `struct task_struct`
pub struct Task<A: Arch> {
    /// 调度实体（PID、状态）
    pub(crate) entity: Arc<SchedEntity>,
    /// 进程组 ID
    pub(crate) pgid: Pid,
    pub(crate) cred: Credentials,

    // ========== 进程树 ==========
    /// 父进程，只有 idle 没有父进程
    pub(crate) parent: Option<TaskId>,
    /// 全局任务链表 (task_struct::tasks)
    pub(crate) tasks: Links<TaskId>,
    /// 兄弟链表 (task_struct::sibling)
    pub(crate) sibling: Links<TaskId>,
    /// 第一个子进程，子进程之间通过 sibling 成环 (task_struct::children)
    pub(crate) first_child: Option<TaskId>,

    /// 退出码
    pub(crate) exit_code: i32,
    /// 子进程退出时通知本任务的条件变量
    pub(crate) child_exit: Arc<ConditionVariable<()>>,

    // ========== 信号 ==========
    pub(crate) signal: SignalState<A::TrapFrame>,

    // ========== 资源 ==========
    pub(crate) files: FdTable,
    pub(crate) fs: FsContext,
    pub(crate) mm: Option<A::AddressSpace>,
    /// 控制终端
    pub(crate) tty: Option<u32>,

    // ========== 调度统计 ==========
    /// 剩余时间片（tick），被换下 CPU 时记录
    pub(crate) time_slice: u32,
    /// 累计占用的 tick 数
    pub(crate) cpu_ticks: u64,
    /// 最近一次被选中时的 tick
    pub(crate) last_run: u64,
}

impl<A: Arch> Task<A> {
    /// 创建 idle 任务 (PID 0)
    ///
    /// 对应 Linux 的 init_task
    pub(crate) fn new_idle(id: TaskId, pid: Pid) -> Self {
        Self {
            entity: Arc::new(SchedEntity::new(pid)),
            pgid: pid,
            cred: Credentials::default(),
            parent: None,
            tasks: Links::singleton(id),
            sibling: Links::singleton(id),
            first_child: None,
            exit_code: 0,
            child_exit: Arc::new(ConditionVariable::new(())),
            signal: SignalState::new(),
            files: FdTable::new(),
            fs: FsContext::default(),
            mm: None,
            tty: None,
            time_slice: 0,
            cpu_ticks: 0,
            last_run: 0,
        }
    }

    /// 以 `parent` 为模板构造子任务
    ///
    /// 复制身份、凭证、信号处理表和屏蔽字，复制文件描述符表和目录句柄
    /// （引用计数各加一）。返回的任务还没有挂到任何链表上。
    pub(crate) fn forked_from(parent: &Task<A>, id: TaskId, pid: Pid, mm: Option<A::AddressSpace>) -> Self {
        Self {
            entity: Arc::new(SchedEntity::new(pid)),
            pgid: parent.pgid,
            cred: parent.cred,
            parent: None,
            tasks: Links::singleton(id),
            sibling: Links::singleton(id),
            first_child: None,
            exit_code: 0,
            child_exit: Arc::new(ConditionVariable::new(())),
            signal: parent.signal.inherit(),
            files: parent.files.fork(),
            fs: parent.fs.clone(),
            mm,
            tty: parent.tty,
            time_slice: 0,
            cpu_ticks: 0,
            last_run: 0,
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.entity.pid()
    }

    #[inline]
    pub fn state(&self) -> TaskState {
        self.entity.state()
    }

    #[inline]
    pub fn is_zombie(&self) -> bool {
        self.state() == TaskState::Zombie
    }

    #[inline]
    pub fn pgid(&self) -> Pid {
        self.pgid
    }

    #[inline]
    pub fn credentials(&self) -> Credentials {
        self.cred
    }

    #[inline]
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// 把自上次被选中以来经过的 tick 计入 CPU 占用
    pub(crate) fn account(&mut self, now: u64) {
        self.cpu_ticks += now.saturating_sub(self.last_run);
        self.last_run = now;
    }
}

/// 任务状态快照，供系统调用层和测试查询
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskInfo {
    pub pid: Pid,
    pub ppid: Option<Pid>,
    pub pgid: Pid,
    pub state: TaskState,
    pub exit_code: i32,
    pub cpu_ticks: u64,
    pub time_slice: u32,
}
